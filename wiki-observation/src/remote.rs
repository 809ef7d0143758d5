//! One cluster node: local dispatch, conversion and the bus, wired together.
//!
//! ```text
//! notify(event) ─► local listeners
//!        │
//!        └─► registry.to_remote ─► frame ─► ClusterBus ─► other nodes
//!
//! bus frame ─► receive ─► registry.from_remote ─► local listeners (Remote)
//! ```
//!
//! Events rebuilt from remote frames are only dispatched locally, never
//! published again. The bus keeps a node's own frames from its receiver, and
//! [`RemoteObservationManager::receive`] skips them for frames that arrive
//! by other means.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;
use wiki_core::WikiContext;

use crate::broadcast::{ClusterBus, NodeInfo, NodeReceiver};
use crate::converter::ConvertError;
use crate::event::LocalEvent;
use crate::observation::{EventOrigin, ObservationManager};
use crate::protocol::{ProtocolError, RemoteEventFrame};
use crate::registry::ConverterRegistry;

/// Node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Identity of this node on the bus
    pub node_id: Uuid,
    /// Display name used in logs
    pub node_name: String,
    /// Publish local events to the cluster
    pub enabled: bool,
    /// Frames buffered per node on a bus created from this config
    pub broadcast_capacity: usize,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            node_id: Uuid::new_v4(),
            node_name: "wiki-node".to_string(),
            enabled: true,
            broadcast_capacity: 256,
        }
    }
}

impl ObservationConfig {
    /// Small buffers, named node.
    pub fn for_testing(node_name: impl Into<String>) -> Self {
        Self {
            node_id: Uuid::new_v4(),
            node_name: node_name.into(),
            enabled: true,
            broadcast_capacity: 16,
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),
    #[error("No execution context available to process remote event")]
    MissingContext,
}

/// Counters snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteStats {
    /// Frames published by this node
    pub sent: u64,
    /// Remote frames converted and dispatched locally
    pub received: u64,
    /// Local or remote events no converter claimed
    pub unclaimed: u64,
    /// Own frames handed to `receive` and skipped
    pub ignored_own: u64,
}

#[derive(Default)]
struct AtomicRemoteStats {
    sent: AtomicU64,
    received: AtomicU64,
    unclaimed: AtomicU64,
    ignored_own: AtomicU64,
}

/// Remote observation for a single node.
pub struct RemoteObservationManager {
    config: ObservationConfig,
    registry: ConverterRegistry,
    observation: Arc<ObservationManager>,
    bus: Arc<ClusterBus>,
    sequence: AtomicU64,
    stats: AtomicRemoteStats,
}

impl RemoteObservationManager {
    pub fn new(
        config: ObservationConfig,
        registry: ConverterRegistry,
        observation: Arc<ObservationManager>,
        bus: Arc<ClusterBus>,
    ) -> Self {
        Self {
            config,
            registry,
            observation,
            bus,
            sequence: AtomicU64::new(0),
            stats: AtomicRemoteStats::default(),
        }
    }

    pub fn node_id(&self) -> Uuid {
        self.config.node_id
    }

    pub fn config(&self) -> &ObservationConfig {
        &self.config
    }

    pub fn observation(&self) -> &Arc<ObservationManager> {
        &self.observation
    }

    /// Joins the bus under this node's identity.
    pub fn join(&self) -> NodeReceiver {
        self.bus
            .join(NodeInfo::new(self.config.node_id, self.config.node_name.clone()))
    }

    pub fn leave(&self) {
        self.bus.leave(&self.config.node_id);
    }

    /// Dispatches a local event to this node's listeners, then publishes it
    /// if a converter claims it.
    ///
    /// Returns the number of other nodes the frame reached, `None` when
    /// nothing was published.
    pub fn notify(&self, event: &LocalEvent) -> Result<Option<usize>, RemoteError> {
        self.observation.notify(event, EventOrigin::Local);

        if !self.config.enabled {
            return Ok(None);
        }

        let Some(remote) = self.registry.to_remote(event)? else {
            self.stats.unclaimed.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let frame = RemoteEventFrame::new(self.config.node_id, sequence, remote);
        let reached = self.bus.publish(&frame)?;
        self.stats.sent.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "{} published {} event #{sequence} to {reached} nodes",
            self.config.node_name,
            event.event
        );
        Ok(Some(reached))
    }

    /// Processes one encoded frame from the bus.
    ///
    /// `context` is the live context of the processing unit handling this
    /// frame. Returns the event dispatched locally, or `None` for own or
    /// unclaimed frames.
    pub fn receive(
        &self,
        bytes: &[u8],
        context: Option<&WikiContext>,
    ) -> Result<Option<LocalEvent>, RemoteError> {
        let frame = RemoteEventFrame::decode(bytes)?;
        if frame.origin == self.config.node_id {
            self.stats.ignored_own.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let context = context.ok_or(RemoteError::MissingContext)?;
        let Some(event) = self.registry.from_remote(&frame.event, context)? else {
            self.stats.unclaimed.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "{} dropped unclaimed {} event #{} from {}",
                self.config.node_name,
                frame.event.event,
                frame.sequence,
                frame.origin
            );
            return Ok(None);
        };

        self.stats.received.fetch_add(1, Ordering::Relaxed);
        self.observation.notify(&event, EventOrigin::Remote);
        Ok(Some(event))
    }

    /// Spawns a task processing frames from `rx` until the bus closes.
    ///
    /// Every frame is handled with its own clone of `base_context`.
    pub fn spawn_receiver(
        self: &Arc<Self>,
        mut rx: NodeReceiver,
        base_context: WikiContext,
    ) -> JoinHandle<()> {
        let node = Arc::clone(self);
        tokio::spawn(async move {
            log::info!("{} receiver started", node.config.node_name);
            while let Some(frame) = rx.recv().await {
                let context = base_context.clone();
                if let Err(e) = node.receive(&frame.bytes, Some(&context)) {
                    log::error!(
                        "{} failed to process remote event from {}: {e}",
                        node.config.node_name,
                        frame.origin
                    );
                }
            }
            log::info!("{} receiver stopped", node.config.node_name);
        })
    }

    pub fn stats(&self) -> RemoteStats {
        RemoteStats {
            sent: self.stats.sent.load(Ordering::Relaxed),
            received: self.stats.received.load(Ordering::Relaxed),
            unclaimed: self.stats.unclaimed.load(Ordering::Relaxed),
            ignored_own: self.stats.ignored_own.load(Ordering::Relaxed),
        }
    }
}
