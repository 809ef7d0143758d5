//! In-process cluster bus: fans encoded frames out to every joined node.
//!
//! Uses a tokio broadcast channel, so publishing is O(1) regardless of the
//! number of nodes. Each node reads through a [`NodeReceiver`] that buffers
//! up to `capacity` frames and never yields the node's own frames back to
//! it. A node that falls further behind loses the oldest frames; the loss is
//! counted in [`BusStats::frames_lagged`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::protocol::{ProtocolError, RemoteEventFrame};

/// A cluster member as seen by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub node_id: Uuid,
    pub name: String,
}

impl NodeInfo {
    pub fn new(node_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            node_id,
            name: name.into(),
        }
    }
}

/// An encoded frame tagged with the node that published it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFrame {
    pub origin: Uuid,
    pub bytes: Vec<u8>,
}

/// Statistics for monitoring bus health.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub frames_published: u64,
    pub bytes_published: u64,
    /// Frames lost by receivers that fell behind
    pub frames_lagged: u64,
    pub active_nodes: usize,
}

#[derive(Default)]
struct BusCounters {
    frames_published: AtomicU64,
    bytes_published: AtomicU64,
    frames_lagged: AtomicU64,
}

/// Shared fan-out channel for remote events.
pub struct ClusterBus {
    sender: broadcast::Sender<Arc<BusFrame>>,
    members: RwLock<HashMap<Uuid, NodeInfo>>,
    counters: Arc<BusCounters>,
}

impl ClusterBus {
    /// `capacity` frames are buffered per node before lagging nodes drop.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            members: RwLock::new(HashMap::new()),
            counters: Arc::new(BusCounters::default()),
        }
    }

    fn members(&self) -> RwLockReadGuard<'_, HashMap<Uuid, NodeInfo>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn members_mut(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, NodeInfo>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a node and returns its receiver.
    pub fn join(&self, info: NodeInfo) -> NodeReceiver {
        log::info!("Node {} ({}) joined the cluster bus", info.name, info.node_id);
        let receiver = NodeReceiver {
            node: info.clone(),
            rx: self.sender.subscribe(),
            counters: Arc::clone(&self.counters),
        };
        self.members_mut().insert(info.node_id, info);
        receiver
    }

    /// Removes a node. Its receiver keeps draining until dropped.
    pub fn leave(&self, node_id: &Uuid) -> Option<NodeInfo> {
        let left = self.members_mut().remove(node_id);
        if let Some(info) = &left {
            log::info!("Node {} ({}) left the cluster bus", info.name, info.node_id);
        }
        left
    }

    /// Encodes `frame` and publishes it under its origin.
    ///
    /// Returns the number of receivers other than the origin's own.
    pub fn publish(&self, frame: &RemoteEventFrame) -> Result<usize, ProtocolError> {
        let bytes = frame.encode()?;
        let len = bytes.len() as u64;
        let receivers = self
            .sender
            .send(Arc::new(BusFrame {
                origin: frame.origin,
                bytes,
            }))
            .unwrap_or(0);
        self.counters.frames_published.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_published.fetch_add(len, Ordering::Relaxed);

        let own = usize::from(self.members().contains_key(&frame.origin));
        Ok(receivers.saturating_sub(own))
    }

    pub fn node_count(&self) -> usize {
        self.members().len()
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            frames_published: self.counters.frames_published.load(Ordering::Relaxed),
            bytes_published: self.counters.bytes_published.load(Ordering::Relaxed),
            frames_lagged: self.counters.frames_lagged.load(Ordering::Relaxed),
            active_nodes: self.node_count(),
        }
    }
}

/// One node's view of the bus.
pub struct NodeReceiver {
    node: NodeInfo,
    rx: broadcast::Receiver<Arc<BusFrame>>,
    counters: Arc<BusCounters>,
}

impl NodeReceiver {
    pub fn node(&self) -> &NodeInfo {
        &self.node
    }

    /// Next frame published by another node, `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Arc<BusFrame>> {
        loop {
            match self.rx.recv().await {
                Ok(frame) if frame.origin == self.node.node_id => continue,
                Ok(frame) => return Some(frame),
                Err(RecvError::Lagged(n)) => {
                    self.counters.frames_lagged.fetch_add(n, Ordering::Relaxed);
                    log::warn!("{} lagged by {n} remote events", self.node.name);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use crate::protocol::{ContextData, DocumentIdentity, DocumentSnapshot, RemoteEventData};
    use wiki_core::DocumentReference;

    fn frame(origin: Uuid, sequence: u64) -> RemoteEventFrame {
        RemoteEventFrame::new(
            origin,
            sequence,
            RemoteEventData {
                event: EventType::DocumentSave,
                source: DocumentSnapshot {
                    current: DocumentIdentity::new(
                        DocumentReference::new("demo", "Main", "Welcome"),
                        None,
                    ),
                    original: None,
                },
                data: ContextData {
                    wiki: "demo".into(),
                    user: None,
                },
            },
        )
    }

    fn decode(frame: &BusFrame) -> RemoteEventFrame {
        RemoteEventFrame::decode(&frame.bytes).unwrap()
    }

    #[test]
    fn test_join_leave() {
        let bus = ClusterBus::new(16);
        let node = NodeInfo::new(Uuid::new_v4(), "node-a");
        let node_id = node.node_id;

        let rx = bus.join(node);
        assert_eq!(rx.node().name, "node-a");
        assert_eq!(bus.node_count(), 1);

        assert!(bus.leave(&node_id).is_some());
        assert_eq!(bus.node_count(), 0);
        assert!(bus.leave(&node_id).is_none());
    }

    #[tokio::test]
    async fn test_publish_reaches_other_nodes() {
        let bus = ClusterBus::new(16);
        let a = NodeInfo::new(Uuid::new_v4(), "node-a");
        let origin = a.node_id;
        let _rx_a = bus.join(a);
        let mut rx_b = bus.join(NodeInfo::new(Uuid::new_v4(), "node-b"));
        let mut rx_c = bus.join(NodeInfo::new(Uuid::new_v4(), "node-c"));

        assert_eq!(bus.publish(&frame(origin, 0)).unwrap(), 2);

        for rx in [&mut rx_b, &mut rx_c] {
            let received = rx.recv().await.unwrap();
            assert_eq!(received.origin, origin);
            assert_eq!(decode(&received).origin, origin);
        }
    }

    #[tokio::test]
    async fn test_receiver_skips_own_frames() {
        let bus = ClusterBus::new(16);
        let a = NodeInfo::new(Uuid::new_v4(), "node-a");
        let own = a.node_id;
        let mut rx_a = bus.join(a);
        let other = Uuid::new_v4();

        bus.publish(&frame(own, 0)).unwrap();
        bus.publish(&frame(other, 0)).unwrap();

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.origin, other);
    }

    #[test]
    fn test_publish_without_nodes() {
        let bus = ClusterBus::new(4);
        assert_eq!(bus.publish(&frame(Uuid::new_v4(), 0)).unwrap(), 0);
        assert_eq!(bus.stats().frames_published, 1);
    }

    #[test]
    fn test_stats() {
        let bus = ClusterBus::new(16);
        let _rx = bus.join(NodeInfo::new(Uuid::new_v4(), "node-a"));

        bus.publish(&frame(Uuid::new_v4(), 0)).unwrap();
        bus.publish(&frame(Uuid::new_v4(), 1)).unwrap();

        let stats = bus.stats();
        assert_eq!(stats.frames_published, 2);
        assert!(stats.bytes_published > 0);
        assert_eq!(stats.frames_lagged, 0);
        assert_eq!(stats.active_nodes, 1);
    }

    #[tokio::test]
    async fn test_lagging_receiver_drops_oldest() {
        let bus = ClusterBus::new(2);
        let mut rx = bus.join(NodeInfo::new(Uuid::new_v4(), "slow"));
        let origin = Uuid::new_v4();

        for sequence in 0..4 {
            bus.publish(&frame(origin, sequence)).unwrap();
        }

        let received = rx.recv().await.unwrap();
        assert_eq!(decode(&received).sequence, 2);
        assert_eq!(bus.stats().frames_lagged, 2);
    }

    #[tokio::test]
    async fn test_receiver_ends_when_bus_dropped() {
        let bus = ClusterBus::new(4);
        let mut rx = bus.join(NodeInfo::new(Uuid::new_v4(), "node-a"));
        drop(bus);
        assert!(rx.recv().await.is_none());
    }
}
