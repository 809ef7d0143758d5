//! # wiki-observation — Remote observation for clustered wiki nodes
//!
//! Turns local document events into compact envelopes that other nodes can
//! turn back into equivalent local events, without shipping content.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  LocalEvent   ┌───────────────────┐  RemoteEventData
//! │ Node A       │ ────────────► │ ConverterRegistry │ ─────────┐
//! │ (mutation)   │               │  └ DocumentEvent… │          │ frame
//! └──────────────┘               └───────────────────┘          ▼
//!                                                       ┌──────────────┐
//!                                                       │ ClusterBus   │
//!                                                       │ (fan-out)    │
//!                                                       └──────┬───────┘
//! ┌──────────────┐  LocalEvent   ┌───────────────────┐         │
//! │ Node B       │ ◄──────────── │ ConverterRegistry │ ◄───────┘
//! │ (listeners)  │  placeholders └───────────────────┘
//! └──────┬───────┘
//!        │ resolve()
//!        ▼
//!  shared DocumentStore
//! ```
//!
//! ## Modules
//!
//! - [`event`] — local events and their typed payloads
//! - [`protocol`] — envelope and frame wire types (bincode)
//! - [`codec`] — context and identity encoding
//! - [`placeholder`] — new / lazy documents rebuilt on receivers
//! - [`converter`] — converter trait and the document converter
//! - [`registry`] — ordered converter dispatch
//! - [`observation`] — local listeners
//! - [`broadcast`] — in-process cluster bus
//! - [`remote`] — per-node glue and configuration

pub mod broadcast;
pub mod codec;
pub mod converter;
pub mod event;
pub mod observation;
pub mod placeholder;
pub mod protocol;
pub mod registry;
pub mod remote;

// Re-exports for convenience
pub use broadcast::{BusFrame, BusStats, ClusterBus, NodeInfo, NodeReceiver};
pub use codec::{decode_context, decode_document_identity, encode_context, encode_document_identity};
pub use converter::{ConvertError, DocumentEventConverter, EventConverter};
pub use event::{
    EventData, EventSource, EventType, LocalEvent, UnknownEventType, DOCUMENT_EVENTS,
};
pub use observation::{EventListener, EventOrigin, ObservationManager};
pub use placeholder::{DocumentPlaceholder, LazyDocument, ReceivedDocument};
pub use protocol::{
    ContextData, DocumentIdentity, DocumentSnapshot, ProtocolError, RemoteEventData,
    RemoteEventFrame,
};
pub use registry::ConverterRegistry;
pub use remote::{ObservationConfig, RemoteError, RemoteObservationManager, RemoteStats};
