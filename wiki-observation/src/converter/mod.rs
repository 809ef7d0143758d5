//! Converters between local events and remote envelopes.
//!
//! Each converter claims a fixed set of event types. A registry offers every
//! event to its converters in order; `Ok(None)` means "not mine" and lets
//! the next converter try.

pub mod document;

use thiserror::Error;
use wiki_core::{Document, WikiContext};

use crate::codec;
use crate::event::{EventType, LocalEvent};
use crate::placeholder::ReceivedDocument;
use crate::protocol::{ContextData, DocumentSnapshot, RemoteEventData};

pub use document::DocumentEventConverter;

/// A claimed event whose payload does not have the shape its type promises.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("{event} event expects a {expected} source, got {found}")]
    UnexpectedSource {
        event: EventType,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{event} event expects {expected} data, got {found}")]
    UnexpectedData {
        event: EventType,
        expected: &'static str,
        found: &'static str,
    },
}

/// Two-way translation for one family of events.
///
/// The provided methods hold the serialization shared by every converter.
pub trait EventConverter: Send + Sync {
    /// Hint used in logs.
    fn name(&self) -> &str;

    /// Builds the remote form of `local`, or `Ok(None)` if not claimed.
    fn to_remote(&self, local: &LocalEvent) -> Result<Option<RemoteEventData>, ConvertError>;

    /// Rebuilds a local event from `remote` under the receiver's `context`,
    /// or `Ok(None)` if not claimed.
    fn from_remote(
        &self,
        remote: &RemoteEventData,
        context: &WikiContext,
    ) -> Result<Option<LocalEvent>, ConvertError>;

    fn serialize_context(&self, context: &WikiContext) -> ContextData {
        codec::encode_context(context)
    }

    fn deserialize_context(&self, data: &ContextData, context: &WikiContext) -> WikiContext {
        codec::decode_context(data, context)
    }

    /// Current identity plus the prior revision when one was stored.
    fn serialize_document(&self, document: &Document) -> DocumentSnapshot {
        let current = codec::encode_document_identity(document);
        let original = document
            .original()
            .map(codec::encode_document_identity)
            .and_then(|identity| identity.revision);
        DocumentSnapshot { current, original }
    }

    /// Placeholder for the current state with its prior state attached.
    fn deserialize_document(&self, snapshot: &DocumentSnapshot) -> ReceivedDocument {
        let current = codec::decode_document_identity(&snapshot.current);
        let original = snapshot
            .original_identity()
            .map(|identity| codec::decode_document_identity(&identity));
        ReceivedDocument::new(current, original)
    }
}
