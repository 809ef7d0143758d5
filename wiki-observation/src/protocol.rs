//! Wire shapes for remote events.
//!
//! A remote event only carries identities, never document content:
//! ```text
//! ┌──────────┬──────────────────────────────┬───────────────┐
//! │ event    │ source                       │ data          │
//! │ type tag │ current {wiki,space,page,    │ {wiki, user?} │
//! │          │   rev?} + original rev?      │               │
//! └──────────┴──────────────────────────────┴───────────────┘
//! ```
//!
//! Frames add the originating node and a per-node sequence number and are
//! bincode-encoded for the cluster bus.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wiki_core::{DocumentReference, Revision};

use crate::event::EventType;

/// The transmitted subset of an execution context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextData {
    /// Selected wiki (tenant)
    pub wiki: String,
    /// Acting user, `None` for guests
    pub user: Option<String>,
}

/// Identity of one document state.
///
/// `revision` is `None` when the document did not exist yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub reference: DocumentReference,
    pub revision: Option<Revision>,
}

impl DocumentIdentity {
    pub fn new(reference: DocumentReference, revision: Option<Revision>) -> Self {
        Self {
            reference,
            revision,
        }
    }
}

/// A document and the revision it had before the mutation.
///
/// The prior revision always shares the current reference, so only its
/// version and language are transmitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub current: DocumentIdentity,
    /// Present only if a stored revision existed before the mutation
    pub original: Option<Revision>,
}

impl DocumentSnapshot {
    /// Full identity of the prior revision.
    pub fn original_identity(&self) -> Option<DocumentIdentity> {
        self.original.as_ref().map(|revision| {
            DocumentIdentity::new(self.current.reference.clone(), Some(revision.clone()))
        })
    }
}

/// Remote form of a local event.
///
/// Only the converter that produced it understands how `source` and `data`
/// map back onto a local event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEventData {
    pub event: EventType,
    pub source: DocumentSnapshot,
    pub data: ContextData,
}

impl RemoteEventData {
    /// Structural checks a receiver applies before handing the envelope to
    /// any converter.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let reference = &self.source.current.reference;
        if reference.wiki.is_empty() || reference.space.is_empty() || reference.page.is_empty() {
            return Err(ProtocolError::MalformedEnvelope(format!(
                "incomplete document reference '{reference}'"
            )));
        }

        let revisions = self
            .source
            .current
            .revision
            .iter()
            .chain(self.source.original.iter());
        for revision in revisions {
            if revision.version.is_empty() {
                return Err(ProtocolError::MalformedEnvelope(format!(
                    "empty version for '{reference}'"
                )));
            }
        }
        Ok(())
    }
}

/// Envelope plus transport framing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEventFrame {
    /// Node that converted the local event
    pub origin: Uuid,
    /// Per-origin sequence number
    pub sequence: u64,
    pub event: RemoteEventData,
}

impl RemoteEventFrame {
    pub fn new(origin: Uuid, sequence: u64, event: RemoteEventData) -> Self {
        Self {
            origin,
            sequence,
            event,
        }
    }

    /// Serialize to binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ProtocolError::SerializationError(e.to_string()))
    }

    /// Deserialize from binary wire format and validate the envelope.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let (frame, _): (Self, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| ProtocolError::DeserializationError(e.to_string()))?;
        frame.event.validate()?;
        Ok(frame)
    }
}

/// Protocol errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolError {
    SerializationError(String),
    DeserializationError(String),
    MalformedEnvelope(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SerializationError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializationError(e) => write!(f, "Deserialization error: {e}"),
            Self::MalformedEnvelope(e) => write!(f, "Malformed envelope: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn welcome() -> DocumentReference {
        DocumentReference::new("demo", "Main", "Welcome")
    }

    fn update_envelope() -> RemoteEventData {
        RemoteEventData {
            event: EventType::DocumentUpdate,
            source: DocumentSnapshot {
                current: DocumentIdentity::new(welcome(), Some(Revision::new("1.2", ""))),
                original: Some(Revision::new("1.1", "")),
            },
            data: ContextData {
                wiki: "demo".into(),
                user: Some("XWiki.Admin".into()),
            },
        }
    }

    #[test]
    fn test_frame_roundtrip() {
        let origin = Uuid::new_v4();
        let frame = RemoteEventFrame::new(origin, 7, update_envelope());

        let encoded = frame.encode().unwrap();
        let decoded = RemoteEventFrame::decode(&encoded).unwrap();

        assert_eq!(decoded.origin, origin);
        assert_eq!(decoded.sequence, 7);
        assert_eq!(decoded.event, update_envelope());
    }

    #[test]
    fn test_original_identity_shares_reference() {
        let envelope = update_envelope();
        let original = envelope.source.original_identity().unwrap();
        assert_eq!(original.reference, envelope.source.current.reference);
        assert_eq!(original.revision, Some(Revision::new("1.1", "")));
    }

    #[test]
    fn test_no_original_identity_for_new_document() {
        let snapshot = DocumentSnapshot {
            current: DocumentIdentity::new(welcome(), None),
            original: None,
        };
        assert!(snapshot.original_identity().is_none());
    }

    #[test]
    fn test_decode_rejects_incomplete_reference() {
        let mut envelope = update_envelope();
        envelope.source.current.reference.page.clear();
        let bytes = RemoteEventFrame::new(Uuid::new_v4(), 0, envelope)
            .encode()
            .unwrap();

        let err = RemoteEventFrame::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope(_)));
    }

    #[test]
    fn test_decode_rejects_empty_original_version() {
        let mut envelope = update_envelope();
        envelope.source.original = Some(Revision::new("", ""));
        assert!(envelope.validate().is_err());
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let garbage = vec![0xFF, 0xFE, 0xFD];
        assert!(matches!(
            RemoteEventFrame::decode(&garbage),
            Err(ProtocolError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_envelope_stays_small() {
        let bytes = RemoteEventFrame::new(Uuid::new_v4(), 1, update_envelope())
            .encode()
            .unwrap();
        // Identities only: no content ever rides along.
        assert!(bytes.len() < 128, "Encoded size {} too large", bytes.len());
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MalformedEnvelope("empty version".into());
        assert_eq!(err.to_string(), "Malformed envelope: empty version");
    }
}
