//! In-process events and their typed payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use wiki_core::{Document, WikiContext};

use crate::placeholder::ReceivedDocument;

/// Kind of a local event.
///
/// The wire carries this value as the envelope's event type, so variants
/// must only ever be appended.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Document created or saved
    DocumentSave,
    /// Existing document modified
    DocumentUpdate,
    /// Document removed
    DocumentDelete,
    CommentAdded,
    CommentDeleted,
    AttachmentAdded,
    AttachmentDeleted,
    /// Application-defined event
    Custom(String),
}

/// Events that carry a document mutation.
pub static DOCUMENT_EVENTS: [EventType; 3] = [
    EventType::DocumentSave,
    EventType::DocumentUpdate,
    EventType::DocumentDelete,
];

/// Prefix of application-defined tags, keeping them apart from built-in ones.
const CUSTOM_PREFIX: &str = "custom:";

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown event type tag {0:?}")]
pub struct UnknownEventType(pub String);

impl EventType {
    /// Tag of a built-in event type, `None` for custom ones.
    pub fn builtin_tag(&self) -> Option<&'static str> {
        Some(match self {
            Self::DocumentSave => "document-save",
            Self::DocumentUpdate => "document-update",
            Self::DocumentDelete => "document-delete",
            Self::CommentAdded => "comment-added",
            Self::CommentDeleted => "comment-deleted",
            Self::AttachmentAdded => "attachment-added",
            Self::AttachmentDeleted => "attachment-deleted",
            Self::Custom(_) => return None,
        })
    }

    pub fn is_document_event(&self) -> bool {
        DOCUMENT_EVENTS.contains(self)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => write!(f, "{CUSTOM_PREFIX}{name}"),
            builtin => f.write_str(builtin.builtin_tag().unwrap_or_default()),
        }
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    /// Parses a built-in tag, or a `custom:`-prefixed application tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "document-save" => Self::DocumentSave,
            "document-update" => Self::DocumentUpdate,
            "document-delete" => Self::DocumentDelete,
            "comment-added" => Self::CommentAdded,
            "comment-deleted" => Self::CommentDeleted,
            "attachment-added" => Self::AttachmentAdded,
            "attachment-deleted" => Self::AttachmentDeleted,
            other => match other.strip_prefix(CUSTOM_PREFIX) {
                Some(name) if !name.is_empty() => Self::Custom(name.to_string()),
                _ => return Err(UnknownEventType(other.to_string())),
            },
        })
    }
}

/// The entity an event is about.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// Full document mutated on this node
    Document(Box<Document>),
    /// Document rebuilt from a remote envelope
    Received(Box<ReceivedDocument>),
    None,
}

impl EventSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document(_) => "document",
            Self::Received(_) => "received document",
            Self::None => "none",
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(&**doc),
            _ => None,
        }
    }

    pub fn as_received(&self) -> Option<&ReceivedDocument> {
        match self {
            Self::Received(doc) => Some(&**doc),
            _ => None,
        }
    }
}

/// Ambient state attached to an event.
#[derive(Debug, Clone)]
pub enum EventData {
    Context(WikiContext),
    None,
}

impl EventData {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Context(_) => "context",
            Self::None => "none",
        }
    }

    pub fn as_context(&self) -> Option<&WikiContext> {
        match self {
            Self::Context(ctx) => Some(ctx),
            Self::None => None,
        }
    }
}

/// An in-process notification: what happened, to what, under which context.
#[derive(Debug, Clone)]
pub struct LocalEvent {
    pub event: EventType,
    pub source: EventSource,
    pub data: EventData,
}

impl LocalEvent {
    pub fn new(event: EventType, source: EventSource, data: EventData) -> Self {
        Self {
            event,
            source,
            data,
        }
    }

    /// Event about a document mutated locally.
    pub fn document(event: EventType, document: Document, context: WikiContext) -> Self {
        Self::new(
            event,
            EventSource::Document(Box::new(document)),
            EventData::Context(context),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiki_core::DocumentReference;

    #[test]
    fn test_event_type_tags_roundtrip() {
        let all = [
            EventType::DocumentSave,
            EventType::DocumentUpdate,
            EventType::DocumentDelete,
            EventType::CommentAdded,
            EventType::CommentDeleted,
            EventType::AttachmentAdded,
            EventType::AttachmentDeleted,
            EventType::Custom("rating-changed".into()),
        ];
        for event in all {
            let parsed: EventType = event.to_string().parse().unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn test_custom_tags_are_namespaced() {
        let lookalike = EventType::Custom("document-save".into());
        assert_eq!(lookalike.to_string(), "custom:document-save");
        assert_ne!(lookalike.to_string(), EventType::DocumentSave.to_string());

        let parsed: EventType = lookalike.to_string().parse().unwrap();
        assert_eq!(parsed, lookalike);
        assert!(!parsed.is_document_event());
        assert!(parsed.builtin_tag().is_none());
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        assert_eq!(
            "user-login".parse::<EventType>(),
            Err(UnknownEventType("user-login".into()))
        );
        assert!("custom:".parse::<EventType>().is_err());
        assert_eq!(
            "custom:user-login".parse::<EventType>(),
            Ok(EventType::Custom("user-login".into()))
        );
    }

    #[test]
    fn test_document_event_kinds() {
        assert!(EventType::DocumentSave.is_document_event());
        assert!(EventType::DocumentUpdate.is_document_event());
        assert!(EventType::DocumentDelete.is_document_event());
        assert!(!EventType::CommentAdded.is_document_event());
        assert!(DOCUMENT_EVENTS.iter().all(EventType::is_document_event));
    }

    #[test]
    fn test_local_document_event_accessors() {
        let doc = Document::new(DocumentReference::new("demo", "Main", "Welcome"));
        let event = LocalEvent::document(EventType::DocumentSave, doc, WikiContext::new("demo"));

        assert_eq!(event.source.kind(), "document");
        assert!(event.source.as_document().is_some());
        assert!(event.source.as_received().is_none());
        assert_eq!(event.data.as_context().unwrap().database, "demo");
    }
}
