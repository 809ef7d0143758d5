//! Ordered converter dispatch.

use std::sync::Arc;
use wiki_core::WikiContext;

use crate::converter::{ConvertError, DocumentEventConverter, EventConverter};
use crate::event::LocalEvent;
use crate::protocol::RemoteEventData;

/// Offers events to converters in registration order; the first claim wins.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: Vec<Arc<dyn EventConverter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in converters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocumentEventConverter::new()));
        registry
    }

    pub fn register(&mut self, converter: Arc<dyn EventConverter>) {
        log::debug!("Registered event converter '{}'", converter.name());
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Remote form of `local`, `Ok(None)` if no converter claims it.
    pub fn to_remote(&self, local: &LocalEvent) -> Result<Option<RemoteEventData>, ConvertError> {
        for converter in &self.converters {
            if let Some(remote) = converter.to_remote(local)? {
                log::debug!("Converter '{}' claimed local {} event", converter.name(), local.event);
                return Ok(Some(remote));
            }
        }
        log::debug!("No converter for local {} event", local.event);
        Ok(None)
    }

    /// Local form of `remote`, `Ok(None)` if no converter claims it.
    pub fn from_remote(
        &self,
        remote: &RemoteEventData,
        context: &WikiContext,
    ) -> Result<Option<LocalEvent>, ConvertError> {
        for converter in &self.converters {
            if let Some(local) = converter.from_remote(remote, context)? {
                log::debug!("Converter '{}' claimed remote {} event", converter.name(), remote.event);
                return Ok(Some(local));
            }
        }
        log::debug!("No converter for remote {} event", remote.event);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventData, EventSource, EventType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiki_core::{Document, DocumentReference};

    /// Claims comment events and counts how often it was asked.
    #[derive(Default)]
    struct CommentConverter {
        offered: AtomicUsize,
    }

    impl EventConverter for CommentConverter {
        fn name(&self) -> &str {
            "comment"
        }

        fn to_remote(&self, local: &LocalEvent) -> Result<Option<RemoteEventData>, ConvertError> {
            self.offered.fetch_add(1, Ordering::SeqCst);
            if local.event != EventType::CommentAdded {
                return Ok(None);
            }
            let EventSource::Document(doc) = &local.source else {
                return Ok(None);
            };
            Ok(Some(RemoteEventData {
                event: local.event.clone(),
                source: self.serialize_document(doc),
                data: self.serialize_context(&WikiContext::default()),
            }))
        }

        fn from_remote(
            &self,
            remote: &RemoteEventData,
            context: &WikiContext,
        ) -> Result<Option<LocalEvent>, ConvertError> {
            self.offered.fetch_add(1, Ordering::SeqCst);
            if remote.event != EventType::CommentAdded {
                return Ok(None);
            }
            Ok(Some(LocalEvent::new(
                remote.event.clone(),
                EventSource::Received(Box::new(self.deserialize_document(&remote.source))),
                EventData::Context(context.clone()),
            )))
        }
    }

    fn event(kind: EventType) -> LocalEvent {
        LocalEvent::document(
            kind,
            Document::new(DocumentReference::new("demo", "Main", "Welcome")),
            WikiContext::new("demo"),
        )
    }

    #[test]
    fn test_empty_registry_claims_nothing() {
        let registry = ConverterRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.to_remote(&event(EventType::DocumentSave)).unwrap().is_none());
    }

    #[test]
    fn test_defaults_contain_document_converter() {
        let registry = ConverterRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["document"]);
    }

    #[test]
    fn test_first_claim_wins() {
        let comments = Arc::new(CommentConverter::default());
        let mut registry = ConverterRegistry::with_defaults();
        registry.register(comments.clone());

        // Claimed by the document converter: the second one is never asked.
        let remote = registry.to_remote(&event(EventType::DocumentSave)).unwrap();
        assert!(remote.is_some());
        assert_eq!(comments.offered.load(Ordering::SeqCst), 0);

        let remote = registry.to_remote(&event(EventType::CommentAdded)).unwrap().unwrap();
        assert_eq!(remote.event, EventType::CommentAdded);
        assert_eq!(comments.offered.load(Ordering::SeqCst), 1);

        let local = registry
            .from_remote(&remote, &WikiContext::new("main"))
            .unwrap()
            .unwrap();
        assert_eq!(local.event, EventType::CommentAdded);
    }

    #[test]
    fn test_unclaimed_by_all() {
        let mut registry = ConverterRegistry::with_defaults();
        registry.register(Arc::new(CommentConverter::default()));
        assert!(registry
            .to_remote(&event(EventType::AttachmentAdded))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_conversion_error_propagates() {
        let registry = ConverterRegistry::with_defaults();
        let broken = LocalEvent::new(EventType::DocumentDelete, EventSource::None, EventData::None);
        assert!(registry.to_remote(&broken).is_err());
    }
}
