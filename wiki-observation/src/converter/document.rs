use wiki_core::WikiContext;

use super::{ConvertError, EventConverter};
use crate::event::{EventData, EventSource, EventType, LocalEvent, DOCUMENT_EVENTS};
use crate::protocol::RemoteEventData;

/// Replicates document save, update and delete events.
///
/// Receivers get placeholders instead of documents and have the sender's
/// wiki and user applied to their own context.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentEventConverter;

impl DocumentEventConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn events(&self) -> &'static [EventType] {
        &DOCUMENT_EVENTS
    }

    fn claims(event: &EventType) -> bool {
        event.is_document_event()
    }
}

impl EventConverter for DocumentEventConverter {
    fn name(&self) -> &str {
        "document"
    }

    fn to_remote(&self, local: &LocalEvent) -> Result<Option<RemoteEventData>, ConvertError> {
        if !Self::claims(&local.event) {
            return Ok(None);
        }

        let EventSource::Document(document) = &local.source else {
            return Err(ConvertError::UnexpectedSource {
                event: local.event.clone(),
                expected: "document",
                found: local.source.kind(),
            });
        };
        let EventData::Context(context) = &local.data else {
            return Err(ConvertError::UnexpectedData {
                event: local.event.clone(),
                expected: "context",
                found: local.data.kind(),
            });
        };

        Ok(Some(RemoteEventData {
            event: local.event.clone(),
            source: self.serialize_document(document),
            data: self.serialize_context(context),
        }))
    }

    fn from_remote(
        &self,
        remote: &RemoteEventData,
        context: &WikiContext,
    ) -> Result<Option<LocalEvent>, ConvertError> {
        if !Self::claims(&remote.event) {
            return Ok(None);
        }

        let document = self.deserialize_document(&remote.source);
        let context = self.deserialize_context(&remote.data, context);

        Ok(Some(LocalEvent::new(
            remote.event.clone(),
            EventSource::Received(Box::new(document)),
            EventData::Context(context),
        )))
    }
}
