//! Documents rebuilt on a receiving node.
//!
//! A placeholder carries identity only. Content of an existing revision is
//! loaded from the receiver's own storage through an explicit
//! [`LazyDocument::resolve`] call, never behind a field access.

use wiki_core::{Document, DocumentReference, DocumentStore, Revision, StoreError};

/// A stored revision whose content has not necessarily been loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyDocument {
    reference: DocumentReference,
    revision: Revision,
    content: Option<Document>,
}

impl LazyDocument {
    pub fn new(reference: DocumentReference, revision: Revision) -> Self {
        Self {
            reference,
            revision,
            content: None,
        }
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    pub fn version(&self) -> &str {
        &self.revision.version
    }

    pub fn language(&self) -> &str {
        &self.revision.language
    }

    pub fn is_resolved(&self) -> bool {
        self.content.is_some()
    }

    /// Loaded document, `None` until [`resolve`](Self::resolve) succeeded.
    pub fn content(&self) -> Option<&Document> {
        self.content.as_ref()
    }

    /// Fetches the revision from `store` on first call; later calls return
    /// the cached document.
    pub fn resolve(&mut self, store: &dyn DocumentStore) -> Result<&Document, StoreError> {
        let document = match self.content.take() {
            Some(document) => document,
            None => {
                let document = store.fetch_document(&self.reference, &self.revision)?;
                log::trace!("Resolved {} at {}", self.reference, self.revision);
                document
            }
        };
        let document: &Document = self.content.insert(document);
        Ok(document)
    }
}

/// One reconstructed document state.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentPlaceholder {
    /// Did not exist in storage yet; nothing to fetch
    New(DocumentReference),
    /// Exists in storage at a known revision
    Lazy(LazyDocument),
}

impl DocumentPlaceholder {
    pub fn reference(&self) -> &DocumentReference {
        match self {
            Self::New(reference) => reference,
            Self::Lazy(lazy) => lazy.reference(),
        }
    }

    pub fn revision(&self) -> Option<&Revision> {
        match self {
            Self::New(_) => None,
            Self::Lazy(lazy) => Some(lazy.revision()),
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }

    pub fn as_lazy(&self) -> Option<&LazyDocument> {
        match self {
            Self::Lazy(lazy) => Some(lazy),
            Self::New(_) => None,
        }
    }

    pub fn as_lazy_mut(&mut self) -> Option<&mut LazyDocument> {
        match self {
            Self::Lazy(lazy) => Some(lazy),
            Self::New(_) => None,
        }
    }
}

/// A reconstructed document linked to its prior revision.
///
/// `original` is `None` when the envelope named no prior revision, which
/// means "nothing to diff against", not necessarily "newly created".
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedDocument {
    pub current: DocumentPlaceholder,
    pub original: Option<DocumentPlaceholder>,
}

impl ReceivedDocument {
    pub fn new(current: DocumentPlaceholder, original: Option<DocumentPlaceholder>) -> Self {
        Self { current, original }
    }

    pub fn reference(&self) -> &DocumentReference {
        self.current.reference()
    }

    pub fn original(&self) -> Option<&DocumentPlaceholder> {
        self.original.as_ref()
    }

    /// Loads both the current and the prior revision where they exist.
    pub fn resolve_all(&mut self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        let states = std::iter::once(&mut self.current).chain(self.original.as_mut());
        for state in states {
            if let Some(lazy) = state.as_lazy_mut() {
                lazy.resolve(store)?;
            }
        }
        Ok(())
    }
}
