//! Document storage seam.
//!
//! Remote events never carry document content. A receiving node rebuilds
//! content from its own storage, keyed by reference and revision, so every
//! node must see the same backing store (shared or replicated).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::document::{Document, DocumentReference, Revision, INITIAL_VERSION};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Document {reference} not found at version {version} (language: {language:?})")]
    NotFound {
        reference: DocumentReference,
        version: String,
        language: String,
    },
    #[error("Document {reference} has version {version:?}, which cannot be incremented")]
    InvalidVersion {
        reference: DocumentReference,
        version: String,
    },
    #[error("Document {reference} already has a revision {version} (language: {language:?})")]
    RevisionExists {
        reference: DocumentReference,
        version: String,
        language: String,
    },
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(e: PoisonError<T>) -> Self {
        StoreError::Poisoned(e.to_string())
    }
}

/// Read access to stored document revisions.
pub trait DocumentStore: Send + Sync {
    fn fetch_document(
        &self,
        reference: &DocumentReference,
        revision: &Revision,
    ) -> Result<Document, StoreError>;
}

#[derive(Default)]
struct StoreState {
    /// Every stored revision, without its `original` link
    revisions: HashMap<(DocumentReference, Revision), Document>,
    /// Current version per (reference, language)
    latest: HashMap<(DocumentReference, String), String>,
}

/// Revision-keeping store held in memory.
///
/// Deleting a document only drops its current pointer; older revisions stay
/// fetchable the way a recycle bin keeps history.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    state: RwLock<StoreState>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, StoreError> {
        Ok(self.state.read()?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, StoreError> {
        Ok(self.state.write()?)
    }

    /// Stores `document` as-is at its current revision and makes it the
    /// latest one. New documents are stored at [`INITIAL_VERSION`].
    pub fn insert(&self, document: Document) -> Result<(), StoreError> {
        let mut stored = document;
        stored.take_original();
        if stored.is_new() {
            stored.mark_saved(INITIAL_VERSION);
        }

        let reference = stored.reference().clone();
        let language = stored.language().to_string();
        let version = stored.version().to_string();

        let mut state = self.write()?;
        state.revisions.insert(
            (reference.clone(), Revision::new(version.clone(), language.clone())),
            stored,
        );
        state.latest.insert((reference, language), version);
        Ok(())
    }

    /// Saves a new revision of `document`.
    ///
    /// The returned document carries its assigned version and, when a
    /// revision already existed, that revision as its original. Stored
    /// revisions are never replaced: a latest version that cannot be bumped,
    /// or a bump that lands on an existing revision, is an error.
    pub fn save(&self, document: Document) -> Result<Document, StoreError> {
        let mut document = document;
        let reference = document.reference().clone();
        let language = document.language().to_string();

        let mut state = self.write()?;
        let previous = state
            .latest
            .get(&(reference.clone(), language.clone()))
            .and_then(|version| {
                state
                    .revisions
                    .get(&(reference.clone(), Revision::new(version.clone(), language.clone())))
            })
            .cloned();

        let version = match &previous {
            Some(previous) => {
                previous
                    .next_version()
                    .ok_or_else(|| StoreError::InvalidVersion {
                        reference: reference.clone(),
                        version: previous.version().to_string(),
                    })?
            }
            None => INITIAL_VERSION.to_string(),
        };
        let key = (reference.clone(), Revision::new(version.clone(), language.clone()));
        if state.revisions.contains_key(&key) {
            return Err(StoreError::RevisionExists {
                reference,
                version,
                language,
            });
        }

        document.take_original();
        document.mark_saved(version.clone());

        let stored = document.clone();
        if let Some(previous) = previous {
            document.set_original(previous);
        }

        state.revisions.insert(key, stored);
        state.latest.insert((reference.clone(), language), version.clone());

        log::debug!("Saved {reference} at version {version}");
        Ok(document)
    }

    /// Drops the current revision pointer and returns that revision.
    pub fn delete(
        &self,
        reference: &DocumentReference,
        language: &str,
    ) -> Result<Option<Document>, StoreError> {
        let mut state = self.write()?;
        let Some(version) = state
            .latest
            .remove(&(reference.clone(), language.to_string()))
        else {
            return Ok(None);
        };
        let deleted = state
            .revisions
            .get(&(reference.clone(), Revision::new(version, language)))
            .cloned();
        log::debug!("Deleted {reference}");
        Ok(deleted)
    }

    /// Current revision of a document translation, if any.
    pub fn latest(
        &self,
        reference: &DocumentReference,
        language: &str,
    ) -> Result<Option<Document>, StoreError> {
        let state = self.read()?;
        Ok(state
            .latest
            .get(&(reference.clone(), language.to_string()))
            .and_then(|version| {
                state
                    .revisions
                    .get(&(reference.clone(), Revision::new(version.clone(), language)))
            })
            .cloned())
    }

    /// Number of stored revisions.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.revisions.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn fetch_document(
        &self,
        reference: &DocumentReference,
        revision: &Revision,
    ) -> Result<Document, StoreError> {
        let state = self.read()?;
        state
            .revisions
            .get(&(reference.clone(), revision.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                reference: reference.clone(),
                version: revision.version.clone(),
                language: revision.language.clone(),
            })
    }
}
