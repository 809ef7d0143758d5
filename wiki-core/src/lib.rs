//! # wiki-core — document model shared by every wiki node
//!
//! - [`document`] — references, revisions and full documents
//! - [`context`] — request-scoped execution context
//! - [`store`] — document storage seam and an in-memory store

pub mod context;
pub mod document;
pub mod store;

pub use context::{WikiContext, MAIN_WIKI};
pub use document::{Document, DocumentReference, Revision, INITIAL_VERSION};
pub use store::{DocumentStore, InMemoryDocumentStore, StoreError};
