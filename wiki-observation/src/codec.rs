//! Minimal encoding of execution contexts and document identities.
//!
//! Lossy on purpose: only what a receiver needs to scope its own processing
//! and to rebuild a placeholder crosses the wire.

use wiki_core::{Document, WikiContext};

use crate::placeholder::{DocumentPlaceholder, LazyDocument};
use crate::protocol::{ContextData, DocumentIdentity};

/// Extracts tenant and acting user; nothing else is ever transmitted.
pub fn encode_context(context: &WikiContext) -> ContextData {
    ContextData {
        wiki: context.database.clone(),
        user: context.user.clone(),
    }
}

/// Applies received tenant and user onto the receiver's live context.
///
/// Every other field of `live` is kept. Applying the same data twice yields
/// the same context as applying it once.
pub fn decode_context(data: &ContextData, live: &WikiContext) -> WikiContext {
    let mut context = live.clone();
    context.database = data.wiki.clone();
    context.user = data.user.clone();
    context
}

/// Identity of `document`; the revision is omitted while it is new.
pub fn encode_document_identity(document: &Document) -> DocumentIdentity {
    DocumentIdentity::new(document.reference().clone(), document.revision())
}

/// Placeholder for an identity. No storage access happens here.
pub fn decode_document_identity(identity: &DocumentIdentity) -> DocumentPlaceholder {
    match &identity.revision {
        None => DocumentPlaceholder::New(identity.reference.clone()),
        Some(revision) => DocumentPlaceholder::Lazy(LazyDocument::new(
            identity.reference.clone(),
            revision.clone(),
        )),
    }
}
