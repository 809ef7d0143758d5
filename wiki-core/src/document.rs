use serde::{Deserialize, Serialize};
use std::fmt;

/// Version assigned to a document the first time it is saved.
pub const INITIAL_VERSION: &str = "1.1";

/// Three-part hierarchical name of a wiki page.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct DocumentReference {
    pub wiki: String,
    pub space: String,
    pub page: String,
}

impl DocumentReference {
    pub fn new(
        wiki: impl Into<String>,
        space: impl Into<String>,
        page: impl Into<String>,
    ) -> Self {
        Self {
            wiki: wiki.into(),
            space: space.into(),
            page: page.into(),
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}.{}", self.wiki, self.space, self.page)
    }
}

/// A stored version of a document translation.
///
/// Version and language always travel together: a document either has a
/// revision (it exists in storage) or it has neither.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Revision {
    pub version: String,
    /// Empty for the default translation
    pub language: String,
}

impl Revision {
    pub fn new(version: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            language: language.into(),
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.language.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{} ({})", self.version, self.language)
        }
    }
}

/// Full, sender-side document.
///
/// `original` is the state the document had before the pending mutation.
/// It is absent when nothing was ever stored for this page.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Document {
    reference: DocumentReference,
    version: String,
    language: String,
    content: String,
    is_new: bool,
    original: Option<Box<Document>>,
}

impl Document {
    /// A document that has never been saved.
    pub fn new(reference: DocumentReference) -> Self {
        Self {
            reference,
            version: INITIAL_VERSION.to_string(),
            language: String::new(),
            content: String::new(),
            is_new: true,
            original: None,
        }
    }

    /// A document already present in storage at `version`.
    pub fn existing(
        reference: DocumentReference,
        version: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            reference,
            version: version.into(),
            language: language.into(),
            content: String::new(),
            is_new: false,
            original: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_original(mut self, original: Document) -> Self {
        self.set_original(original);
        self
    }

    pub fn reference(&self) -> &DocumentReference {
        &self.reference
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Stored revision, or `None` while the document is new.
    pub fn revision(&self) -> Option<Revision> {
        if self.is_new {
            None
        } else {
            Some(Revision::new(self.version.clone(), self.language.clone()))
        }
    }

    pub fn original(&self) -> Option<&Document> {
        self.original.as_deref()
    }

    pub fn set_original(&mut self, original: Document) {
        // The original is a single step back; it never chains further.
        let mut original = original;
        original.original = None;
        self.original = Some(Box::new(original));
    }

    pub fn take_original(&mut self) -> Option<Document> {
        self.original.take().map(|doc| *doc)
    }

    /// Marks the document as stored at `version`.
    pub fn mark_saved(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.is_new = false;
    }

    /// Version the next save of this document receives.
    ///
    /// New documents get [`INITIAL_VERSION`]; saved ones bump the minor
    /// component (`1.4` → `1.5`). Returns `None` when the version is not
    /// `major.minor` or the minor component cannot be bumped.
    pub fn next_version(&self) -> Option<String> {
        if self.is_new {
            return Some(INITIAL_VERSION.to_string());
        }
        let (major, minor) = self.version.split_once('.')?;
        let major = major.parse::<u32>().ok()?;
        let minor = minor.parse::<u32>().ok()?.checked_add(1)?;
        Some(format!("{major}.{minor}"))
    }
}
