use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default tenant of a single-wiki installation.
pub const MAIN_WIKI: &str = "xwiki";

/// Request-scoped execution state.
///
/// One instance belongs to one processing unit (a request, or one incoming
/// remote event); it is passed explicitly rather than looked up ambiently.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct WikiContext {
    /// Selected wiki (tenant) database
    pub database: String,
    /// Acting principal; `None` for guests
    pub user: Option<String>,
    /// Interface language of the request
    pub language: Option<String>,
    /// Action being executed (`view`, `save`, ...)
    pub action: Option<String>,
    /// Free-form request attributes
    pub properties: HashMap<String, String>,
}

impl Default for WikiContext {
    fn default() -> Self {
        Self::new(MAIN_WIKI)
    }
}

impl WikiContext {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            user: None,
            language: None,
            action: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_guest(&self) -> bool {
        self.user.is_none()
    }
}
