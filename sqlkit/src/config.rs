use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical name used when a session is built without an explicit connection
/// name.
pub const DEFAULT_CONNECTION: &str = "default";

/// Named connection strings.
///
/// Passed explicitly into providers; core logic never performs ambient
/// configuration lookups. Deserializable, so it can be loaded from whatever
/// configuration file the application uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStrings(HashMap<String, String>);

impl ConnectionStrings {
    pub fn new() -> Self {
        ConnectionStrings::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.0.insert(name.into(), url.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.insert(name, url);
        self
    }

    /// Resolve a connection string. Missing or blank entries are
    /// configuration errors.
    pub fn require(&self, name: &str) -> Result<&str, DataError> {
        match self.0.get(name) {
            Some(url) if !url.trim().is_empty() => Ok(url),
            Some(_) => Err(DataError::Configuration(format!(
                "connection string '{name}' is blank"
            ))),
            None => Err(DataError::Configuration(format!(
                "connection string '{name}' is not configured"
            ))),
        }
    }
}

impl From<HashMap<String, String>> for ConnectionStrings {
    fn from(map: HashMap<String, String>) -> Self {
        ConnectionStrings(map)
    }
}

impl FromIterator<(String, String)> for ConnectionStrings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        ConnectionStrings(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_resolves_configured_name() {
        let strings = ConnectionStrings::new().with("default", "sqlite::memory:");
        assert_eq!(strings.require("default").unwrap(), "sqlite::memory:");
    }

    #[test]
    fn missing_and_blank_are_configuration_errors() {
        let strings = ConnectionStrings::new().with("blank", "   ");
        assert!(matches!(
            strings.require("missing"),
            Err(DataError::Configuration(_))
        ));
        assert!(matches!(
            strings.require("blank"),
            Err(DataError::Configuration(_))
        ));
    }
}
