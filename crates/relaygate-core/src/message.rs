use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A message handed to a module's receive entry point.
///
/// Payload formats are opaque to the gateway; properties are free-form
/// string pairs used by modules for routing and filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub content: Vec<u8>,
}

impl Message {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            properties: BTreeMap::new(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
