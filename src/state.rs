//! Persisted adapter state
//!
//! The host persists a small JSON map across invocations. This core only
//! requires an app-version marker; anything that does not look like a map
//! is reset to the default shape on load. State load and save are explicit
//! values passed across the adapter boundary, not lifecycle hooks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdapterState {
    pub app_version: String,
}

impl AdapterState {
    pub fn new(app_version: impl Into<String>) -> Self {
        Self {
            app_version: app_version.into(),
        }
    }

    /// Interprets a persisted value, falling back to a fresh state carrying
    /// `app_version` when the stored shape is unusable.
    pub fn load(persisted: Option<Value>, app_version: &str) -> Self {
        match persisted.and_then(|v| serde_json::from_value::<AdapterState>(v).ok()) {
            Some(state) => state,
            None => {
                debug!("resetting persisted state to the default format");
                AdapterState::new(app_version)
            }
        }
    }

    /// The value handed back to the host for persistence.
    pub fn save(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
