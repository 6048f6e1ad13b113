//! Settings type definitions.
//!
//! All types use camelCase JSON and `#[serde(default)]`, so a partial file
//! only needs the keys it overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Protocol version advertised in `initialize`.
pub const DEFAULT_PROTOCOL_VERSION: u16 = 1;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub agent: AgentSettings,
    pub runtime: RuntimeSettings,
    pub logging: LoggingSettings,
}

/// What the agent advertises to clients and how it names new sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    pub protocol_version: u16,
    /// Whether `session/load` is advertised.
    pub load_session: bool,
    /// Whether prompts may carry embedded resources.
    pub embedded_context: bool,
    /// Title given to sessions created over the protocol.
    pub session_title: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            protocol_version: DEFAULT_PROTOCOL_VERSION,
            load_session: false,
            embedded_context: false,
            session_title: "new acp session".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    /// Capacity of each run's event channel. A subscriber that falls further
    /// behind skips intermediate snapshots.
    pub event_buffer_size: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            event_buffer_size: 256,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`..`error`). `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Per-module level overrides, e.g. `{"relay_acp": "debug"}`.
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
            modules: BTreeMap::new(),
        }
    }
}
