//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::RelaySettings;

/// Resolve the path to the settings file (`~/.relay/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".relay").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RelaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RelaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `RELAY_*` environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut RelaySettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Invalid values are ignored with a warning, keeping the file/default value.
pub fn apply_overrides(settings: &mut RelaySettings, lookup: impl Fn(&str) -> Option<String>) {
    let read_string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read_string("RELAY_LOG_LEVEL") {
        match parse_level(&v) {
            Some(level) => settings.logging.level = level,
            None => tracing::warn!(key = "RELAY_LOG_LEVEL", value = %v, "invalid log level env var, ignoring"),
        }
    }
    if let Some(v) = read_string("RELAY_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => tracing::warn!(key = "RELAY_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = read_string("RELAY_EVENT_BUFFER") {
        match parse_usize_range(&v, 1, 65_536) {
            Some(size) => settings.runtime.event_buffer_size = size,
            None => tracing::warn!(key = "RELAY_EVENT_BUFFER", value = %v, "invalid usize env var, ignoring"),
        }
    }
    if let Some(v) = read_string("RELAY_SESSION_TITLE") {
        settings.agent.session_title = v;
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Normalize a tracing level name.
pub fn parse_level(val: &str) -> Option<String> {
    let lower = val.to_lowercase();
    matches!(lower.as_str(), "trace" | "debug" | "info" | "warn" | "error").then_some(lower)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::SettingsError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = json!({"agent": {"loadSession": false, "protocolVersion": 1}});
        let source = json!({"agent": {"loadSession": true}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["agent"]["loadSession"], true);
        assert_eq!(merged["agent"]["protocolVersion"], 1);
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged["a"], 1);
    }

    #[test]
    fn merge_array_replace() {
        let merged = deep_merge(json!({"a": [1, 2, 3]}), json!({"a": [9]}));
        assert_eq!(merged["a"], json!([9]));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let merged = deep_merge(json!({"a": {"b": 1}}), json!({"a": 5}));
        assert_eq!(merged["a"], 5);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.agent, RelaySettings::default().agent);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"agent": {"sessionTitle": "zed session"}, "runtime": {"eventBufferSize": 32}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.agent.session_title, "zed session");
        assert_eq!(settings.runtime.event_buffer_size, 32);
        assert_eq!(settings.agent.protocol_version, 1);
    }

    #[test]
    fn load_module_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"logging": {"modules": {"relay_acp": "trace"}}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.logging.modules.get("relay_acp").map(String::as_str), Some("trace"));
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn overrides_apply_valid_values() {
        let mut settings = RelaySettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("RELAY_LOG_LEVEL", "DEBUG"),
                ("RELAY_LOG_JSON", "off"),
                ("RELAY_EVENT_BUFFER", "1024"),
                ("RELAY_SESSION_TITLE", "from env"),
            ]),
        );
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.logging.json);
        assert_eq!(settings.runtime.event_buffer_size, 1024);
        assert_eq!(settings.agent.session_title, "from env");
    }

    #[test]
    fn overrides_ignore_invalid_values() {
        let mut settings = RelaySettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("RELAY_LOG_LEVEL", "loud"),
                ("RELAY_LOG_JSON", "maybe"),
                ("RELAY_EVENT_BUFFER", "0"),
                ("RELAY_SESSION_TITLE", ""),
            ]),
        );
        assert_eq!(settings, RelaySettings::default());
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nah"), None);
        assert_eq!(parse_usize_range("10", 1, 100), Some(10));
        assert_eq!(parse_usize_range("101", 1, 100), None);
        assert_eq!(parse_usize_range("-1", 1, 100), None);
        assert_eq!(parse_level("WARN").as_deref(), Some("warn"));
        assert_eq!(parse_level("verbose"), None);
    }
}
