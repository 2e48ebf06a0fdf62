//! Settings loading from configuration files and the environment.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Deep-merge a TOML or JSON file over the defaults.
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `BRACES_DEBUG` | `debug` |
//! | `BRACES_LOG_LEVEL` | `log_level` |
//! | `BRACES_LOGIN_URL` | `login_url` |
//! | `BRACES_REDIRECT_FIELD_NAME` | `redirect_field_name` |
//! | `BRACES_PAGINATE_BY` | `paginate_by` (empty or `0` disables) |
//! | `BRACES_PAGE_KWARG` | `page_kwarg` |
//! | `BRACES_TIMESTAMP_FORMAT` | `timestamp_format` |
//! | `BRACES_JSON_INDENT` | `json_indent` |
//!
//! ```rust,no_run
//! use braces_rs_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/braces.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::BracesError;
use crate::settings::Settings;

/// Loads settings from a TOML string, keeping defaults for absent keys.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, BracesError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| BracesError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;
    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, BracesError> {
    from_toml_str(&read_file(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, BracesError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string, keeping defaults for absent keys.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, BracesError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| BracesError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;
    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, BracesError> {
    from_json_str(&read_file(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `BRACES_*` environment variable overrides to a settings struct.
///
/// Unparseable numeric values are ignored and the previous value is kept.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |key| std::env::var(key).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(val) = lookup("BRACES_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("BRACES_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("BRACES_LOGIN_URL") {
        settings.login_url = val;
    }

    if let Some(val) = lookup("BRACES_REDIRECT_FIELD_NAME") {
        settings.redirect_field_name = val;
    }

    if let Some(val) = lookup("BRACES_PAGINATE_BY") {
        let trimmed = val.trim();
        if trimmed.is_empty() || trimmed == "0" {
            settings.paginate_by = None;
        } else if let Ok(size) = trimmed.parse::<usize>() {
            settings.paginate_by = Some(size);
        }
    }

    if let Some(val) = lookup("BRACES_PAGE_KWARG") {
        settings.page_kwarg = val;
    }

    if let Some(val) = lookup("BRACES_TIMESTAMP_FORMAT") {
        settings.timestamp_format = val;
    }

    if let Some(val) = lookup("BRACES_JSON_INDENT") {
        if let Ok(indent) = val.trim().parse::<usize>() {
            settings.json_indent = (indent > 0).then_some(indent);
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn read_file(path: &Path, kind: &str) -> Result<String, BracesError> {
    std::fs::read_to_string(path).map_err(|e| {
        BracesError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, BracesError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        BracesError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;
    serde_json::from_value(merge_json(default_json, value)).map_err(|e| {
        BracesError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
