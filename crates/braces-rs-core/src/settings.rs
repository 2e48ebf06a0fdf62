//! Settings for braces-rs.
//!
//! [`Settings`] holds the defaults every behavior falls back to when its own
//! builder does not override them (login URL, page size, timestamp format,
//! JSON indentation, ...). [`SETTINGS`] is a globally-accessible, lazily
//! configured instance; [`Settings::current`] reads it or falls back to the
//! defaults.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The complete set of braces-rs settings.
///
/// # Examples
///
/// ```
/// use braces_rs_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.login_url, "/accounts/login/");
/// assert_eq!(settings.timestamp_format, "%Y-%m-%d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,
    /// The log level filter (e.g. "info", "debug", "braces_rs_views=trace").
    pub log_level: String,

    // ── Access guards ────────────────────────────────────────────────

    /// Where guards send principals that fail a check.
    pub login_url: String,
    /// Query parameter carrying the original path on a login redirect.
    pub redirect_field_name: String,

    // ── Listing ──────────────────────────────────────────────────────

    /// Default page size for list workflows; `None` disables pagination.
    pub paginate_by: Option<usize>,
    /// Query parameter holding the requested page number.
    pub page_kwarg: String,

    // ── Downloads ────────────────────────────────────────────────────

    /// `strftime` format used for filename timestamps.
    pub timestamp_format: String,
    /// Default JSON indentation; `None` or `Some(0)` means compact output.
    pub json_indent: Option<usize>,

    // ── Templates ────────────────────────────────────────────────────

    /// Base template extended by regular page requests.
    pub default_extend_template: String,
    /// Base template extended by AJAX (modal) requests.
    pub modal_extend_template: String,

    // ── Escape hatch ─────────────────────────────────────────────────

    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            login_url: "/accounts/login/".to_string(),
            redirect_field_name: "next".to_string(),
            paginate_by: None,
            page_kwarg: "page".to_string(),
            timestamp_format: "%Y-%m-%d".to_string(),
            json_indent: None,
            default_extend_template: "base.html".to_string(),
            modal_extend_template: "base_modal.html".to_string(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the globally configured settings, or the defaults if
    /// [`SETTINGS`] has not been configured.
    pub fn current() -> Self {
        SETTINGS.try_get().cloned().unwrap_or_default()
    }
}

/// A lazily-initialized, globally-accessible settings container.
///
/// Call [`configure`](LazySettings::configure) once at startup, then use
/// [`get`](LazySettings::get) to access the settings.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, if any.
    pub fn try_get(&self) -> Option<&Settings> {
        self.inner.get()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();
