//! # braces-rs-core
//!
//! Core types, settings, and error types shared by every braces-rs crate.
//! This crate has no HTTP or view dependencies.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result alias
//! - [`context`] - Rendering/serialization context values
//! - [`settings`] - Library settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML/JSON files and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod context;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use context::{Context, ContextValue};
pub use error::{BracesError, BracesResult, ValidationError};
pub use settings::{Settings, SETTINGS};
