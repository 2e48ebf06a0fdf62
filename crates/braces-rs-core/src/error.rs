//! Core error types for braces-rs.
//!
//! [`BracesError`] covers the five error families a request-handling behavior
//! can run into: configuration errors (raised when a component is composed),
//! access errors, validation errors, resource errors, and lookup errors. Each
//! variant maps to an HTTP status code via [`BracesError::status_code`] so the
//! host framework's generic error handling can turn it into a response.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A validation failure carrying per-field error messages.
///
/// Field errors keep their insertion order per field, so the first message
/// reported for a field stays first when re-rendered.
///
/// # Examples
///
/// ```
/// use braces_rs_core::error::ValidationError;
///
/// let err = ValidationError::new()
///     .with_field_error("title", "This field is required.")
///     .with_field_error("title", "Too short.");
/// assert_eq!(err.messages_for("title").len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// Per-field error messages, keyed by field name.
    pub field_errors: HashMap<String, Vec<String>>,
}

impl ValidationError {
    /// Creates an empty `ValidationError`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `ValidationError` from an existing error map.
    pub fn from_errors(field_errors: HashMap<String, Vec<String>>) -> Self {
        Self { field_errors }
    }

    /// Appends a message to the given field's error list.
    #[must_use]
    pub fn with_field_error(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.field_errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Returns the messages recorded for a field, or an empty slice.
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.field_errors.get(field).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if no field has an error.
    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.field_errors.keys().collect();
        fields.sort();
        let mut first = true;
        for field in fields {
            for message in &self.field_errors[field] {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for braces-rs.
#[derive(Error, Debug)]
pub enum BracesError {
    // ── Configuration ────────────────────────────────────────────────

    /// A component is missing a required attribute or extension point.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// Settings could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Access ───────────────────────────────────────────────────────

    /// HTTP 403 Forbidden / Permission Denied.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 405 Method Not Allowed.
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    // ── Lookup ───────────────────────────────────────────────────────

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lookup expected exactly one object but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Resources ────────────────────────────────────────────────────

    /// Reading or releasing a streaming payload failed.
    #[error("Resource error: {0}")]
    Resource(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ── Collaborators ────────────────────────────────────────────────

    /// A value could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The template renderer failed.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// The persistence collaborator failed.
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BracesError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `ValidationError` -> 400
    /// - `PermissionDenied` -> 403
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - `MethodNotAllowed` -> 405
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::MethodNotAllowed(_) => 405,
            Self::ImproperlyConfigured(_)
            | Self::ConfigurationError(_)
            | Self::Resource(_)
            | Self::Io(_)
            | Self::SerializationError(_)
            | Self::TemplateError(_)
            | Self::DatabaseError(_) => 500,
        }
    }

    /// Returns `true` for programmer errors raised while composing a component.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ImproperlyConfigured(_) | Self::ConfigurationError(_))
    }
}

impl From<serde_json::Error> for BracesError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, BracesError>`.
pub type BracesResult<T> = Result<T, BracesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display_sorted_by_field() {
        let err = ValidationError::new()
            .with_field_error("title", "Required.")
            .with_field_error("body", "Too long.");
        assert_eq!(err.to_string(), "body: Too long.; title: Required.");
    }

    #[test]
    fn test_validation_error_keeps_message_order() {
        let err = ValidationError::new()
            .with_field_error("name", "first")
            .with_field_error("name", "second");
        assert_eq!(err.messages_for("name"), ["first", "second"]);
        assert!(err.messages_for("other").is_empty());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(BracesError::PermissionDenied("x".into()).status_code(), 403);
        assert_eq!(BracesError::NotFound("x".into()).status_code(), 404);
        assert_eq!(BracesError::DoesNotExist("x".into()).status_code(), 404);
        assert_eq!(BracesError::MethodNotAllowed("x".into()).status_code(), 405);
        assert_eq!(
            BracesError::ValidationError(ValidationError::new()).status_code(),
            400
        );
        assert_eq!(BracesError::ImproperlyConfigured("x".into()).status_code(), 500);
        assert_eq!(BracesError::Resource("x".into()).status_code(), 500);
    }

    #[test]
    fn test_configuration_error_classification() {
        assert!(BracesError::ImproperlyConfigured("x".into()).is_configuration_error());
        assert!(!BracesError::NotFound("x".into()).is_configuration_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: BracesError = io_err.into();
        assert_eq!(err.status_code(), 500);
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BracesError = json_err.into();
        assert!(matches!(err, BracesError::SerializationError(_)));
    }
}
