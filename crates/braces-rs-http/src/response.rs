//! The response every workflow produces.
//!
//! [`ResponseEnvelope`] is deliberately small: a status, a case-insensitive
//! header map, and a fully materialized body. It converts into an `axum`
//! response via [`IntoResponse`].

use axum::response::IntoResponse;
use bytes::Bytes;
use http::header::{HeaderName, CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, StatusCode};

use braces_rs_core::{BracesError, BracesResult};

/// The body of a [`ResponseEnvelope`].
#[derive(Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// No body (redirects, HEAD-style answers).
    Empty,
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(t) => f
                .debug_tuple("Text")
                .field(&t.chars().take(100).collect::<String>())
                .finish(),
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
        }
    }
}

impl ResponseBody {
    /// Returns the body as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Text(t) => t.as_bytes(),
            Self::Bytes(b) => b,
        }
    }
}

/// A status code, headers, and body.
///
/// # Examples
///
/// ```
/// use braces_rs_http::ResponseEnvelope;
///
/// let response = ResponseEnvelope::redirect("/items/").unwrap();
/// assert_eq!(response.status(), http::StatusCode::FOUND);
/// assert_eq!(response.header("location"), Some("/items/"));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl ResponseEnvelope {
    /// Creates an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Creates a 200 response with an HTML body.
    pub fn ok_html(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_static_header(CONTENT_TYPE, "text/html; charset=utf-8")
            .with_body(ResponseBody::Text(body.into()))
    }

    /// Creates a 302 Found redirect to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if `url` cannot be sent
    /// as a `Location` header.
    pub fn redirect(url: &str) -> BracesResult<Self> {
        let value = HeaderValue::from_str(url).map_err(|_| {
            BracesError::ImproperlyConfigured(format!(
                "Redirect URL {url:?} is not a valid Location header"
            ))
        })?;
        let mut response = Self::new(StatusCode::FOUND);
        response.headers.insert(LOCATION, value);
        Ok(response)
    }

    /// Creates a plain-text response with the given status.
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_static_header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .with_body(ResponseBody::Text(body.into()))
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::text(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(body: impl Into<String>) -> Self {
        Self::text(StatusCode::FORBIDDEN, body)
    }

    /// Creates a 405 response listing the permitted methods in `Allow`.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allowed = permitted_methods.join(", ");
        let mut response = Self::text(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allowed}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Maps an error to a response through [`BracesError::status_code`].
    ///
    /// Server errors get a generic body so internal details are not leaked.
    pub fn from_error(error: &BracesError) -> Self {
        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %error, "request failed");
            Self::text(status, "Internal Server Error")
        } else {
            Self::text(status, error.to_string())
        }
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Replaces the status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    fn with_static_header(mut self, name: HeaderName, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Sets a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if `value` contains
    /// characters not allowed in a header.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> BracesResult<()> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            BracesError::ImproperlyConfigured(format!("Invalid value for header '{name}': {value:?}"))
        })?;
        self.headers.insert(name, header_value);
        Ok(())
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as a string, matching the name case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the body.
    pub const fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Returns the body as text, lossily decoding bytes.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(self.body.as_bytes()).into_owned()
    }
}

impl IntoResponse for ResponseEnvelope {
    fn into_response(self) -> axum::response::Response {
        let body = match self.body {
            ResponseBody::Empty => axum::body::Body::empty(),
            ResponseBody::Text(text) => axum::body::Body::from(text),
            ResponseBody::Bytes(bytes) => axum::body::Body::from(bytes),
        };
        let mut response = axum::response::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
