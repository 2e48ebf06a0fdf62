//! The per-request input every behavior reads.
//!
//! [`RequestContext`] is built once at request entry, either from an
//! `http::Request` via [`RequestContext::from_http`] or through the
//! [`RequestContextBuilder`], and is never mutated afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::{HeaderMap, Method};

use crate::principal::{AnonymousUser, Principal};
use crate::querydict::QueryDict;

/// The two verb families workflows distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    /// GET and HEAD.
    Read,
    /// POST and PUT.
    Mutate,
}

impl RequestMethod {
    /// Classifies an HTTP method, returning `None` for verbs workflows do not
    /// handle.
    pub fn classify(method: &Method) -> Option<Self> {
        if method == Method::GET || method == Method::HEAD {
            Some(Self::Read)
        } else if method == Method::POST || method == Method::PUT {
            Some(Self::Mutate)
        } else {
            None
        }
    }
}

/// An immutable view of the incoming request.
///
/// # Examples
///
/// ```
/// use braces_rs_http::RequestContext;
///
/// let request = RequestContext::builder()
///     .path("/projects/4/tasks/")
///     .query_string("page=2")
///     .param("project_id", "4")
///     .build();
///
/// assert_eq!(request.param("project_id"), Some("4"));
/// assert_eq!(request.query().get("page"), Some("2"));
/// assert_eq!(request.get_full_path(), "/projects/4/tasks/?page=2");
/// ```
#[derive(Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    query_string: String,
    query: QueryDict,
    data: QueryDict,
    params: HashMap<String, String>,
    headers: HeaderMap,
    principal: Arc<dyn Principal>,
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query_string", &self.query_string)
            .field("params", &self.params)
            .field("principal", &self.principal.username())
            .finish_non_exhaustive()
    }
}

impl RequestContext {
    /// Creates a new [`RequestContextBuilder`].
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    /// Creates a `RequestContext` from the parts of an `http::Request`.
    ///
    /// The body is parsed into [`data`](Self::data) only when it is
    /// `application/x-www-form-urlencoded`.
    pub fn from_http(
        parts: http::request::Parts,
        body: &[u8],
        params: HashMap<String, String>,
        principal: Arc<dyn Principal>,
    ) -> Self {
        let query_string = parts.uri.query().unwrap_or("").to_string();
        let data = if is_form_encoded(&parts.headers) {
            QueryDict::parse(&String::from_utf8_lossy(body))
        } else {
            QueryDict::new()
        };

        Self {
            query: QueryDict::parse(&query_string),
            method: parts.method,
            path: parts.uri.path().to_string(),
            query_string,
            data,
            params,
            headers: parts.headers,
            principal,
        }
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a copy of this request carrying `method` instead.
    #[must_use]
    pub fn with_method(&self, method: Method) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }

    /// Returns the verb family, or `None` for unsupported methods.
    pub fn kind(&self) -> Option<RequestMethod> {
        RequestMethod::classify(&self.method)
    }

    /// Returns the request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the path including the query string.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Returns the query-string parameters.
    pub const fn query(&self) -> &QueryDict {
        &self.query
    }

    /// Returns the submitted form data.
    pub const fn data(&self) -> &QueryDict {
        &self.data
    }

    /// Returns all route parameters.
    pub const fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns a single route parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the principal the request acts for.
    pub fn principal(&self) -> &dyn Principal {
        self.principal.as_ref()
    }

    /// Returns `true` if the request carries `X-Requested-With: XMLHttpRequest`.
    pub fn is_ajax(&self) -> bool {
        self.headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Fluent builder for [`RequestContext`], used by tests and adapters.
#[derive(Debug)]
pub struct RequestContextBuilder {
    method: Method,
    path: String,
    query_string: String,
    data: QueryDict,
    params: HashMap<String, String>,
    headers: HeaderMap,
    principal: Option<Arc<dyn Principal>>,
}

impl Default for RequestContextBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            data: QueryDict::new(),
            params: HashMap::new(),
            headers: HeaderMap::new(),
            principal: None,
        }
    }
}

impl RequestContextBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without the leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the submitted form data.
    #[must_use]
    pub fn data(mut self, data: QueryDict) -> Self {
        self.data = data;
        self
    }

    /// Adds a route parameter.
    #[must_use]
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Adds a header. Invalid names or values are ignored.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the principal. Defaults to [`AnonymousUser`].
    #[must_use]
    pub fn principal(mut self, principal: Arc<dyn Principal>) -> Self {
        self.principal = Some(principal);
        self
    }

    /// Builds the [`RequestContext`].
    pub fn build(self) -> RequestContext {
        RequestContext {
            query: QueryDict::parse(&self.query_string),
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            data: self.data,
            params: self.params,
            headers: self.headers,
            principal: self
                .principal
                .unwrap_or_else(|| Arc::new(AnonymousUser)),
        }
    }
}
