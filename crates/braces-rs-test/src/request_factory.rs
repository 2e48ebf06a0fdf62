//! Request factory for building [`RequestContext`] objects in tests.
//!
//! [`RequestFactory`] builds requests directly, bypassing routing and
//! authentication. Route parameters and the principal are set on the
//! factory and applied to every request it builds.
//!
//! ## Example
//!
//! ```rust
//! use braces_rs_test::request_factory::RequestFactory;
//!
//! let factory = RequestFactory::new().with_param("project_id", "3");
//! let request = factory.get("/projects/3/tasks/?page=2");
//! assert_eq!(request.method(), http::Method::GET);
//! assert_eq!(request.path(), "/projects/3/tasks/");
//! assert_eq!(request.query().get("page"), Some("2"));
//! assert_eq!(request.param("project_id"), Some("3"));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use braces_rs_http::{AnonymousUser, Principal, QueryDict, RequestContext, RequestContextBuilder};
use http::Method;

/// A factory for building [`RequestContext`] objects without a host framework.
#[derive(Debug, Clone)]
pub struct RequestFactory {
    /// Headers applied to every request.
    default_headers: HashMap<String, String>,
    /// Route parameters applied to every request.
    params: HashMap<String, String>,
    principal: Arc<dyn Principal>,
}

impl Default for RequestFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestFactory {
    /// Creates a factory producing anonymous requests.
    pub fn new() -> Self {
        Self {
            default_headers: HashMap::new(),
            params: HashMap::new(),
            principal: Arc::new(AnonymousUser),
        }
    }

    /// Adds a header included in all requests.
    #[must_use]
    pub fn with_default_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Adds a route parameter included in all requests.
    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Makes every request act for `principal`.
    #[must_use]
    pub fn with_user(mut self, principal: impl Principal + 'static) -> Self {
        self.principal = Arc::new(principal);
        self
    }

    /// Marks every request as an AJAX request.
    #[must_use]
    pub fn ajax(self) -> Self {
        self.with_default_header("X-Requested-With", "XMLHttpRequest")
    }

    /// Builds a GET request. `path` may carry a query string.
    pub fn get(&self, path: &str) -> RequestContext {
        self.builder(Method::GET, path).build()
    }

    /// Builds a HEAD request.
    pub fn head(&self, path: &str) -> RequestContext {
        self.builder(Method::HEAD, path).build()
    }

    /// Builds a POST request with form data.
    pub fn post(&self, path: &str, data: &[(&str, &str)]) -> RequestContext {
        self.builder(Method::POST, path)
            .data(QueryDict::from_pairs(data.iter().copied()))
            .build()
    }

    /// Builds a PUT request with form data.
    pub fn put(&self, path: &str, data: &[(&str, &str)]) -> RequestContext {
        self.builder(Method::PUT, path)
            .data(QueryDict::from_pairs(data.iter().copied()))
            .build()
    }

    /// Builds a DELETE request.
    pub fn delete(&self, path: &str) -> RequestContext {
        self.builder(Method::DELETE, path).build()
    }

    /// Starts a request with the factory defaults applied, for anything the
    /// shortcuts above do not cover.
    pub fn builder(&self, method: Method, path: &str) -> RequestContextBuilder {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let mut builder = RequestContext::builder()
            .method(method)
            .path(path)
            .query_string(query)
            .principal(Arc::clone(&self.principal));

        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &self.params {
            builder = builder.param(name, value);
        }
        builder
    }
}
