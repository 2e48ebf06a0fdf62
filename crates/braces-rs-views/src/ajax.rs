//! Separate handlers for AJAX requests.
//!
//! [`AjaxDispatch`] wraps a view and sends requests carrying
//! `X-Requested-With: XMLHttpRequest` to per-method alternatives. A method
//! with no registered alternative falls back to the wrapped view: GET and
//! POST are dispatched unchanged, PUT and DELETE are dispatched as GET. Any
//! other AJAX verb is answered with 405. Non-AJAX requests always go to the
//! wrapped view.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use braces_rs_core::BracesResult;
use braces_rs_http::{RequestContext, ResponseEnvelope};

use crate::view::View;

/// Routes AJAX requests to alternative handlers.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use braces_rs_core::BracesResult;
/// use braces_rs_http::{RequestContext, ResponseEnvelope};
/// use braces_rs_views::ajax::AjaxDispatch;
/// use braces_rs_views::view::View;
///
/// struct Page;
///
/// #[async_trait]
/// impl View for Page {
///     fn allowed_methods(&self) -> Vec<http::Method> {
///         vec![http::Method::GET]
///     }
///
///     async fn dispatch(&self, _request: &RequestContext) -> BracesResult<ResponseEnvelope> {
///         Ok(ResponseEnvelope::ok_html("<html>...</html>"))
///     }
/// }
///
/// struct Fragment;
///
/// #[async_trait]
/// impl View for Fragment {
///     fn allowed_methods(&self) -> Vec<http::Method> {
///         vec![http::Method::GET]
///     }
///
///     async fn dispatch(&self, _request: &RequestContext) -> BracesResult<ResponseEnvelope> {
///         Ok(ResponseEnvelope::ok_html("<li>...</li>"))
///     }
/// }
///
/// let view = AjaxDispatch::new(Page).get_ajax(Fragment);
/// ```
pub struct AjaxDispatch<V> {
    view: V,
    handlers: HashMap<Method, Arc<dyn View>>,
}

impl<V: fmt::Debug> fmt::Debug for AjaxDispatch<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<&str> = self.handlers.keys().map(Method::as_str).collect();
        methods.sort_unstable();
        f.debug_struct("AjaxDispatch")
            .field("view", &self.view)
            .field("ajax_handlers", &methods)
            .finish()
    }
}

impl<V: View> AjaxDispatch<V> {
    /// Wraps `view` with the default AJAX routing.
    pub fn new(view: V) -> Self {
        Self {
            view,
            handlers: HashMap::new(),
        }
    }

    /// Answers AJAX GET requests with `handler`.
    #[must_use]
    pub fn get_ajax(self, handler: impl View + 'static) -> Self {
        self.on(Method::GET, handler)
    }

    /// Answers AJAX POST requests with `handler`.
    #[must_use]
    pub fn post_ajax(self, handler: impl View + 'static) -> Self {
        self.on(Method::POST, handler)
    }

    /// Answers AJAX PUT requests with `handler`.
    #[must_use]
    pub fn put_ajax(self, handler: impl View + 'static) -> Self {
        self.on(Method::PUT, handler)
    }

    /// Answers AJAX DELETE requests with `handler`.
    #[must_use]
    pub fn delete_ajax(self, handler: impl View + 'static) -> Self {
        self.on(Method::DELETE, handler)
    }

    fn on(mut self, method: Method, handler: impl View + 'static) -> Self {
        self.handlers.insert(method, Arc::new(handler));
        self
    }

    /// Returns the wrapped view.
    pub const fn inner(&self) -> &V {
        &self.view
    }

    async fn dispatch_ajax(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        let method = request.method();
        if let Some(handler) = self.handlers.get(method) {
            tracing::debug!(method = %method, path = request.path(), "dispatching to AJAX handler");
            return handler.dispatch(request).await;
        }
        if method == Method::GET || method == Method::POST {
            self.view.dispatch(request).await
        } else if method == Method::PUT || method == Method::DELETE {
            self.view.dispatch(&request.with_method(Method::GET)).await
        } else {
            let allowed = self.allowed_methods();
            let allowed: Vec<&str> = allowed.iter().map(Method::as_str).collect();
            Ok(ResponseEnvelope::not_allowed(&allowed))
        }
    }
}

#[async_trait]
impl<V: View> View for AjaxDispatch<V> {
    fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = self.view.allowed_methods();
        for method in self.handlers.keys() {
            if !methods.contains(method) {
                methods.push(method.clone());
            }
        }
        methods
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        if request.is_ajax() {
            self.dispatch_ajax(request).await
        } else {
            self.view.dispatch(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;

    /// Echoes its label and the method it was dispatched with.
    #[derive(Debug)]
    struct Echo(&'static str);

    #[async_trait]
    impl View for Echo {
        fn allowed_methods(&self) -> Vec<Method> {
            vec![Method::GET, Method::POST]
        }

        async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
            Ok(ResponseEnvelope::ok_html(format!("{} {}", self.0, request.method())))
        }
    }

    fn request(method: Method, ajax: bool) -> RequestContext {
        let builder = RequestContext::builder().method(method).path("/items/");
        if ajax {
            builder.header("X-Requested-With", "XMLHttpRequest").build()
        } else {
            builder.build()
        }
    }

    async fn body(view: &AjaxDispatch<Echo>, method: Method, ajax: bool) -> String {
        view.dispatch(&request(method, ajax)).await.unwrap().body_text()
    }

    #[tokio::test]
    async fn test_regular_requests_skip_ajax_handlers() {
        let view = AjaxDispatch::new(Echo("page")).get_ajax(Echo("fragment"));
        assert_eq!(body(&view, Method::GET, false).await, "page GET");
        assert_eq!(body(&view, Method::PUT, false).await, "page PUT");
    }

    #[tokio::test]
    async fn test_registered_handler_answers_ajax() {
        let view = AjaxDispatch::new(Echo("page"))
            .get_ajax(Echo("fragment"))
            .post_ajax(Echo("json"));
        assert_eq!(body(&view, Method::GET, true).await, "fragment GET");
        assert_eq!(body(&view, Method::POST, true).await, "json POST");
    }

    #[tokio::test]
    async fn test_get_and_post_fall_back_unchanged() {
        let view = AjaxDispatch::new(Echo("page"));
        assert_eq!(body(&view, Method::GET, true).await, "page GET");
        assert_eq!(body(&view, Method::POST, true).await, "page POST");
    }

    #[tokio::test]
    async fn test_put_and_delete_fall_back_to_get() {
        let view = AjaxDispatch::new(Echo("page")).post_ajax(Echo("json"));
        assert_eq!(body(&view, Method::PUT, true).await, "page GET");
        assert_eq!(body(&view, Method::DELETE, true).await, "page GET");

        let view = AjaxDispatch::new(Echo("page"))
            .put_ajax(Echo("update"))
            .delete_ajax(Echo("remove"));
        assert_eq!(body(&view, Method::PUT, true).await, "update PUT");
        assert_eq!(body(&view, Method::DELETE, true).await, "remove DELETE");
    }

    #[tokio::test]
    async fn test_other_ajax_verbs_not_allowed() {
        let view = AjaxDispatch::new(Echo("page")).delete_ajax(Echo("remove"));
        let response = view.dispatch(&request(Method::PATCH, true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, POST, DELETE"));
    }
}
