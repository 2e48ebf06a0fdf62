//! The [`View`] trait every workflow and responder implements, and its
//! conversion into a plain handler function.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use tracing::Instrument;

use braces_rs_core::logging::request_span;
use braces_rs_core::BracesResult;
use braces_rs_http::{Principal, RequestContext, ResponseEnvelope};

/// An async handler: takes a request, returns a future of the response.
pub type Handler = Box<
    dyn Fn(RequestContext) -> Pin<Box<dyn Future<Output = ResponseEnvelope> + Send>>
        + Send
        + Sync,
>;

/// A request handler with an error-returning entry point.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use braces_rs_core::BracesResult;
/// use braces_rs_http::{RequestContext, ResponseEnvelope};
/// use braces_rs_views::view::View;
///
/// struct Ping;
///
/// #[async_trait]
/// impl View for Ping {
///     fn allowed_methods(&self) -> Vec<http::Method> {
///         vec![http::Method::GET]
///     }
///
///     async fn dispatch(&self, _request: &RequestContext) -> BracesResult<ResponseEnvelope> {
///         Ok(ResponseEnvelope::ok_html("pong"))
///     }
/// }
///
/// let handler = Ping.as_handler();
/// ```
#[async_trait]
pub trait View: Send + Sync {
    /// The HTTP methods this view answers.
    fn allowed_methods(&self) -> Vec<Method>;

    /// Handles the request. Errors are left to [`serve`](Self::serve).
    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope>;

    /// Handles the request inside a request span, mapping errors to responses.
    async fn serve(&self, request: &RequestContext) -> ResponseEnvelope {
        let span = request_span(request.method().as_str(), request.path());
        match self.dispatch(request).instrument(span).await {
            Ok(response) => response,
            Err(err) => ResponseEnvelope::from_error(&err),
        }
    }

    /// Turns the view into a boxed [`Handler`].
    fn as_handler(self) -> Handler
    where
        Self: Sized + 'static,
    {
        let view = Arc::new(self);
        Box::new(move |request: RequestContext| -> Pin<Box<dyn Future<Output = ResponseEnvelope> + Send>> {
            let view = Arc::clone(&view);
            Box::pin(async move { view.serve(&request).await })
        })
    }
}

/// Serves a raw `http::Request` through `view`.
///
/// Route parameters and the principal come from the host framework's router
/// and authentication layer.
pub async fn serve_http(
    view: &dyn View,
    request: http::Request<Bytes>,
    params: HashMap<String, String>,
    principal: Arc<dyn Principal>,
) -> ResponseEnvelope {
    let (parts, body) = request.into_parts();
    let context = RequestContext::from_http(parts, &body, params, principal);
    view.serve(&context).await
}
