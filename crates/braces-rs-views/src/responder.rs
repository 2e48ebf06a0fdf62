//! Downloadable content responses.
//!
//! A [`ContentResponder`] resolves, in order, the mimetype, the filename and
//! the content of a download, then emits it with `Content-Type` and, when a
//! filename format is set, `Content-Disposition`.
//!
//! Streamed content is read fully into the body and released exactly once,
//! whether or not the read succeeded. A declared [`ContentCloser`] takes
//! ownership of the resource in place of its own `release`. A read error
//! propagates after the release; a release error only propagates when the
//! read itself succeeded.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{Method, StatusCode};

use braces_rs_core::settings::Settings;
use braces_rs_core::{BracesError, BracesResult, Context, ContextValue};
use braces_rs_http::{RequestContext, RequestMethod, ResponseBody, ResponseEnvelope};

use crate::hooks::{improperly_configured, Behavior, HookPipeline, HookPipelineBuilder};
use crate::json::JsonResponder;
use crate::placeholder;
use crate::resource::StreamingResource;
use crate::view::View;

/// Context key holding the route parameters.
pub const PARAMS: &str = "params";
/// Context key holding the formatted timestamp.
pub const TIMESTAMP: &str = "timestamp";

/// The payload of a download.
pub enum DownloadContent {
    /// In-memory text.
    Text(String),
    /// In-memory bytes.
    Bytes(Bytes),
    /// A handle that must be released after reading.
    Stream(Box<dyn StreamingResource>),
}

impl fmt::Debug for DownloadContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for DownloadContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for DownloadContent {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

/// Produces the content of a download from the assembled context.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Returns the payload.
    async fn content(
        &self,
        request: &RequestContext,
        context: &Context,
    ) -> BracesResult<DownloadContent>;
}

type ContentFn = dyn Fn(&RequestContext, &Context) -> BracesResult<DownloadContent> + Send + Sync;

struct FnContent(Arc<ContentFn>);

#[async_trait]
impl ContentProvider for FnContent {
    async fn content(
        &self,
        request: &RequestContext,
        context: &Context,
    ) -> BracesResult<DownloadContent> {
        (self.0)(request, context)
    }
}

/// Releases a streamed resource in place of its own `release`.
#[async_trait]
pub trait ContentCloser: Send + Sync {
    /// Takes ownership of the resource and releases it.
    async fn close(&self, resource: Box<dyn StreamingResource>) -> BracesResult<()>;
}

type MimetypeFn = dyn Fn(&RequestContext, &Context) -> String + Send + Sync;
type Clock = dyn Fn() -> NaiveDateTime + Send + Sync;

/// A fixed or per-request mimetype.
#[derive(Clone)]
pub enum Mimetype {
    /// The same mimetype for every request.
    Static(String),
    /// Computed from the request and context.
    Computed(Arc<MimetypeFn>),
}

impl fmt::Debug for Mimetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(mimetype) => f.debug_tuple("Static").field(mimetype).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

fn parse_mimetype(component: &str, mimetype: &str) -> BracesResult<()> {
    mimetype.parse::<mime::Mime>().map(drop).map_err(|_| {
        improperly_configured(component, format!("'{mimetype}' is not a valid mimetype"))
    })
}

/// Emits downloadable content.
///
/// # Examples
///
/// ```
/// use braces_rs_views::responder::{ContentResponder, DownloadContent};
///
/// let responder = ContentResponder::builder()
///     .mimetype("text/csv")
///     .filename("report_{timestamp}.csv")
///     .content_fn(|_request, _context| Ok(DownloadContent::Text("id\n1\n".into())))
///     .build()
///     .unwrap();
/// # let _ = responder;
///
/// assert!(ContentResponder::builder().mimetype("text/csv").build().is_err());
/// ```
pub struct ContentResponder {
    component: &'static str,
    mimetype: Mimetype,
    filename_format: Option<String>,
    timestamp_format: String,
    content: Arc<dyn ContentProvider>,
    closer: Option<Arc<dyn ContentCloser>>,
    clock: Arc<Clock>,
    hooks: HookPipeline,
}

impl fmt::Debug for ContentResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.component)
            .field("mimetype", &self.mimetype)
            .field("filename_format", &self.filename_format)
            .field("timestamp_format", &self.timestamp_format)
            .field("closer", &self.closer.is_some())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl ContentResponder {
    /// Creates a new [`ContentResponderBuilder`].
    pub fn builder() -> ContentResponderBuilder {
        ContentResponderBuilder::new("ContentResponder")
    }

    /// Assembles the context: `params` and `timestamp`, then the injectors.
    pub fn get_context_data(&self, request: &RequestContext) -> BracesResult<Context> {
        let params: BTreeMap<String, ContextValue> = request
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), ContextValue::from(v.as_str())))
            .collect();

        let mut timestamp = String::new();
        write!(timestamp, "{}", (self.clock)().format(&self.timestamp_format)).map_err(|_| {
            BracesError::ImproperlyConfigured(format!(
                "Invalid timestamp format '{}'",
                self.timestamp_format
            ))
        })?;

        let mut context = Context::new();
        context.insert(PARAMS, ContextValue::Dict(params));
        context.insert(TIMESTAMP, timestamp);
        self.hooks.assemble_context(request, context)
    }

    /// Resolves the mimetype for this request.
    pub fn resolve_mimetype(
        &self,
        request: &RequestContext,
        context: &Context,
    ) -> BracesResult<String> {
        match &self.mimetype {
            Mimetype::Static(mimetype) => Ok(mimetype.clone()),
            Mimetype::Computed(f) => {
                let mimetype = f(request, context);
                parse_mimetype(self.component, &mimetype)?;
                Ok(mimetype)
            }
        }
    }

    /// Fills the filename format from the context. `None` when no format is
    /// set.
    pub fn resolve_filename(&self, context: &Context) -> BracesResult<Option<String>> {
        let Some(format) = &self.filename_format else {
            return Ok(None);
        };
        placeholder::fill(format, |key| context.get(key).map(ToString::to_string))
            .map(Some)
            .map_err(|err| {
                improperly_configured(self.component, format!("filename '{format}': {err}"))
            })
    }

    /// Handles a request.
    pub async fn respond(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        if request.kind() != Some(RequestMethod::Read) {
            return Ok(ResponseEnvelope::not_allowed(&["GET", "HEAD"]));
        }
        if let Some(denied) = self.hooks.run_guards(request).await? {
            return Ok(denied);
        }

        let context = self.get_context_data(request)?;
        let mimetype = self.resolve_mimetype(request, &context)?;
        let filename = self.resolve_filename(&context)?;
        let content = self.content.content(request, &context).await?;
        let body = self.read_content(content).await?;

        let mut response = ResponseEnvelope::new(StatusCode::OK).with_body(body);
        response.set_header(CONTENT_TYPE, &mimetype)?;
        if let Some(filename) = filename {
            response.set_header(
                CONTENT_DISPOSITION,
                &format!("attachment; filename=\"{filename}\""),
            )?;
        }
        Ok(response)
    }

    async fn read_content(&self, content: DownloadContent) -> BracesResult<ResponseBody> {
        let mut resource = match content {
            DownloadContent::Text(text) => return Ok(ResponseBody::Text(text)),
            DownloadContent::Bytes(bytes) => return Ok(ResponseBody::Bytes(bytes)),
            DownloadContent::Stream(resource) => resource,
        };

        let read = resource.read_to_end().await;
        let released = match &self.closer {
            Some(closer) => closer.close(resource).await,
            None => resource.release().await,
        };

        match (read, released) {
            (Ok(bytes), Ok(())) => Ok(ResponseBody::Bytes(bytes)),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(read_err), Ok(())) => Err(read_err),
            (Err(read_err), Err(release_err)) => {
                tracing::warn!(
                    error = %release_err,
                    "releasing streamed content failed after a read error"
                );
                Err(read_err)
            }
        }
    }
}

#[async_trait]
impl View for ContentResponder {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD]
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.respond(request).await
    }
}

/// Builder for [`ContentResponder`].
pub struct ContentResponderBuilder {
    component: &'static str,
    mimetype: Option<Mimetype>,
    filename_format: Option<String>,
    timestamp_format: String,
    content: Option<Arc<dyn ContentProvider>>,
    closer: Option<Arc<dyn ContentCloser>>,
    clock: Arc<Clock>,
    hooks: HookPipelineBuilder,
}

impl fmt::Debug for ContentResponderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentResponderBuilder")
            .field("component", &self.component)
            .field("mimetype", &self.mimetype)
            .field("filename_format", &self.filename_format)
            .field("content", &self.content.is_some())
            .finish_non_exhaustive()
    }
}

impl ContentResponderBuilder {
    pub(crate) fn new(component: &'static str) -> Self {
        Self {
            component,
            mimetype: None,
            filename_format: None,
            timestamp_format: Settings::current().timestamp_format,
            content: None,
            closer: None,
            clock: Arc::new(|| chrono::Local::now().naive_local()),
            hooks: HookPipelineBuilder::default(),
        }
    }

    /// Sets a fixed mimetype.
    #[must_use]
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(Mimetype::Static(mimetype.into()));
        self
    }

    /// Computes the mimetype per request.
    #[must_use]
    pub fn mimetype_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Context) -> String + Send + Sync + 'static,
    {
        self.mimetype = Some(Mimetype::Computed(Arc::new(f)));
        self
    }

    /// Sets the filename format. `{key}` placeholders are filled from the
    /// context, e.g. `export_{timestamp}.csv`.
    #[must_use]
    pub fn filename(mut self, format: impl Into<String>) -> Self {
        self.filename_format = Some(format.into());
        self
    }

    /// Sets the strftime format of the `timestamp` context entry.
    #[must_use]
    pub fn timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Sets the content provider.
    #[must_use]
    pub fn content(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.content = Some(Arc::new(provider));
        self
    }

    /// Sets the content provider from a closure.
    #[must_use]
    pub fn content_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Context) -> BracesResult<DownloadContent> + Send + Sync + 'static,
    {
        self.content = Some(Arc::new(FnContent(Arc::new(f))));
        self
    }

    /// Uses a [`JsonResponder`] for both mimetype and content.
    #[must_use]
    pub fn json(mut self, responder: JsonResponder) -> Self {
        self.mimetype = Some(Mimetype::Static(responder.mimetype().to_string()));
        self.content = Some(Arc::new(responder));
        self
    }

    /// Declares a closer that releases streamed content.
    #[must_use]
    pub fn closer(mut self, closer: impl ContentCloser + 'static) -> Self {
        self.closer = Some(Arc::new(closer));
        self
    }

    /// Replaces the clock used for the `timestamp` entry.
    #[must_use]
    pub fn clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Registers a behavior (guards and context injectors).
    #[must_use]
    pub fn behavior(mut self, behavior: impl Behavior) -> Self {
        self.hooks = self.hooks.behavior(behavior);
        self
    }

    /// Validates the configuration and builds the responder.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if the mimetype or content
    /// provider is missing, the static mimetype or timestamp format is
    /// invalid, the filename format is malformed, or two behaviors write the
    /// same key.
    pub fn build(self) -> BracesResult<ContentResponder> {
        let component = self.component;
        let mimetype = self.mimetype.ok_or_else(|| {
            improperly_configured(component, "a mimetype or mimetype_fn is required")
        })?;
        if let Mimetype::Static(static_mimetype) = &mimetype {
            parse_mimetype(component, static_mimetype)?;
        }
        let content = self
            .content
            .ok_or_else(|| improperly_configured(component, "a content provider is required"))?;
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(improperly_configured(
                component,
                format!("invalid timestamp format '{}'", self.timestamp_format),
            ));
        }
        if let Some(format) = &self.filename_format {
            placeholder::check(format).map_err(|err| {
                improperly_configured(component, format!("filename '{format}': {err}"))
            })?;
        }
        if self.hooks.has_redirect() {
            return Err(improperly_configured(
                component,
                "a download has no success URL to redirect to",
            ));
        }
        let hooks = self.hooks.build(&[], &[PARAMS, TIMESTAMP])?;

        Ok(ContentResponder {
            component,
            mimetype,
            filename_format: self.filename_format,
            timestamp_format: self.timestamp_format,
            content,
            closer: self.closer,
            clock: self.clock,
            hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    use super::*;
    use crate::guards::LoginRequired;
    use crate::injectors::StaticContext;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    /// Fails its read after yielding part of the payload.
    struct Flaky {
        fail_read: bool,
        fail_release: bool,
        releases: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl StreamingResource for Flaky {
        async fn read_to_end(&mut self) -> BracesResult<Bytes> {
            if self.fail_read {
                Err(BracesError::Resource("connection reset after 512 bytes".into()))
            } else {
                Ok(Bytes::from_static(b"payload"))
            }
        }

        async fn release(self: Box<Self>) -> BracesResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                Err(BracesError::Resource("close failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn streaming(fail_read: bool, fail_release: bool) -> (ContentResponder, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();
        let responder = ContentResponder::builder()
            .mimetype("application/octet-stream")
            .content_fn(move |_request, _context| {
                Ok(DownloadContent::Stream(Box::new(Flaky {
                    fail_read,
                    fail_release,
                    releases: counter.clone(),
                })))
            })
            .build()
            .unwrap();
        (responder, releases)
    }

    // ── Configuration tests ─────────────────────────────────────────

    #[test]
    fn test_missing_mimetype() {
        let err = ContentResponder::builder()
            .content_fn(|_request, _context| Ok("x".to_string().into()))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("mimetype"));
    }

    #[test]
    fn test_missing_content() {
        assert!(ContentResponder::builder()
            .mimetype("text/plain")
            .build()
            .unwrap_err()
            .is_configuration_error());
    }

    #[test]
    fn test_invalid_static_mimetype_and_formats() {
        let base = || {
            ContentResponder::builder()
                .content_fn(|_request, _context| Ok("x".to_string().into()))
        };
        assert!(base().mimetype("csv").build().is_err());
        assert!(base().mimetype("text/csv").filename("a_{ts.csv").build().is_err());
        assert!(base()
            .mimetype("text/csv")
            .timestamp_format("%Y-%Q")
            .build()
            .is_err());
    }

    #[test]
    fn test_injector_cannot_overwrite_timestamp() {
        let err = ContentResponder::builder()
            .mimetype("text/plain")
            .content_fn(|_request, _context| Ok("x".to_string().into()))
            .behavior(StaticContext::new().with(TIMESTAMP, "never"))
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    // ── Response tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_text_download_headers() {
        let responder = ContentResponder::builder()
            .mimetype("text/csv")
            .filename("tasks_{timestamp}.csv")
            .timestamp_format("%Y%m%d-%H%M")
            .clock(fixed_clock)
            .content_fn(|_request, _context| Ok(DownloadContent::Text("id\n1\n".into())))
            .build()
            .unwrap();

        let response = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some("text/csv"));
        assert_eq!(
            response.header("content-disposition"),
            Some("attachment; filename=\"tasks_20240517-0830.csv\"")
        );
        assert_eq!(response.body_text(), "id\n1\n");
    }

    #[tokio::test]
    async fn test_no_filename_no_disposition() {
        let responder = ContentResponder::builder()
            .mimetype("text/plain")
            .content_fn(|_request, _context| Ok(Bytes::from_static(b"raw").into()))
            .build()
            .unwrap();
        let response = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap();
        assert!(response.header("content-disposition").is_none());
        assert_eq!(response.body().as_bytes(), b"raw");
    }

    #[tokio::test]
    async fn test_context_reused_by_content_and_filename() {
        let responder = ContentResponder::builder()
            .mimetype_fn(|request, _context| {
                if request.param("format") == Some("json") {
                    "application/json".to_string()
                } else {
                    "text/plain".to_string()
                }
            })
            .filename("{report}_{timestamp}.txt")
            .clock(fixed_clock)
            .behavior(StaticContext::new().with("report", "weekly"))
            .content_fn(|_request, context| {
                let params = context.get(PARAMS).cloned().unwrap_or(ContextValue::Null);
                Ok(DownloadContent::Text(format!("{params}")))
            })
            .build()
            .unwrap();

        let request = RequestContext::builder().param("format", "json").build();
        let response = responder.respond(&request).await.unwrap();
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(
            response.header("content-disposition"),
            Some("attachment; filename=\"weekly_2024-05-17.txt\"")
        );
        assert!(response.body_text().contains("json"));
    }

    #[tokio::test]
    async fn test_unknown_filename_placeholder() {
        let responder = ContentResponder::builder()
            .mimetype("text/plain")
            .filename("{missing}.txt")
            .content_fn(|_request, _context| Ok("x".to_string().into()))
            .build()
            .unwrap();
        let err = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_computed_mimetype_validated() {
        let responder = ContentResponder::builder()
            .mimetype_fn(|_request, _context| "garbage".to_string())
            .content_fn(|_request, _context| Ok("x".to_string().into()))
            .build()
            .unwrap();
        assert!(responder
            .respond(&RequestContext::builder().build())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_post_not_allowed() {
        let (responder, releases) = streaming(false, false);
        let request = RequestContext::builder().method(Method::POST).build();
        let response = responder.respond(&request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_guard_runs_before_content() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let responder = ContentResponder::builder()
            .mimetype("text/plain")
            .behavior(LoginRequired::new().raise_exception(true))
            .content_fn(move |_request, _context| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("secret".to_string().into())
            })
            .build()
            .unwrap();
        let response = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // ── Streaming release tests ─────────────────────────────────────

    #[tokio::test]
    async fn test_stream_released_once_on_success() {
        let (responder, releases) = streaming(false, false);
        let response = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap();
        assert_eq!(response.body().as_bytes(), b"payload");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_released_once_on_read_error() {
        let (responder, releases) = streaming(true, false);
        let err = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_read_error_wins_over_release_error() {
        let (responder, releases) = streaming(true, true);
        let err = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_error_propagates() {
        let (responder, _releases) = streaming(false, true);
        let err = responder
            .respond(&RequestContext::builder().build())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("close failed"));
    }

    struct CountingCloser(Arc<AtomicUsize>);

    #[async_trait]
    impl ContentCloser for CountingCloser {
        async fn close(&self, resource: Box<dyn StreamingResource>) -> BracesResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            drop(resource);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_closer_replaces_release() {
        let closes = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = releases.clone();
        let responder = ContentResponder::builder()
            .mimetype("application/octet-stream")
            .closer(CountingCloser(closes.clone()))
            .content_fn(move |_request, _context| {
                Ok(DownloadContent::Stream(Box::new(Flaky {
                    fail_read: true,
                    fail_release: false,
                    releases: counter.clone(),
                })))
            })
            .build()
            .unwrap();

        assert!(responder
            .respond(&RequestContext::builder().build())
            .await
            .is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }
}
