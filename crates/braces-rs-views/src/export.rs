//! Spreadsheet exports.
//!
//! An [`ExportResponder`] is a [`ContentResponder`] preset to
//! `application/ms-excel` and a timestamped `file_{timestamp}.xls` filename.
//! Every preset can be overridden; the content provider has no default.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use http::Method;

use braces_rs_core::{BracesResult, Context};
use braces_rs_http::{RequestContext, ResponseEnvelope};

use crate::hooks::Behavior;
use crate::responder::{
    ContentCloser, ContentProvider, ContentResponder, ContentResponderBuilder, DownloadContent,
};
use crate::view::View;

/// Default export mimetype.
pub const EXPORT_MIMETYPE: &str = "application/ms-excel";
/// Default export filename format.
pub const EXPORT_FILENAME: &str = "file_{timestamp}.xls";

/// A download preset for spreadsheet exports.
///
/// # Examples
///
/// ```
/// use braces_rs_views::export::ExportResponder;
/// use braces_rs_views::responder::DownloadContent;
///
/// let export = ExportResponder::builder()
///     .content_fn(|_request, _context| Ok(DownloadContent::Text("a\tb\n".into())))
///     .build()
///     .unwrap();
/// # let _ = export;
///
/// assert!(ExportResponder::builder().build().is_err());
/// ```
pub struct ExportResponder {
    inner: ContentResponder,
}

impl fmt::Debug for ExportResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl ExportResponder {
    /// Creates a builder with the export presets applied.
    pub fn builder() -> ExportResponderBuilder {
        ExportResponderBuilder {
            inner: ContentResponderBuilder::new("ExportResponder")
                .mimetype(EXPORT_MIMETYPE)
                .filename(EXPORT_FILENAME),
        }
    }

    /// The underlying content responder.
    pub fn responder(&self) -> &ContentResponder {
        &self.inner
    }

    /// Handles a request.
    pub async fn respond(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.inner.respond(request).await
    }
}

#[async_trait]
impl View for ExportResponder {
    fn allowed_methods(&self) -> Vec<Method> {
        self.inner.allowed_methods()
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.respond(request).await
    }
}

/// Builder for [`ExportResponder`].
#[derive(Debug)]
pub struct ExportResponderBuilder {
    inner: ContentResponderBuilder,
}

impl ExportResponderBuilder {
    /// Overrides the mimetype.
    #[must_use]
    pub fn mimetype(self, mimetype: impl Into<String>) -> Self {
        Self {
            inner: self.inner.mimetype(mimetype),
        }
    }

    /// Overrides the filename format.
    #[must_use]
    pub fn filename(self, format: impl Into<String>) -> Self {
        Self {
            inner: self.inner.filename(format),
        }
    }

    /// Overrides the strftime format of the `timestamp` entry.
    #[must_use]
    pub fn timestamp_format(self, format: impl Into<String>) -> Self {
        Self {
            inner: self.inner.timestamp_format(format),
        }
    }

    /// Sets the content provider. Required.
    #[must_use]
    pub fn content(self, provider: impl ContentProvider + 'static) -> Self {
        Self {
            inner: self.inner.content(provider),
        }
    }

    /// Sets the content provider from a closure.
    #[must_use]
    pub fn content_fn<F>(self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Context) -> BracesResult<DownloadContent> + Send + Sync + 'static,
    {
        Self {
            inner: self.inner.content_fn(f),
        }
    }

    /// Declares a closer that releases streamed content.
    #[must_use]
    pub fn closer(self, closer: impl ContentCloser + 'static) -> Self {
        Self {
            inner: self.inner.closer(closer),
        }
    }

    /// Replaces the clock used for the `timestamp` entry.
    #[must_use]
    pub fn clock<F>(self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        Self {
            inner: self.inner.clock(clock),
        }
    }

    /// Registers a behavior.
    #[must_use]
    pub fn behavior(self, behavior: impl Behavior) -> Self {
        Self {
            inner: self.inner.behavior(behavior),
        }
    }

    /// Builds the responder.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] when no content provider
    /// was set, or for any of the checks of [`ContentResponderBuilder::build`].
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn build(self) -> BracesResult<ExportResponder> {
        Ok(ExportResponder {
            inner: self.inner.build()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use http::StatusCode;

    use super::*;
    use crate::injectors::StaticContext;

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 11, 2)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    fn rows(_request: &RequestContext, _context: &Context) -> BracesResult<DownloadContent> {
        Ok(DownloadContent::Text("id\ttitle\n1\tDocs\n".into()))
    }

    #[test]
    fn test_content_required() {
        let err = ExportResponder::builder().build().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("ExportResponder"));
    }

    #[tokio::test]
    async fn test_presets() {
        let export = ExportResponder::builder()
            .content_fn(rows)
            .timestamp_format("%Y%m%d%H%M%S")
            .clock(clock)
            .build()
            .unwrap();

        let response = export.respond(&RequestContext::builder().build()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.header("content-type"), Some(EXPORT_MIMETYPE));
        assert_eq!(
            response.header("content-disposition"),
            Some("attachment; filename=\"file_20231102140509.xls\"")
        );
        assert_eq!(response.body_text(), "id\ttitle\n1\tDocs\n");
    }

    #[tokio::test]
    async fn test_overrides() {
        let export = ExportResponder::builder()
            .mimetype("text/tab-separated-values")
            .filename("{report}_tasks.tsv")
            .content_fn(rows)
            .behavior(StaticContext::new().with("report", "weekly"))
            .build()
            .unwrap();

        let response = export.respond(&RequestContext::builder().build()).await.unwrap();
        assert_eq!(
            response.header("content-type"),
            Some("text/tab-separated-values")
        );
        assert_eq!(
            response.header("content-disposition"),
            Some("attachment; filename=\"weekly_tasks.tsv\"")
        );
    }

    #[tokio::test]
    async fn test_post_not_allowed() {
        let export = ExportResponder::builder().content_fn(rows).build().unwrap();
        let request = RequestContext::builder().method(Method::POST).build();
        let response = export.serve(&request).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
