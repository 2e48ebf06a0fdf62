//! Deletion without a confirmation page.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;

use braces_rs_core::BracesResult;
use braces_rs_http::{RequestContext, ResponseEnvelope};

use crate::hooks::{improperly_configured, Behavior, HookPipeline, HookPipelineBuilder};
use crate::store::ObjectStore;
use crate::success_url::SuccessUrlResolver;
use crate::view::View;

const COMPONENT: &str = "DirectDeleteView";

/// Deletes the target object on GET or POST, then redirects to the success
/// URL. A missing object answers 404.
pub struct DirectDeleteView {
    store: Arc<dyn ObjectStore>,
    hooks: HookPipeline,
}

impl fmt::Debug for DirectDeleteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(COMPONENT)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl DirectDeleteView {
    /// Starts a builder over `store`.
    pub fn builder(store: Arc<dyn ObjectStore>) -> DirectDeleteBuilder {
        DirectDeleteBuilder {
            store,
            hooks: HookPipelineBuilder::default(),
        }
    }

    /// Handles a request.
    pub async fn handle(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        let method = request.method();
        if method != Method::GET && method != Method::POST {
            return Ok(ResponseEnvelope::not_allowed(&["GET", "POST"]));
        }
        if let Some(denied) = self.hooks.run_guards(request).await? {
            return Ok(denied);
        }

        let Some(object) = self.store.get_object(request).await? else {
            return Ok(ResponseEnvelope::not_found("No object found matching the query."));
        };
        let url = self
            .hooks
            .resolve_success_url(request, Some(&object))?
            .ok_or_else(|| improperly_configured(COMPONENT, "no success URL registered"))?;
        let response = ResponseEnvelope::redirect(&url)?;
        self.store.delete(request, &object).await?;

        tracing::info!(path = request.path(), success_url = %url, "deleted object");
        Ok(response)
    }
}

#[async_trait]
impl View for DirectDeleteView {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::POST]
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.handle(request).await
    }
}

/// Builder for [`DirectDeleteView`].
pub struct DirectDeleteBuilder {
    store: Arc<dyn ObjectStore>,
    hooks: HookPipelineBuilder,
}

impl fmt::Debug for DirectDeleteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectDeleteBuilder")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl DirectDeleteBuilder {
    /// Sets where to redirect after the deletion. Required.
    #[must_use]
    pub fn success_url(self, resolver: SuccessUrlResolver) -> Self {
        self.behavior(resolver)
    }

    /// Registers a behavior (guards and the success URL).
    #[must_use]
    pub fn behavior(mut self, behavior: impl Behavior) -> Self {
        self.hooks = self.hooks.behavior(behavior);
        self
    }

    /// Builds the view.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if no success URL is
    /// registered.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn build(self) -> BracesResult<DirectDeleteView> {
        if !self.hooks.has_redirect() {
            return Err(improperly_configured(COMPONENT, "a success URL is required"));
        }
        Ok(DirectDeleteView {
            store: self.store,
            hooks: self.hooks.build(&[], &[])?,
        })
    }
}
