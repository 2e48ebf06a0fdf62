//! List+create scoped to a parent entity.
//!
//! The parent is resolved from the request before anything else runs, guards
//! included. An unresolved parent answers 404 without touching the store.
//! A resolved parent scopes the listing and the created child, and is
//! injected into the form kwargs and the context under configurable keys.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use braces_rs_core::{BracesResult, ContextValue};
use braces_rs_forms::Form;
use braces_rs_http::{RequestContext, ResponseEnvelope};

use crate::hooks::improperly_configured;
use crate::list_create::{Extras, ListCreateConfig, ListCreateCore, Listing, ALLOWED_METHODS};
use crate::store::{ListQuery, ParentLookup, ScopedStore};
use crate::view::View;

/// Default key for the parent in both the form kwargs and the context.
pub const PARENT_OBJECT: &str = "parent_object";

const COMPONENT: &str = "ParentScopedListCreateWorkflow";

struct Scoped<'a> {
    store: &'a dyn ScopedStore,
    parent: &'a Value,
}

#[async_trait]
impl Listing for Scoped<'_> {
    async fn count(&self, request: &RequestContext) -> BracesResult<usize> {
        self.store.count(request, self.parent).await
    }

    async fn fetch(
        &self,
        request: &RequestContext,
        query: &ListQuery,
    ) -> BracesResult<Vec<Value>> {
        self.store.fetch(request, self.parent, query).await
    }

    async fn create(&self, request: &RequestContext, form: &dyn Form) -> BracesResult<Value> {
        self.store.create(request, self.parent, form).await
    }
}

/// A list+create workflow over the children of one parent.
pub struct ParentScopedListCreateWorkflow {
    core: ListCreateCore,
    lookup: Arc<dyn ParentLookup>,
    store: Arc<dyn ScopedStore>,
    parent_form_key: String,
    parent_context_key: String,
}

impl fmt::Debug for ParentScopedListCreateWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(COMPONENT)
            .field("core", &self.core)
            .field("parent_form_key", &self.parent_form_key)
            .field("parent_context_key", &self.parent_context_key)
            .finish_non_exhaustive()
    }
}

impl ParentScopedListCreateWorkflow {
    /// Starts a builder over the shared list+create configuration.
    pub fn builder(config: ListCreateConfig) -> ParentScopedBuilder {
        ParentScopedBuilder {
            config,
            lookup: None,
            store: None,
            parent_form_key: PARENT_OBJECT.to_string(),
            parent_context_key: PARENT_OBJECT.to_string(),
        }
    }

    /// Handles a request.
    pub async fn handle(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        let Some(kind) = request.kind() else {
            return Ok(ResponseEnvelope::not_allowed(ALLOWED_METHODS));
        };

        let Some(parent) = self.lookup.get_parent_object(request).await? else {
            tracing::debug!(path = request.path(), "parent object not found");
            return Ok(ResponseEnvelope::not_found("Parent object not found."));
        };

        let injected = ContextValue::from(&parent);
        let extras = Extras {
            form_kwargs: vec![(self.parent_form_key.clone(), injected.clone())],
            context: vec![(self.parent_context_key.clone(), injected)],
        };
        let listing = Scoped {
            store: self.store.as_ref(),
            parent: &parent,
        };
        self.core.handle(request, kind, &listing, extras).await
    }
}

#[async_trait]
impl View for ParentScopedListCreateWorkflow {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD, Method::POST, Method::PUT]
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.handle(request).await
    }
}

/// Builder for [`ParentScopedListCreateWorkflow`].
pub struct ParentScopedBuilder {
    config: ListCreateConfig,
    lookup: Option<Arc<dyn ParentLookup>>,
    store: Option<Arc<dyn ScopedStore>>,
    parent_form_key: String,
    parent_context_key: String,
}

impl fmt::Debug for ParentScopedBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentScopedBuilder")
            .field("config", &self.config)
            .field("lookup", &self.lookup.is_some())
            .field("store", &self.store.is_some())
            .field("parent_form_key", &self.parent_form_key)
            .field("parent_context_key", &self.parent_context_key)
            .finish()
    }
}

impl ParentScopedBuilder {
    /// Sets how the parent is resolved. Required.
    #[must_use]
    pub fn parent_lookup(mut self, lookup: Arc<dyn ParentLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Sets the scoped store. Required.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ScopedStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the form kwarg the parent is passed under.
    #[must_use]
    pub fn parent_form_key(mut self, key: impl Into<String>) -> Self {
        self.parent_form_key = key.into();
        self
    }

    /// Sets the context key the parent is rendered under.
    #[must_use]
    pub fn parent_context_key(mut self, key: impl Into<String>) -> Self {
        self.parent_context_key = key.into();
        self
    }

    /// Validates the configuration and builds the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if the parent lookup or
    /// scoped store is missing, a parent key is empty or collides with a base
    /// key, or the list+create configuration is invalid.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn build(self) -> BracesResult<ParentScopedListCreateWorkflow> {
        let lookup = self.lookup.ok_or_else(|| {
            improperly_configured(COMPONENT, "get_parent_object must be supplied via parent_lookup")
        })?;
        let store = self.store.ok_or_else(|| {
            improperly_configured(COMPONENT, "a scoped queryset must be supplied via store")
        })?;
        if self.parent_form_key.is_empty() || self.parent_context_key.is_empty() {
            return Err(improperly_configured(COMPONENT, "parent keys must not be empty"));
        }
        let core = self.config.build_core(
            COMPONENT,
            &[&self.parent_form_key],
            &[&self.parent_context_key],
        )?;

        Ok(ParentScopedListCreateWorkflow {
            core,
            lookup,
            store,
            parent_form_key: self.parent_form_key,
            parent_context_key: self.parent_context_key,
        })
    }
}
