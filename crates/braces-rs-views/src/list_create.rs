//! A paginated listing with an inline creation form.
//!
//! Reads render the current page of items next to an unbound form.
//! Mutations bind and validate the form: a valid submission persists the new
//! entity and redirects, an invalid one re-renders the same page with the
//! bound form and its errors. A locked form never binds, validates or
//! persists anything.
//!
//! # Examples
//!
//! ```
//! use braces_rs_forms::{FieldsFormClass, FormFieldDef, FormFieldType};
//! use braces_rs_views::list_create::{ListCreateConfig, LockedPolicy};
//!
//! let form_class =
//!     FieldsFormClass::new(vec![FormFieldDef::new("title", FormFieldType::text())]).unwrap();
//!
//! let config = ListCreateConfig::new("tasks/list.html")
//!     .form_class(form_class)
//!     .paginate_by(25)
//!     .locked_when(|request| request.param("archived") == Some("1"))
//!     .locked_policy(LockedPolicy::Rerender);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use serde_json::Value;

use braces_rs_core::settings::Settings;
use braces_rs_core::{BracesResult, Context, ContextValue};
use braces_rs_forms::kwargs::{INITIAL, PREFIX};
use braces_rs_forms::{Form, FormClass, FormKwargs, FormState};
use braces_rs_http::{RequestContext, RequestMethod, ResponseEnvelope};

use crate::hooks::{improperly_configured, Behavior, HookPipeline, HookPipelineBuilder};
use crate::pagination::PaginationState;
use crate::render::{DebugRenderer, TemplateRenderer};
use crate::store::{ListQuery, ModelStore};
use crate::view::View;

/// Context key holding the current page's items.
pub const OBJECT_LIST: &str = "object_list";
/// Context key holding the page metadata.
pub const PAGE_OBJ: &str = "page_obj";
/// Context key holding the paginator metadata.
pub const PAGINATOR: &str = "paginator";
/// Context key telling whether there is more than one page.
pub const IS_PAGINATED: &str = "is_paginated";
/// Context key holding the form state.
pub const FORM: &str = "form";

/// Methods list+create workflows answer.
pub const ALLOWED_METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT"];

const BASE_FORM_KEYS: &[&str] = &[INITIAL, PREFIX];
const BASE_CONTEXT_KEYS: &[&str] = &[OBJECT_LIST, PAGE_OBJ, PAGINATOR, IS_PAGINATED, FORM];

type LockFn = dyn Fn(&RequestContext) -> bool + Send + Sync;

/// What a mutation against a locked form gets back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LockedPolicy {
    /// Render the read state unchanged with status 200.
    #[default]
    Rerender,
    /// Answer 403.
    Forbid,
}

/// Configuration shared by [`ListCreateWorkflow`] and
/// [`ParentScopedListCreateWorkflow`](crate::parent_scoped::ParentScopedListCreateWorkflow).
pub struct ListCreateConfig {
    template_name: String,
    form_class: Option<Arc<dyn FormClass>>,
    renderer: Arc<dyn TemplateRenderer>,
    paginate_by: Option<usize>,
    page_kwarg: String,
    allow_empty: bool,
    locked_when: Option<Arc<LockFn>>,
    locked_policy: LockedPolicy,
    select_related: Vec<String>,
    initial: BTreeMap<String, ContextValue>,
    prefix: Option<String>,
    hooks: HookPipelineBuilder,
}

impl fmt::Debug for ListCreateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCreateConfig")
            .field("template_name", &self.template_name)
            .field("form_class", &self.form_class.is_some())
            .field("paginate_by", &self.paginate_by)
            .field("page_kwarg", &self.page_kwarg)
            .field("allow_empty", &self.allow_empty)
            .field("locked", &self.locked_when.is_some())
            .field("locked_policy", &self.locked_policy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl ListCreateConfig {
    /// Starts a configuration rendering `template_name`, with pagination
    /// defaults taken from settings.
    pub fn new(template_name: impl Into<String>) -> Self {
        let settings = Settings::current();
        Self {
            template_name: template_name.into(),
            form_class: None,
            renderer: Arc::new(DebugRenderer),
            paginate_by: settings.paginate_by,
            page_kwarg: settings.page_kwarg,
            allow_empty: true,
            locked_when: None,
            locked_policy: LockedPolicy::default(),
            select_related: Vec::new(),
            initial: BTreeMap::new(),
            prefix: None,
            hooks: HookPipelineBuilder::default(),
        }
    }

    /// Sets the form class. Required.
    #[must_use]
    pub fn form_class(mut self, form_class: impl FormClass + 'static) -> Self {
        self.form_class = Some(Arc::new(form_class));
        self
    }

    /// Sets the template renderer.
    #[must_use]
    pub fn renderer(mut self, renderer: impl TemplateRenderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Sets the page size. Must be positive.
    #[must_use]
    pub const fn paginate_by(mut self, page_size: usize) -> Self {
        self.paginate_by = Some(page_size);
        self
    }

    /// Sets the query parameter holding the page number.
    #[must_use]
    pub fn page_kwarg(mut self, name: impl Into<String>) -> Self {
        self.page_kwarg = name.into();
        self
    }

    /// Whether an empty listing renders (the default) or answers 404.
    #[must_use]
    pub const fn allow_empty(mut self, allow: bool) -> Self {
        self.allow_empty = allow;
        self
    }

    /// Sets the predicate that locks the form for a request.
    #[must_use]
    pub fn locked_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.locked_when = Some(Arc::new(predicate));
        self
    }

    /// Sets the answer to mutations against a locked form.
    #[must_use]
    pub const fn locked_policy(mut self, policy: LockedPolicy) -> Self {
        self.locked_policy = policy;
        self
    }

    /// Names relations the store may eager-load for the listing.
    #[must_use]
    pub fn select_related<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select_related = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an initial value for the unbound form.
    #[must_use]
    pub fn initial(mut self, field: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.initial.insert(field.into(), value.into());
        self
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Registers a behavior.
    #[must_use]
    pub fn behavior(mut self, behavior: impl Behavior) -> Self {
        self.hooks = self.hooks.behavior(behavior);
        self
    }

    /// Gives direct access to the hook registrations.
    #[must_use]
    pub fn with_hooks(mut self, f: impl FnOnce(HookPipelineBuilder) -> HookPipelineBuilder) -> Self {
        self.hooks = f(self.hooks);
        self
    }

    /// Validates the configuration. `extra_form_keys` and
    /// `extra_context_keys` are base keys a wrapping workflow adds.
    pub(crate) fn build_core(
        self,
        component: &str,
        extra_form_keys: &[&str],
        extra_context_keys: &[&str],
    ) -> BracesResult<ListCreateCore> {
        if self.template_name.is_empty() {
            return Err(improperly_configured(component, "a template name is required"));
        }
        let form_class = self
            .form_class
            .ok_or_else(|| improperly_configured(component, "a form class is required"))?;
        if self.paginate_by == Some(0) {
            return Err(improperly_configured(component, "paginate_by must be positive"));
        }
        if self.page_kwarg.is_empty() {
            return Err(improperly_configured(component, "page_kwarg must not be empty"));
        }

        let shadowed = extra_form_keys
            .iter()
            .find(|key| BASE_FORM_KEYS.contains(key))
            .or_else(|| {
                extra_context_keys
                    .iter()
                    .find(|key| BASE_CONTEXT_KEYS.contains(key))
            });
        if let Some(key) = shadowed {
            return Err(improperly_configured(
                component,
                format!("'{key}' is already written by the list+create workflow"),
            ));
        }

        let form_keys: Vec<&str> = BASE_FORM_KEYS.iter().chain(extra_form_keys).copied().collect();
        let context_keys: Vec<&str> = BASE_CONTEXT_KEYS
            .iter()
            .chain(extra_context_keys)
            .copied()
            .collect();
        let hooks = self.hooks.build(&form_keys, &context_keys)?;

        Ok(ListCreateCore {
            template_name: self.template_name,
            form_class,
            renderer: self.renderer,
            paginate_by: self.paginate_by,
            page_kwarg: self.page_kwarg,
            allow_empty: self.allow_empty,
            locked_when: self.locked_when,
            locked_policy: self.locked_policy,
            select_related: self.select_related,
            initial: self.initial,
            prefix: self.prefix,
            hooks,
        })
    }
}

// ── Shared workflow ─────────────────────────────────────────────────

/// The data source a workflow lists from and creates into.
#[async_trait]
pub(crate) trait Listing: Send + Sync {
    async fn count(&self, request: &RequestContext) -> BracesResult<usize>;
    async fn fetch(&self, request: &RequestContext, query: &ListQuery)
        -> BracesResult<Vec<Value>>;
    async fn create(&self, request: &RequestContext, form: &dyn Form) -> BracesResult<Value>;
}

struct Unscoped<'a>(&'a dyn ModelStore);

#[async_trait]
impl Listing for Unscoped<'_> {
    async fn count(&self, request: &RequestContext) -> BracesResult<usize> {
        self.0.count(request).await
    }

    async fn fetch(
        &self,
        request: &RequestContext,
        query: &ListQuery,
    ) -> BracesResult<Vec<Value>> {
        self.0.fetch(request, query).await
    }

    async fn create(&self, request: &RequestContext, form: &dyn Form) -> BracesResult<Value> {
        self.0.create(request, form).await
    }
}

/// Per-request values a wrapping workflow adds to the base kwargs and context.
#[derive(Debug, Default)]
pub(crate) struct Extras {
    pub(crate) form_kwargs: Vec<(String, ContextValue)>,
    pub(crate) context: Vec<(String, ContextValue)>,
}

pub(crate) struct ListCreateCore {
    template_name: String,
    form_class: Arc<dyn FormClass>,
    renderer: Arc<dyn TemplateRenderer>,
    paginate_by: Option<usize>,
    page_kwarg: String,
    allow_empty: bool,
    locked_when: Option<Arc<LockFn>>,
    locked_policy: LockedPolicy,
    select_related: Vec<String>,
    initial: BTreeMap<String, ContextValue>,
    prefix: Option<String>,
    hooks: HookPipeline,
}

impl fmt::Debug for ListCreateCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCreateCore")
            .field("template_name", &self.template_name)
            .field("paginate_by", &self.paginate_by)
            .field("locked_policy", &self.locked_policy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl ListCreateCore {
    /// Runs guards, then the read or mutate branch.
    pub(crate) async fn handle(
        &self,
        request: &RequestContext,
        kind: RequestMethod,
        listing: &dyn Listing,
        extras: Extras,
    ) -> BracesResult<ResponseEnvelope> {
        if let Some(denied) = self.hooks.run_guards(request).await? {
            return Ok(denied);
        }

        let kwargs = self.form_kwargs(request, extras.form_kwargs)?;
        let mut form = self.form_class.create(kwargs)?;
        let locked = self.locked_when.as_ref().is_some_and(|f| f(request));

        match kind {
            RequestMethod::Read => {
                self.render_listing(request, listing, form.as_ref(), locked, extras.context)
                    .await
            }
            RequestMethod::Mutate if locked => match self.locked_policy {
                LockedPolicy::Rerender => {
                    tracing::debug!(path = request.path(), "ignoring submission to a locked form");
                    self.render_listing(request, listing, form.as_ref(), locked, extras.context)
                        .await
                }
                LockedPolicy::Forbid => {
                    tracing::debug!(path = request.path(), "rejecting submission to a locked form");
                    Ok(ResponseEnvelope::forbidden("This form is locked."))
                }
            },
            RequestMethod::Mutate => {
                if !self.allow_empty && listing.count(request).await? == 0 {
                    return Ok(Self::empty_not_found());
                }
                form.bind(request.data());
                if form.is_valid().await {
                    let object = listing.create(request, form.as_ref()).await?;
                    let url = self
                        .hooks
                        .resolve_success_url(request, Some(&object))?
                        .unwrap_or_else(|| request.path().to_string());
                    tracing::info!(path = request.path(), success_url = %url, "created object");
                    ResponseEnvelope::redirect(&url)
                } else {
                    tracing::debug!(
                        path = request.path(),
                        fields = ?form.errors().keys().collect::<Vec<_>>(),
                        "form submission invalid"
                    );
                    self.render_listing(request, listing, form.as_ref(), locked, extras.context)
                        .await
                }
            }
        }
    }

    fn empty_not_found() -> ResponseEnvelope {
        ResponseEnvelope::not_found("Empty list and 'allow_empty' is false.")
    }

    fn form_kwargs(
        &self,
        request: &RequestContext,
        extras: Vec<(String, ContextValue)>,
    ) -> BracesResult<FormKwargs> {
        let mut kwargs = FormKwargs::new();
        kwargs.insert(INITIAL, ContextValue::Dict(self.initial.clone()))?;
        if let Some(prefix) = &self.prefix {
            kwargs.insert(PREFIX, prefix.as_str())?;
        }
        for (key, value) in extras {
            kwargs.insert(key, value)?;
        }
        self.hooks.assemble_form_kwargs(request, kwargs)
    }

    fn pagination(&self, request: &RequestContext, total: usize) -> PaginationState {
        match self.paginate_by {
            Some(size) => {
                PaginationState::compute(total, size, request.query().get(&self.page_kwarg))
            }
            None => PaginationState::unpaginated(total),
        }
    }

    async fn render_listing(
        &self,
        request: &RequestContext,
        listing: &dyn Listing,
        form: &dyn Form,
        locked: bool,
        extra_context: Vec<(String, ContextValue)>,
    ) -> BracesResult<ResponseEnvelope> {
        let total = listing.count(request).await?;
        if total == 0 && !self.allow_empty {
            return Ok(Self::empty_not_found());
        }

        let pagination = self.pagination(request, total);
        let query = ListQuery {
            offset: pagination.offset(),
            limit: self.paginate_by.map(|_| pagination.limit()),
            select_related: self.select_related.clone(),
        };
        let items = listing.fetch(request, &query).await?;

        let mut context = Context::new();
        context.insert(
            OBJECT_LIST,
            ContextValue::List(items.iter().map(ContextValue::from).collect()),
        );
        if self.paginate_by.is_some() {
            context.insert(PAGE_OBJ, pagination.to_page_obj());
            context.insert(PAGINATOR, pagination.to_paginator());
            context.insert(IS_PAGINATED, pagination.is_paginated());
        } else {
            context.insert(PAGE_OBJ, ContextValue::Null);
            context.insert(PAGINATOR, ContextValue::Null);
            context.insert(IS_PAGINATED, false);
        }
        context.insert(FORM, FormState::capture(form, locked));
        for (key, value) in extra_context {
            context.insert(key, value);
        }

        let context = self.hooks.assemble_context(request, context)?;
        let html = self.renderer.render(&self.template_name, &context)?;
        Ok(ResponseEnvelope::ok_html(html))
    }
}

// ── ListCreateWorkflow ──────────────────────────────────────────────

/// A paginated listing plus an inline creation form over a [`ModelStore`].
pub struct ListCreateWorkflow {
    core: ListCreateCore,
    store: Arc<dyn ModelStore>,
}

impl fmt::Debug for ListCreateWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCreateWorkflow")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl ListCreateWorkflow {
    /// Validates `config` and creates the workflow.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if the template name or
    /// form class is missing, the page size is zero, or two behaviors write
    /// the same key.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn new(config: ListCreateConfig, store: Arc<dyn ModelStore>) -> BracesResult<Self> {
        Ok(Self {
            core: config.build_core("ListCreateWorkflow", &[], &[])?,
            store,
        })
    }

    /// Handles a request.
    pub async fn handle(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        let Some(kind) = request.kind() else {
            return Ok(ResponseEnvelope::not_allowed(ALLOWED_METHODS));
        };
        self.core
            .handle(request, kind, &Unscoped(self.store.as_ref()), Extras::default())
            .await
    }
}

#[async_trait]
impl View for ListCreateWorkflow {
    fn allowed_methods(&self) -> Vec<Method> {
        vec![Method::GET, Method::HEAD, Method::POST, Method::PUT]
    }

    async fn dispatch(&self, request: &RequestContext) -> BracesResult<ResponseEnvelope> {
        self.handle(request).await
    }
}
