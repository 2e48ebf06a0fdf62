//! The hook pipeline every behavior plugs into.
//!
//! A request passes through a fixed sequence of named extension points:
//!
//! 1. [`HookPoint::Guard`]: every registered [`Guard`] runs in registration
//!    order; the first denial short-circuits the request.
//! 2. [`HookPoint::FormKwargs`]: the workflow's base kwargs, then each
//!    [`FormKwargsInjector`]'s additions.
//! 3. [`HookPoint::ContextData`]: the workflow's base context, then each
//!    [`ContextInjector`]'s additions.
//! 4. [`HookPoint::SuccessUrl`]: the registered [`RedirectResolver`], if any.
//! 5. [`HookPoint::Render`]: owned by the workflow itself.
//!
//! Behaviors never call each other. Each one declares the keys it writes, and
//! [`HookPipelineBuilder::build`] rejects two writers of the same key before
//! any request is served.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;

use braces_rs_core::{BracesError, BracesResult, Context, ContextValue};
use braces_rs_forms::FormKwargs;
use braces_rs_http::{RequestContext, ResponseEnvelope};

/// The named extension points, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// Access checks.
    Guard,
    /// Form constructor argument assembly.
    FormKwargs,
    /// Rendering context assembly.
    ContextData,
    /// Redirect target after a successful mutation.
    SuccessUrl,
    /// Response production.
    Render,
}

impl HookPoint {
    /// Returns the hook point's name as used in log events.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guard => "guard",
            Self::FormKwargs => "form_kwargs",
            Self::ContextData => "context_data",
            Self::SuccessUrl => "success_url",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a single guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Let the request continue.
    Proceed,
    /// Stop and redirect to the given URL.
    Redirect(String),
    /// Stop with the given status.
    Reject(StatusCode),
}

impl GuardDecision {
    /// Turns a denial into its response. `Proceed` yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] for a redirect URL that
    /// cannot be sent as a `Location` header.
    pub fn into_response(self) -> BracesResult<Option<ResponseEnvelope>> {
        match self {
            Self::Proceed => Ok(None),
            Self::Redirect(url) => ResponseEnvelope::redirect(&url).map(Some),
            Self::Reject(status) => Ok(Some(ResponseEnvelope::text(
                status,
                status.canonical_reason().unwrap_or("Forbidden"),
            ))),
        }
    }
}

/// A predicate evaluated before any workflow logic runs.
#[async_trait]
pub trait Guard: Send + Sync {
    /// A short name used in log events.
    fn name(&self) -> &str;

    /// Decides whether the request may proceed.
    async fn check(&self, request: &RequestContext) -> GuardDecision;
}

/// Contributes entries to the form constructor kwargs.
pub trait FormKwargsInjector: Send + Sync {
    /// A short name used in log events and collision errors.
    fn name(&self) -> &str;

    /// The keys this injector writes.
    fn keys(&self) -> Vec<String>;

    /// Returns the entries to add.
    fn contribute(&self, request: &RequestContext) -> BracesResult<Vec<(String, ContextValue)>>;
}

/// Contributes entries to the rendering context.
pub trait ContextInjector: Send + Sync {
    /// A short name used in log events and collision errors.
    fn name(&self) -> &str;

    /// The keys this injector writes.
    fn keys(&self) -> Vec<String>;

    /// Returns the entries to add. `context` holds everything assembled so far.
    fn contribute(
        &self,
        request: &RequestContext,
        context: &Context,
    ) -> BracesResult<Vec<(String, ContextValue)>>;
}

/// Resolves the redirect target after a successful mutation.
pub trait RedirectResolver: Send + Sync {
    /// Resolves the URL. `object` is the entity the mutation produced, if any.
    fn resolve(&self, request: &RequestContext, object: Option<&Value>) -> BracesResult<String>;
}

/// Something that registers handlers at one or more hook points.
///
/// # Examples
///
/// ```
/// use braces_rs_views::guards::LoginRequired;
/// use braces_rs_views::hooks::{Behavior, HookPipeline};
/// use braces_rs_views::injectors::SetHeadline;
///
/// let pipeline = HookPipeline::builder()
///     .behavior(LoginRequired::new())
///     .behavior(SetHeadline::new("Tasks").unwrap())
///     .build(&[], &["object_list"])
///     .unwrap();
/// assert_eq!(pipeline.guard_count(), 1);
/// ```
pub trait Behavior {
    /// Registers this behavior's handlers.
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder;
}

/// Collects handlers before the collision check.
#[derive(Default)]
pub struct HookPipelineBuilder {
    guards: Vec<Arc<dyn Guard>>,
    form_kwargs: Vec<Arc<dyn FormKwargsInjector>>,
    context: Vec<Arc<dyn ContextInjector>>,
    resolvers: Vec<Arc<dyn RedirectResolver>>,
}

impl fmt::Debug for HookPipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipelineBuilder")
            .field("guards", &self.guards.len())
            .field("form_kwargs", &self.form_kwargs.len())
            .field("context", &self.context.len())
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

impl HookPipelineBuilder {
    /// Registers a guard.
    #[must_use]
    pub fn guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Registers a form kwargs injector.
    #[must_use]
    pub fn form_kwargs(mut self, injector: impl FormKwargsInjector + 'static) -> Self {
        self.form_kwargs.push(Arc::new(injector));
        self
    }

    /// Registers a context injector.
    #[must_use]
    pub fn context(mut self, injector: impl ContextInjector + 'static) -> Self {
        self.context.push(Arc::new(injector));
        self
    }

    /// Registers the success URL resolver. Only one may be registered.
    #[must_use]
    pub fn redirect(mut self, resolver: impl RedirectResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Lets a behavior register itself.
    #[must_use]
    pub fn behavior(self, behavior: impl Behavior) -> Self {
        behavior.register(self)
    }

    /// Returns `true` if a success URL resolver has been registered.
    pub fn has_redirect(&self) -> bool {
        !self.resolvers.is_empty()
    }

    /// Validates the registrations and freezes the pipeline.
    ///
    /// `reserved_form_keys` and `reserved_context_keys` are the keys the
    /// owning workflow writes itself.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if two writers declare the
    /// same key or more than one redirect resolver is registered.
    pub fn build(
        self,
        reserved_form_keys: &[&str],
        reserved_context_keys: &[&str],
    ) -> BracesResult<HookPipeline> {
        check_collisions(
            HookPoint::FormKwargs,
            reserved_form_keys,
            self.form_kwargs.iter().map(|i| (i.name(), i.keys())),
        )?;
        check_collisions(
            HookPoint::ContextData,
            reserved_context_keys,
            self.context.iter().map(|i| (i.name(), i.keys())),
        )?;
        if self.resolvers.len() > 1 {
            return Err(improperly_configured(
                "hook pipeline",
                format!(
                    "{} success URL resolvers registered, at most one is allowed",
                    self.resolvers.len()
                ),
            ));
        }

        Ok(HookPipeline {
            guards: self.guards,
            form_kwargs: self.form_kwargs,
            context: self.context,
            resolver: self.resolvers.into_iter().next(),
        })
    }
}

fn check_collisions<'a>(
    point: HookPoint,
    reserved: &[&str],
    writers: impl Iterator<Item = (&'a str, Vec<String>)>,
) -> BracesResult<()> {
    let mut seen: HashSet<String> = reserved.iter().map(ToString::to_string).collect();
    for (name, keys) in writers {
        for key in keys {
            if !seen.insert(key.clone()) {
                return Err(improperly_configured(
                    name,
                    format!("key '{key}' at hook point '{point}' is already written by another behavior"),
                ));
            }
        }
    }
    Ok(())
}

/// The frozen, shareable set of handlers for one view.
#[derive(Clone, Default)]
pub struct HookPipeline {
    guards: Vec<Arc<dyn Guard>>,
    form_kwargs: Vec<Arc<dyn FormKwargsInjector>>,
    context: Vec<Arc<dyn ContextInjector>>,
    resolver: Option<Arc<dyn RedirectResolver>>,
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("guards", &self.guards.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field(
                "form_kwargs",
                &self.form_kwargs.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field(
                "context",
                &self.context.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

impl HookPipeline {
    /// Creates a new [`HookPipelineBuilder`].
    pub fn builder() -> HookPipelineBuilder {
        HookPipelineBuilder::default()
    }

    /// Returns the number of registered guards.
    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if a success URL resolver is registered.
    pub const fn has_redirect(&self) -> bool {
        self.resolver.is_some()
    }

    /// Runs the `guard` phase. Returns the denial response of the first guard
    /// that refuses the request.
    ///
    /// # Errors
    ///
    /// Fails if the denial redirects to a URL that is not a valid header.
    pub async fn run_guards(
        &self,
        request: &RequestContext,
    ) -> BracesResult<Option<ResponseEnvelope>> {
        for guard in &self.guards {
            let decision = guard.check(request).await;
            if decision != GuardDecision::Proceed {
                tracing::debug!(
                    guard = guard.name(),
                    decision = ?decision,
                    "request denied by guard"
                );
                return decision.into_response();
            }
        }
        Ok(None)
    }

    /// Runs the `form_kwargs` phase over the workflow's base kwargs.
    ///
    /// # Errors
    ///
    /// Propagates injector failures, and rejects an injector writing a key
    /// that is already set.
    pub fn assemble_form_kwargs(
        &self,
        request: &RequestContext,
        mut kwargs: FormKwargs,
    ) -> BracesResult<FormKwargs> {
        for injector in &self.form_kwargs {
            for (key, value) in injector.contribute(request)? {
                kwargs.insert(key, value)?;
            }
        }
        Ok(kwargs)
    }

    /// Runs the `context_data` phase over the workflow's base context.
    ///
    /// # Errors
    ///
    /// Propagates injector failures, and rejects an injector writing a key
    /// that is already set.
    pub fn assemble_context(
        &self,
        request: &RequestContext,
        mut context: Context,
    ) -> BracesResult<Context> {
        for injector in &self.context {
            for (key, value) in injector.contribute(request, &context)? {
                if context.contains_key(&key) {
                    return Err(BracesError::ImproperlyConfigured(format!(
                        "Context key '{key}' written by '{}' is already set",
                        injector.name()
                    )));
                }
                context.insert(key, value);
            }
        }
        Ok(context)
    }

    /// Runs the `success_url` phase. `None` means no resolver is registered
    /// and the workflow should use its own default.
    pub fn resolve_success_url(
        &self,
        request: &RequestContext,
        object: Option<&Value>,
    ) -> BracesResult<Option<String>> {
        self.resolver
            .as_ref()
            .map(|resolver| resolver.resolve(request, object))
            .transpose()
    }
}

/// Builds an [`BracesError::ImproperlyConfigured`] and logs it at error level.
pub(crate) fn improperly_configured(component: &str, message: impl Into<String>) -> BracesError {
    let message = message.into();
    tracing::error!(component = component, "{message}");
    BracesError::ImproperlyConfigured(format!("{component}: {message}"))
}
