//! Attribute injectors: fixed or computed values added to the rendering
//! context or the form kwargs without any branching logic of their own.

use std::fmt;
use std::sync::Arc;

use braces_rs_core::settings::Settings;
use braces_rs_core::{BracesResult, Context, ContextValue};
use braces_rs_http::RequestContext;

use crate::hooks::{
    improperly_configured, Behavior, ContextInjector, FormKwargsInjector, HookPipelineBuilder,
};

/// Context key written by [`SetHeadline`].
pub const HEADLINE: &str = "headline";
/// Context key written by [`ExtendTemplateVariable`].
pub const TEMPLATE_EXTEND: &str = "template_extend";
/// Form kwarg written by [`UserFormKwargs`].
pub const USER: &str = "user";

type HeadlineFn = dyn Fn(&RequestContext, &Context) -> String + Send + Sync;

#[derive(Clone)]
enum Headline {
    Static(String),
    Computed(Arc<HeadlineFn>),
}

/// Adds a `headline` to the context.
///
/// # Examples
///
/// ```
/// use braces_rs_views::injectors::SetHeadline;
///
/// assert!(SetHeadline::new("").is_err());
/// let computed = SetHeadline::computed(|request, _ctx| format!("Tasks in {}", request.path()));
/// ```
#[derive(Clone)]
pub struct SetHeadline {
    headline: Headline,
}

impl fmt::Debug for SetHeadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.headline {
            Headline::Static(text) => f.debug_tuple("SetHeadline").field(text).finish(),
            Headline::Computed(_) => f.write_str("SetHeadline(<computed>)"),
        }
    }
}

impl SetHeadline {
    /// A fixed headline.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if `text` is empty.
    ///
    /// [`BracesError::ImproperlyConfigured`]: braces_rs_core::BracesError::ImproperlyConfigured
    pub fn new(text: impl Into<String>) -> BracesResult<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(improperly_configured(
                "SetHeadline",
                "a headline is required, use SetHeadline::computed for dynamic text",
            ));
        }
        Ok(Self {
            headline: Headline::Static(text),
        })
    }

    /// A headline computed per request from the context assembled so far.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&RequestContext, &Context) -> String + Send + Sync + 'static,
    {
        Self {
            headline: Headline::Computed(Arc::new(f)),
        }
    }
}

impl ContextInjector for SetHeadline {
    fn name(&self) -> &str {
        "set_headline"
    }

    fn keys(&self) -> Vec<String> {
        vec![HEADLINE.to_string()]
    }

    fn contribute(
        &self,
        request: &RequestContext,
        context: &Context,
    ) -> BracesResult<Vec<(String, ContextValue)>> {
        let text = match &self.headline {
            Headline::Static(text) => text.clone(),
            Headline::Computed(f) => f(request, context),
        };
        Ok(vec![(HEADLINE.to_string(), ContextValue::String(text))])
    }
}

impl Behavior for SetHeadline {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.context(self)
    }
}

/// Picks the base template a page extends: the modal one for AJAX requests.
#[derive(Debug, Clone)]
pub struct ExtendTemplateVariable {
    default_template: String,
    modal_template: String,
}

impl Default for ExtendTemplateVariable {
    fn default() -> Self {
        let settings = Settings::current();
        Self {
            default_template: settings.default_extend_template,
            modal_template: settings.modal_extend_template,
        }
    }
}

impl ExtendTemplateVariable {
    /// Uses the templates named in settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the template used for regular requests.
    #[must_use]
    pub fn default_template(mut self, name: impl Into<String>) -> Self {
        self.default_template = name.into();
        self
    }

    /// Overrides the template used for AJAX requests.
    #[must_use]
    pub fn modal_template(mut self, name: impl Into<String>) -> Self {
        self.modal_template = name.into();
        self
    }
}

impl ContextInjector for ExtendTemplateVariable {
    fn name(&self) -> &str {
        "extend_template_variable"
    }

    fn keys(&self) -> Vec<String> {
        vec![TEMPLATE_EXTEND.to_string()]
    }

    fn contribute(
        &self,
        request: &RequestContext,
        _context: &Context,
    ) -> BracesResult<Vec<(String, ContextValue)>> {
        let template = if request.is_ajax() {
            &self.modal_template
        } else {
            &self.default_template
        };
        Ok(vec![(
            TEMPLATE_EXTEND.to_string(),
            ContextValue::String(template.clone()),
        )])
    }
}

impl Behavior for ExtendTemplateVariable {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.context(self)
    }
}

/// Passes the current principal to the form as the `user` kwarg.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserFormKwargs;

impl FormKwargsInjector for UserFormKwargs {
    fn name(&self) -> &str {
        "user_form_kwargs"
    }

    fn keys(&self) -> Vec<String> {
        vec![USER.to_string()]
    }

    fn contribute(&self, request: &RequestContext) -> BracesResult<Vec<(String, ContextValue)>> {
        Ok(vec![(
            USER.to_string(),
            request.principal().to_context_value(),
        )])
    }
}

impl Behavior for UserFormKwargs {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.form_kwargs(self)
    }
}

// ── Static additions ────────────────────────────────────────────────

/// Adds fixed entries to the rendering context.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    entries: Vec<(String, ContextValue)>,
}

impl StaticContext {
    /// Creates an empty injector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }
}

impl ContextInjector for StaticContext {
    fn name(&self) -> &str {
        "static_context"
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn contribute(
        &self,
        _request: &RequestContext,
        _context: &Context,
    ) -> BracesResult<Vec<(String, ContextValue)>> {
        Ok(self.entries.clone())
    }
}

impl Behavior for StaticContext {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.context(self)
    }
}

/// Adds fixed entries to the form kwargs.
#[derive(Debug, Clone, Default)]
pub struct StaticFormKwargs {
    entries: Vec<(String, ContextValue)>,
}

impl StaticFormKwargs {
    /// Creates an empty injector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }
}

impl FormKwargsInjector for StaticFormKwargs {
    fn name(&self) -> &str {
        "static_form_kwargs"
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    fn contribute(&self, _request: &RequestContext) -> BracesResult<Vec<(String, ContextValue)>> {
        Ok(self.entries.clone())
    }
}

impl Behavior for StaticFormKwargs {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.form_kwargs(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use braces_rs_forms::FormKwargs;
    use braces_rs_http::User;

    use super::*;
    use crate::hooks::HookPipeline;

    #[test]
    fn test_static_headline() {
        let pipeline = HookPipeline::builder()
            .behavior(SetHeadline::new("Tasks").unwrap())
            .build(&[], &[])
            .unwrap();
        let context = pipeline
            .assemble_context(&RequestContext::builder().build(), Context::new())
            .unwrap();
        assert_eq!(context.get(HEADLINE), Some(&ContextValue::from("Tasks")));
    }

    #[test]
    fn test_computed_headline_sees_context() {
        let headline = SetHeadline::computed(|_request, context| {
            format!("{} items", context.get("count").map_or(0, |c| c.as_i64().unwrap_or(0)))
        });
        let mut base = Context::new();
        base.insert("count", 4_i64);
        let added = headline
            .contribute(&RequestContext::builder().build(), &base)
            .unwrap();
        assert_eq!(added[0].1, ContextValue::from("4 items"));
    }

    #[test]
    fn test_empty_headline_is_configuration_error() {
        assert!(SetHeadline::new("").unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_extend_template_variable() {
        let injector = ExtendTemplateVariable::new()
            .default_template("site.html")
            .modal_template("modal.html");
        let plain = RequestContext::builder().build();
        let ajax = RequestContext::builder()
            .header("X-Requested-With", "XMLHttpRequest")
            .build();

        let value = |request: &RequestContext| {
            injector.contribute(request, &Context::new()).unwrap()[0].1.clone()
        };
        assert_eq!(value(&plain), ContextValue::from("site.html"));
        assert_eq!(value(&ajax), ContextValue::from("modal.html"));
    }

    #[test]
    fn test_user_form_kwargs() {
        let pipeline = HookPipeline::builder()
            .behavior(UserFormKwargs)
            .build(&["initial", "prefix"], &[])
            .unwrap();
        let request = RequestContext::builder()
            .principal(Arc::new(User::new("amy")))
            .build();
        let kwargs = pipeline
            .assemble_form_kwargs(&request, FormKwargs::new())
            .unwrap();
        assert_eq!(
            kwargs.get(USER).and_then(|u| u.get("username")),
            Some(&ContextValue::from("amy"))
        );
    }

    #[test]
    fn test_static_injectors_collide_with_each_other() {
        let err = HookPipeline::builder()
            .behavior(StaticContext::new().with("section", "tasks"))
            .behavior(SetHeadline::new("x").unwrap())
            .behavior(StaticContext::new().with("section", "other"))
            .build(&[], &[])
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_static_form_kwargs() {
        let injector = StaticFormKwargs::new().with("source", "inline");
        assert_eq!(injector.keys(), vec!["source".to_string()]);
        let added = injector
            .contribute(&RequestContext::builder().build())
            .unwrap();
        assert_eq!(added, vec![("source".to_string(), ContextValue::from("inline"))]);
    }
}
