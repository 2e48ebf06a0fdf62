//! Success URL resolution after a mutation.

use std::collections::HashMap;
use std::sync::Arc;

use http::HeaderValue;
use serde_json::Value;

use braces_rs_core::{BracesError, BracesResult};
use braces_rs_http::RequestContext;

use crate::hooks::{improperly_configured, Behavior, HookPipelineBuilder, RedirectResolver};
use crate::placeholder;

/// Turns a route name plus arguments into a URL.
pub trait UrlReverser: Send + Sync {
    /// Reverses `name` with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::NotFound`] for unknown names and
    /// [`BracesError::ImproperlyConfigured`] for missing arguments.
    fn reverse(&self, name: &str, kwargs: &HashMap<String, String>) -> BracesResult<String>;
}

/// A name → pattern table where `{arg}` placeholders are filled from kwargs.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use braces_rs_views::success_url::{RouteMap, UrlReverser};
///
/// let routes = RouteMap::new().route("task-edit", "/tasks/{pk}/edit/");
/// let kwargs = HashMap::from([("pk".to_string(), "7".to_string())]);
/// assert_eq!(routes.reverse("task-edit", &kwargs).unwrap(), "/tasks/7/edit/");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RouteMap {
    routes: HashMap<String, String>,
}

impl RouteMap {
    /// Creates an empty route map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named pattern.
    #[must_use]
    pub fn route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }
}

impl UrlReverser for RouteMap {
    fn reverse(&self, name: &str, kwargs: &HashMap<String, String>) -> BracesResult<String> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| BracesError::NotFound(format!("No route named '{name}'")))?;

        placeholder::fill(pattern, |arg| kwargs.get(arg).cloned()).map_err(|err| {
            BracesError::ImproperlyConfigured(format!("Cannot reverse '{name}': {err}"))
        })
    }
}

/// Where to send the client after a successful mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessUrl {
    /// A literal URL.
    Static(String),
    /// A route name reversed without arguments.
    Named(String),
    /// A route name reversed with the created object's `pk`.
    NamedWithPk(String),
}

/// The registered [`RedirectResolver`] for a [`SuccessUrl`].
#[derive(Clone)]
pub struct SuccessUrlResolver {
    target: SuccessUrl,
    reverser: Option<Arc<dyn UrlReverser>>,
}

impl std::fmt::Debug for SuccessUrlResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessUrlResolver")
            .field("target", &self.target)
            .field("reverser", &self.reverser.is_some())
            .finish()
    }
}

impl SuccessUrlResolver {
    /// A resolver for a literal URL.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if `url` is empty or
    /// contains characters a `Location` header cannot carry.
    pub fn fixed(url: impl Into<String>) -> BracesResult<Self> {
        Self::new(SuccessUrl::Static(url.into()), None)
    }

    /// Creates a resolver. Named targets need a reverser.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if a static URL is empty
    /// or not sendable as a header, or a named target has no reverser.
    pub fn new(target: SuccessUrl, reverser: Option<Arc<dyn UrlReverser>>) -> BracesResult<Self> {
        match &target {
            SuccessUrl::Static(url) if url.is_empty() => {
                return Err(improperly_configured("SuccessUrl", "the success URL is empty"));
            }
            SuccessUrl::Static(url) if HeaderValue::from_str(url).is_err() => {
                return Err(improperly_configured(
                    "SuccessUrl",
                    format!("{url:?} is not a valid Location header"),
                ));
            }
            SuccessUrl::Named(name) | SuccessUrl::NamedWithPk(name) => {
                if name.is_empty() {
                    return Err(improperly_configured("SuccessUrl", "the route name is empty"));
                }
                if reverser.is_none() {
                    return Err(improperly_configured(
                        "SuccessUrl",
                        format!("route '{name}' needs a URL reverser"),
                    ));
                }
            }
            SuccessUrl::Static(_) => {}
        }
        Ok(Self { target, reverser })
    }

    fn reverser(&self) -> BracesResult<&dyn UrlReverser> {
        self.reverser
            .as_deref()
            .ok_or_else(|| BracesError::ImproperlyConfigured("No URL reverser".to_string()))
    }
}

fn pk_of(object: Option<&Value>) -> Option<String> {
    match object?.get("pk")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RedirectResolver for SuccessUrlResolver {
    fn resolve(&self, _request: &RequestContext, object: Option<&Value>) -> BracesResult<String> {
        match &self.target {
            SuccessUrl::Static(url) => Ok(url.clone()),
            SuccessUrl::Named(name) => self.reverser()?.reverse(name, &HashMap::new()),
            SuccessUrl::NamedWithPk(name) => {
                let pk = pk_of(object).ok_or_else(|| {
                    improperly_configured(
                        "SuccessUrl",
                        format!("route '{name}' needs a pk but the created object has none"),
                    )
                })?;
                self.reverser()?
                    .reverse(name, &HashMap::from([("pk".to_string(), pk)]))
            }
        }
    }
}

impl Behavior for SuccessUrlResolver {
    fn register(self, hooks: HookPipelineBuilder) -> HookPipelineBuilder {
        hooks.redirect(self)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn routes() -> Arc<dyn UrlReverser> {
        Arc::new(
            RouteMap::new()
                .route("task-list", "/tasks/")
                .route("task-edit", "/tasks/{pk}/edit/"),
        )
    }

    #[test]
    fn test_route_map_errors() {
        let routes = RouteMap::new().route("broken", "/x/{pk");
        assert!(matches!(
            routes.reverse("missing", &HashMap::new()),
            Err(BracesError::NotFound(_))
        ));
        assert!(routes.reverse("broken", &HashMap::new()).is_err());
        let edit = RouteMap::new().route("edit", "/tasks/{pk}/");
        assert!(edit
            .reverse("edit", &HashMap::new())
            .unwrap_err()
            .is_configuration_error());
    }

    #[test]
    fn test_static_url() {
        let resolver = SuccessUrlResolver::fixed("/done/").unwrap();
        let request = RequestContext::builder().build();
        assert_eq!(resolver.resolve(&request, None).unwrap(), "/done/");
        assert!(SuccessUrlResolver::fixed("").is_err());
    }

    #[test]
    fn test_static_url_must_be_a_valid_header() {
        let err = SuccessUrlResolver::fixed("/done/\nx").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_named_needs_reverser() {
        let err = SuccessUrlResolver::new(SuccessUrl::Named("task-list".into()), None).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_named_url() {
        let resolver =
            SuccessUrlResolver::new(SuccessUrl::Named("task-list".into()), Some(routes())).unwrap();
        let request = RequestContext::builder().build();
        assert_eq!(resolver.resolve(&request, None).unwrap(), "/tasks/");
    }

    #[test]
    fn test_named_with_pk() {
        let resolver =
            SuccessUrlResolver::new(SuccessUrl::NamedWithPk("task-edit".into()), Some(routes()))
                .unwrap();
        let request = RequestContext::builder().build();
        let object = json!({"pk": 12, "title": "Write docs"});
        assert_eq!(
            resolver.resolve(&request, Some(&object)).unwrap(),
            "/tasks/12/edit/"
        );
        assert!(resolver
            .resolve(&request, Some(&json!({"title": "no pk"})))
            .unwrap_err()
            .is_configuration_error());
        assert!(resolver.resolve(&request, None).is_err());
    }
}
