//! Template rendering contract.

use braces_rs_core::{BracesResult, Context};

use crate::json::{IsoJsonEncoder, JsonEncoder};

/// Renders a named template with a context. The host framework's template
/// engine sits behind this trait.
pub trait TemplateRenderer: Send + Sync {
    /// Renders `template_name` to a string.
    fn render(&self, template_name: &str, context: &Context) -> BracesResult<String>;
}

/// Fallback renderer that dumps the context as pretty JSON inside a minimal
/// HTML page. Useful until a real engine is wired in.
///
/// # Examples
///
/// ```
/// use braces_rs_core::Context;
/// use braces_rs_views::render::{DebugRenderer, TemplateRenderer};
///
/// let mut context = Context::new();
/// context.insert("headline", "Tasks");
/// let html = DebugRenderer.render("tasks/list.html", &context).unwrap();
/// assert!(html.starts_with("<!-- Template: tasks/list.html -->"));
/// assert!(html.contains("\"headline\": \"Tasks\""));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugRenderer;

impl TemplateRenderer for DebugRenderer {
    fn render(&self, template_name: &str, context: &Context) -> BracesResult<String> {
        let value = IsoJsonEncoder.encode_context(context)?;
        let body = serde_json::to_string_pretty(&value)?;
        Ok(format!(
            "<!-- Template: {template_name} -->\n<html><body><pre>{body}</pre></body></html>"
        ))
    }
}

impl<F> TemplateRenderer for F
where
    F: Fn(&str, &Context) -> BracesResult<String> + Send + Sync,
{
    fn render(&self, template_name: &str, context: &Context) -> BracesResult<String> {
        self(template_name, context)
    }
}
