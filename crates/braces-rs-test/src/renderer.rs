//! A template renderer that remembers every context it rendered.

use std::sync::{Arc, Mutex, PoisonError};

use braces_rs_core::{BracesResult, Context};
use braces_rs_views::render::{DebugRenderer, TemplateRenderer};

/// Records `(template_name, context)` for every render and delegates the
/// output to [`DebugRenderer`].
///
/// Clones share the same record, so a test keeps one clone and hands the
/// other to the workflow.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    renders: Arc<Mutex<Vec<(String, Context)>>>,
}

impl RecordingRenderer {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of renders so far.
    pub fn render_count(&self) -> usize {
        self.renders.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The context of the most recent render.
    pub fn last_context(&self) -> Option<Context> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(_, context)| context.clone())
    }

    /// Every template name rendered, in order.
    pub fn templates(&self) -> Vec<String> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl TemplateRenderer for RecordingRenderer {
    fn render(&self, template_name: &str, context: &Context) -> BracesResult<String> {
        self.renders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((template_name.to_string(), context.clone()));
        DebugRenderer.render(template_name, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_renders() {
        let recorder = RecordingRenderer::new();
        let handle = recorder.clone();

        let mut context = Context::new();
        context.insert("headline", "Tasks");
        let html = recorder.render("tasks/list.html", &context).unwrap();

        assert!(html.contains("Tasks"));
        assert_eq!(handle.render_count(), 1);
        assert_eq!(handle.templates(), vec!["tasks/list.html".to_string()]);
        assert_eq!(handle.last_context(), Some(context));
    }
}
