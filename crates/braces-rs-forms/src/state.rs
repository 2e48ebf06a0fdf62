//! Per-request form state.

use std::collections::HashMap;

use braces_rs_core::ContextValue;

use crate::form::Form;

/// Snapshot of a form as it is about to be rendered.
///
/// `locked` is computed by a workflow's lock predicate and is independent of
/// validation: a locked form is rendered but never bound or validated.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    /// Whether submitted data was bound to the form.
    pub bound: bool,
    /// Field errors, in reporting order per field.
    pub errors: HashMap<String, Vec<String>>,
    /// Whether the form rejects mutation attempts.
    pub locked: bool,
    rendered: ContextValue,
}

impl FormState {
    /// Captures the state of `form`.
    pub fn capture(form: &dyn Form, locked: bool) -> Self {
        Self {
            bound: form.is_bound(),
            errors: form.errors().clone(),
            locked,
            rendered: form.as_context(),
        }
    }

    /// Returns `true` if any field has an error.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns the value stored under the `form` context key: the form's own
    /// rendering plus a `locked` flag.
    pub fn to_context_value(&self) -> ContextValue {
        let mut value = self.rendered.clone();
        if let ContextValue::Dict(map) = &mut value {
            map.insert("locked".to_string(), ContextValue::Bool(self.locked));
        }
        value
    }
}

impl From<FormState> for ContextValue {
    fn from(state: FormState) -> Self {
        state.to_context_value()
    }
}
