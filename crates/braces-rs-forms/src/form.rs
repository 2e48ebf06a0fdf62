//! Form trait and `BaseForm` implementation.
//!
//! The [`Form`] trait is what list+create workflows bind submissions to.
//! Validation is async so implementations can hit the database for
//! uniqueness checks during `is_valid()`.
//!
//! [`BaseForm`] is a general-purpose implementation built from a list of
//! [`FormFieldDef`]s; [`FormClass`] is the factory a workflow is configured
//! with, called once per request with the assembled [`FormKwargs`].

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;

use braces_rs_core::{BracesError, BracesResult, ContextValue};
use braces_rs_http::QueryDict;

use crate::fields::FormFieldDef;
use crate::kwargs::FormKwargs;
use crate::validation;

/// Key under which form-level errors are reported.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// The core form trait.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the kwargs the form was constructed with.
    fn kwargs(&self) -> &FormKwargs;

    /// Binds submitted data to this form.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` if this form has been bound to data.
    fn is_bound(&self) -> bool;

    /// Validates the bound data. An unbound form is never valid.
    async fn is_valid(&mut self) -> bool;

    /// Returns per-field validation errors, in reporting order per field.
    fn errors(&self) -> &HashMap<String, Vec<String>>;

    /// Returns the cleaned data. Only populated after a successful
    /// `is_valid()`.
    fn cleaned_data(&self) -> &HashMap<String, Value>;

    /// Renders the form as a context value for templates.
    fn as_context(&self) -> ContextValue;

    /// Cross-field validation hook. The default accepts everything.
    async fn clean(&self) -> Result<(), HashMap<String, Vec<String>>> {
        Ok(())
    }
}

/// Builds a fresh form for each request from the assembled kwargs.
pub trait FormClass: Send + Sync {
    /// Constructs an unbound form.
    fn create(&self, kwargs: FormKwargs) -> BracesResult<Box<dyn Form>>;
}

impl<F> FormClass for F
where
    F: Fn(FormKwargs) -> BracesResult<Box<dyn Form>> + Send + Sync,
{
    fn create(&self, kwargs: FormKwargs) -> BracesResult<Box<dyn Form>> {
        self(kwargs)
    }
}

/// A [`FormClass`] producing [`BaseForm`]s over a fixed field list.
#[derive(Debug, Clone)]
pub struct FieldsFormClass {
    fields: Vec<FormFieldDef>,
}

impl FieldsFormClass {
    /// Creates the form class.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if there are no fields or
    /// two fields share a name.
    pub fn new(fields: Vec<FormFieldDef>) -> BracesResult<Self> {
        if fields.is_empty() {
            return Err(BracesError::ImproperlyConfigured(
                "A form class needs at least one field".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(BracesError::ImproperlyConfigured(format!(
                    "Form field '{}' is declared twice",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }
}

impl FormClass for FieldsFormClass {
    fn create(&self, kwargs: FormKwargs) -> BracesResult<Box<dyn Form>> {
        Ok(Box::new(BaseForm::new(self.fields.clone(), kwargs)))
    }
}

/// A general-purpose form over a list of field definitions.
#[derive(Debug, Clone)]
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    kwargs: FormKwargs,
    bound: bool,
    raw_data: HashMap<String, Option<String>>,
    errors: HashMap<String, Vec<String>>,
    cleaned_data: HashMap<String, Value>,
}

impl BaseForm {
    /// Creates an unbound form.
    pub fn new(fields: Vec<FormFieldDef>, kwargs: FormKwargs) -> Self {
        Self {
            field_defs: fields,
            kwargs,
            bound: false,
            raw_data: HashMap::new(),
            errors: HashMap::new(),
            cleaned_data: HashMap::new(),
        }
    }

    /// Returns the field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    /// Returns the form-level errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.errors.get(NON_FIELD_ERRORS).map_or(&[], Vec::as_slice)
    }

    fn html_name(&self, field: &str) -> String {
        match self.kwargs.prefix() {
            Some(p) => format!("{p}-{field}"),
            None => field.to_string(),
        }
    }

    fn display_value(&self, field: &FormFieldDef) -> ContextValue {
        if self.bound {
            return self
                .raw_data
                .get(&field.name)
                .cloned()
                .flatten()
                .map_or(ContextValue::Null, ContextValue::String);
        }
        self.kwargs
            .initial()
            .and_then(|initial| initial.get(&field.name))
            .cloned()
            .or_else(|| field.initial.as_ref().map(ContextValue::from))
            .unwrap_or(ContextValue::Null)
    }
}

#[async_trait]
impl Form for BaseForm {
    fn kwargs(&self) -> &FormKwargs {
        &self.kwargs
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.field_defs {
            let value = data.get(&self.html_name(&field.name)).map(String::from);
            self.raw_data.insert(field.name.clone(), value);
        }
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }

        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if let Err(form_errors) = self.clean().await {
            for (key, msgs) in form_errors {
                self.errors.entry(key).or_default().extend(msgs);
            }
        }

        if !self.errors.is_empty() {
            self.cleaned_data.clear();
        }
        self.errors.is_empty()
    }

    fn errors(&self) -> &HashMap<String, Vec<String>> {
        &self.errors
    }

    fn cleaned_data(&self) -> &HashMap<String, Value> {
        &self.cleaned_data
    }

    fn as_context(&self) -> ContextValue {
        let fields: Vec<ContextValue> = self
            .field_defs
            .iter()
            .map(|field| {
                let mut field_ctx = BTreeMap::new();
                field_ctx.insert(
                    "name".to_string(),
                    ContextValue::String(self.html_name(&field.name)),
                );
                field_ctx.insert("label".to_string(), ContextValue::from(field.label.as_str()));
                field_ctx.insert("value".to_string(), self.display_value(field));
                field_ctx.insert("required".to_string(), ContextValue::Bool(field.required));
                field_ctx.insert(
                    "errors".to_string(),
                    ContextValue::from(self.errors.get(&field.name).cloned().unwrap_or_default()),
                );
                ContextValue::Dict(field_ctx)
            })
            .collect();

        let errors: BTreeMap<String, ContextValue> = self
            .errors
            .iter()
            .map(|(k, v)| (k.clone(), ContextValue::from(v.clone())))
            .collect();

        let mut ctx = BTreeMap::new();
        ctx.insert("fields".to_string(), ContextValue::List(fields));
        ctx.insert("errors".to_string(), ContextValue::Dict(errors));
        ctx.insert(
            "non_field_errors".to_string(),
            ContextValue::from(self.non_field_errors().to_vec()),
        );
        ctx.insert("is_bound".to_string(), ContextValue::Bool(self.bound));
        ContextValue::Dict(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;
    use crate::kwargs::{INITIAL, PREFIX};

    fn task_fields() -> Vec<FormFieldDef> {
        vec![
            FormFieldDef::new(
                "title",
                FormFieldType::Char {
                    min_length: Some(2),
                    max_length: Some(50),
                    strip: true,
                },
            ),
            FormFieldDef::new(
                "estimate",
                FormFieldType::Integer {
                    min_value: Some(0),
                    max_value: None,
                },
            )
            .required(false),
        ]
    }

    #[tokio::test]
    async fn test_form_unbound_is_invalid() {
        let mut form = BaseForm::new(task_fields(), FormKwargs::new());
        assert!(!form.is_bound());
        assert!(!form.is_valid().await);
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_form_bind_and_validate() {
        let mut form = BaseForm::new(task_fields(), FormKwargs::new());
        form.bind(&QueryDict::parse("title=Write+docs&estimate=3"));
        assert!(form.is_valid().await);
        assert_eq!(form.cleaned_data().get("title"), Some(&Value::from("Write docs")));
        assert_eq!(form.cleaned_data().get("estimate"), Some(&Value::from(3)));
    }

    #[tokio::test]
    async fn test_form_invalid_reports_errors() {
        let mut form = BaseForm::new(task_fields(), FormKwargs::new());
        form.bind(&QueryDict::parse("title=&estimate=-1"));
        assert!(!form.is_valid().await);
        assert_eq!(form.errors()["title"], ["This field is required."]);
        assert_eq!(
            form.errors()["estimate"],
            ["Ensure this value is greater than or equal to 0."]
        );
        assert!(form.cleaned_data().is_empty());
    }

    #[tokio::test]
    async fn test_form_prefix() {
        let mut kwargs = FormKwargs::new();
        kwargs.insert(PREFIX, "task").unwrap();
        let mut form = BaseForm::new(task_fields(), kwargs);
        form.bind(&QueryDict::parse("task-title=Hello"));
        assert!(form.is_valid().await);
        assert_eq!(form.cleaned_data().get("title"), Some(&Value::from("Hello")));
    }

    #[test]
    fn test_as_context_uses_initial_when_unbound() {
        let mut initial = BTreeMap::new();
        initial.insert("title".to_string(), ContextValue::from("Draft"));
        let mut kwargs = FormKwargs::new();
        kwargs.insert(INITIAL, initial).unwrap();

        let form = BaseForm::new(task_fields(), kwargs);
        let ctx = form.as_context();
        let first = &ctx.get("fields").and_then(ContextValue::as_list).unwrap()[0];
        assert_eq!(first.get("value"), Some(&ContextValue::from("Draft")));
        assert_eq!(ctx.get("is_bound"), Some(&ContextValue::Bool(false)));
    }

    #[tokio::test]
    async fn test_as_context_shows_submitted_value_and_errors() {
        let mut form = BaseForm::new(task_fields(), FormKwargs::new());
        form.bind(&QueryDict::parse("title=x"));
        assert!(!form.is_valid().await);
        let ctx = form.as_context();
        let first = &ctx.get("fields").and_then(ContextValue::as_list).unwrap()[0];
        assert_eq!(first.get("value"), Some(&ContextValue::from("x")));
        assert_eq!(
            first.get("errors").and_then(ContextValue::as_list).map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn test_fields_form_class_validation() {
        assert!(FieldsFormClass::new(vec![]).is_err());
        let dup = vec![
            FormFieldDef::new("a", FormFieldType::text()),
            FormFieldDef::new("a", FormFieldType::Email),
        ];
        assert!(FieldsFormClass::new(dup).unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_closure_form_class() {
        let class = |kwargs: FormKwargs| -> BracesResult<Box<dyn Form>> {
            Ok(Box::new(BaseForm::new(task_fields(), kwargs)))
        };
        let form = class.create(FormKwargs::new()).unwrap();
        assert!(!form.is_bound());
    }
}
