//! Form field definitions and per-field cleaning.

use std::collections::HashMap;

use serde_json::Value;

/// The type of a form field, controlling parsing and coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldType {
    /// A character (string) field.
    Char {
        /// Minimum length (characters).
        min_length: Option<usize>,
        /// Maximum length (characters).
        max_length: Option<usize>,
        /// Whether to strip leading/trailing whitespace.
        strip: bool,
    },
    /// An integer field.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A checkbox. Absent means `false`.
    Boolean,
    /// An email address.
    Email,
}

impl FormFieldType {
    /// A plain text field with whitespace stripping and no length limits.
    pub const fn text() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: true,
        }
    }
}

/// A single field of a [`BaseForm`](crate::BaseForm).
#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldDef {
    /// The field name (HTML name attribute).
    pub name: String,
    /// The field type.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default value used when the field is optional and left empty.
    pub initial: Option<Value>,
    /// Human-readable label.
    pub label: String,
    /// Custom error messages keyed by error code (`required`, `invalid`).
    pub error_messages: HashMap<String, String>,
}

impl FormFieldDef {
    /// Creates a required field labelled after its name.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            label,
            error_messages: HashMap::new(),
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub const fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Overrides the message for an error code.
    #[must_use]
    pub fn error_message(mut self, code: &str, message: impl Into<String>) -> Self {
        self.error_messages.insert(code.to_string(), message.into());
        self
    }

    fn message(&self, code: &str, default: &str) -> String {
        self.error_messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }
}

/// Cleans a single raw value according to its field definition.
///
/// Returns the coerced value, or every error message the value produced.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    if field.field_type == FormFieldType::Boolean {
        let checked = raw.is_some_and(|v| matches!(v, "on" | "true" | "True" | "1"));
        if field.required && !checked {
            return Err(vec![field.message("required", "This field is required.")]);
        }
        return Ok(Value::Bool(checked));
    }

    let raw_str = raw.unwrap_or("");
    let trimmed_empty = match &field.field_type {
        FormFieldType::Char { strip: true, .. } | FormFieldType::Email => raw_str.trim().is_empty(),
        _ => raw_str.is_empty(),
    };

    if trimmed_empty {
        if field.required {
            return Err(vec![field.message("required", "This field is required.")]);
        }
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    let mut errors = Vec::new();

    let value = match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            strip,
        } => {
            let s = if *strip { raw_str.trim() } else { raw_str };
            let len = s.chars().count();
            if let Some(min) = min_length {
                if len < *min {
                    errors.push(format!(
                        "Ensure this value has at least {min} characters (it has {len})."
                    ));
                }
            }
            if let Some(max) = max_length {
                if len > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    ));
                }
            }
            Value::String(s.to_string())
        }

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match raw_str.trim().parse::<i64>() {
            Ok(n) => {
                if let Some(min) = min_value {
                    if n < *min {
                        errors.push(format!(
                            "Ensure this value is greater than or equal to {min}."
                        ));
                    }
                }
                if let Some(max) = max_value {
                    if n > *max {
                        errors.push(format!("Ensure this value is less than or equal to {max}."));
                    }
                }
                Value::from(n)
            }
            Err(_) => {
                errors.push(field.message("invalid", "Enter a whole number."));
                Value::Null
            }
        },

        FormFieldType::Email => {
            let s = raw_str.trim();
            if !is_valid_email(s) {
                errors.push(field.message("invalid", "Enter a valid email address."));
            }
            Value::String(s.to_string())
        }

        FormFieldType::Boolean => Value::Bool(true),
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !s.contains(char::is_whitespace)
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_missing() {
        let field = FormFieldDef::new("title", FormFieldType::text());
        assert_eq!(
            clean_field_value(&field, None),
            Err(vec!["This field is required.".to_string()])
        );
        assert!(clean_field_value(&field, Some("   ")).is_err());
    }

    #[test]
    fn test_optional_empty_uses_initial() {
        let field = FormFieldDef::new("note", FormFieldType::text())
            .required(false)
            .initial(Value::from("n/a"));
        assert_eq!(clean_field_value(&field, Some("")), Ok(Value::from("n/a")));
    }

    #[test]
    fn test_char_strip_and_length() {
        let field = FormFieldDef::new(
            "name",
            FormFieldType::Char {
                min_length: Some(3),
                max_length: Some(5),
                strip: true,
            },
        );
        assert_eq!(clean_field_value(&field, Some("  abc ")), Ok(Value::from("abc")));
        let errs = clean_field_value(&field, Some("ab")).unwrap_err();
        assert_eq!(errs, ["Ensure this value has at least 3 characters (it has 2)."]);
        assert!(clean_field_value(&field, Some("abcdef")).is_err());
    }

    #[test]
    fn test_integer_parse_and_bounds() {
        let field = FormFieldDef::new(
            "qty",
            FormFieldType::Integer {
                min_value: Some(1),
                max_value: Some(10),
            },
        );
        assert_eq!(clean_field_value(&field, Some("7")), Ok(Value::from(7)));
        assert_eq!(
            clean_field_value(&field, Some("seven")),
            Err(vec!["Enter a whole number.".to_string()])
        );
        assert_eq!(
            clean_field_value(&field, Some("11")),
            Err(vec!["Ensure this value is less than or equal to 10.".to_string()])
        );
    }

    #[test]
    fn test_email() {
        let field = FormFieldDef::new("email", FormFieldType::Email);
        assert_eq!(
            clean_field_value(&field, Some("a@example.com")),
            Ok(Value::from("a@example.com"))
        );
        assert!(clean_field_value(&field, Some("not-an-email")).is_err());
        assert!(clean_field_value(&field, Some("a@b")).is_err());
    }

    #[test]
    fn test_boolean() {
        let optional = FormFieldDef::new("done", FormFieldType::Boolean).required(false);
        assert_eq!(clean_field_value(&optional, None), Ok(Value::Bool(false)));
        assert_eq!(clean_field_value(&optional, Some("on")), Ok(Value::Bool(true)));

        let required = FormFieldDef::new("agree", FormFieldType::Boolean);
        assert!(clean_field_value(&required, None).is_err());
    }

    #[test]
    fn test_custom_error_message() {
        let field = FormFieldDef::new("title", FormFieldType::text())
            .error_message("required", "Give it a title.");
        assert_eq!(
            clean_field_value(&field, None),
            Err(vec!["Give it a title.".to_string()])
        );
    }
}
