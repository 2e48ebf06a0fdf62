//! Field-level validation pass.
//!
//! Errors accumulate across fields rather than short-circuiting, so every
//! problem with a submission is reported at once.

use std::collections::HashMap;

use serde_json::Value;

use crate::fields::{clean_field_value, FormFieldDef};

/// Cleans every field, filling `cleaned_data` on success and `errors` on
/// failure.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &HashMap<String, Option<String>>,
    cleaned_data: &mut HashMap<String, Value>,
    errors: &mut HashMap<String, Vec<String>>,
) {
    for field in field_defs {
        let raw = raw_data.get(&field.name).and_then(|v| v.as_deref());

        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;

    #[test]
    fn test_clean_fields_accumulates_errors() {
        let fields = vec![
            FormFieldDef::new("title", FormFieldType::text()),
            FormFieldDef::new(
                "rank",
                FormFieldType::Integer {
                    min_value: None,
                    max_value: None,
                },
            ),
            FormFieldDef::new("note", FormFieldType::text()).required(false),
        ];
        let mut raw = HashMap::new();
        raw.insert("title".to_string(), None);
        raw.insert("rank".to_string(), Some("x".to_string()));
        raw.insert("note".to_string(), Some("ok".to_string()));

        let mut cleaned = HashMap::new();
        let mut errors = HashMap::new();
        clean_fields(&fields, &raw, &mut cleaned, &mut errors);

        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("rank"));
        assert_eq!(cleaned.get("note"), Some(&Value::from("ok")));
    }
}
