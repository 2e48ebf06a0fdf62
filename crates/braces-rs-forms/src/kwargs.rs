//! Form constructor arguments.
//!
//! [`FormKwargs`] is what the `form_kwargs` hook phase assembles: the
//! workflow's base arguments first (`initial`, `prefix`), then each
//! registered injector's additions. A key may only be written once.

use std::collections::BTreeMap;

use braces_rs_core::{BracesError, BracesResult, ContextValue};

/// Key holding the initial field values (a dict).
pub const INITIAL: &str = "initial";
/// Key holding the HTML name prefix (a string).
pub const PREFIX: &str = "prefix";

/// Keys every form workflow writes before injectors run.
pub const BASE_KEYS: &[&str] = &[INITIAL, PREFIX];

/// Write-once keyword arguments handed to a [`FormClass`](crate::FormClass).
///
/// # Examples
///
/// ```
/// use braces_rs_forms::FormKwargs;
///
/// let mut kwargs = FormKwargs::new();
/// kwargs.insert("user", "alice").unwrap();
/// assert!(kwargs.insert("user", "bob").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormKwargs {
    values: BTreeMap<String, ContextValue>,
}

impl FormKwargs {
    /// Creates empty kwargs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value under a key that has not been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`BracesError::ImproperlyConfigured`] if the key is already set.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ContextValue>,
    ) -> BracesResult<()> {
        let key = key.into();
        if self.values.contains_key(&key) {
            return Err(BracesError::ImproperlyConfigured(format!(
                "Form kwarg '{key}' is written by more than one behavior"
            )));
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Returns `true` if `key` has been written.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the `initial` dict, if present.
    pub fn initial(&self) -> Option<&BTreeMap<String, ContextValue>> {
        self.get(INITIAL).and_then(ContextValue::as_dict)
    }

    /// Returns the `prefix`, if present and non-empty.
    pub fn prefix(&self) -> Option<&str> {
        self.get(PREFIX)
            .and_then(ContextValue::as_str)
            .filter(|p| !p.is_empty())
    }

    /// Iterates over the keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Returns the number of keys written.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over key/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ContextValue)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_write_once() {
        let mut kwargs = FormKwargs::new();
        kwargs.insert("parent_object", 3_i64).unwrap();
        let err = kwargs.insert("parent_object", 4_i64).unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(kwargs.get("parent_object"), Some(&ContextValue::Integer(3)));
    }

    #[test]
    fn test_initial_and_prefix() {
        let mut initial = BTreeMap::new();
        initial.insert("title".to_string(), ContextValue::from("Draft"));

        let mut kwargs = FormKwargs::new();
        kwargs.insert(INITIAL, initial).unwrap();
        kwargs.insert(PREFIX, "").unwrap();

        assert_eq!(
            kwargs.initial().and_then(|m| m.get("title")),
            Some(&ContextValue::from("Draft"))
        );
        assert_eq!(kwargs.prefix(), None);
    }
}
