//! Multi-valued parameter dictionary.
//!
//! [`QueryDict`] holds both the query-string parameters and the form-encoded
//! body of a request. Each key keeps every submitted value in order; the
//! single-value accessor returns the last one, the way HTML forms expect.

use std::collections::HashMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped when building a query string.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// [`QUERY_ENCODE_SET`] with `/` also left alone, for path-valued parameters.
const PATH_VALUE_ENCODE_SET: &AsciiSet = &QUERY_ENCODE_SET.remove(b'/');

/// A dictionary of request parameters supporting multiple values per key.
///
/// # Examples
///
/// ```
/// use braces_rs_http::QueryDict;
///
/// let qd = QueryDict::parse("tag=red&tag=blue&page=2");
/// assert_eq!(qd.get("tag"), Some("blue"));
/// assert_eq!(qd.get_list("tag"), ["red", "blue"]);
/// assert_eq!(qd.get("page"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: HashMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates an empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    ///
    /// `+` decodes to a space and percent escapes are decoded leniently.
    pub fn parse(encoded: &str) -> Self {
        let mut qd = Self::new();
        for pair in encoded.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            qd.append(decode(key), decode(value));
        }
        qd
    }

    /// Builds a `QueryDict` from key/value pairs, appending in order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut qd = Self::new();
        for (key, value) in pairs {
            qd.append(key, value);
        }
        qd
    }

    /// Returns the last value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns every value submitted for `key`, or an empty slice.
    pub fn get_list(&self, key: &str) -> &[String] {
        self.data.get(key).map_or(&[], Vec::as_slice)
    }

    /// Appends a value for `key`.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces every value for `key` with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), vec![value.into()]);
    }

    /// Returns `true` if `key` was submitted.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no keys were submitted.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over the distinct keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    /// Encodes the dictionary back into a query string.
    ///
    /// Pairs are sorted so the output is deterministic.
    pub fn urlencode(&self) -> String {
        let mut parts: Vec<String> = self
            .data
            .iter()
            .flat_map(|(key, values)| {
                values
                    .iter()
                    .map(move |value| format!("{}={}", encode(key), encode(value)))
            })
            .collect();
        parts.sort();
        parts.join("&")
    }
}

/// Percent-encodes a single query-string component.
pub fn encode(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ENCODE_SET).to_string()
}

/// Percent-encodes a query value that holds a path, keeping `/` readable.
pub fn encode_path_value(input: &str) -> String {
    utf8_percent_encode(input, PATH_VALUE_ENCODE_SET).to_string()
}

fn decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}
