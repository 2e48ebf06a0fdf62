//! `{name}` placeholder substitution shared by route reversing and filename
//! formats.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlaceholderError {
    Unterminated,
    Missing(String),
}

impl fmt::Display for PlaceholderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unterminated => f.write_str("unterminated '{' placeholder"),
            Self::Missing(name) => write!(f, "no value for placeholder '{name}'"),
        }
    }
}

/// Replaces every `{name}` in `pattern` with `lookup(name)`.
pub(crate) fn fill(
    pattern: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, PlaceholderError> {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or(PlaceholderError::Unterminated)?;
        let name = &after[..end];
        let value = lookup(name).ok_or_else(|| PlaceholderError::Missing(name.to_string()))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Checks `pattern` for unterminated placeholders without filling it.
pub(crate) fn check(pattern: &str) -> Result<(), PlaceholderError> {
    fill(pattern, |_| Some(String::new())).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill() {
        let filled = fill("file_{timestamp}.xls", |name| {
            (name == "timestamp").then(|| "2024-01-31".to_string())
        });
        assert_eq!(filled.unwrap(), "file_2024-01-31.xls");
    }

    #[test]
    fn test_fill_errors() {
        assert_eq!(fill("a{b", |_| None), Err(PlaceholderError::Unterminated));
        assert_eq!(
            fill("{who}", |_| None),
            Err(PlaceholderError::Missing("who".to_string()))
        );
        assert!(check("plain.txt").is_ok());
        assert!(check("{open").is_err());
    }
}
