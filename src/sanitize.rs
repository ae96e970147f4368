//! Derivation of a Python package identifier from a directory name.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::constants::RESERVED_NAMES;
use crate::error::ConfigError;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
    })
}

/// A valid package identifier, `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First letter upper-cased, the rest untouched: `my_app` -> `My_app`.
    pub fn capitalized(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Whether this identifier collides with a reserved name.
    pub fn is_reserved(&self) -> bool {
        let lowered = self.0.to_lowercase();
        RESERVED_NAMES.contains(&lowered.as_str())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replaces hyphens and periods with underscores. Never fails.
pub fn substitute(raw: &str) -> String {
    raw.chars().map(|c| if c == '-' || c == '.' { '_' } else { c }).collect()
}

/// Turns a directory name into an [`Identifier`].
///
/// Names that still are not identifiers after substitution (leading digit, spaces,
/// empty) are rejected with [`ConfigError::InvalidName`] rather than emitted broken.
pub fn sanitize(raw: &str) -> Result<Identifier, ConfigError> {
    let sanitized = substitute(raw);
    if !identifier_pattern().is_match(&sanitized) {
        return Err(ConfigError::InvalidName { raw: raw.to_string(), sanitized });
    }
    Ok(Identifier(sanitized))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalized_keeps_tail() {
        let id = sanitize("my_cool_app").unwrap();
        assert_eq!(id.capitalized(), "My_cool_app");
    }

    #[test]
    fn test_capitalized_leading_underscore() {
        let id = sanitize("_private").unwrap();
        assert_eq!(id.capitalized(), "_private");
    }
}
