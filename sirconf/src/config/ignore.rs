//! Ignore patterns for configuration lines.

use std::fmt;

use regex::Regex;

/// A pattern that hides matching configuration lines from comparison.
///
/// Patterns are tried as regular expressions anchored at the start of the
/// line. Text that does not compile as a regex is treated as a literal
/// prefix instead.
#[derive(Debug, Clone)]
pub enum IgnorePattern {
    /// Regex matched at the beginning of the line.
    Regex(Regex),
    /// Literal line prefix.
    Literal(String),
}

impl IgnorePattern {
    /// Build a pattern, falling back to a literal prefix on invalid regex.
    pub fn new(pattern: &str) -> Self {
        match Regex::new(&format!("^(?:{})", pattern)) {
            Ok(regex) => Self::Regex(regex),
            Err(_) => Self::Literal(pattern.to_string()),
        }
    }

    /// Build a literal prefix pattern.
    pub fn literal(prefix: impl Into<String>) -> Self {
        Self::Literal(prefix.into())
    }

    /// Check whether a (trimmed) configuration line is ignored.
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(line),
            Self::Literal(prefix) => line.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for IgnorePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(regex) => write!(f, "{}", regex.as_str()),
            Self::Literal(prefix) => write!(f, "{}", prefix),
        }
    }
}

impl From<&str> for IgnorePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for IgnorePattern {
    fn from(pattern: String) -> Self {
        Self::new(&pattern)
    }
}
