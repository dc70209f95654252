//! Pattern matching utilities for prompt and error detection.

use std::ops::Range;

use regex::bytes::Regex;

/// Anything that can locate a prompt or marker in raw output.
pub trait PromptMatcher: Send + Sync {
    /// Byte range of the first match, if any.
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_match(data).is_some()
    }
}

impl PromptMatcher for Regex {
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>> {
        self.find(data).map(|m| m.range())
    }
}

/// Several patterns tried in order; the first one that matches wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Compile a list of pattern strings.
    pub fn compile<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn push(&mut self, pattern: Regex) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PromptMatcher for PatternSet {
    fn find_match(&self, data: &[u8]) -> Option<Range<usize>> {
        self.patterns.iter().find_map(|p| p.find_match(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_prompt_matcher() {
        let pattern = Regex::new(r"router# $").unwrap();
        assert_eq!(pattern.find_match(b"output\nrouter# "), Some(7..15));
        assert!(!pattern.is_match(b"router> "));
    }

    #[test]
    fn test_pattern_set_first_match_wins() {
        let set = PatternSet::compile([r"<ERROR> ", r"% Invalid"]).unwrap();
        assert!(set.is_match(b"foo\n<ERROR> invalid parameter\n"));
        assert!(set.is_match(b"% Invalid input"));
        assert!(!set.is_match(b"all good"));
    }

    #[test]
    fn test_empty_set_never_matches() {
        let set = PatternSet::default();
        assert!(set.is_empty());
        assert!(!set.is_match(b"<ERROR> "));
    }

    #[test]
    fn test_compile_rejects_invalid_pattern() {
        assert!(PatternSet::compile(["("]).is_err());
    }
}
