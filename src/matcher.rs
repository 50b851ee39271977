//! Pattern matching seam between configured rules and the routing engine.
//!
//! Rules carry plain regex strings; everything downstream works against the
//! `Matcher` trait so the underlying engine stays swappable without touching
//! router or insertion logic.

use anyhow::{Context, Result};
use regex::RegexBuilder;
use std::ops::Range;

/// Substring matching over submission text, filenames, and file content.
pub trait Matcher {
    /// Whether any substring of `text` matches. Anchoring is the pattern's
    /// own business.
    fn is_match(&self, text: &str) -> bool;

    /// Byte range of the first match in `text`, if any.
    fn first_match(&self, text: &str) -> Option<Range<usize>>;

    /// The source pattern, for logs and `jot rules` output.
    fn pattern(&self) -> &str;
}

/// Regex-backed matcher compiled in multiline mode so `^`/`$` bind to line
/// boundaries when a position pattern wants them.
#[derive(Debug)]
pub struct RegexMatcher {
    pattern: String,
    regex: regex::Regex,
}

impl RegexMatcher {
    /// Compile `pattern`, failing with the pattern in the error so a dropped
    /// rule can be reported usefully.
    pub fn compile(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .with_context(|| format!("compile pattern {pattern:?}"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn first_match(&self, text: &str) -> Option<Range<usize>> {
        self.regex.find(text).map(|m| m.range())
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_match_is_not_anchored() {
        let m = RegexMatcher::compile("todo").unwrap();
        assert!(m.is_match("a todo item"));
        assert!(!m.is_match("nothing here"));
    }

    #[test]
    fn pattern_anchors_still_apply() {
        let m = RegexMatcher::compile("^todo$").unwrap();
        assert!(m.is_match("todo"));
        assert!(!m.is_match("a todo"));
    }

    #[test]
    fn multiline_anchors_bind_to_lines() {
        let m = RegexMatcher::compile("^## Tasks$").unwrap();
        let content = "intro\n## Tasks\n- a\n";
        let range = m.first_match(content).unwrap();
        assert_eq!(&content[range], "## Tasks");
    }

    #[test]
    fn invalid_pattern_reports_source() {
        let err = RegexMatcher::compile("[unclosed").unwrap_err();
        assert!(format!("{err:#}").contains("[unclosed"));
    }
}
