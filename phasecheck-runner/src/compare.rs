// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-level comparison of compiler output.

use crate::errors::InvalidIgnorePattern;
use regex::Regex;
use similar::TextDiff;

/// The outcome of comparing two text bodies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ComparisonResult {
    /// The bodies are identical (after filtering).
    Equal,

    /// The bodies differ. Contains a unified diff of the two.
    Differing(String),
}

impl ComparisonResult {
    /// Returns true if the bodies compared equal.
    pub fn is_equal(&self) -> bool {
        matches!(self, Self::Equal)
    }
}

/// Compares two text bodies line by line, optionally dropping lines that match an ignore pattern.
///
/// Lines keep their terminators, so a missing trailing newline counts as a difference.
#[derive(Clone, Debug, Default)]
pub struct OutputComparator {
    ignore: Option<Regex>,
}

impl OutputComparator {
    /// The ignore pattern used for the primary comparison by default.
    ///
    /// Matches lines that embed a quoted path, such as `Parsing file: '/tmp/x/Loop.java'`. The two
    /// compilers run against unrelated directories, so these lines differ even on a pass.
    pub const DEFAULT_PRIMARY_IGNORE: &'static str = ".*: '.*'";

    /// Creates a comparator that compares every line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a comparator that drops lines matching `pattern` from both bodies before comparing.
    ///
    /// A line is dropped if the pattern matches anywhere within it.
    pub fn with_ignore_pattern(pattern: &str) -> Result<Self, InvalidIgnorePattern> {
        let ignore = Regex::new(pattern).map_err(|err| InvalidIgnorePattern::new(pattern, err))?;
        Ok(Self {
            ignore: Some(ignore),
        })
    }

    /// Returns the ignore pattern, if any.
    pub fn ignore_pattern(&self) -> Option<&str> {
        self.ignore.as_ref().map(|regex| regex.as_str())
    }

    /// Compares two text bodies.
    pub fn compare(&self, subject: &str, reference: &str) -> ComparisonResult {
        let subject_lines = self.filtered_lines(subject);
        let reference_lines = self.filtered_lines(reference);
        if subject_lines == reference_lines {
            return ComparisonResult::Equal;
        }

        let subject = subject_lines.concat();
        let reference = reference_lines.concat();
        ComparisonResult::Differing(render_diff(&subject, &reference))
    }

    /// Compares two byte bodies, such as generated artifacts.
    ///
    /// Equality is decided on the raw bytes. The diff is rendered from a lossy UTF-8 view.
    pub fn compare_bytes(&self, subject: &[u8], reference: &[u8]) -> ComparisonResult {
        if self.ignore.is_none() && subject == reference {
            return ComparisonResult::Equal;
        }

        let subject_text = String::from_utf8_lossy(subject);
        let reference_text = String::from_utf8_lossy(reference);
        match self.compare(&subject_text, &reference_text) {
            ComparisonResult::Equal if self.ignore.is_none() => ComparisonResult::Differing(
                "binary contents differ (differences are not valid UTF-8)\n".to_owned(),
            ),
            other => other,
        }
    }

    fn filtered_lines<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_inclusive('\n')
            .filter(|line| match &self.ignore {
                Some(ignore) => !ignore.is_match(line.trim_end_matches(['\n', '\r'])),
                None => true,
            })
            .collect()
    }
}

fn render_diff(subject: &str, reference: &str) -> String {
    TextDiff::from_lines(subject, reference)
        .unified_diff()
        .context_radius(3)
        .header("subject", "reference")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use proptest::prelude::*;

    #[test]
    fn identical_texts_are_equal() {
        let text = "line 1\nline 2\n";
        assert_eq!(OutputComparator::new().compare(text, text), ComparisonResult::Equal);
    }

    #[test]
    fn ignored_lines_are_masked() {
        let subject = indoc! {"
            Espresso Compiler
            Parsing file: '/tmp/subject/Loop.java'
            ok
        "};
        let reference = indoc! {"
            Espresso Compiler
            Parsing file: '/tmp/reference/Loop.java'
            ok
        "};

        let primary = OutputComparator::with_ignore_pattern(OutputComparator::DEFAULT_PRIMARY_IGNORE)
            .expect("default pattern is valid");
        assert_eq!(primary.compare(subject, reference), ComparisonResult::Equal);

        match OutputComparator::new().compare(subject, reference) {
            ComparisonResult::Differing(diff) => {
                assert!(diff.contains("-Parsing file: '/tmp/subject/Loop.java'"), "{diff}");
                assert!(diff.contains("+Parsing file: '/tmp/reference/Loop.java'"), "{diff}");
            }
            ComparisonResult::Equal => panic!("unfiltered comparison should differ"),
        }
    }

    #[test]
    fn ignored_lines_may_be_unbalanced() {
        let primary = OutputComparator::with_ignore_pattern(OutputComparator::DEFAULT_PRIMARY_IGNORE)
            .expect("default pattern is valid");
        let subject = "a\nFile: 'x'\nb\n";
        let reference = "a\nb\n";
        assert!(primary.compare(subject, reference).is_equal());
    }

    #[test]
    fn differing_lines_produce_unified_diff() {
        let result = OutputComparator::new().compare("a\nb\nc\n", "a\nB\nc\n");
        let ComparisonResult::Differing(diff) = result else {
            panic!("expected a difference");
        };
        assert!(diff.starts_with("--- subject\n+++ reference\n"), "{diff}");
        assert!(diff.contains("-b\n"), "{diff}");
        assert!(diff.contains("+B\n"), "{diff}");
    }

    #[test]
    fn missing_trailing_newline_differs() {
        assert!(!OutputComparator::new().compare("a\n", "a").is_equal());
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = OutputComparator::with_ignore_pattern("(unclosed").unwrap_err();
        assert_eq!(err.pattern(), "(unclosed");
    }

    #[test]
    fn bytes_compare_exactly() {
        let comparator = OutputComparator::new();
        assert!(comparator.compare_bytes(b"abc\n", b"abc\n").is_equal());
        assert!(!comparator.compare_bytes(b"abc\n", b"abd\n").is_equal());

        // Both of these decode to U+FFFD, but the bytes differ.
        match comparator.compare_bytes(b"\xff\n", b"\xfe\n") {
            ComparisonResult::Differing(diff) => assert!(diff.contains("binary contents differ")),
            ComparisonResult::Equal => panic!("raw bytes differ"),
        }
    }

    proptest! {
        #[test]
        fn identical_texts_are_equal_under_any_pattern(
            text in "[a-z:' \n]{0,64}",
            pattern in prop::sample::select(vec![".*: '.*'", "^a", "b+", "'"]),
        ) {
            let comparator = OutputComparator::with_ignore_pattern(pattern).unwrap();
            prop_assert_eq!(comparator.compare(&text, &text), ComparisonResult::Equal);
            prop_assert_eq!(OutputComparator::new().compare(&text, &text), ComparisonResult::Equal);
        }
    }
}
