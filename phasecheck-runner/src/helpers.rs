// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

/// Utilities for pluralizing various words based on count or plurality.
pub mod plural {
    /// Returns "test case" if `count` is 1, otherwise "test cases".
    pub fn cases_str(count: usize) -> &'static str {
        if count == 1 { "test case" } else { "test cases" }
    }
}

/// Formats a duration with millisecond precision, as shown next to each case.
pub(crate) fn format_duration(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

/// Returns `text` with a trailing newline, adding one if needed.
pub(crate) fn ensure_trailing_newline(text: &str) -> String {
    let mut text = text.to_owned();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}
