// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving the file name given to `single` into a test case path.

use crate::errors::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Resolves `filename` to a path relative to `harness_root`.
///
/// A name with more than one path component that exists relative to the harness root is used as
/// is. Otherwise `tests_dir` is searched recursively for a file named `filename`, or whose
/// lowercased name is `filename`. Exactly one match is required.
pub(crate) fn resolve_case(
    harness_root: &Utf8Path,
    tests_dir: &Utf8Path,
    filename: &str,
) -> Result<Utf8PathBuf> {
    let as_path = Utf8Path::new(filename);
    if as_path.components().count() > 1 && harness_root.join(as_path).is_file() {
        debug!(%filename, "using test case path as given");
        return Ok(as_path.to_owned());
    }

    let search_root = harness_root.join(tests_dir);
    let mut found: Option<Utf8PathBuf> = None;

    for entry in WalkDir::new(&search_root).sort_by_file_name() {
        let entry = entry.map_err(|err| ExpectedError::CaseSearchError {
            tests_dir: tests_dir.to_owned(),
            err,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name != filename && name.to_lowercase() != filename {
            continue;
        }

        // Paths under the search root are UTF-8 as long as the names along the way are.
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            continue;
        };
        let relative = path
            .strip_prefix(harness_root)
            .map_or_else(|_| path.to_owned(), Utf8Path::to_owned);

        if let Some(first) = found {
            return Err(ExpectedError::AmbiguousCase {
                filename: filename.to_owned(),
                first,
                second: relative,
            });
        }
        found = Some(relative);
    }

    found.ok_or_else(|| ExpectedError::CaseNotFound {
        filename: filename.to_owned(),
        tests_dir: tests_dir.to_owned(),
    })
}
