// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of generated artifact names from compiler output.
//!
//! Both compilers print a diagnostic stream made up of sections separated by lines of dashes. The
//! third section lists every file the compiler generated, each quoted as `'<name>.<ext>'`. The
//! names are extracted in stream order: the validator pairs the subject's list against the
//! reference's list positionally, so the order must never change.

use crate::errors::SectionError;
use regex::Regex;
use std::{fmt, sync::LazyLock};
use tracing::debug;

static SECTION_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+\n").expect("section separator regex is valid"));

static ARTIFACT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'([^'\n]+)\.(rj|j)'").expect("artifact token regex is valid")
});

/// A recognized extension for a generated artifact.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArtifactExtension {
    /// `.rj`
    Rj,

    /// `.j`
    J,
}

impl ArtifactExtension {
    /// All recognized extensions.
    pub const ALL: &'static [Self] = &[Self::Rj, Self::J];

    /// Returns the extension without the leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rj => "rj",
            Self::J => "j",
        }
    }

    fn from_match(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|ext| ext.as_str() == s)
    }
}

impl fmt::Display for ArtifactExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.as_str())
    }
}

/// A generated file named in a compiler's output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArtifactReference {
    /// The file name exactly as it was quoted, including any directory.
    pub file_name: String,

    /// The file name with its directory and recognized extension removed.
    ///
    /// Two references name the same logical artifact iff their base names match.
    pub base_name: String,

    /// The recognized extension.
    pub extension: ArtifactExtension,
}

impl ArtifactReference {
    /// Creates a reference from a quoted file name and its recognized extension.
    ///
    /// `stem` is the file name with the extension (and its dot) already removed.
    pub fn new(stem: &str, extension: ArtifactExtension) -> Self {
        let base_name = stem.rsplit(['/', '\\']).next().unwrap_or(stem).to_owned();
        Self {
            file_name: format!("{stem}{extension}"),
            base_name,
            extension,
        }
    }

    /// Returns true if `other` names the same logical artifact.
    pub fn same_artifact(&self, other: &Self) -> bool {
        self.base_name == other.base_name
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}

/// Extracts [`ArtifactReference`]s from the text of a compiler run.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArtifactNameParser {
    _private: (),
}

impl ArtifactNameParser {
    /// The index of the section that lists generated files.
    pub const METADATA_SECTION: usize = 2;

    /// Creates a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the generated file names out of `text`, in the order they appear.
    ///
    /// A separator at the very start of the text does not open an empty section. If the text has
    /// fewer than three sections (typically because the compiler crashed before printing them),
    /// a [`SectionError`] is returned.
    pub fn parse(&self, text: &str) -> Result<Vec<ArtifactReference>, SectionError> {
        let section = Self::metadata_section(text)?;
        let references: Vec<_> = ARTIFACT_TOKEN
            .captures_iter(section)
            .filter_map(|captures| {
                let stem = captures.get(1)?.as_str();
                let extension = ArtifactExtension::from_match(captures.get(2)?.as_str())?;
                Some(ArtifactReference::new(stem, extension))
            })
            .collect();

        debug!(count = references.len(), "parsed artifact references");
        Ok(references)
    }

    fn metadata_section(text: &str) -> Result<&str, SectionError> {
        let mut sections: Vec<&str> = SECTION_SEPARATOR.split(text).collect();
        if SECTION_SEPARATOR
            .find(text)
            .is_some_and(|separator| separator.start() == 0)
        {
            sections.remove(0);
        }

        sections
            .get(Self::METADATA_SECTION)
            .copied()
            .ok_or(SectionError::MissingSection {
                expected: Self::METADATA_SECTION + 1,
                found: sections.len(),
            })
    }
}
