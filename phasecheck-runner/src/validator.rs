// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Differential validation of a single test case.
//!
//! Validation runs in two stages:
//!
//! 1. **Primary comparison.** Both compilers are run on the test case and their standard output
//!    is compared, masking lines that embed file paths. A mismatch here ends validation: if the
//!    compilers disagree on diagnostics, their generated files are not meaningfully comparable.
//! 2. **Artifact comparison.** The generated file names are parsed out of both outputs, paired up
//!    positionally, and each pair is compared byte for byte.
//!
//! Every path through validation produces a [`CaseOutcome`]. Nothing here is fatal to a session.

use crate::{
    artifact::{ArtifactNameParser, ArtifactReference},
    case::TestCase,
    compare::{ComparisonResult, OutputComparator},
    errors::{ArtifactReadError, InvokeError, SectionError},
    invoker::{ArtifactStore, CompilerId, CompilerInvoker, CompilerRun},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, time::Duration};
use tracing::debug;

/// The outcome of validating one test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaseOutcome {
    /// Both stages passed.
    Passed,

    /// The compilers' primary outputs disagree, or a compiler could not be run to completion.
    FailedPrimary(PrimaryFailure),

    /// A generated artifact pair did not match.
    ///
    /// If several pairs failed, this is the first one in output order.
    FailedArtifact {
        /// The pair that failed.
        pair: ArtifactPair,

        /// Why it failed.
        failure: ArtifactFailure,
    },

    /// The artifact lists could not be parsed or paired.
    FailedParse(ParseFailure),
}

impl CaseOutcome {
    /// Returns true if the case passed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Classifies a failing outcome. Returns `None` for [`CaseOutcome::Passed`].
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Passed => None,
            Self::FailedPrimary(_) => Some(FailureKind::PrimaryMismatch),
            Self::FailedParse(ParseFailure::SubjectInternalError { .. }) => {
                Some(FailureKind::SubjectInternalError)
            }
            Self::FailedParse(
                ParseFailure::ArtifactCountMismatch { .. } | ParseFailure::BaseNameMismatch { .. },
            ) => Some(FailureKind::ArtifactNameMismatch),
            Self::FailedArtifact { failure, .. } => Some(match failure {
                ArtifactFailure::Missing { .. } | ArtifactFailure::Unreadable { .. } => {
                    FailureKind::ArtifactMissing
                }
                ArtifactFailure::ContentMismatch { .. } => FailureKind::ArtifactContentMismatch,
            }),
        }
    }
}

/// A classification of failing outcomes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// The compilers disagree on diagnostics or structure.
    PrimaryMismatch,

    /// The subject's own output was malformed or truncated (for example, the compiler crashed).
    SubjectInternalError,

    /// The lists of generated files diverge. This is a setup problem rather than a content
    /// problem.
    ArtifactNameMismatch,

    /// A compiler reported generating a file that is absent or unreadable.
    ArtifactMissing,

    /// A generated file's contents differ.
    ArtifactContentMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PrimaryMismatch => "output mismatch",
            Self::SubjectInternalError => "error in subject output",
            Self::ArtifactNameMismatch => "artifact name mismatch",
            Self::ArtifactMissing => "artifact missing",
            Self::ArtifactContentMismatch => "artifact content mismatch",
        };
        f.write_str(s)
    }
}

/// Why the primary stage failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PrimaryFailure {
    /// Both compilers ran, but their outputs differ.
    OutputDiffers {
        /// A unified diff of the filtered outputs.
        diff: String,
    },

    /// A compiler did not finish within its deadline.
    TimedOut {
        /// The compiler that timed out.
        compiler: CompilerId,

        /// The deadline.
        timeout: Duration,
    },

    /// A compiler could not be run.
    ExecFailed {
        /// The compiler that could not be run.
        compiler: CompilerId,

        /// A description of the error.
        message: String,
    },
}

impl PrimaryFailure {
    fn from_invoke_error(err: &InvokeError) -> Self {
        match err {
            InvokeError::TimedOut { compiler, timeout } => Self::TimedOut {
                compiler: *compiler,
                timeout: *timeout,
            },
            InvokeError::Exec { compiler, .. } | InvokeError::Wait { compiler, .. } => {
                Self::ExecFailed {
                    compiler: *compiler,
                    message: error_chain(err),
                }
            }
        }
    }
}

/// Why the artifact lists could not be parsed or paired.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseFailure {
    /// A compiler's output did not contain the artifact section.
    ///
    /// The primary stage already established that both outputs match, so this is reported as a
    /// fault in the subject's own output rather than a cross-compiler discrepancy.
    SubjectInternalError {
        /// The output in which the section was first found missing.
        compiler: CompilerId,

        /// The parse error.
        error: SectionError,

        /// The subject's raw output, for diagnosis.
        subject_output: String,
    },

    /// The compilers reported different numbers of generated files.
    ArtifactCountMismatch {
        /// The subject's references.
        subject: Vec<ArtifactReference>,

        /// The reference compiler's references.
        reference: Vec<ArtifactReference>,
    },

    /// The files at the same position have different base names.
    BaseNameMismatch {
        /// The zero-based position of the pair.
        index: usize,

        /// The subject's reference.
        subject: ArtifactReference,

        /// The reference compiler's reference.
        reference: ArtifactReference,
    },
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubjectInternalError {
                compiler, error, ..
            } => write!(f, "error in subject output ({compiler} output: {error})"),
            Self::ArtifactCountMismatch { subject, reference } => write!(
                f,
                "subject generated {} files, reference generated {}",
                subject.len(),
                reference.len()
            ),
            Self::BaseNameMismatch {
                subject, reference, ..
            } => write!(f, "{subject} does not match {reference}"),
        }
    }
}

/// A subject artifact paired with the reference artifact at the same position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArtifactPair {
    /// The subject compiler's artifact.
    pub subject: ArtifactReference,

    /// The reference compiler's artifact.
    pub reference: ArtifactReference,
}

/// Why an artifact pair failed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArtifactFailure {
    /// A compiler reported generating the file, but it does not exist.
    Missing {
        /// The compiler that reported the file.
        compiler: CompilerId,

        /// The path that was looked up.
        path: Utf8PathBuf,
    },

    /// The file exists but could not be read.
    Unreadable {
        /// The compiler that reported the file.
        compiler: CompilerId,

        /// The path that could not be read.
        path: Utf8PathBuf,

        /// A description of the error.
        message: String,
    },

    /// The files differ.
    ContentMismatch {
        /// A unified diff of the two files.
        diff: String,
    },
}

impl ArtifactFailure {
    fn from_read_error(compiler: CompilerId, err: ArtifactReadError) -> Self {
        let message = error_chain(&err);
        match err {
            ArtifactReadError::NotFound { path } => Self::Missing { compiler, path },
            ArtifactReadError::Io { path, .. } => Self::Unreadable {
                compiler,
                path,
                message,
            },
        }
    }
}

/// The result of checking one artifact pair.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArtifactCheck {
    /// The pair that was checked.
    pub pair: ArtifactPair,

    /// `None` if the pair matched.
    pub failure: Option<ArtifactFailure>,
}

/// The full result of validating one test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaseResult {
    /// The canonical outcome.
    pub outcome: CaseOutcome,

    /// Every artifact pair that was checked, in output order. Empty unless the artifact stage was
    /// reached.
    pub artifact_checks: Vec<ArtifactCheck>,
}

impl CaseResult {
    fn new(outcome: CaseOutcome) -> Self {
        Self {
            outcome,
            artifact_checks: Vec::new(),
        }
    }
}

/// Pairs the subject's artifacts with the reference compiler's, by position.
///
/// The lists must have the same length and matching base names at every position.
pub fn pair_artifacts(
    subject: &[ArtifactReference],
    reference: &[ArtifactReference],
) -> Result<Vec<ArtifactPair>, ParseFailure> {
    if subject.len() != reference.len() {
        return Err(ParseFailure::ArtifactCountMismatch {
            subject: subject.to_vec(),
            reference: reference.to_vec(),
        });
    }

    subject
        .iter()
        .zip(reference)
        .enumerate()
        .map(|(index, (subject, reference))| {
            if subject.same_artifact(reference) {
                Ok(ArtifactPair {
                    subject: subject.clone(),
                    reference: reference.clone(),
                })
            } else {
                Err(ParseFailure::BaseNameMismatch {
                    index,
                    subject: subject.clone(),
                    reference: reference.clone(),
                })
            }
        })
        .collect()
}

/// Validates test cases by running both compilers and comparing what they produce.
#[derive(Debug)]
pub struct DifferentialValidator<'a, I, S> {
    invoker: &'a I,
    store: &'a S,
    working_dir: Utf8PathBuf,
    primary: OutputComparator,
    exact: OutputComparator,
    parser: ArtifactNameParser,
}

impl<'a, I, S> DifferentialValidator<'a, I, S>
where
    I: CompilerInvoker,
    S: ArtifactStore,
{
    /// Creates a new validator.
    ///
    /// `primary` is used for the first stage; artifacts are always compared exactly. Artifacts
    /// are read relative to `working_dir`.
    pub fn new(
        invoker: &'a I,
        store: &'a S,
        working_dir: impl Into<Utf8PathBuf>,
        primary: OutputComparator,
    ) -> Self {
        Self {
            invoker,
            store,
            working_dir: working_dir.into(),
            primary,
            exact: OutputComparator::new(),
            parser: ArtifactNameParser::new(),
        }
    }

    /// Returns the directory artifacts are read from.
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    /// Validates a single test case.
    pub async fn validate(&self, case: &TestCase) -> CaseResult {
        let (subject, reference) = match self.run_both(case).await {
            Ok(runs) => runs,
            Err(failure) => return CaseResult::new(CaseOutcome::FailedPrimary(failure)),
        };

        if let ComparisonResult::Differing(diff) =
            self.primary.compare(&subject.stdout, &reference.stdout)
        {
            debug!(%case, "primary comparison failed");
            return CaseResult::new(CaseOutcome::FailedPrimary(PrimaryFailure::OutputDiffers {
                diff,
            }));
        }

        let pairs = match self.parse_pairs(&subject, &reference) {
            Ok(pairs) => pairs,
            Err(failure) => {
                debug!(%case, %failure, "artifact parsing failed");
                return CaseResult::new(CaseOutcome::FailedParse(failure));
            }
        };

        let artifact_checks: Vec<_> = pairs
            .into_iter()
            .map(|pair| {
                let failure = self.check_pair(&pair).err();
                ArtifactCheck { pair, failure }
            })
            .collect();

        let outcome = artifact_checks
            .iter()
            .find_map(|check| {
                check
                    .failure
                    .as_ref()
                    .map(|failure| CaseOutcome::FailedArtifact {
                        pair: check.pair.clone(),
                        failure: failure.clone(),
                    })
            })
            .unwrap_or(CaseOutcome::Passed);

        CaseResult {
            outcome,
            artifact_checks,
        }
    }

    async fn run_both(&self, case: &TestCase) -> Result<(CompilerRun, CompilerRun), PrimaryFailure> {
        let subject = self
            .invoker
            .run(CompilerId::Subject, case)
            .await
            .map_err(|err| PrimaryFailure::from_invoke_error(&err))?;
        let reference = self
            .invoker
            .run(CompilerId::Reference, case)
            .await
            .map_err(|err| PrimaryFailure::from_invoke_error(&err))?;
        Ok((subject, reference))
    }

    fn parse_pairs(
        &self,
        subject: &CompilerRun,
        reference: &CompilerRun,
    ) -> Result<Vec<ArtifactPair>, ParseFailure> {
        let internal_error = |compiler, error| ParseFailure::SubjectInternalError {
            compiler,
            error,
            subject_output: subject.stdout.clone(),
        };

        let subject_refs = self
            .parser
            .parse(&subject.stdout)
            .map_err(|error| internal_error(CompilerId::Subject, error))?;
        let reference_refs = self
            .parser
            .parse(&reference.stdout)
            .map_err(|error| internal_error(CompilerId::Reference, error))?;

        pair_artifacts(&subject_refs, &reference_refs)
    }

    fn check_pair(&self, pair: &ArtifactPair) -> Result<(), ArtifactFailure> {
        let subject = self
            .store
            .read_artifact(&self.working_dir, &pair.subject.file_name)
            .map_err(|err| ArtifactFailure::from_read_error(CompilerId::Subject, err))?;
        let reference = self
            .store
            .read_artifact(&self.working_dir, &pair.reference.file_name)
            .map_err(|err| ArtifactFailure::from_read_error(CompilerId::Reference, err))?;

        match self.exact.compare_bytes(&subject, &reference) {
            ComparisonResult::Equal => Ok(()),
            ComparisonResult::Differing(diff) => Err(ArtifactFailure::ContentMismatch { diff }),
        }
    }
}

/// Renders an error and its sources on one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
