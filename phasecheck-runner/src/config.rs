// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for phasecheck.
//!
//! The config is built from three layers, in increasing priority:
//!
//! 1. the embedded [default config](PhasecheckConfig::DEFAULT_CONFIG),
//! 2. `.config/phasecheck.toml` in the harness root (or an explicitly specified file),
//! 3. `PHASECHECK_`-prefixed environment variables, with `__` separating nested keys (for
//!    example `PHASECHECK_RUN__TIMEOUT=30s`).

use crate::{errors::ConfigParseError, invoker::CompilerCommand, session::BatchSelection};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Overall configuration for phasecheck.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PhasecheckConfig {
    /// The two compilers.
    pub compilers: CompilersConfig,

    /// Where projects and tests live.
    pub layout: LayoutConfig,

    /// The failure ledger.
    pub ledger: LedgerConfig,

    /// Output comparison.
    pub compare: CompareConfig,

    /// Process execution.
    #[serde(default)]
    pub run: RunConfig,

    /// Folder suffixes for each suite selection.
    pub suites: SuitesConfig,

    /// Subfolders for each subfolder selection.
    pub subfolders: SubfoldersConfig,
}

/// The `[compilers]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompilersConfig {
    /// The compiler under test.
    pub subject: CompilerCommand,

    /// The trusted reference compiler.
    pub reference: CompilerCommand,
}

/// The `[layout]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutConfig {
    project_dir: String,
    tests_dir: String,

    /// The prefix of every suite directory name.
    pub suite_prefix: String,
}

impl LayoutConfig {
    const PHASE_PLACEHOLDER: &'static str = "{phase}";

    /// Returns the project directory for `phase`, relative to the harness root.
    pub fn project_dir(&self, phase: u32) -> Utf8PathBuf {
        Self::substitute(&self.project_dir, phase)
    }

    /// Returns the tests directory for `phase`, relative to the harness root.
    pub fn tests_dir(&self, phase: u32) -> Utf8PathBuf {
        Self::substitute(&self.tests_dir, phase)
    }

    fn substitute(template: &str, phase: u32) -> Utf8PathBuf {
        template
            .replace(Self::PHASE_PLACEHOLDER, &phase.to_string())
            .into()
    }
}

/// The `[ledger]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LedgerConfig {
    /// The ledger file, relative to the harness root.
    pub path: Utf8PathBuf,
}

/// The `[compare]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CompareConfig {
    /// Lines matching this regex are dropped before the primary comparison.
    pub ignore_pattern: String,
}

/// The `[run]` section.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// The deadline for each compiler invocation.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

/// The `[suites]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SuitesConfig {
    default: Vec<String>,
    plus: Vec<String>,
    star: Vec<String>,
    all: Vec<String>,
}

/// The `[subfolders]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubfoldersConfig {
    good: Vec<String>,
    bad: Vec<String>,
}

/// Which suites a batch run covers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SuiteSelection {
    /// The base suite only.
    #[default]
    Default,

    /// The `plus` suites.
    Plus,

    /// The `star` suites.
    Star,

    /// Every suite.
    All,
}

/// Which subfolders of each suite a batch run covers.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SubfolderSelection {
    /// Programs that should compile.
    #[default]
    Good,

    /// Programs that should be rejected.
    Bad,
}

impl PhasecheckConfig {
    /// The default location of the config within the harness root.
    pub const CONFIG_PATH: &'static str = ".config/phasecheck.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Environment configuration uses this prefix, plus a _.
    pub const ENVIRONMENT_PREFIX: &'static str = "PHASECHECK";

    /// Reads the config from the given file, or if not specified from `.config/phasecheck.toml`
    /// in the harness root.
    ///
    /// An explicitly specified file must exist. If no file is specified and the harness root has
    /// no config file, the defaults are used.
    pub fn from_sources(
        harness_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = harness_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        debug!(%config_file, "loading config");
        Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(source)
            .add_source(
                Environment::with_prefix(Self::ENVIRONMENT_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|err| ConfigParseError::new(config_file, err))
    }

    /// Returns the default config.
    pub fn default_config() -> Self {
        Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .and_then(|config| config.try_deserialize())
            .expect("default config is always valid")
    }

    /// Resolves suite and subfolder selections into a [`BatchSelection`].
    pub fn batch_selection(
        &self,
        suites: SuiteSelection,
        subfolders: SubfolderSelection,
    ) -> BatchSelection {
        let folders = match suites {
            SuiteSelection::Default => &self.suites.default,
            SuiteSelection::Plus => &self.suites.plus,
            SuiteSelection::Star => &self.suites.star,
            SuiteSelection::All => &self.suites.all,
        };
        let subfolders = match subfolders {
            SubfolderSelection::Good => &self.subfolders.good,
            SubfolderSelection::Bad => &self.subfolders.bad,
        };
        BatchSelection {
            suite_prefix: self.layout.suite_prefix.clone(),
            folders: folders.clone(),
            subfolders: subfolders.clone(),
        }
    }
}
