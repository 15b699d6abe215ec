// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for phasecheck, a differential test harness for student compilers.
//!
//! Each test case is fed to both a compiler under test (the *subject*) and a trusted *reference*
//! compiler. A case passes if the two agree on their standard output and on the contents of every
//! file they generate. Failing cases are recorded in a ledger so they can be rechecked later.
//!
//! The flow of operations is:
//!
//! [`TestSession`](session::TestSession) →
//! [`DifferentialValidator`](validator::DifferentialValidator) →
//! [`OutputComparator`](compare::OutputComparator) →
//! [`ArtifactNameParser`](artifact::ArtifactNameParser) →
//! [`OutputComparator`](compare::OutputComparator) per artifact pair →
//! [`FailureLedger`](ledger::FailureLedger).

pub mod artifact;
pub mod case;
pub mod compare;
pub mod config;
pub mod errors;
mod helpers;
pub mod invoker;
pub mod ledger;
pub mod reporter;
pub mod session;
pub mod validator;
