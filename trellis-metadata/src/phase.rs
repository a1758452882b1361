// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle phase in which an error was recorded.
///
/// Tests, groups and suites run their hooks in phases. An error in one phase is recorded with
/// that phase, and execution continues with the remaining phases.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ExecutionPhase {
    /// A setup hook failed.
    #[serde(rename = "setup")]
    Setup,

    /// The test body, or an executing/executed callback, failed.
    #[serde(rename = "test")]
    Test,

    /// A cleanup function returned by a setup hook failed.
    #[serde(rename = "setup:cleanup")]
    SetupCleanup,

    /// A teardown hook failed.
    #[serde(rename = "teardown")]
    Teardown,

    /// A cleanup function returned by a teardown hook failed.
    #[serde(rename = "teardown:cleanup")]
    TeardownCleanup,

    /// A cleanup handler registered from within the test body failed.
    #[serde(rename = "test:cleanup")]
    TestCleanup,
}

impl ExecutionPhase {
    /// Returns the string form of this phase, as used in event payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionPhase::Setup => "setup",
            ExecutionPhase::Test => "test",
            ExecutionPhase::SetupCleanup => "setup:cleanup",
            ExecutionPhase::Teardown => "teardown",
            ExecutionPhase::TeardownCleanup => "teardown:cleanup",
            ExecutionPhase::TestCleanup => "test:cleanup",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
