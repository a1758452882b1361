// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{ExecutionPhase, TrellisExitCode};
use serde::{Deserialize, Serialize};

/// Aggregate counts for a test run.
///
/// Every finished test increments `total` and exactly one of the other counters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunAggregates {
    /// The number of tests that finished.
    pub total: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed, including expected-failure tests that didn't fail.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests that were marked as todo.
    pub todo: usize,

    /// The number of expected-failure tests that failed as expected.
    pub regression: usize,
}

impl RunAggregates {
    /// Returns the sum of all the per-status counters.
    ///
    /// For aggregates built from a well-formed event stream, this is equal to `total`.
    pub fn status_sum(&self) -> usize {
        self.passed + self.failed + self.skipped + self.todo + self.regression
    }
}

/// A serializable summary of a finished run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// True if any test failed or any suite or group hook failed.
    pub has_error: bool,

    /// Aggregate counts.
    pub aggregates: RunAggregates,

    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,

    /// Suites containing at least one failure, pruned to failing branches.
    pub failure_tree: Vec<FailureTreeNode>,

    /// The original titles of failed tests, in the order they finished.
    pub failed_tests_titles: Vec<String>,
}

impl RunSummary {
    /// Parses a summary from its JSON representation.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Returns the documented exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.has_error {
            TrellisExitCode::TEST_RUN_FAILED
        } else if self.aggregates.total == 0 {
            TrellisExitCode::NO_TESTS_RUN
        } else {
            TrellisExitCode::OK
        }
    }
}

/// A node in the failure tree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum FailureTreeNode {
    /// A suite. Only appears at the top level.
    Suite {
        /// The suite name.
        name: String,
        /// Errors from the suite's own hooks.
        errors: Vec<ErrorSummary>,
        /// Failing groups and tests within the suite.
        children: Vec<FailureTreeNode>,
    },

    /// A group. Only appears as a child of a suite.
    Group {
        /// The group title.
        name: String,
        /// Errors from the group's own hooks.
        errors: Vec<ErrorSummary>,
        /// Failing tests within the group.
        children: Vec<FailureTreeNode>,
    },

    /// A failed test.
    Test {
        /// The test title, after dataset interpolation.
        title: String,
        /// The errors recorded for the test.
        errors: Vec<ErrorSummary>,
    },
}

/// A rendered execution error.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ErrorSummary {
    /// The phase the error was recorded in.
    pub phase: ExecutionPhase,

    /// The error message, including the chain of sources.
    pub message: String,
}
