// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome aggregation.
//!
//! The [`Tracker`] consumes the event stream and builds a [`RunnerSummary`]: aggregate counts, and
//! a failure tree pruned to the suites, groups and tests that failed.

use crate::{
    errors::ExecutionError,
    events::{Event, TestEndNode},
    time::{StopwatchStart, stopwatch},
};
use chrono::{DateTime, Local};
use std::time::Duration;
use tracing::debug;
use trellis_metadata::{ErrorSummary, FailureTreeNode, RunAggregates, RunSummary};

/// The final status of a finished test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TestStatus {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,

    /// The test had no executor.
    Todo,

    /// The test was expected to fail, and did.
    Regression,
}

impl TestStatus {
    /// Computes the status of a finished test.
    pub fn of(node: &TestEndNode) -> Self {
        if node.options.is_skipped {
            TestStatus::Skipped
        } else if node.options.is_todo {
            TestStatus::Todo
        } else if node.options.is_failing {
            if node.has_error {
                TestStatus::Failed
            } else {
                TestStatus::Regression
            }
        } else if node.has_error {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        }
    }
}

/// A summary of a run, as built by the [`Tracker`].
#[derive(Clone, Debug)]
pub struct RunnerSummary {
    /// Aggregate counts.
    pub aggregates: RunAggregates,

    /// True if any test failed or any suite or group hook failed.
    pub has_error: bool,

    /// When the run started, if it has started.
    pub start_time: Option<DateTime<Local>>,

    /// How long the run took, or has taken so far.
    pub duration: Duration,

    /// Suites containing at least one failure.
    pub failure_tree: Vec<SuiteFailure>,

    /// The original titles of failed tests, in the order they finished.
    pub failed_tests_titles: Vec<String>,
}

impl RunnerSummary {
    /// Converts this summary into its serializable form.
    pub fn to_metadata(&self) -> RunSummary {
        RunSummary {
            has_error: self.has_error,
            aggregates: self.aggregates,
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            failure_tree: self.failure_tree.iter().map(SuiteFailure::to_node).collect(),
            failed_tests_titles: self.failed_tests_titles.clone(),
        }
    }

    /// Returns the documented exit code for this run.
    pub fn exit_code(&self) -> i32 {
        self.to_metadata().exit_code()
    }
}

/// A suite in the failure tree.
#[derive(Clone, Debug)]
pub struct SuiteFailure {
    /// The suite name.
    pub name: String,

    /// Errors from the suite's own hooks.
    pub errors: Vec<ExecutionError>,

    /// Failing groups and tests, in execution order.
    pub children: Vec<SuiteFailureChild>,
}

impl SuiteFailure {
    fn to_node(&self) -> FailureTreeNode {
        FailureTreeNode::Suite {
            name: self.name.clone(),
            errors: error_summaries(&self.errors),
            children: self
                .children
                .iter()
                .map(|child| match child {
                    SuiteFailureChild::Group(group) => group.to_node(),
                    SuiteFailureChild::Test(test) => test.to_node(),
                })
                .collect(),
        }
    }
}

/// A child of a [`SuiteFailure`].
#[derive(Clone, Debug)]
pub enum SuiteFailureChild {
    /// A failing group.
    Group(GroupFailure),

    /// A failing test outside of any group.
    Test(TestFailure),
}

/// A group in the failure tree.
#[derive(Clone, Debug)]
pub struct GroupFailure {
    /// The group title.
    pub title: String,

    /// Errors from the group's own hooks.
    pub errors: Vec<ExecutionError>,

    /// Failing tests, in execution order.
    pub children: Vec<TestFailure>,
}

impl GroupFailure {
    fn to_node(&self) -> FailureTreeNode {
        FailureTreeNode::Group {
            name: self.title.clone(),
            errors: error_summaries(&self.errors),
            children: self.children.iter().map(TestFailure::to_node).collect(),
        }
    }
}

/// A failed test in the failure tree.
#[derive(Clone, Debug)]
pub struct TestFailure {
    /// The test title, after dataset interpolation.
    pub title: String,

    /// The errors recorded for the test.
    pub errors: Vec<ExecutionError>,
}

impl TestFailure {
    fn to_node(&self) -> FailureTreeNode {
        FailureTreeNode::Test {
            title: self.title.clone(),
            errors: error_summaries(&self.errors),
        }
    }
}

fn error_summaries(errors: &[ExecutionError]) -> Vec<ErrorSummary> {
    errors
        .iter()
        .map(|error| ErrorSummary {
            phase: error.phase,
            message: error.display_chain().to_string(),
        })
        .collect()
}

/// Builds a [`RunnerSummary`] from the event stream.
#[derive(Debug, Default)]
pub struct Tracker {
    aggregates: RunAggregates,
    failure_tree: Vec<SuiteFailure>,
    failed_tests_titles: Vec<String>,
    current_suite: Option<SuiteFailure>,
    current_group: Option<GroupFailure>,
    stopwatch: Option<StopwatchStart>,
    final_duration: Option<Duration>,
}

impl Tracker {
    /// Creates a new tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes an event.
    pub fn process(&mut self, event: &Event) {
        match event {
            Event::RunnerStart => {
                self.stopwatch = Some(stopwatch());
                self.final_duration = None;
            }
            Event::RunnerEnd => {
                self.final_duration = self
                    .stopwatch
                    .as_ref()
                    .map(|stopwatch| stopwatch.snapshot().duration);
            }
            Event::SuiteStart(node) => {
                self.current_suite = Some(SuiteFailure {
                    name: node.name.clone(),
                    errors: Vec::new(),
                    children: Vec::new(),
                });
            }
            Event::SuiteEnd(node) => {
                if let Some(mut suite) = self.current_suite.take()
                    && (node.has_error || !suite.children.is_empty())
                {
                    suite.errors = node.errors.clone();
                    self.failure_tree.push(suite);
                }
            }
            Event::GroupStart(node) => {
                self.current_group = Some(GroupFailure {
                    title: node.title.clone(),
                    errors: Vec::new(),
                    children: Vec::new(),
                });
            }
            Event::GroupEnd(node) => {
                if let Some(mut group) = self.current_group.take()
                    && (node.has_error || !group.children.is_empty())
                {
                    group.errors = node.errors.clone();
                    match &mut self.current_suite {
                        Some(suite) => suite.children.push(SuiteFailureChild::Group(group)),
                        None => debug!(title = %group.title, "group ended outside of a suite"),
                    }
                }
            }
            Event::TestStart(_) => {}
            Event::TestEnd(node) => self.process_test_end(node),
        }
    }

    fn process_test_end(&mut self, node: &TestEndNode) {
        self.aggregates.total += 1;
        let status = TestStatus::of(node);
        match status {
            TestStatus::Passed => self.aggregates.passed += 1,
            TestStatus::Skipped => self.aggregates.skipped += 1,
            TestStatus::Todo => self.aggregates.todo += 1,
            TestStatus::Regression => self.aggregates.regression += 1,
            TestStatus::Failed => {
                self.aggregates.failed += 1;
                self.failed_tests_titles.push(node.title.original.clone());

                let failure = TestFailure {
                    title: node.title.expanded.clone(),
                    errors: node.errors.clone(),
                };
                if let Some(group) = &mut self.current_group {
                    group.children.push(failure);
                } else if let Some(suite) = &mut self.current_suite {
                    suite.children.push(SuiteFailureChild::Test(failure));
                } else {
                    debug!(title = %failure.title, "test failed outside of a suite");
                }
            }
        }
    }

    /// Returns the summary of the events processed so far.
    pub fn summary(&self) -> RunnerSummary {
        let snapshot = self.stopwatch.as_ref().map(StopwatchStart::snapshot);
        RunnerSummary {
            aggregates: self.aggregates,
            has_error: self.aggregates.failed > 0 || !self.failure_tree.is_empty(),
            start_time: snapshot.map(|snapshot| snapshot.start_time),
            duration: self
                .final_duration
                .or(snapshot.map(|snapshot| snapshot.duration))
                .unwrap_or_default(),
            failure_tree: self.failure_tree.clone(),
            failed_tests_titles: self.failed_tests_titles.clone(),
        }
    }
}
