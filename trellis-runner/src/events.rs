// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events.
//!
//! Events are produced by tests, groups, suites and the runner, and delivered through an
//! [`Emitter`](crate::emitter::Emitter) to subscribers such as the
//! [`Tracker`](crate::tracker::Tracker) and reporters.

use crate::{errors::ExecutionError, test::TestOptions};
use serde_json::{Map, Value};
use std::{fmt, time::Duration};

/// A lifecycle event.
///
/// Each variant carries its own payload type.
#[derive(Clone, Debug)]
pub enum Event {
    /// The run started.
    RunnerStart,

    /// The run finished.
    RunnerEnd,

    /// A suite started.
    SuiteStart(SuiteStartNode),

    /// A suite finished.
    SuiteEnd(SuiteEndNode),

    /// A group started.
    GroupStart(GroupStartNode),

    /// A group finished.
    GroupEnd(GroupEndNode),

    /// A test (or a single dataset row of a test) started.
    TestStart(TestStartNode),

    /// A test (or a single dataset row of a test) finished.
    TestEnd(TestEndNode),
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::RunnerStart => EventKind::RunnerStart,
            Event::RunnerEnd => EventKind::RunnerEnd,
            Event::SuiteStart(_) => EventKind::SuiteStart,
            Event::SuiteEnd(_) => EventKind::SuiteEnd,
            Event::GroupStart(_) => EventKind::GroupStart,
            Event::GroupEnd(_) => EventKind::GroupEnd,
            Event::TestStart(_) => EventKind::TestStart,
            Event::TestEnd(_) => EventKind::TestEnd,
        }
    }
}

/// The kind of an [`Event`], used to subscribe to a single kind of event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    /// `runner:start`
    RunnerStart,
    /// `runner:end`
    RunnerEnd,
    /// `suite:start`
    SuiteStart,
    /// `suite:end`
    SuiteEnd,
    /// `group:start`
    GroupStart,
    /// `group:end`
    GroupEnd,
    /// `test:start`
    TestStart,
    /// `test:end`
    TestEnd,
}

impl EventKind {
    /// Returns the name of this event.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::RunnerStart => "runner:start",
            EventKind::RunnerEnd => "runner:end",
            EventKind::SuiteStart => "suite:start",
            EventKind::SuiteEnd => "suite:end",
            EventKind::GroupStart => "group:start",
            EventKind::GroupEnd => "group:end",
            EventKind::TestStart => "test:start",
            EventKind::TestEnd => "test:end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for [`Event::SuiteStart`].
#[derive(Clone, Debug)]
pub struct SuiteStartNode {
    /// The suite name.
    pub name: String,
}

/// Payload for [`Event::SuiteEnd`].
#[derive(Clone, Debug)]
pub struct SuiteEndNode {
    /// The suite name.
    pub name: String,

    /// True if any of the suite's own hooks failed.
    pub has_error: bool,

    /// Errors from the suite's own hooks.
    pub errors: Vec<ExecutionError>,
}

/// Payload for [`Event::GroupStart`].
#[derive(Clone, Debug)]
pub struct GroupStartNode {
    /// The group title.
    pub title: String,

    /// Free-form metadata attached to the group.
    pub meta: Map<String, Value>,
}

/// Payload for [`Event::GroupEnd`].
#[derive(Clone, Debug)]
pub struct GroupEndNode {
    /// The group title.
    pub title: String,

    /// Free-form metadata attached to the group.
    pub meta: Map<String, Value>,

    /// True if any of the group's own hooks failed.
    pub has_error: bool,

    /// Errors from the group's own hooks.
    pub errors: Vec<ExecutionError>,
}

/// A test title, before and after dataset interpolation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestTitle {
    /// The title as configured.
    pub original: String,

    /// The title with `{placeholders}` expanded against the current dataset row.
    ///
    /// Equal to `original` for tests without a dataset.
    pub expanded: String,
}

impl TestTitle {
    pub(crate) fn unexpanded(original: &str) -> Self {
        Self {
            original: original.to_owned(),
            expanded: original.to_owned(),
        }
    }
}

impl fmt::Display for TestTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expanded)
    }
}

/// Information about the dataset row a test execution is running against.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetInfo {
    /// The total number of rows in the dataset.
    pub size: usize,

    /// The 0-based index of this row.
    pub index: usize,

    /// The row itself.
    pub row: Value,
}

/// Payload for [`Event::TestStart`].
#[derive(Clone, Debug)]
pub struct TestStartNode {
    /// The test's options at the time it started.
    pub options: TestOptions,

    /// The test's title.
    pub title: TestTitle,

    /// The dataset row, if the test has a dataset.
    pub dataset: Option<DatasetInfo>,
}

/// Payload for [`Event::TestEnd`].
#[derive(Clone, Debug)]
pub struct TestEndNode {
    /// The test's options at the time it finished.
    pub options: TestOptions,

    /// The test's title.
    pub title: TestTitle,

    /// The dataset row, if the test has a dataset.
    pub dataset: Option<DatasetInfo>,

    /// True if the test failed.
    ///
    /// For expected-failure tests this is already inverted: it is true only if the test body
    /// finished *without* an error.
    pub has_error: bool,

    /// All errors recorded while executing the test.
    pub errors: Vec<ExecutionError>,

    /// How long the test took, including hooks.
    pub duration: Duration,

    /// The 1-based attempt the final result came from. Only set for tests with retries.
    pub retry_attempt: Option<u32>,
}
