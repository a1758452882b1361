// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for trellis runs.
///
/// Harness binaries built on trellis are expected to map a finished run onto one of these codes.
/// [`RunSummary::exit_code`](crate::RunSummary::exit_code) performs that mapping.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TrellisExitCode {}

impl TrellisExitCode {
    /// No errors occurred and all selected tests passed.
    pub const OK: i32 = 0;

    /// No tests were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// A configuration file failed to parse.
    pub const INVALID_CONFIG: i32 = 96;

    /// One or more tests failed, or a suite or group hook failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// A subscriber failed while an event was being delivered, and no error handler was
    /// installed on the emitter.
    pub const EVENT_DELIVERY_FAILED: i32 = 110;
}
