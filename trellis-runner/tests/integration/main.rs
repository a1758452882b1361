// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the execution core.
//!
//! These tests drive suites, groups and tests through the public API only, observing them through
//! the event stream and the tracker's summary. Time is paused in every async test, so timeouts
//! resolve instantly and durations are exact.

mod basic;
