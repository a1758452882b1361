// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! The execution core of trellis.
//!
//! A run is a tree: a [`Runner`](runner::Runner) owns [`Suite`](suite::Suite)s, which own
//! [`Group`](group::Group)s and [`Test`](test::Test)s. Everything executes sequentially, in
//! registration order. Progress is reported as [`Event`](events::Event)s through a shared
//! [`Emitter`](emitter::Emitter), and which tests run is decided by a shared
//! [`Refiner`](refiner::Refiner).
//!
//! Each test attempt races against a resettable timeout, may be retried, and may be expanded into
//! one run per dataset row. Setup hooks return cleanups, which run in reverse order of
//! registration once the entity is done.
//!
//! The [`Tracker`](tracker::Tracker) reduces the event stream into a
//! [`RunnerSummary`](tracker::RunnerSummary), including a tree of what failed.

pub mod config;
pub mod emitter;
pub mod errors;
pub mod events;
pub mod group;
mod helpers;
pub mod hooks;
pub mod output;
pub mod refiner;
pub mod runner;
pub mod suite;
mod time;
pub mod tracker;
