// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Machine-readable data produced by trellis.
//!
//! The types in this crate are shared between the trellis execution core and external consumers
//! such as reporters and CI tooling. They are plain data: everything here can be serialized to and
//! from JSON with stable, kebab-case field names.

mod exit_codes;
mod filter;
mod phase;
mod summary;

pub use exit_codes::*;
pub use filter::*;
pub use phase::*;
pub use summary::*;
