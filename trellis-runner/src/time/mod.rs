// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod resettable_sleep;
mod stopwatch;

pub(crate) use resettable_sleep::*;
pub(crate) use stopwatch::*;
