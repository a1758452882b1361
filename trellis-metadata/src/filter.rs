// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// An enum describing whether a test or group matches the active filters.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum FilterMatch {
    /// This test or group matches the filters.
    Matches,

    /// This test or group does not match the filters.
    Mismatch {
        /// The reason for the mismatch.
        reason: MismatchReason,
    },
}

impl FilterMatch {
    /// Returns true if the filter matches.
    pub fn is_match(&self) -> bool {
        matches!(self, FilterMatch::Matches)
    }
}

/// The reason for why a test or group doesn't match the filters.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum MismatchReason {
    /// A group-title filter is active and this test doesn't belong to a group.
    NoParentGroup,

    /// The group title is not in the group allow-list.
    GroupTitle,

    /// None of the tests in this group are allowed to run.
    NoAllowedTests,

    /// The test title is not in the test allow-list.
    Title,

    /// The test's tags don't satisfy the tag filter.
    Tags,

    /// The test carries a negated tag.
    NegatedTag,

    /// Some tests are pinned, and this test isn't one of them.
    NotPinned,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MismatchReason::NoParentGroup => {
                write!(f, "group filter is active and test has no group")
            }
            MismatchReason::GroupTitle => write!(f, "group title didn't match group filter"),
            MismatchReason::NoAllowedTests => write!(f, "no tests in group matched filters"),
            MismatchReason::Title => write!(f, "test title didn't match test filter"),
            MismatchReason::Tags => write!(f, "test tags didn't match tag filter"),
            MismatchReason::NegatedTag => write!(f, "test carries an excluded tag"),
            MismatchReason::NotPinned => write!(f, "test is not pinned"),
        }
    }
}
