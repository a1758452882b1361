// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test and group selection.
//!
//! A [`Refiner`] holds the filters for a run and decides which tests and groups are executed.

use crate::test::TestId;
use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::debug;
use trellis_metadata::{FilterMatch, MismatchReason};

/// A layer of filters that can be extended with [`Refiner::add`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterLayer {
    /// Exact test titles.
    Tests,

    /// Exact group titles.
    Groups,

    /// Tags. Tags prefixed with `!` exclude tests carrying that tag.
    Tags,
}

/// The filters for a run.
///
/// A `Refiner` is a cheap handle: clones share the same filters. Filters are meant to be set up
/// before execution starts, and are only read afterwards.
#[derive(Clone, Debug, Default)]
pub struct Refiner {
    filters: Arc<RwLock<Filters>>,
}

#[derive(Debug, Default)]
struct Filters {
    tests: Vec<String>,
    groups: Vec<String>,
    tags: Vec<String>,
    negated_tags: Vec<String>,
    pinned: HashSet<TestId>,
    match_all_tags: bool,
}

/// The properties of a test that the [`Refiner`] looks at.
#[derive(Clone, Copy, Debug)]
pub struct TestQuery<'a> {
    /// The test's identity, used for pinning.
    pub id: TestId,

    /// The test's configured (unexpanded) title.
    pub title: &'a str,

    /// The test's tags.
    pub tags: &'a [String],

    /// Whether the test belongs to a group.
    pub has_parent_group: bool,
}

impl Refiner {
    /// Creates a new refiner that allows every test.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds values to a filter layer.
    pub fn add<I, S>(&self, layer: FilterLayer, values: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filters = self.write();
        for value in values {
            let value = value.into();
            match layer {
                FilterLayer::Tests => filters.tests.push(value),
                FilterLayer::Groups => filters.groups.push(value),
                FilterLayer::Tags => match value.strip_prefix('!') {
                    Some(negated) => filters.negated_tags.push(negated.to_owned()),
                    None => filters.tags.push(value),
                },
            }
        }
        self
    }

    /// Switches tag matching between "any of" (the default) and "all of".
    pub fn match_all_tags(&self, match_all: bool) -> &Self {
        self.write().match_all_tags = match_all;
        self
    }

    /// Pins a test. Once any test is pinned, only pinned tests are allowed.
    pub fn pin_test(&self, id: TestId) -> &Self {
        self.write().pinned.insert(id);
        self
    }

    /// Returns true if the given test is pinned.
    pub fn is_pinned(&self, id: TestId) -> bool {
        self.read().pinned.contains(&id)
    }

    /// Returns true if any test is pinned.
    pub fn has_pinned_tests(&self) -> bool {
        !self.read().pinned.is_empty()
    }

    /// Returns whether a test is allowed to run, and if not, why not.
    pub fn test_match(&self, test: &TestQuery<'_>) -> FilterMatch {
        let filter_match = self.read().test_match(test);
        if let FilterMatch::Mismatch { reason } = &filter_match {
            debug!(title = test.title, %reason, "test filtered out");
        }
        filter_match
    }

    /// Returns true if a test is allowed to run.
    pub fn allows_test(&self, test: &TestQuery<'_>) -> bool {
        self.test_match(test).is_match()
    }

    /// Returns whether a group is allowed to run, and if not, why not.
    ///
    /// A group is allowed if its title passes the group filter and at least one of its tests is
    /// allowed.
    pub fn group_match<'a>(
        &self,
        title: &str,
        tests: impl IntoIterator<Item = TestQuery<'a>>,
    ) -> FilterMatch {
        let filter_match = {
            let filters = self.read();
            if !filters.groups.is_empty() && !filters.groups.iter().any(|g| g == title) {
                FilterMatch::Mismatch {
                    reason: MismatchReason::GroupTitle,
                }
            } else if tests
                .into_iter()
                .any(|test| filters.test_match(&test).is_match())
            {
                FilterMatch::Matches
            } else {
                FilterMatch::Mismatch {
                    reason: MismatchReason::NoAllowedTests,
                }
            }
        };
        if let FilterMatch::Mismatch { reason } = &filter_match {
            debug!(title, %reason, "group filtered out");
        }
        filter_match
    }

    /// Returns true if a group is allowed to run.
    pub fn allows_group<'a>(
        &self,
        title: &str,
        tests: impl IntoIterator<Item = TestQuery<'a>>,
    ) -> bool {
        self.group_match(title, tests).is_match()
    }

    fn read(&self) -> RwLockReadGuard<'_, Filters> {
        self.filters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Filters> {
        self.filters.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Filters {
    fn test_match(&self, test: &TestQuery<'_>) -> FilterMatch {
        match self.mismatch_reason(test) {
            Some(reason) => FilterMatch::Mismatch { reason },
            None => FilterMatch::Matches,
        }
    }

    fn mismatch_reason(&self, test: &TestQuery<'_>) -> Option<MismatchReason> {
        if !self.groups.is_empty() && !test.has_parent_group {
            return Some(MismatchReason::NoParentGroup);
        }

        if !self.tests.is_empty() && !self.tests.iter().any(|t| t == test.title) {
            return Some(MismatchReason::Title);
        }

        if !self.tags.is_empty() {
            let has_tag = |tag: &String| test.tags.contains(tag);
            let matched = if self.match_all_tags {
                self.tags.iter().all(has_tag)
            } else {
                self.tags.iter().any(has_tag)
            };
            if !matched {
                return Some(MismatchReason::Tags);
            }
        }

        if self.negated_tags.iter().any(|tag| test.tags.contains(tag)) {
            return Some(MismatchReason::NegatedTag);
        }

        if !self.pinned.is_empty() && !self.pinned.contains(&test.id) {
            return Some(MismatchReason::NotPinned);
        }

        None
    }
}
