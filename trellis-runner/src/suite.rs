// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Suites: ordered collections of tests and groups.

use crate::{
    emitter::Emitter,
    errors::{BoxError, EventDeliveryError},
    events::{Event, SuiteEndNode, SuiteStartNode},
    group::Group,
    hooks::{Cleanup, ErrorLog, Hook, HookStack},
    test::Test,
};
use debug_ignore::DebugIgnore;
use derive_where::derive_where;
use std::{future::Future, sync::Arc};
use tracing::debug;

type TestPlugin<C> = dyn Fn(&mut Test<C>) + Send + Sync;
type GroupPlugin<C> = dyn Fn(&mut Group<C>) + Send + Sync;

/// A handle to a suite, passed to its setup and teardown hooks.
#[derive(Clone, Debug)]
pub struct SuiteHandle {
    name: String,
}

impl SuiteHandle {
    /// Returns the suite's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An entry in a [`Suite`].
#[derive_where(Debug)]
pub enum SuiteEntry<C> {
    /// A test that doesn't belong to a group.
    Test(Test<C>),

    /// A group of tests.
    Group(Group<C>),
}

/// A named, ordered collection of tests and groups.
#[derive_where(Debug)]
pub struct Suite<C> {
    name: String,
    entries: Vec<SuiteEntry<C>>,
    hooks: HookStack<SuiteHandle>,
    test_plugins: DebugIgnore<Vec<Arc<TestPlugin<C>>>>,
    group_plugins: DebugIgnore<Vec<Arc<GroupPlugin<C>>>>,
    emitter: Emitter,
    has_executed: bool,
}

impl<C: Send + 'static> Suite<C> {
    /// Creates a new, empty suite.
    pub fn new(name: impl Into<String>, emitter: Emitter) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            hooks: HookStack::default(),
            test_plugins: DebugIgnore(Vec::new()),
            group_plugins: DebugIgnore(Vec::new()),
            emitter,
            has_executed: false,
        }
    }

    /// Returns the suite's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the emitter this suite reports through.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Returns true if [`exec`](Self::exec) has been called.
    pub fn has_executed(&self) -> bool {
        self.has_executed
    }

    /// Returns the suite's entries, in execution order.
    pub fn entries(&self) -> &[SuiteEntry<C>] {
        &self.entries
    }

    /// Registers a callback invoked for every test added to the suite from now on.
    pub fn on_test<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Test<C>) + Send + Sync + 'static,
    {
        self.test_plugins.push(Arc::new(f));
        self
    }

    /// Registers a callback invoked for every group added to the suite from now on.
    pub fn on_group<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Group<C>) + Send + Sync + 'static,
    {
        self.group_plugins.push(Arc::new(f));
        self
    }

    /// Adds an entry to the suite.
    pub fn add(&mut self, entry: SuiteEntry<C>) -> &mut Self {
        match entry {
            SuiteEntry::Test(test) => self.add_test(test),
            SuiteEntry::Group(group) => self.add_group(group),
        }
    }

    /// Adds a test to the suite.
    pub fn add_test(&mut self, mut test: Test<C>) -> &mut Self {
        for plugin in self.test_plugins.iter() {
            plugin(&mut test);
        }
        self.entries.push(SuiteEntry::Test(test));
        self
    }

    /// Adds a group to the suite.
    pub fn add_group(&mut self, mut group: Group<C>) -> &mut Self {
        for plugin in self.group_plugins.iter() {
            plugin(&mut group);
        }
        self.entries.push(SuiteEntry::Group(group));
        self
    }

    /// Registers a setup hook for the suite.
    pub fn setup<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SuiteHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.hooks.setup.push(Hook::new(f));
        self
    }

    /// Registers a teardown hook for the suite.
    pub fn teardown<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SuiteHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.hooks.teardown.push(Hook::new(f));
        self
    }

    /// Executes the suite.
    ///
    /// A suite always runs its own hooks, even if every entry is filtered out. Filtering is left
    /// to the entries themselves. Calling this more than once has no effect.
    pub async fn exec(&mut self) -> Result<(), EventDeliveryError> {
        if self.has_executed {
            return Ok(());
        }
        self.has_executed = true;

        debug!(name = %self.name, entries = self.entries.len(), "executing suite");
        self.emitter.emit(Event::SuiteStart(SuiteStartNode {
            name: self.name.clone(),
        }))?;

        let handle = SuiteHandle {
            name: self.name.clone(),
        };
        let mut errors = ErrorLog::default();
        let entries = &mut self.entries;
        let body_result = self
            .hooks
            .run_around(&handle, &mut errors, move || async move {
                for entry in entries.iter_mut() {
                    match entry {
                        SuiteEntry::Test(test) => test.exec().await?,
                        SuiteEntry::Group(group) => group.exec().await?,
                    }
                }
                Ok::<_, EventDeliveryError>(())
            })
            .await;
        if let Some(Err(error)) = body_result {
            return Err(error);
        }

        self.emitter.emit(Event::SuiteEnd(SuiteEndNode {
            name: self.name.clone(),
            has_error: !errors.is_empty(),
            errors: errors.into_vec(),
        }))
    }
}
