// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Groups of tests.

use crate::{
    emitter::Emitter,
    errors::{BoxError, EventDeliveryError},
    events::{Event, GroupEndNode, GroupStartNode},
    helpers::plural,
    hooks::{Cleanup, ErrorLog, Hook, HookStack},
    refiner::Refiner,
    test::{Test, TestHandle},
};
use debug_ignore::DebugIgnore;
use derive_where::derive_where;
use serde_json::{Map, Value};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::debug;

type Tap<C> = dyn Fn(&mut Test<C>) + Send + Sync;

/// A handle to a group, passed to its setup and teardown hooks.
#[derive(Clone, Debug)]
pub struct GroupHandle {
    title: String,
    meta: Map<String, Value>,
}

impl GroupHandle {
    /// Returns the group's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the group's metadata.
    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }
}

/// A named collection of tests, with its own hooks and bulk configuration for its tests.
///
/// Bulk configuration (`each_*` and [`tap`](Self::tap)) applies to tests added *after* it is
/// registered.
#[derive_where(Debug)]
pub struct Group<C> {
    title: String,
    meta: Map<String, Value>,
    tests: Vec<Test<C>>,
    hooks: HookStack<GroupHandle>,
    each: EachTest<C>,
    emitter: Emitter,
    refiner: Refiner,
    has_executed: bool,
}

#[derive_where(Debug, Default)]
struct EachTest<C> {
    timeout: Option<TimeoutRule>,
    retries: Option<u32>,
    hooks: HookStack<TestHandle>,
    taps: DebugIgnore<Vec<Arc<Tap<C>>>>,
}

#[derive(Copy, Clone, Debug)]
enum TimeoutRule {
    Set(Duration),
    Disabled,
}

impl<C: Send + 'static> Group<C> {
    /// Creates a new, empty group.
    pub fn new(title: impl Into<String>, emitter: Emitter, refiner: Refiner) -> Self {
        Self {
            title: title.into(),
            meta: Map::new(),
            tests: Vec::new(),
            hooks: HookStack::default(),
            each: EachTest::default(),
            emitter,
            refiner,
            has_executed: false,
        }
    }

    /// Returns the group's title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns true if [`exec`](Self::exec) has been called.
    pub fn has_executed(&self) -> bool {
        self.has_executed
    }

    /// Returns the tests in this group.
    pub fn tests(&self) -> &[Test<C>] {
        &self.tests
    }

    /// Returns the tests in this group, mutably.
    pub fn tests_mut(&mut self) -> &mut [Test<C>] {
        &mut self.tests
    }

    /// Adds a metadata entry.
    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Adds a test to the group, applying bulk configuration registered so far.
    pub fn add(&mut self, mut test: Test<C>) -> &mut Self {
        test.set_parent_group(&self.title);
        match self.each.timeout {
            Some(TimeoutRule::Set(timeout)) => {
                test.timeout(timeout);
            }
            Some(TimeoutRule::Disabled) => {
                test.disable_timeout();
            }
            None => {}
        }
        if let Some(retries) = self.each.retries {
            test.retry(retries);
        }
        for hook in &self.each.hooks.setup {
            test.add_setup(hook.clone());
        }
        for hook in &self.each.hooks.teardown {
            test.add_teardown(hook.clone());
        }
        for tap in self.each.taps.iter() {
            tap(&mut test);
        }
        self.tests.push(test);
        self
    }

    /// Creates a test sharing this group's emitter and refiner, adds it, and returns it for
    /// configuration.
    pub fn test(&mut self, title: impl Into<String>) -> &mut Test<C>
    where
        C: Default,
    {
        let test = Test::new(title, self.emitter.clone(), self.refiner.clone());
        self.add(test);
        let last = self.tests.len() - 1;
        &mut self.tests[last]
    }

    /// Registers a setup hook for the group.
    pub fn setup<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(GroupHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.hooks.setup.push(Hook::new(f));
        self
    }

    /// Registers a teardown hook for the group.
    pub fn teardown<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(GroupHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.hooks.teardown.push(Hook::new(f));
        self
    }

    /// Registers a setup hook for each test added from now on.
    pub fn each_setup<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.each.hooks.setup.push(Hook::new(f));
        self
    }

    /// Registers a teardown hook for each test added from now on.
    pub fn each_teardown<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        self.each.hooks.teardown.push(Hook::new(f));
        self
    }

    /// Sets the timeout for each test added from now on. A zero duration disables the timeout.
    pub fn each_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.each.timeout = Some(if timeout.is_zero() {
            TimeoutRule::Disabled
        } else {
            TimeoutRule::Set(timeout)
        });
        self
    }

    /// Disables the timeout for each test added from now on.
    pub fn each_disable_timeout(&mut self) -> &mut Self {
        self.each.timeout = Some(TimeoutRule::Disabled);
        self
    }

    /// Sets the number of retries for each test added from now on.
    pub fn each_retry(&mut self, retries: u32) -> &mut Self {
        self.each.retries = Some(retries);
        self
    }

    /// Registers a callback invoked with each test added from now on.
    pub fn tap<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Test<C>) + Send + Sync + 'static,
    {
        self.each.taps.push(Arc::new(f));
        self
    }

    /// Executes the group.
    ///
    /// Nothing happens unless the [`Refiner`] admits the group. If the group's setup fails, its
    /// tests are not executed. Calling this more than once has no effect.
    pub async fn exec(&mut self) -> Result<(), EventDeliveryError> {
        if self.has_executed {
            return Ok(());
        }
        self.has_executed = true;

        if !self
            .refiner
            .allows_group(&self.title, self.tests.iter().map(Test::query))
        {
            return Ok(());
        }

        debug!(
            "executing group {} with {} {}",
            self.title,
            self.tests.len(),
            plural::tests_str(self.tests.len()),
        );
        self.emitter.emit(Event::GroupStart(GroupStartNode {
            title: self.title.clone(),
            meta: self.meta.clone(),
        }))?;

        let handle = GroupHandle {
            title: self.title.clone(),
            meta: self.meta.clone(),
        };
        let mut errors = ErrorLog::default();
        let tests = &mut self.tests;
        let body_result = self
            .hooks
            .run_around(&handle, &mut errors, move || async move {
                for test in tests.iter_mut() {
                    test.exec().await?;
                }
                Ok::<_, EventDeliveryError>(())
            })
            .await;
        if let Some(Err(error)) = body_result {
            return Err(error);
        }

        self.emitter.emit(Event::GroupEnd(GroupEndNode {
            title: self.title.clone(),
            meta: self.meta.clone(),
            has_error: !errors.is_empty(),
            errors: errors.into_vec(),
        }))
    }
}
