// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The top-level runner.
//!
//! The main structure in this module is [`Runner`]. A run is split into three public phases:
//!
//! 1. [`Runner::start`] boots the [`Tracker`], invokes reporters and emits `runner:start`.
//! 2. [`Runner::exec`] executes each suite, in order.
//! 3. [`Runner::end`] emits `runner:end`.
//!
//! [`Runner::run`] performs all three and returns the summary.

use crate::{
    emitter::Emitter,
    errors::{BoxError, RunnerError},
    events::Event,
    suite::Suite,
    tracker::{RunnerSummary, Tracker},
};
use debug_ignore::DebugIgnore;
use derive_where::derive_where;
use futures::future::{BoxFuture, FutureExt};
use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

type ReporterFn =
    dyn Fn(RunnerHandle, Emitter) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;
type SuitePlugin<C> = dyn Fn(&mut Suite<C>) + Send + Sync;

/// A reporter: a handler invoked once when the run starts.
///
/// Reporters subscribe to the [`Emitter`] they're passed, and may keep the [`RunnerHandle`] to
/// read the summary once the run is over.
#[derive(Clone)]
pub struct Reporter {
    name: Option<String>,
    handler: Arc<ReporterFn>,
}

impl Reporter {
    /// Creates an anonymous reporter.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(RunnerHandle, Emitter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            name: None,
            handler: Arc::new(move |handle, emitter| handler(handle, emitter).boxed()),
        }
    }

    /// Creates a named reporter. The name is used in error messages.
    pub fn named<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RunnerHandle, Emitter) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(handler)
        }
    }

    /// Returns the reporter's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A handle to the runner, passed to reporters.
#[derive(Clone, Debug)]
pub struct RunnerHandle {
    suite_names: Vec<String>,
    tracker: Arc<Mutex<Tracker>>,
}

impl RunnerHandle {
    /// Returns the names of the suites registered when the run started.
    pub fn suite_names(&self) -> &[String] {
        &self.suite_names
    }

    /// Returns the summary of the run so far.
    pub fn summary(&self) -> RunnerSummary {
        lock(&self.tracker).summary()
    }
}

/// Runs an ordered list of suites.
#[derive_where(Debug)]
pub struct Runner<C> {
    suites: Vec<Suite<C>>,
    reporters: Vec<Reporter>,
    suite_plugins: DebugIgnore<Vec<Arc<SuitePlugin<C>>>>,
    emitter: Emitter,
    tracker: Option<Arc<Mutex<Tracker>>>,
}

impl<C: Send + 'static> Runner<C> {
    /// Creates a new runner that emits events through `emitter`.
    ///
    /// Suites added to the runner should share the same emitter.
    pub fn new(emitter: Emitter) -> Self {
        Self {
            suites: Vec::new(),
            reporters: Vec::new(),
            suite_plugins: DebugIgnore(Vec::new()),
            emitter,
            tracker: None,
        }
    }

    /// Returns the emitter.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Returns the suites, in execution order.
    pub fn suites(&self) -> &[Suite<C>] {
        &self.suites
    }

    /// Registers a callback invoked for every suite added from now on.
    pub fn on_suite<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Suite<C>) + Send + Sync + 'static,
    {
        self.suite_plugins.push(Arc::new(f));
        self
    }

    /// Adds a suite.
    pub fn add(&mut self, mut suite: Suite<C>) -> &mut Self {
        for plugin in self.suite_plugins.iter() {
            plugin(&mut suite);
        }
        self.suites.push(suite);
        self
    }

    /// Registers a reporter. Reporters are invoked by [`start`](Self::start) in registration
    /// order.
    pub fn reporter(&mut self, reporter: Reporter) -> &mut Self {
        self.reporters.push(reporter);
        self
    }

    /// Starts the run.
    ///
    /// On the first call, this boots the [`Tracker`] and invokes every reporter, awaiting each in
    /// turn. It then emits `runner:start`.
    pub async fn start(&mut self) -> Result<(), RunnerError> {
        if self.tracker.is_none() {
            let tracker = self.boot_tracker();
            let handle = RunnerHandle {
                suite_names: self.suites.iter().map(|s| s.name().to_owned()).collect(),
                tracker,
            };

            for (index, reporter) in self.reporters.iter().enumerate() {
                let name = match reporter.name() {
                    Some(name) => name.to_owned(),
                    None => format!("<anonymous #{}>", index + 1),
                };
                debug!(reporter = %name, "booting reporter");
                (reporter.handler)(handle.clone(), self.emitter.clone())
                    .await
                    .map_err(|error| RunnerError::ReporterBoot { name, error })?;
            }
        }

        self.emitter.emit(Event::RunnerStart)?;
        Ok(())
    }

    /// Executes every suite, in order.
    pub async fn exec(&mut self) -> Result<(), RunnerError> {
        for suite in &mut self.suites {
            suite.exec().await?;
        }
        Ok(())
    }

    /// Ends the run, emitting `runner:end`.
    pub fn end(&mut self) -> Result<(), RunnerError> {
        self.emitter.emit(Event::RunnerEnd)?;
        Ok(())
    }

    /// Returns the summary of the run so far, or `None` if the run hasn't been started.
    pub fn summary(&self) -> Option<RunnerSummary> {
        self.tracker.as_ref().map(|tracker| lock(tracker).summary())
    }

    /// Starts, executes and ends the run, then returns its summary.
    pub async fn run(&mut self) -> Result<RunnerSummary, RunnerError> {
        self.start().await?;
        self.exec().await?;
        self.end()?;

        let tracker = self.boot_tracker();
        let summary = lock(&tracker).summary();
        debug!(
            total = summary.aggregates.total,
            failed = summary.aggregates.failed,
            "run finished"
        );
        Ok(summary)
    }

    fn boot_tracker(&mut self) -> Arc<Mutex<Tracker>> {
        let emitter = &self.emitter;
        self.tracker
            .get_or_insert_with(|| {
                let tracker = Arc::new(Mutex::new(Tracker::new()));
                let tracker2 = tracker.clone();
                emitter.on_any(move |event| {
                    lock(&tracker2).process(event);
                    Ok(())
                });
                tracker
            })
            .clone()
    }
}

fn lock(tracker: &Mutex<Tracker>) -> MutexGuard<'_, Tracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}
