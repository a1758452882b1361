// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Setup and teardown hooks, and the cleanup functions they return.
//!
//! Tests, groups and suites all share the same hook model:
//!
//! * setup hooks run in registration order, stopping at the first failure;
//! * any hook may return a [`Cleanup`], which is queued for its phase;
//! * queued cleanups run in reverse order, and all of them run even if some fail.

use crate::{
    errors::{BoxError, ExecutionError},
    helpers::guard_panics,
};
use derive_where::derive_where;
use futures::{FutureExt, future::BoxFuture};
use std::{fmt, future::Future, sync::Arc};
use tracing::debug;
use trellis_metadata::ExecutionPhase;

/// A cleanup function, run once after the phase that queued it.
pub struct Cleanup(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>);

impl Cleanup {
    /// Creates a new cleanup function.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self(Box::new(move || f().boxed()))
    }

    async fn run(self) -> Result<(), BoxError> {
        guard_panics(self.0).await
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

type HookFn<E> = dyn Fn(E) -> BoxFuture<'static, Result<Option<Cleanup>, BoxError>> + Send + Sync;

/// A setup or teardown hook for an entity of type `E`.
///
/// `E` is a handle to the entity the hook runs for: a
/// [`TestHandle`](crate::test::TestHandle), [`GroupHandle`](crate::group::GroupHandle) or
/// [`SuiteHandle`](crate::suite::SuiteHandle).
#[derive_where(Clone)]
pub(crate) struct Hook<E>(Arc<HookFn<E>>);

impl<E: 'static> Hook<E> {
    /// Creates a hook that may return a cleanup function.
    pub(crate) fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Cleanup>, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |entity| f(entity).boxed()))
    }
}

impl<E> fmt::Debug for Hook<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// The setup and teardown hooks registered for an entity.
#[derive_where(Clone, Debug, Default)]
pub(crate) struct HookStack<E> {
    pub(crate) setup: Vec<Hook<E>>,
    pub(crate) teardown: Vec<Hook<E>>,
}

impl<E: Clone + Send + 'static> HookStack<E> {
    /// Runs setup, then `body` if setup succeeded, then setup cleanups, teardown and teardown
    /// cleanups.
    ///
    /// If setup fails, `body` and teardown are skipped; setup cleanups that were already queued
    /// still run. Returns `None` if `body` was skipped.
    pub(crate) async fn run_around<T, Fut>(
        &self,
        entity: &E,
        errors: &mut ErrorLog,
        body: impl FnOnce() -> Fut,
    ) -> Option<T>
    where
        Fut: Future<Output = T>,
    {
        let (setup_cleanups, setup_result) = run_hooks(&self.setup, entity).await;
        if let Err(error) = setup_result {
            errors.record(ExecutionPhase::Setup, error);
            run_cleanups(setup_cleanups, ExecutionPhase::SetupCleanup, errors).await;
            return None;
        }

        let output = body().await;

        run_cleanups(setup_cleanups, ExecutionPhase::SetupCleanup, errors).await;
        self.run_teardown(entity, errors).await;
        Some(output)
    }

    /// Runs teardown hooks, then the cleanups they queued.
    pub(crate) async fn run_teardown(&self, entity: &E, errors: &mut ErrorLog) {
        let (teardown_cleanups, teardown_result) = run_hooks(&self.teardown, entity).await;
        if let Err(error) = teardown_result {
            errors.record(ExecutionPhase::Teardown, error);
        }
        run_cleanups(teardown_cleanups, ExecutionPhase::TeardownCleanup, errors).await;
    }
}

/// Runs hooks in order, stopping at the first failure.
///
/// Returns the cleanups queued by the hooks that ran, along with the first failure if any.
pub(crate) async fn run_hooks<E: Clone + Send + 'static>(
    hooks: &[Hook<E>],
    entity: &E,
) -> (Vec<Cleanup>, Result<(), BoxError>) {
    let mut cleanups = Vec::new();
    for hook in hooks {
        let hook = hook.0.clone();
        let entity = entity.clone();
        match guard_panics(move || hook(entity)).await {
            Ok(Some(cleanup)) => cleanups.push(cleanup),
            Ok(None) => {}
            Err(error) => return (cleanups, Err(error)),
        }
    }
    (cleanups, Ok(()))
}

/// Runs cleanups in reverse order, recording every failure against `phase`.
pub(crate) async fn run_cleanups(
    cleanups: Vec<Cleanup>,
    phase: ExecutionPhase,
    errors: &mut ErrorLog,
) {
    if cleanups.is_empty() {
        return;
    }
    debug!(%phase, count = cleanups.len(), "running cleanups");
    for cleanup in cleanups.into_iter().rev() {
        if let Err(error) = cleanup.run().await {
            errors.record(phase, error);
        }
    }
}

/// The errors recorded while executing an entity.
#[derive(Debug, Default)]
pub(crate) struct ErrorLog {
    errors: Vec<ExecutionError>,
}

impl ErrorLog {
    pub(crate) fn record(&mut self, phase: ExecutionPhase, error: BoxError) {
        debug!(%phase, error = %error, "recorded error");
        self.errors.push(ExecutionError::new(phase, error));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn into_vec(self) -> Vec<ExecutionError> {
        self.errors
    }
}
