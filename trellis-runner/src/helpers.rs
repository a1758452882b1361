// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{BoxError, PanicError};
use futures::FutureExt;
use std::{any::Any, future::Future, panic::AssertUnwindSafe};

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "attempt" if `count` is 1, otherwise "attempts".
    pub(crate) fn attempts_str(count: u32) -> &'static str {
        if count == 1 { "attempt" } else { "attempts" }
    }
}

/// Runs a user-supplied callback to completion, converting panics into errors.
///
/// The callback is invoked inside the guard as well, so a panic while *creating* the future is
/// caught just like a panic while polling it.
pub(crate) async fn guard_panics<T, F, Fut>(f: F) -> Result<T, BoxError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, BoxError>>,
{
    let fut = match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(fut) => fut,
        Err(payload) => return Err(panic_error(payload)),
    };
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload)),
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> BoxError {
    let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    };
    Box::new(PanicError::new(message))
}
