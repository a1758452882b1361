// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use pin_project_lite::pin_project;
use std::{future::Future, pin::Pin, task::Poll, time::Duration};
use tokio::time::{Instant, Sleep};

/// Creates a sleep that fires after `duration`, or never if `duration` is `None`.
pub(crate) fn resettable_sleep(duration: Option<Duration>) -> ResettableSleep {
    ResettableSleep::new(duration)
}

pin_project! {
    /// A wrapper around `tokio::time::Sleep` that can be re-armed with a new budget or disabled.
    #[derive(Debug)]
    pub(crate) struct ResettableSleep {
        #[pin]
        sleep: Sleep,
        state: SleepState,
    }
}

impl ResettableSleep {
    fn new(duration: Option<Duration>) -> Self {
        match duration {
            Some(duration) => Self {
                sleep: tokio::time::sleep(duration),
                state: SleepState::Armed { budget: duration },
            },
            None => Self {
                sleep: tokio::time::sleep_until(far_future()),
                state: SleepState::Disabled,
            },
        }
    }

    /// Returns the most recent budget this sleep was armed with, or `None` if disabled.
    pub(crate) fn budget(&self) -> Option<Duration> {
        match self.state {
            SleepState::Armed { budget } => Some(budget),
            SleepState::Disabled => None,
        }
    }

    /// Re-arms the sleep to fire `duration` from now, or disables it if `duration` is `None`.
    pub(crate) fn reset(self: Pin<&mut Self>, duration: Option<Duration>) {
        let this = self.project();
        match duration {
            Some(budget) => {
                this.sleep.reset(Instant::now() + budget);
                *this.state = SleepState::Armed { budget };
            }
            None => {
                this.sleep.reset(far_future());
                *this.state = SleepState::Disabled;
            }
        }
    }
}

impl Future for ResettableSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.state {
            SleepState::Armed { .. } => this.sleep.poll(cx),
            SleepState::Disabled => Poll::Pending,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum SleepState {
    Armed { budget: Duration },
    Disabled,
}

// Cribbed from tokio.
fn far_future() -> Instant {
    // Roughly 30 years from now.
    // API does not provide a way to obtain max `Instant`
    // or convert specific date in the future to instant.
    // 1000 years overflows on macOS, 100 years overflows on FreeBSD.
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
