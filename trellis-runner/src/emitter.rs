// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event bus shared by every component of a run.

use crate::{
    errors::{BoxError, EventDeliveryError},
    events::{Event, EventKind},
};
use debug_ignore::DebugIgnore;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::trace;

type Subscriber = Arc<dyn Fn(&Event) -> Result<(), BoxError> + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(EventDeliveryError) + Send + Sync>;

/// A publish/subscribe bus for lifecycle [`Event`]s.
///
/// An `Emitter` is a cheap handle: clones share the same set of subscribers. Subscribers are
/// invoked synchronously, in registration order, each time an event is emitted.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    inner: Arc<Mutex<EmitterInner>>,
}

#[derive(Debug, Default)]
struct EmitterInner {
    subscribers: DebugIgnore<Vec<(Option<EventKind>, Subscriber)>>,
    error_handler: DebugIgnore<Option<ErrorHandler>>,
}

impl Emitter {
    /// Creates a new emitter with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to a single kind of event.
    pub fn on<F>(&self, kind: EventKind, f: F) -> &Self
    where
        F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.lock().subscribers.push((Some(kind), Arc::new(f)));
        self
    }

    /// Subscribes to every event.
    pub fn on_any<F>(&self, f: F) -> &Self
    where
        F: Fn(&Event) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.lock().subscribers.push((None, Arc::new(f)));
        self
    }

    /// Installs a handler for subscriber failures, replacing any existing handler.
    ///
    /// Without a handler, a subscriber failure is returned from [`emit`](Self::emit).
    pub fn on_error<F>(&self, f: F) -> &Self
    where
        F: Fn(EventDeliveryError) + Send + Sync + 'static,
    {
        *self.lock().error_handler = Some(Arc::new(f));
        self
    }

    /// Delivers an event to every matching subscriber.
    ///
    /// All subscribers are invoked even if an earlier one fails. The first failure is passed to
    /// the error handler if one is installed, and returned otherwise.
    pub fn emit(&self, event: Event) -> Result<(), EventDeliveryError> {
        let kind = event.kind();
        // Subscribers may themselves subscribe or emit, so don't hold the lock while calling them.
        let (subscribers, error_handler) = {
            let inner = self.lock();
            let subscribers: Vec<_> = inner
                .subscribers
                .iter()
                .filter(|(filter, _)| filter.is_none_or(|filter| filter == kind))
                .map(|(_, subscriber)| subscriber.clone())
                .collect();
            let error_handler: Option<ErrorHandler> = (*inner.error_handler).clone();
            (subscribers, error_handler)
        };

        trace!(event = %kind, subscribers = subscribers.len(), "emitting event");

        let mut first_error = None;
        for subscriber in subscribers {
            if let Err(error) = subscriber(&event)
                && first_error.is_none()
            {
                first_error = Some(EventDeliveryError::new(kind, error));
            }
        }

        match (first_error, error_handler) {
            (None, _) => Ok(()),
            (Some(error), Some(handler)) => {
                handler(error);
                Ok(())
            }
            (Some(error), None) => Err(error),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, EmitterInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
