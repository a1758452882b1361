// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by trellis.

use crate::events::EventKind;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt, sync::Arc, time::Duration};
use thiserror::Error;
use trellis_metadata::ExecutionPhase;

/// A boxed error returned by user-supplied callbacks.
///
/// Test bodies, hooks, cleanup functions and reporters all return this type, so any error type
/// (or a plain string) can be propagated with `?` or `.into()`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A reference-counted error, as stored in event payloads.
///
/// Event payloads are cloned for every subscriber, so errors are shared rather than owned.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// An error recorded while executing a test, group or suite.
///
/// Execution errors never abort a run: they are recorded against the phase in which they occurred,
/// and execution continues with the remaining phases.
#[derive(Clone, Debug)]
pub struct ExecutionError {
    /// The phase in which the error occurred.
    pub phase: ExecutionPhase,

    /// The error itself.
    pub error: SharedError,
}

impl ExecutionError {
    /// Creates a new `ExecutionError`.
    pub fn new(phase: ExecutionPhase, error: BoxError) -> Self {
        Self {
            phase,
            error: error.into(),
        }
    }

    /// Returns a display wrapper that renders the error along with its chain of sources.
    pub fn display_chain(&self) -> DisplayErrorChain<'_> {
        DisplayErrorChain(&*self.error)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.error)
    }
}

/// Displays an error followed by each of its sources, separated by `: `.
#[derive(Clone, Copy)]
pub struct DisplayErrorChain<'a>(&'a (dyn Error + 'static));

impl fmt::Display for DisplayErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut curr = self.0.source();
        while let Some(source) = curr {
            write!(f, ": {source}")?;
            curr = source.source();
        }
        Ok(())
    }
}

/// An error that occurred while configuring a test.
///
/// Configuration errors are programmer errors: they're returned synchronously at configuration
/// time and are never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigureError {
    /// A dataset was provided as a JSON value that wasn't an array.
    #[error("dataset for test `{title}` must be an array, found {found}")]
    DatasetNotArray {
        /// The title of the test being configured.
        title: String,

        /// The kind of JSON value that was found instead.
        found: &'static str,
    },

    /// Typed dataset rows could not be converted to JSON.
    #[error("failed to serialize dataset rows for test `{title}`")]
    DatasetSerialize {
        /// The title of the test being configured.
        title: String,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// An error that occurred while parsing the trellis config.
#[derive(Debug, Error)]
#[error("failed to parse trellis config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// A subscriber failed while an event was being delivered.
///
/// If the emitter has an error handler installed, this error is passed to the handler. Otherwise,
/// it is returned to the caller of [`Emitter::emit`](crate::emitter::Emitter::emit), and from there
/// out of `exec`.
#[derive(Debug, Error)]
#[error("subscriber failed while handling `{event}` event")]
pub struct EventDeliveryError {
    event: EventKind,
    #[source]
    error: BoxError,
}

impl EventDeliveryError {
    pub(crate) fn new(event: EventKind, error: BoxError) -> Self {
        Self { event, error }
    }

    /// Returns the kind of event that was being delivered.
    pub fn event(&self) -> EventKind {
        self.event
    }
}

/// An error that occurred while driving a run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunnerError {
    /// A reporter failed while it was being booted.
    #[error("reporter `{name}` failed to start")]
    ReporterBoot {
        /// The reporter's name, or `<anonymous #n>` for unnamed reporters.
        name: String,

        /// The underlying error.
        #[source]
        error: BoxError,
    },

    /// An event could not be delivered.
    #[error(transparent)]
    EventDelivery(#[from] EventDeliveryError),
}

/// A test attempt ran for longer than its timeout.
#[derive(Clone, Debug, Error)]
#[error("test timed out after {}ms", .timeout.as_millis())]
pub struct TestTimeoutError {
    timeout: Duration,
}

impl TestTimeoutError {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Returns the timeout that was exceeded.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// A test body registered with `run_with_done` dropped its [`Done`](crate::test::Done) handle
/// without calling it.
#[derive(Clone, Debug, Error)]
#[error("test finished without calling its done handle")]
pub struct DoneNotCalledError;

/// A test, hook or cleanup function panicked.
#[derive(Clone, Debug, Error)]
#[error("panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the panic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A test marked as an expected failure finished without an error.
#[derive(Clone, Debug, Error)]
#[error(
    "test marked with fails() must finish with an error{}",
    .reason.as_deref().map(|reason| format!(" ({reason})")).unwrap_or_default()
)]
pub struct ExpectedFailureError {
    reason: Option<String>,
}

impl ExpectedFailureError {
    pub(crate) fn new(reason: Option<String>) -> Self {
        Self { reason }
    }
}
