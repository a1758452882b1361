// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup for processes embedding the runner.
//!
//! The runner itself only emits [`tracing`] events. Call [`init_logging`] once to route them to
//! stderr, filtered by the `TRELLIS_LOG` environment variable.

use std::{fmt, str::FromStr};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
    warn,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable used to configure log filtering, in [`Targets`] syntax (for example
/// `trellis_runner=debug`).
pub const LOG_ENV: &str = "TRELLIS_LOG";

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

/// Installs a global subscriber that writes log lines to stderr.
///
/// Only the first call has any effect. If `TRELLIS_LOG` is unset or empty, events at `info` and
/// above are shown; if it cannot be parsed, a warning is logged and the same default is used.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var(LOG_ENV).unwrap_or_default();
        let (targets, parse_error) = match parse_targets(&level_str) {
            Ok(targets) => (targets, None),
            Err(error) => (default_targets(), Some(error)),
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some(error) = parse_error {
            warn!("unable to parse {LOG_ENV}, using default log level: {error}");
        }
    });
}

fn default_targets() -> Targets {
    Targets::new().with_default(LevelFilter::INFO)
}

fn parse_targets(level_str: &str) -> Result<Targets, <Targets as FromStr>::Err> {
    // If the level string is empty, use the standard level filter instead.
    if level_str.trim().is_empty() {
        Ok(default_targets())
    } else {
        level_str.parse()
    }
}

struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let prefix = match *metadata.level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(writer, "{prefix}: ")?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            // Show other fields for debug or trace output.
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let result = if field.name() == MESSAGE_FIELD {
            write!(self.writer, "{value:?}")
        } else if self.show_other {
            write!(self.writer, "; {} = {:?}", field.name(), value)
        } else {
            Ok(())
        };
        if let Err(error) = result {
            self.error = Some(error);
        }
    }
}
