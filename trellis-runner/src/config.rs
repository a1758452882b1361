// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runner configuration.
//!
//! Configuration is read from an optional TOML file layered over built-in defaults. See
//! [`RunnerConfig::from_sources`].

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    refiner::{FilterLayer, Refiner},
    test::TestDefaults,
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};
use tracing::warn;

/// Configuration for a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunnerConfig {
    timeout: Option<Duration>,
    retries: u32,
    filters: FilterConfig,
}

impl RunnerConfig {
    /// The default location of the config file, relative to the project root.
    pub const CONFIG_PATH: &'static str = ".config/trellis.toml";

    /// The built-in defaults, in TOML format.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the configuration.
    ///
    /// If `file` is `None`, the config is read from [`Self::CONFIG_PATH`] under `root`, and a
    /// missing file is not an error. Unknown keys are reported as warnings.
    pub fn from_sources(
        root: impl AsRef<Utf8Path>,
        file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let config_file = root.as_ref().join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        if !unknown.is_empty() {
            Self::warn_unknown_keys(&config_file, &unknown);
        }

        Ok(config.into_config())
    }

    /// Returns the built-in default configuration.
    pub fn default_config() -> Result<Self, ConfigParseError> {
        let (config, _unknown) = Self::build_and_deserialize_config(&Self::make_default_config())
            .map_err(|kind| ConfigParseError::new("<default config>", kind))?;
        Ok(config.into_config())
    }

    /// Returns the default per-test timeout, or `None` if timeouts are disabled.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the default number of retries.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns the filter configuration.
    pub fn filters(&self) -> &FilterConfig {
        &self.filters
    }

    /// Builds a [`Refiner`] from the filter configuration.
    pub fn refiner(&self) -> Refiner {
        let refiner = Refiner::new();
        refiner
            .add(FilterLayer::Tests, self.filters.tests.iter().cloned())
            .add(FilterLayer::Groups, self.filters.groups.iter().cloned())
            .add(FilterLayer::Tags, self.filters.tags.iter().cloned())
            .match_all_tags(self.filters.match_all_tags);
        refiner
    }

    /// Returns the defaults to apply to tests.
    pub fn test_defaults(&self) -> TestDefaults {
        TestDefaults {
            timeout: self.timeout,
            retries: self.retries,
        }
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(RunnerConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: RunnerConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // The config crate also reports the key; drop it so the path is only shown once.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }

    fn warn_unknown_keys(config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if let [key] = unknown.iter().collect::<Vec<_>>().as_slice() {
            unknown_str.push_str("key: ");
            unknown_str.push_str(key);
        } else {
            unknown_str.push_str("keys:\n");
            for key in unknown {
                unknown_str.push_str("\n  - ");
                unknown_str.push_str(key);
            }
        }
        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// Test and group filters read from the `[filters]` table.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Exact test titles to run.
    #[serde(default)]
    pub tests: Vec<String>,

    /// Exact group titles to run.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Tags to run. Tags prefixed with `!` are excluded.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Whether tests must carry all of `tags` rather than any of them.
    #[serde(default)]
    pub match_all_tags: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RunnerConfigDeserialize {
    #[serde(with = "humantime_serde")]
    timeout: Duration,
    retries: u32,
    #[serde(default)]
    filters: FilterConfig,
}

impl RunnerConfigDeserialize {
    fn into_config(self) -> RunnerConfig {
        RunnerConfig {
            timeout: (!self.timeout.is_zero()).then_some(self.timeout),
            retries: self.retries,
            filters: self.filters,
        }
    }
}
