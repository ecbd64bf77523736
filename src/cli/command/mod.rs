//! This module provides different commands for the RustyPrometheus application.
//! For instance, we have a 'server' command to run the instrumented sample server and a
//! 'check' command to validate a configuration without serving anything.

use std::{path::PathBuf, time::Duration};

use clap::{Args, ValueEnum, ValueHint};
use strum::Display;

use crate::{
    cli::config::{self, Config},
    errors::MetricsError,
    metrics::route::RouteParameterPolicy,
};

pub mod check;
pub mod server;

#[derive(Args)]
#[group(required = false, multiple = true)]
pub struct CommandOptions {
    #[arg(
        long,
        next_line_help = true,
        value_name = "string",
        value_hint = ValueHint::AnyPath,
        long_help = r#"Path to a configuration file or directory of configuration files.
If the path is a directory, all files which end in .hcl or .json are loaded
and merged in lexical order."#
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        next_line_help = true,
        value_name = "string",
        num_args = 0..=1,
        env = "RPROM_LOG_LEVEL",
        default_value_t = LogLevel::Info,
        default_missing_value = "info",
        long_help = r#"Log verbosity level, used when the configuration does not set 'log_level'.
This can also be specified via the RPROM_LOG_LEVEL environment variable."#,
        value_enum
    )]
    log_level: LogLevel,
}

#[derive(ValueEnum, Display, Copy, Clone, Debug, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A loaded configuration whose route parameter policy and shutdown timeout are known to be valid.
#[derive(Debug, Clone)]
pub struct CheckedConfig {
    pub config: Config,
    pub policy: RouteParameterPolicy,
    pub shutdown_timeout: Duration,
}

impl CommandOptions {
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    /// The configured log level, falling back to the command-line one.
    pub fn log_level(&self, config: &Config) -> String {
        if config.log_level.is_empty() {
            self.log_level.to_string()
        } else {
            config.log_level.clone()
        }
    }

    pub fn load_config(&self, config_path: &PathBuf) -> Result<CheckedConfig, MetricsError> {
        let config = config::load_config(&config_path.to_string_lossy())?;
        let policy = config.metrics.route_parameter_policy()?;
        policy.validate()?;
        let shutdown_timeout = config.shutdown_timeout()?;

        Ok(CheckedConfig { config, policy, shutdown_timeout })
    }
}
