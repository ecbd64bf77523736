use std::path::PathBuf;

use clap::Parser;
use derive_more::Deref;
use sysexits::ExitCode;

use crate::{cli::command, errors::MetricsError, EXIT_CODE_INSUFFICIENT_PARAMS, EXIT_CODE_LOAD_CONFIG_FAILURE, EXIT_CODE_OK};

#[derive(Parser, Deref)]
#[command(
    author,
    version,
    about = r#"Load a RustyPrometheus configuration and validate it without starting a server.
Every fixed route parameter entry is checked, so a malformed entry is reported here
instead of failing the first request that reaches its route.

Check a configuration file:

  $ rprom check --config=/etc/rprom/config.hcl"#
)]
pub struct Check {
    #[deref]
    #[command(flatten, next_help_heading = "Command Options")]
    command_options: command::CommandOptions,
}

impl Check {
    #[inline]
    pub fn execute(&mut self) -> ExitCode {
        if let Some(config_path) = self.config_path() {
            return match self.main(config_path) {
                Ok(summary) => {
                    println!("{}", summary);
                    EXIT_CODE_OK
                }
                Err(e) => {
                    eprintln!("config error: {}", e);
                    EXIT_CODE_LOAD_CONFIG_FAILURE
                }
            };
        }

        EXIT_CODE_INSUFFICIENT_PARAMS
    }

    pub fn main(&self, config_path: &PathBuf) -> Result<String, MetricsError> {
        let checked = self.load_config(config_path)?;
        let (_, listener) = checked.config.listener.iter().next().ok_or(MetricsError::ErrConfigListenerNotFound)?;

        Ok(format!(
            "config ok, listener: {}, metrics path: {}, fixed routes: {}, shutdown timeout: {}",
            listener.address,
            checked.config.metrics.path,
            checked.policy.len(),
            humantime::format_duration(checked.shutdown_timeout),
        ))
    }
}
