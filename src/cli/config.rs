//! This module defines and handles the config file options for RustyPrometheus application.
//! For instance, the address the sample server listens on and the options of the request
//! metrics middleware are handled in this module.

use std::{collections::HashMap, fs, path::Path, time::Duration};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{errors::MetricsError, http::METRICS_PATH_DEFAULT, metrics::route::RouteParameterPolicy};

/// A struct that contains several configurable options of RustyPrometheus server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "validate_listener")]
    pub listener: HashMap<String, Listener>,
    #[serde(default)]
    pub log_level: String,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: String,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// A struct that contains several configurable options for networking stuffs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listener {
    #[serde(default)]
    pub ltype: String,
    pub address: String,
}

/// Options of the request metrics middleware and of the scrape endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_path")]
    pub path: String,
    #[serde(default = "default_bool_true", deserialize_with = "parse_bool_string")]
    pub init_metrics: bool,
    #[serde(default = "default_bool_true", deserialize_with = "parse_bool_string")]
    pub end_metrics: bool,
    #[serde(default)]
    pub fixed_route_parameters: Value,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            path: default_metrics_path(),
            init_metrics: true,
            end_metrics: true,
            fixed_route_parameters: Value::Null,
        }
    }
}

impl MetricsConfig {
    pub fn route_parameter_policy(&self) -> Result<RouteParameterPolicy, MetricsError> {
        RouteParameterPolicy::from_value(&self.fixed_route_parameters)
    }
}

fn default_bool_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    METRICS_PATH_DEFAULT.to_string()
}

fn default_shutdown_timeout() -> String {
    "30s".to_string()
}

fn parse_bool_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    match value {
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(serde::de::Error::custom("Invalid value for bool")),
        },
        _ => Err(serde::de::Error::custom("Invalid value for bool")),
    }
}

fn validate_listener<'de, D>(deserializer: D) -> Result<HashMap<String, Listener>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let listeners: HashMap<String, Listener> = Deserialize::deserialize(deserializer)?;

    for key in listeners.keys() {
        if key != "tcp" {
            return Err(serde::de::Error::custom("Invalid listener key"));
        }
    }

    Ok(listeners)
}

impl Config {
    pub fn merge(&mut self, other: Config) {
        self.listener.extend(other.listener);

        if !other.log_level.is_empty() {
            self.log_level = other.log_level;
        }

        if other.shutdown_timeout != default_shutdown_timeout() {
            self.shutdown_timeout = other.shutdown_timeout;
        }

        if other.metrics != MetricsConfig::default() {
            self.metrics = other.metrics;
        }
    }

    pub fn shutdown_timeout(&self) -> Result<Duration, MetricsError> {
        humantime::parse_duration(&self.shutdown_timeout)
            .map_err(|_| MetricsError::ErrConfigDurationInvalid(self.shutdown_timeout.clone()))
    }
}

pub fn load_config(path: &str) -> Result<Config, MetricsError> {
    let f = Path::new(path);
    if f.is_dir() {
        load_config_dir(path)
    } else if f.is_file() {
        load_config_file(path)
    } else {
        Err(MetricsError::ErrConfigPathInvalid)
    }
}

fn load_config_dir(dir: &str) -> Result<Config, MetricsError> {
    log::debug!("load_config_dir: {}", dir);
    let mut paths: Vec<String> = Vec::new();

    for entry in fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if let Some(ext) = path.extension() {
            if ext == "hcl" || ext == "json" {
                paths.push(path.to_string_lossy().into_owned());
            }
        }
    }
    paths.sort();

    let mut result: Option<Config> = None;

    for path in paths {
        log::debug!("load_config_dir path: {}", path);
        let config = load_config_file(&path)?;
        match result.as_mut() {
            Some(merged) => merged.merge(config),
            None => result = Some(config),
        }
    }

    let config = result.ok_or(MetricsError::ErrConfigLoadFailed)?;
    check_config(&config)?;
    Ok(config)
}

fn load_config_file(path: &str) -> Result<Config, MetricsError> {
    log::debug!("load_config_file: {}", path);
    let file = fs::File::open(path)?;

    let mut config: Config = if path.ends_with(".hcl") {
        hcl::from_reader(file)?
    } else if path.ends_with(".json") {
        serde_json::from_reader(file)?
    } else {
        return Err(MetricsError::ErrConfigPathInvalid);
    };

    set_config_type_field(&mut config);
    check_config(&config)?;
    Ok(config)
}

fn set_config_type_field(config: &mut Config) {
    config.listener.iter_mut().for_each(|(key, value)| value.ltype = key.clone());
}

fn check_config(config: &Config) -> Result<(), MetricsError> {
    if config.listener.len() != 1 {
        return Err(MetricsError::ErrConfigListenerNotFound);
    }

    Ok(())
}
