// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_STREAM_CAPACITY, DEFAULT_TIMEOUT_SECS, FALLBACK_CONCURRENCY, MAX_TIMEOUT_SECS,
};
use crate::config::JobId;
use crate::errors::ConfigError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Run configuration: which jobs to run and how.
///
/// # Fields
/// * `jobs` - Job identifiers to run; their dependencies are pulled in automatically
/// * `executor_options` - Scheduling limits (optional)
/// * `options` - Settings handed to the job implementations (optional)
///
/// # Example
/// ```yaml
/// jobs: ["eligibility", "sku-in-catalog", "cluster-volume"]
/// executor_options:
///   max_concurrency: 4
///   timeout_seconds: 60
///   stream_capacity: 4
/// options:
///   catalog_skus: [1001, 1002]
/// ```
#[derive(Debug, Deserialize)]
pub struct Config {
    pub jobs: Vec<JobId>,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub options: HashMap<String, serde_yaml::Value>,
}

/// Scheduling limits for a pipeline run.
///
/// # Fields
/// * `max_concurrency` - Streaming jobs allowed to run at once (optional)
/// * `timeout_seconds` - Overall deadline of one run in seconds (optional)
/// * `stream_capacity` - Items a producer may run ahead of each consumer (optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub stream_capacity: Option<usize>,
}

impl ExecutorOptions {
    /// Configured concurrency, else the machine's available parallelism.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_CONCURRENCY)
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn stream_capacity(&self) -> usize {
        self.stream_capacity.unwrap_or(DEFAULT_STREAM_CAPACITY)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // slots and queue depths end up as tokio semaphore permits
        let permits = Semaphore::MAX_PERMITS as u64;
        let limits = [
            ("max_concurrency", self.max_concurrency.map(|v| v as u64), permits),
            ("timeout_seconds", self.timeout_seconds, MAX_TIMEOUT_SECS),
            ("stream_capacity", self.stream_capacity.map(|v| v as u64), permits),
        ];

        for (name, value, max) in limits {
            match value {
                Some(0) => {
                    return Err(ConfigError::Invalid {
                        message: format!("executor_options.{} must be greater than zero", name),
                    })
                }
                Some(value) if value > max => {
                    return Err(ConfigError::Invalid {
                        message: format!("executor_options.{} must be at most {}", name, max),
                    })
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a config from a YAML file and reject values the engine cannot run with.
///
/// Job identifiers are checked against the registry later, when the pipeline
/// is built.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;

    if cfg.jobs.is_empty() {
        return Err(ConfigError::Invalid {
            message: "no jobs requested".to_string(),
        });
    }
    cfg.executor_options.validate()?;
    Ok(cfg)
}

/// Load rows from a JSON array.
pub fn load_dataset<R: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<R>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
