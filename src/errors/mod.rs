// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod loader;

pub use config::ConfigurationError;
pub use execution::{ExecutionError, JobError};
pub use loader::ConfigError;
