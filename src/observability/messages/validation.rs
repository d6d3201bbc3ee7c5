// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for registry population and pipeline construction.

use crate::config::JobId;
use crate::engine::PipelineId;
use crate::errors::ConfigurationError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

fn join(ids: &[JobId]) -> String {
    ids.iter().map(JobId::as_str).collect::<Vec<_>>().join(", ")
}

/// A job template was added to the registry.
///
/// # Log Level
/// `debug!` - Setup detail
pub struct JobRegistered<'a> {
    pub job_id: &'a JobId,
    pub kind: &'a str,
    pub dependencies: &'a [JobId],
}

impl Display for JobRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.dependencies.is_empty() {
            write!(f, "Registered {} job '{}'", self.kind, self.job_id)
        } else {
            write!(
                f,
                "Registered {} job '{}' depending on [{}]",
                self.kind,
                self.job_id,
                join(self.dependencies)
            )
        }
    }
}

impl StructuredLog for JobRegistered<'_> {
    fn log(&self) {
        tracing::debug!(
            job_id = %self.job_id,
            kind = self.kind,
            dependency_count = self.dependencies.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("job_registered", span_name = name, job_id = %self.job_id)
    }
}

/// A pipeline was resolved, linearized and wired.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineBuilt<'a> {
    pub pipeline_id: PipelineId,
    pub order: &'a [JobId],
}

impl Display for PipelineBuilt<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built {} with {} jobs: {}",
            self.pipeline_id,
            self.order.len(),
            join(self.order)
        )
    }
}

impl StructuredLog for PipelineBuilt<'_> {
    fn log(&self) {
        tracing::info!(
            pipeline_id = %self.pipeline_id,
            job_count = self.order.len(),
            order = join(self.order),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_built",
            span_name = name,
            pipeline_id = %self.pipeline_id,
            job_count = self.order.len(),
        )
    }
}

/// A pipeline could not be built.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ConfigurationRejected<'a> {
    pub error: &'a ConfigurationError,
}

impl Display for ConfigurationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Pipeline configuration rejected: {}", self.error)
    }
}

impl StructuredLog for ConfigurationRejected<'_> {
    fn log(&self) {
        match self.error {
            ConfigurationError::CycleDependency { path } => tracing::error!(
                cycle = join(path),
                cycle_length = path.len(),
                "{}", self
            ),
            _ => tracing::error!(error = %self.error, "{}", self),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("configuration_rejected", span_name = name, error = %self.error)
    }
}
