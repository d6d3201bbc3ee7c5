// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for job lifecycle and row-level outcomes.

use crate::config::JobId;
use crate::errors::JobError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A job was admitted and started running.
///
/// # Log Level
/// `debug!` - Execution detail
pub struct JobStarted<'a> {
    pub job_id: &'a JobId,
    pub kind: &'a str,
}

impl Display for JobStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Starting {} job '{}'", self.kind, self.job_id)
    }
}

impl StructuredLog for JobStarted<'_> {
    fn log(&self) {
        tracing::debug!(job_id = %self.job_id, kind = self.kind, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("job", span_name = name, job_id = %self.job_id, kind = self.kind)
    }
}

/// A job went through every row.
///
/// # Log Level
/// `info!` - Important operational event
pub struct JobCompleted<'a> {
    pub job_id: &'a JobId,
    pub rows: usize,
    pub duration: Duration,
}

impl Display for JobCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job '{}' processed {} rows in {:?}",
            self.job_id, self.rows, self.duration
        )
    }
}

impl StructuredLog for JobCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            job_id = %self.job_id,
            rows = self.rows,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("job_completed", span_name = name, job_id = %self.job_id)
    }
}

/// A job stopped with an error. Fatal errors abort the run; a skipped
/// mutating job only loses its own changes.
///
/// # Log Level
/// `error!` when fatal, `warn!` otherwise
pub struct JobFailed<'a> {
    pub job_id: &'a JobId,
    pub error: &'a JobError,
    pub fatal: bool,
}

impl Display for JobFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Job '{}' failed: {}", self.job_id, self.error)
    }
}

impl StructuredLog for JobFailed<'_> {
    fn log(&self) {
        if self.fatal {
            tracing::error!(job_id = %self.job_id, error = %self.error, fatal = true, "{}", self);
        } else {
            tracing::warn!(job_id = %self.job_id, error = %self.error, fatal = false, "{}", self);
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "job_failed",
            span_name = name,
            job_id = %self.job_id,
            fatal = self.fatal,
        )
    }
}

/// A row (or batch) could not be evaluated; its result is passed on.
///
/// # Log Level
/// `warn!` - Recoverable, per row
pub struct RowSkipped<'a> {
    pub job_id: &'a JobId,
    pub position: usize,
    pub error: &'a JobError,
}

impl Display for RowSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Job '{}' row {}: {}",
            self.job_id, self.position, self.error
        )
    }
}

impl StructuredLog for RowSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            job_id = %self.job_id,
            position = self.position,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "row_skipped",
            span_name = name,
            job_id = %self.job_id,
            position = self.position,
        )
    }
}
