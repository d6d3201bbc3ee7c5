// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime error classification.
//!
//! [`JobError`] travels inside row results and through the executors. Only
//! [`JobError::Skipped`] is recoverable; every other variant aborts the run.
//! The scheduler returns the first fatal one wrapped in [`ExecutionError`].

use crate::config::JobId;
use thiserror::Error;

/// Outcome of a row or batch that could not produce a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The row could not be evaluated. Logged and passed on to subscribers,
    /// which decide locally what it means for them.
    #[error("row skipped: {reason}")]
    Skipped { reason: String },

    /// Job logic gave up on the whole run.
    #[error("{message}")]
    Fatal { message: String },

    /// The run scope was cancelled by a failure elsewhere in the pipeline.
    #[error("pipeline cancelled")]
    Cancelled,

    /// The run scope's deadline passed.
    #[error("pipeline deadline exceeded")]
    DeadlineExceeded,

    /// A dependency closed its stream before delivering the item we waited for.
    #[error("dependency '{dependency}' closed its stream early")]
    DependencyClosed { dependency: JobId },

    /// The job panicked; caught at the worker boundary.
    #[error("worker panicked: {message}")]
    WorkerPanicked { message: String },
}

impl JobError {
    pub fn skipped(reason: impl Into<String>) -> Self {
        JobError::Skipped {
            reason: reason.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        JobError::Fatal {
            message: message.into(),
        }
    }

    /// Whether this error must stop the entire run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, JobError::Skipped { .. })
    }
}

/// The fatal error a pipeline run ended with, tagged with the job that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job '{job_id}' aborted the pipeline: {error}")]
pub struct ExecutionError {
    pub job_id: JobId,
    pub error: JobError,
}

impl ExecutionError {
    pub fn new(job_id: JobId, error: JobError) -> Self {
        Self { job_id, error }
    }
}
