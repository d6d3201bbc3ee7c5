// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for pipeline run lifecycle events.
//!
//! This module contains message types for logging events related to:
//! * Pipeline scheduling, start, completion and abort
//! * Phase transitions (mutating → streaming)
//! * Admission slot sizing

use crate::engine::PipelineId;
use crate::errors::ExecutionError;
use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A pipeline was handed to the platform to run.
///
/// # Log Level
/// `info!` - Important operational event
///
/// The span built from this message is the one every log of the run is
/// recorded under.
pub struct PipelineScheduled {
    pub pipeline_id: PipelineId,
    pub jobs: usize,
    pub timeout: Duration,
}

impl Display for PipelineScheduled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduling {} with {} jobs, timeout {:?}",
            self.pipeline_id, self.jobs, self.timeout
        )
    }
}

impl StructuredLog for PipelineScheduled {
    fn log(&self) {
        tracing::info!(
            pipeline_id = %self.pipeline_id,
            jobs = self.jobs,
            timeout_ms = self.timeout.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline",
            span_name = name,
            pipeline_id = %self.pipeline_id,
            jobs = self.jobs,
        )
    }
}

/// Pipeline run started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineStarted {
    pub pipeline_id: PipelineId,
    pub mutating_jobs: usize,
    pub streaming_jobs: usize,
    pub max_concurrency: usize,
}

impl Display for PipelineStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {}: {} mutating jobs, {} streaming jobs, max_concurrency={}",
            self.pipeline_id, self.mutating_jobs, self.streaming_jobs, self.max_concurrency
        )
    }
}

impl StructuredLog for PipelineStarted {
    fn log(&self) {
        tracing::info!(
            pipeline_id = %self.pipeline_id,
            mutating_jobs = self.mutating_jobs,
            streaming_jobs = self.streaming_jobs,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "pipeline_run",
            span_name = name,
            pipeline_id = %self.pipeline_id,
            mutating_jobs = self.mutating_jobs,
            streaming_jobs = self.streaming_jobs,
        )
    }
}

/// A run phase started.
///
/// # Log Level
/// `debug!` - Scheduling detail
pub struct PhaseStarted<'a> {
    pub phase: &'a str,
    pub job_count: usize,
    pub slots: usize,
}

impl Display for PhaseStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Entering {} phase: {} jobs on {} slots",
            self.phase, self.job_count, self.slots
        )
    }
}

impl StructuredLog for PhaseStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            phase = self.phase,
            job_count = self.job_count,
            slots = self.slots,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("phase", span_name = name, phase = self.phase)
    }
}

/// The configured concurrency was too small for a group of streaming jobs
/// that depend on each other, and was raised.
///
/// # Log Level
/// `warn!` - Configuration the engine had to override
pub struct ConcurrencyRaised {
    pub requested: usize,
    pub effective: usize,
}

impl Display for ConcurrencyRaised {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "max_concurrency={} cannot run {} connected streaming jobs together; using {}",
            self.requested, self.effective, self.effective
        )
    }
}

impl StructuredLog for ConcurrencyRaised {
    fn log(&self) {
        tracing::warn!(
            requested = self.requested,
            effective = self.effective,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "concurrency_raised",
            span_name = name,
            requested = self.requested,
            effective = self.effective,
        )
    }
}

/// Pipeline run finished with every job successful.
///
/// # Log Level
/// `info!` - Important operational event
pub struct PipelineCompleted {
    pub pipeline_id: PipelineId,
    pub duration: Duration,
}

impl Display for PipelineCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} completed in {:?}", self.pipeline_id, self.duration)
    }
}

impl StructuredLog for PipelineCompleted {
    fn log(&self) {
        tracing::info!(
            pipeline_id = %self.pipeline_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("pipeline_completed", span_name = name, pipeline_id = %self.pipeline_id)
    }
}

/// Pipeline run stopped on a fatal error.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct PipelineAborted<'a> {
    pub pipeline_id: PipelineId,
    pub error: &'a ExecutionError,
    pub duration: Duration,
}

impl Display for PipelineAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} aborted after {:?}: {}",
            self.pipeline_id, self.duration, self.error
        )
    }
}

impl StructuredLog for PipelineAborted<'_> {
    fn log(&self) {
        tracing::error!(
            pipeline_id = %self.pipeline_id,
            job_id = %self.error.job_id,
            error = %self.error.error,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "pipeline_aborted",
            span_name = name,
            pipeline_id = %self.pipeline_id,
            job_id = %self.error.job_id,
        )
    }
}
