// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while building a pipeline from requested jobs.
//!
//! All of these surface synchronously to the caller of the build, before any
//! row is touched, and are never retried.

use crate::config::JobId;
use thiserror::Error;

/// A pipeline could not be assembled from the requested jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A requested job, or a dependency of one, is not in the registry.
    #[error(
        "job '{job}' is not registered{}",
        .required_by
            .as_ref()
            .map(|parent| format!(" (required by '{parent}')"))
            .unwrap_or_default()
    )]
    JobNotFound {
        job: JobId,
        /// The job that declared the missing dependency, `None` when the
        /// missing job was requested directly.
        required_by: Option<JobId>,
    },

    /// A job lists itself among its dependencies.
    #[error("job '{job}' depends on itself")]
    SelfDependency { job: JobId },

    /// The dependency declarations contain a cycle.
    #[error("cyclic job dependency detected: {}", render_path(.path))]
    CycleDependency {
        /// Closed walk in depends-on direction; first and last entries match.
        path: Vec<JobId>,
    },

    /// A template with the same identifier is already registered.
    #[error("job '{job}' is already registered")]
    DuplicateJob { job: JobId },

    /// A row-mode job subscribes to a batch-mode job, so it would receive
    /// fewer items than it has rows.
    #[error(
        "job '{consumer}' reads one item per row but '{producer}' emits one item per batch"
    )]
    CardinalityMismatch { consumer: JobId, producer: JobId },

    /// A mutating job depends on a streaming job. The mutating phase always
    /// finishes before any streaming job starts, so the order can't be honored.
    #[error("mutating job '{job}' cannot depend on streaming job '{dependency}'")]
    PhaseOrder { job: JobId, dependency: JobId },
}

fn render_path(path: &[JobId]) -> String {
    path.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}
