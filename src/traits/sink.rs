// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Somewhere for job logic to leave human-readable notes about rows.
///
/// The engine never reads these back; it only hands a sink to every job
/// invocation. `row` is whatever position the job uses to identify the row
/// (usually the record's own line number, since mutating jobs may reorder).
pub trait AnnotationSink: Send + Sync {
    fn note(&self, row: usize, column: Option<&str>, message: &str);
}
