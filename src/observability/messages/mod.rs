// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! * `engine` - pipeline run lifecycle and scheduling
//! * `job` - job lifecycle and row outcomes
//! * `validation` - registry and pipeline construction

use tracing::Span;

pub mod engine;
pub mod job;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its level with its fields attached.
    fn log(&self);

    /// A span carrying the message's fields, for work done on its behalf.
    fn span(&self, name: &str) -> Span;
}
