// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the rowcheck engine.
//!
//! Every diagnostic the crate emits goes through a message type in
//! [`messages`]. Each one implements `Display` for the human-readable line and
//! [`messages::StructuredLog`] to emit it through `tracing` with the message's
//! fields attached as structured data.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - pipeline run lifecycle and scheduling
//! * `messages::job` - individual job lifecycle and row-level outcomes
//! * `messages::validation` - registry population and pipeline construction
//!
//! # Usage
//!
//! ```rust
//! use the_rowcheck::observability::messages::job::JobStarted;
//! use the_rowcheck::observability::messages::StructuredLog;
//! use the_rowcheck::config::JobId;
//!
//! let job_id = JobId::from("sku-valid");
//! JobStarted { job_id: &job_id, kind: "row" }.log();
//! ```

pub mod messages;
