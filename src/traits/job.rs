// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The job logic abstractions.
//!
//! A job is either *mutating* (runs alone, with exclusive access to the rows,
//! before anything streams) or *streaming* (runs concurrently with the other
//! streaming jobs and emits one [`RowResult`] per row or per batch).

use crate::config::JobId;
use crate::engine::RunScope;
use crate::errors::JobError;
use crate::traits::AnnotationSink;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;

/// Verdict produced for one row (or one batch) by a streaming job.
pub type RowResult = Result<Value, JobError>;

/// Anything that can be stored in a dataset and shared across workers.
pub trait Record: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Record for T {}

/// Exposes the key that groups consecutive rows into batches.
pub trait BatchKeyed {
    type Key: PartialEq;

    fn batch_key(&self) -> Self::Key;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Row,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Mutating,
    Streaming(Granularity),
}

impl JobKind {
    pub fn is_mutating(&self) -> bool {
        matches!(self, JobKind::Mutating)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Mutating => "mutating",
            JobKind::Streaming(Granularity::Row) => "row",
            JobKind::Streaming(Granularity::Batch) => "batch",
        }
    }
}

/// Dependency items handed to one invocation of job logic.
///
/// A row-mode job sees exactly one item per streaming dependency. A batch-mode
/// job sees one item per row of the batch from row-grained dependencies and a
/// single item from batch-grained ones.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Inputs(BTreeMap<JobId, Vec<RowResult>>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// First item received from `dependency`, if it is a streaming dependency.
    pub fn one(&self, dependency: &str) -> Option<&RowResult> {
        self.0.get(dependency).and_then(|items| items.first())
    }

    /// Every item received from `dependency` for this invocation.
    pub fn all(&self, dependency: &str) -> &[RowResult] {
        self.0.get(dependency).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Like [`Inputs::one`], but a missing dependency is a fatal wiring error.
    pub fn require(&self, dependency: &str) -> Result<&RowResult, JobError> {
        self.one(dependency)
            .ok_or_else(|| JobError::fatal(format!("no input from dependency '{}'", dependency)))
    }

    /// Dependencies and their items, ordered by dependency id.
    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &[RowResult])> {
        self.0.iter().map(|(id, items)| (id, items.as_slice()))
    }

    pub fn push(&mut self, dependency: JobId, item: RowResult) {
        self.0.entry(dependency).or_default().push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything a row-mode job sees for a single row.
pub struct RowContext<'a, R> {
    pub scope: &'a RunScope,
    pub index: usize,
    pub row: &'a R,
    pub inputs: &'a Inputs,
    pub notes: &'a dyn AnnotationSink,
}

/// Everything a batch-mode job sees for one contiguous run of equal keys.
pub struct BatchContext<'a, R> {
    pub scope: &'a RunScope,
    /// Position of the batch within the dataset.
    pub range: Range<usize>,
    pub rows: &'a [R],
    pub inputs: &'a Inputs,
    pub notes: &'a dyn AnnotationSink,
}

/// Row-mode streaming job logic.
///
/// Implementations may keep state across rows; every pipeline gets its own
/// clone of the registered prototype.
#[async_trait]
pub trait RowJob<R: Record>: Send {
    async fn check_row(&mut self, ctx: RowContext<'_, R>) -> RowResult;
}

/// Batch-mode streaming job logic. Rows must already be sorted by batch key.
#[async_trait]
pub trait BatchJob<R: Record>: Send {
    async fn check_batch(&mut self, ctx: BatchContext<'_, R>) -> RowResult;
}

/// Logic that rewrites the dataset in place before streaming starts.
///
/// Only [`JobError::Skipped`] lets the run continue.
pub trait MutatingJob<R: Record>: Send {
    fn apply(
        &mut self,
        scope: &RunScope,
        rows: &mut Vec<R>,
        notes: &dyn AnnotationSink,
    ) -> Result<(), JobError>;
}
