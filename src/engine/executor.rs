// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives a single streaming job over the dataset.
//!
//! Row mode produces one result per row, batch mode one result per maximal
//! run of rows with equal batch keys. In both modes a fatal result stops the
//! job before anything is emitted for that row or batch; a skipped row is
//! logged and passed on.

use crate::config::JobId;
use crate::engine::instance::{SameBatch, WiredInput};
use crate::engine::{BroadcastStream, RunScope};
use crate::errors::JobError;
use crate::observability::messages::job::RowSkipped;
use crate::observability::messages::StructuredLog;
use crate::traits::{
    AnnotationSink, BatchContext, BatchJob, Granularity, Inputs, Record, RowContext, RowJob,
    RowResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Everything an executor needs besides the job logic itself.
pub(crate) struct Drive<'a, R> {
    pub job_id: &'a JobId,
    pub scope: &'a RunScope,
    pub rows: &'a [R],
    pub inputs: &'a mut [WiredInput],
    pub output: &'a BroadcastStream<RowResult>,
    pub progress: &'a AtomicUsize,
    pub notes: &'a dyn AnnotationSink,
}

impl<R> Drive<'_, R> {
    /// Pull this invocation's items from every subscription.
    /// Row-grained producers give one item per row, batch-grained ones one in total.
    async fn pull(&mut self, rows: usize) -> Result<Inputs, JobError> {
        let mut inputs = Inputs::new();
        for input in self.inputs.iter_mut() {
            let count = match input.granularity {
                Granularity::Row => rows,
                Granularity::Batch => 1,
            };
            for _ in 0..count {
                let item = input.subscription.recv(self.scope).await?;
                inputs.push(input.subscription.source().clone(), item);
            }
        }
        Ok(inputs)
    }

    async fn settle(&self, position: usize, result: RowResult) -> Result<(), JobError> {
        if let Err(error) = &result {
            if error.is_fatal() {
                return Err(error.clone());
            }
            RowSkipped {
                job_id: self.job_id,
                position,
                error,
            }
            .log();
        }
        self.output.emit(self.scope, result).await
    }
}

pub(crate) async fn run_by_row<R: Record>(
    logic: &mut dyn RowJob<R>,
    mut drive: Drive<'_, R>,
) -> Result<(), JobError> {
    let rows = drive.rows;
    for (index, row) in rows.iter().enumerate() {
        drive.scope.check()?;
        let inputs = drive.pull(1).await?;

        let result = logic
            .check_row(RowContext {
                scope: drive.scope,
                index,
                row,
                inputs: &inputs,
                notes: drive.notes,
            })
            .await;

        drive.settle(index, result).await?;
        drive.progress.store(index + 1, Ordering::Release);
    }
    Ok(())
}

pub(crate) async fn run_by_batch<R: Record>(
    logic: &mut dyn BatchJob<R>,
    same_batch: &SameBatch<R>,
    mut drive: Drive<'_, R>,
) -> Result<(), JobError> {
    let rows = drive.rows;
    let mut start = 0;
    while start < rows.len() {
        drive.scope.check()?;
        let first = &rows[start];
        let end = rows[start..]
            .iter()
            .position(|row| !same_batch(first, row))
            .map_or(rows.len(), |offset| start + offset);

        let inputs = drive.pull(end - start).await?;
        let result = logic
            .check_batch(BatchContext {
                scope: drive.scope,
                range: start..end,
                rows: &rows[start..end],
                inputs: &inputs,
                notes: drive.notes,
            })
            .await;

        drive.settle(start, result).await?;
        drive.progress.store(end, Ordering::Release);
        start = end;
    }
    Ok(())
}
