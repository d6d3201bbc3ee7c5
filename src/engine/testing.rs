// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Small jobs over `u32` rows used by the engine tests.

use crate::engine::{RunScope, Subscription};
use crate::errors::JobError;
use crate::traits::{
    AnnotationSink, BatchContext, BatchJob, BatchKeyed, Inputs, MutatingJob, RowContext, RowJob,
    RowResult,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Batches are runs of rows sharing a tens digit.
impl BatchKeyed for u32 {
    type Key = u32;

    fn batch_key(&self) -> u32 {
        self / 10
    }
}

/// Drain a subscription until its producer closes.
pub async fn collect(subscription: &mut Subscription<RowResult>, scope: &RunScope) -> Vec<RowResult> {
    let mut seen = Vec::new();
    while let Ok(item) = subscription.recv(scope).await {
        seen.push(item);
    }
    seen
}

/// Emits its first upstream item, or the row itself when it has no dependencies.
#[derive(Clone)]
pub struct Echo;

#[async_trait]
impl RowJob<u32> for Echo {
    async fn check_row(&mut self, ctx: RowContext<'_, u32>) -> RowResult {
        match first_input(ctx.inputs) {
            Some(item) => item,
            None => Ok(json!(ctx.row)),
        }
    }
}

fn first_input(inputs: &Inputs) -> Option<RowResult> {
    inputs
        .iter()
        .next()
        .and_then(|(_, items)| items.first().cloned())
}

/// Fails at one row, fatally or not.
#[derive(Clone)]
pub struct FailAt {
    index: usize,
    fatal: bool,
}

impl FailAt {
    pub fn fatal(index: usize) -> Self {
        Self { index, fatal: true }
    }

    pub fn skipped(index: usize) -> Self {
        Self {
            index,
            fatal: false,
        }
    }
}

#[async_trait]
impl RowJob<u32> for FailAt {
    async fn check_row(&mut self, ctx: RowContext<'_, u32>) -> RowResult {
        match (ctx.index == self.index, self.fatal) {
            (true, true) => Err(JobError::fatal(format!("row {} is unreadable", ctx.index))),
            (true, false) => Err(JobError::skipped(format!("row {} left blank", ctx.index))),
            _ => Ok(json!(ctx.row)),
        }
    }
}

/// Panics at one row.
#[derive(Clone)]
pub struct PanicAt(pub usize);

#[async_trait]
impl RowJob<u32> for PanicAt {
    async fn check_row(&mut self, ctx: RowContext<'_, u32>) -> RowResult {
        if ctx.index == self.0 {
            panic!("row {} blew up", ctx.index);
        }
        Ok(json!(ctx.row))
    }
}

/// Sleeps before every row.
#[derive(Clone)]
pub struct Slow(pub Duration);

#[async_trait]
impl RowJob<u32> for Slow {
    async fn check_row(&mut self, ctx: RowContext<'_, u32>) -> RowResult {
        tokio::time::sleep(self.0).await;
        Ok(json!(ctx.row))
    }
}

/// Records every upstream item it is handed. Clones share the log.
#[derive(Clone, Default)]
pub struct Recorder {
    pub seen: Arc<Mutex<Vec<RowResult>>>,
}

impl Recorder {
    pub fn seen(&self) -> Vec<RowResult> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RowJob<u32> for Recorder {
    async fn check_row(&mut self, ctx: RowContext<'_, u32>) -> RowResult {
        if let Some(item) = first_input(ctx.inputs) {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(item);
            }
        }
        ctx.notes.note(ctx.index, None, "recorded");
        Ok(Value::Null)
    }
}

/// Describes each batch: where it starts, how many rows, how many upstream items.
#[derive(Clone)]
pub struct PerSku;

#[async_trait]
impl BatchJob<u32> for PerSku {
    async fn check_batch(&mut self, ctx: BatchContext<'_, u32>) -> RowResult {
        let inputs: usize = ctx.inputs.iter().map(|(_, items)| items.len()).sum();
        Ok(json!({
            "start": ctx.range.start,
            "rows": ctx.rows.len(),
            "inputs": inputs,
        }))
    }
}

#[derive(Clone)]
pub struct SortRows;

impl MutatingJob<u32> for SortRows {
    fn apply(
        &mut self,
        scope: &RunScope,
        rows: &mut Vec<u32>,
        notes: &dyn AnnotationSink,
    ) -> Result<(), JobError> {
        scope.check()?;
        rows.sort_unstable();
        notes.note(0, None, "sorted");
        Ok(())
    }
}

#[derive(Clone)]
pub struct BrokenMutation {
    pub fatal: bool,
}

impl MutatingJob<u32> for BrokenMutation {
    fn apply(
        &mut self,
        _scope: &RunScope,
        _rows: &mut Vec<u32>,
        _notes: &dyn AnnotationSink,
    ) -> Result<(), JobError> {
        if self.fatal {
            Err(JobError::fatal("sheet is locked"))
        } else {
            Err(JobError::skipped("nothing to reorder"))
        }
    }
}
