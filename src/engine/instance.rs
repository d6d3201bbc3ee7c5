// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::JobId;
use crate::engine::{BroadcastStream, Subscription};
use crate::traits::{BatchJob, Granularity, JobKind, MutatingJob, RowJob, RowResult};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Tells whether two rows belong to the same batch.
pub(crate) type SameBatch<R> = Arc<dyn Fn(&R, &R) -> bool + Send + Sync>;

/// A subscription to a streaming dependency, with the producer's granularity.
pub(crate) struct WiredInput {
    pub granularity: Granularity,
    pub subscription: Subscription<RowResult>,
}

pub(crate) enum StreamingLogic<R> {
    Row(Box<dyn RowJob<R>>),
    Batch {
        logic: Box<dyn BatchJob<R>>,
        same_batch: SameBatch<R>,
    },
}

pub(crate) struct StreamingBody<R> {
    pub logic: StreamingLogic<R>,
    pub output: Arc<BroadcastStream<RowResult>>,
    pub inputs: Vec<WiredInput>,
}

impl<R> StreamingBody<R> {
    pub fn new(logic: StreamingLogic<R>, output: BroadcastStream<RowResult>) -> Self {
        Self {
            logic,
            output: Arc::new(output),
            inputs: Vec::new(),
        }
    }
}

pub(crate) enum InstanceBody<R> {
    Mutating(Box<dyn MutatingJob<R>>),
    Streaming(StreamingBody<R>),
}

/// A job cloned from its template for exactly one pipeline run.
pub struct JobInstance<R> {
    id: JobId,
    dependencies: Vec<JobId>,
    progress: Arc<AtomicUsize>,
    pub(crate) body: InstanceBody<R>,
}

impl<R> JobInstance<R> {
    pub(crate) fn new(id: JobId, dependencies: Vec<JobId>, body: InstanceBody<R>) -> Self {
        Self {
            id,
            dependencies,
            progress: Arc::new(AtomicUsize::new(0)),
            body,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    pub fn kind(&self) -> JobKind {
        match &self.body {
            InstanceBody::Mutating(_) => JobKind::Mutating,
            InstanceBody::Streaming(body) => JobKind::Streaming(match body.logic {
                StreamingLogic::Row(_) => Granularity::Row,
                StreamingLogic::Batch { .. } => Granularity::Batch,
            }),
        }
    }

    /// Rows processed so far; written by the job's worker only.
    pub fn progress(&self) -> &Arc<AtomicUsize> {
        &self.progress
    }

    /// Subscribe to this job's output. Mutating jobs have none.
    pub(crate) fn subscribe(&self) -> Option<Subscription<RowResult>> {
        match &self.body {
            InstanceBody::Mutating(_) => None,
            InstanceBody::Streaming(body) => Some(body.output.subscribe()),
        }
    }

    pub(crate) fn attach(&mut self, granularity: Granularity, subscription: Subscription<RowResult>) {
        if let InstanceBody::Streaming(body) = &mut self.body {
            body.inputs.push(WiredInput {
                granularity,
                subscription,
            });
        }
    }

    pub(crate) fn into_parts(self) -> (JobId, Arc<AtomicUsize>, InstanceBody<R>) {
        (self.id, self.progress, self.body)
    }

    #[cfg(test)]
    pub(crate) fn shares_output_with(&self, other: &JobInstance<R>) -> bool {
        match (&self.body, &other.body) {
            (InstanceBody::Streaming(a), InstanceBody::Streaming(b)) => Arc::ptr_eq(&a.output, &b.output),
            _ => Arc::ptr_eq(&self.progress, &other.progress),
        }
    }
}
