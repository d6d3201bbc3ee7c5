// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::JobId;
use crate::engine::instance::{InstanceBody, JobInstance, SameBatch, StreamingBody, StreamingLogic};
use crate::engine::BroadcastStream;
use crate::traits::{BatchJob, BatchKeyed, Granularity, JobKind, MutatingJob, Record, RowJob};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

enum Prototype<R> {
    Mutating(Factory<Box<dyn MutatingJob<R>>>),
    Row(Factory<Box<dyn RowJob<R>>>),
    Batch(Factory<Box<dyn BatchJob<R>>>, SameBatch<R>),
}

/// A registered job definition.
///
/// The template holds a prototype of the job logic; each pipeline build calls
/// [`JobTemplate::instantiate`] to get a fresh clone with its own state and
/// its own output stream.
pub struct JobTemplate<R> {
    id: JobId,
    dependencies: Vec<JobId>,
    prototype: Prototype<R>,
}

fn collect_ids<I>(ids: I) -> Vec<JobId>
where
    I: IntoIterator,
    I::Item: Into<JobId>,
{
    ids.into_iter().map(Into::into).collect()
}

impl<R: Record> JobTemplate<R> {
    /// A job that rewrites the dataset before any streaming job runs.
    pub fn mutating<I, J>(id: impl Into<JobId>, dependencies: I, prototype: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<JobId>,
        J: MutatingJob<R> + Clone + Sync + 'static,
    {
        Self {
            id: id.into(),
            dependencies: collect_ids(dependencies),
            prototype: Prototype::Mutating(Arc::new(move || {
                Box::new(prototype.clone()) as Box<dyn MutatingJob<R>>
            })),
        }
    }

    /// A streaming job producing one result per row.
    pub fn row<I, J>(id: impl Into<JobId>, dependencies: I, prototype: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<JobId>,
        J: RowJob<R> + Clone + Sync + 'static,
    {
        Self {
            id: id.into(),
            dependencies: collect_ids(dependencies),
            prototype: Prototype::Row(Arc::new(move || {
                Box::new(prototype.clone()) as Box<dyn RowJob<R>>
            })),
        }
    }

    /// A streaming job producing one result per run of rows sharing a batch key.
    pub fn batch<I, J>(id: impl Into<JobId>, dependencies: I, prototype: J) -> Self
    where
        R: BatchKeyed,
        I: IntoIterator,
        I::Item: Into<JobId>,
        J: BatchJob<R> + Clone + Sync + 'static,
    {
        let same_batch: SameBatch<R> = Arc::new(|a: &R, b: &R| a.batch_key() == b.batch_key());
        Self {
            id: id.into(),
            dependencies: collect_ids(dependencies),
            prototype: Prototype::Batch(
                Arc::new(move || Box::new(prototype.clone()) as Box<dyn BatchJob<R>>),
                same_batch,
            ),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn dependencies(&self) -> &[JobId] {
        &self.dependencies
    }

    pub fn kind(&self) -> JobKind {
        match &self.prototype {
            Prototype::Mutating(_) => JobKind::Mutating,
            Prototype::Row(_) => JobKind::Streaming(Granularity::Row),
            Prototype::Batch(..) => JobKind::Streaming(Granularity::Batch),
        }
    }

    /// Clone the prototype into a run-bound instance with no subscriptions yet.
    pub fn instantiate(&self, stream_capacity: usize) -> JobInstance<R> {
        let body = match &self.prototype {
            Prototype::Mutating(factory) => InstanceBody::Mutating(factory()),
            Prototype::Row(factory) => InstanceBody::Streaming(StreamingBody::new(
                StreamingLogic::Row(factory()),
                BroadcastStream::new(self.id.clone(), stream_capacity),
            )),
            Prototype::Batch(factory, same_batch) => InstanceBody::Streaming(StreamingBody::new(
                StreamingLogic::Batch {
                    logic: factory(),
                    same_batch: same_batch.clone(),
                },
                BroadcastStream::new(self.id.clone(), stream_capacity),
            )),
        };
        JobInstance::new(self.id.clone(), self.dependencies.clone(), body)
    }
}

impl<R> Debug for JobTemplate<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobTemplate")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}
