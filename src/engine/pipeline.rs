// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The pipeline scheduler.
//!
//! A run has two phases. Mutating jobs go first, one at a time in dependency
//! order, each holding the dataset's write lock. Streaming jobs then run
//! concurrently on a bounded set of admission slots, each holding a read
//! lock and talking to its neighbours through broadcast streams. The first
//! fatal error trips the run scope; everything still running unwinds and
//! the run returns that error.

use crate::config::JobId;
use crate::dataset::{Dataset, JobNotes};
use crate::engine::executor::{run_by_batch, run_by_row, Drive};
use crate::engine::instance::{InstanceBody, JobInstance, StreamingBody, StreamingLogic};
use crate::engine::{ProgressHandle, RunScope, Subscription};
use crate::errors::{ExecutionError, JobError};
use crate::observability::messages::engine::{
    ConcurrencyRaised, PhaseStarted, PipelineAborted, PipelineCompleted, PipelineStarted,
};
use crate::observability::messages::job::{JobCompleted, JobFailed, JobStarted};
use crate::observability::messages::StructuredLog;
use crate::traits::{Granularity, MutatingJob, Record, RowResult};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::Instrument;

static NEXT_PIPELINE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipelineId(u64);

impl PipelineId {
    fn next() -> Self {
        Self(NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for PipelineId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipeline-{}", self.0)
    }
}

struct MutatingStage<R> {
    id: JobId,
    progress: Arc<AtomicUsize>,
    logic: Box<dyn MutatingJob<R>>,
}

struct StreamingStage<R> {
    id: JobId,
    progress: Arc<AtomicUsize>,
    body: StreamingBody<R>,
}

impl<R: Record> StreamingStage<R> {
    fn granularity(&self) -> Granularity {
        match self.body.logic {
            StreamingLogic::Row(_) => Granularity::Row,
            StreamingLogic::Batch { .. } => Granularity::Batch,
        }
    }

    async fn drive(&mut self, dataset: &Dataset<R>, scope: &RunScope) -> Result<(), JobError> {
        let rows = dataset.read().await;
        let notes = JobNotes::new(&self.id, dataset.annotations());
        let StreamingBody {
            logic,
            output,
            inputs,
        } = &mut self.body;
        let drive = Drive {
            job_id: &self.id,
            scope,
            rows: &rows,
            inputs,
            output,
            progress: &self.progress,
            notes: &notes,
        };

        match logic {
            StreamingLogic::Row(logic) => run_by_row(logic.as_mut(), drive).await,
            StreamingLogic::Batch { logic, same_batch } => {
                run_by_batch(logic.as_mut(), same_batch, drive).await
            }
        }
    }
}

/// The first fatal error of a run. A real failure wins over a bare
/// cancellation recorded before it.
#[derive(Default)]
struct FirstFailure(Mutex<Option<ExecutionError>>);

impl FirstFailure {
    fn record(&self, error: ExecutionError) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let replace = match slot.as_ref() {
            None => true,
            Some(current) => {
                current.error == JobError::Cancelled && error.error != JobError::Cancelled
            }
        };
        if replace {
            *slot = Some(error);
        }
    }

    fn take(&self) -> Option<ExecutionError> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

/// A linearized, wired set of jobs for one run over one dataset.
pub struct Pipeline<R> {
    id: PipelineId,
    mutating: Vec<MutatingStage<R>>,
    streaming: Vec<StreamingStage<R>>,
    progress: ProgressHandle,
}

impl<R> Debug for Pipeline<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn ids<'a>(ids: Vec<&'a JobId>) -> Vec<&'a str> {
            ids.into_iter().map(JobId::as_str).collect()
        }
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("mutating", &ids(self.mutating.iter().map(|stage| &stage.id).collect()))
            .field("streaming", &ids(self.streaming.iter().map(|stage| &stage.id).collect()))
            .finish()
    }
}

impl<R: Record> Pipeline<R> {
    /// Split linearized instances into the two phases, keeping their order.
    pub(crate) fn assemble(instances: Vec<JobInstance<R>>) -> Self {
        let mut mutating = Vec::new();
        let mut streaming = Vec::new();
        let mut counters = Vec::with_capacity(instances.len());

        for instance in instances {
            let (id, progress, body) = instance.into_parts();
            counters.push((id.clone(), progress.clone()));
            match body {
                InstanceBody::Mutating(logic) => mutating.push(MutatingStage {
                    id,
                    progress,
                    logic,
                }),
                InstanceBody::Streaming(body) => streaming.push(StreamingStage { id, progress, body }),
            }
        }

        Self {
            id: PipelineId::next(),
            mutating,
            streaming,
            progress: ProgressHandle::new(counters),
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn progress(&self) -> ProgressHandle {
        self.progress.clone()
    }

    /// Job identifiers of the mutating and streaming phases, in run order.
    pub fn job_ids(&self) -> (Vec<&JobId>, Vec<&JobId>) {
        (
            self.mutating.iter().map(|stage| &stage.id).collect(),
            self.streaming.iter().map(|stage| &stage.id).collect(),
        )
    }

    /// Follow a streaming job's results from outside the pipeline.
    ///
    /// The subscriber counts like any other consumer: the job waits for it
    /// whenever its queue is full, so it must be drained (or dropped) while
    /// the pipeline runs.
    pub fn subscribe(&self, job: &str) -> Option<Subscription<RowResult>> {
        self.streaming
            .iter()
            .find(|stage| stage.id.as_str() == job)
            .map(|stage| stage.body.output.subscribe())
    }

    pub fn len(&self) -> usize {
        self.mutating.len() + self.streaming.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every job over `dataset`.
    ///
    /// `max_concurrency` bounds how many streaming jobs run at once. It is
    /// raised to the size of the largest group of streaming jobs connected by
    /// subscriptions, since such a group can only make progress together.
    pub async fn start(
        self,
        dataset: Arc<Dataset<R>>,
        scope: RunScope,
        max_concurrency: usize,
    ) -> Result<(), ExecutionError> {
        let span = scope.span().clone();
        self.run(dataset, scope, max_concurrency)
            .instrument(span)
            .await
    }

    async fn run(
        self,
        dataset: Arc<Dataset<R>>,
        scope: RunScope,
        max_concurrency: usize,
    ) -> Result<(), ExecutionError> {
        let Pipeline {
            id,
            mutating,
            streaming,
            progress,
        } = self;
        let started = Instant::now();

        progress.set_total_rows(dataset.len().await);
        PipelineStarted {
            pipeline_id: id,
            mutating_jobs: mutating.len(),
            streaming_jobs: streaming.len(),
            max_concurrency,
        }
        .log();

        let mut outcome = run_mutating_phase(mutating, &dataset, &scope).await;
        if outcome.is_ok() {
            // mutating jobs may have added or dropped rows
            progress.set_total_rows(dataset.len().await);
            outcome = run_streaming_phase(streaming, &dataset, &scope, max_concurrency).await;
        }

        match &outcome {
            Ok(()) => PipelineCompleted {
                pipeline_id: id,
                duration: started.elapsed(),
            }
            .log(),
            Err(error) => PipelineAborted {
                pipeline_id: id,
                error,
                duration: started.elapsed(),
            }
            .log(),
        }
        outcome
    }

    #[cfg(test)]
    pub(crate) fn subscriber_counts(&self) -> Vec<(&str, usize)> {
        self.streaming
            .iter()
            .map(|stage| (stage.id.as_str(), stage.body.output.subscriber_count()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn input_granularities(&self, job: &str) -> Vec<Granularity> {
        self.streaming
            .iter()
            .filter(|stage| stage.id.as_str() == job)
            .flat_map(|stage| stage.body.inputs.iter().map(|input| input.granularity))
            .collect()
    }
}

async fn run_mutating_phase<R: Record>(
    stages: Vec<MutatingStage<R>>,
    dataset: &Dataset<R>,
    scope: &RunScope,
) -> Result<(), ExecutionError> {
    if stages.is_empty() {
        return Ok(());
    }
    PhaseStarted {
        phase: "mutating",
        job_count: stages.len(),
        slots: 1,
    }
    .log();

    for mut stage in stages {
        scope
            .check()
            .map_err(|reason| ExecutionError::new(stage.id.clone(), reason))?;

        let started = Instant::now();
        JobStarted {
            job_id: &stage.id,
            kind: "mutating",
        }
        .log();

        let notes = JobNotes::new(&stage.id, dataset.annotations());
        let (outcome, rows) = {
            let mut rows = dataset.write().await;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                stage.logic.apply(scope, &mut rows, &notes)
            }));
            (outcome, rows.len())
        };
        let outcome = outcome.unwrap_or_else(|payload| {
            Err(JobError::WorkerPanicked {
                message: panic_message(payload.as_ref()),
            })
        });

        match outcome {
            Ok(()) => {
                stage.progress.store(rows, Ordering::Release);
                JobCompleted {
                    job_id: &stage.id,
                    rows,
                    duration: started.elapsed(),
                }
                .log();
            }
            Err(error) if !error.is_fatal() => {
                stage.progress.store(rows, Ordering::Release);
                JobFailed {
                    job_id: &stage.id,
                    error: &error,
                    fatal: false,
                }
                .log();
            }
            Err(error) => {
                JobFailed {
                    job_id: &stage.id,
                    error: &error,
                    fatal: true,
                }
                .log();
                scope.cancel();
                return Err(ExecutionError::new(stage.id, error));
            }
        }
    }
    Ok(())
}

async fn run_streaming_phase<R: Record>(
    stages: Vec<StreamingStage<R>>,
    dataset: &Arc<Dataset<R>>,
    scope: &RunScope,
    max_concurrency: usize,
) -> Result<(), ExecutionError> {
    if stages.is_empty() {
        return Ok(());
    }

    let (stages, widest) = admission_order(stages);
    let requested = max_concurrency.clamp(1, Semaphore::MAX_PERMITS);
    let slots = if widest > requested {
        ConcurrencyRaised {
            requested,
            effective: widest,
        }
        .log();
        widest
    } else {
        requested
    };
    PhaseStarted {
        phase: "streaming",
        job_count: stages.len(),
        slots,
    }
    .log();

    let semaphore = Arc::new(Semaphore::new(slots));
    let failure = Arc::new(FirstFailure::default());
    let mut workers = JoinSet::new();
    let mut worker_jobs = HashMap::new();
    let mut pending = stages.into_iter();

    while let Some(stage) = pending.next() {
        let slot = tokio::select! {
            biased;
            reason = scope.cancelled() => {
                failure.record(ExecutionError::new(stage.id.clone(), reason));
                stage.body.output.close();
                break;
            }
            slot = semaphore.clone().acquire_owned() => match slot {
                Ok(slot) => slot,
                Err(_) => {
                    failure.record(ExecutionError::new(stage.id.clone(), JobError::fatal("admission slots closed")));
                    scope.cancel();
                    stage.body.output.close();
                    break;
                }
            },
        };

        let job_id = stage.id.clone();
        let worker = run_worker(stage, slot, dataset.clone(), scope.clone(), failure.clone());
        let handle = workers.spawn(worker.instrument(tracing::Span::current()));
        worker_jobs.insert(handle.id(), job_id);
    }
    for stage in pending {
        stage.body.output.close();
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(join_error) = joined {
            let job_id = worker_jobs
                .get(&join_error.id())
                .cloned()
                .unwrap_or_else(|| JobId::from("unknown"));
            let error = JobError::WorkerPanicked {
                message: join_error.to_string(),
            };
            JobFailed {
                job_id: &job_id,
                error: &error,
                fatal: true,
            }
            .log();
            failure.record(ExecutionError::new(job_id, error));
            scope.cancel();
        }
    }

    match failure.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// One streaming job, from admission to closing its output stream.
async fn run_worker<R: Record>(
    mut stage: StreamingStage<R>,
    _slot: OwnedSemaphorePermit,
    dataset: Arc<Dataset<R>>,
    scope: RunScope,
    failure: Arc<FirstFailure>,
) {
    let started = Instant::now();
    JobStarted {
        job_id: &stage.id,
        kind: match stage.granularity() {
            Granularity::Row => "row",
            Granularity::Batch => "batch",
        },
    }
    .log();

    let outcome = AssertUnwindSafe(stage.drive(&dataset, &scope))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(JobError::WorkerPanicked {
                message: panic_message(payload.as_ref()),
            })
        });

    match outcome {
        Ok(()) => JobCompleted {
            job_id: &stage.id,
            rows: stage.progress.load(Ordering::Acquire),
            duration: started.elapsed(),
        }
        .log(),
        Err(error) => {
            let fatal = error.is_fatal();
            JobFailed {
                job_id: &stage.id,
                error: &error,
                fatal,
            }
            .log();
            if fatal {
                // record before closing so consumers unwind as cancelled, not
                // as if the stream simply ended
                failure.record(ExecutionError::new(stage.id.clone(), error));
                scope.cancel();
            }
        }
    }

    stage.body.output.close();
}

/// Order streaming jobs so that every group of jobs connected through
/// subscriptions is admitted back to back, in run order. Also returns the size
/// of the largest group.
fn admission_order<R>(stages: Vec<StreamingStage<R>>) -> (Vec<StreamingStage<R>>, usize) {
    let position: HashMap<&JobId, usize> = stages
        .iter()
        .enumerate()
        .map(|(index, stage)| (&stage.id, index))
        .collect();

    let mut parent: Vec<usize> = (0..stages.len()).collect();
    for (index, stage) in stages.iter().enumerate() {
        for input in &stage.body.inputs {
            if let Some(&producer) = position.get(input.subscription.source()) {
                let (a, b) = (find(&mut parent, index), find(&mut parent, producer));
                parent[a.max(b)] = a.min(b);
            }
        }
    }
    drop(position);

    let roots: Vec<usize> = (0..stages.len()).map(|i| find(&mut parent, i)).collect();
    let mut sizes: HashMap<usize, usize> = HashMap::new();
    for root in &roots {
        *sizes.entry(*root).or_default() += 1;
    }
    let widest = sizes.values().copied().max().unwrap_or(0);

    // the root is the group's lowest index, so sorting by it keeps run order
    let mut keyed: Vec<(usize, usize, StreamingStage<R>)> = stages
        .into_iter()
        .enumerate()
        .map(|(index, stage)| (roots[index], index, stage))
        .collect();
    keyed.sort_by_key(|(root, index, _)| (*root, *index));
    (keyed.into_iter().map(|(_, _, stage)| stage).collect(), widest)
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
