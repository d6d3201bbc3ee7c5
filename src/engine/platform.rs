// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{ExecutorOptions, JobId, JobRegistry, JobTemplate, PipelineBuilder};
use crate::dataset::Dataset;
use crate::engine::{Pipeline, PipelineId, PipelineProgress, ProgressHandle, RunScope};
use crate::errors::{ConfigurationError, ExecutionError};
use crate::observability::messages::engine::PipelineScheduled;
use crate::observability::messages::StructuredLog;
use crate::traits::Record;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

/// Owns the job registry and the run limits, and keeps track of the
/// pipelines it has built so their progress can be queried while they run.
pub struct Platform<R> {
    registry: JobRegistry<R>,
    options: ExecutorOptions,
    running: RunningTable,
    shutdown: CancellationToken,
}

impl<R: Record> Platform<R> {
    pub fn new(registry: JobRegistry<R>, options: ExecutorOptions) -> Self {
        Self {
            registry,
            options,
            running: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &JobRegistry<R> {
        &self.registry
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn add_job(&mut self, template: JobTemplate<R>) -> Result<(), ConfigurationError> {
        self.registry.register(template)
    }

    /// Build a pipeline for `job_ids` with the configured stream capacity.
    pub fn new_pipeline<S: AsRef<str>>(
        &self,
        job_ids: &[S],
    ) -> Result<Pipeline<R>, ConfigurationError> {
        PipelineBuilder::new(&self.registry)
            .stream_capacity(self.options.stream_capacity())
            .build(job_ids)
    }

    /// Run `pipeline` to completion under the configured timeout and
    /// concurrency limit. Its progress can be queried through
    /// [`Platform::progress`] until this returns or is dropped.
    pub async fn start_pipeline(
        &self,
        pipeline: Pipeline<R>,
        dataset: Arc<Dataset<R>>,
    ) -> Result<(), ExecutionError> {
        let id = pipeline.id();
        let _tracked = Tracked::insert(&self.running, id, pipeline.progress());
        let (mutating, streaming) = pipeline.job_ids();
        let message = PipelineScheduled {
            pipeline_id: id,
            jobs: mutating.len() + streaming.len(),
            timeout: self.options.timeout(),
        };
        message.log();
        let scope = RunScope::child_of(&self.shutdown, Some(self.options.timeout()), message.span("run"));

        pipeline
            .start(dataset, scope, self.options.max_concurrency())
            .await
    }

    pub fn progress(&self, id: PipelineId) -> Option<PipelineProgress> {
        self.running
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(ProgressHandle::snapshot)
    }

    pub fn running(&self) -> Vec<PipelineId> {
        let mut ids: Vec<PipelineId> = self
            .running
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    /// Cancel every pipeline started by this platform.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_registered(&self, id: &JobId) -> bool {
        self.registry.contains(id.as_str())
    }
}

type RunningTable = RwLock<HashMap<PipelineId, ProgressHandle>>;

/// Entry in the running table for as long as a run is in flight.
struct Tracked<'a> {
    running: &'a RunningTable,
    id: PipelineId,
}

impl<'a> Tracked<'a> {
    fn insert(running: &'a RunningTable, id: PipelineId, progress: ProgressHandle) -> Self {
        running
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, progress);
        Self { running, id }
    }
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.running
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
