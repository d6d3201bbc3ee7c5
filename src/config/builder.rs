// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a list of requested job identifiers into a wired [`Pipeline`].

use crate::config::consts::DEFAULT_STREAM_CAPACITY;
use crate::config::{DependencyGraph, JobId, JobRegistry};
use crate::engine::instance::JobInstance;
use crate::engine::Pipeline;
use crate::errors::ConfigurationError;
use crate::observability::messages::validation::{ConfigurationRejected, PipelineBuilt};
use crate::observability::messages::StructuredLog;
use crate::traits::{Granularity, JobKind, Record};
use std::collections::HashMap;

pub struct PipelineBuilder<'a, R> {
    registry: &'a JobRegistry<R>,
    stream_capacity: usize,
}

impl<'a, R: Record> PipelineBuilder<'a, R> {
    pub fn new(registry: &'a JobRegistry<R>) -> Self {
        Self {
            registry,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Per-subscriber queue depth of every broadcast stream in the pipeline.
    pub fn stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity.max(1);
        self
    }

    /// Resolve `requested` and everything it transitively depends on, order it,
    /// and connect streaming jobs to the streams of their streaming dependencies.
    pub fn build<S: AsRef<str>>(&self, requested: &[S]) -> Result<Pipeline<R>, ConfigurationError> {
        let result = self.try_build(requested);
        if let Err(error) = &result {
            ConfigurationRejected { error }.log();
        }
        result
    }

    fn try_build<S: AsRef<str>>(&self, requested: &[S]) -> Result<Pipeline<R>, ConfigurationError> {
        let (mut instances, resolved) = self.resolve(requested)?;

        let mut graph = DependencyGraph::new();
        for id in &resolved {
            if let Some(instance) = instances.get(id) {
                graph.add_dependency(id.clone(), instance.dependencies().to_vec());
            }
        }
        let order = graph.linearize()?;

        for id in &order {
            self.wire(id, &mut instances)?;
        }

        let ordered: Vec<JobInstance<R>> = order
            .iter()
            .filter_map(|id| instances.remove(id))
            .collect();
        let pipeline = Pipeline::assemble(ordered);
        PipelineBuilt {
            pipeline_id: pipeline.id(),
            order: &order,
        }
        .log();
        Ok(pipeline)
    }

    /// Clone every requested job and, with an explicit work stack, every
    /// dependency reachable from them. Returns the instances and the order in
    /// which they were first discovered.
    fn resolve<S: AsRef<str>>(
        &self,
        requested: &[S],
    ) -> Result<(HashMap<JobId, JobInstance<R>>, Vec<JobId>), ConfigurationError> {
        let mut instances: HashMap<JobId, JobInstance<R>> = HashMap::new();
        let mut discovered: Vec<JobId> = Vec::new();
        let mut work: Vec<JobId> = Vec::new();

        for id in requested {
            let id = id.as_ref();
            if instances.contains_key(id) {
                continue;
            }
            let instance = self.clone_job(id, None)?;
            work.push(instance.id().clone());
            discovered.push(instance.id().clone());
            instances.insert(instance.id().clone(), instance);

            while let Some(current) = work.pop() {
                let dependencies = instances
                    .get(&current)
                    .map(|instance| instance.dependencies().to_vec())
                    .unwrap_or_default();

                for dependency in dependencies {
                    if dependency == current {
                        return Err(ConfigurationError::SelfDependency { job: current });
                    }
                    if instances.contains_key(&dependency) {
                        continue;
                    }
                    let instance = self.clone_job(dependency.as_str(), Some(&current))?;
                    work.push(dependency.clone());
                    discovered.push(dependency.clone());
                    instances.insert(dependency, instance);
                }
            }
        }

        Ok((instances, discovered))
    }

    fn clone_job(
        &self,
        id: &str,
        required_by: Option<&JobId>,
    ) -> Result<JobInstance<R>, ConfigurationError> {
        self.registry
            .instantiate(id, self.stream_capacity)
            .ok_or_else(|| ConfigurationError::JobNotFound {
                job: JobId::from(id),
                required_by: required_by.cloned(),
            })
    }

    fn wire(
        &self,
        id: &JobId,
        instances: &mut HashMap<JobId, JobInstance<R>>,
    ) -> Result<(), ConfigurationError> {
        let Some(consumer) = instances.get(id) else {
            return Ok(());
        };
        let kind = consumer.kind();
        let dependencies = consumer.dependencies().to_vec();

        for dependency in dependencies {
            let Some(producer) = instances.get(&dependency) else {
                continue;
            };
            match (kind, producer.kind()) {
                (JobKind::Mutating, JobKind::Streaming(_)) => {
                    return Err(ConfigurationError::PhaseOrder {
                        job: id.clone(),
                        dependency,
                    });
                }
                (JobKind::Streaming(Granularity::Row), JobKind::Streaming(Granularity::Batch)) => {
                    return Err(ConfigurationError::CardinalityMismatch {
                        consumer: id.clone(),
                        producer: dependency,
                    });
                }
                (JobKind::Streaming(_), JobKind::Streaming(granularity)) => {
                    if let Some(subscription) = producer.subscribe() {
                        if let Some(consumer) = instances.get_mut(id) {
                            consumer.attach(granularity, subscription);
                        }
                    }
                }
                // mutating dependencies only constrain order
                (_, JobKind::Mutating) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobTemplate;
    use crate::engine::testing::{Echo, PerSku, SortRows};

    fn none() -> Vec<JobId> {
        Vec::new()
    }

    fn names(pipeline: &Pipeline<u32>) -> (Vec<&str>, Vec<&str>) {
        let (mutating, streaming) = pipeline.job_ids();
        (
            mutating.into_iter().map(JobId::as_str).collect(),
            streaming.into_iter().map(JobId::as_str).collect(),
        )
    }

    #[test]
    fn test_resolves_transitive_dependencies() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("a", none(), Echo)).unwrap();
        registry.register(JobTemplate::row("b", ["a"], Echo)).unwrap();
        registry.register(JobTemplate::row("c", ["b", "sort"], Echo)).unwrap();
        registry.register(JobTemplate::mutating("sort", none(), SortRows)).unwrap();
        registry.register(JobTemplate::row("unused", none(), Echo)).unwrap();

        let pipeline = PipelineBuilder::new(&registry).build(&["c", "c"]).unwrap();
        let (mutating, streaming) = names(&pipeline);

        assert_eq!(mutating, vec!["sort"]);
        assert_eq!(streaming, vec!["a", "b", "c"]);
        assert_eq!(pipeline.subscriber_counts(), vec![("a", 1), ("b", 1), ("c", 0)]);
    }

    #[test]
    fn test_missing_requested_job() {
        let registry: JobRegistry<u32> = JobRegistry::new();
        let err = PipelineBuilder::new(&registry).build(&["ghost"]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::JobNotFound {
                job: "ghost".into(),
                required_by: None
            }
        );
    }

    #[test]
    fn test_missing_dependency_names_parent() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("a", ["ghost"], Echo)).unwrap();
        let err = PipelineBuilder::new(&registry).build(&["a"]).unwrap_err();
        assert_eq!(err.to_string(), "job 'ghost' is not registered (required by 'a')");
    }

    #[test]
    fn test_self_dependency_detected_before_cycle_check() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("x", ["x"], Echo)).unwrap();
        let err = PipelineBuilder::new(&registry).build(&["x"]).unwrap_err();
        assert_eq!(err, ConfigurationError::SelfDependency { job: "x".into() });
    }

    #[test]
    fn test_cycle_detected() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("a", ["c"], Echo)).unwrap();
        registry.register(JobTemplate::row("b", ["a"], Echo)).unwrap();
        registry.register(JobTemplate::row("c", ["b"], Echo)).unwrap();

        let err = PipelineBuilder::new(&registry).build(&["a"]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CycleDependency {
                path: vec!["a".into(), "c".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_row_consumer_of_batch_producer_rejected() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::batch("per-sku", none(), PerSku)).unwrap();
        registry.register(JobTemplate::row("r", ["per-sku"], Echo)).unwrap();

        let err = PipelineBuilder::new(&registry).build(&["r"]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CardinalityMismatch {
                consumer: "r".into(),
                producer: "per-sku".into()
            }
        );
    }

    #[test]
    fn test_mutating_job_cannot_wait_for_streaming_job() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("r", none(), Echo)).unwrap();
        registry.register(JobTemplate::mutating("sort", ["r"], SortRows)).unwrap();

        let err = PipelineBuilder::new(&registry).build(&["sort"]).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::PhaseOrder {
                job: "sort".into(),
                dependency: "r".into()
            }
        );
    }

    #[test]
    fn test_batch_consumer_subscribes_to_row_and_batch_producers() {
        let mut registry = JobRegistry::new();
        registry.register(JobTemplate::row("r", none(), Echo)).unwrap();
        registry.register(JobTemplate::batch("b1", none(), PerSku)).unwrap();
        registry.register(JobTemplate::batch("b2", ["r", "b1"], PerSku)).unwrap();

        let pipeline = PipelineBuilder::new(&registry)
            .stream_capacity(1)
            .build(&["b2"])
            .unwrap();
        let (mutating, streaming) = names(&pipeline);
        assert!(mutating.is_empty());
        assert_eq!(streaming.last(), Some(&"b2"));
        assert_eq!(pipeline.input_granularities("b2"), vec![Granularity::Row, Granularity::Batch]);
    }
}
