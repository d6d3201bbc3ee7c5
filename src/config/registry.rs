// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{JobId, JobTemplate};
use crate::engine::instance::JobInstance;
use crate::errors::ConfigurationError;
use crate::observability::messages::validation::JobRegistered;
use crate::observability::messages::StructuredLog;
use crate::traits::Record;
use std::collections::HashMap;

/// Job identifier → registered template.
///
/// Populated once before any pipeline is built; read-only afterwards.
pub struct JobRegistry<R> {
    templates: HashMap<JobId, JobTemplate<R>>,
}

impl<R> Default for JobRegistry<R> {
    fn default() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }
}

impl<R: Record> JobRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: JobTemplate<R>) -> Result<(), ConfigurationError> {
        if self.templates.contains_key(template.id()) {
            return Err(ConfigurationError::DuplicateJob {
                job: template.id().clone(),
            });
        }

        JobRegistered {
            job_id: template.id(),
            kind: template.kind().label(),
            dependencies: template.dependencies(),
        }
        .log();
        self.templates.insert(template.id().clone(), template);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&JobTemplate<R>> {
        self.templates.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    /// Fresh instance of the job named `id`, or `None` if nothing is registered under it.
    pub fn instantiate(&self, id: &str, stream_capacity: usize) -> Option<JobInstance<R>> {
        self.get(id)
            .map(|template| template.instantiate(stream_capacity))
    }

    /// Registered identifiers, sorted.
    pub fn ids(&self) -> Vec<&JobId> {
        let mut ids: Vec<&JobId> = self.templates.keys().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
