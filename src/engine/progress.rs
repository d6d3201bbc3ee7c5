// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::JobId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Read side of a pipeline's progress counters. Cheap to clone and safe to
/// poll from any task while the run is in flight.
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    total_rows: Arc<AtomicUsize>,
    jobs: Arc<Vec<(JobId, Arc<AtomicUsize>)>>,
}

impl ProgressHandle {
    pub(crate) fn new(jobs: Vec<(JobId, Arc<AtomicUsize>)>) -> Self {
        Self {
            total_rows: Arc::new(AtomicUsize::new(0)),
            jobs: Arc::new(jobs),
        }
    }

    pub(crate) fn set_total_rows(&self, total: usize) {
        self.total_rows.store(total, Ordering::Release);
    }

    /// Fraction of rows each job has processed so far.
    pub fn snapshot(&self) -> PipelineProgress {
        let total = self.total_rows.load(Ordering::Acquire);
        let jobs = self
            .jobs
            .iter()
            .map(|(id, processed)| {
                let processed = processed.load(Ordering::Acquire);
                (id.clone(), JobProgress { processed, total })
            })
            .collect();
        PipelineProgress { jobs }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub processed: usize,
    pub total: usize,
}

impl JobProgress {
    /// `processed / total`; an empty dataset reports 0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineProgress {
    pub jobs: BTreeMap<JobId, JobProgress>,
}

impl PipelineProgress {
    pub fn fraction(&self, job: &str) -> Option<f64> {
        self.jobs.get(job).map(JobProgress::fraction)
    }

    /// Progress of the slowest job, i.e. how far the pipeline as a whole is.
    pub fn overall(&self) -> f64 {
        self.jobs
            .values()
            .map(JobProgress::fraction)
            .fold(None, |slowest: Option<f64>, f| Some(slowest.map_or(f, |s| s.min(f))))
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reports_fractions() {
        let x = Arc::new(AtomicUsize::new(0));
        let y = Arc::new(AtomicUsize::new(0));
        let handle = ProgressHandle::new(vec![("x".into(), x.clone()), ("y".into(), y.clone())]);
        assert_eq!(handle.snapshot().fraction("x"), Some(0.0));

        handle.set_total_rows(4);
        x.store(4, Ordering::Release);
        y.store(1, Ordering::Release);

        let progress = handle.snapshot();
        assert_eq!(progress.fraction("x"), Some(1.0));
        assert_eq!(progress.fraction("y"), Some(0.25));
        assert_eq!(progress.fraction("z"), None);
        assert_eq!(progress.overall(), 0.25);
    }
}
