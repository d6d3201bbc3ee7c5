// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-memory rows plus the notes jobs leave about them.

use crate::config::JobId;
use crate::traits::{AnnotationSink, Record};
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordered rows shared by every job of a run.
///
/// Mutating jobs take the write lock one at a time; streaming jobs all hold
/// read locks concurrently.
pub struct Dataset<R> {
    rows: RwLock<Vec<R>>,
    annotations: Annotations,
}

impl<R: Record> Dataset<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows: RwLock::new(rows),
            annotations: Annotations::new(),
        }
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Vec<R>> {
        self.rows.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Vec<R>> {
        self.rows.write().await
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn into_parts(self) -> (Vec<R>, Annotations) {
        (self.rows.into_inner(), self.annotations)
    }
}

/// One note about a cell or a whole row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    pub message: String,
}

/// Thread-safe collection of [`Note`]s.
#[derive(Debug, Default)]
pub struct Annotations {
    notes: Mutex<Vec<Note>>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, note: Note) {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(note);
    }

    /// All notes ordered by row; notes on the same row keep insertion order.
    pub fn notes(&self) -> Vec<Note> {
        let mut notes = self
            .notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        notes.sort_by_key(|note| note.row);
        notes
    }

    pub fn for_row(&self, row: usize) -> Vec<Note> {
        self.notes()
            .into_iter()
            .filter(|note| note.row == row)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AnnotationSink for Annotations {
    fn note(&self, row: usize, column: Option<&str>, message: &str) {
        self.push(Note {
            row,
            column: column.map(str::to_string),
            job: None,
            message: message.to_string(),
        });
    }
}

/// Tags every note with the job that wrote it.
pub(crate) struct JobNotes<'a> {
    job: &'a JobId,
    annotations: &'a Annotations,
}

impl<'a> JobNotes<'a> {
    pub fn new(job: &'a JobId, annotations: &'a Annotations) -> Self {
        Self { job, annotations }
    }
}

impl AnnotationSink for JobNotes<'_> {
    fn note(&self, row: usize, column: Option<&str>, message: &str) {
        self.annotations.push(Note {
            row,
            column: column.map(str::to_string),
            job: Some(self.job.clone()),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notes_sorted_by_row_and_tagged() {
        let annotations = Annotations::new();
        let job = JobId::from("sku-valid");
        let tagged = JobNotes::new(&job, &annotations);

        tagged.note(3, Some("sku"), "empty SKU");
        annotations.note(1, None, "manual");
        tagged.note(3, None, "second");

        let notes = annotations.notes();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].row, 1);
        assert_eq!(notes[0].job, None);
        assert_eq!(notes[1].column.as_deref(), Some("sku"));
        assert_eq!(notes[1].job, Some(job.clone()));
        assert_eq!(notes[2].message, "second");
        assert_eq!(annotations.for_row(3).len(), 2);
    }

    #[tokio::test]
    async fn test_dataset_round_trips_rows() {
        let dataset = Dataset::new(vec![3, 1, 2]);
        assert_eq!(dataset.len().await, 3);
        dataset.write().await.sort();
        assert_eq!(*dataset.read().await, vec![1, 2, 3]);

        let (rows, notes) = dataset.into_parts();
        assert_eq!(rows, vec![1, 2, 3]);
        assert!(notes.is_empty());
    }
}
