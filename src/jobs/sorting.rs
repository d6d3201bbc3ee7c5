// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::engine::RunScope;
use crate::errors::JobError;
use crate::jobs::PromoEntry;
use crate::traits::{AnnotationSink, MutatingJob};

/// Stable sort by SKU so rows of the same SKU become one contiguous batch.
#[derive(Debug, Clone)]
pub struct SortBySku;

impl MutatingJob<PromoEntry> for SortBySku {
    fn apply(
        &mut self,
        scope: &RunScope,
        rows: &mut Vec<PromoEntry>,
        _notes: &dyn AnnotationSink,
    ) -> Result<(), JobError> {
        scope.check()?;
        rows.sort_by_key(|row| row.sku);
        Ok(())
    }
}
