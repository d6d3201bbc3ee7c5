// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::JobError;
use crate::jobs::{PromoEntry, SKU_VALID};
use crate::traits::{RowContext, RowJob, RowResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// SKU 1 is the upload template's placeholder.
const PLACEHOLDER_SKU: i64 = 1;

/// `true` when the row carries a real SKU.
#[derive(Debug, Clone)]
pub struct SkuValid;

#[async_trait]
impl RowJob<PromoEntry> for SkuValid {
    async fn check_row(&mut self, ctx: RowContext<'_, PromoEntry>) -> RowResult {
        let valid = matches!(ctx.row.sku, Some(sku) if sku != PLACEHOLDER_SKU);
        if !valid {
            ctx.notes.note(ctx.row.line, Some("sku"), "empty SKU");
        }
        Ok(Value::Bool(valid))
    }
}

/// `true` when a valid SKU is in the catalog. Rows without a valid SKU are skipped.
#[derive(Debug, Clone)]
pub struct SkuInCatalog {
    catalog: Arc<BTreeSet<i64>>,
}

impl SkuInCatalog {
    pub fn new(catalog: Arc<BTreeSet<i64>>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RowJob<PromoEntry> for SkuInCatalog {
    async fn check_row(&mut self, ctx: RowContext<'_, PromoEntry>) -> RowResult {
        match ctx.inputs.require(SKU_VALID)? {
            Err(_) => return Err(JobError::skipped("SKU could not be checked")),
            Ok(Value::Bool(true)) => {}
            Ok(_) => return Err(JobError::skipped("no valid SKU")),
        }

        let listed = ctx
            .row
            .sku
            .is_some_and(|sku| self.catalog.contains(&sku));
        if !listed {
            ctx.notes
                .note(ctx.row.line, Some("sku"), "SKU is not in the catalog");
        }
        Ok(Value::Bool(listed))
    }
}
