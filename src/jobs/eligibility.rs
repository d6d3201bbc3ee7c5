// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::jobs::{PromoEntry, PROMO_DATES, SKU_VALID};
use crate::traits::{RowContext, RowJob, RowResult};
use async_trait::async_trait;
use serde_json::Value;

/// `true` when the row has both a valid SKU and a valid date range.
///
/// A failed dependency result is passed on as this job's own result.
#[derive(Debug, Clone)]
pub struct Eligibility;

#[async_trait]
impl RowJob<PromoEntry> for Eligibility {
    async fn check_row(&mut self, ctx: RowContext<'_, PromoEntry>) -> RowResult {
        let sku_valid = ctx.inputs.require(SKU_VALID)?.clone()?;
        let dates_valid = ctx.inputs.require(PROMO_DATES)?.clone()?;

        let eligible = sku_valid == Value::Bool(true) && dates_valid == Value::Bool(true);
        if eligible {
            ctx.notes.note(ctx.row.line, None, "eligible for promo");
        }
        Ok(Value::Bool(eligible))
    }
}
