// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::jobs::PromoEntry;
use crate::traits::{RowContext, RowJob, RowResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `true` when both promo dates parse and the promo does not end before it starts.
#[derive(Debug, Clone)]
pub struct PromoDates;

fn parse(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|value| NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok())
}

#[async_trait]
impl RowJob<PromoEntry> for PromoDates {
    async fn check_row(&mut self, ctx: RowContext<'_, PromoEntry>) -> RowResult {
        let row = ctx.row;
        let Some(from) = parse(row.date_from.as_deref()) else {
            let message = format!("invalid start date '{}'", row.date_from.as_deref().unwrap_or(""));
            ctx.notes.note(row.line, Some("date_from"), &message);
            return Ok(Value::Bool(false));
        };
        let Some(to) = parse(row.date_to.as_deref()) else {
            let message = format!("invalid end date '{}'", row.date_to.as_deref().unwrap_or(""));
            ctx.notes.note(row.line, Some("date_to"), &message);
            return Ok(Value::Bool(false));
        };
        if to < from {
            ctx.notes
                .note(row.line, None, "promo cannot start after it ends");
            return Ok(Value::Bool(false));
        }
        Ok(Value::Bool(true))
    }
}
