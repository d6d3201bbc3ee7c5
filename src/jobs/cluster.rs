// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::JobError;
use crate::jobs::{PromoEntry, CLUSTER_VALID};
use crate::traits::{BatchContext, BatchJob, RowContext, RowJob, RowResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Emits the row's cluster name when it is a known cluster, skips it otherwise.
#[derive(Debug, Clone)]
pub struct ClusterValid {
    clusters: Arc<BTreeSet<String>>,
}

impl ClusterValid {
    pub fn new(clusters: Arc<BTreeSet<String>>) -> Self {
        Self { clusters }
    }
}

#[async_trait]
impl RowJob<PromoEntry> for ClusterValid {
    async fn check_row(&mut self, ctx: RowContext<'_, PromoEntry>) -> RowResult {
        match ctx.row.cluster.as_deref().map(str::trim) {
            Some(cluster) if self.clusters.contains(cluster) => Ok(Value::String(cluster.to_string())),
            _ => {
                ctx.notes.note(ctx.row.line, Some("cluster"), "invalid cluster");
                Err(JobError::skipped("invalid cluster"))
            }
        }
    }
}

/// Per SKU, flags every ordinary cluster whose total volume exceeds that of
/// a privileged cluster.
///
/// Emits `{"sku": .., "flagged": [..]}` per batch.
#[derive(Debug, Clone)]
pub struct ClusterVolume {
    privileged: Arc<BTreeSet<String>>,
}

impl ClusterVolume {
    pub fn new(privileged: Arc<BTreeSet<String>>) -> Self {
        Self { privileged }
    }
}

#[async_trait]
impl BatchJob<PromoEntry> for ClusterVolume {
    async fn check_batch(&mut self, ctx: BatchContext<'_, PromoEntry>) -> RowResult {
        let clusters = ctx.inputs.all(CLUSTER_VALID);
        if clusters.len() != ctx.rows.len() {
            return Err(JobError::fatal(format!(
                "expected {} cluster results, got {}",
                ctx.rows.len(),
                clusters.len()
            )));
        }

        let mut volumes: BTreeMap<&str, i64> = BTreeMap::new();
        for (row, cluster) in ctx.rows.iter().zip(clusters) {
            if let Ok(Value::String(cluster)) = cluster {
                *volumes.entry(cluster.as_str()).or_default() += i64::from(row.volume);
            }
        }

        let mut flagged = Vec::new();
        for (cluster, volume) in &volumes {
            if self.privileged.contains(*cluster) {
                continue;
            }
            let outranked: Vec<&str> = self
                .privileged
                .iter()
                .filter_map(|p| volumes.get(p.as_str()).map(|pv| (p.as_str(), *pv)))
                .filter(|(_, privileged_volume)| volume > privileged_volume)
                .map(|(p, _)| p)
                .collect();
            if outranked.is_empty() {
                continue;
            }

            let message = format!("{} has more volume than {}", cluster, outranked.join(", "));
            for row in ctx.rows {
                if row.cluster.as_deref().map(str::trim) == Some(*cluster) {
                    ctx.notes.note(row.line, Some("volume"), &message);
                }
            }
            flagged.push(cluster.to_string());
        }

        Ok(json!({
            "sku": ctx.rows.first().and_then(|row| row.sku),
            "flagged": flagged,
        }))
    }
}
