// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::*;
use crate::config::{ExecutorOptions, PipelineBuilder};
use crate::dataset::{Dataset, Note};
use crate::engine::{Platform, RunScope};
use serde_json::json;
use std::time::Duration;

fn entry(line: usize, sku: Option<i64>, cluster: &str, volume: i32) -> PromoEntry {
    PromoEntry {
        line,
        promo_name: "spring".to_string(),
        sku,
        date_from: Some("2025-03-01".to_string()),
        date_to: Some("2025-03-31".to_string()),
        cluster: Some(cluster.to_string()),
        volume,
    }
}

fn settings() -> JobSettings {
    JobSettings {
        catalog_skus: [10, 20].into_iter().collect(),
        ..JobSettings::default()
    }
}

fn messages_for(notes: &[Note], job: &str) -> Vec<(usize, String)> {
    notes
        .iter()
        .filter(|note| note.job.as_ref().map(|id| id.as_str()) == Some(job))
        .map(|note| (note.row, note.message.clone()))
        .collect()
}

#[tokio::test]
async fn test_full_validation_run() {
    let registry = registry(&settings()).unwrap();
    let platform = Platform::new(
        registry,
        ExecutorOptions {
            max_concurrency: Some(2),
            timeout_seconds: Some(10),
            stream_capacity: Some(2),
        },
    );

    let mut rows = vec![
        entry(1, Some(20), "Moscow", 3),
        entry(2, Some(10), "Kazan", 9),
        entry(3, None, "Moscow", 1),
        entry(4, Some(10), "Moscow", 5),
        entry(5, Some(30), "Atlantis", 2),
        entry(6, Some(1), "Sochi", 1),
    ];
    rows[2].date_to = Some("2025-02-01".to_string());

    let pipeline = platform
        .new_pipeline(&[ELIGIBILITY, SKU_IN_CATALOG, CLUSTER_VOLUME])
        .unwrap();
    let id = pipeline.id();
    assert!(platform.progress(id).is_some());

    let dataset = Arc::new(Dataset::new(rows));
    platform.start_pipeline(pipeline, dataset.clone()).await.unwrap();
    assert!(platform.progress(id).is_none());

    let sorted: Vec<Option<i64>> = dataset.read().await.iter().map(|row| row.sku).collect();
    assert_eq!(sorted, vec![None, Some(1), Some(10), Some(10), Some(20), Some(30)]);

    let notes = dataset.annotations().notes();
    assert_eq!(
        messages_for(&notes, SKU_VALID),
        vec![(3, "empty SKU".to_string()), (6, "empty SKU".to_string())]
    );
    assert_eq!(
        messages_for(&notes, SKU_IN_CATALOG),
        vec![(5, "SKU is not in the catalog".to_string())]
    );
    assert_eq!(
        messages_for(&notes, PROMO_DATES),
        vec![(3, "promo cannot start after it ends".to_string())]
    );
    assert_eq!(
        messages_for(&notes, CLUSTER_VALID),
        vec![(5, "invalid cluster".to_string())]
    );
    assert_eq!(
        messages_for(&notes, CLUSTER_VOLUME),
        vec![(2, "Kazan has more volume than Moscow".to_string())]
    );
    let eligible: Vec<usize> = messages_for(&notes, ELIGIBILITY)
        .into_iter()
        .map(|(row, _)| row)
        .collect();
    assert_eq!(eligible, vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn test_cluster_volume_emits_one_result_per_sku() {
    let registry = registry(&settings()).unwrap();
    let pipeline = PipelineBuilder::new(&registry)
        .build(&[CLUSTER_VOLUME])
        .unwrap();
    let (mutating, streaming) = pipeline.job_ids();
    let names = |ids: Vec<&crate::config::JobId>| -> Vec<String> {
        ids.into_iter().map(|id| id.to_string()).collect()
    };
    assert_eq!(names(mutating), vec![SORT_BY_SKU]);
    assert_eq!(names(streaming), vec![CLUSTER_VALID, CLUSTER_VOLUME]);

    let mut results = pipeline.subscribe(CLUSTER_VOLUME).unwrap();
    let progress = pipeline.progress();
    let dataset = Arc::new(Dataset::new(vec![
        entry(1, Some(7), "Moscow", 1),
        entry(2, Some(5), "Kazan", 4),
        entry(3, Some(7), "Sochi", 2),
        entry(4, Some(5), "Moscow", 4),
    ]));

    let scope = RunScope::new(Some(Duration::from_secs(10)));
    let collector = {
        let scope = scope.clone();
        tokio::spawn(async move { crate::engine::testing::collect(&mut results, &scope).await })
    };
    pipeline.start(dataset, scope, 4).await.unwrap();

    let batches = collector.await.unwrap();
    assert_eq!(
        batches,
        vec![
            Ok(json!({"sku": 5, "flagged": []})),
            Ok(json!({"sku": 7, "flagged": ["Sochi"]})),
        ]
    );
    let snapshot = progress.snapshot();
    assert_eq!(snapshot.fraction(CLUSTER_VOLUME), Some(1.0));
    assert_eq!(snapshot.fraction(SORT_BY_SKU), Some(1.0));
    assert_eq!(snapshot.overall(), 1.0);
}

#[test]
fn test_settings_from_options() {
    let options: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(
        "catalog_skus: [1001, 1002]\nprivileged_clusters: [Tver]\n",
    )
    .unwrap();
    let settings = JobSettings::from_options(&options).unwrap();

    assert_eq!(settings.catalog_skus.len(), 2);
    assert!(settings.privileged_clusters.contains("Tver"));
    assert!(settings.valid_clusters.contains("Moscow"));

    let bad: HashMap<String, serde_yaml::Value> =
        serde_yaml::from_str("catalog_skus: nope\n").unwrap();
    assert!(JobSettings::from_options(&bad).is_err());
}

#[test]
fn test_registry_contains_every_job() {
    let registry = registry(&JobSettings::default()).unwrap();
    let ids: Vec<&str> = registry.ids().into_iter().map(|id| id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            CLUSTER_VALID,
            CLUSTER_VOLUME,
            ELIGIBILITY,
            PROMO_DATES,
            SKU_IN_CATALOG,
            SKU_VALID,
            SORT_BY_SKU
        ]
    );
}
