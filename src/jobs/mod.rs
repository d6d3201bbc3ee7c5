// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Promo-entry validations shipped with the binary.
//!
//! | id               | kind     | depends on                     |
//! |------------------|----------|--------------------------------|
//! | `sku-valid`      | row      |                                |
//! | `sku-in-catalog` | row      | `sku-valid`                    |
//! | `promo-dates`    | row      |                                |
//! | `eligibility`    | row      | `promo-dates`, `sku-valid`     |
//! | `cluster-valid`  | row      |                                |
//! | `sort-by-sku`    | mutating |                                |
//! | `cluster-volume` | batch    | `sort-by-sku`, `cluster-valid` |

mod cluster;
mod dates;
mod eligibility;
mod sku;
mod sorting;

#[cfg(test)]
mod integration_tests;

pub use cluster::{ClusterValid, ClusterVolume};
pub use dates::PromoDates;
pub use eligibility::Eligibility;
pub use sku::{SkuInCatalog, SkuValid};
pub use sorting::SortBySku;

use crate::config::{JobRegistry, JobTemplate};
use crate::errors::{ConfigError, ConfigurationError};
use crate::traits::BatchKeyed;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub const SKU_VALID: &str = "sku-valid";
pub const SKU_IN_CATALOG: &str = "sku-in-catalog";
pub const PROMO_DATES: &str = "promo-dates";
pub const ELIGIBILITY: &str = "eligibility";
pub const CLUSTER_VALID: &str = "cluster-valid";
pub const SORT_BY_SKU: &str = "sort-by-sku";
pub const CLUSTER_VOLUME: &str = "cluster-volume";

/// One line of a promo upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoEntry {
    /// Line number in the source file; notes refer to rows by it.
    pub line: usize,
    pub promo_name: String,
    #[serde(default)]
    pub sku: Option<i64>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub volume: i32,
}

impl BatchKeyed for PromoEntry {
    type Key = Option<i64>;

    fn batch_key(&self) -> Option<i64> {
        self.sku
    }
}

/// Reference data the validations check against.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub catalog_skus: BTreeSet<i64>,
    pub valid_clusters: BTreeSet<String>,
    pub privileged_clusters: BTreeSet<String>,
}

impl Default for JobSettings {
    fn default() -> Self {
        let clusters = |names: &[&str]| names.iter().map(|name| name.to_string()).collect();
        Self {
            catalog_skus: BTreeSet::new(),
            valid_clusters: clusters(&[
                "Federal",
                "Moscow",
                "Saint Petersburg",
                "Tver",
                "Kazan",
                "Naberezhnye Chelny",
                "Krasnodar",
                "Volgograd",
                "Sochi",
                "Rostov",
            ]),
            privileged_clusters: clusters(&["Moscow", "Saint Petersburg"]),
        }
    }
}

impl JobSettings {
    /// Settings from the `options` section of the run configuration; missing
    /// keys keep their defaults.
    pub fn from_options(options: &HashMap<String, serde_yaml::Value>) -> Result<Self, ConfigError> {
        let mut mapping = serde_yaml::Mapping::new();
        for (key, value) in options {
            mapping.insert(serde_yaml::Value::String(key.clone()), value.clone());
        }
        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|err| {
            ConfigError::Invalid {
                message: format!("job options: {}", err),
            }
        })
    }
}

/// Registry holding every shipped validation.
pub fn registry(settings: &JobSettings) -> Result<JobRegistry<PromoEntry>, ConfigurationError> {
    let mut registry = JobRegistry::new();
    let none: [&str; 0] = [];

    registry.register(JobTemplate::row(SKU_VALID, none, SkuValid))?;
    registry.register(JobTemplate::row(
        SKU_IN_CATALOG,
        [SKU_VALID],
        SkuInCatalog::new(Arc::new(settings.catalog_skus.clone())),
    ))?;
    registry.register(JobTemplate::row(PROMO_DATES, none, PromoDates))?;
    registry.register(JobTemplate::row(
        ELIGIBILITY,
        [PROMO_DATES, SKU_VALID],
        Eligibility,
    ))?;
    registry.register(JobTemplate::row(
        CLUSTER_VALID,
        none,
        ClusterValid::new(Arc::new(settings.valid_clusters.clone())),
    ))?;
    registry.register(JobTemplate::mutating(SORT_BY_SKU, none, SortBySku))?;
    registry.register(JobTemplate::batch(
        CLUSTER_VOLUME,
        [SORT_BY_SKU, CLUSTER_VALID],
        ClusterVolume::new(Arc::new(settings.privileged_clusters.clone())),
    ))?;

    Ok(registry)
}
