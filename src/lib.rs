// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;     // job ids, templates, registry, graph builder, loader
pub mod dataset;    // row storage + annotation sink
pub mod engine;     // broadcast streams, executors, scheduler
pub mod errors;     // error handling
pub mod jobs;       // demo promo-entry validations
pub mod observability;
pub mod traits;     // job logic abstractions
