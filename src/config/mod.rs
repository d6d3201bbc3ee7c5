// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod builder;
mod dependency_graph;
mod job_id;
mod loader;
mod registry;
mod template;

pub mod consts;

pub use builder::PipelineBuilder;
pub use dependency_graph::DependencyGraph;
pub use job_id::JobId;
pub use loader::{
    load_and_validate_config, load_config, load_dataset, Config, ExecutorOptions,
};
pub use registry::JobRegistry;
pub use template::JobTemplate;
