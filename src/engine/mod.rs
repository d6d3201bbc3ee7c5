// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod broadcast;
pub(crate) mod executor;
pub mod instance;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod scope;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcast::{BroadcastStream, Subscription};
pub use instance::JobInstance;
pub use pipeline::{Pipeline, PipelineId};
pub use platform::Platform;
pub use progress::{JobProgress, PipelineProgress, ProgressHandle};
pub use scope::RunScope;
