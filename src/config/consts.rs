/// Overall deadline for one pipeline run when the configuration gives none (1 minute)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Per-subscriber queue depth of a broadcast stream
pub const DEFAULT_STREAM_CAPACITY: usize = 4;
/// Longest overall deadline a configuration may ask for (30 days)
pub const MAX_TIMEOUT_SECS: u64 = 30 * 24 * 60 * 60;
/// Worker slots when neither configuration nor the OS says otherwise
pub const FALLBACK_CONCURRENCY: usize = 4;
