pub mod job;
pub mod sink;

pub use job::{
    BatchContext, BatchJob, BatchKeyed, Granularity, Inputs, JobKind, MutatingJob, Record,
    RowContext, RowJob, RowResult,
};
pub use sink::AnnotationSink;
