//! Concurrent segment extraction and ordered splicing.

mod executor;
mod scheduler;

pub use executor::{
    check_ranges_against_source, validate_config, ExtractOptions, Pipeline, PipelineConfig,
    PipelineState, StateCallback,
};
pub use scheduler::{JobScheduler, OrderedSegmentList, PendingSegments, SegmentJob, SegmentResult};
