//! Media actions: trimming a segment out of the source and splicing
//! segments back together.

mod concat;
mod trim;

pub use concat::{concat_args, ConcatExecutor, ConcatManifest, ConcatPlanner, MANIFEST_FILE_NAME};
pub use trim::{
    extract_args, format_seconds, ExtractMode, FfmpegExtractor, SegmentExtractor, TimeRange,
};
