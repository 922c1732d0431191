//! Source media probing.

mod ffprobe;

pub use ffprobe::probe_source;

use std::time::Duration;

/// What the splicer needs to know about the source before dispatching jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Container format as reported by ffprobe (e.g. "mov,mp4,m4a,3gp,3g2,mj2").
    pub format_name: String,
    /// Total duration, when the container reports one.
    pub duration: Option<Duration>,
}
