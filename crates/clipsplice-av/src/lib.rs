//! # clipsplice-av
//!
//! External media tool plumbing for clipsplice.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find ffmpeg and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with optional
//!   timeout and output streaming for running external processes.
//! - **Workspace management** ([`Workspace`]) -- the directory segments are
//!   extracted into.
//! - **Source probing** ([`probe_source`]) -- check the source with ffprobe.
//! - **Actions** ([`actions`]) -- segment extraction ([`SegmentExtractor`],
//!   [`FfmpegExtractor`]) and ordered concatenation ([`ConcatPlanner`],
//!   [`ConcatExecutor`]).

pub mod actions;
pub mod command;
mod error;
pub mod probe;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use actions::{
    concat_args, extract_args, format_seconds, ConcatExecutor, ConcatManifest, ConcatPlanner,
    ExtractMode, FfmpegExtractor, SegmentExtractor, TimeRange, MANIFEST_FILE_NAME,
};
pub use command::{OutputSink, ToolCommand, ToolOutput};
pub use error::{Error, Result};
pub use probe::{probe_source, SourceInfo};
pub use tools::{ToolInfo, ToolRegistry, ToolsConfig, FFMPEG, FFPROBE};
pub use workspace::Workspace;
