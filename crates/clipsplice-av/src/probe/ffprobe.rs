//! FFprobe-based source probing.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::SourceInfo;
use crate::command::ToolCommand;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
}

/// Probe the source file with ffprobe.
///
/// A missing file, a file ffprobe cannot open, or output that does not parse
/// is reported as [`Error::SourceUnreadable`]. A missing ffprobe binary stays
/// [`Error::ToolNotFound`].
pub async fn probe_source(ffprobe: &Path, source: &Path) -> Result<SourceInfo> {
    if !source.is_file() {
        return Err(Error::source_unreadable(source, "file does not exist"));
    }

    let output = ToolCommand::new(ffprobe)
        .args(["-v", "error", "-print_format", "json", "-show_format"])
        .arg(source.to_string_lossy())
        .execute()
        .await
        .map_err(|e| match e {
            Error::ToolNotFound { .. } => e,
            other => Error::source_unreadable(source, other.to_string()),
        })?;

    let info = parse_ffprobe_output(&output.stdout)
        .map_err(|e| Error::source_unreadable(source, e.to_string()))?;

    tracing::debug!(
        "probed {}: format={} duration={:?}",
        source.display(),
        info.format_name,
        info.duration
    );
    Ok(info)
}

fn parse_ffprobe_output(json: &str) -> Result<SourceInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;

    // ffprobe prints "N/A" for streams without a known duration.
    let duration = output
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64);

    Ok(SourceInfo {
        format_name: output.format.format_name,
        duration,
    })
}
