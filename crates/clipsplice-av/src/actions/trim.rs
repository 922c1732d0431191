//! Segment extraction: cut one time range out of the source into its own file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;
use crate::{Error, Result};

/// A `[start, end)` window into the source media.
///
/// Construction through [`TimeRange::new`] enforces `end > start`; the
/// fields are private so a range cannot be mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: Duration,
    end: Duration,
}

impl TimeRange {
    /// Create a range, rejecting `end <= start`.
    pub fn new(start: Duration, end: Duration) -> Result<Self> {
        if end <= start {
            return Err(Error::InvalidRange(format!(
                "end {} must be after start {}",
                format_seconds(end),
                format_seconds(start)
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    /// Length of the range; always non-zero.
    pub fn length(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.start, self.end)
    }
}

/// How the extractor cuts segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Re-encode the segment, giving frame-accurate cut points.
    #[default]
    Reencode,
    /// Stream-copy the segment; cuts snap to keyframes but nothing is re-encoded.
    Copy,
}

impl std::str::FromStr for ExtractMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reencode" | "re-encode" | "encode" => Ok(ExtractMode::Reencode),
            "copy" | "stream-copy" => Ok(ExtractMode::Copy),
            _ => Err(format!("Unknown extract mode: {}", s)),
        }
    }
}

/// Produces one trimmed segment file per call.
#[async_trait]
pub trait SegmentExtractor: Send + Sync {
    /// Write the part of `source` covered by `range` to `dest`.
    ///
    /// Implementations distinguish a missing tool ([`Error::ToolNotFound`])
    /// from a tool that ran and failed ([`Error::ToolFailed`]). A single
    /// attempt is made.
    async fn extract(&self, range: TimeRange, source: &Path, dest: &Path) -> Result<()>;
}

/// [`SegmentExtractor`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg: PathBuf,
    mode: ExtractMode,
    timeout: Option<Duration>,
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>, mode: ExtractMode) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            mode,
            timeout: None,
        }
    }

    /// Limit how long a single extraction may run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> ExtractMode {
        self.mode
    }
}

#[async_trait]
impl SegmentExtractor for FfmpegExtractor {
    async fn extract(&self, range: TimeRange, source: &Path, dest: &Path) -> Result<()> {
        let mut cmd = ToolCommand::new(&self.ffmpeg);
        cmd.args(extract_args(range, source, dest, self.mode));
        cmd.timeout(self.timeout);
        cmd.execute().await?;

        if !dest.exists() {
            return Err(Error::tool_failed(
                "ffmpeg",
                format!("exited successfully but {} was not written", dest.display()),
            ));
        }
        Ok(())
    }
}

/// ffmpeg arguments (without the program name) that cut `range` out of
/// `source` into `dest`.
pub fn extract_args(
    range: TimeRange,
    source: &Path,
    dest: &Path,
    mode: ExtractMode,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-ss".into(),
        format_seconds(range.start()),
        "-i".into(),
        source.to_string_lossy().to_string(),
        "-t".into(),
        format_seconds(range.length()),
    ];
    if mode == ExtractMode::Copy {
        args.extend(["-c".into(), "copy".into()]);
    }
    args.extend([
        "-avoid_negative_ts".into(),
        "make_zero".into(),
        dest.to_string_lossy().to_string(),
    ]);
    args
}

/// Seconds with microsecond precision, the form ffmpeg accepts for `-ss`/`-t`.
pub fn format_seconds(d: Duration) -> String {
    format!("{}.{:06}", d.as_secs(), d.subsec_micros())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start_ms: u64, end_ms: u64) -> TimeRange {
        TimeRange::new(
            Duration::from_millis(start_ms),
            Duration::from_millis(end_ms),
        )
        .unwrap()
    }

    #[test]
    fn time_range_rejects_end_not_after_start() {
        let equal = TimeRange::new(Duration::from_secs(2), Duration::from_secs(2));
        assert!(matches!(equal, Err(Error::InvalidRange(_))));

        let reversed = TimeRange::new(Duration::from_secs(5), Duration::from_secs(1));
        assert!(matches!(reversed, Err(Error::InvalidRange(_))));
    }

    #[test]
    fn time_range_length() {
        let r = range(1_500, 4_000);
        assert_eq!(r.length(), Duration::from_millis(2_500));
        assert_eq!(r.to_string(), "1.5s-4s");
    }

    #[test]
    fn format_seconds_keeps_microseconds() {
        assert_eq!(format_seconds(Duration::ZERO), "0.000000");
        assert_eq!(format_seconds(Duration::from_millis(90_250)), "90.250000");
        assert_eq!(format_seconds(Duration::from_micros(1)), "0.000001");
    }

    #[test]
    fn reencode_args() {
        let args = extract_args(
            range(5_000, 7_000),
            Path::new("/media/source.mp4"),
            Path::new("/work/segment_0001.mp4"),
            ExtractMode::Reencode,
        );
        assert_eq!(
            args,
            vec![
                "-y",
                "-hide_banner",
                "-loglevel",
                "error",
                "-ss",
                "5.000000",
                "-i",
                "/media/source.mp4",
                "-t",
                "2.000000",
                "-avoid_negative_ts",
                "make_zero",
                "/work/segment_0001.mp4",
            ]
        );
    }

    #[test]
    fn copy_mode_adds_stream_copy() {
        let args = extract_args(
            range(0, 2_000),
            Path::new("in.mkv"),
            Path::new("out.mkv"),
            ExtractMode::Copy,
        );
        let pos = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[pos + 1], "copy");
        assert_eq!(args.last().unwrap(), "out.mkv");
    }

    #[test]
    fn extract_mode_from_str() {
        assert_eq!("copy".parse::<ExtractMode>().unwrap(), ExtractMode::Copy);
        assert_eq!(
            "ReEncode".parse::<ExtractMode>().unwrap(),
            ExtractMode::Reencode
        );
        assert!("transcode".parse::<ExtractMode>().is_err());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new("nonexistent_ffmpeg_xyz", ExtractMode::Copy);
        let err = extractor
            .extract(range(0, 1_000), Path::new("in.mp4"), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn failing_tool_is_tool_failed() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new("false", ExtractMode::Reencode);
        let err = extractor
            .extract(range(0, 1_000), Path::new("in.mp4"), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn success_without_output_file_is_tool_failed() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FfmpegExtractor::new("true", ExtractMode::Reencode);
        let err = extractor
            .extract(range(0, 1_000), Path::new("in.mp4"), &dir.path().join("out.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("was not written"));
    }
}
