//! Ordered concatenation of extracted segments with ffmpeg's concat demuxer.
//!
//! [`ConcatPlanner`] writes the manifest and derives the invocation,
//! [`ConcatExecutor`] runs it. The manifest file is owned by the
//! [`ConcatManifest`] value and removed when it drops, so it is gone after
//! success, failure, cancellation and panics alike.

use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{OutputSink, ToolCommand};
use crate::{Error, Result};

/// File name of the manifest inside the segment directory.
pub const MANIFEST_FILE_NAME: &str = "concat.txt";

/// ffmpeg arguments (without the program name) that concatenate the files
/// listed in `manifest` into `output` without re-encoding.
///
/// The order is significant: overwrite, concat demuxer input, stream copy,
/// regenerated presentation timestamps, output.
pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        "concat".into(),
        "-i".into(),
        manifest.to_string_lossy().to_string(),
        "-c".into(),
        "copy".into(),
        "-fflags".into(),
        "+genpts".into(),
        output.to_string_lossy().to_string(),
    ]
}

/// One manifest line for a segment file name.
fn manifest_entry(file_name: &str) -> String {
    // Inside single quotes the concat demuxer only needs `'` escaped.
    format!("file '{}'", file_name.replace('\'', r"'\''"))
}

/// The on-disk manifest for a single concatenation run.
#[derive(Debug)]
pub struct ConcatManifest {
    path: PathBuf,
    entries: Vec<String>,
    output: PathBuf,
}

impl ConcatManifest {
    /// Location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Segment file names, in manifest order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Where the concatenated file will be written.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Tool arguments for this manifest; see [`concat_args`].
    pub fn args(&self) -> Vec<String> {
        concat_args(&self.path, &self.output)
    }

    /// Full command line, tool first.
    pub fn command_line(&self, tool: &Path) -> Vec<String> {
        std::iter::once(tool.to_string_lossy().to_string())
            .chain(self.args())
            .collect()
    }
}

impl Drop for ConcatManifest {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("removed manifest {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("failed to remove manifest {}: {e}", self.path.display()),
        }
    }
}

/// Builds the concat manifest from an ordered list of segment files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatPlanner;

impl ConcatPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Write `concat.txt` next to the segments, one `file '<name>'` line per
    /// segment in the order given.
    ///
    /// All segments must live in the same directory. An existing manifest
    /// in that directory is an error; manifests are never reused.
    pub fn plan(&self, segments: &[PathBuf], output: &Path) -> Result<ConcatManifest> {
        let first = segments
            .first()
            .ok_or_else(|| Error::InvalidInput("no segments to concatenate".to_string()))?;
        let dir = first.parent().unwrap_or_else(|| Path::new(""));

        let mut entries = Vec::with_capacity(segments.len());
        for segment in segments {
            if segment.parent().unwrap_or_else(|| Path::new("")) != dir {
                return Err(Error::InvalidInput(format!(
                    "segment {} is not in {}",
                    segment.display(),
                    dir.display()
                )));
            }
            let name = segment
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "segment path has no UTF-8 file name: {}",
                        segment.display()
                    ))
                })?;
            entries.push(name.to_string());
        }

        let path = dir.join(MANIFEST_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        // From here on the guard owns the file, so a failed write removes it.
        let manifest = ConcatManifest {
            path,
            entries,
            output: output.to_path_buf(),
        };

        let mut writer = BufWriter::new(file);
        for name in &manifest.entries {
            writeln!(writer, "{}", manifest_entry(name))?;
        }
        writer.flush()?;

        tracing::debug!(
            "wrote manifest {} with {} entries",
            manifest.path.display(),
            manifest.entries.len()
        );
        Ok(manifest)
    }
}

/// Runs the concat invocation for a planned manifest.
#[derive(Debug, Clone)]
pub struct ConcatExecutor {
    ffmpeg: PathBuf,
    timeout: Option<Duration>,
}

impl ConcatExecutor {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Concatenate the manifest's segments into its output path.
    ///
    /// Tool output is streamed into the sinks when given and discarded
    /// otherwise. The manifest is consumed and its file removed before this
    /// returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::ConcatenationFailed`] if the tool cannot be spawned, exits
    /// non-zero (with the tool's diagnostics), or leaves no output file.
    pub async fn execute(
        &self,
        manifest: ConcatManifest,
        stdout: Option<OutputSink<'_>>,
        stderr: Option<OutputSink<'_>>,
    ) -> Result<PathBuf> {
        let mut cmd = ToolCommand::new(&self.ffmpeg);
        cmd.args(manifest.args());
        cmd.timeout(self.timeout);

        tracing::info!(
            "concatenating {} segments into {}",
            manifest.entries().len(),
            manifest.output().display()
        );
        let result = cmd.execute_streaming(stdout, stderr).await;

        let output = manifest.output().to_path_buf();
        drop(manifest);

        if let Err(e) = result {
            // With `-y` the tool may have truncated or half written the output.
            if !matches!(e, Error::ToolNotFound { .. }) {
                remove_partial_output(&output);
            }
            return Err(Error::concatenation_failed(e.to_string()));
        }

        if !output.exists() {
            return Err(Error::concatenation_failed(format!(
                "tool exited successfully but {} was not written",
                output.display()
            )));
        }
        Ok(output)
    }
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => tracing::debug!("removed partial output {}", output.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("failed to remove partial output {}: {e}", output.display()),
    }
}
