use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipsplice_av::{
    probe_source, ConcatExecutor, ConcatPlanner, Error, ExtractMode, FfmpegExtractor,
    OutputSink, Result, SegmentExtractor, SourceInfo, TimeRange, ToolRegistry, FFMPEG, FFPROBE,
    MANIFEST_FILE_NAME,
};

use super::scheduler::JobScheduler;

/// Stage of a splice run, reported through [`StateCallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Dispatching,
    Collecting,
    Planning,
    Concatenating,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Dispatching => "dispatching",
            PipelineState::Collecting => "collecting",
            PipelineState::Planning => "planning",
            PipelineState::Concatenating => "concatenating",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State callback type
pub type StateCallback = Box<dyn Fn(PipelineState) + Send + Sync>;

/// Everything one run needs. Nothing is read from global state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Directory segments and the manifest are written to. Must not contain
    /// `output`.
    pub work_dir: PathBuf,
    /// Ranges in splice order.
    pub ranges: Vec<TimeRange>,
}

/// How segments are cut.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub mode: ExtractMode,
    /// Limit for each tool invocation; `None` leaves it to the tool.
    pub timeout: Option<Duration>,
}

/// Extract every range concurrently, then splice the segments in input order.
pub struct Pipeline {
    extractor: Arc<dyn SegmentExtractor>,
    ffprobe: PathBuf,
    planner: ConcatPlanner,
    executor: ConcatExecutor,
    on_state: Option<StateCallback>,
}

impl Pipeline {
    /// Build a pipeline from discovered tools.
    ///
    /// Fails with [`Error::ToolNotFound`] if ffmpeg or ffprobe is missing, so
    /// a run never starts without them.
    pub fn from_tools(tools: &ToolRegistry, options: ExtractOptions) -> Result<Self> {
        let ffmpeg = tools.require(FFMPEG)?;
        let ffprobe = tools.require(FFPROBE)?;

        let extractor =
            FfmpegExtractor::new(ffmpeg, options.mode).with_timeout(options.timeout);
        tracing::debug!(
            "segments will be cut in {:?} mode with {}",
            extractor.mode(),
            ffmpeg.display()
        );

        Ok(Self {
            extractor: Arc::new(extractor),
            ffprobe: ffprobe.to_path_buf(),
            planner: ConcatPlanner::new(),
            executor: ConcatExecutor::new(ffmpeg).with_timeout(options.timeout),
            on_state: None,
        })
    }

    /// Replace the extractor used for every segment.
    pub fn with_extractor(mut self, extractor: Arc<dyn SegmentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_state_callback(mut self, callback: StateCallback) -> Self {
        self.on_state = Some(callback);
        self
    }

    fn report_state(&self, state: PipelineState) {
        if let Some(ref cb) = self.on_state {
            cb(state);
        }
        tracing::debug!("pipeline state: {state}");
    }

    /// Run the whole splice and return the output path.
    ///
    /// Tool output from the concatenation step is streamed into the sinks
    /// when given. On failure no output is guaranteed; segment files left in
    /// `work_dir` belong to the caller.
    pub async fn run(
        &self,
        config: &PipelineConfig,
        stdout: Option<OutputSink<'_>>,
        stderr: Option<OutputSink<'_>>,
    ) -> Result<PathBuf> {
        self.report_state(PipelineState::Idle);
        let started = Instant::now();

        match self.run_stages(config, stdout, stderr).await {
            Ok(output) => {
                self.report_state(PipelineState::Done);
                tracing::info!(
                    "spliced {} segments into {} in {:.1?}",
                    config.ranges.len(),
                    output.display(),
                    started.elapsed()
                );
                Ok(output)
            }
            Err(e) => {
                self.report_state(PipelineState::Failed);
                tracing::error!("splice failed during {}: {e}", e.stage());
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        config: &PipelineConfig,
        stdout: Option<OutputSink<'_>>,
        stderr: Option<OutputSink<'_>>,
    ) -> Result<PathBuf> {
        validate_config(config)?;

        let info = probe_source(&self.ffprobe, &config.source).await?;
        check_ranges_against_source(&config.ranges, &info)?;

        self.report_state(PipelineState::Dispatching);
        tracing::info!(
            "extracting {} segments from {}",
            config.ranges.len(),
            config.source.display()
        );
        let pending = JobScheduler::new(Arc::clone(&self.extractor)).dispatch(
            &config.ranges,
            &config.source,
            &config.work_dir,
        );

        self.report_state(PipelineState::Collecting);
        let segments = pending.collect().await?;

        self.report_state(PipelineState::Planning);
        let manifest = self.planner.plan(segments.paths(), &config.output)?;

        self.report_state(PipelineState::Concatenating);
        self.executor.execute(manifest, stdout, stderr).await
    }
}

/// Checks that need no tools: at least one range, an output outside the work
/// dir, and no manifest left in the work dir by an interrupted run.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    if config.ranges.is_empty() {
        return Err(Error::InvalidInput("no time ranges to extract".to_string()));
    }

    if is_inside(&config.output, &config.work_dir) {
        return Err(Error::InvalidInput(format!(
            "output {} must be outside the work directory {}",
            config.output.display(),
            config.work_dir.display()
        )));
    }

    let manifest = config.work_dir.join(MANIFEST_FILE_NAME);
    if manifest.exists() {
        return Err(Error::InvalidInput(format!(
            "{} is left over from an earlier run; remove it or use another work directory",
            manifest.display()
        )));
    }

    Ok(())
}

/// Reject ranges that start at or past the end of the source. Ranges that
/// only run past the end are extracted short.
pub fn check_ranges_against_source(ranges: &[TimeRange], info: &SourceInfo) -> Result<()> {
    let Some(duration) = info.duration else {
        tracing::debug!("source duration unknown, skipping range bounds check");
        return Ok(());
    };

    for (index, range) in ranges.iter().enumerate() {
        if range.start() >= duration {
            return Err(Error::InvalidRange(format!(
                "range {index} ({range}) starts at or after the end of the source ({duration:?})"
            )));
        }
        if range.end() > duration {
            tracing::warn!(
                "range {index} ({range}) ends after the source ({duration:?}); it will be shorter"
            );
        }
    }
    Ok(())
}

fn is_inside(path: &Path, dir: &Path) -> bool {
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    let path = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    };
    path.starts_with(dir)
}
