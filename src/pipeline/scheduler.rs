//! Fan-out of segment extraction jobs and index-keyed fan-in of their results.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clipsplice_av::workspace::segment_path;
use clipsplice_av::{Error, Result, SegmentExtractor, TimeRange};
use tokio::sync::mpsc;

/// Extension used for segments when the source has none.
const DEFAULT_SEGMENT_EXTENSION: &str = "mp4";

/// One extraction job. `index` is the position of `range` in the input and
/// the only key used to put results back in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentJob {
    pub index: usize,
    pub range: TimeRange,
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// The single report a job produces.
#[derive(Debug)]
pub struct SegmentResult {
    pub index: usize,
    pub outcome: Result<PathBuf>,
}

/// Segment paths in input order: entry `i` was cut from `ranges[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedSegmentList(Vec<PathBuf>);

impl OrderedSegmentList {
    /// Reassemble job results by index, in whatever order they arrived.
    ///
    /// Every index in `[0, expected)` must be reported exactly once. If any
    /// job failed, the failure with the lowest index is returned as
    /// [`Error::ExtractionFailed`] and no list is built.
    pub fn from_results(
        expected: usize,
        results: impl IntoIterator<Item = SegmentResult>,
    ) -> Result<Self> {
        let mut slots: Vec<Option<Result<PathBuf>>> = (0..expected).map(|_| None).collect();

        for result in results {
            let slot = slots.get_mut(result.index).ok_or_else(|| {
                Error::Internal(format!(
                    "segment {} reported but only {expected} were dispatched",
                    result.index
                ))
            })?;
            if slot.is_some() {
                return Err(Error::Internal(format!(
                    "segment {} reported more than once",
                    result.index
                )));
            }
            *slot = Some(result.outcome);
        }

        let mut paths = Vec::with_capacity(expected);
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(path)) => paths.push(path),
                Some(Err(cause)) => return Err(Error::extraction_failed(index, cause)),
                None => {
                    return Err(Error::extraction_failed(
                        index,
                        Error::Internal("job ended without reporting a result".to_string()),
                    ))
                }
            }
        }

        Ok(Self(paths))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

impl Deref for OrderedSegmentList {
    type Target = [PathBuf];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Jobs that have been dispatched and not yet collected.
pub struct PendingSegments {
    expected: usize,
    results: mpsc::UnboundedReceiver<SegmentResult>,
}

impl PendingSegments {
    /// Number of dispatched jobs.
    pub fn len(&self) -> usize {
        self.expected
    }

    pub fn is_empty(&self) -> bool {
        self.expected == 0
    }

    /// Wait for every dispatched job, then reassemble results by index.
    ///
    /// This never returns early on a failure: the channel only closes once
    /// every job task has finished and dropped its sender.
    pub async fn collect(mut self) -> Result<OrderedSegmentList> {
        let mut results = Vec::with_capacity(self.expected);

        while let Some(result) = self.results.recv().await {
            tracing::debug!(
                "segment {} finished ({}/{})",
                result.index,
                results.len() + 1,
                self.expected
            );
            results.push(result);
        }

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        if failed > 0 {
            tracing::warn!("{failed} of {} segment jobs failed", self.expected);
        }

        OrderedSegmentList::from_results(self.expected, results)
    }
}

/// Runs one extraction per time range, all at once, and collects them.
#[derive(Clone)]
pub struct JobScheduler {
    extractor: Arc<dyn SegmentExtractor>,
}

impl JobScheduler {
    pub fn new(extractor: Arc<dyn SegmentExtractor>) -> Self {
        Self { extractor }
    }

    /// Build the job list: job `i` cuts `ranges[i]` into
    /// `work_dir/segment_<i>.<source extension>`.
    pub fn jobs(ranges: &[TimeRange], source: &Path, work_dir: &Path) -> Vec<SegmentJob> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_SEGMENT_EXTENSION);

        ranges
            .iter()
            .enumerate()
            .map(|(index, range)| SegmentJob {
                index,
                range: *range,
                source: source.to_path_buf(),
                dest: segment_path(work_dir, index, extension),
            })
            .collect()
    }

    /// Spawn every job on its own task. There is no concurrency cap.
    pub fn dispatch(
        &self,
        ranges: &[TimeRange],
        source: &Path,
        work_dir: &Path,
    ) -> PendingSegments {
        let jobs = Self::jobs(ranges, source, work_dir);
        let expected = jobs.len();
        let (tx, rx) = mpsc::unbounded_channel();

        for job in jobs {
            let extractor = Arc::clone(&self.extractor);
            let tx = tx.clone();
            tracing::debug!(
                "dispatching segment {} ({}) -> {}",
                job.index,
                job.range,
                job.dest.display()
            );
            tokio::spawn(async move {
                let result = run_job(extractor.as_ref(), job).await;
                // The collector only goes away if the whole run was dropped.
                let _ = tx.send(result);
            });
        }

        PendingSegments {
            expected,
            results: rx,
        }
    }

    /// Dispatch all jobs and wait for all of them.
    pub async fn run(
        &self,
        ranges: &[TimeRange],
        source: &Path,
        work_dir: &Path,
    ) -> Result<OrderedSegmentList> {
        self.dispatch(ranges, source, work_dir).collect().await
    }
}

async fn run_job(extractor: &dyn SegmentExtractor, job: SegmentJob) -> SegmentResult {
    let started = Instant::now();
    let outcome = extractor
        .extract(job.range, &job.source, &job.dest)
        .await
        .map(|()| job.dest.clone());

    match &outcome {
        Ok(path) => tracing::debug!(
            "segment {} extracted to {} in {:?}",
            job.index,
            path.display(),
            started.elapsed()
        ),
        Err(e) => tracing::warn!("segment {} ({}) failed: {e}", job.index, job.range),
    }

    SegmentResult {
        index: job.index,
        outcome,
    }
}
