//! End-to-end test against a real ffmpeg.
//!
//! Skipped when ffmpeg or ffprobe is not installed.

use std::path::Path;
use std::time::Duration;

use clipsplice::pipeline::{ExtractOptions, Pipeline, PipelineConfig};
use clipsplice::timestamps::parse_timestamps;
use clipsplice_av::{
    probe_source, ExtractMode, ToolCommand, ToolRegistry, ToolsConfig, Workspace, FFMPEG, FFPROBE,
};
use tempfile::tempdir;

fn tools_or_skip() -> Option<ToolRegistry> {
    let tools = ToolRegistry::discover(&ToolsConfig::default());
    if tools.require(FFMPEG).is_err() || tools.require(FFPROBE).is_err() {
        eprintln!("ffmpeg/ffprobe not installed, skipping");
        return None;
    }
    Some(tools)
}

async fn make_test_source(ffmpeg: &Path, dest: &Path) {
    ToolCommand::new(ffmpeg)
        .args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "lavfi",
            "-i",
            "testsrc=duration=10:size=320x240:rate=25",
            "-c:v",
            "mpeg4",
        ])
        .arg(dest.to_string_lossy())
        .execute()
        .await
        .unwrap();
}

async fn splice(mode: ExtractMode) {
    let Some(tools) = tools_or_skip() else {
        return;
    };
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.mp4");
    make_test_source(tools.require(FFMPEG).unwrap(), &source).await;

    let workspace = Workspace::temp_in(dir.path()).unwrap();
    let config = PipelineConfig {
        source,
        output: dir.path().join("spliced.mp4"),
        work_dir: workspace.path().to_path_buf(),
        ranges: parse_timestamps("0s-2s\n5s-7s\n").unwrap(),
    };

    let pipeline = Pipeline::from_tools(
        &tools,
        ExtractOptions {
            mode,
            timeout: Some(Duration::from_secs(120)),
        },
    )
    .unwrap();
    let output = pipeline.run(&config, None, None).await.unwrap();

    assert!(workspace.segment_path(0, "mp4").exists());
    assert!(workspace.segment_path(1, "mp4").exists());

    let info = probe_source(tools.require(FFPROBE).unwrap(), &output)
        .await
        .unwrap();
    let duration = info.duration.unwrap().as_secs_f64();
    assert!(
        (3.5..=4.5).contains(&duration),
        "expected about 4s of output, got {duration}s"
    );

    let work_dir = workspace.path().to_path_buf();
    drop(workspace);
    assert!(!work_dir.exists());
    assert!(output.exists());
}

#[tokio::test]
async fn reencoded_ranges_splice_to_combined_length() {
    splice(ExtractMode::Reencode).await;
}

#[tokio::test]
async fn copied_ranges_splice_to_combined_length() {
    splice(ExtractMode::Copy).await;
}
