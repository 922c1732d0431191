//! Shared helpers for integration tests.
//!
//! Provides shell-script stand-ins for ffmpeg and ffprobe so the pipeline can
//! be driven end to end without real media tools. The fake ffmpeg writes the
//! `-ss` value it was given into each segment, and its concat mode cats the
//! segments listed in the manifest into the output, so the output content
//! shows the order segments were spliced in.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use clipsplice_av::{ToolRegistry, FFMPEG, FFPROBE};

/// Behaviour switches for [`write_fake_ffmpeg`].
#[derive(Debug, Default, Clone)]
pub struct FakeFfmpeg {
    /// Sleep for a second when extracting with this `-ss` value.
    pub slow_start: Option<String>,
    /// Exit 1 when extracting with this `-ss` value.
    pub fail_start: Option<String>,
    /// Write a partial output, then exit 1 in concat mode.
    pub fail_concat: bool,
}

/// Each extraction appends its `-ss` value here, in the tools' directory.
pub const ATTEMPTS_LOG: &str = "attempts.log";

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn write_fake_ffmpeg(dir: &Path, behaviour: &FakeFfmpeg) -> PathBuf {
    let log = dir.join(ATTEMPTS_LOG);
    let mut script = String::from(
        r#"#!/bin/sh
ss=""
input=""
concat=0
prev=""
out=""
for arg in "$@"; do
  case "$prev" in
    -ss) ss="$arg" ;;
    -i) input="$arg" ;;
    -f) [ "$arg" = concat ] && concat=1 ;;
  esac
  prev="$arg"
  out="$arg"
done
if [ "$concat" = 1 ]; then
  echo "concatenating into $out" >&2
"#,
    );

    if behaviour.fail_concat {
        script.push_str("  echo partial > \"$out\"\n");
        script.push_str("  echo \"concat demuxer: invalid data found\" >&2\n  exit 1\n");
    }

    script.push_str(
        r#"  dir=$(dirname "$input")
  : > "$out"
  while IFS= read -r line; do
    name=${line#"file '"}
    name=${name%"'"}
    cat "$dir/$name" >> "$out"
  done < "$input"
  exit 0
fi
"#,
    );

    script.push_str(&format!("echo \"$ss\" >> '{}'\n", log.display()));

    if let Some(ss) = &behaviour.slow_start {
        script.push_str(&format!("if [ \"$ss\" = \"{ss}\" ]; then sleep 1; fi\n"));
    }
    if let Some(ss) = &behaviour.fail_start {
        script.push_str(&format!(
            "if [ \"$ss\" = \"{ss}\" ]; then echo \"cannot cut at $ss\" >&2; exit 1; fi\n"
        ));
    }
    script.push_str("echo \"$ss\" > \"$out\"\n");

    let path = dir.join("ffmpeg");
    write_script(&path, &script);
    path
}

/// Fake ffprobe reporting a 60 second mp4 for any input.
pub fn write_fake_ffprobe(dir: &Path) -> PathBuf {
    let path = dir.join("ffprobe");
    write_script(
        &path,
        "#!/bin/sh\necho '{\"format\":{\"format_name\":\"mov,mp4\",\"duration\":\"60.0\"}}'\n",
    );
    path
}

/// Registry pointing at freshly written fake tools in `dir`.
pub fn fake_tools(dir: &Path, behaviour: &FakeFfmpeg) -> ToolRegistry {
    let ffmpeg = write_fake_ffmpeg(dir, behaviour);
    let ffprobe = write_fake_ffprobe(dir);
    ToolRegistry::empty()
        .with_tool(FFMPEG, ffmpeg)
        .with_tool(FFPROBE, ffprobe)
}

/// `-ss` values the fake ffmpeg was called with, in call order.
pub fn attempts(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join(ATTEMPTS_LOG))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
