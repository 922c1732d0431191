use clipsplice_av::{ExtractMode, ToolsConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub job: JobConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Media file the ranges are cut from
    #[serde(default)]
    pub source: Option<PathBuf>,

    /// Where the spliced file is written
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// File with one `start-end` range per line
    #[serde(default = "default_timestamps")]
    pub timestamps: PathBuf,

    /// Directory for segment files. When unset a temporary directory is
    /// created under the current directory and removed afterwards.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Leave the temporary work directory in place after the run
    #[serde(default)]
    pub keep_work_dir: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            source: None,
            output: None,
            timestamps: default_timestamps(),
            work_dir: None,
            keep_work_dir: false,
        }
    }
}

fn default_timestamps() -> PathBuf {
    PathBuf::from("./timestamps.txt")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// `reencode` for frame-accurate cuts, `copy` for keyframe cuts without re-encoding
    #[serde(default)]
    pub mode: ExtractMode,
}
