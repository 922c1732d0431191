use clap::{Parser, Subcommand};
use clipsplice_av::ExtractMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clipsplice")]
#[command(
    author,
    version,
    about = "Cut time ranges out of a video concurrently and splice them into one file"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every range from the source and splice them into the output
    Run {
        /// Source media file (overrides job.source)
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Output file (overrides job.output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Timestamps file with one `start-end` range per line
        #[arg(short, long)]
        timestamps: Option<PathBuf>,

        /// Directory for segment files instead of a temporary one
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Keep the temporary work directory after the run
        #[arg(long)]
        keep_work_dir: bool,

        /// How segments are cut: reencode (frame accurate) or copy (keyframes)
        #[arg(long)]
        mode: Option<ExtractMode>,

        /// Stream ffmpeg's output from the concatenation step to stderr
        #[arg(long)]
        show_tool_output: bool,
    },

    /// Parse a timestamps file and list its ranges
    Ranges {
        /// Timestamps file (uses job.timestamps if not specified)
        file: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}
