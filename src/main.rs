mod cli;

use clipsplice::{
    config,
    pipeline::{ExtractOptions, Pipeline, PipelineConfig},
    timestamps,
};
use clipsplice_av::{format_seconds, OutputSink, ToolRegistry, Workspace};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options for one `run` invocation after merging CLI flags over the config file.
struct RunArgs {
    source: Option<PathBuf>,
    output: Option<PathBuf>,
    timestamps: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    keep_work_dir: bool,
    mode: Option<clipsplice_av::ExtractMode>,
    show_tool_output: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "clipsplice=debug,clipsplice_av=debug".to_string()
        } else {
            "clipsplice=info,clipsplice_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            source,
            output,
            timestamps,
            work_dir,
            keep_work_dir,
            mode,
            show_tool_output,
        } => {
            let args = RunArgs {
                source,
                output,
                timestamps,
                work_dir,
                keep_work_dir,
                mode,
                show_tool_output,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_splice(args, cli.config.as_deref()))
        }
        Commands::Ranges { file, json } => list_ranges(file, cli.config.as_deref(), json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
    }
}

async fn run_splice(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if args.source.is_some() {
        config.job.source = args.source;
    }
    if args.output.is_some() {
        config.job.output = args.output;
    }
    if let Some(timestamps) = args.timestamps {
        config.job.timestamps = timestamps;
    }
    if args.work_dir.is_some() {
        config.job.work_dir = args.work_dir;
    }
    if args.keep_work_dir {
        config.job.keep_work_dir = true;
    }
    if let Some(mode) = args.mode {
        config.extract.mode = mode;
    }
    config::validate_config(&config)?;

    let source = config
        .job
        .source
        .clone()
        .context("No source file given; pass --source or set job.source")?;
    let output = config
        .job
        .output
        .clone()
        .context("No output file given; pass --output or set job.output")?;

    let ranges = timestamps::load_timestamps(&config.job.timestamps).with_context(|| {
        format!(
            "Failed to load timestamps from {}",
            config.job.timestamps.display()
        )
    })?;

    let tools = ToolRegistry::discover(&config.tools);
    let pipeline = Pipeline::from_tools(
        &tools,
        ExtractOptions {
            mode: config.extract.mode,
            timeout: config.tools.timeout(),
        },
    )
    .context("Required tools are missing; run `clipsplice check-tools`")?;

    let workspace = match &config.job.work_dir {
        Some(dir) => Workspace::existing(dir)?,
        None => Workspace::temp_in(".")?,
    };

    tracing::info!(
        "Splicing {} ranges from {} (mode: {:?})",
        ranges.len(),
        source.display(),
        config.extract.mode
    );

    let pipeline_config = PipelineConfig {
        source,
        output,
        work_dir: workspace.path().to_path_buf(),
        ranges,
    };

    let result = if args.show_tool_output {
        let mut out = tokio::io::stderr();
        let mut err = tokio::io::stderr();
        let out_sink: OutputSink<'_> = &mut out;
        let err_sink: OutputSink<'_> = &mut err;
        pipeline
            .run(&pipeline_config, Some(out_sink), Some(err_sink))
            .await
    } else {
        pipeline.run(&pipeline_config, None, None).await
    };

    if config.job.keep_work_dir && workspace.is_temporary() {
        let kept = workspace.keep();
        println!("Work directory kept: {}", kept.display());
    } else {
        drop(workspace);
    }

    let output = result.map_err(|e| {
        let stage = e.stage();
        anyhow::Error::new(e).context(format!("Splice failed during {stage}"))
    })?;

    println!("{}", output.display());
    Ok(())
}

#[derive(Serialize)]
struct RangeRow {
    index: usize,
    start: f64,
    end: f64,
    length: f64,
}

fn list_ranges(file: Option<PathBuf>, config_path: Option<&Path>, json: bool) -> Result<()> {
    let path = match file {
        Some(p) => p,
        None => config::load_config_or_default(config_path)?.job.timestamps,
    };

    let ranges = timestamps::load_timestamps(&path)
        .with_context(|| format!("Failed to load timestamps from {}", path.display()))?;

    if json {
        let rows: Vec<RangeRow> = ranges
            .iter()
            .enumerate()
            .map(|(index, r)| RangeRow {
                index,
                start: r.start().as_secs_f64(),
                end: r.end().as_secs_f64(),
                length: r.length().as_secs_f64(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Ranges in {}:\n", path.display());
    for (i, range) in ranges.iter().enumerate() {
        println!(
            "  [{}] {} - {} ({}s)",
            i,
            format_seconds(range.start()),
            format_seconds(range.end()),
            format_seconds(range.length())
        );
    }

    let total: Duration = ranges.iter().map(|r| r.length()).sum();
    println!(
        "\n{} ranges, total length {}s",
        ranges.len(),
        format_seconds(total)
    );

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg (which ships ffprobe) to splice clips.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let show_path = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };

    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Source: {}", show_path(&config.job.source));
    println!("  Output: {}", show_path(&config.job.output));
    println!("  Timestamps: {}", config.job.timestamps.display());
    println!("  Work dir: {}", show_path(&config.job.work_dir));
    println!("  Extract mode: {:?}", config.extract.mode);
    match config.tools.timeout_secs {
        Some(secs) => println!("  Tool timeout: {}s", secs),
        None => println!("  Tool timeout: none"),
    }

    Ok(())
}
