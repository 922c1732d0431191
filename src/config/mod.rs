mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./clipsplice.toml",
        "~/.config/clipsplice/config.toml",
        "/etc/clipsplice/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.tools.timeout_secs == Some(0) {
        anyhow::bail!("tools.timeout_secs cannot be 0; omit it to disable the timeout");
    }

    if let (Some(output), Some(work_dir)) = (&config.job.output, &config.job.work_dir) {
        if output.starts_with(work_dir) {
            anyhow::bail!(
                "job.output {:?} is inside job.work_dir {:?}; the work dir is thrown away",
                output,
                work_dir
            );
        }
    }

    if let Some(source) = &config.job.source {
        if !source.exists() {
            tracing::warn!("Source file does not exist: {:?}", source);
        }
    }

    Ok(())
}
