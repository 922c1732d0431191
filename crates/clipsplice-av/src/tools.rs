//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools the splicer shells out to (ffmpeg for trimming and
//! concatenation, ffprobe for source probing).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tool used for trimming segments and concatenating them.
pub const FFMPEG: &str = "ffmpeg";

/// Tool used for probing the source file.
pub const FFPROBE: &str = "ffprobe";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG, FFPROBE];

/// Tool overrides, usually read from the `[tools]` section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Explicit ffmpeg executable; falls back to `PATH` if it does not exist.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe executable; falls back to `PATH` if it does not exist.
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Per-invocation timeout in seconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ToolsConfig {
    /// The configured timeout as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool paths.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// A registry with no tools in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) a tool at an explicit path.
    pub fn with_tool(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(name.into(), path.into());
        self
    }

    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, a configured path is used directly if it exists.
    /// Otherwise [`which::which`] is used. Tools that are not found are
    /// omitted from the registry; [`ToolRegistry::require`] reports them.
    pub fn discover(config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => config.ffmpeg_path.as_deref(),
                FFPROBE => config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "configured {name} path {} does not exist, searching PATH",
                        p.display()
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!("found {name} at {}", path.display());
                    tools.insert(name.to_string(), path);
                }
                None => tracing::debug!("{name} not found"),
            }
        }

        Self { tools }
    }

    /// Path to the given tool, or [`Error::ToolNotFound`] if discovery did not
    /// find it.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::tool_not_found(name))
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        // Nothing is guaranteed to be installed in CI; the call must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_tool_not_found() {
        let registry = ToolRegistry::empty();
        let err = registry.require(FFMPEG).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { ref tool } if tool == "ffmpeg"));
    }

    #[test]
    fn with_tool_registers_explicit_path() {
        let registry = ToolRegistry::empty().with_tool(FFMPEG, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(
            registry.require(FFMPEG).unwrap(),
            Path::new("/opt/ffmpeg/bin/ffmpeg")
        );
        assert!(registry.require(FFPROBE).is_err());
    }

    #[test]
    fn configured_path_is_preferred_when_it_exists() {
        let fake = tempfile::NamedTempFile::new().unwrap();
        let config = ToolsConfig {
            ffmpeg_path: Some(fake.path().to_path_buf()),
            ..Default::default()
        };
        let registry = ToolRegistry::discover(&config);
        assert_eq!(registry.require(FFMPEG).unwrap(), fake.path());
    }

    #[test]
    fn check_all_returns_known_tools() {
        let infos = ToolRegistry::empty().check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ffmpeg", "ffprobe"]);
        assert!(infos.iter().all(|i| !i.available));
    }

    #[test]
    fn tools_config_from_toml_shape() {
        let json = r#"{"ffmpeg_path": "/usr/bin/ffmpeg", "timeout_secs": 90}"#;
        let cfg: ToolsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.ffmpeg_path, Some(PathBuf::from("/usr/bin/ffmpeg")));
        assert_eq!(cfg.ffprobe_path, None);
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(90)));
    }
}
