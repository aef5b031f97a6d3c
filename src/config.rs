use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Run configuration, loaded from a TOML file.
///
/// ```toml
/// cache_dir = "./cache"
/// specs = ["python >=3.12", "pytorch[channel=pytorch]"]
/// channels = ["conda-forge", "pytorch"]
/// platforms = ["noarch", "linux-64"]
/// mirrored_channels = ["conda-forge"]
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Where fetched repodata indexes are kept between runs.
    pub cache_dir: PathBuf,
    /// Package specifications to report on.
    pub specs: Vec<String>,
    /// Channels whose repodata is fetched.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Platforms whose repodata is fetched.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    /// Channels served by the mirror site.
    #[serde(default)]
    pub mirrored_channels: Vec<String>,
}

impl CheckConfig {
    pub fn load(path: &Path) -> Result<CheckConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<CheckConfig, ConfigError> {
        let mut config: CheckConfig = toml::from_str(text)?;
        config.normalize()?;
        Ok(config)
    }

    /// Trims and dedupes every string list, then rejects empty values and
    /// empty required lists.
    fn normalize(&mut self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("cache_dir must not be empty".into()));
        }
        for (field, values) in [
            ("specs", &mut self.specs),
            ("channels", &mut self.channels),
            ("platforms", &mut self.platforms),
            ("mirrored_channels", &mut self.mirrored_channels),
        ] {
            let mut seen = std::collections::HashSet::new();
            let mut empty = false;
            values.retain_mut(|value| {
                *value = value.trim().to_string();
                empty |= value.is_empty();
                !value.is_empty() && seen.insert(value.clone())
            });
            if empty {
                return Err(ConfigError::Invalid(format!(
                    "{field} must not contain empty entries"
                )));
            }
            if values.is_empty() && field != "mirrored_channels" {
                return Err(ConfigError::Invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

fn default_channels() -> Vec<String> {
    vec!["conda-forge".to_string()]
}

fn default_platforms() -> Vec<String> {
    let mut platforms = vec!["noarch".to_string()];
    if let Some(current) = current_platform() {
        platforms.push(current.to_string());
    }
    platforms
}

/// The conda platform subdir of the running machine, if it has one.
pub fn current_platform() -> Option<&'static str> {
    platform_for(std::env::consts::OS, std::env::consts::ARCH)
}

fn platform_for(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Some("linux-64"),
        ("linux", "aarch64") => Some("linux-aarch64"),
        ("macos", "x86_64") => Some("osx-64"),
        ("macos", "aarch64") => Some("osx-arm64"),
        ("windows", "x86_64") => Some("win-64"),
        ("windows", "aarch64") => Some("win-arm64"),
        _ => None,
    }
}
