use ecadaptor::{AdaptorOptions, FilterConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filters and options resolved from the config file for one run.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub filters: FilterConfig,
    pub options: AdaptorOptions,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        if let Some(default_name) = data.default_profile.as_ref() {
            if !data.profiles.contains_key(default_name) {
                return Err(ConfigError::ProfileNotFound {
                    name: default_name.clone(),
                });
            }
        }
        Ok(Self { path, data })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Merges the top-level section with `name` (or the default profile).
    pub fn resolve(&self, name: Option<&str>) -> Result<Profile, ConfigError> {
        let mut profile = Profile {
            filters: self.data.filters.clone(),
            options: AdaptorOptions {
                fail_on_array_properties: self.data.fail_on_array_properties,
            },
        };
        let selected = name.or(self.data.default_profile.as_deref());
        if let Some(name) = selected {
            let raw = self
                .data
                .profiles
                .get(name)
                .ok_or_else(|| ConfigError::ProfileNotFound {
                    name: name.to_string(),
                })?;
            profile.filters.merge(&raw.filters);
            if let Some(strict) = raw.fail_on_array_properties {
                profile.options.fail_on_array_properties = strict;
            }
        }
        Ok(profile)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    filters: FilterConfig,
    #[serde(default)]
    fail_on_array_properties: bool,
    #[serde(default)]
    profiles: HashMap<String, RawProfile>,
    #[serde(default)]
    default_profile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProfile {
    #[serde(flatten)]
    filters: FilterConfig,
    fail_on_array_properties: Option<bool>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("ecadaptor").join("config.toml"))
}
