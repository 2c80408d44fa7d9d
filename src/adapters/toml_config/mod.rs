// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::exec_process::StagePrograms;
use crate::domain::model::Defaults;
use crate::error::{GififyError, GififyResult};
use crate::utils::logging::LoggingConfig;

/// Complete gifify configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GififyConfig {
    /// Values for omitted options
    pub defaults: Defaults,
    /// Stage programs
    pub programs: StagePrograms,
    /// Pipeline behaviour
    pub pipeline: PipelineConfig,
    /// Logging setup
    pub logging: LoggingConfig,
}

/// Pipeline section of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Abort the pipeline after this many seconds
    pub timeout_secs: Option<u64>,
}

impl PipelineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// File looked up in the working directory when no path is given
    pub const DEFAULT_FILE: &'static str = "gifify.toml";

    /// Environment variables overriding stage programs
    pub const PROGRAM_ENV: [(&'static str, &'static str); 3] = [
        ("GIFIFY_FFMPEG", "ffmpeg"),
        ("GIFIFY_CONVERT", "convert"),
        ("GIFIFY_GIFSICLE", "gifsicle"),
    ];

    /// Load configuration following precedence: Env > File > Defaults
    ///
    /// An explicit path must exist; the implicit `gifify.toml` is optional.
    pub fn discover(explicit: Option<&Path>) -> GififyResult<GififyConfig> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let implicit = PathBuf::from(Self::DEFAULT_FILE);
                if implicit.is_file() {
                    Self::load(&implicit)?
                } else {
                    debug!("No configuration file found, using defaults");
                    GififyConfig::default()
                }
            }
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> GififyResult<GififyConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| GififyError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config = Self::parse(&content).map_err(|e| GififyError::Config {
            message: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> GififyResult<GififyConfig> {
        toml::from_str(content).map_err(|e| GififyError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })
    }

    /// Serialize configuration to TOML text
    pub fn to_toml(config: &GififyConfig) -> GififyResult<String> {
        toml::to_string_pretty(config).map_err(|e| GififyError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }

    /// Override stage programs from the environment
    pub fn apply_env_overrides<F>(config: &mut GififyConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (env_var, program) in Self::PROGRAM_ENV {
            let Some(value) = lookup(env_var).filter(|v| !v.is_empty()) else {
                continue;
            };
            info!("Found environment override: {} = {}", env_var, value);
            match program {
                "ffmpeg" => config.programs.ffmpeg = value,
                "convert" => config.programs.convert = value,
                _ => config.programs.gifsicle = value,
            }
        }
    }
}
