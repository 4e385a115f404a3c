// restorechain/src/config/mod.rs
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::restore::planner::{FilePaths, RestoreOptions};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "RESTORECHAIN_CONFIG";
const DEFAULT_HEADER_TIMEOUT_SECS: u64 = 5;

const TARGET_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRestoreOptions {
    #[serde(default)]
    pub overwrite: bool,
    pub relocate: Option<FilePaths>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub catalog_path: Option<PathBuf>,
    pub headers_path: Option<PathBuf>,
    pub source_database: Option<String>,
    pub target_database: Option<String>,
    pub target_time: Option<String>,
    pub header_timeout_secs: Option<u64>,
    pub restore_options: Option<JsonRestoreOptions>,
    pub script_output_path: Option<PathBuf>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub catalog_path: PathBuf,
    pub headers_path: PathBuf,
    pub source_database: String,
    pub target_database: String,
    pub target_time: Option<NaiveDateTime>,
    pub header_timeout: Duration,
    pub options: RestoreOptions,
    pub script_output_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Plan(RestoreConfig),
    Validate(RestoreConfig),
    Script(RestoreConfig),
}

impl OperationConfig {
    pub fn restore_config(&self) -> &RestoreConfig {
        match self {
            OperationConfig::Plan(cfg) | OperationConfig::Validate(cfg) | OperationConfig::Script(cfg) => cfg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub raw_json_config: RawJsonConfig,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })?;

        Ok(AppConfig {
            operation: None, // To be filled by main after parsing CLI args
            raw_json_config,
        })
    }
}

/// Resolves the config file location: `RESTORECHAIN_CONFIG` if set, else
/// `config.json` in the working directory.
pub fn config_path_from_env() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn parse_target_time(raw: &str) -> Result<NaiveDateTime> {
    let trimmed = raw.trim();
    TARGET_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .with_context(|| {
            format!(
                "target_time '{}' is not a timestamp (expected YYYY-MM-DD HH:MM:SS)",
                raw
            )
        })
}

pub fn load_restore_config_from_json(raw_config: &RawJsonConfig) -> Result<RestoreConfig> {
    let catalog_path = raw_config
        .catalog_path
        .as_ref()
        .context("catalog_path must be set in config.json")?
        .clone();
    let headers_path = raw_config
        .headers_path
        .as_ref()
        .context("headers_path must be set in config.json")?
        .clone();
    let source_database = raw_config
        .source_database
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .context("source_database must be set in config.json")?;

    let target_database = match raw_config.target_database.as_ref().map(|s| s.trim()) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => source_database.clone(),
    };

    let target_time = raw_config
        .target_time
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(parse_target_time)
        .transpose()?;

    let timeout_secs = raw_config
        .header_timeout_secs
        .unwrap_or(DEFAULT_HEADER_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(anyhow::anyhow!(
            "header_timeout_secs must be greater than zero in config.json."
        ));
    }

    let json_options = raw_config.restore_options.clone().unwrap_or_default();
    if json_options.relocate.is_some() && target_database.eq_ignore_ascii_case(&source_database) {
        warn!("restore_options.relocate is set but the target database is the source; files will not be moved.");
    }

    Ok(RestoreConfig {
        catalog_path,
        headers_path,
        source_database,
        target_database,
        target_time,
        header_timeout: Duration::from_secs(timeout_secs),
        options: RestoreOptions {
            overwrite: json_options.overwrite,
            relocate: json_options.relocate,
        },
        script_output_path: raw_config.script_output_path.clone(),
    })
}
