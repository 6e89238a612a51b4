//! Run configuration. Loaded once by the binary and passed explicitly into the core.

use std::env;
use std::path::{Path, PathBuf};

use sales_star_bucket::S3Config;
use serde::Deserialize;

use crate::error::{EtlError, Result};

pub const DEFAULT_OUTPUT_NAME: &str = "etl_output.zip";

/// How the `WeekDay` column of the time dimension spells weekday names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekdayStyle {
    /// `Monday`, `Tuesday`, ...
    #[default]
    Long,
    /// `Mon`, `Tue`, ...
    Short,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeDimensionOptions {
    /// chrono format strings tried in order; RFC 3339 is always accepted as a last resort.
    pub date_formats: Vec<String>,
    pub weekday_style: WeekdayStyle,
}

impl Default for TimeDimensionOptions {
    fn default() -> Self {
        Self {
            date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%Y-%m-%d %H:%M:%S%.f".to_string(),
                "%Y-%m-%d %H:%M".to_string(),
                "%Y-%m-%dT%H:%M:%S".to_string(),
                "%Y-%m-%dT%H:%M".to_string(),
                "%Y/%m/%d".to_string(),
                "%m/%d/%Y".to_string(),
            ],
            weekday_style: WeekdayStyle::Long,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let defaults = S3Config::default();
        Self {
            region: defaults.region,
            endpoint: defaults.endpoint,
            access_key_id: defaults.access_key_id,
            secret_access_key: defaults.secret_access_key,
            force_path_style: defaults.force_path_style,
        }
    }
}

impl StorageSettings {
    pub fn s3_config(&self, bucket: &str) -> S3Config {
        S3Config {
            bucket: bucket.to_string(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            force_path_style: self.force_path_style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Object name the packaged archive is delivered under.
    pub output_name: String,
    /// Parent directory for per-run staging; the OS temp dir when unset.
    pub working_root: Option<PathBuf>,
    pub time_dimension: TimeDimensionOptions,
    pub storage: StorageSettings,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            working_root: None,
            time_dimension: TimeDimensionOptions::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl EtlConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| EtlError::Config(err.to_string()))
    }

    /// Reads an optional TOML file, then layers `SALES_STAR_*` environment overrides on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    EtlError::Config(format!("failed to read {}: {err}", path.display()))
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from any key lookup; `load` feeds it the process environment.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(root) = lookup("SALES_STAR_WORKING_ROOT") {
            self.working_root = Some(PathBuf::from(root));
        }
        if let Some(name) = lookup("SALES_STAR_OUTPUT_NAME") {
            self.output_name = name;
        }
        if let Some(region) = lookup("SALES_STAR_S3_REGION").or_else(|| lookup("AWS_REGION")) {
            self.storage.region = region;
        }
        if let Some(endpoint) = lookup("SALES_STAR_S3_ENDPOINT") {
            self.storage.endpoint = Some(endpoint);
        }
        if let Some(key_id) = lookup("SALES_STAR_S3_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(key_id);
        }
        if let Some(secret) = lookup("SALES_STAR_S3_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(secret);
        }
        if let Some(flag) = lookup("SALES_STAR_S3_FORCE_PATH_STYLE") {
            self.storage.force_path_style = parse_flag(&flag).ok_or_else(|| {
                EtlError::Config(format!(
                    "SALES_STAR_S3_FORCE_PATH_STYLE must be true or false, got '{flag}'"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_name.trim().is_empty() {
            return Err(EtlError::Config("output_name cannot be empty".into()));
        }
        if self.time_dimension.date_formats.is_empty() {
            return Err(EtlError::Config(
                "time_dimension.date_formats needs at least one format".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
