use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;
use crate::harvest::HarvestOptions;
use crate::scholar::ScholarClientOptions;

pub const DEFAULT_CONFIG_FILE: &str = "scholar-harvest.json";
pub const API_KEY_ENV: &str = "S2_API_KEY";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub titles: Option<String>,
    #[serde(default)]
    pub pdf_root: Option<String>,
    #[serde(default)]
    pub snapshot_dir: Option<String>,
    #[serde(default)]
    pub download_pdfs: Option<bool>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub search_interval_ms: Option<u64>,
    #[serde(default)]
    pub request_interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub prefix: String,
    pub titles: Utf8PathBuf,
    pub pdf_root: Utf8PathBuf,
    pub snapshot_dir: Utf8PathBuf,
    pub download_pdfs: bool,
    pub verbose: bool,
    pub api_key: Option<String>,
    pub search_interval: Duration,
    pub request_interval: Duration,
    pub timeout: Duration,
}

impl ResolvedConfig {
    pub fn harvest_options(&self) -> HarvestOptions {
        HarvestOptions {
            prefix: self.prefix.clone(),
            pdf_root: self.pdf_root.clone(),
            download_pdfs: self.download_pdfs,
            verbose: self.verbose,
        }
    }

    pub fn client_options(&self) -> ScholarClientOptions {
        ScholarClientOptions {
            api_key: self.api_key.clone(),
            search_interval: self.search_interval,
            request_interval: self.request_interval,
            timeout: self.timeout,
            ..ScholarClientOptions::default()
        }
    }

    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "scholar_harvest=debug"
        } else {
            "scholar_harvest=info"
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `scholar-harvest.json` when no path is given. Only an explicitly
    /// named file has to exist; otherwise defaults apply.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, HarvestError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| HarvestError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| HarvestError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(api_key) = std::env::var(API_KEY_ENV) {
            if !api_key.trim().is_empty() {
                resolved.api_key = Some(api_key.trim().to_string());
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, HarvestError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let prefix = config.prefix.unwrap_or_else(|| "icml".to_string());
        if prefix.trim().is_empty() {
            return Err(HarvestError::ConfigParse(
                "prefix must not be empty".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            prefix: prefix.trim().to_string(),
            titles: Utf8PathBuf::from(
                config
                    .titles
                    .unwrap_or_else(|| "data/papers.txt".to_string()),
            ),
            pdf_root: Utf8PathBuf::from(config.pdf_root.unwrap_or_else(|| ".".to_string())),
            snapshot_dir: Utf8PathBuf::from(
                config
                    .snapshot_dir
                    .unwrap_or_else(|| "./saved_data".to_string()),
            ),
            download_pdfs: config.download_pdfs.unwrap_or(true),
            verbose: config.verbose.unwrap_or(false),
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            search_interval: Duration::from_millis(config.search_interval_ms.unwrap_or(1000)),
            request_interval: Duration::from_millis(config.request_interval_ms.unwrap_or(100)),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_config() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.prefix, "icml");
        assert_eq!(resolved.snapshot_dir, Utf8PathBuf::from("./saved_data"));
        assert!(resolved.download_pdfs);
        assert!(!resolved.verbose);
        assert_eq!(resolved.search_interval, Duration::from_secs(1));
        assert_eq!(resolved.request_interval, Duration::from_millis(100));
    }
}
