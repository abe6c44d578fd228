use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, TidyError};
use crate::pipeline::AnalysisOptions;
use crate::ranker::SortMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Gmail search expression selecting the messages to analyze
    #[serde(default = "default_query")]
    pub query: String,
    /// Upper bound on messages fetched per run
    #[serde(default = "default_max_fetch")]
    pub max_fetch: usize,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            max_fetch: default_max_fetch(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// "count" or "date"
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default = "default_num_results")]
    pub num_results: i64,
    #[serde(default)]
    pub candidates_only: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sort: default_sort(),
            num_results: default_num_results(),
            candidates_only: false,
        }
    }
}

fn default_query() -> String {
    "is:unread".to_string()
}

fn default_max_fetch() -> usize {
    500
}

fn default_max_concurrent() -> usize {
    10
}

fn default_sort() -> String {
    "count".to_string()
}

fn default_num_results() -> i64 {
    20
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| TidyError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| TidyError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TidyError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| TidyError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| TidyError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.search.query.trim().is_empty() {
            return Err(TidyError::ConfigError(
                "search.query cannot be empty".to_string(),
            ));
        }

        if self.search.max_fetch == 0 {
            return Err(TidyError::ConfigError(
                "search.max_fetch must be at least 1".to_string(),
            ));
        }

        // Gmail allows 250 quota units/sec; a metadata get costs 5
        if self.search.max_concurrent_requests == 0 {
            return Err(TidyError::ConfigError(
                "search.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.search.max_concurrent_requests > 50 {
            return Err(TidyError::ConfigError(
                "search.max_concurrent_requests cannot exceed 50 (to stay under Gmail API rate limits of 250 units/sec)".to_string(),
            ));
        }

        self.sort_mode()
            .map_err(|e| TidyError::ConfigError(format!("Invalid report.sort: {}", e)))?;

        if self.report.num_results < 0 {
            return Err(TidyError::ConfigError(
                "report.num_results cannot be negative".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    pub fn sort_mode(&self) -> Result<SortMode> {
        self.report.sort.parse()
    }

    /// Options for [`crate::pipeline::analyze`] derived from this config
    pub fn analysis_options(&self) -> Result<AnalysisOptions> {
        Ok(AnalysisOptions {
            sort: self.sort_mode()?,
            limit: self.report.num_results,
            base_query: self.search.query.clone(),
            candidates_only: self.report.candidates_only,
        })
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
