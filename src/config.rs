use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{PipelineError, Result};

/// Runtime configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory containing the downloaded reports
    pub base_dir: PathBuf,
    /// Name of the sibling directory each stage writes into
    pub transformed_dir_name: String,
    /// Basename substring marking advanced-report files
    pub advanced_marker: String,
    /// Minimum non-empty values a transposed column of an advanced file must hold
    pub sparse_column_min_values: usize,
    /// Directory for rolling log files
    pub log_dir: PathBuf,
    /// Year used for generation-to-age mapping; defaults to the local calendar year
    pub current_year: Option<i32>,
    /// Extra question patterns for the question-label stage; capture group 1 is the question
    pub question_patterns: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(constants::DEFAULT_BASE_DIR),
            transformed_dir_name: constants::TRANSFORMED_DIR.to_string(),
            advanced_marker: constants::ADVANCED_MARKER.to_string(),
            sparse_column_min_values: 4,
            log_dir: PathBuf::from("logs"),
            current_year: None,
            question_patterns: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SURVEY_BASE_DIR` / `SURVEY_LOG_DIR` overrides (after loading `.env`)
    pub fn with_env_overrides(mut self) -> Self {
        dotenv::dotenv().ok();
        if let Ok(dir) = std::env::var("SURVEY_BASE_DIR") {
            if !dir.trim().is_empty() {
                self.base_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("SURVEY_LOG_DIR") {
            if !dir.trim().is_empty() {
                self.log_dir = PathBuf::from(dir);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.advanced_marker.trim().is_empty() {
            return Err(PipelineError::Config(
                "advanced_marker must not be empty".to_string(),
            ));
        }
        if self.transformed_dir_name.trim().is_empty() {
            return Err(PipelineError::Config(
                "transformed_dir_name must not be empty".to_string(),
            ));
        }
        if self.sparse_column_min_values == 0 {
            return Err(PipelineError::Config(
                "sparse_column_min_values must be at least 1".to_string(),
            ));
        }
        for pattern in &self.question_patterns {
            regex::Regex::new(pattern).map_err(|e| {
                PipelineError::Config(format!("Invalid question pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    pub fn year(&self) -> i32 {
        self.current_year
            .unwrap_or_else(|| chrono::Local::now().year())
    }
}
