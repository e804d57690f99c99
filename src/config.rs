use serde::Deserialize;
use std::fs;

use crate::error::WorkflowError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bounded retry for idempotent preview calls only.
    pub preview_retries: u32,
}

/// Default risk inputs used by the demo binary for stage-4 compute.
#[derive(Clone, Debug, Deserialize)]
pub struct RiskDefaults {
    pub capital: f64,
    pub risk_percent: f64,
    pub entry_buffer: f64,
    pub r_multiple: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub risk: RiskDefaults,
}

impl AppConfig {
    pub fn load() -> Result<Self, WorkflowError> {
        Self::load_from_path("config.yaml")
    }

    pub fn load_from_path(path: &str) -> Result<Self, WorkflowError> {
        let content = fs::read_to_string(path)
            .map_err(|e| WorkflowError::Config(format!("failed to read {}: {}", path, e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, WorkflowError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        serde_yaml::from_str(content)
            .map_err(|e| WorkflowError::Config(format!("failed to parse config: {}", e)))
    }
}
