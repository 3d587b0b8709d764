use super::schema::FlowcapConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolution order:
    /// 1. `$FLOWCAP_CONFIG`
    /// 2. ./flowcap.yaml
    /// 3. ~/.flowcap/config.yaml
    /// 4. built-in defaults
    pub async fn load_default() -> Result<FlowcapConfig, ConfigError> {
        for candidate in Self::candidates() {
            if candidate.exists() {
                return Self::load_from(&candidate).await;
            }
        }
        Ok(FlowcapConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<FlowcapConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(FlowcapConfig::default());
        }
        let config: FlowcapConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(explicit) = std::env::var_os("FLOWCAP_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("./flowcap.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".flowcap").join("config.yaml"));
        }
        paths
    }
}
