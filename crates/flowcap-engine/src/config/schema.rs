use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process configuration of the background host. User-facing settings live
/// in the action store instead (see `settings`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowcapConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long a host query (e.g. the active tab) may stay unanswered.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    9017
}

fn default_query_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("flowcap").join("store.json"),
        None => PathBuf::from("./flowcap-store.json"),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Upper bound on pre-flight bodies waiting for their headers event.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_page_check_timeout_ms")]
    pub page_check_timeout_ms: u64,
    /// Interval of the recording-duration check in the serve loop.
    #[serde(default = "default_expiry_tick_secs")]
    pub expiry_tick_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_pending: default_max_pending(),
            page_check_timeout_ms: default_page_check_timeout_ms(),
            expiry_tick_secs: default_expiry_tick_secs(),
        }
    }
}

fn default_max_pending() -> usize {
    512
}

fn default_page_check_timeout_ms() -> u64 {
    1500
}

fn default_expiry_tick_secs() -> u64 {
    15
}
