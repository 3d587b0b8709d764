//! Persistent key/value storage shared by every context.
//!
//! Each call is atomic on its own, but nothing isolates a read from the
//! write that follows it: two read-modify-write sequences on the same key
//! race and the last writer wins.

pub mod collections;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use collections::{ActionCollections, Collection};
pub use file::FileStore;
pub use memory::MemoryStore;

pub const RECORDED_ACTIONS_KEY: &str = "recordedActions";
pub const CLIPBOARD_ACTIONS_KEY: &str = "clipboardActions";
pub const FAVORITE_ACTIONS_KEY: &str = "favoriteActions";
pub const SETTINGS_KEY: &str = "settings";
pub const IS_RECORDING_KEY: &str = "isRecording";
pub const TEMPLATE_CACHE_KEY: &str = "templateSourceCache";
pub const TEMPLATE_FALLBACK_KEY: &str = "templateSourceFallback";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored data is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ActionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}
