//! Action templates published at a user-supplied URL.
//!
//! Two cache tiers live in the action store: a fresh tier honoured for one
//! hour, and a fallback tier holding the last good fetch regardless of age,
//! served when the source cannot be reached.

use crate::store::{ActionStore, TEMPLATE_CACHE_KEY, TEMPLATE_FALLBACK_KEY};
use flowcap_common::action::ActionRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CATEGORY: &str = "template";

#[derive(Debug, Error)]
pub enum TemplateSourceError {
    #[error("Failed to fetch templates: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Template source answered with HTTP {0}")]
    Status(u16),
    #[error("Template source did not return valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Template source must return an array of actions")]
    NotAnArray,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedTemplates {
    url: String,
    /// Unix epoch milliseconds.
    fetched_at: u64,
    items: Vec<ActionRecord>,
}

pub struct TemplateSource {
    store: Arc<dyn ActionStore>,
    client: reqwest::Client,
}

impl TemplateSource {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self::with_client(store, reqwest::Client::new())
    }

    pub fn with_client(store: Arc<dyn ActionStore>, client: reqwest::Client) -> Self {
        Self { store, client }
    }

    pub async fn load(&self, url: &str) -> Result<Vec<ActionRecord>, TemplateSourceError> {
        self.load_at(url, SystemTime::now(), false).await
    }

    /// Skips the fresh tier and always asks the source.
    pub async fn refresh(&self, url: &str) -> Result<Vec<ActionRecord>, TemplateSourceError> {
        self.load_at(url, SystemTime::now(), true).await
    }

    pub async fn load_at(
        &self,
        url: &str,
        now: SystemTime,
        force: bool,
    ) -> Result<Vec<ActionRecord>, TemplateSourceError> {
        let now_ms = epoch_millis(now);
        if !force
            && let Some(cached) = self.read_tier(TEMPLATE_CACHE_KEY).await
            && cached.url == url
            && now_ms.saturating_sub(cached.fetched_at) < CACHE_TTL.as_millis() as u64
        {
            debug!(url, "serving templates from cache");
            return Ok(cached.items);
        }

        match self.fetch(url).await {
            Ok(items) => {
                let cached = CachedTemplates {
                    url: url.to_string(),
                    fetched_at: now_ms,
                    items,
                };
                self.write_tier(TEMPLATE_CACHE_KEY, &cached).await;
                self.write_tier(TEMPLATE_FALLBACK_KEY, &cached).await;
                info!(url, count = cached.items.len(), "Fetched templates");
                Ok(cached.items)
            }
            Err(e) => {
                warn!(url, "Template fetch failed: {}", e);
                match self.read_tier(TEMPLATE_FALLBACK_KEY).await {
                    Some(fallback) if fallback.url == url => Ok(fallback.items),
                    _ => Err(e),
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<ActionRecord>, TemplateSourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TemplateSourceError::Status(status.as_u16()));
        }
        let text = response.text().await?;
        let value: Value = serde_json::from_str(&text).map_err(TemplateSourceError::InvalidJson)?;
        let Value::Array(items) = value else {
            return Err(TemplateSourceError::NotAnArray);
        };

        Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<ActionRecord>(item) {
                Ok(record) => Some(normalize(record)),
                Err(e) => {
                    warn!(index, "Skipping malformed template: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn read_tier(&self, key: &str) -> Option<CachedTemplates> {
        match self.store.get(key).await {
            Ok(Some(value)) => serde_json::from_value(value).ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                None
            }
        }
    }

    async fn write_tier(&self, key: &str, cached: &CachedTemplates) {
        let result = match serde_json::to_value(cached) {
            Ok(value) => self.store.set(key, value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to write {}: {}", key, e);
        }
    }
}

fn normalize(mut record: ActionRecord) -> ActionRecord {
    if record.category.as_deref().is_none_or(str::is_empty) {
        record.category = Some(DEFAULT_CATEGORY.to_string());
    }
    record.is_favorite = Some(false);
    record.is_selected = false;
    record
}

fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
