//! Export and import of action lists as JSON files.
//!
//! Imports are all-or-nothing: a single invalid element rejects the batch.

use crate::store::{ActionCollections, Collection};
use flowcap_common::action::ActionRecord;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const REQUIRED_FIELDS: [&str; 3] = ["id", "title", "actionJson"];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON syntax: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Import file must contain an array of actions")]
    NotAnArray,
    #[error("Import rejected: item {index} is missing required action properties (id, title, actionJson)")]
    MissingFields { index: usize },
    #[error("Import rejected: item {index} is malformed: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read import file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub added: usize,
    /// Ids that were already present in the target collection.
    pub skipped: usize,
}

/// Parses and validates an import document.
pub fn parse_actions(text: &str) -> Result<Vec<ActionRecord>, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(ImportError::InvalidJson)?;
    validate_actions(value)
}

pub fn validate_actions(value: Value) -> Result<Vec<ActionRecord>, ImportError> {
    let Value::Array(items) = value else {
        return Err(ImportError::NotAnArray);
    };

    for (index, item) in items.iter().enumerate() {
        let complete = REQUIRED_FIELDS.iter().all(|field| {
            item.get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| !s.is_empty())
        });
        if !complete {
            return Err(ImportError::MissingFields { index });
        }
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<ActionRecord>(item)
                .map_err(|source| ImportError::Malformed { index, source })
        })
        .collect()
}

/// Pretty-printed JSON array, the same shape `parse_actions` accepts.
pub fn export_actions(records: &[ActionRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Imports a document into the favorites collection.
pub async fn import_favorites(
    collections: &ActionCollections,
    text: &str,
) -> Result<ImportSummary, ImportError> {
    let records: Vec<ActionRecord> = parse_actions(text)?
        .into_iter()
        .map(|mut record| {
            record.is_favorite = Some(true);
            record.is_selected = false;
            record
        })
        .collect();

    let total = records.len();
    let added = collections.add_many(Collection::Favorites, records).await;
    info!(added, total, "Imported favorites");
    Ok(ImportSummary {
        added,
        skipped: total - added,
    })
}

pub async fn import_favorites_file(
    collections: &ActionCollections,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let text = tokio::fs::read_to_string(path).await?;
    import_favorites(collections, &text).await
}

/// Writes `collection` to `path`, returning how many actions were exported.
pub async fn export_collection_file(
    collections: &ActionCollections,
    collection: Collection,
    path: &Path,
) -> std::io::Result<usize> {
    let records = collections.list(collection).await;
    let text = export_actions(&records).map_err(std::io::Error::other)?;
    tokio::fs::write(path, text).await?;
    Ok(records.len())
}
