use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A persisted, user-visible workflow action.
///
/// `id` is the network request id for captured actions and a generated
/// token for actions scraped from the page clipboard. It is unique within
/// one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon: String,
    /// The synthesized definition, already serialized.
    pub action_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default)]
    pub is_selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl ActionRecord {
    pub fn is_favorite(&self) -> bool {
        self.is_favorite.unwrap_or(false)
    }
}

/// An action as read back from the workflow editor's clipboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipboardItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon: String,
    pub action_json: String,
}
