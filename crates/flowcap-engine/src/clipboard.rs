//! Moving actions between the extension and the workflow editor's clipboard.

use crate::router::{MessageRouter, RouterError};
use crate::settings::{PageDetectionMode, SettingsRecord};
use crate::store::{ActionCollections, Collection};
use flowcap_common::action::{ActionRecord, ClipboardItem};
use flowcap_common::protocol::{ActionKind, ContextId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

pub const CLIPBOARD_CATEGORY: &str = "clipboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorKind {
    Classic,
    Modern,
    Unknown,
}

impl EditorKind {
    /// Accepts `"classic"`, `"modern"` or `{"editor": "..."}`.
    pub fn from_reply(value: &Value) -> Self {
        let tag = value
            .as_str()
            .or_else(|| value.get("editor").and_then(Value::as_str))
            .unwrap_or_default();
        match tag.to_ascii_lowercase().as_str() {
            "classic" => EditorKind::Classic,
            "modern" => EditorKind::Modern,
            _ => EditorKind::Unknown,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error("The page never answered")]
    NoReply,
    #[error("The active tab is not a workflow editor")]
    NotAnEditor,
    #[error("Clipboard contents are malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Forced editor modes win; otherwise the page is asked.
pub async fn detect_editor(
    router: &MessageRouter,
    settings: &SettingsRecord,
    from: ContextId,
) -> Result<EditorKind, ClipboardError> {
    match settings.mode() {
        PageDetectionMode::ClassicEditor => return Ok(EditorKind::Classic),
        PageDetectionMode::ModernEditor => return Ok(EditorKind::Modern),
        _ => {}
    }
    let reply = router
        .request(
            ActionKind::CheckWorkflowEditorPage,
            Value::Null,
            from,
            ContextId::Page,
        )
        .await?;
    let value = reply.await.map_err(|_| ClipboardError::NoReply)?;
    Ok(EditorKind::from_reply(&value))
}

/// Injects `record` into the page clipboard of the active editor.
pub async fn copy_action(
    router: &MessageRouter,
    settings: &SettingsRecord,
    record: &ActionRecord,
    from: ContextId,
) -> Result<EditorKind, ClipboardError> {
    let editor = detect_editor(router, settings, from).await?;
    if editor == EditorKind::Unknown {
        return Err(ClipboardError::NotAnEditor);
    }
    router
        .send_request(
            ActionKind::CopyAction,
            json!({ "actionJson": record.action_json, "editor": editor }),
            from,
            ContextId::Page,
            None,
        )
        .await?;
    info!(id = %record.id, ?editor, "Copied action to page clipboard");
    Ok(editor)
}

/// Reads the editor clipboard, replaces the stored clipboard list with it
/// and tells the panel.
pub async fn refresh_clipboard(
    router: &MessageRouter,
    collections: &ActionCollections,
    from: ContextId,
) -> Result<Vec<ActionRecord>, ClipboardError> {
    let reply = router
        .request(
            ActionKind::GetClipboardElements,
            Value::Null,
            from,
            ContextId::Page,
        )
        .await?;
    let value = reply.await.map_err(|_| ClipboardError::NoReply)?;
    let items: Vec<ClipboardItem> =
        serde_json::from_value(value).map_err(ClipboardError::Malformed)?;

    let records = records_from_clipboard(items);
    collections
        .replace_all(Collection::Clipboard, &records)
        .await;

    let message = serde_json::to_value(&records).map_err(ClipboardError::Malformed)?;
    if let Err(e) = router
        .send_request(
            ActionKind::ClipboardListUpdated,
            message,
            from,
            ContextId::Panel,
            None,
        )
        .await
    {
        warn!("Failed to announce clipboard list: {}", e);
    }
    Ok(records)
}

pub fn records_from_clipboard(items: Vec<ClipboardItem>) -> Vec<ActionRecord> {
    items
        .into_iter()
        .map(|item| ActionRecord {
            id: generate_action_id(),
            url: String::new(),
            method: String::new(),
            title: item.title,
            icon: item.icon,
            action_json: item.action_json,
            body: None,
            is_selected: false,
            is_favorite: None,
            category: Some(CLIPBOARD_CATEGORY.to_string()),
        })
        .collect()
}

/// `<unix millis>-<random base36>`.
pub fn generate_action_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let token: u64 = rand::thread_rng().r#gen();
    format!("{}-{}", millis, base36(token))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
