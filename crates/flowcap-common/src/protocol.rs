use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raised when an ordinal on the wire does not map to a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} ordinal: {value}")]
pub struct UnknownOrdinal {
    pub kind: &'static str,
    pub value: u8,
}

/// Kinds of messages exchanged between the page, background and panel contexts.
///
/// Serialized as the numeric ordinal. New kinds are appended so existing
/// ordinals never shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ActionKind {
    StartRecording = 0,
    StopRecording = 1,
    CopyAction = 2,
    CheckTargetPage = 3,
    CheckWorkflowEditorPage = 4,
    ActionListUpdated = 5,
    DeleteAction = 6,
    GetClipboardElements = 7,
    ClipboardListUpdated = 8,
    DeleteClipboardAction = 9,
    ClearActions = 10,
    GetRecordingState = 11,
    RecordingStateChanged = 12,
    ToggleFavorite = 13,
}

impl ActionKind {
    pub const ALL: [ActionKind; 14] = [
        ActionKind::StartRecording,
        ActionKind::StopRecording,
        ActionKind::CopyAction,
        ActionKind::CheckTargetPage,
        ActionKind::CheckWorkflowEditorPage,
        ActionKind::ActionListUpdated,
        ActionKind::DeleteAction,
        ActionKind::GetClipboardElements,
        ActionKind::ClipboardListUpdated,
        ActionKind::DeleteClipboardAction,
        ActionKind::ClearActions,
        ActionKind::GetRecordingState,
        ActionKind::RecordingStateChanged,
        ActionKind::ToggleFavorite,
    ];
}

impl From<ActionKind> for u8 {
    fn from(kind: ActionKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = UnknownOrdinal;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ActionKind::ALL
            .get(value as usize)
            .copied()
            .ok_or(UnknownOrdinal {
                kind: "action",
                value,
            })
    }
}

/// The three isolated execution contexts of the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ContextId {
    /// Script injected into the active tab.
    Page = 0,
    /// Long-lived event script that owns capture.
    Background = 1,
    /// The extension's UI panel.
    Panel = 2,
}

impl From<ContextId> for u8 {
    fn from(ctx: ContextId) -> Self {
        ctx as u8
    }
}

impl TryFrom<u8> for ContextId {
    type Error = UnknownOrdinal;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ContextId::Page),
            1 => Ok(ContextId::Background),
            2 => Ok(ContextId::Panel),
            _ => Err(UnknownOrdinal {
                kind: "context",
                value,
            }),
        }
    }
}

/// Message passed between contexts.
///
/// Delivery is not restricted by the router: every receiver checks `to`
/// against its own identity and drops envelopes meant for someone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub action_type: ActionKind,
    #[serde(default)]
    pub message: Value,
    pub from: ContextId,
    pub to: ContextId,
}

impl Envelope {
    pub fn new(action_type: ActionKind, message: Value, from: ContextId, to: ContextId) -> Self {
        Self {
            action_type,
            message,
            from,
            to,
        }
    }

    pub fn is_for(&self, me: ContextId) -> bool {
        self.to == me
    }
}
