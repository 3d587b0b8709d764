//! Frames exchanged over the WebSocket between the engine and the
//! JavaScript shim running inside the extension.

use crate::events::{BeforeRequestDetails, SendHeadersDetails, TabInfo};
use crate::protocol::Envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shim -> engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShimFrame {
    BeforeRequest(BeforeRequestDetails),
    BeforeSendHeaders(SendHeadersDetails),
    ActiveTab {
        reply_id: u64,
        #[serde(default)]
        tab: Option<TabInfo>,
    },
    Reply {
        reply_id: u64,
        #[serde(default)]
        message: Value,
    },
    /// An envelope raised by the page or panel through the runtime channel.
    RuntimeMessage {
        envelope: Envelope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_id: Option<u64>,
    },
}

/// Engine -> shim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineFrame {
    SendToTab {
        tab_id: i64,
        envelope: Envelope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_id: Option<u64>,
    },
    Broadcast {
        envelope: Envelope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reply_id: Option<u64>,
    },
    QueryActiveTab {
        reply_id: u64,
    },
    Reply {
        reply_id: u64,
        message: Value,
    },
}
