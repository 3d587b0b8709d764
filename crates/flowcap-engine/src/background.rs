//! The background context: owns the capture session and answers commands
//! raised by the panel or the page.

use crate::capture::CapturePipeline;
use crate::clipboard;
use crate::config::CaptureConfig;
use crate::favorites;
use crate::router::MessageRouter;
use crate::settings::SettingsStore;
use crate::store::{ActionCollections, ActionStore, Collection};
use flowcap_common::action::ActionRecord;
use flowcap_common::events::{BeforeRequestDetails, SendHeadersDetails};
use flowcap_common::protocol::{ActionKind, ContextId, Envelope};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

const NO_PAGE_REPLY: &str = "The page did not answer in time";

pub struct BackgroundService {
    pipeline: CapturePipeline,
    collections: ActionCollections,
    settings: SettingsStore,
    router: MessageRouter,
    page_timeout: Duration,
}

impl BackgroundService {
    pub fn new(store: Arc<dyn ActionStore>, router: MessageRouter, config: &CaptureConfig) -> Self {
        Self {
            pipeline: CapturePipeline::new(store.clone(), router.clone(), config),
            collections: ActionCollections::new(store.clone()),
            settings: SettingsStore::new(store),
            router,
            page_timeout: Duration::from_millis(config.page_check_timeout_ms),
        }
    }

    pub async fn restore(&mut self) {
        self.pipeline.restore().await;
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub async fn on_before_request(&mut self, details: BeforeRequestDetails) {
        self.pipeline.on_before_request(details).await;
    }

    pub async fn on_before_send_headers(
        &mut self,
        details: SendHeadersDetails,
    ) -> Option<ActionRecord> {
        self.pipeline.on_before_send_headers(details).await
    }

    pub async fn tick(&mut self, now: Instant) {
        self.pipeline.expire_if_due(now).await;
    }

    /// Handles one envelope. Envelopes addressed elsewhere are ignored.
    /// Returns the reply for the sender, if the command has one.
    pub async fn handle(&mut self, envelope: Envelope) -> Option<Value> {
        if !envelope.is_for(ContextId::Background) {
            debug!(
                action = ?envelope.action_type,
                to = ?envelope.to,
                "ignoring envelope addressed to another context"
            );
            return None;
        }

        match envelope.action_type {
            ActionKind::StartRecording => {
                self.pipeline.start().await;
                Some(self.recording_state())
            }
            ActionKind::StopRecording => {
                self.pipeline.stop().await;
                Some(self.recording_state())
            }
            ActionKind::GetRecordingState => Some(self.recording_state()),
            ActionKind::DeleteAction => {
                let id = message_id(&envelope.message)?;
                let deleted = self.collections.delete(Collection::Recorded, id).await;
                self.announce(ActionKind::ActionListUpdated, Collection::Recorded)
                    .await;
                Some(json!({ "deleted": deleted }))
            }
            ActionKind::ClearActions => {
                let cleared = self.collections.clear(Collection::Recorded).await;
                self.announce(ActionKind::ActionListUpdated, Collection::Recorded)
                    .await;
                Some(json!({ "cleared": cleared }))
            }
            ActionKind::DeleteClipboardAction => {
                let id = message_id(&envelope.message)?;
                let deleted = self.collections.delete(Collection::Clipboard, id).await;
                self.announce(ActionKind::ClipboardListUpdated, Collection::Clipboard)
                    .await;
                Some(json!({ "deleted": deleted }))
            }
            ActionKind::ToggleFavorite => {
                let id = message_id(&envelope.message)?;
                let state = favorites::toggle_favorite(&self.collections, id).await;
                Some(json!({ "isFavorite": state }))
            }
            ActionKind::CheckTargetPage => {
                // the panel saw the tab navigate
                self.pipeline.invalidate_page_check();
                None
            }
            ActionKind::GetClipboardElements => Some(self.refresh_clipboard().await),
            ActionKind::CopyAction => {
                let id = message_id(&envelope.message)?;
                Some(self.copy_action(id).await)
            }
            other => {
                debug!(action = ?other, "no background handler");
                None
            }
        }
    }

    async fn refresh_clipboard(&self) -> Value {
        let refresh =
            clipboard::refresh_clipboard(&self.router, &self.collections, ContextId::Background);
        match timeout(self.page_timeout, refresh).await {
            Ok(Ok(records)) => json!({ "count": records.len() }),
            Ok(Err(e)) => {
                warn!("Failed to read the editor clipboard: {}", e);
                json!({ "error": e.to_string() })
            }
            Err(_) => json!({ "error": NO_PAGE_REPLY }),
        }
    }

    async fn copy_action(&self, id: &str) -> Value {
        let Some(record) = self.find(id).await else {
            return json!({ "copied": false, "error": format!("No action with id {}", id) });
        };
        let settings = self.settings.load().await;
        let copy = clipboard::copy_action(&self.router, &settings, &record, ContextId::Background);
        match timeout(self.page_timeout, copy).await {
            Ok(Ok(editor)) => json!({ "copied": true, "editor": editor }),
            Ok(Err(e)) => {
                warn!(id, "Failed to copy action: {}", e);
                json!({ "copied": false, "error": e.to_string() })
            }
            Err(_) => json!({ "copied": false, "error": NO_PAGE_REPLY }),
        }
    }

    async fn find(&self, id: &str) -> Option<ActionRecord> {
        for collection in [
            Collection::Recorded,
            Collection::Favorites,
            Collection::Clipboard,
        ] {
            if let Some(record) = self.collections.get(collection, id).await {
                return Some(record);
            }
        }
        None
    }

    fn recording_state(&self) -> Value {
        json!({ "recording": self.pipeline.is_recording() })
    }

    async fn announce(&self, kind: ActionKind, collection: Collection) {
        let records = self.collections.list(collection).await;
        let message = match serde_json::to_value(&records) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to serialize {}: {}", collection.key(), e);
                return;
            }
        };
        if let Err(e) = self
            .router
            .send_request(kind, message, ContextId::Background, ContextId::Panel, None)
            .await
        {
            warn!("Failed to announce {}: {}", collection.key(), e);
        }
    }
}

/// Accepts `"id"` or `{"id": "..."}`.
fn message_id(message: &Value) -> Option<&str> {
    let id = message
        .as_str()
        .or_else(|| message.get("id").and_then(Value::as_str));
    if id.is_none() {
        warn!("command without an action id: {}", message);
    }
    id
}
