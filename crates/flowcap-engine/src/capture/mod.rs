//! Turns observed network traffic into recorded actions.
//!
//! The body of a request is only visible at the pre-flight event, its final
//! headers only at the later headers event. Bodies are buffered by request id
//! and joined with their headers once those arrive.

pub mod buffer;
pub mod request;

use crate::classifier::{TemplateKind, classify, classify_parts, get_title};
use crate::config::CaptureConfig;
use crate::router::MessageRouter;
use crate::settings::{PageDetectionMode, SettingsStore};
use crate::store::{ActionCollections, ActionStore, Collection, IS_RECORDING_KEY};
use crate::synthesizer::{HeaderSet, synthesize};
use buffer::PendingBodies;
use flowcap_common::action::ActionRecord;
use flowcap_common::events::{BeforeRequestDetails, SendHeadersDetails};
use flowcap_common::protocol::{ActionKind, ContextId};
use request::CapturedRequest;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Action {0} was not persisted (duplicate id or storage failure)")]
    NotPersisted(String),
    #[error("Failed to serialize action: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Last target-page verdict, keyed by the tab URL it was computed for.
#[derive(Debug, Default)]
struct PageGate {
    tab_url: Option<String>,
    is_target: bool,
}

/// One capture session per background context.
pub struct CapturePipeline {
    store: Arc<dyn ActionStore>,
    collections: ActionCollections,
    settings: SettingsStore,
    router: MessageRouter,
    pending: PendingBodies,
    gate: PageGate,
    state: CaptureState,
    recording_since: Option<Instant>,
    max_duration: Option<Duration>,
    page_check_timeout: Duration,
}

impl CapturePipeline {
    pub fn new(store: Arc<dyn ActionStore>, router: MessageRouter, config: &CaptureConfig) -> Self {
        Self {
            collections: ActionCollections::new(store.clone()),
            settings: SettingsStore::new(store.clone()),
            store,
            router,
            pending: PendingBodies::new(config.max_pending),
            gate: PageGate::default(),
            state: CaptureState::Idle,
            recording_since: None,
            max_duration: None,
            page_check_timeout: Duration::from_millis(config.page_check_timeout_ms),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Picks up the persisted recording flag; a missing or unreadable flag
    /// means idle.
    pub async fn restore(&mut self) {
        let recording = match self.store.get(IS_RECORDING_KEY).await {
            Ok(value) => value.and_then(|v| v.as_bool()).unwrap_or(false),
            Err(e) => {
                warn!("Failed to read recording flag: {}", e);
                false
            }
        };
        if recording {
            self.enter_recording().await;
            info!("Recording resumed from persisted state");
        }
    }

    pub async fn start(&mut self) {
        self.enter_recording().await;
        self.persist_flag(true).await;
        info!(max_duration = ?self.max_duration, "Recording started");
        self.announce_state().await;
    }

    /// Buffered pre-flight bodies are kept, so a request already in flight
    /// can still produce one more action after this returns.
    pub async fn stop(&mut self) {
        self.state = CaptureState::Idle;
        self.recording_since = None;
        self.persist_flag(false).await;
        info!("Recording stopped");
        self.announce_state().await;
    }

    /// Stops recording once the configured duration has elapsed.
    pub async fn expire_if_due(&mut self, now: Instant) -> bool {
        let due = match (self.state, self.recording_since, self.max_duration) {
            (CaptureState::Recording, Some(since), Some(max)) => {
                now.saturating_duration_since(since) >= max
            }
            _ => false,
        };
        if due {
            info!("Recording duration cap reached");
            self.stop().await;
        }
        due
    }

    pub fn invalidate_page_check(&mut self) {
        self.gate = PageGate::default();
    }

    pub async fn on_before_request(&mut self, details: BeforeRequestDetails) {
        if !self.is_recording() || self.expire_if_due(Instant::now()).await {
            return;
        }
        if classify_parts(
            &details.url,
            &details.resource_type,
            details.frame_type.as_deref(),
        )
        .is_none()
        {
            return;
        }
        let body = details.raw_body();
        self.pending.insert(details.request_id, body);
    }

    /// Correlates, classifies and records one request. Failures are logged
    /// and confined to this request.
    pub async fn on_before_send_headers(
        &mut self,
        details: SendHeadersDetails,
    ) -> Option<ActionRecord> {
        if self.is_recording() {
            self.expire_if_due(Instant::now()).await;
        }
        let buffered = self.pending.take(&details.request_id);
        if !self.is_recording() && buffered.is_none() {
            return None;
        }

        let request = CapturedRequest::from_parts(details, buffered.flatten());
        let kind = classify(&request)?;
        if !self.is_target_page().await {
            debug!(url = %request.url, "skipping request outside the target page");
            return None;
        }

        match self.record(request, kind).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Failed to record request: {}", e);
                None
            }
        }
    }

    async fn record(
        &mut self,
        request: CapturedRequest,
        kind: TemplateKind,
    ) -> Result<ActionRecord, CaptureError> {
        let title = get_title(&request.url);
        let body = request.body();
        let headers = HeaderSet::OrderedPairs(request.request_headers.clone());
        let synthesized = synthesize(
            kind,
            &request.method,
            &request.url,
            &headers,
            &title,
            body.as_ref(),
        );

        let record = ActionRecord {
            id: request.request_id,
            url: request.url,
            method: request.method,
            title,
            icon: synthesized.icon,
            action_json: synthesized.action_json,
            body: body.map(|b| b.to_value()),
            is_selected: false,
            is_favorite: None,
            category: Some(kind.label().to_string()),
        };

        if !self.collections.add(Collection::Recorded, record.clone()).await {
            return Err(CaptureError::NotPersisted(record.id));
        }
        info!(id = %record.id, kind = kind.label(), title = %record.title, "Recorded action");

        // the panel re-renders from the full list
        let message = serde_json::to_value(self.collections.list(Collection::Recorded).await)?;
        if let Err(e) = self
            .router
            .send_request(
                ActionKind::ActionListUpdated,
                message,
                ContextId::Background,
                ContextId::Panel,
                None,
            )
            .await
        {
            warn!("Failed to announce recorded action: {}", e);
        }
        Ok(record)
    }

    /// Whether the active tab is the target page. The verdict is cached per
    /// tab URL so the page is only asked again after navigation.
    async fn is_target_page(&mut self) -> bool {
        if self.settings.load().await.mode() == PageDetectionMode::OverrideRecording {
            return true;
        }

        let tab = match self.router.active_tab().await {
            Ok(Some(tab)) => tab,
            Ok(None) => return false,
            Err(e) => {
                warn!("Failed to query active tab: {}", e);
                return false;
            }
        };
        if self.gate.tab_url.as_deref() == Some(tab.url.as_str()) {
            return self.gate.is_target;
        }

        let reply = match self
            .router
            .request(
                ActionKind::CheckTargetPage,
                Value::Null,
                ContextId::Background,
                ContextId::Page,
            )
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to ask page for its type: {}", e);
                return false;
            }
        };

        match tokio::time::timeout(self.page_check_timeout, reply).await {
            Ok(Ok(value)) => {
                let is_target = value
                    .as_bool()
                    .or_else(|| value.get("isTarget").and_then(Value::as_bool))
                    .unwrap_or(false);
                self.gate = PageGate {
                    tab_url: Some(tab.url),
                    is_target,
                };
                is_target
            }
            // unanswered checks are not cached, the next request asks again
            _ => {
                debug!(url = %tab.url, "page type check went unanswered");
                false
            }
        }
    }

    async fn enter_recording(&mut self) {
        self.state = CaptureState::Recording;
        self.recording_since = Some(Instant::now());
        self.max_duration = self
            .settings
            .load()
            .await
            .max_recording_minutes
            .map(|m| Duration::from_secs(m.saturating_mul(60)));
    }

    async fn persist_flag(&self, recording: bool) {
        if let Err(e) = self.store.set(IS_RECORDING_KEY, Value::Bool(recording)).await {
            warn!("Failed to persist recording flag: {}", e);
        }
    }

    async fn announce_state(&self) {
        if let Err(e) = self
            .router
            .send_request(
                ActionKind::RecordingStateChanged,
                json!({ "recording": self.is_recording() }),
                ContextId::Background,
                ContextId::Panel,
                None,
            )
            .await
        {
            warn!("Failed to announce recording state: {}", e);
        }
    }
}
