//! Cross-context message routing.
//!
//! Envelopes for the page go to the active tab through the host-script
//! channel; everything else is broadcast on the runtime channel, where both
//! the panel and the background receive it and filter on `to` themselves.

use async_trait::async_trait;
use flowcap_common::events::TabInfo;
use flowcap_common::protocol::{ActionKind, ContextId, Envelope};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// One-shot reply callback.
pub type Responder = Box<dyn FnOnce(Value) + Send>;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No active tab to deliver to")]
    NoActiveTab,
    #[error("Delivery channel closed")]
    ChannelClosed,
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// Delivery into the page of a browser tab.
#[async_trait]
pub trait HostChannel: Send + Sync {
    async fn active_tab(&self) -> Result<Option<TabInfo>, RouterError>;

    async fn send_to_tab(
        &self,
        tab_id: i64,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError>;
}

/// Broadcast to the extension's own long-lived contexts.
#[async_trait]
pub trait RuntimeChannel: Send + Sync {
    async fn broadcast(
        &self,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError>;
}

#[derive(Clone)]
pub struct MessageRouter {
    host: Arc<dyn HostChannel>,
    runtime: Arc<dyn RuntimeChannel>,
}

impl MessageRouter {
    pub fn new(host: Arc<dyn HostChannel>, runtime: Arc<dyn RuntimeChannel>) -> Self {
        Self { host, runtime }
    }

    pub async fn active_tab(&self) -> Result<Option<TabInfo>, RouterError> {
        self.host.active_tab().await
    }

    /// Fire-and-forget delivery. `callback` runs at most once, whenever the
    /// receiver answers; it may never run.
    pub async fn send_request(
        &self,
        action: ActionKind,
        message: Value,
        from: ContextId,
        to: ContextId,
        callback: Option<Responder>,
    ) -> Result<(), RouterError> {
        let envelope = Envelope::new(action, message, from, to);
        debug!(?action, ?from, ?to, "routing envelope");
        match to {
            ContextId::Page => {
                let tab = self.host.active_tab().await?.ok_or(RouterError::NoActiveTab)?;
                self.host.send_to_tab(tab.id, envelope, callback).await
            }
            ContextId::Background | ContextId::Panel => {
                self.runtime.broadcast(envelope, callback).await
            }
        }
    }

    /// Like `send_request`, with the callback turned into a receiver.
    /// There is no timeout: the receiver resolves with an error only if the
    /// callback is dropped unanswered.
    pub async fn request(
        &self,
        action: ActionKind,
        message: Value,
        from: ContextId,
        to: ContextId,
    ) -> Result<oneshot::Receiver<Value>, RouterError> {
        let (tx, rx) = oneshot::channel();
        let callback: Responder = Box::new(move |value| {
            let _ = tx.send(value);
        });
        self.send_request(action, message, from, to, Some(callback))
            .await?;
        Ok(rx)
    }
}
