use crate::replies::PendingReplies;
use crate::server::ServerHandle;
use async_trait::async_trait;
use flowcap_common::bridge::EngineFrame;
use flowcap_common::events::TabInfo;
use flowcap_common::protocol::Envelope;
use flowcap_engine::router::{HostChannel, Responder, RouterError, RuntimeChannel};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

/// Host and runtime channel backed by the shim connection.
#[derive(Clone)]
pub struct BridgeChannel {
    command_tx: broadcast::Sender<EngineFrame>,
    replies: PendingReplies,
    query_timeout: Duration,
}

impl BridgeChannel {
    pub fn new(handle: &ServerHandle, query_timeout: Duration) -> Self {
        Self {
            command_tx: handle.command_tx.clone(),
            replies: handle.replies.clone(),
            query_timeout,
        }
    }

    /// Fails when no shim is connected.
    fn send(&self, frame: EngineFrame) -> Result<(), RouterError> {
        self.command_tx
            .send(frame)
            .map(|_| ())
            .map_err(|_| RouterError::ChannelClosed)
    }

    fn send_with_reply(
        &self,
        responder: Option<Responder>,
        frame: impl FnOnce(Option<u64>) -> EngineFrame,
    ) -> Result<(), RouterError> {
        let reply_id = responder.map(|r| self.replies.register(r));
        let result = self.send(frame(reply_id));
        if result.is_err()
            && let Some(id) = reply_id
        {
            self.replies.cancel(id);
        }
        result
    }
}

#[async_trait]
impl HostChannel for BridgeChannel {
    async fn active_tab(&self) -> Result<Option<TabInfo>, RouterError> {
        let (tx, rx) = oneshot::channel();
        let reply_id = self.replies.register(Box::new(move |value| {
            let _ = tx.send(value);
        }));
        if let Err(e) = self.send(EngineFrame::QueryActiveTab { reply_id }) {
            self.replies.cancel(reply_id);
            return Err(e);
        }

        match tokio::time::timeout(self.query_timeout, rx).await {
            Ok(Ok(value)) => {
                serde_json::from_value(value).map_err(|e| RouterError::Delivery(e.to_string()))
            }
            Ok(Err(_)) => Err(RouterError::ChannelClosed),
            Err(_) => {
                self.replies.cancel(reply_id);
                Err(RouterError::Timeout("active tab"))
            }
        }
    }

    async fn send_to_tab(
        &self,
        tab_id: i64,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError> {
        self.send_with_reply(responder, |reply_id| EngineFrame::SendToTab {
            tab_id,
            envelope,
            reply_id,
        })
    }
}

#[async_trait]
impl RuntimeChannel for BridgeChannel {
    async fn broadcast(
        &self,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError> {
        self.send_with_reply(responder, |reply_id| EngineFrame::Broadcast {
            envelope,
            reply_id,
        })
    }
}
