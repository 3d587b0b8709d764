use crate::replies::PendingReplies;
use crate::server::ServerHandle;
use flowcap_common::bridge::{EngineFrame, ShimFrame};
use flowcap_common::protocol::ContextId;
use flowcap_engine::background::BackgroundService;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Feeds frames from the shim into the background service, one at a time.
pub struct Session {
    service: BackgroundService,
    command_tx: broadcast::Sender<EngineFrame>,
    frames: Arc<Mutex<mpsc::UnboundedReceiver<ShimFrame>>>,
    replies: PendingReplies,
    expiry_tick: Duration,
}

impl Session {
    pub fn new(service: BackgroundService, handle: &ServerHandle, expiry_tick: Duration) -> Self {
        Self {
            service,
            command_tx: handle.command_tx.clone(),
            frames: handle.frame_rx.clone(),
            replies: handle.replies.clone(),
            expiry_tick,
        }
    }

    pub fn service(&self) -> &BackgroundService {
        &self.service
    }

    /// Runs until the frame queue closes. The recording-duration cap is
    /// also checked on a timer, so an idle page still stops recording.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.expiry_tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let frames = self.frames.clone();
        let mut frames = frames.lock().await;
        info!("Background session started");

        loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => self.dispatch(frame).await,
                    None => {
                        info!("Bridge closed, ending session");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.service.tick(Instant::now()).await;
                }
            }
        }
    }

    pub async fn dispatch(&mut self, frame: ShimFrame) {
        match frame {
            ShimFrame::BeforeRequest(details) => {
                self.service.on_before_request(details).await;
            }
            ShimFrame::BeforeSendHeaders(details) => {
                self.service.on_before_send_headers(details).await;
            }
            ShimFrame::RuntimeMessage { envelope, reply_id } => {
                let addressed = envelope.is_for(ContextId::Background);
                let reply = self.service.handle(envelope).await;
                // a sender waiting on us gets an answer even if it is empty
                if addressed && let Some(reply_id) = reply_id {
                    self.reply(reply_id, reply.unwrap_or(Value::Null));
                }
            }
            // normally resolved by the connection task already
            ShimFrame::Reply { reply_id, message } => {
                self.replies.resolve(reply_id, message);
            }
            ShimFrame::ActiveTab { reply_id, tab } => {
                self.replies
                    .resolve(reply_id, serde_json::to_value(tab).unwrap_or_default());
            }
        }
    }

    fn reply(&self, reply_id: u64, message: Value) {
        debug!(reply_id, "replying to shim");
        if self
            .command_tx
            .send(EngineFrame::Reply { reply_id, message })
            .is_err()
        {
            warn!(reply_id, "No shim connected to take the reply");
        }
    }
}
