use crate::replies::PendingReplies;
use flowcap_common::bridge::{EngineFrame, ShimFrame};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to bind bridge: {0}")]
    Io(#[from] std::io::Error),
}

/// WebSocket endpoint the extension shim connects to.
///
/// Frames for the shim go out on a broadcast channel (one sender, usually
/// one connection). Events and runtime messages from the shim come back on
/// an unbounded queue, so reading the socket never waits on the session and
/// replies are always resolved on the spot.
#[derive(Clone)]
pub struct BridgeServer {
    port: u16,
    command_tx: broadcast::Sender<EngineFrame>,
    replies: PendingReplies,
}

pub struct ServerHandle {
    pub local_addr: SocketAddr,
    pub command_tx: broadcast::Sender<EngineFrame>,
    pub frame_rx: Arc<Mutex<mpsc::UnboundedReceiver<ShimFrame>>>,
    pub replies: PendingReplies,
}

impl BridgeServer {
    /// Port 0 picks a free port; see `ServerHandle::local_addr`.
    pub fn new(port: u16) -> Self {
        let (command_tx, _) = broadcast::channel(100);
        Self {
            port,
            command_tx,
            replies: PendingReplies::new(),
        }
    }

    pub async fn start(&self) -> Result<ServerHandle, BridgeError> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Bridge listening on: {}", local_addr);

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let server_cmd_tx = self.command_tx.clone();
        let replies = self.replies.clone();
        let live = Arc::new(AtomicUsize::new(0));

        tokio::spawn(async move {
            debug!("Bridge accept loop started");
            while let Ok((stream, peer)) = listener.accept().await {
                info!("Accepted TCP connection from: {}", peer);
                let cmd_rx = server_cmd_tx.subscribe();
                let frame_tx = frame_tx.clone();
                let replies = replies.clone();
                let live = live.clone();
                live.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    accept_connection(stream, cmd_rx, frame_tx, replies.clone()).await;
                    // a reconnected shim may still answer, only the last one out cancels
                    if live.fetch_sub(1, Ordering::SeqCst) == 1 {
                        let dropped = replies.cancel_all();
                        if dropped > 0 {
                            debug!(dropped, "dropped unanswered requests");
                        }
                    }
                });
            }
        });

        Ok(ServerHandle {
            local_addr,
            command_tx: self.command_tx.clone(),
            frame_rx: Arc::new(Mutex::new(frame_rx)),
            replies: self.replies.clone(),
        })
    }
}

async fn accept_connection(
    stream: TcpStream,
    mut cmd_rx: broadcast::Receiver<EngineFrame>,
    frame_tx: mpsc::UnboundedSender<ShimFrame>,
    replies: PendingReplies,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("Error during the websocket handshake occurred: {}", e);
            return;
        }
    };

    info!("Shim connected");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // engine -> shim
            cmd = cmd_rx.recv() => match cmd {
                Ok(frame) => {
                    let json = match serde_json::to_string(&frame) {
                        Ok(json) => json,
                        Err(e) => {
                            error!("Failed to encode frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = ws_sender.send(Message::Text(json)).await {
                        error!("Failed to send message to WS: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Shim connection fell behind, frames dropped");
                }
                Err(RecvError::Closed) => break,
            },

            // shim -> engine
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ShimFrame>(&text) {
                    Ok(ShimFrame::Reply { reply_id, message }) => {
                        replies.resolve(reply_id, message);
                    }
                    Ok(ShimFrame::ActiveTab { reply_id, tab }) => {
                        replies.resolve(reply_id, serde_json::to_value(tab).unwrap_or_default());
                    }
                    Ok(frame) => {
                        if let Err(e) = frame_tx.send(frame) {
                            error!("Failed to forward frame to session: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to parse frame from shim: {} | Text: {}", e, text);
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Shim disconnected");
                    break;
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}
