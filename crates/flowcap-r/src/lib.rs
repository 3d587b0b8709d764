//! Remote host for the background context: the extension keeps a thin
//! shim that forwards browser events over a WebSocket, and everything
//! else runs here.

pub mod channel;
pub mod replies;
pub mod server;
pub mod session;

use channel::BridgeChannel;
use flowcap_engine::background::BackgroundService;
use flowcap_engine::config::FlowcapConfig;
use flowcap_engine::router::MessageRouter;
use flowcap_engine::store::ActionStore;
use server::{BridgeError, BridgeServer};
use session::Session;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Binds the bridge and wires a background session to it. Nothing is
/// processed until `Session::run` is awaited.
pub async fn launch(
    config: &FlowcapConfig,
    store: Arc<dyn ActionStore>,
) -> Result<(SocketAddr, Session), BridgeError> {
    let handle = BridgeServer::new(config.bridge.port).start().await?;
    let channel = Arc::new(BridgeChannel::new(
        &handle,
        Duration::from_millis(config.bridge.query_timeout_ms),
    ));
    let router = MessageRouter::new(channel.clone(), channel);

    let mut service = BackgroundService::new(store, router, &config.capture);
    service.restore().await;

    let tick = Duration::from_secs(config.capture.expiry_tick_secs.max(1));
    Ok((handle.local_addr, Session::new(service, &handle, tick)))
}
