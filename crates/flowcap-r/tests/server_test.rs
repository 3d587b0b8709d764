use flowcap_common::bridge::{EngineFrame, ShimFrame};
use flowcap_common::events::TabInfo;
use flowcap_common::protocol::{ActionKind, ContextId, Envelope};
use flowcap_engine::config::FlowcapConfig;
use flowcap_engine::router::{HostChannel, RouterError};
use flowcap_engine::store::{ActionCollections, Collection, MemoryStore};
use flowcap_r::channel::BridgeChannel;
use flowcap_r::server::BridgeServer;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use serial_test::serial;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Shim = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect_shim(addr: SocketAddr) -> Shim {
    let url = format!("ws://{}", addr);
    for _ in 0..10 {
        if let Ok((ws_stream, _)) = connect_async(&url).await {
            return ws_stream;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("Failed to connect simulated shim");
}

async fn send(shim: &mut Shim, frame: ShimFrame) {
    let text = serde_json::to_string(&frame).unwrap();
    shim.send(Message::Text(text)).await.unwrap();
}

async fn next_frame(shim: &mut Shim) -> EngineFrame {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), shim.next())
            .await
            .expect("Timeout waiting for engine frame")
            .expect("Shim stream ended")
            .expect("WS error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("Failed to decode engine frame");
        }
    }
}

fn sharepoint_tab() -> TabInfo {
    TabInfo {
        id: 5,
        url: "https://contoso.sharepoint.com/sites/team".into(),
    }
}

#[tokio::test]
#[serial]
async fn test_frames_flow_both_ways() {
    let handle = BridgeServer::new(0)
        .start()
        .await
        .expect("Failed to start bridge");
    let mut shim = connect_shim(handle.local_addr).await;

    handle
        .command_tx
        .send(EngineFrame::QueryActiveTab { reply_id: 9 })
        .expect("Failed to send frame");
    match next_frame(&mut shim).await {
        EngineFrame::QueryActiveTab { reply_id } => assert_eq!(reply_id, 9),
        other => panic!("Wrong frame received: {:?}", other),
    }

    let details = serde_json::from_value(json!({
        "requestId": "r1",
        "url": "https://s.com/_api/web",
        "method": "GET",
        "type": "fetch"
    }))
    .unwrap();
    send(&mut shim, ShimFrame::BeforeRequest(details)).await;

    let mut rx = handle.frame_rx.lock().await;
    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("Timeout waiting for frame")
        .expect("Channel closed");
    match received {
        ShimFrame::BeforeRequest(details) => assert_eq!(details.request_id, "r1"),
        other => panic!("Wrong frame forwarded: {:?}", other),
    }
}

#[tokio::test]
#[serial]
async fn test_replies_bypass_the_frame_queue() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let mut shim = connect_shim(handle.local_addr).await;

    let (tx, rx) = oneshot::channel();
    let reply_id = handle.replies.register(Box::new(move |value| {
        let _ = tx.send(value);
    }));
    send(
        &mut shim,
        ShimFrame::Reply {
            reply_id,
            message: json!({"isTarget": true}),
        },
    )
    .await;

    let value = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("Timeout waiting for reply")
        .unwrap();
    assert_eq!(value, json!({"isTarget": true}));
    assert!(handle.frame_rx.lock().await.try_recv().is_err());
}

#[tokio::test]
#[serial]
async fn test_active_tab_query() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let mut shim = connect_shim(handle.local_addr).await;
    let channel = BridgeChannel::new(&handle, Duration::from_secs(2));

    let answer = tokio::spawn(async move {
        if let EngineFrame::QueryActiveTab { reply_id } = next_frame(&mut shim).await {
            send(
                &mut shim,
                ShimFrame::ActiveTab {
                    reply_id,
                    tab: Some(sharepoint_tab()),
                },
            )
            .await;
        }
        shim
    });

    let tab = channel.active_tab().await.unwrap();
    assert_eq!(tab, Some(sharepoint_tab()));
    answer.await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_unanswered_query_times_out() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let _shim = connect_shim(handle.local_addr).await;
    let channel = BridgeChannel::new(&handle, Duration::from_millis(200));

    let err = channel.active_tab().await.unwrap_err();
    assert!(matches!(err, RouterError::Timeout(_)));
    assert!(handle.replies.is_empty());
}

#[tokio::test]
#[serial]
async fn test_no_shim_connected() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let channel = BridgeChannel::new(&handle, Duration::from_millis(200));
    assert!(matches!(
        channel.active_tab().await,
        Err(RouterError::ChannelClosed)
    ));
    assert!(handle.replies.is_empty());
}

#[tokio::test]
#[serial]
async fn test_replies_arrive_while_the_session_is_busy() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let mut shim = connect_shim(handle.local_addr).await;
    let channel = BridgeChannel::new(&handle, Duration::from_secs(2));

    // nothing drains the frame queue, as when the session sits in a long handler
    for i in 0..120 {
        let details = serde_json::from_value(json!({
            "requestId": format!("r{}", i),
            "url": "https://s.com/_api/web",
            "method": "GET",
            "type": "xmlhttprequest"
        }))
        .unwrap();
        send(&mut shim, ShimFrame::BeforeRequest(details)).await;
    }

    let answer = tokio::spawn(async move {
        if let EngineFrame::QueryActiveTab { reply_id } = next_frame(&mut shim).await {
            send(
                &mut shim,
                ShimFrame::ActiveTab {
                    reply_id,
                    tab: Some(sharepoint_tab()),
                },
            )
            .await;
        }
        shim
    });

    let tab = channel.active_tab().await.expect("active tab query failed");
    assert_eq!(tab, Some(sharepoint_tab()));
    answer.await.unwrap();

    let mut rx = handle.frame_rx.lock().await;
    let mut queued = 0;
    while rx.try_recv().is_ok() {
        queued += 1;
    }
    assert_eq!(queued, 120);
}

#[tokio::test]
#[serial]
async fn test_stale_connection_closing_keeps_pending_replies() {
    let handle = BridgeServer::new(0).start().await.unwrap();
    let mut stale = connect_shim(handle.local_addr).await;
    let mut live = connect_shim(handle.local_addr).await;

    let (tx, rx) = oneshot::channel();
    let reply_id = handle.replies.register(Box::new(move |value| {
        let _ = tx.send(value);
    }));

    let _ = stale.close(None).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.replies.len(), 1);

    send(
        &mut live,
        ShimFrame::Reply {
            reply_id,
            message: json!(true),
        },
    )
    .await;
    let value = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .expect("Timeout waiting for reply")
        .unwrap();
    assert_eq!(value, json!(true));

    // the last connection going away drops whatever is still waiting
    handle.replies.register(Box::new(|_| {}));
    let _ = live.close(None).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(handle.replies.is_empty());
}

#[tokio::test]
#[serial]
async fn test_recording_session_end_to_end() {
    let mut config = FlowcapConfig::default();
    config.bridge.port = 0;
    let store = Arc::new(MemoryStore::new());
    let (addr, session) = flowcap_r::launch(&config, store.clone())
        .await
        .expect("Failed to launch bridge");
    tokio::spawn(session.run());
    let mut shim = connect_shim(addr).await;

    send(
        &mut shim,
        ShimFrame::RuntimeMessage {
            envelope: Envelope::new(
                ActionKind::StartRecording,
                Value::Null,
                ContextId::Panel,
                ContextId::Background,
            ),
            reply_id: Some(1),
        },
    )
    .await;

    let mut started = false;
    let mut announced = false;
    while !(started && announced) {
        match next_frame(&mut shim).await {
            EngineFrame::Reply { reply_id: 1, message } => {
                assert_eq!(message, json!({"recording": true}));
                started = true;
            }
            EngineFrame::Broadcast { envelope, .. } => {
                assert_eq!(envelope.action_type, ActionKind::RecordingStateChanged);
                assert_eq!(envelope.to, ContextId::Panel);
                announced = true;
            }
            other => panic!("Unexpected frame: {:?}", other),
        }
    }

    let url = "https://contoso.sharepoint.com/sites/team/_api/web/lists/";
    let before = serde_json::from_value(json!({
        "requestId": "42",
        "url": url,
        "method": "POST",
        "type": "xmlhttprequest",
        "requestBody": { "raw": [{ "bytes": "eyJUaXRsZSI6IkRvY3MifQ==" }] }
    }))
    .unwrap();
    let headers = serde_json::from_value(json!({
        "requestId": "42",
        "url": url,
        "method": "POST",
        "type": "xmlhttprequest",
        "requestHeaders": [{ "name": "Accept", "value": "application/json" }]
    }))
    .unwrap();
    send(&mut shim, ShimFrame::BeforeRequest(before)).await;
    send(&mut shim, ShimFrame::BeforeSendHeaders(headers)).await;

    // play the shim: answer the tab query and the page check
    let records = loop {
        match next_frame(&mut shim).await {
            EngineFrame::QueryActiveTab { reply_id } => {
                send(
                    &mut shim,
                    ShimFrame::ActiveTab {
                        reply_id,
                        tab: Some(sharepoint_tab()),
                    },
                )
                .await;
            }
            EngineFrame::SendToTab {
                tab_id,
                envelope,
                reply_id,
            } => {
                assert_eq!(tab_id, 5);
                assert_eq!(envelope.action_type, ActionKind::CheckTargetPage);
                send(
                    &mut shim,
                    ShimFrame::Reply {
                        reply_id: reply_id.expect("page check expects an answer"),
                        message: json!(true),
                    },
                )
                .await;
            }
            EngineFrame::Broadcast { envelope, .. }
                if envelope.action_type == ActionKind::ActionListUpdated =>
            {
                break envelope.message;
            }
            other => panic!("Unexpected frame: {:?}", other),
        }
    };

    assert_eq!(records[0]["id"], "42");
    assert_eq!(records[0]["title"], "lists");
    assert_eq!(records[0]["body"], json!({"Title": "Docs"}));

    let stored = ActionCollections::new(store)
        .list(Collection::Recorded)
        .await;
    assert_eq!(stored.len(), 1);
    assert!(
        stored[0]
            .action_json
            .contains("\"parameters/uri\": \"_api/web/lists/\"")
    );
}
