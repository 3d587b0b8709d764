#![allow(dead_code)]

use async_trait::async_trait;
use flowcap_engine::events::{BeforeRequestDetails, SendHeadersDetails, TabInfo};
use flowcap_engine::protocol::{ActionKind, Envelope};
use flowcap_engine::router::{HostChannel, MessageRouter, Responder, RouterError, RuntimeChannel};
use flowcap_engine::store::{ActionStore, MemoryStore, StoreError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Host side of a single browser window. Answers page requests from a
/// canned reply table and keeps every delivery.
#[derive(Default)]
pub struct FakeHost {
    pub tab: Option<TabInfo>,
    replies: HashMap<ActionKind, Value>,
    pub sent: Mutex<Vec<(i64, Envelope)>>,
    pub tab_queries: Mutex<usize>,
}

impl FakeHost {
    pub fn with_tab(id: i64, url: &str) -> Self {
        Self {
            tab: Some(TabInfo {
                id,
                url: url.to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn reply(mut self, kind: ActionKind, value: Value) -> Self {
        self.replies.insert(kind, value);
        self
    }

    pub fn sent_kinds(&self) -> Vec<ActionKind> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, env)| env.action_type)
            .collect()
    }
}

#[async_trait]
impl HostChannel for FakeHost {
    async fn active_tab(&self) -> Result<Option<TabInfo>, RouterError> {
        *self.tab_queries.lock().unwrap() += 1;
        Ok(self.tab.clone())
    }

    async fn send_to_tab(
        &self,
        tab_id: i64,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError> {
        let reply = self.replies.get(&envelope.action_type).cloned();
        self.sent.lock().unwrap().push((tab_id, envelope));
        if let (Some(responder), Some(reply)) = (responder, reply) {
            responder(reply);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    pub sent: Mutex<Vec<Envelope>>,
}

impl FakeRuntime {
    pub fn sent_kinds(&self) -> Vec<ActionKind> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|env| env.action_type)
            .collect()
    }

    pub fn last(&self, kind: ActionKind) -> Option<Envelope> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|env| env.action_type == kind)
            .cloned()
    }
}

#[async_trait]
impl RuntimeChannel for FakeRuntime {
    async fn broadcast(
        &self,
        envelope: Envelope,
        _responder: Option<Responder>,
    ) -> Result<(), RouterError> {
        self.sent.lock().unwrap().push(envelope);
        Ok(())
    }
}

pub fn router(host: &Arc<FakeHost>, runtime: &Arc<FakeRuntime>) -> MessageRouter {
    MessageRouter::new(host.clone(), runtime.clone())
}

/// Store whose every call fails.
pub struct FailingStore;

#[async_trait]
impl ActionStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Err(StoreError::Unavailable("disk gone".into()))
    }

    async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk gone".into()))
    }

    async fn remove(&self, _keys: &[&str]) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk gone".into()))
    }
}

/// Memory store that logs every write.
#[derive(Default)]
pub struct WriteLog {
    inner: MemoryStore,
    pub writes: Mutex<Vec<(String, Value)>>,
}

impl WriteLog {
    pub fn writes_to(&self, key: &str) -> Vec<Value> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl ActionStore for WriteLog {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.clone()));
        self.inner.set(key, value).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.inner.remove(keys).await
    }
}

pub fn before_request(id: &str, method: &str, url: &str, body: Option<&str>) -> BeforeRequestDetails {
    let mut details = json!({
        "requestId": id,
        "url": url,
        "method": method,
        "type": "xmlhttprequest",
        "frameType": "outermost_frame",
        "tabId": 7,
    });
    if let Some(encoded) = body {
        details["requestBody"] = json!({ "raw": [{ "bytes": encoded }] });
    }
    serde_json::from_value(details).unwrap()
}

pub fn send_headers(id: &str, method: &str, url: &str) -> SendHeadersDetails {
    serde_json::from_value(json!({
        "requestId": id,
        "url": url,
        "method": method,
        "type": "xmlhttprequest",
        "frameType": "outermost_frame",
        "tabId": 7,
        "requestHeaders": [
            { "name": "Accept", "value": "application/json;odata=verbose" },
            { "name": "X-RequestDigest", "value": "0x1234" }
        ]
    }))
    .unwrap()
}

/// Cloneable holder for a responder; the first `reply` wins.
#[derive(Clone, Default)]
pub struct ReplySlot(Arc<Mutex<Option<Responder>>>);

impl ReplySlot {
    pub fn new(responder: Option<Responder>) -> Self {
        Self(Arc::new(Mutex::new(responder)))
    }

    pub fn reply(&self, value: Value) -> bool {
        let responder = self.0.lock().unwrap().take();
        match responder {
            Some(responder) => {
                responder(value);
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct RuntimeDelivery {
    pub envelope: Envelope,
    pub reply: ReplySlot,
}

/// In-process runtime channel standing in for the extension runtime: every
/// subscriber sees every envelope and filters on `to` itself.
#[derive(Clone)]
pub struct RuntimeBus {
    tx: broadcast::Sender<RuntimeDelivery>,
}

impl RuntimeBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeDelivery> {
        self.tx.subscribe()
    }
}

impl Default for RuntimeBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl RuntimeChannel for RuntimeBus {
    async fn broadcast(
        &self,
        envelope: Envelope,
        responder: Option<Responder>,
    ) -> Result<(), RouterError> {
        let delivery = RuntimeDelivery {
            envelope,
            reply: ReplySlot::new(responder),
        };
        // nobody listening loses the message, like the real runtime
        let _ = self.tx.send(delivery);
        Ok(())
    }
}
