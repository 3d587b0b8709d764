//! Payloads of the host browser's request lifecycle events, as forwarded by
//! the extension shim.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One chunk of a raw upload. The shim encodes the ArrayBuffer as base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestBodyDetails {
    #[serde(default)]
    pub raw: Vec<UploadChunk>,
}

/// Fired before the request is sent; the only phase that exposes the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeforeRequestDetails {
    pub request_id: String,
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default = "default_tab_id")]
    pub tab_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDetails>,
}

impl BeforeRequestDetails {
    /// Concatenates every decodable upload chunk. Chunks that fail to decode
    /// are skipped; `None` when nothing was uploaded.
    pub fn raw_body(&self) -> Option<Vec<u8>> {
        let body = self.request_body.as_ref()?;
        let mut out = Vec::new();
        for chunk in &body.raw {
            if let Some(encoded) = &chunk.bytes
                && let Ok(bytes) = STANDARD.decode(encoded)
            {
                out.extend_from_slice(&bytes);
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }
}

/// Fired once the request headers are final.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendHeadersDetails {
    pub request_id: String,
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default = "default_tab_id")]
    pub tab_id: i64,
    #[serde(default)]
    pub request_headers: Vec<HttpHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: i64,
    #[serde(default)]
    pub url: String,
}

fn default_tab_id() -> i64 {
    -1
}
