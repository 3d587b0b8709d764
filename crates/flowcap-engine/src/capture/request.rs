use crate::synthesizer::RequestBody;
use flowcap_common::events::{HttpHeader, SendHeadersDetails};

/// A request observed on the wire, assembled from its headers event and the
/// body buffered at the pre-flight event.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRequest {
    pub request_id: String,
    pub url: String,
    pub method: String,
    pub request_headers: Vec<HttpHeader>,
    pub raw_body: Option<Vec<u8>>,
    pub frame_type: Option<String>,
    pub resource_type: String,
}

impl CapturedRequest {
    pub fn from_parts(details: SendHeadersDetails, raw_body: Option<Vec<u8>>) -> Self {
        Self {
            request_id: details.request_id,
            url: details.url,
            method: details.method,
            request_headers: details.request_headers,
            raw_body,
            frame_type: details.frame_type,
            resource_type: details.resource_type,
        }
    }

    pub fn body(&self) -> Option<RequestBody> {
        self.raw_body.as_deref().and_then(RequestBody::from_bytes)
    }
}
