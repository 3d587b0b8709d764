//! Builds workflow-action definitions from request facts.
//!
//! Output is assembled from named text templates rather than serialized from
//! a value tree: the exact layout is what the workflow editor's clipboard
//! accepts. Synthesis is deterministic and never fails.

pub mod templates;

use crate::classifier::{TemplateKind, split_rest_marker};
use flowcap_common::events::HttpHeader;
use serde_json::Value;
use templates::{Family, family, render};

/// Header collection as handed over by the caller.
///
/// Captured requests arrive as ordered name/value pairs, hand-built requests
/// as a flat map. Each variant keeps its own shape in the output.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderSet {
    OrderedPairs(Vec<HttpHeader>),
    FlatMap(Vec<(String, String)>),
}

impl Default for HeaderSet {
    fn default() -> Self {
        HeaderSet::FlatMap(Vec::new())
    }
}

impl HeaderSet {
    /// Builds a flat map from a JSON object; non-string values are rendered
    /// as their JSON text.
    pub fn from_json_object(value: &Value) -> Self {
        let pairs = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    })
                    .collect()
            })
            .unwrap_or_default();
        HeaderSet::FlatMap(pairs)
    }

    /// Compact JSON text: an array of `{"name","value"}` objects for ordered
    /// pairs, an object for a flat map. Order and casing are kept verbatim.
    pub fn to_json(&self) -> String {
        match self {
            HeaderSet::OrderedPairs(pairs) => {
                let items: Vec<String> = pairs
                    .iter()
                    .map(|h| {
                        format!(
                            "{{\"name\":{},\"value\":{}}}",
                            json_string(&h.name),
                            json_string(&h.value)
                        )
                    })
                    .collect();
                format!("[{}]", items.join(","))
            }
            HeaderSet::FlatMap(pairs) => {
                let items: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", json_string(k), json_string(v)))
                    .collect();
                format!("{{{}}}", items.join(","))
            }
        }
    }
}

/// A request body, either parsed JSON or the raw text when parsing failed.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Raw(String),
}

impl RequestBody {
    /// Parses UTF-8 bytes, falling back to the raw text.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(bytes);
        if text.is_empty() {
            return None;
        }
        Some(match serde_json::from_str::<Value>(&text) {
            Ok(value) => RequestBody::Json(value),
            Err(_) => RequestBody::Raw(text.into_owned()),
        })
    }

    /// Falsy bodies (`null`, `false`, `0`, `""`) count as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            RequestBody::Raw(text) => !text.is_empty(),
            RequestBody::Json(Value::Null) => false,
            RequestBody::Json(Value::Bool(b)) => *b,
            RequestBody::Json(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            RequestBody::Json(Value::String(s)) => !s.is_empty(),
            RequestBody::Json(_) => true,
        }
    }

    pub fn to_json(&self) -> String {
        match self {
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Raw(text) => json_string(text),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestBody::Json(value) => value.clone(),
            RequestBody::Raw(text) => Value::String(text.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    pub icon: String,
    pub action_json: String,
}

pub fn synthesize(
    kind: TemplateKind,
    method: &str,
    url: &str,
    headers: &HeaderSet,
    title: &str,
    body: Option<&RequestBody>,
) -> Synthesized {
    let family = family(kind);
    let body = body.filter(|b| b.is_truthy());
    let action_json = match kind {
        TemplateKind::GenericHttp => render_http(family, method, url, headers, title, body),
        _ => render_connector(family, kind, method, url, headers, title, body),
    };
    Synthesized {
        icon: family.icon.to_string(),
        action_json,
    }
}

fn render_http(
    family: &Family,
    method: &str,
    url: &str,
    headers: &HeaderSet,
    title: &str,
    body: Option<&RequestBody>,
) -> String {
    let body_field = body
        .map(|b| format!(",\n      \"body\": {}", b.to_json()))
        .unwrap_or_default();
    render(
        templates::HTTP_TEMPLATE,
        &[
            ("id", json_string(family.id)),
            ("brand_color", json_string(family.brand_color)),
            ("display_name", json_string(family.display_name)),
            ("icon", json_string(family.icon)),
            ("operation_name", json_string(title)),
            ("method", json_string(method)),
            ("uri", json_string(url)),
            ("headers", headers.to_json()),
            ("body", body_field),
        ],
    )
}

fn render_connector(
    family: &Family,
    kind: TemplateKind,
    method: &str,
    url: &str,
    headers: &HeaderSet,
    title: &str,
    body: Option<&RequestBody>,
) -> String {
    let keys = &family.parameter_keys;
    let mut params = Vec::new();
    if kind == TemplateKind::StorageDocument {
        // URLs without a marker keep everything in `uri`
        let (dataset, uri) = split_rest_marker(url).unwrap_or(("", url));
        params.push(("dataset", json_string(dataset)));
        params.push((keys.method, json_string(method)));
        params.push((keys.uri, json_string(uri)));
    } else {
        params.push((keys.method, json_string(method)));
        params.push((keys.uri, json_string(url)));
    }
    params.push((keys.headers, headers.to_json()));
    if let Some(body) = body {
        params.push((keys.body, body.to_json()));
    }

    let parameters = params
        .iter()
        .map(|(key, value)| format!("        {}: {}", json_string(key), value))
        .collect::<Vec<_>>()
        .join(",\n");

    render(
        templates::CONNECTOR_TEMPLATE,
        &[
            ("id", json_string(family.id)),
            ("brand_color", json_string(family.brand_color)),
            ("connection_name", json_string(family.connection_name)),
            ("connection_id", json_string(family.connection_id)),
            ("display_name", json_string(family.display_name)),
            ("icon", json_string(family.icon)),
            ("operation_name", json_string(title)),
            ("operation_id", json_string(family.operation_id)),
            ("api_id", json_string(family.api_id)),
            ("parameters", parameters),
        ],
    )
}

/// Quoted, escaped JSON string literal.
pub(crate) fn json_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
