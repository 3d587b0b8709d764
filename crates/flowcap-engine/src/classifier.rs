//! Decides which definition family a captured request belongs to.
//!
//! Classification is a pure function of the request: re-classifying the same
//! request always yields the same family.

use crate::capture::request::CapturedRequest;
use serde::{Deserialize, Serialize};
use url::Url;

/// Host of the collaboration-graph API.
pub const GRAPH_HOST: &str = "graph.microsoft.com";

/// Path markers of the storage-document REST surface.
pub const REST_MARKERS: [&str; 2] = ["_api", "_vti_bin"];

const GROUP_SEGMENTS: &[&str] = &["groups"];
const MESSAGING_SEGMENTS: &[&str] = &[
    "teams",
    "joinedteams",
    "channels",
    "chats",
    "installedapps",
    "pinnedmessages",
];
const MAIL_SEGMENTS: &[&str] = &[
    "events",
    "calendar",
    "calendars",
    "calendarview",
    "outlook",
    "mailfolders",
    "messages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    StorageDocument,
    GenericHttp,
    Groups,
    Messaging,
    MailCalendar,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::StorageDocument,
        TemplateKind::GenericHttp,
        TemplateKind::Groups,
        TemplateKind::Messaging,
        TemplateKind::MailCalendar,
    ];

    /// Short tag stored as the record category.
    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::StorageDocument => "sharepoint",
            TemplateKind::GenericHttp => "http",
            TemplateKind::Groups => "groups",
            TemplateKind::Messaging => "teams",
            TemplateKind::MailCalendar => "outlook",
        }
    }
}

pub fn classify(request: &CapturedRequest) -> Option<TemplateKind> {
    classify_parts(
        &request.url,
        &request.resource_type,
        request.frame_type.as_deref(),
    )
}

/// Only script-issued requests from the top-level document are captured.
pub fn is_capturable(resource_type: &str, frame_type: Option<&str>) -> bool {
    matches!(resource_type, "xmlhttprequest" | "fetch") && frame_type != Some("sub_frame")
}

pub fn classify_parts(
    url: &str,
    resource_type: &str,
    frame_type: Option<&str>,
) -> Option<TemplateKind> {
    if !is_capturable(resource_type, frame_type) {
        return None;
    }
    classify_url(url)
}

pub fn classify_url(url: &str) -> Option<TemplateKind> {
    if split_rest_marker(url).is_some() {
        return Some(TemplateKind::StorageDocument);
    }

    let parsed = Url::parse(url).ok()?;
    if !parsed.host_str()?.eq_ignore_ascii_case(GRAPH_HOST) {
        return None;
    }

    // segment 0 is the API version
    let segments: Vec<String> = parsed
        .path_segments()
        .map(|segs| segs.map(|s| s.to_ascii_lowercase()).collect())
        .unwrap_or_default();
    let inspected: Vec<&str> = segments.iter().skip(1).take(2).map(String::as_str).collect();

    let hit = |family: &[&str]| inspected.iter().any(|seg| family.contains(seg));
    let kind = if hit(GROUP_SEGMENTS) {
        TemplateKind::Groups
    } else if hit(MESSAGING_SEGMENTS) {
        TemplateKind::Messaging
    } else if hit(MAIL_SEGMENTS) {
        TemplateKind::MailCalendar
    } else {
        TemplateKind::GenericHttp
    };
    Some(kind)
}

/// Splits a storage-document URL at its REST marker.
///
/// Returns `(site, relative)` where `relative` starts with the marker itself,
/// e.g. `("https://s.com/sites/a", "_api/web/lists")`. The earliest marker
/// wins when both occur.
pub fn split_rest_marker(url: &str) -> Option<(&str, &str)> {
    REST_MARKERS
        .iter()
        .filter_map(|marker| find_marker(url, marker))
        .min()
        .map(|idx| (&url[..idx], &url[idx + 1..]))
}

fn find_marker(url: &str, marker: &str) -> Option<usize> {
    let needle = format!("/{marker}");
    url.match_indices(&needle).map(|(idx, _)| idx).find(|&idx| {
        matches!(
            url[idx + needle.len()..].chars().next(),
            None | Some('/') | Some('?') | Some('#')
        )
    })
}

/// Title of an action: the last path segment, without query or fragment.
///
/// A single trailing slash is ignored, so `.../lists/` yields `lists`. Any
/// other empty segment yields an empty title.
pub fn get_title(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let trimmed = without_query.strip_suffix('/').unwrap_or(without_query);
    trimmed.rsplit('/').next().unwrap_or_default().to_string()
}
