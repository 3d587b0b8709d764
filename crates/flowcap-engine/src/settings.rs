//! User settings, persisted as a singleton record in the action store.

use crate::store::{ActionStore, SETTINGS_KEY};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::warn;

/// How the target page and the workflow editor are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageDetectionMode {
    Automatic,
    /// Record on any page, skipping the target-page check.
    OverrideRecording,
    ClassicEditor,
    ModernEditor,
}

/// Longest recording cap accepted, one week.
pub const MAX_RECORDING_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRecord {
    pub override_recording: bool,
    pub force_classic_editor: bool,
    pub force_modern_editor: bool,
    pub max_recording_minutes: Option<u64>,
    pub show_favorites_first: bool,
    pub confirm_before_delete: bool,
    pub template_source_url: Option<String>,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            override_recording: false,
            force_classic_editor: false,
            force_modern_editor: false,
            max_recording_minutes: None,
            show_favorites_first: false,
            confirm_before_delete: true,
            template_source_url: None,
        }
    }
}

impl SettingsRecord {
    pub fn mode(&self) -> PageDetectionMode {
        if self.override_recording {
            PageDetectionMode::OverrideRecording
        } else if self.force_classic_editor {
            PageDetectionMode::ClassicEditor
        } else if self.force_modern_editor {
            PageDetectionMode::ModernEditor
        } else {
            PageDetectionMode::Automatic
        }
    }

    pub fn set_mode(&mut self, mode: PageDetectionMode) {
        self.override_recording = mode == PageDetectionMode::OverrideRecording;
        self.force_classic_editor = mode == PageDetectionMode::ClassicEditor;
        self.force_modern_editor = mode == PageDetectionMode::ModernEditor;
    }

    /// Merges `patch` over this record. Turning one detection flag on turns
    /// the other two off; when a patch enables several, the later one in
    /// override / classic / modern order wins.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(mode) = patch.mode {
            self.set_mode(mode);
        }
        for (flag, mode) in [
            (patch.override_recording, PageDetectionMode::OverrideRecording),
            (patch.force_classic_editor, PageDetectionMode::ClassicEditor),
            (patch.force_modern_editor, PageDetectionMode::ModernEditor),
        ] {
            match flag {
                Some(true) => self.set_mode(mode),
                Some(false) if self.mode() == mode => self.set_mode(PageDetectionMode::Automatic),
                _ => {}
            }
        }
        if let Some(minutes) = patch.max_recording_minutes {
            self.max_recording_minutes = minutes;
        }
        if let Some(v) = patch.show_favorites_first {
            self.show_favorites_first = v;
        }
        if let Some(v) = patch.confirm_before_delete {
            self.confirm_before_delete = v;
        }
        if let Some(url) = &patch.template_source_url {
            self.template_source_url = url.clone();
        }
        self.normalize();
    }

    /// Drops a zero cap, clamps an oversized one, blanks an empty template
    /// URL and keeps at most one detection flag set.
    pub fn normalize(&mut self) {
        self.max_recording_minutes = self
            .max_recording_minutes
            .filter(|m| *m > 0)
            .map(|m| m.min(MAX_RECORDING_MINUTES));
        if self
            .template_source_url
            .as_deref()
            .is_some_and(|u| u.trim().is_empty())
        {
            self.template_source_url = None;
        }
        self.set_mode(self.mode());
    }
}

/// Partial update. `None` leaves a field untouched; for optional fields
/// `Some(None)` clears the value, which on the wire is an explicit `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub mode: Option<PageDetectionMode>,
    pub override_recording: Option<bool>,
    pub force_classic_editor: Option<bool>,
    pub force_modern_editor: Option<bool>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub max_recording_minutes: Option<Option<u64>>,
    pub show_favorites_first: Option<bool>,
    pub confirm_before_delete: Option<bool>,
    #[serde(deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub template_source_url: Option<Option<String>>,
}

/// A field that is present, `null` included, becomes `Some`; an absent one
/// falls back to the `default` of `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl SettingsPatch {
    pub fn mode(mode: PageDetectionMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn ActionStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn ActionStore>) -> Self {
        Self { store }
    }

    /// Current settings, or defaults when nothing usable is stored.
    pub async fn load(&self) -> SettingsRecord {
        match self.store.get(SETTINGS_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<SettingsRecord>(value) {
                Ok(mut settings) => {
                    settings.normalize();
                    settings
                }
                Err(e) => {
                    warn!("Stored settings are malformed, using defaults: {}", e);
                    SettingsRecord::default()
                }
            },
            Ok(None) => SettingsRecord::default(),
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                SettingsRecord::default()
            }
        }
    }

    /// Applies `patch` over the stored record in a single write and returns
    /// the merged result.
    pub async fn update(&self, patch: &SettingsPatch) -> SettingsRecord {
        let mut settings = self.load().await;
        settings.apply(patch);
        self.persist(&settings).await;
        settings
    }

    pub async fn reset(&self) -> SettingsRecord {
        let settings = SettingsRecord::default();
        self.persist(&settings).await;
        settings
    }

    async fn persist(&self, settings: &SettingsRecord) {
        let result = match serde_json::to_value(settings) {
            Ok(value) => self.store.set(SETTINGS_KEY, value).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!("Failed to persist settings: {}", e);
        }
    }
}
