use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::bus::events::{ThemeChanged, THEME_CHANGED};
use crate::bus::EventBus;
use crate::storage::{keys, StorageError, StorageService};

/// One entry of the `customThemes` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredThemeRecord {
    pub id: String,
    #[serde(rename = "themeConfig")]
    pub theme_config: Value,
}

/// Writer side of theme persistence, used by whichever module edits themes.
#[derive(Clone)]
pub struct ThemeRecords {
    storage: StorageService,
    bus: EventBus,
}

impl ThemeRecords {
    pub fn new(storage: StorageService, bus: EventBus) -> Self {
        Self { storage, bus }
    }

    /// Stored custom themes. Absent or corrupt storage reads as empty.
    pub fn custom_themes(&self) -> Vec<StoredThemeRecord> {
        self.storage
            .get_json::<Vec<StoredThemeRecord>>(keys::CUSTOM_THEMES)
            .unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<StoredThemeRecord> {
        self.custom_themes().into_iter().find(|r| r.id == id)
    }

    pub fn selected_id(&self) -> Option<String> {
        self.storage.get(keys::SELECTED_THEME_ID)
    }

    /// Insert or replace a custom theme by id.
    pub fn save_custom(&self, record: StoredThemeRecord) -> Result<(), StorageError> {
        let mut themes = self.custom_themes();
        match themes.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => themes.push(record),
        }
        self.storage.set_json(keys::CUSTOM_THEMES, &themes)
    }

    /// Persist `id` as selected and broadcast its descriptor.
    pub fn select(&self, id: &str, theme_config: Value) {
        self.storage.set(keys::SELECTED_THEME_ID, id);
        let payload = ThemeChanged {
            theme_config: Some(theme_config),
        };
        let detail = serde_json::to_value(&payload).unwrap_or_else(|_| json!({}));
        tracing::info!(theme = %id, "Theme selected");
        self.bus.dispatch(THEME_CHANGED, detail);
    }
}
