//! Broadcast event names and payload shapes other modules depend on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Emitted when the active locale changes.
pub const LANGUAGE_CHANGED: &str = "languageChanged";
/// Emitted when the user picks or edits a theme.
pub const THEME_CHANGED: &str = "themeChanged";
/// Emitted on login and logout.
pub const AUTH_CHANGED: &str = "authChanged";

/// A single transient notification.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastEvent {
    pub name: String,
    pub detail: Value,
    /// Instance that dispatched the event, when the sender tagged it.
    pub origin: Option<Uuid>,
}

impl BroadcastEvent {
    pub fn new(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
            origin: None,
        }
    }

    /// Decode the detail into a typed payload.
    pub fn detail_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.detail.clone()).ok()
    }
}

/// Payload of [`LANGUAGE_CHANGED`].
///
/// Older senders used `locale` as the field name; both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageChanged {
    #[serde(alias = "locale")]
    pub language: String,
}

/// Payload of [`THEME_CHANGED`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeChanged {
    #[serde(rename = "themeConfig", default)]
    pub theme_config: Option<Value>,
}

/// Payload of [`AUTH_CHANGED`]. `user` is `null` after logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthChanged {
    pub user: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_payload_accepts_both_field_names() {
        let a = BroadcastEvent::new(LANGUAGE_CHANGED, json!({"language": "fr"}));
        let b = BroadcastEvent::new(LANGUAGE_CHANGED, json!({"locale": "fr"}));
        assert_eq!(a.detail_as::<LanguageChanged>().unwrap().language, "fr");
        assert_eq!(b.detail_as::<LanguageChanged>().unwrap().language, "fr");
    }

    #[test]
    fn test_theme_payload_without_config() {
        let event = BroadcastEvent::new(THEME_CHANGED, json!({}));
        let payload = event.detail_as::<ThemeChanged>().unwrap();
        assert!(payload.theme_config.is_none());
    }

    #[test]
    fn test_language_payload_serializes_language_field() {
        let value = serde_json::to_value(LanguageChanged {
            language: "de".to_string(),
        })
        .unwrap();
        assert_eq!(value, json!({"language": "de"}));
    }
}
