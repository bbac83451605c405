use std::sync::Arc;

use serde_json::Value;

use super::translate::{interpolate, Translations};
use super::{Locale, LocaleError};
use crate::bus::events::{LanguageChanged, LANGUAGE_CHANGED};
use crate::bus::EventBus;
use crate::state::{ChangeSource, ChannelCodec, SharedStateChannel, Update};
use crate::storage::{keys, StorageService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePhase {
    /// Persisted value not yet consulted.
    Uninitialized,
    /// Locale adopted from storage or the default.
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocaleSettings {
    pub default: Locale,
    pub fallback: Locale,
}

/// `{ "language": code }` on the wire.
struct LanguageCodec;

impl ChannelCodec<Locale> for LanguageCodec {
    fn encode(&self, value: &Locale) -> Value {
        serde_json::to_value(LanguageChanged {
            language: value.code().to_string(),
        })
        .unwrap_or(Value::Null)
    }

    fn decode(&self, detail: &Value) -> Option<Locale> {
        let payload = serde_json::from_value::<LanguageChanged>(detail.clone()).ok()?;
        let locale = Locale::parse(&payload.language);
        if locale.is_none() {
            tracing::debug!(language = %payload.language, "Ignoring unsupported locale broadcast");
        }
        locale
    }
}

/// Locale state for one mounted module.
///
/// Every engine on the same bus converges on the same locale; changes are
/// persisted under `selectedLanguage` whether they were made here or
/// received from another module.
pub struct LocaleSyncEngine {
    channel: SharedStateChannel<Locale>,
    phase: LocalePhase,
    translations: Arc<Translations>,
    fallback: Locale,
}

impl LocaleSyncEngine {
    pub fn new(
        bus: &EventBus,
        storage: &StorageService,
        settings: LocaleSettings,
        translations: Arc<Translations>,
    ) -> Self {
        // Construction is the Uninitialized -> Resolved transition.
        let initial = resolve_initial(storage, settings.default);

        let persist = storage.clone();
        let channel = SharedStateChannel::builder(bus, LANGUAGE_CHANGED, initial)
            .on_change(move |locale: &Locale, source| {
                persist.set(keys::SELECTED_LANGUAGE, locale.code());
                match source {
                    ChangeSource::Local => tracing::info!(locale = %locale, "Locale changed"),
                    ChangeSource::Broadcast => {
                        tracing::debug!(locale = %locale, "Locale adopted from broadcast")
                    }
                }
            })
            .build_with_codec(LanguageCodec);

        Self {
            channel,
            phase: LocalePhase::Resolved,
            translations,
            fallback: settings.fallback,
        }
    }

    pub fn phase(&self) -> LocalePhase {
        self.phase
    }

    pub fn locale(&self) -> Locale {
        self.channel.get()
    }

    /// Adopt `locale`, persist it, and broadcast `languageChanged`.
    pub fn set_locale(&self, locale: Locale) {
        self.channel.set(Update::Value(locale));
    }

    /// [`set_locale`](Self::set_locale) from a raw code.
    pub fn set_locale_code(&self, code: &str) -> Result<(), LocaleError> {
        let locale = Locale::parse(code).ok_or_else(|| LocaleError::Unsupported {
            code: code.to_string(),
        })?;
        self.set_locale(locale);
        Ok(())
    }

    /// Translate `key` for the active locale.
    pub fn t(&self, key: &str) -> String {
        self.t_with(key, &[])
    }

    /// Translate `key` and substitute `{{name}}` placeholders.
    ///
    /// Falls back to the fallback locale, then to `key` itself.
    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> String {
        let resolved = self
            .translations
            .lookup(self.locale(), key)
            .or_else(|| self.translations.lookup(self.fallback, key));

        match resolved {
            Some(text) => interpolate(text, params),
            None => key.to_string(),
        }
    }

    /// Stop following broadcasts. Also happens on drop.
    pub fn close(&self) {
        self.channel.close();
    }
}

fn resolve_initial(storage: &StorageService, default: Locale) -> Locale {
    match storage.get(keys::SELECTED_LANGUAGE) {
        Some(code) => match Locale::parse(&code) {
            Some(locale) => locale,
            None => {
                tracing::warn!(stored = %code, default = %default, "Persisted locale unsupported, using default");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine(bus: &EventBus, storage: &StorageService) -> LocaleSyncEngine {
        LocaleSyncEngine::new(
            bus,
            storage,
            LocaleSettings::default(),
            Arc::new(Translations::new()),
        )
    }

    #[test]
    fn test_unsupported_persisted_value_uses_default() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        storage.set(keys::SELECTED_LANGUAGE, "xx");
        let engine = engine(&bus, &storage);
        assert_eq!(engine.locale(), Locale::En);
        assert_eq!(engine.phase(), LocalePhase::Resolved);
    }

    #[test]
    fn test_padded_persisted_value_is_unrecognized() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        storage.set(keys::SELECTED_LANGUAGE, " fr ");
        let engine = engine(&bus, &storage);
        assert_eq!(engine.locale(), Locale::En);
    }

    #[test]
    fn test_set_locale_broadcasts_language_payload() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        let engine = engine(&bus, &storage);
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = seen.clone();
        let _sub = bus.subscribe_fn(LANGUAGE_CHANGED, move |e| s.lock().push(e.detail.clone()));

        engine.set_locale(Locale::De);
        assert_eq!(*seen.lock(), vec![json!({"language": "de"})]);
        assert_eq!(storage.get(keys::SELECTED_LANGUAGE).as_deref(), Some("de"));
    }

    #[test]
    fn test_unsupported_broadcast_ignored() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        let engine = engine(&bus, &storage);
        bus.dispatch(LANGUAGE_CHANGED, json!({"language": "xx"}));
        assert_eq!(engine.locale(), Locale::En);
        assert_eq!(storage.get(keys::SELECTED_LANGUAGE), None);
    }

    #[test]
    fn test_set_locale_code_rejects_unknown() {
        let bus = EventBus::new();
        let engine = engine(&bus, &StorageService::in_memory());
        assert_eq!(
            engine.set_locale_code("xx"),
            Err(LocaleError::Unsupported {
                code: "xx".to_string()
            })
        );
    }
}
