mod common;

use common::{locale_engine, sample_translations};
use mfe_shell::bus::events::LANGUAGE_CHANGED;
use mfe_shell::bus::EventBus;
use mfe_shell::locale::{Locale, LocaleSettings, LocaleSyncEngine};
use mfe_shell::storage::{keys, StorageService};
use serde_json::json;

/// Selecting a locale persists it; a fresh engine on the same storage adopts it.
#[test]
fn test_locale_survives_reload_for_every_locale() {
    for locale in Locale::all() {
        let storage = StorageService::in_memory();
        let engine = locale_engine(&EventBus::new(), &storage);
        engine.set_locale(*locale);
        drop(engine);

        let reloaded = locale_engine(&EventBus::new(), &storage);
        assert_eq!(reloaded.locale(), *locale);
    }
}

#[test]
fn test_default_locale_when_nothing_persisted() {
    let storage = StorageService::in_memory();
    let engine = LocaleSyncEngine::new(
        &EventBus::new(),
        &storage,
        LocaleSettings {
            default: Locale::Fr,
            fallback: Locale::En,
        },
        sample_translations(),
    );
    assert_eq!(engine.locale(), Locale::Fr);
    assert_eq!(storage.get(keys::SELECTED_LANGUAGE), None);
}

#[test]
fn test_missing_key_uses_fallback_locale() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::in_memory());
    engine.set_locale(Locale::Es);
    assert_eq!(engine.t("greeting"), "Hola");
    assert_eq!(engine.t("farewell"), "Goodbye");
}

#[test]
fn test_key_missing_everywhere_returns_key() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::in_memory());
    engine.set_locale(Locale::De);
    assert_eq!(engine.t("nav.unknown"), "nav.unknown");
}

#[test]
fn test_interpolation() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::in_memory());
    assert_eq!(engine.t_with("welcome", &[("name", "Ada")]), "Welcome, Ada");
    engine.set_locale(Locale::Es);
    assert_eq!(engine.t_with("welcome", &[("name", "Ada")]), "Bienvenido, Ada");
}

/// Two modules on one bus: one dispatch reaches both, nothing is re-broadcast.
#[test]
fn test_two_engines_converge_on_single_dispatch() {
    let bus = EventBus::new();
    let storage = StorageService::in_memory();
    let first = locale_engine(&bus, &storage);
    let second = locale_engine(&bus, &storage);

    let before = bus.dispatch_count();
    bus.dispatch(LANGUAGE_CHANGED, json!({"language": "fr"}));

    assert_eq!(bus.dispatch_count(), before + 1);
    assert_eq!(first.locale(), Locale::Fr);
    assert_eq!(second.locale(), Locale::Fr);
    assert_eq!(storage.get(keys::SELECTED_LANGUAGE).as_deref(), Some("fr"));
}

#[test]
fn test_local_change_reaches_peer_with_one_dispatch() {
    let bus = EventBus::new();
    let storage = StorageService::in_memory();
    let first = locale_engine(&bus, &storage);
    let second = locale_engine(&bus, &storage);

    let before = bus.dispatch_count();
    first.set_locale(Locale::De);

    assert_eq!(bus.dispatch_count(), before + 1);
    assert_eq!(second.locale(), Locale::De);
}

#[test]
fn test_legacy_locale_field_accepted() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::in_memory());
    bus.dispatch(LANGUAGE_CHANGED, json!({"locale": "es"}));
    assert_eq!(engine.locale(), Locale::Es);
}

#[test]
fn test_disabled_storage_still_switches_locale() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::disabled());
    engine.set_locale(Locale::Fr);
    assert_eq!(engine.locale(), Locale::Fr);
}

#[test]
fn test_closed_engine_stops_following() {
    let bus = EventBus::new();
    let engine = locale_engine(&bus, &StorageService::in_memory());
    engine.close();
    bus.dispatch(LANGUAGE_CHANGED, json!({"language": "fr"}));
    assert_eq!(engine.locale(), Locale::En);
    assert_eq!(bus.listener_count(LANGUAGE_CHANGED), 0);
}
