use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::builtin_theme;
use super::records::StoredThemeRecord;
use crate::bus::events::{ThemeChanged, THEME_CHANGED};
use crate::bus::{EventBus, Subscription};
use crate::storage::{keys, StorageService};

/// Turns an opaque `themeConfig` into a renderable theme.
pub type ThemeConverter<T> = Arc<dyn Fn(&Value) -> Option<T> + Send + Sync>;

/// Which input the current theme was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeOrigin {
    /// Nothing persisted; the caller's default is in use.
    CallerDefault,
    /// A record from `customThemes`.
    Stored { id: String },
    /// Built-in descriptor for a persisted id missing from `customThemes`.
    BuiltIn { id: String },
    /// The most recent `themeChanged` broadcast.
    Broadcast,
}

struct ThemeState<T> {
    theme: T,
    origin: ThemeOrigin,
}

/// One-directional theme synchronizer.
///
/// Reads storage once on mount, then follows `themeChanged` broadcasts.
/// Broadcasts always win over storage: they are the latest user action.
pub struct ThemeSyncEngine<T> {
    state: Arc<RwLock<ThemeState<T>>>,
    subscription: Subscription,
}

impl<T> ThemeSyncEngine<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn mount(
        bus: &EventBus,
        storage: &StorageService,
        default: T,
        converter: ThemeConverter<T>,
    ) -> Self {
        let (theme, origin) = derive_from_storage(storage, default, &converter);
        tracing::debug!(origin = ?origin, "Theme resolved on mount");

        let state = Arc::new(RwLock::new(ThemeState { theme, origin }));

        let target = Arc::downgrade(&state);
        let subscription = bus.subscribe_json::<ThemeChanged, _>(THEME_CHANGED, move |payload, _| {
            let Some(config) = payload.theme_config.filter(|c| !c.is_null()) else {
                return;
            };
            let Some(theme) = converter(&config) else {
                tracing::warn!("themeChanged descriptor rejected by converter, keeping current theme");
                return;
            };
            if let Some(state) = target.upgrade() {
                let mut state = state.write();
                state.theme = theme;
                state.origin = ThemeOrigin::Broadcast;
            }
        });

        Self {
            state,
            subscription,
        }
    }

    pub fn current(&self) -> T {
        self.state.read().theme.clone()
    }

    pub fn origin(&self) -> ThemeOrigin {
        self.state.read().origin.clone()
    }

    /// Stop following broadcasts. Also happens on drop.
    pub fn unmount(&self) {
        self.subscription.unsubscribe();
    }
}

fn derive_from_storage<T>(
    storage: &StorageService,
    default: T,
    converter: &ThemeConverter<T>,
) -> (T, ThemeOrigin) {
    let Some(id) = storage.get(keys::SELECTED_THEME_ID) else {
        return (default, ThemeOrigin::CallerDefault);
    };

    let stored = storage
        .get_json::<Vec<StoredThemeRecord>>(keys::CUSTOM_THEMES)
        .unwrap_or_default()
        .into_iter()
        .find(|r| r.id == id);

    if let Some(record) = stored {
        match converter(&record.theme_config) {
            Some(theme) => return (theme, ThemeOrigin::Stored { id }),
            None => {
                tracing::warn!(theme = %id, "Stored theme rejected by converter, trying built-ins");
            }
        }
    }

    match builtin_theme(&id).and_then(|config| converter(&config)) {
        Some(theme) => (theme, ThemeOrigin::BuiltIn { id }),
        None => {
            tracing::warn!(theme = %id, "Selected theme not found, keeping default");
            (default, ThemeOrigin::CallerDefault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{RenderTheme, ThemeMode};
    use serde_json::json;

    fn converter() -> ThemeConverter<RenderTheme> {
        Arc::new(RenderTheme::from_config)
    }

    #[test]
    fn test_nothing_persisted_keeps_default() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        let default = RenderTheme {
            primary: Some("#ff0000".to_string()),
            ..RenderTheme::default()
        };
        let engine = ThemeSyncEngine::mount(&bus, &storage, default.clone(), converter());
        assert_eq!(engine.current(), default);
        assert_eq!(engine.origin(), ThemeOrigin::CallerDefault);
    }

    #[test]
    fn test_unknown_id_keeps_default() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        storage.set(keys::SELECTED_THEME_ID, "solarized");
        let engine = ThemeSyncEngine::mount(&bus, &storage, RenderTheme::default(), converter());
        assert_eq!(engine.origin(), ThemeOrigin::CallerDefault);
    }

    #[test]
    fn test_corrupt_custom_themes_fall_back_to_builtin() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        storage.set(keys::SELECTED_THEME_ID, "dark");
        storage.set(keys::CUSTOM_THEMES, "{broken");
        let engine = ThemeSyncEngine::mount(&bus, &storage, RenderTheme::default(), converter());
        assert_eq!(engine.current().mode, ThemeMode::Dark);
    }

    #[test]
    fn test_broadcast_without_config_ignored() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        let engine = ThemeSyncEngine::mount(&bus, &storage, RenderTheme::default(), converter());
        bus.dispatch(THEME_CHANGED, json!({"themeConfig": null}));
        bus.dispatch(THEME_CHANGED, json!({"other": 1}));
        assert_eq!(engine.origin(), ThemeOrigin::CallerDefault);
    }

    #[test]
    fn test_unmount_stops_following() {
        let bus = EventBus::new();
        let storage = StorageService::in_memory();
        let engine = ThemeSyncEngine::mount(&bus, &storage, RenderTheme::default(), converter());
        engine.unmount();
        bus.dispatch(THEME_CHANGED, json!({"themeConfig": {"palette": {"mode": "dark"}}}));
        assert_eq!(engine.current().mode, ThemeMode::Light);
    }
}
