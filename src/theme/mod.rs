//! Visual theme derived from the selected theme descriptor.
//!
//! Descriptors are opaque JSON (`themeConfig`). A caller-supplied converter
//! turns them into whatever the presentation layer renders; [`RenderTheme`]
//! is the stock target.

mod engine;
mod records;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use engine::{ThemeConverter, ThemeOrigin, ThemeSyncEngine};
pub use records::{StoredThemeRecord, ThemeRecords};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

/// Minimal renderable theme: palette mode plus optional accent colors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderTheme {
    pub mode: ThemeMode,
    pub primary: Option<String>,
    pub secondary: Option<String>,
}

impl RenderTheme {
    /// Stock converter: reads `palette.mode`, `palette.primary.main` and
    /// `palette.secondary.main`. Anything that is not an object is rejected.
    pub fn from_config(config: &Value) -> Option<Self> {
        let palette = config.as_object()?.get("palette");
        let mode = palette
            .and_then(|p| p.get("mode"))
            .and_then(|m| serde_json::from_value::<ThemeMode>(m.clone()).ok())
            .unwrap_or_default();
        let color = |slot: &str| {
            palette
                .and_then(|p| p.get(slot))
                .and_then(|s| s.get("main"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        Some(Self {
            mode,
            primary: color("primary"),
            secondary: color("secondary"),
        })
    }
}

/// Descriptor for a built-in theme id ("light", "dark").
pub fn builtin_theme(id: &str) -> Option<Value> {
    match id {
        "light" => Some(json!({"palette": {"mode": "light"}})),
        "dark" => Some(json!({"palette": {"mode": "dark"}})),
        _ => None,
    }
}
