//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use mfe_shell::bus::EventBus;
use mfe_shell::locale::{Locale, LocaleSettings, LocaleSyncEngine, Translations};
use mfe_shell::registry::{
    loader_fn, LoadError, ManifestModule, ModuleContext, ModuleDescriptor, ModuleEntry,
    ModuleSource, RenderUnit,
};
use mfe_shell::storage::StorageService;
use mfe_shell::store::StoreRegistry;
use parking_lot::Mutex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Translation tables used by the locale tests.
///
/// `greeting` exists everywhere, `farewell` only in English, `welcome`
/// carries a placeholder.
pub fn sample_translations() -> Arc<Translations> {
    Arc::new(
        Translations::new()
            .with_table(
                Locale::En,
                json!({
                    "greeting": "Hello",
                    "farewell": "Goodbye",
                    "welcome": "Welcome, {{name}}"
                }),
            )
            .with_table(Locale::Es, json!({"greeting": "Hola", "welcome": "Bienvenido, {{name}}"}))
            .with_table(Locale::Fr, json!({"greeting": "Bonjour"}))
            .with_table(Locale::De, json!({"greeting": "Hallo"})),
    )
}

pub fn locale_engine(bus: &EventBus, storage: &StorageService) -> LocaleSyncEngine {
    LocaleSyncEngine::new(
        bus,
        storage,
        LocaleSettings::default(),
        sample_translations(),
    )
}

pub fn context() -> ModuleContext {
    ModuleContext::new(
        EventBus::new(),
        StorageService::in_memory(),
        StoreRegistry::default(),
    )
}

/// Descriptor whose loader resolves after `delay`.
pub fn delayed_descriptor(name: &str, delay: Duration) -> ModuleDescriptor {
    let source = ModuleSource::Local {
        alias: format!("apps/{}/src/bootstrap", name),
    };
    let entry: Arc<dyn ModuleEntry> = Arc::new(ManifestModule {
        name: name.to_string(),
        display_name: name.to_uppercase(),
        description: format!("{} module", name),
        source: source.clone(),
    });
    let loader = loader_fn(move || {
        let entry = entry.clone();
        async move {
            tokio::time::sleep(delay).await;
            Ok::<_, LoadError>(entry)
        }
    });
    ModuleDescriptor::new(name, name.to_uppercase(), "", 3000, source, loader)
}

/// Descriptor whose loader fails after `delay`.
pub fn failing_descriptor(name: &str, delay: Duration) -> ModuleDescriptor {
    let module = name.to_string();
    let loader = loader_fn(move || {
        let module = module.clone();
        async move {
            tokio::time::sleep(delay).await;
            Err::<Arc<dyn ModuleEntry>, _>(LoadError::Failed {
                module,
                reason: "network unreachable".to_string(),
            })
        }
    });
    ModuleDescriptor::new(
        name,
        name.to_uppercase(),
        "",
        3000,
        ModuleSource::Remote {
            url: format!("https://{}.example.com/remoteEntry.js", name),
        },
        loader,
    )
}

/// Module whose `mount` panics.
pub struct PanickingModule;

impl ModuleEntry for PanickingModule {
    fn mount(&self, _ctx: &ModuleContext) -> RenderUnit {
        panic!("module bug");
    }
}

pub fn panicking_descriptor(name: &str) -> ModuleDescriptor {
    let entry: Arc<dyn ModuleEntry> = Arc::new(PanickingModule);
    let loader = loader_fn(move || {
        let entry = entry.clone();
        async move { Ok::<_, LoadError>(entry) }
    });
    ModuleDescriptor::new(
        name,
        name.to_uppercase(),
        "",
        3000,
        ModuleSource::Local {
            alias: format!("apps/{}/src/bootstrap", name),
        },
        loader,
    )
}

/// Create a temporary config file with the given TOML content.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}
