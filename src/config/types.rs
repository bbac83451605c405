use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration of the container shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_modules")]
    pub modules: Vec<ModuleConfig>,
    /// Ordered route table; the first matching entry wins.
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteConfig>,
}

/// Locale defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Locale adopted when nothing valid is persisted (default: "en").
    #[serde(default = "default_locale")]
    pub default: String,
    /// Locale consulted when a key is missing from the active one (default: "en").
    #[serde(default = "default_locale")]
    pub fallback: String,
}

/// Where persisted state lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage file path. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// One independently deployed module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Logical name (e.g., "home", "admin"). Unique.
    pub name: String,
    /// Display name in navigation (e.g., "Admin").
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Port of the module's standalone dev server.
    pub dev_port: u16,
    /// In-process source used in aliasing mode (e.g., "apps/admin/src/bootstrap").
    pub local_path: String,
    /// Environment variable holding the hosted base URL (e.g., "ADMIN_MFE_URL").
    pub remote_env_var: String,
}

/// One entry of the route table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,
    pub module: String,
    #[serde(default)]
    pub exact: bool,
}

fn default_locale() -> String {
    "en".to_string()
}

fn module(name: &str, display_name: &str, description: &str, dev_port: u16) -> ModuleConfig {
    ModuleConfig {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        dev_port,
        local_path: format!("apps/{}/src/bootstrap", name),
        remote_env_var: format!("{}_MFE_URL", name.to_uppercase()),
    }
}

fn default_modules() -> Vec<ModuleConfig> {
    vec![
        module("home", "Home", "Landing page and dashboard", 3001),
        module(
            "preferences",
            "Preferences",
            "Language and theme preferences",
            3002,
        ),
        module("account", "Account", "Profile and account settings", 3003),
        module("admin", "Admin", "User administration", 3004),
    ]
}

fn route(pattern: &str, module: &str, exact: bool) -> RouteConfig {
    RouteConfig {
        pattern: pattern.to_string(),
        module: module.to_string(),
        exact,
    }
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        route("/preferences", "preferences", false),
        route("/account", "account", false),
        route("/admin", "admin", false),
        route("/", "home", true),
    ]
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: default_locale(),
            fallback: default_locale(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            locale: LocaleConfig::default(),
            storage: StorageConfig::default(),
            modules: default_modules(),
            routes: default_routes(),
        }
    }
}
