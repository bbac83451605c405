//! Shell configuration: module table, route table, locale defaults, storage location.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{LocaleConfig, ModuleConfig, RouteConfig, ShellConfig, StorageConfig};
