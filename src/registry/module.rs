//! The contract every mountable module exports.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::bus::EventBus;
use crate::registry::resolution::ModuleSource;
use crate::storage::StorageService;
use crate::store::StoreRegistry;

/// Shared services handed to a module when it mounts.
#[derive(Clone)]
pub struct ModuleContext {
    pub bus: EventBus,
    pub storage: StorageService,
    pub store: StoreRegistry,
}

impl ModuleContext {
    pub fn new(bus: EventBus, storage: StorageService, store: StoreRegistry) -> Self {
        Self { bus, storage, store }
    }
}

/// Opaque result of mounting a module; the presentation layer renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderUnit {
    pub module: String,
    pub title: String,
    pub body: String,
}

/// Default export of a module.
///
/// `mount` may run more than once per session: standalone development
/// flows construct modules outside the container's mount tracking.
pub trait ModuleEntry: Send + Sync {
    fn mount(&self, ctx: &ModuleContext) -> RenderUnit;
}

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Failed to load module '{module}': {reason}")]
    Failed { module: String, reason: String },
}

pub type LoadFuture = Pin<Box<dyn Future<Output = Result<Arc<dyn ModuleEntry>, LoadError>> + Send>>;

/// Asynchronously produces a module.
pub type ModuleLoader = Arc<dyn Fn() -> LoadFuture + Send + Sync>;

/// Build a loader from a closure returning a future.
pub fn loader_fn<F, Fut>(f: F) -> ModuleLoader
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Arc<dyn ModuleEntry>, LoadError>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as LoadFuture)
}

/// Module that renders its own manifest.
///
/// Used when the shell runs without the real bundles (CLI, smoke tests):
/// it proves resolution and mounting end to end.
#[derive(Debug, Clone)]
pub struct ManifestModule {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub source: ModuleSource,
}

impl ModuleEntry for ManifestModule {
    fn mount(&self, _ctx: &ModuleContext) -> RenderUnit {
        RenderUnit {
            module: self.name.clone(),
            title: self.display_name.clone(),
            body: format!("{} [{}]", self.description, self.source),
        }
    }
}
