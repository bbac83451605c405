//! The container: routes a path to a module, loads it, and mounts it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::ShellConfig;
use crate::registry::{
    LoadError, LoaderFactory, ModuleContext, ModuleRegistry, RegistryError, RemoteModuleResolver,
    RenderUnit,
};
use crate::routing::{MountTracker, MountedSet, RouteResolver, NO_ROUTE};
use crate::store::ShellAction;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Module '{module}' panicked while mounting")]
    Mount { module: String },
}

/// Outcome of [`ModuleHost::navigate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Mounted {
        module: String,
        /// First activation of this module in the session.
        first_activation: bool,
        view: RenderUnit,
    },
    /// No route matched; the active module is now [`NO_ROUTE`].
    NotFound { path: String },
    /// A later navigation started while this module was loading. The loaded
    /// module was dropped without mounting.
    Superseded { module: String },
}

pub struct ModuleHost {
    registry: Arc<ModuleRegistry>,
    routes: RouteResolver,
    mounts: Mutex<MountTracker>,
    active: Mutex<String>,
    generation: AtomicU64,
    ctx: ModuleContext,
}

impl ModuleHost {
    pub fn new(registry: ModuleRegistry, routes: RouteResolver, ctx: ModuleContext) -> Self {
        Self {
            registry: Arc::new(registry),
            routes,
            mounts: Mutex::new(MountTracker::new()),
            active: Mutex::new(NO_ROUTE.to_string()),
            generation: AtomicU64::new(0),
            ctx,
        }
    }

    pub fn from_config(
        config: &ShellConfig,
        resolver: &RemoteModuleResolver,
        factory: &dyn LoaderFactory,
        ctx: ModuleContext,
    ) -> Result<Self, RegistryError> {
        let registry = ModuleRegistry::from_config(&config.modules, resolver, factory)?;
        let routes = RouteResolver::new(config.route_mappings());
        Ok(Self::new(registry, routes, ctx))
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ModuleContext {
        &self.ctx
    }

    pub fn active_module(&self) -> String {
        self.active.lock().clone()
    }

    pub fn mounted(&self) -> MountedSet {
        self.mounts.lock().mounted()
    }

    /// Navigate to `path`.
    ///
    /// Only the most recent navigation mounts; earlier loads still in
    /// flight resolve to [`Navigation::Superseded`], even when they fail.
    /// A module that panics in `mount` is reported as [`HostError::Mount`]
    /// and is not recorded as mounted.
    pub async fn navigate(&self, path: &str) -> Result<Navigation, HostError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.ctx.store.dispatch_typed(&ShellAction::RouteChanged {
            path: path.to_string(),
        });

        let Some(module) = self.routes.resolve(path) else {
            tracing::warn!(path = %path, "No route matches");
            *self.active.lock() = NO_ROUTE.to_string();
            self.ctx.store.dispatch_typed(&ShellAction::RouteNotFound);
            return Ok(Navigation::NotFound {
                path: path.to_string(),
            });
        };
        let module = module.to_string();

        let descriptor = self.registry.resolve(&module)?;
        tracing::debug!(module = %module, source = %descriptor.source, "Loading module");
        let loaded = descriptor.load().await;

        // A stale result is dropped whether it loaded or failed.
        if self.generation.load(Ordering::SeqCst) != generation {
            if let Err(e) = &loaded {
                tracing::debug!(module = %module, error = %e, "Superseded load failed, ignoring");
            }
            tracing::debug!(module = %module, "Navigation superseded, discarding load");
            return Ok(Navigation::Superseded { module });
        }
        let entry = loaded?;

        let view = match catch_unwind(AssertUnwindSafe(|| entry.mount(&self.ctx))) {
            Ok(view) => view,
            Err(_) => {
                tracing::error!(module = %module, "Module panicked while mounting, keeping previous view");
                return Err(HostError::Mount { module });
            }
        };

        let first_activation = {
            let mut mounts = self.mounts.lock();
            let before = mounts.mounted();
            !mounts.activate(&module).same_as(&before)
        };
        *self.active.lock() = module.clone();

        self.ctx.store.dispatch_typed(&ShellAction::ModuleMounted {
            module: module.clone(),
        });
        tracing::info!(module = %module, path = %path, first_activation, "Module mounted");

        Ok(Navigation::Mounted {
            module,
            first_activation,
            view,
        })
    }
}
