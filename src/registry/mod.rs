//! Module registry: logical module name → loadable unit plus static metadata.

mod module;
pub mod resolution;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ModuleConfig;

pub use module::{
    loader_fn, LoadError, LoadFuture, ManifestModule, ModuleContext, ModuleEntry, ModuleLoader,
    RenderUnit,
};
pub use resolution::{
    choose_resolution_mode, ModuleSource, RemoteModuleResolver, RemoteRequirement,
    ResolutionInputs, ResolutionMode,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Module '{name}' not found")]
    NotFound { name: String },

    #[error("Module '{name}' is registered more than once")]
    Duplicate { name: String },

    #[error("Module '{name}' has no source under the active resolution mode")]
    Unresolved { name: String },
}

/// Static description of one module. Immutable once registered.
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub dev_port: u16,
    pub source: ModuleSource,
    loader: ModuleLoader,
}

impl ModuleDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        dev_port: u16,
        source: ModuleSource,
        loader: ModuleLoader,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: description.into(),
            dev_port,
            source,
            loader,
        }
    }

    /// Start loading the module.
    pub fn load(&self) -> LoadFuture {
        (self.loader)()
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("dev_port", &self.dev_port)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Produces the loader for a module once its source is known.
pub trait LoaderFactory {
    fn loader_for(&self, module: &ModuleConfig, source: &ModuleSource) -> ModuleLoader;
}

/// Factory whose loaders yield a [`ManifestModule`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoaderFactory;

impl LoaderFactory for ManifestLoaderFactory {
    fn loader_for(&self, module: &ModuleConfig, source: &ModuleSource) -> ModuleLoader {
        let entry: Arc<dyn ModuleEntry> = Arc::new(ManifestModule {
            name: module.name.clone(),
            display_name: module.display_name.clone(),
            description: module.description.clone(),
            source: source.clone(),
        });
        loader_fn(move || {
            let entry = entry.clone();
            async move { Ok::<_, LoadError>(entry) }
        })
    }
}

/// Ordered table of module descriptors, unique by name.
#[derive(Debug, Default, Clone)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the configured module table.
    pub fn from_config(
        modules: &[ModuleConfig],
        resolver: &RemoteModuleResolver,
        factory: &dyn LoaderFactory,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for module in modules {
            let source = resolver
                .source_for(&module.name)
                .cloned()
                .ok_or_else(|| RegistryError::Unresolved {
                    name: module.name.clone(),
                })?;
            let loader = factory.loader_for(module, &source);
            registry.register(ModuleDescriptor::new(
                &module.name,
                &module.display_name,
                &module.description,
                module.dev_port,
                source,
                loader,
            ))?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<(), RegistryError> {
        if self.modules.iter().any(|m| m.name == descriptor.name) {
            return Err(RegistryError::Duplicate {
                name: descriptor.name,
            });
        }
        tracing::debug!(module = %descriptor.name, source = %descriptor.source, "Module registered");
        self.modules.push(descriptor);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ModuleDescriptor, RegistryError> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Module names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
