//! Local-alias vs. remote-artifact resolution.
//!
//! One mode is chosen at startup for the whole process. Remote mode needs
//! every module's hosted URL; anything less (including a partial set) falls
//! back to aliasing so a half-configured deployment never mixes sources.

use std::collections::HashMap;
use std::fmt;

use crate::config::ModuleConfig;

/// Environment variable that switches the shell into development mode.
pub const ENV_MODE_VAR: &str = "MFE_ENV";

/// File every hosted module exposes at its base URL.
pub const REMOTE_ENTRY_FILE: &str = "remoteEntry.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Module names resolve to in-process sources.
    Local,
    /// Module names resolve to hosted artifacts.
    Remote,
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionMode::Local => write!(f, "local"),
            ResolutionMode::Remote => write!(f, "remote"),
        }
    }
}

/// Where a module's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    Local { alias: String },
    Remote { url: String },
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleSource::Local { alias } => write!(f, "local:{}", alias),
            ModuleSource::Remote { url } => write!(f, "remote:{}", url),
        }
    }
}

/// A hosted location one module needs for remote mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequirement {
    pub module: String,
    pub env_var: String,
    /// Base URL, if the variable is set to something non-blank.
    pub url: Option<String>,
}

/// Everything [`choose_resolution_mode`] looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionInputs {
    pub development: bool,
    pub remotes: Vec<RemoteRequirement>,
}

impl ResolutionInputs {
    /// Read the mode flag and remote URLs from the process environment.
    pub fn from_env(modules: &[ModuleConfig]) -> Self {
        Self::from_lookup(modules, |var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(modules: &[ModuleConfig], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let development = lookup(ENV_MODE_VAR)
            .map(|v| v.trim().eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let remotes = modules
            .iter()
            .map(|m| RemoteRequirement {
                module: m.name.clone(),
                env_var: m.remote_env_var.clone(),
                url: lookup(&m.remote_env_var)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty()),
            })
            .collect();

        Self {
            development,
            remotes,
        }
    }

    /// Environment variables that are required but unset.
    pub fn missing(&self) -> Vec<&str> {
        self.remotes
            .iter()
            .filter(|r| r.url.is_none())
            .map(|r| r.env_var.as_str())
            .collect()
    }
}

/// Pick the process-wide strategy.
///
/// Local when developing or when any required URL is missing (an empty
/// requirement set counts as unconfigured); Remote otherwise.
pub fn choose_resolution_mode(inputs: &ResolutionInputs) -> ResolutionMode {
    if inputs.development {
        return ResolutionMode::Local;
    }
    if inputs.remotes.is_empty() || inputs.remotes.iter().any(|r| r.url.is_none()) {
        return ResolutionMode::Local;
    }
    ResolutionMode::Remote
}

/// Maps module names to sources under the chosen mode.
#[derive(Debug, Clone)]
pub struct RemoteModuleResolver {
    mode: ResolutionMode,
    sources: HashMap<String, ModuleSource>,
}

impl RemoteModuleResolver {
    pub fn new(modules: &[ModuleConfig], inputs: &ResolutionInputs) -> Self {
        let mode = choose_resolution_mode(inputs);

        if mode == ResolutionMode::Local && !inputs.development {
            let missing = inputs.missing();
            if !missing.is_empty() && missing.len() < inputs.remotes.len() {
                tracing::warn!(
                    missing = ?missing,
                    "Remote configuration is incomplete, aliasing every module locally"
                );
            }
        }
        tracing::info!(mode = %mode, "Module resolution mode selected");

        let urls: HashMap<&str, &str> = inputs
            .remotes
            .iter()
            .filter_map(|r| r.url.as_deref().map(|url| (r.module.as_str(), url)))
            .collect();

        let sources = modules
            .iter()
            .filter_map(|m| {
                let source = match mode {
                    ResolutionMode::Local => ModuleSource::Local {
                        alias: m.local_path.clone(),
                    },
                    ResolutionMode::Remote => ModuleSource::Remote {
                        url: remote_entry_url(urls.get(m.name.as_str())?),
                    },
                };
                Some((m.name.clone(), source))
            })
            .collect();

        Self { mode, sources }
    }

    /// Resolver driven by the process environment.
    pub fn from_env(modules: &[ModuleConfig]) -> Self {
        Self::new(modules, &ResolutionInputs::from_env(modules))
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    pub fn source_for(&self, module: &str) -> Option<&ModuleSource> {
        self.sources.get(module)
    }
}

fn remote_entry_url(base: &str) -> String {
    if base.ends_with(REMOTE_ENTRY_FILE) {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), REMOTE_ENTRY_FILE)
}
