//! Active locale, kept in sync across modules and persisted across reloads.

mod engine;
mod translate;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use engine::{LocalePhase, LocaleSettings, LocaleSyncEngine};
pub use translate::{interpolate, Translations};

/// Supported locales. Persisted and broadcast by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
        }
    }

    pub fn all() -> &'static [Locale] {
        &[Self::En, Self::Es, Self::Fr, Self::De]
    }

    /// Parse a locale code. Anything other than an exact supported code
    /// (including padded or upper-case spellings) is `None`.
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::En),
            "es" => Some(Self::Es),
            "fr" => Some(Self::Fr),
            "de" => Some(Self::De),
            _ => None,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    #[error("Unsupported locale '{code}'")]
    Unsupported { code: String },
}
