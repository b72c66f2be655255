//! Locale registry: the default locale plus every supported locale.
//!
//! Loaded once per run and immutable afterwards. Locales keep the order in
//! which the configuration lists them; that order drives target ordering and
//! source fallback elsewhere.

use crate::error::ConfigError;

/// A supported locale and its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocaleEntry {
    /// Locale code as used in file names (e.g. "en", "zh")
    code: String,

    /// Human-readable name passed to the translation model (e.g. "English")
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRegistry {
    default_locale: String,
    locales: Vec<LocaleEntry>,
}

impl LocaleRegistry {
    /// Build a registry, rejecting an empty locale list and a default locale
    /// that is not supported. Duplicate codes keep their first position and
    /// the last display name.
    pub fn new<I, C, N>(default_locale: impl Into<String>, locales: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        let default_locale = default_locale.into();
        let mut entries: Vec<LocaleEntry> = Vec::new();

        for (code, name) in locales {
            let code = code.into();
            let name = name.into();
            match entries.iter_mut().find(|entry| entry.code == code) {
                Some(existing) => existing.name = name,
                None => entries.push(LocaleEntry { code, name }),
            }
        }

        if entries.is_empty() {
            return Err(ConfigError::NoLocales);
        }
        if !entries.iter().any(|entry| entry.code == default_locale) {
            return Err(ConfigError::UnknownDefaultLocale(default_locale));
        }

        Ok(Self {
            default_locale,
            locales: entries,
        })
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn is_default(&self, code: &str) -> bool {
        self.default_locale == code
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.locales.iter().any(|entry| entry.code == code)
    }

    /// Supported locale codes in configuration order.
    pub fn codes(&self) -> impl Iterator<Item = &str> + '_ {
        self.locales.iter().map(|entry| entry.code.as_str())
    }

    /// Display name for a locale, falling back to the code itself.
    pub fn display_name<'a>(&'a self, code: &'a str) -> &'a str {
        self.locales
            .iter()
            .find(|entry| entry.code == code)
            .map(|entry| entry.name.as_str())
            .unwrap_or(code)
    }
}
