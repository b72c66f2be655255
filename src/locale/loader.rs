//! Locale configuration loading.
//!
//! Two sources are understood:
//! - a JSON file: `{"defaultLocale": "en", "supportedLocales": {"en": "English"}}`
//! - a TypeScript/JavaScript i18n module declaring `defaultLocale` and a
//!   `supportedLocales = { en: 'English', ... }` object literal
//!
//! The format is picked from the file extension; anything that is not
//! `.json` is read as a script module.

use super::LocaleRegistry;
use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

static DEFAULT_LOCALE_REGEX: OnceLock<Regex> = OnceLock::new();
static SUPPORTED_LOCALES_REGEX: OnceLock<Regex> = OnceLock::new();
static LOCALE_PAIR_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonLocaleConfig {
    default_locale: Option<String>,
    supported_locales: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Read the locale registry from an i18n configuration file.
pub fn load_locale_registry(path: &Path) -> Result<LocaleRegistry, ConfigError> {
    info!("Reading locale configuration from {}", path.display());

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let registry = if is_json {
        parse_json_config(&content, path)?
    } else {
        parse_script_config(&content, path)?
    };

    info!(
        "✓ Locale configuration loaded: default='{}', supported={:?}",
        registry.default_locale(),
        registry.codes().collect::<Vec<_>>()
    );
    Ok(registry)
}

fn parse_json_config(content: &str, path: &Path) -> Result<LocaleRegistry, ConfigError> {
    let config: JsonLocaleConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::InvalidValue {
            key: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let default_locale = config.default_locale.ok_or_else(|| ConfigError::MissingKey {
        key: "defaultLocale",
        path: path.to_path_buf(),
    })?;
    let supported = config.supported_locales.ok_or_else(|| ConfigError::MissingKey {
        key: "supportedLocales",
        path: path.to_path_buf(),
    })?;

    let mut pairs = Vec::with_capacity(supported.len());
    for (code, name) in supported {
        let name = match name {
            serde_json::Value::String(name) => name,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: format!("supportedLocales.{}", code),
                    reason: format!("expected a display name string, got {}", other),
                })
            }
        };
        pairs.push((code, name));
    }

    LocaleRegistry::new(default_locale, pairs)
}

fn parse_script_config(content: &str, path: &Path) -> Result<LocaleRegistry, ConfigError> {
    let default_regex = DEFAULT_LOCALE_REGEX.get_or_init(|| {
        Regex::new(r#"defaultLocale\s*(?::[^=\n]*=|=|:)\s*['"]([\w-]+)['"]"#).unwrap()
    });
    let locales_regex = SUPPORTED_LOCALES_REGEX.get_or_init(|| {
        Regex::new(r"(?s)supportedLocales\s*(?::[^=\n]*)?=\s*\{(.*?)\}").unwrap()
    });
    let pair_regex = LOCALE_PAIR_REGEX.get_or_init(|| {
        Regex::new(r#"['"]?([\w-]+)['"]?\s*:\s*['"]([^'"]*)['"]"#).unwrap()
    });

    let default_locale = default_regex
        .captures(content)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| ConfigError::MissingKey {
            key: "defaultLocale",
            path: path.to_path_buf(),
        })?;

    let body = locales_regex
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ConfigError::MissingKey {
            key: "supportedLocales",
            path: path.to_path_buf(),
        })?;

    let pairs = pair_regex
        .captures_iter(body)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()));

    LocaleRegistry::new(default_locale, pairs)
}
