//! Error taxonomy.
//!
//! Configuration errors are fatal and abort the run before any family is
//! touched. Translation errors are scoped to a single locale attempt and are
//! absorbed by the retry policy in [`crate::retry`].

use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the run configuration or the locale configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{key}' not found in {path}")]
    MissingKey { key: &'static str, path: PathBuf },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("default locale '{0}' is not one of the supported locales")]
    UnknownDefaultLocale(String),

    #[error("no supported locales configured")]
    NoLocales,
}

/// Recoverable failures while translating one document into one locale.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("translation is missing a front matter block with a title")]
    MissingFrontMatter,

    #[error("document is not a JSON object")]
    NotAnObject,

    #[error("invalid JSON document: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
