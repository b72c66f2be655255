//! Per-locale document translation.
//!
//! [`DocumentTranslator::translate`] takes one source file and a list of
//! target locales. Each locale is translated on its own with the bounded
//! retry policy; a locale that exhausts its attempts is reported as skipped
//! and the remaining locales carry on.
//!
//! # Architecture
//!
//! - `json`: chunked, key-incremental translation of message catalogs
//! - `text`: whole-document translation of Markdown/MDX pages

pub mod json;
pub mod text;

use crate::config::Config;
use crate::error::TranslateError;
use crate::llm::ChatModel;
use crate::locale::LocaleRegistry;
use crate::retry::{with_retry, RetryConfig, RetryOutcome};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use self::json::translate_json_document;
use self::text::{translate_text_document, TextRequest};

/// Tunables shared by both document strategies.
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    /// Maximum number of catalog entries per model request
    pub chunk_size: usize,
    /// Pause between catalog batches
    pub batch_delay: Duration,
    /// Append `/no_think` to user prompts
    pub disable_thinking: bool,
    /// Per-locale retry policy
    pub retry: RetryConfig,
}

impl TranslatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.json_chunk_size,
            batch_delay: config.batch_delay,
            disable_thinking: config.disable_thinking,
            retry: RetryConfig::new(config.max_attempts, config.retry_delay),
        }
    }

    /// No pauses anywhere; three attempts.
    #[cfg(test)]
    pub(crate) fn immediate() -> Self {
        Self {
            chunk_size: 50,
            batch_delay: Duration::ZERO,
            disable_thinking: false,
            retry: RetryConfig::new(3, Duration::ZERO),
        }
    }

    pub(crate) fn user_prompt(&self, body: String) -> String {
        if self.disable_thinking {
            format!("{} /no_think", body)
        } else {
            body
        }
    }
}

/// How a file's content is translated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Json,
    Text,
}

impl DocumentKind {
    pub fn of(path: &Path) -> Self {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            DocumentKind::Json
        } else {
            DocumentKind::Text
        }
    }
}

/// A locale to translate into, with its current file when it has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub locale: String,
    pub existing: Option<PathBuf>,
}

impl TargetSpec {
    pub fn create(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            existing: None,
        }
    }

    pub fn update(locale: impl Into<String>, existing: PathBuf) -> Self {
        Self {
            locale: locale.into(),
            existing: Some(existing),
        }
    }
}

/// Per-locale results of one translation request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleResults {
    /// Translated content by locale
    pub translated: BTreeMap<String, String>,
    /// Last error by locale, for locales that ran out of attempts
    pub skipped: BTreeMap<String, String>,
}

/// Drives the model for one source document at a time.
pub struct DocumentTranslator<'a, M> {
    model: &'a M,
    registry: &'a LocaleRegistry,
    settings: TranslatorSettings,
}

impl<'a, M: ChatModel> DocumentTranslator<'a, M> {
    pub fn new(model: &'a M, registry: &'a LocaleRegistry, settings: TranslatorSettings) -> Self {
        Self {
            model,
            registry,
            settings,
        }
    }

    /// Translate `source_path` into every target locale.
    ///
    /// Targets with an `existing` file are updated incrementally; the rest are
    /// translated in full. `diff` is the meaningful diff of the source, if any.
    /// Only an unreadable source is an error.
    pub async fn translate(
        &self,
        source_path: &Path,
        source_locale: &str,
        targets: &[TargetSpec],
        diff: Option<&str>,
    ) -> Result<LocaleResults, TranslateError> {
        let source = std::fs::read_to_string(source_path).map_err(|source| TranslateError::Io {
            path: source_path.to_path_buf(),
            source,
        })?;
        info!("Read source file {}", source_path.display());

        let kind = DocumentKind::of(source_path);
        let source_name = self.registry.display_name(source_locale);
        let total = targets.len();
        let mut results = LocaleResults::default();

        for (index, target) in targets.iter().enumerate() {
            let target_name = self.registry.display_name(&target.locale);
            info!(
                "[{}/{}] Translating to {} ({})",
                index + 1,
                total,
                target_name,
                target.locale
            );

            let existing = target.existing.as_deref().and_then(|path| {
                match std::fs::read_to_string(path) {
                    Ok(content) => Some(content),
                    Err(e) => {
                        warn!(
                            "Cannot read existing translation {} ({}), translating in full",
                            path.display(),
                            e
                        );
                        None
                    }
                }
            });

            let job = LocaleJob {
                kind,
                source: &source,
                source_locale,
                source_name,
                target_locale: &target.locale,
                target_name,
                existing: existing.as_deref(),
                diff,
            };

            let outcome = with_retry(
                &self.settings.retry,
                &format!("Translation to {} ({})", target_name, target.locale),
                || self.translate_once(&job),
            )
            .await;

            match outcome {
                RetryOutcome::Success { value, .. } => {
                    info!("[{}/{}] ✓ {} done", index + 1, total, target.locale);
                    results.translated.insert(target.locale.clone(), value);
                }
                RetryOutcome::Skipped { reason, attempts } => {
                    warn!(
                        "[{}/{}] ✗ Skipping {} after {} attempts: {}",
                        index + 1,
                        total,
                        target.locale,
                        attempts,
                        reason
                    );
                    results.skipped.insert(target.locale.clone(), reason);
                }
            }
        }

        Ok(results)
    }

    async fn translate_once(&self, job: &LocaleJob<'_>) -> Result<String> {
        match job.kind {
            DocumentKind::Json => {
                translate_json_document(
                    self.model,
                    &self.settings,
                    job.source,
                    job.existing,
                    job.source_name,
                    job.target_name,
                )
                .await
            }
            DocumentKind::Text => {
                let request = TextRequest {
                    source: job.source,
                    source_locale: job.source_locale,
                    source_name: job.source_name,
                    target_locale: job.target_locale,
                    target_name: job.target_name,
                    existing: job.existing,
                    diff: job.diff,
                };
                translate_text_document(self.model, &self.settings, &request).await
            }
        }
    }
}

struct LocaleJob<'a> {
    kind: DocumentKind,
    source: &'a str,
    source_locale: &'a str,
    source_name: &'a str,
    target_locale: &'a str,
    target_name: &'a str,
    existing: Option<&'a str>,
    diff: Option<&'a str>,
}
