//! Translation orchestrator.
//!
//! Walks the affected families in key order. For each one it picks the
//! source variant, plans create and update targets, runs one full
//! translation for the create targets and one incremental translation for
//! the update targets, and writes the results. The source file is never
//! written and nothing is ever deleted.

use crate::changes::{select_source, ChangeSet, SourceSelection};
use crate::family::{DocumentFamily, FamilyIndex};
use crate::llm::ChatModel;
use crate::locale::{target_path, LocaleRegistry};
use crate::planner::{plan, FamilyPlan, PlanMode};
use crate::translate::{DocumentTranslator, LocaleResults, TargetSpec, TranslatorSettings};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What happened to one family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyOutcome {
    pub key: PathBuf,
    pub source_locale: Option<String>,
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    /// Locales that were not written, with the reason
    pub skipped: BTreeMap<String, String>,
    /// Locales whose simultaneous edits made the source ambiguous
    pub conflict: Option<Vec<String>>,
    /// Set when the source variant could not be read
    pub source_error: Option<String>,
}

/// Per-family outcomes of one run, in family key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub families: Vec<FamilyOutcome>,
}

impl RunReport {
    pub fn created_count(&self) -> usize {
        self.families.iter().map(|f| f.created.len()).sum()
    }

    pub fn updated_count(&self) -> usize {
        self.families.iter().map(|f| f.updated.len()).sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.families.iter().map(|f| f.skipped.len()).sum()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &FamilyOutcome> {
        self.families.iter().filter(|f| f.conflict.is_some())
    }

    pub fn log_summary(&self) {
        for family in self.conflicts() {
            warn!(
                "Conflict in {}: {} changed together, family skipped",
                family.key.display(),
                family.conflict.as_deref().unwrap_or_default().join(", ")
            );
        }
        for family in self.families.iter().filter(|f| f.source_error.is_some()) {
            warn!(
                "Source unreadable for {}: {}",
                family.key.display(),
                family.source_error.as_deref().unwrap_or_default()
            );
        }
        info!(
            "Run complete: {} families, {} created, {} updated, {} skipped, {} conflicts",
            self.families.len(),
            self.created_count(),
            self.updated_count(),
            self.skipped_count(),
            self.conflicts().count()
        );
    }
}

/// Drives translation for every family in an index.
pub struct Pipeline<'a, M> {
    registry: &'a LocaleRegistry,
    translator: DocumentTranslator<'a, M>,
}

impl<'a, M: ChatModel> Pipeline<'a, M> {
    pub fn new(model: &'a M, registry: &'a LocaleRegistry, settings: TranslatorSettings) -> Self {
        Self {
            registry,
            translator: DocumentTranslator::new(model, registry, settings),
        }
    }

    /// Process `families` one at a time.
    ///
    /// Without a change set only missing locales are created. Per-family
    /// failures end up in the report; the run itself never fails.
    pub async fn run(&self, families: &FamilyIndex, changes: Option<&ChangeSet>) -> RunReport {
        let mode = match changes {
            Some(_) => PlanMode::CreateAndUpdate,
            None => PlanMode::CreateOnly,
        };
        let total = families.len();
        let mut report = RunReport::default();

        for (index, family) in families.values().enumerate() {
            info!(
                "[{}/{}] Processing family {}",
                index + 1,
                total,
                family.key.display()
            );
            let outcome = self.process_family(family, changes, mode).await;
            report.families.push(outcome);
        }

        report
    }

    async fn process_family(
        &self,
        family: &DocumentFamily,
        changes: Option<&ChangeSet>,
        mode: PlanMode,
    ) -> FamilyOutcome {
        let mut outcome = FamilyOutcome {
            key: family.key.clone(),
            ..FamilyOutcome::default()
        };

        let (source_locale, source_path, reason) =
            match select_source(family, changes, self.registry) {
                SourceSelection::Source {
                    locale,
                    path,
                    reason,
                } => (locale, path, reason),
                SourceSelection::Conflict { locales } => {
                    warn!(
                        "✗ Several translations of {} changed ({}), skipping",
                        family.key.display(),
                        locales.join(", ")
                    );
                    outcome.conflict = Some(locales);
                    return outcome;
                }
                SourceSelection::Empty => {
                    debug!("Family {} has no variants", family.key.display());
                    return outcome;
                }
            };
        info!("Source: {} ({:?})", source_path.display(), reason);
        outcome.source_locale = Some(source_locale.clone());

        let work = plan(
            family.clone(),
            &source_locale,
            source_path,
            reason,
            mode,
            self.registry,
        );
        if work.is_empty() {
            info!("Nothing to do for {}", family.key.display());
            return outcome;
        }

        if !work.create_targets.is_empty() {
            info!("Creating: {}", work.create_targets.join(", "));
            let targets: Vec<TargetSpec> = work
                .create_targets
                .iter()
                .map(|locale| TargetSpec::create(locale.as_str()))
                .collect();
            let destinations: BTreeMap<String, PathBuf> = work
                .create_targets
                .iter()
                .map(|locale| {
                    let path = target_path(&family.key, &work.source_path, locale, self.registry);
                    (locale.clone(), path)
                })
                .collect();
            if !self
                .translate_and_write(&work, &targets, None, &destinations, &mut outcome, true)
                .await
            {
                return outcome;
            }
        }

        if !work.update_targets.is_empty() {
            info!("Updating: {}", work.update_targets.join(", "));
            let diff = changes.and_then(|c| c.diff_for(&work.source_path));
            let destinations: BTreeMap<String, PathBuf> = work
                .update_targets
                .iter()
                .filter_map(|locale| Some((locale.clone(), family.path_for(locale)?.to_path_buf())))
                .collect();
            let targets: Vec<TargetSpec> = work
                .update_targets
                .iter()
                .filter_map(|locale| {
                    let existing = destinations.get(locale)?.clone();
                    Some(TargetSpec::update(locale.as_str(), existing))
                })
                .collect();
            self.translate_and_write(&work, &targets, diff, &destinations, &mut outcome, false)
                .await;
        }

        outcome
    }

    /// Returns false when the source could not be read.
    async fn translate_and_write(
        &self,
        work: &FamilyPlan,
        targets: &[TargetSpec],
        diff: Option<&str>,
        destinations: &BTreeMap<String, PathBuf>,
        outcome: &mut FamilyOutcome,
        creating: bool,
    ) -> bool {
        let results: LocaleResults = match self
            .translator
            .translate(&work.source_path, &work.source_locale, targets, diff)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!("✗ {}", e);
                outcome.source_error = Some(e.to_string());
                return false;
            }
        };

        outcome.skipped.extend(results.skipped);
        for (locale, content) in results.translated {
            let Some(destination) = destinations.get(&locale) else {
                continue;
            };
            match write_document(destination, &content) {
                Ok(()) => {
                    info!("✓ Wrote {}", destination.display());
                    if creating {
                        outcome.created.push(destination.clone());
                    } else {
                        outcome.updated.push(destination.clone());
                    }
                }
                Err(e) => {
                    warn!("✗ {:#}", e);
                    outcome.skipped.insert(locale, format!("{:#}", e));
                }
            }
        }
        true
    }
}

fn write_document(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
