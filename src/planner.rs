//! Work planning: which locales of a family to create and which to update.

use crate::changes::SourceReason;
use crate::family::DocumentFamily;
use crate::locale::LocaleRegistry;
use std::path::PathBuf;

/// Whether existing translations may be rewritten during this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    /// Only fill in missing locales (no change set was supplied)
    CreateOnly,
    /// Fill in missing locales and refresh existing ones from the source
    CreateAndUpdate,
}

/// Work for one family. Target lists follow registry order and never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyPlan {
    pub family: DocumentFamily,
    pub source_locale: String,
    pub source_path: PathBuf,
    pub create_targets: Vec<String>,
    pub update_targets: Vec<String>,
}

impl FamilyPlan {
    pub fn is_empty(&self) -> bool {
        self.create_targets.is_empty() && self.update_targets.is_empty()
    }
}

/// Split the supported locales into create and update targets.
///
/// Locales without a variant are created. Existing variants other than the
/// source are updated, except that a translation-sourced plan never touches
/// the default-locale file.
pub fn plan(
    family: DocumentFamily,
    source_locale: &str,
    source_path: PathBuf,
    reason: SourceReason,
    mode: PlanMode,
    registry: &LocaleRegistry,
) -> FamilyPlan {
    let mut create_targets = Vec::new();
    let mut update_targets = Vec::new();

    for code in registry.codes().filter(|code| *code != source_locale) {
        if family.path_for(code).is_none() {
            create_targets.push(code.to_string());
            continue;
        }
        if mode == PlanMode::CreateOnly {
            continue;
        }
        if reason == SourceReason::TranslationChanged && registry.is_default(code) {
            continue;
        }
        update_targets.push(code.to_string());
    }

    FamilyPlan {
        family,
        source_locale: source_locale.to_string(),
        source_path,
        create_targets,
        update_targets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LocaleRegistry {
        LocaleRegistry::new(
            "en",
            [("en", "English"), ("zh", "简体中文"), ("ja", "日本語"), ("ko", "한국어")],
        )
        .unwrap()
    }

    fn family(locales: &[&str]) -> DocumentFamily {
        let mut family = DocumentFamily::new(PathBuf::from("/docs/index"));
        for locale in locales {
            let name = if *locale == "en" {
                "/docs/index.mdx".to_string()
            } else {
                format!("/docs/index.{}.mdx", locale)
            };
            family.variants.insert(locale.to_string(), PathBuf::from(name));
        }
        family
    }

    #[test]
    fn test_default_source_updates_existing_and_creates_missing() {
        let plan = plan(
            family(&["en", "zh"]),
            "en",
            PathBuf::from("/docs/index.mdx"),
            SourceReason::DefaultChanged,
            PlanMode::CreateAndUpdate,
            &registry(),
        );

        assert_eq!(plan.update_targets, vec!["zh"]);
        assert_eq!(plan.create_targets, vec!["ja", "ko"]);
    }

    #[test]
    fn test_source_locale_is_never_a_target() {
        let plan = plan(
            family(&["en", "zh", "ja", "ko"]),
            "ja",
            PathBuf::from("/docs/index.ja.mdx"),
            SourceReason::Fallback,
            PlanMode::CreateAndUpdate,
            &registry(),
        );

        assert!(!plan.create_targets.contains(&"ja".to_string()));
        assert!(!plan.update_targets.contains(&"ja".to_string()));
        assert_eq!(plan.update_targets, vec!["en", "zh", "ko"]);
    }

    #[test]
    fn test_translation_source_leaves_default_alone() {
        let plan = plan(
            family(&["en", "zh", "ja"]),
            "zh",
            PathBuf::from("/docs/index.zh.mdx"),
            SourceReason::TranslationChanged,
            PlanMode::CreateAndUpdate,
            &registry(),
        );

        assert_eq!(plan.update_targets, vec!["ja"]);
        assert_eq!(plan.create_targets, vec!["ko"]);
    }

    #[test]
    fn test_translation_source_still_creates_missing_default() {
        let plan = plan(
            family(&["zh"]),
            "zh",
            PathBuf::from("/docs/index.zh.mdx"),
            SourceReason::TranslationChanged,
            PlanMode::CreateAndUpdate,
            &registry(),
        );

        assert_eq!(plan.create_targets, vec!["en", "ja", "ko"]);
        assert!(plan.update_targets.is_empty());
    }

    #[test]
    fn test_create_only_mode_skips_updates() {
        let plan = plan(
            family(&["en", "zh"]),
            "en",
            PathBuf::from("/docs/index.mdx"),
            SourceReason::Fallback,
            PlanMode::CreateOnly,
            &registry(),
        );

        assert!(plan.update_targets.is_empty());
        assert_eq!(plan.create_targets, vec!["ja", "ko"]);
    }

    #[test]
    fn test_complete_family_in_create_only_mode_is_empty() {
        let plan = plan(
            family(&["en", "zh", "ja", "ko"]),
            "en",
            PathBuf::from("/docs/index.mdx"),
            SourceReason::Fallback,
            PlanMode::CreateOnly,
            &registry(),
        );

        assert!(plan.is_empty());
    }
}
