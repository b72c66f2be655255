//! Change sets and source-of-truth selection.
//!
//! A change set is the list of files touched by the triggering commit, each
//! optionally paired with its unified diff from the diff cache. Families that
//! no change touches are dropped from the run, and every remaining family gets
//! exactly one authoritative variant (or is reported as a conflict).

use crate::family::{DocumentFamily, FamilyIndex};
use crate::locale::LocaleRegistry;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// One changed file with its diff, if the diff cache had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: PathBuf,
    pub diff: Option<String>,
}

/// True when the diff adds or removes at least one non-blank line.
///
/// File headers (`--- a/...`, `+++ b/...`) are only recognised before the
/// first `@@` hunk of each file; inside a hunk every `+`/`-` line is content.
pub fn is_meaningful_diff(diff: &str) -> bool {
    let mut in_hunk = false;
    for line in diff.lines() {
        if line.starts_with("diff ") {
            in_hunk = false;
            continue;
        }
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        if !in_hunk && (line.starts_with("--- ") || line.starts_with("+++ ")) {
            continue;
        }
        let content = line.strip_prefix('+').or_else(|| line.strip_prefix('-'));
        if content.is_some_and(|content| !content.trim().is_empty()) {
            return true;
        }
    }
    false
}

/// Diff cache file name for a path relative to the project root.
pub fn diff_cache_name(relative: &str) -> String {
    format!("{}.diff", relative.replace(['/', '\\'], "_"))
}

/// Drop `.` components so `./docs/a.md` and `docs/a.md` compare equal.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

/// The meaningful changes of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    records: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// Build a change set from records, discarding those whose diff is not
    /// meaningful. Records without a diff (new files) are kept.
    pub fn new(records: impl IntoIterator<Item = ChangeRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|record| match &record.diff {
                Some(diff) if !is_meaningful_diff(diff) => {
                    info!(
                        "Ignoring {}: diff has no content changes",
                        record.path.display()
                    );
                    false
                }
                _ => true,
            })
            .map(|record| ChangeRecord {
                path: normalize(&record.path),
                diff: record.diff,
            })
            .collect();
        Self { records }
    }

    /// Parse a comma-separated list of paths relative to `project_root` and
    /// attach diffs from `diff_cache_dir`.
    pub fn load(raw: &str, project_root: &Path, diff_cache_dir: &Path) -> Self {
        let records = raw
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(|relative| {
                let cache_file = diff_cache_dir.join(diff_cache_name(relative));
                let diff = if cache_file.is_file() {
                    match std::fs::read_to_string(&cache_file) {
                        Ok(diff) => {
                            debug!("Loaded diff for {} from {}", relative, cache_file.display());
                            Some(diff)
                        }
                        Err(e) => {
                            warn!("Failed to read diff file {}: {}", cache_file.display(), e);
                            None
                        }
                    }
                } else {
                    debug!("No cached diff for {} (new file)", relative);
                    None
                };
                ChangeRecord {
                    path: project_root.join(relative),
                    diff,
                }
            });

        let set = Self::new(records);
        info!("Change set contains {} meaningful change(s)", set.len());
        set
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.iter().any(|record| record.path == path)
    }

    /// Diff text for a changed path, when one was cached.
    pub fn diff_for(&self, path: &Path) -> Option<&str> {
        self.records
            .iter()
            .find(|record| record.path == path)
            .and_then(|record| record.diff.as_deref())
    }

    /// Families containing at least one changed path.
    pub fn affected_families(&self, index: &FamilyIndex) -> FamilyIndex {
        index
            .iter()
            .filter(|(_, family)| self.records.iter().any(|r| family.contains_path(&r.path)))
            .map(|(key, family)| (key.clone(), family.clone()))
            .collect()
    }
}

/// Why a variant was picked as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceReason {
    /// The default-locale file itself changed
    DefaultChanged,
    /// Exactly one translation changed and nothing else in the family did
    TranslationChanged,
    /// Nothing in the family changed; default locale (or first variant) used
    Fallback,
}

/// Outcome of source-of-truth selection for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Source {
        locale: String,
        path: PathBuf,
        reason: SourceReason,
    },
    /// Several non-default variants changed at once
    Conflict { locales: Vec<String> },
    /// The family has no variants at all
    Empty,
}

/// Pick the authoritative variant of `family`.
///
/// Priority: a changed default-locale file, then a single changed
/// translation, then a conflict if several translations changed, then the
/// default-locale file or the first variant in registry order.
pub fn select_source(
    family: &DocumentFamily,
    changes: Option<&ChangeSet>,
    registry: &LocaleRegistry,
) -> SourceSelection {
    let changed: Vec<(&str, &Path)> = match changes {
        Some(changes) => family
            .ordered_variants(registry)
            .filter(|(_, path)| changes.contains(path))
            .collect(),
        None => Vec::new(),
    };

    let default_locale = registry.default_locale();
    if let Some((locale, path)) = changed.iter().find(|(locale, _)| *locale == default_locale) {
        return SourceSelection::Source {
            locale: locale.to_string(),
            path: path.to_path_buf(),
            reason: SourceReason::DefaultChanged,
        };
    }

    match changed.as_slice() {
        [(locale, path)] => SourceSelection::Source {
            locale: locale.to_string(),
            path: path.to_path_buf(),
            reason: SourceReason::TranslationChanged,
        },
        [_, _, ..] => SourceSelection::Conflict {
            locales: changed.iter().map(|(locale, _)| locale.to_string()).collect(),
        },
        [] => {
            let fallback = family
                .path_for(default_locale)
                .map(|path| (default_locale, path))
                .or_else(|| family.ordered_variants(registry).next());
            match fallback {
                Some((locale, path)) => SourceSelection::Source {
                    locale: locale.to_string(),
                    path: path.to_path_buf(),
                    reason: SourceReason::Fallback,
                },
                None => SourceSelection::Empty,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> LocaleRegistry {
        LocaleRegistry::new(
            "en",
            [("en", "English"), ("zh", "简体中文"), ("ja", "日本語")],
        )
        .unwrap()
    }

    fn family() -> DocumentFamily {
        let mut family = DocumentFamily::new(PathBuf::from("/site/docs/index"));
        family.variants.insert("en".into(), PathBuf::from("/site/docs/index.mdx"));
        family.variants.insert("zh".into(), PathBuf::from("/site/docs/index.zh.mdx"));
        family.variants.insert("ja".into(), PathBuf::from("/site/docs/index.ja.mdx"));
        family
    }

    fn changed(paths: &[&str]) -> ChangeSet {
        ChangeSet::new(paths.iter().map(|p| ChangeRecord {
            path: PathBuf::from(p),
            diff: None,
        }))
    }

    // ==================== Meaningful Diffs ====================

    #[test]
    fn test_diff_with_content_is_meaningful() {
        let diff = "--- a/index.mdx\n+++ b/index.mdx\n@@ -1,2 +1,2 @@\n-Hello\n+Hello world\n";
        assert!(is_meaningful_diff(diff));
    }

    #[test]
    fn test_diff_with_only_blank_lines_is_not_meaningful() {
        let diff = "--- a/index.mdx\n+++ b/index.mdx\n@@ -1,2 +1,4 @@\n+\n+   \n context\n";
        assert!(!is_meaningful_diff(diff));
    }

    #[test]
    fn test_removed_line_is_meaningful() {
        assert!(is_meaningful_diff("@@ -1 +0,0 @@\n-gone\n"));
    }

    #[test]
    fn test_removed_front_matter_delimiter_is_meaningful() {
        assert!(is_meaningful_diff("@@ -1,3 +1,2 @@\n----\n title: x\n"));
    }

    #[test]
    fn test_dashed_content_line_inside_hunk_is_meaningful() {
        assert!(is_meaningful_diff("@@ -1,2 +1,1 @@\n--- note\n keep\n"));
        assert!(is_meaningful_diff("@@ -1 +1,2 @@\n keep\n+++ plus\n"));
    }

    #[test]
    fn test_headers_of_second_file_are_ignored() {
        let diff = "diff --git a/a.mdx b/a.mdx\n--- a/a.mdx\n+++ b/a.mdx\n@@ -1 +1 @@\n+\n\
                    diff --git a/b.mdx b/b.mdx\n--- a/b.mdx\n+++ b/b.mdx\n@@ -1 +1 @@\n-  \n";
        assert!(!is_meaningful_diff(diff));
    }

    #[test]
    fn test_empty_diff_is_not_meaningful() {
        assert!(!is_meaningful_diff(""));
    }

    #[test]
    fn test_non_meaningful_records_are_discarded() {
        let set = ChangeSet::new([
            ChangeRecord {
                path: PathBuf::from("/a.mdx"),
                diff: Some("+\n+  \n".into()),
            },
            ChangeRecord {
                path: PathBuf::from("/b.mdx"),
                diff: Some("+text\n".into()),
            },
            ChangeRecord {
                path: PathBuf::from("/c.mdx"),
                diff: None,
            },
        ]);

        assert_eq!(set.len(), 2);
        assert!(!set.contains(Path::new("/a.mdx")));
        assert_eq!(set.diff_for(Path::new("/a.mdx")), None);
        assert_eq!(set.diff_for(Path::new("/b.mdx")), Some("+text\n"));
        assert_eq!(set.diff_for(Path::new("/c.mdx")), None);
    }

    // ==================== Loading ====================

    #[test]
    fn test_diff_cache_name_replaces_separators() {
        assert_eq!(diff_cache_name("content/docs/index.mdx"), "content_docs_index.mdx.diff");
    }

    #[test]
    fn test_load_reads_diff_cache() {
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join(".diff_cache");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("docs_a.mdx.diff"), "-old\n+new\n").unwrap();
        fs::write(cache.join("docs_b.mdx.diff"), "+\n").unwrap();

        let set = ChangeSet::load(" docs/a.mdx, docs/b.mdx ,docs/c.mdx,", dir.path(), &cache);

        assert_eq!(set.len(), 2);
        assert_eq!(set.diff_for(&dir.path().join("docs/a.mdx")), Some("-old\n+new\n"));
        assert!(!set.contains(&dir.path().join("docs/b.mdx")));
        assert!(set.contains(&dir.path().join("docs/c.mdx")));
    }

    #[test]
    fn test_load_normalizes_current_dir_components() {
        let set = ChangeSet::load("./docs/a.mdx", Path::new("/site"), Path::new("/nowhere"));
        assert!(set.contains(Path::new("/site/docs/a.mdx")));
    }

    // ==================== Affected Families ====================

    #[test]
    fn test_affected_families_filters_untouched() {
        let mut index = FamilyIndex::new();
        let first = family();
        let mut second = DocumentFamily::new(PathBuf::from("/site/docs/other"));
        second.variants.insert("en".into(), PathBuf::from("/site/docs/other.mdx"));
        index.insert(first.key.clone(), first);
        index.insert(second.key.clone(), second);

        let affected = changed(&["/site/docs/index.zh.mdx"]).affected_families(&index);

        assert_eq!(affected.len(), 1);
        assert!(affected.contains_key(Path::new("/site/docs/index")));
    }

    #[test]
    fn test_affected_families_empty_when_nothing_matches() {
        let mut index = FamilyIndex::new();
        let first = family();
        index.insert(first.key.clone(), first);

        assert!(changed(&["/site/README.md"]).affected_families(&index).is_empty());
    }

    // ==================== Source Selection ====================

    #[test]
    fn test_changed_default_is_source() {
        let changes = changed(&["/site/docs/index.mdx"]);
        let selection = select_source(&family(), Some(&changes), &registry());
        assert_eq!(
            selection,
            SourceSelection::Source {
                locale: "en".into(),
                path: PathBuf::from("/site/docs/index.mdx"),
                reason: SourceReason::DefaultChanged,
            }
        );
    }

    #[test]
    fn test_default_wins_over_changed_translations() {
        let changes = changed(&[
            "/site/docs/index.zh.mdx",
            "/site/docs/index.ja.mdx",
            "/site/docs/index.mdx",
        ]);
        let selection = select_source(&family(), Some(&changes), &registry());
        assert!(matches!(
            selection,
            SourceSelection::Source {
                ref locale,
                reason: SourceReason::DefaultChanged,
                ..
            } if locale == "en"
        ));
    }

    #[test]
    fn test_single_changed_translation_is_source() {
        let changes = changed(&["/site/docs/index.zh.mdx"]);
        let selection = select_source(&family(), Some(&changes), &registry());
        assert_eq!(
            selection,
            SourceSelection::Source {
                locale: "zh".into(),
                path: PathBuf::from("/site/docs/index.zh.mdx"),
                reason: SourceReason::TranslationChanged,
            }
        );
    }

    #[test]
    fn test_multiple_changed_translations_conflict() {
        let changes = changed(&["/site/docs/index.zh.mdx", "/site/docs/index.ja.mdx"]);
        let selection = select_source(&family(), Some(&changes), &registry());
        assert_eq!(
            selection,
            SourceSelection::Conflict {
                locales: vec!["zh".into(), "ja".into()]
            }
        );
    }

    #[test]
    fn test_no_changes_falls_back_to_default() {
        let selection = select_source(&family(), None, &registry());
        assert!(matches!(
            selection,
            SourceSelection::Source {
                ref locale,
                reason: SourceReason::Fallback,
                ..
            } if locale == "en"
        ));
    }

    #[test]
    fn test_fallback_without_default_uses_first_in_registry_order() {
        let mut family = DocumentFamily::new(PathBuf::from("/site/docs/page"));
        family.variants.insert("ja".into(), PathBuf::from("/site/docs/page.ja.mdx"));
        family.variants.insert("zh".into(), PathBuf::from("/site/docs/page.zh.mdx"));

        let selection = select_source(&family, Some(&ChangeSet::default()), &registry());
        assert!(matches!(
            selection,
            SourceSelection::Source {
                ref locale,
                reason: SourceReason::Fallback,
                ..
            } if locale == "zh"
        ));
    }

    #[test]
    fn test_empty_family() {
        let family = DocumentFamily::new(PathBuf::from("/site/docs/none"));
        assert_eq!(select_source(&family, None, &registry()), SourceSelection::Empty);
    }
}
