//! Document families: locale variants of the same logical document.
//!
//! Families are rebuilt from a full scan on every run and never persisted.

use crate::locale::{resolve, LocaleRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// File extensions that take part in translation.
pub const CONTENT_EXTENSIONS: [&str; 3] = ["md", "mdx", "json"];

/// All locale variants sharing one family key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFamily {
    pub key: PathBuf,
    /// At most one file per locale
    pub variants: BTreeMap<String, PathBuf>,
}

impl DocumentFamily {
    pub fn new(key: PathBuf) -> Self {
        Self {
            key,
            variants: BTreeMap::new(),
        }
    }

    pub fn path_for(&self, locale: &str) -> Option<&Path> {
        self.variants.get(locale).map(PathBuf::as_path)
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.variants.values().any(|variant| variant == path)
    }

    /// Variants in registry order; locales the registry does not know come last.
    pub fn ordered_variants<'a>(
        &'a self,
        registry: &'a LocaleRegistry,
    ) -> impl Iterator<Item = (&'a str, &'a Path)> + 'a {
        let known = registry
            .codes()
            .filter_map(move |code| self.variants.get_key_value(code))
            .map(|(code, path)| (code.as_str(), path.as_path()));
        let unknown = self
            .variants
            .iter()
            .filter(move |(code, _)| !registry.is_supported(code))
            .map(|(code, path)| (code.as_str(), path.as_path()));
        known.chain(unknown)
    }
}

/// Families keyed by their locale-independent path prefix.
pub type FamilyIndex = BTreeMap<PathBuf, DocumentFamily>;

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext))
}

/// Scan `directories` recursively and group content files into families.
///
/// Unreadable entries and missing directories are logged and skipped. If two
/// files resolve to the same family and locale, the one visited last wins.
pub fn build_family_index(directories: &[PathBuf], registry: &LocaleRegistry) -> FamilyIndex {
    let mut index = FamilyIndex::new();

    for directory in directories {
        if !directory.is_dir() {
            warn!("Scan directory {} does not exist, skipping", directory.display());
            continue;
        }
        info!("Scanning {}", directory.display());

        let walker = WalkDir::new(directory).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry under {}: {}", directory.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_content_file(entry.path()) {
                continue;
            }

            let resolved = resolve(entry.path(), registry);
            debug!(
                "{} -> family {} ({})",
                entry.path().display(),
                resolved.family_key.display(),
                resolved.locale
            );
            let family = index
                .entry(resolved.family_key.clone())
                .or_insert_with(|| DocumentFamily::new(resolved.family_key));
            if let Some(previous) = family
                .variants
                .insert(resolved.locale.clone(), entry.path().to_path_buf())
            {
                warn!(
                    "{} and {} are both the '{}' variant of {}, keeping the latter",
                    previous.display(),
                    entry.path().display(),
                    resolved.locale,
                    family.key.display()
                );
            }
        }
    }

    info!("Scan complete: {} document families", index.len());
    index
}
