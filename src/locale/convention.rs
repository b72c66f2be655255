//! Filename convention for locale variants.
//!
//! Three naming forms are recognised, checked in this order:
//!
//! 1. `index.zh.mdx` - dotted locale suffix; family `<dir>/index`
//! 2. `zh.json` - bare locale stem; family `<dir>` (all sibling catalogs)
//! 3. `index.mdx` - no locale; default locale, family `<dir>/index`

use super::LocaleRegistry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Family key and locale encoded in a file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub family_key: PathBuf,
    pub locale: String,
}

/// Resolve a content file path into its family key and locale.
pub fn resolve(path: &Path, registry: &LocaleRegistry) -> Resolved {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let parts: Vec<&str> = stem.split('.').collect();
    if let Some((last, rest)) = parts.split_last() {
        if !rest.is_empty() && registry.is_supported(last) {
            return Resolved {
                family_key: dir.join(rest.join(".")),
                locale: (*last).to_string(),
            };
        }
    }

    if registry.is_supported(&stem) {
        return Resolved {
            family_key: dir.to_path_buf(),
            locale: stem,
        };
    }

    Resolved {
        family_key: dir.join(&stem),
        locale: registry.default_locale().to_string(),
    }
}

/// Destination path for a new `locale` variant of a family.
///
/// Mirrors the naming form of `source`: a bare-locale source produces a
/// bare-locale sibling, anything else gets a dotted suffix, except the
/// default locale which carries no suffix.
pub fn target_path(
    family_key: &Path,
    source: &Path,
    locale: &str,
    registry: &LocaleRegistry,
) -> PathBuf {
    let extension = source
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source_stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    if registry.is_supported(&source_stem) {
        return family_key.join(with_extension(locale, &extension));
    }

    let mut target: OsString = family_key.as_os_str().to_owned();
    if !registry.is_default(locale) {
        target.push(".");
        target.push(locale);
    }
    if !extension.is_empty() {
        target.push(".");
        target.push(&extension);
    }
    PathBuf::from(target)
}

fn with_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{}.{}", stem, extension)
    }
}
