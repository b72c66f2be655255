//! Locale handling for the content tree.
//!
//! # Architecture
//!
//! - `registry`: the default locale and the ordered set of supported locales
//! - `loader`: reads the registry from a JSON or TypeScript i18n config
//! - `convention`: maps file names to `(family key, locale)` and back

mod convention;
mod loader;
mod registry;

pub use convention::{resolve, target_path, Resolved};
pub use loader::load_locale_registry;
pub use registry::LocaleRegistry;
