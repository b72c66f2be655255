// Library crate for i18n-docsync
// This allows integration tests to access the modules

pub mod changes;
pub mod config;
pub mod error;
pub mod family;
pub mod llm;
pub mod locale;
pub mod pipeline;
pub mod planner;
pub mod retry;
pub mod translate;
