use anyhow::{Context, Result};
use clap::Parser;
use i18n_docsync::changes::ChangeSet;
use i18n_docsync::config::Config;
use i18n_docsync::family::build_family_index;
use i18n_docsync::llm::OpenAiClient;
use i18n_docsync::locale::load_locale_registry;
use i18n_docsync::pipeline::Pipeline;
use i18n_docsync::translate::TranslatorSettings;
use std::path::PathBuf;
use tracing::info;

/// Translate missing and stale locale variants of a documentation tree.
#[derive(Debug, Parser)]
#[command(name = "i18n-docsync", version, about)]
struct Args {
    /// Comma-separated files changed by the triggering commit, relative to
    /// the project root. Without it only missing translations are created.
    #[arg(long, value_name = "FILES")]
    changed_files: Option<String>,

    /// Project root that relative paths resolve against
    #[arg(long, env = "PROJECT_ROOT", value_name = "DIR")]
    project_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in CI)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("i18n_docsync=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Starting documentation translation sync");

    // Load configuration from environment
    let mut config = Config::from_env()?;
    if let Some(root) = args.project_root {
        config.set_project_root(root);
    }

    // Step 1: Load supported locales
    let registry = load_locale_registry(&config.i18n_config_path).with_context(|| {
        format!(
            "Failed to load locale configuration from {}",
            config.i18n_config_path.display()
        )
    })?;

    // Step 2: Group content files into families
    let index = build_family_index(&config.scan_dirs, &registry);

    // Step 3: Narrow to the families touched by this change set
    let changes = args
        .changed_files
        .as_deref()
        .map(|raw| ChangeSet::load(raw, &config.project_root, &config.diff_cache_dir));
    let families = match &changes {
        Some(changes) => {
            let affected = changes.affected_families(&index);
            if affected.is_empty() {
                info!("No families affected by this change set, nothing to do");
                return Ok(());
            }
            affected
        }
        None => {
            info!("No change set given, creating missing translations only");
            index
        }
    };
    info!("Processing {} families", families.len());

    // Step 4: Translate and write
    let client = OpenAiClient::new(&config)?;
    let report = Pipeline::new(&client, &registry, TranslatorSettings::from_config(&config))
        .run(&families, changes.as_ref())
        .await;

    report.log_summary();
    Ok(())
}
