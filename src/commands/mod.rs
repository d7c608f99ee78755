pub mod analyze;
pub mod scan;
pub mod status;

use anyhow::{Context, Result};
use chrono::Utc;
use notice_extract::{Engine, EngineConfig, Lexicon};
use tracing::info;

use crate::cli::Cli;

/// Builds the engine from the global options. Without an explicit
/// reference date the plausible-date window ends relative to today.
pub fn build_engine(cli: &Cli) -> Result<Engine> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let lexicon = match &cli.lexicon {
        Some(path) => Lexicon::from_json_file(path)
            .with_context(|| format!("failed to load lexicon {}", path.display()))?,
        None => Lexicon::builtin(),
    };

    let reference_date = cli
        .reference_date
        .or(config.reference_date)
        .unwrap_or_else(|| Utc::now().date_naive());
    info!(reference_date = %reference_date, "building engine");

    Engine::new(config.with_reference_date(reference_date), lexicon)
        .context("failed to build extraction engine")
}
