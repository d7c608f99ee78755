use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::store;

pub fn run(args: &StatusArgs) -> Result<()> {
    info!(db_path = %args.db_path.display(), "status requested");

    if !args.db_path.exists() {
        warn!(path = %args.db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = store::open(&args.db_path)?;
    let summary = store::summarize(&connection)?;

    info!(
        path = %args.db_path.display(),
        schema_version = %summary.schema_version.unwrap_or_default(),
        documents = summary.document_count,
        mean_overall_confidence = summary.mean_overall_confidence.unwrap_or(0.0),
        last_analyzed_at = %summary.last_analyzed_at.unwrap_or_default(),
        "database status"
    );
    for (field_kind, count) in &summary.unresolved_by_kind {
        info!(field = %field_kind, documents = count, "unresolved field");
    }

    Ok(())
}
