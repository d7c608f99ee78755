use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use notice_extract::{DocumentAnalysisResult, Engine, RecognizedText};
use tracing::{info, warn};

use crate::cli::AnalyzeArgs;
use crate::util::{read_json, write_json_pretty};

pub fn run(engine: &Engine, args: &AnalyzeArgs) -> Result<()> {
    let recognized = load_passes(&args.passes)?;
    let document_id = match &args.document_id {
        Some(id) => id.clone(),
        None => default_document_id(&args.passes)?,
    };

    info!(
        document_id = %document_id,
        files = args.passes.len(),
        records = recognized.len(),
        "analyze requested"
    );

    let result = engine
        .analyze(&document_id, &recognized)
        .with_context(|| format!("failed to analyze {document_id}"))?;
    log_summary(&result);

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &result)?;
            info!(path = %path.display(), "wrote analysis result");
        }
        None => {
            let rendered =
                serde_json::to_string_pretty(&result).context("failed to serialize result")?;
            println!("{rendered}");
        }
    }

    Ok(())
}

pub fn load_passes(paths: &[PathBuf]) -> Result<Vec<RecognizedText>> {
    let mut recognized = Vec::new();
    for path in paths {
        let records: Vec<RecognizedText> = read_json(path)?;
        if records.is_empty() {
            warn!(path = %path.display(), "pass file holds no records");
        }
        recognized.extend(records);
    }
    Ok(recognized)
}

fn default_document_id(paths: &[PathBuf]) -> Result<String> {
    let Some(first) = paths.first() else {
        bail!("at least one --passes file is required");
    };
    Ok(file_stem(first))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document")
        .to_string()
}

pub fn log_summary(result: &DocumentAnalysisResult) {
    for (kind, field) in &result.aggregated_fields {
        match &field.chosen_value {
            Some(value) => info!(
                document_id = %result.document_id,
                field = kind.as_str(),
                value = %value,
                confidence = field.confidence,
                resolution = ?field.resolution,
                "field resolved"
            ),
            None => warn!(
                document_id = %result.document_id,
                field = kind.as_str(),
                alternatives = field.alternatives.len(),
                "field unresolved"
            ),
        }
    }
    for (kind, field) in &result.multi_valued_fields {
        info!(
            document_id = %result.document_id,
            field = kind.as_str(),
            values = field.entries.len(),
            rejected = field.rejected.len(),
            "multi-valued field collected"
        );
    }
    if let Some(deadline) = result.compliance_deadline_date() {
        info!(
            document_id = %result.document_id,
            deadline = %deadline.format("%d-%m-%Y"),
            confidence = result.compliance_deadline.confidence,
            resolution = ?result.compliance_deadline.resolution,
            "compliance deadline resolved"
        );
    }
    for dropped in &result.dropped_passes {
        warn!(
            document_id = %result.document_id,
            pass_id = %dropped.pass_id,
            reason = %dropped.reason,
            "pass dropped"
        );
    }
    info!(
        document_id = %result.document_id,
        overall_confidence = result.overall_confidence,
        unresolved = result.unresolved_fields.len(),
        low_confidence = result.low_confidence_fields.len(),
        "analysis summary"
    );
}
