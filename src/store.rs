use std::path::Path;

use anyhow::{Context, Result};
use notice_extract::{DocumentAnalysisResult, FieldKind, Resolution};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::util::ensure_directory;

pub const DB_SCHEMA_VERSION: &str = "1";
const COMPLIANCE_DEADLINE: &str = "compliance_deadline";

/// Where and when a stored analysis came from.
#[derive(Debug, Clone)]
pub struct AnalysisRecord<'a> {
    pub source_path: &'a str,
    pub sha256: &'a str,
    pub analyzed_at: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSummary {
    pub schema_version: Option<String>,
    pub document_count: i64,
    pub mean_overall_confidence: Option<f64>,
    pub last_analyzed_at: Option<String>,
    pub unresolved_by_kind: Vec<(String, i64)>,
}

pub fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_directory(parent)?;
    }
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS analyses (
              document_id TEXT PRIMARY KEY,
              source_path TEXT NOT NULL,
              sha256 TEXT NOT NULL,
              analyzed_at TEXT NOT NULL,
              overall_confidence REAL NOT NULL,
              unresolved_count INTEGER NOT NULL,
              result_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS analysis_fields (
              document_id TEXT NOT NULL,
              field_kind TEXT NOT NULL,
              value TEXT,
              confidence REAL NOT NULL,
              resolution TEXT NOT NULL,
              FOREIGN KEY(document_id) REFERENCES analyses(document_id)
            );

            CREATE INDEX IF NOT EXISTS idx_analysis_fields_document
              ON analysis_fields(document_id);
            ",
        )
        .context("failed to create analysis schema")?;

    connection
        .execute(
            "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;
    Ok(())
}

/// Replaces whatever was stored for the document. Field rows are rewritten
/// with it so they never mix two analyses.
pub fn upsert_analysis(
    connection: &mut Connection,
    record: &AnalysisRecord<'_>,
    result: &DocumentAnalysisResult,
) -> Result<()> {
    let result_json =
        serde_json::to_string(result).context("failed to serialize analysis result")?;
    let tx = connection.transaction()?;

    tx.execute(
        "
        INSERT INTO analyses(
          document_id, source_path, sha256, analyzed_at,
          overall_confidence, unresolved_count, result_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(document_id) DO UPDATE SET
          source_path = excluded.source_path,
          sha256 = excluded.sha256,
          analyzed_at = excluded.analyzed_at,
          overall_confidence = excluded.overall_confidence,
          unresolved_count = excluded.unresolved_count,
          result_json = excluded.result_json
        ",
        params![
            result.document_id,
            record.source_path,
            record.sha256,
            record.analyzed_at,
            result.overall_confidence,
            result.unresolved_fields.len() as i64,
            result_json,
        ],
    )
    .with_context(|| format!("failed to upsert analysis {}", result.document_id))?;

    tx.execute(
        "DELETE FROM analysis_fields WHERE document_id = ?1",
        params![result.document_id],
    )?;

    let rows = field_rows(result);
    {
        let mut insert = tx.prepare(
            "INSERT INTO analysis_fields(document_id, field_kind, value, confidence, resolution)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for row in &rows {
            insert.execute(params![
                result.document_id,
                row.field_kind,
                row.value,
                row.confidence,
                row.resolution,
            ])?;
        }
    }
    tx.commit()
        .with_context(|| format!("failed to commit analysis {}", result.document_id))?;

    debug!(
        document_id = %result.document_id,
        field_rows = rows.len(),
        "stored analysis"
    );
    Ok(())
}

struct FieldRow {
    field_kind: &'static str,
    value: Option<String>,
    confidence: f64,
    resolution: &'static str,
}

/// One row per resolved single-valued field, one per collected value, and a
/// valueless row for every kind nothing was found for. A resolved compliance
/// deadline adds a `compliance_deadline` row.
fn field_rows(result: &DocumentAnalysisResult) -> Vec<FieldRow> {
    let mut rows = Vec::new();
    for kind in FieldKind::ALL {
        if let Some(field) = result.aggregated_fields.get(&kind) {
            rows.push(FieldRow {
                field_kind: kind.as_str(),
                value: field.chosen_value.as_ref().map(ToString::to_string),
                confidence: field.confidence,
                resolution: resolution_label(field.resolution),
            });
        } else if let Some(field) = result.multi_valued_fields.get(&kind) {
            if field.entries.is_empty() {
                rows.push(FieldRow {
                    field_kind: kind.as_str(),
                    value: None,
                    confidence: 0.0,
                    resolution: resolution_label(Resolution::Unresolved),
                });
            }
            for entry in &field.entries {
                rows.push(FieldRow {
                    field_kind: kind.as_str(),
                    value: Some(entry.value.to_string()),
                    confidence: entry.confidence,
                    resolution: "collected",
                });
            }
        }
    }
    let deadline = &result.compliance_deadline;
    if let Some(value) = &deadline.chosen_value {
        rows.push(FieldRow {
            field_kind: COMPLIANCE_DEADLINE,
            value: Some(value.to_string()),
            confidence: deadline.confidence,
            resolution: resolution_label(deadline.resolution),
        });
    }
    rows
}

fn resolution_label(resolution: Resolution) -> &'static str {
    match resolution {
        Resolution::Unanimous => "unanimous",
        Resolution::Majority => "majority",
        Resolution::HighestConfidence => "highest_confidence",
        Resolution::Unresolved => "unresolved",
    }
}

pub fn summarize(connection: &Connection) -> Result<StoreSummary> {
    let schema_version = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("failed to read schema version")?;

    let (document_count, mean_overall_confidence, last_analyzed_at) = connection
        .query_row(
            "SELECT COUNT(*), AVG(overall_confidence), MAX(analyzed_at) FROM analyses",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .context("failed to summarize analyses")?;

    let mut statement = connection.prepare(
        "SELECT field_kind, COUNT(*) FROM analysis_fields
         WHERE value IS NULL
         GROUP BY field_kind
         ORDER BY field_kind",
    )?;
    let unresolved_by_kind = statement
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()
        .context("failed to count unresolved fields")?;

    Ok(StoreSummary {
        schema_version,
        document_count,
        mean_overall_confidence,
        last_analyzed_at,
        unresolved_by_kind,
    })
}

pub fn stored_sha256(connection: &Connection, document_id: &str) -> Result<Option<String>> {
    connection
        .query_row(
            "SELECT sha256 FROM analyses WHERE document_id = ?1",
            params![document_id],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to look up analysis {document_id}"))
}
