mod discovery;
mod ocr_tools;
#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use notice_extract::{Engine, RecognizedText};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::cli::ScanArgs;
use crate::commands::analyze::log_summary;
use crate::manifest::{DocumentEntry, ScanCounts, ScanManifest, ScanPaths, SourceKind};
use crate::store::{self, AnalysisRecord};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

use discovery::{DiscoveredDocument, discover_documents};
use ocr_tools::{
    collect_tool_versions, command_available, non_whitespace_char_count, ocr_image,
    rasterize_pdf, scratch_directory,
};

pub fn run(engine: &Engine, args: &ScanArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("scan-{}", utc_compact_string(started_ts));

    if args.ocr_langs.is_empty() {
        bail!("at least one --ocr-lang is required");
    }
    if !command_available("tesseract") {
        bail!("tesseract is not installed or not on PATH");
    }

    ensure_directory(&args.output_dir)?;
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join("analyses.sqlite"));
    let manifest_path = args
        .output_dir
        .join(format!("scan_run_{}.json", utc_compact_string(started_ts)));

    info!(
        input_dir = %args.input_dir.display(),
        output_dir = %args.output_dir.display(),
        run_id = %run_id,
        "starting scan"
    );

    let documents = discover_documents(&args.input_dir)?;
    if documents.is_empty() {
        warn!(input_dir = %args.input_dir.display(), "no scannable documents found");
    }

    let tool_versions = collect_tool_versions();
    let mut warnings = Vec::new();
    if tool_versions.pdftoppm.is_none()
        && documents
            .iter()
            .any(|document| document.source_kind == SourceKind::Pdf)
    {
        warnings.push("pdftoppm not found; PDF documents cannot be rasterized".to_string());
    }

    let mut connection = store::open(&db_path)?;
    let mut counts = ScanCounts {
        document_count: documents.len(),
        ..ScanCounts::default()
    };
    let mut entries = Vec::with_capacity(documents.len());

    for document in &documents {
        let entry = match scan_document(engine, args, document, &mut connection) {
            Ok(entry) => {
                counts.analyzed_count += 1;
                entry
            }
            Err(err) => {
                warn!(file = %document.filename, error = %format!("{err:#}"), "document failed");
                warnings.push(format!("{}: {err:#}", document.filename));
                counts.failed_count += 1;
                failed_entry(document, &err)
            }
        };
        counts.page_count += entry.page_count;
        counts.ocr_fallback_page_count += entry.ocr_fallback_page_count;
        counts.unresolved_field_count += entry.unresolved_fields.len();
        entries.push(entry);
    }

    let manifest = ScanManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        status: if counts.failed_count == 0 {
            "completed".to_string()
        } else {
            "completed_with_failures".to_string()
        },
        started_at,
        updated_at: now_utc_string(),
        command: render_scan_command(args),
        ocr_langs: args.ocr_langs.clone(),
        fallback_lang: args.fallback_lang.clone(),
        reference_date: engine
            .config()
            .reference_date
            .map(|date| date.to_string())
            .unwrap_or_default(),
        tool_versions,
        paths: ScanPaths {
            input_dir: args.input_dir.display().to_string(),
            output_dir: args.output_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts,
        documents: entries,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote scan manifest");
    info!(
        run_id = %run_id,
        documents = manifest.counts.document_count,
        analyzed = manifest.counts.analyzed_count,
        failed = manifest.counts.failed_count,
        pages = manifest.counts.page_count,
        ocr_fallback_pages = manifest.counts.ocr_fallback_page_count,
        "scan completed"
    );

    Ok(())
}

fn scan_document(
    engine: &Engine,
    args: &ScanArgs,
    document: &DiscoveredDocument,
    connection: &mut Connection,
) -> Result<DocumentEntry> {
    let sha256 = sha256_file(&document.path)?;
    let document_id = document_id_for(&sha256);
    info!(file = %document.filename, document_id = %document_id, "scanning document");
    if store::stored_sha256(connection, &document_id)?.is_some() {
        debug!(document_id = %document_id, "replacing stored analysis");
    }

    let (recognized, page_count, ocr_fallback_page_count) = match document.source_kind {
        SourceKind::Image => {
            let (recognized, fallback) =
                recognize_pages(std::slice::from_ref(&document.path), args)?;
            (recognized, 1, fallback)
        }
        SourceKind::Pdf => {
            let work_dir = scratch_directory(document.stem());
            let outcome = rasterize_pdf(&document.path, args.dpi, &work_dir).and_then(|images| {
                let (recognized, fallback) = recognize_pages(&images, args)?;
                Ok((recognized, images.len(), fallback))
            });
            if let Err(err) = fs::remove_dir_all(&work_dir) {
                debug!(
                    path = %work_dir.display(),
                    error = %err,
                    "failed to remove scratch directory"
                );
            }
            outcome?
        }
    };

    let result = engine
        .analyze(&document_id, &recognized)
        .with_context(|| format!("failed to analyze {}", document.filename))?;
    log_summary(&result);

    let report_path = report_path_for(&args.output_dir, document);
    write_json_pretty(&report_path, &result)?;

    let analyzed_at = now_utc_string();
    let source_path = document.path.display().to_string();
    store::upsert_analysis(
        connection,
        &AnalysisRecord {
            source_path: &source_path,
            sha256: &sha256,
            analyzed_at: &analyzed_at,
        },
        &result,
    )?;

    Ok(DocumentEntry {
        filename: document.filename.clone(),
        document_id,
        sha256,
        source_kind: document.source_kind,
        page_count,
        pass_count: result.passes.len(),
        ocr_fallback_page_count,
        overall_confidence: Some(result.overall_confidence),
        unresolved_fields: result
            .unresolved_fields
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
        report_path: Some(report_path.display().to_string()),
        error: None,
    })
}

/// Runs every configured OCR language over each page concurrently. A
/// language that reads too little from a page is retried with the fallback
/// language, and the richer reading is kept under the original pass id.
fn recognize_pages(images: &[PathBuf], args: &ScanArgs) -> Result<(Vec<RecognizedText>, usize)> {
    let mut recognized = Vec::with_capacity(images.len() * args.ocr_langs.len());
    let mut fallback_pages = 0;

    for (index, image) in images.iter().enumerate() {
        let page_number = u32::try_from(index + 1).context("page number overflow")?;

        let readings = thread::scope(|scope| {
            let handles = args
                .ocr_langs
                .iter()
                .map(|lang| scope.spawn(move || ocr_image(image, lang)))
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| anyhow!("OCR worker panicked on {}", image.display()))?
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let mut page_fell_back = false;
        for (lang, mut reading) in args.ocr_langs.iter().zip(readings) {
            let mut language = lang.as_str();
            if needs_fallback(&reading.text, lang, args) {
                let fallback = ocr_image(image, &args.fallback_lang)?;
                if non_whitespace_char_count(&fallback.text)
                    > non_whitespace_char_count(&reading.text)
                {
                    debug!(
                        image = %image.display(),
                        page = page_number,
                        lang = %lang,
                        fallback_lang = %args.fallback_lang,
                        "using fallback OCR reading"
                    );
                    reading = fallback;
                    language = args.fallback_lang.as_str();
                    page_fell_back = true;
                }
            }

            recognized.push(
                RecognizedText::new(
                    pass_id_for(lang),
                    language,
                    reading.text,
                    reading.mean_confidence.clamp(0.0, 1.0),
                )
                .with_page(page_number),
            );
        }
        if page_fell_back {
            fallback_pages += 1;
        }
    }

    Ok((recognized, fallback_pages))
}

fn needs_fallback(text: &str, lang: &str, args: &ScanArgs) -> bool {
    lang != args.fallback_lang && non_whitespace_char_count(text) < args.min_text_chars
}

fn pass_id_for(lang: &str) -> String {
    format!("tesseract-{lang}")
}

fn document_id_for(sha256: &str) -> String {
    format!("sha256-{}", sha256.chars().take(16).collect::<String>())
}

/// Keeps the extension so `a.pdf` and `a.png` in one input directory get
/// separate reports.
fn report_path_for(output_dir: &Path, document: &DiscoveredDocument) -> PathBuf {
    output_dir.join(format!("{}.analysis.json", document.filename))
}

fn failed_entry(document: &DiscoveredDocument, err: &anyhow::Error) -> DocumentEntry {
    DocumentEntry {
        filename: document.filename.clone(),
        document_id: String::new(),
        sha256: String::new(),
        source_kind: document.source_kind,
        page_count: 0,
        pass_count: 0,
        ocr_fallback_page_count: 0,
        overall_confidence: None,
        unresolved_fields: Vec::new(),
        report_path: None,
        error: Some(format!("{err:#}")),
    }
}

fn render_scan_command(args: &ScanArgs) -> String {
    let mut command = vec![
        "notice-extract".to_string(),
        "scan".to_string(),
        "--input-dir".to_string(),
        args.input_dir.display().to_string(),
        "--output-dir".to_string(),
        args.output_dir.display().to_string(),
    ];

    for lang in &args.ocr_langs {
        command.push("--ocr-lang".to_string());
        command.push(lang.clone());
    }
    command.push("--fallback-lang".to_string());
    command.push(args.fallback_lang.clone());
    command.push("--min-text-chars".to_string());
    command.push(args.min_text_chars.to_string());
    command.push("--dpi".to_string());
    command.push(args.dpi.to_string());
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }

    command.join(" ")
}
