use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    Image,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub document_id: String,
    pub sha256: String,
    pub source_kind: SourceKind,
    pub page_count: usize,
    pub pass_count: usize,
    pub ocr_fallback_page_count: usize,
    pub overall_confidence: Option<f64>,
    pub unresolved_fields: Vec<String>,
    pub report_path: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub engine: String,
    pub pdftoppm: Option<String>,
    pub tesseract: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanPaths {
    pub input_dir: String,
    pub output_dir: String,
    pub db_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanCounts {
    pub document_count: usize,
    pub analyzed_count: usize,
    pub failed_count: usize,
    pub page_count: usize,
    pub ocr_fallback_page_count: usize,
    pub unresolved_field_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub ocr_langs: Vec<String>,
    pub fallback_lang: String,
    pub reference_date: String,
    pub tool_versions: ToolVersions,
    pub paths: ScanPaths,
    pub counts: ScanCounts,
    pub documents: Vec<DocumentEntry>,
    pub warnings: Vec<String>,
}
