use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort the analysis of a whole document.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no recognized-text passes were supplied")]
    NoPasses,
    #[error("recognized text is empty across all {pass_count} passes")]
    EmptyText { pass_count: usize },
}

/// Structural problems with a single pass. The pass is dropped and the
/// document is analyzed with the remaining passes.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedInput {
    #[error("pass id is empty")]
    EmptyPassId,
    #[error("pass {pass_id} page {page}: ocr confidence {value} is outside [0, 1]")]
    ConfidenceOutOfRange {
        pass_id: String,
        page: u32,
        value: f64,
    },
    #[error("pass {pass_id}: page numbers are 1-based, got page 0")]
    ZeroPage { pass_id: String },
    #[error("pass {pass_id}: page {page} supplied more than once")]
    DuplicatePage { pass_id: String, page: u32 },
    #[error("pass {pass_id} page {page}: {count} replacement characters from lossy decoding")]
    InvalidEncoding {
        pass_id: String,
        page: u32,
        count: usize,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to compile {name} pattern")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
    #[error("lexicon has no {0}")]
    EmptyLexicon(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
