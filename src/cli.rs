use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "notice-extract",
    version,
    about = "Structured field extraction for scanned legal and tax notices"
)]
pub struct Cli {
    /// Engine configuration as JSON; built-in defaults when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Lexicon (office titles, Acts, notice types, months) as JSON.
    #[arg(long, global = true)]
    pub lexicon: Option<PathBuf>,

    /// Date that bounds plausible notice dates; defaults to today (UTC).
    #[arg(long, global = true)]
    pub reference_date: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Analyze(AnalyzeArgs),
    Scan(ScanArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// JSON files each holding an array of recognized-text records.
    #[arg(long = "passes", required = true, num_args = 1..)]
    pub passes: Vec<PathBuf>,

    #[arg(long)]
    pub document_id: Option<String>,

    /// Result destination; printed to stdout when omitted.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub output_dir: PathBuf,

    /// One recognition pass is run per entry (tesseract `-l` syntax).
    #[arg(long = "ocr-lang", default_values_t = vec!["eng+hin+tel".to_string()])]
    pub ocr_langs: Vec<String>,

    #[arg(long, default_value = "eng")]
    pub fallback_lang: String,

    #[arg(long, default_value_t = 20)]
    pub min_text_chars: usize,

    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/notice-extract/analyses.sqlite")]
    pub db_path: PathBuf,
}
