use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;

use crate::manifest::ToolVersions;

/// Text and mean word confidence (0..=1) of one OCR run over one image.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRecognition {
    pub text: String,
    pub mean_confidence: f64,
}

pub fn non_whitespace_char_count(text: &str) -> usize {
    text.chars()
        .filter(|character| !character.is_whitespace())
        .count()
}

/// Scratch directory for rasterized pages; removed by the caller.
pub fn scratch_directory(stem: &str) -> PathBuf {
    let safe_stem = stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();
    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    std::env::temp_dir().join(format!(
        "notice_extract_{}_{}_{}",
        safe_stem,
        std::process::id(),
        stamp
    ))
}

/// Renders every page of `pdf_path` to PNG inside `work_dir` and returns the
/// images in page order.
pub fn rasterize_pdf(pdf_path: &Path, dpi: u32, work_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(work_dir)
        .with_context(|| format!("failed to create directory: {}", work_dir.display()))?;

    let output = Command::new("pdftoppm")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-png")
        .arg(pdf_path)
        .arg(work_dir.join("page"))
        .output()
        .with_context(|| format!("failed to execute pdftoppm for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftoppm returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let mut images = Vec::new();
    for entry in fs::read_dir(work_dir)
        .with_context(|| format!("failed to read {}", work_dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", work_dir.display()))?
            .path();
        if let Some(number) = rendered_page_number(&path) {
            images.push((number, path));
        }
    }
    images.sort();

    if images.is_empty() {
        bail!("pdftoppm produced no pages for {}", pdf_path.display());
    }
    Ok(images.into_iter().map(|(_, path)| path).collect())
}

/// pdftoppm names pages `page-N.png`, zero-padding N to the page count width.
pub fn rendered_page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

pub fn ocr_image(image_path: &Path, ocr_lang: &str) -> Result<PageRecognition> {
    let output = Command::new("tesseract")
        .arg(image_path)
        .arg("stdout")
        .arg("-l")
        .arg(ocr_lang)
        .arg("--oem")
        .arg("3")
        .arg("--psm")
        .arg("6")
        .arg("tsv")
        .output()
        .with_context(|| format!("failed to execute tesseract for {}", image_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "tesseract returned non-zero exit status for {} ({}): {}",
            image_path.display(),
            ocr_lang,
            stderr.trim()
        );
    }

    Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
}

/// Rebuilds line-broken text from tesseract TSV word rows and averages the
/// confidence of the recognized words.
pub fn parse_tsv(tsv: &str) -> PageRecognition {
    let mut lines: Vec<String> = Vec::new();
    let mut current_line = None;
    let mut confidence_sum = 0.0;
    let mut word_count = 0_usize;

    for row in tsv.lines().skip(1) {
        let columns = row.split('\t').collect::<Vec<&str>>();
        if columns.len() < 12 || columns[0] != "5" {
            continue;
        }
        let word = columns[11].replace('\u{0000}', "");
        let word = word.trim();
        if word.is_empty() {
            continue;
        }

        let line_key = (columns[1], columns[2], columns[3], columns[4]);
        match lines.last_mut() {
            Some(line) if current_line == Some(line_key) => {
                line.push(' ');
                line.push_str(word);
            }
            _ => {
                lines.push(word.to_string());
                current_line = Some(line_key);
            }
        }

        if let Ok(confidence) = columns[10].trim().parse::<f64>()
            && confidence >= 0.0
        {
            confidence_sum += confidence.min(100.0);
            word_count += 1;
        }
    }

    let mean_confidence = if word_count == 0 {
        0.0
    } else {
        confidence_sum / word_count as f64 / 100.0
    };

    PageRecognition {
        text: lines.join("\n"),
        mean_confidence,
    }
}

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        engine: env!("CARGO_PKG_VERSION").to_string(),
        pdftoppm: command_version_optional("pdftoppm", &["-v"]),
        tesseract: command_version_optional("tesseract", &["--version"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
