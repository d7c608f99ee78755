use std::fs;

use pretty_assertions::assert_eq;

use super::discovery::source_kind_for;
use super::ocr_tools::{PageRecognition, parse_tsv, rendered_page_number};
use super::*;

const TSV_HEADER: &str =
    "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

fn scan_args(ocr_langs: &[&str]) -> ScanArgs {
    ScanArgs {
        input_dir: PathBuf::from("in"),
        output_dir: PathBuf::from("out"),
        ocr_langs: ocr_langs.iter().map(|lang| lang.to_string()).collect(),
        fallback_lang: "eng".to_string(),
        min_text_chars: 20,
        dpi: 300,
        db_path: None,
    }
}

#[test]
fn tsv_words_are_rejoined_into_lines() {
    let tsv = [
        TSV_HEADER,
        "1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t",
        "4\t1\t1\t1\t1\t0\t10\t10\t500\t40\t-1\t",
        "5\t1\t1\t1\t1\t1\t10\t10\t60\t40\t90.5\tPAN:",
        "5\t1\t1\t1\t1\t2\t80\t10\t200\t40\t80.5\tABCDE1234F",
        "5\t1\t1\t1\t2\t1\t10\t60\t90\t40\t70\tDated:",
        "5\t1\t1\t1\t2\t2\t110\t60\t200\t40\t-1\t ",
        "5\t1\t1\t1\t2\t3\t110\t60\t200\t40\t60\t15/01/2023",
    ]
    .join("\n");

    let reading = parse_tsv(&tsv);

    assert_eq!(reading.text, "PAN: ABCDE1234F\nDated: 15/01/2023");
    assert!((reading.mean_confidence - 0.7525).abs() < 1e-9);
}

#[test]
fn tsv_without_words_has_zero_confidence() {
    assert_eq!(
        parse_tsv(TSV_HEADER),
        PageRecognition {
            text: String::new(),
            mean_confidence: 0.0,
        }
    );
}

#[test]
fn rendered_pages_sort_numerically() {
    assert_eq!(rendered_page_number(Path::new("/tmp/x/page-07.png")), Some(7));
    assert_eq!(rendered_page_number(Path::new("/tmp/x/page-12.png")), Some(12));
    assert_eq!(rendered_page_number(Path::new("/tmp/x/page-1.ppm")), None);
    assert_eq!(rendered_page_number(Path::new("/tmp/x/cover.png")), None);
}

#[test]
fn discovery_keeps_supported_files_in_name_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["b.PDF", "a.jpeg", "notes.txt", "c.tiff"] {
        fs::write(dir.path().join(name), b"x").expect("write");
    }
    fs::create_dir(dir.path().join("nested.pdf")).expect("mkdir");

    let documents = discover_documents(dir.path()).expect("discovery");
    let found = documents
        .iter()
        .map(|document| (document.filename.as_str(), document.source_kind))
        .collect::<Vec<_>>();

    assert_eq!(
        found,
        vec![
            ("a.jpeg", SourceKind::Image),
            ("b.PDF", SourceKind::Pdf),
            ("c.tiff", SourceKind::Image),
        ]
    );
    assert_eq!(documents[1].stem(), "b");
}

#[test]
fn unsupported_extensions_are_skipped() {
    assert_eq!(source_kind_for(Path::new("notice.tif")), Some(SourceKind::Image));
    assert_eq!(source_kind_for(Path::new("notice.docx")), None);
    assert_eq!(source_kind_for(Path::new("notice")), None);
}

#[test]
fn sparse_readings_fall_back_unless_already_the_fallback_language() {
    let args = scan_args(&["eng+hin+tel", "eng"]);
    assert!(needs_fallback("short", "eng+hin+tel", &args));
    assert!(!needs_fallback("short", "eng", &args));
    assert!(!needs_fallback(
        "Income Tax Department notice of demand",
        "eng+hin+tel",
        &args
    ));
}

#[test]
fn identifiers_and_paths_are_derived_from_the_document() {
    let digest = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    assert_eq!(document_id_for(digest), "sha256-ba7816bf8f01cfea");
    assert_eq!(pass_id_for("eng+hin"), "tesseract-eng+hin");

    let document = DiscoveredDocument {
        path: PathBuf::from("in/notice 1.pdf"),
        filename: "notice 1.pdf".to_string(),
        source_kind: SourceKind::Pdf,
    };
    assert_eq!(
        report_path_for(Path::new("out"), &document),
        PathBuf::from("out/notice 1.pdf.analysis.json")
    );
}

#[test]
fn same_stem_documents_get_separate_reports() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["a.pdf", "a.png"] {
        fs::write(dir.path().join(name), b"x").expect("write");
    }

    let documents = discover_documents(dir.path()).expect("discovery");
    let reports = documents
        .iter()
        .map(|document| report_path_for(Path::new("out"), document))
        .collect::<Vec<_>>();

    assert_eq!(
        reports,
        vec![
            PathBuf::from("out/a.pdf.analysis.json"),
            PathBuf::from("out/a.png.analysis.json"),
        ]
    );
}

#[test]
fn rendered_command_lists_every_language() {
    let args = scan_args(&["eng+hin+tel", "tel"]);
    assert_eq!(
        render_scan_command(&args),
        "notice-extract scan --input-dir in --output-dir out --ocr-lang eng+hin+tel \
         --ocr-lang tel --fallback-lang eng --min-text-chars 20 --dpi 300"
    );
}
