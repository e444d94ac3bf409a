//! End-to-end tests against the real engines (tesseract + pdfium).
//!
//! Gated behind the `E2E_ENABLED` environment variable, and skipped when
//! either engine cannot be found, so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 LD_LIBRARY_PATH=/path/to/pdfium cargo test --test e2e -- --nocapture
//!
//! Engine locations can be overridden with `SCAN2XLSX_TESSERACT` and
//! `SCAN2XLSX_PDFIUM_LIB_DIR`.

use calamine::{open_workbook, Data, Reader, Xlsx};
use image::{DynamicImage, Rgb, RgbImage};
use scan2xlsx::pipeline::encode::encode_png;
use scan2xlsx::{
    convert_to_xlsx, process_batch, ExtractionConfig, Extractor, FileError, PdfiumRasterizer,
    TesseractEngine, UploadedFile,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn e2e_config() -> ExtractionConfig {
    // RUST_LOG=scan2xlsx=debug shows per-page logs with --nocapture.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut builder = ExtractionConfig::builder().language("eng");
    if let Ok(path) = std::env::var("SCAN2XLSX_TESSERACT") {
        builder = builder.tesseract_path(path);
    }
    if let Ok(dir) = std::env::var("SCAN2XLSX_PDFIUM_LIB_DIR") {
        builder = builder.pdfium_lib_dir(dir);
    }
    builder.build().unwrap()
}

/// Skip this test unless E2E_ENABLED is set and both engines respond.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let config = e2e_config();
        if let Err(e) = TesseractEngine::from_config(&config).check_available() {
            println!("SKIP — {e}");
            return;
        }
        if let Err(e) = PdfiumRasterizer::from_config(&config).check_available() {
            println!("SKIP — {e}");
            return;
        }
        config
    }};
}

/// A minimal PDF with one page per entry, each showing its word in 48pt
/// Helvetica.
fn text_pdf(words: &[&str]) -> Vec<u8> {
    let n = words.len();
    let font_id = 3 + 2 * n;
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();

    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), n),
    ];
    for (i, word) in words.iter().enumerate() {
        let content = format!("BT /F1 48 Tf 72 650 Td ({word}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 {font_id} 0 R >> >> /Contents {} 0 R >>",
            4 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }
    objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        pdf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

fn blank_png() -> Vec<u8> {
    encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(
        200,
        100,
        Rgb([255, 255, 255]),
    )))
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_two_page_pdf_reads_hello_then_world() {
    let config = e2e_skip_unless_ready!();
    let files = vec![UploadedFile::new(
        "hello.pdf",
        "application/pdf",
        text_pdf(&["Hello", "World"]),
    )];

    let out = process_batch(files, &Extractor::from_config(&config), &config)
        .await
        .expect("batch should complete");

    let extraction = out.reports[0]
        .outcome
        .as_ref()
        .expect("PDF should be extracted");
    println!("Extracted: {:?}", extraction.text);

    let hello = extraction.text.find("Hello").expect("page 1 text");
    let world = extraction.text.find("World").expect("page 2 text");
    assert!(hello < world);
    assert_eq!(extraction.page_count, 2);
    // 8.5in wide at 300 DPI.
    let width = extraction.preview.width();
    assert!((2540..=2560).contains(&width), "preview width {width}");
}

#[tokio::test]
async fn test_blank_image_gives_empty_text() {
    let config = e2e_skip_unless_ready!();
    let files = vec![UploadedFile::new("blank.png", "image/png", blank_png())];

    let out = process_batch(files, &Extractor::from_config(&config), &config)
        .await
        .unwrap();

    assert!(out.reports[0].is_success(), "{:?}", out.reports[0].error());
    assert_eq!(out.table.rows()[0].extracted_text, "");
}

#[tokio::test]
async fn test_encrypted_or_broken_pdf_is_a_row_not_a_crash() {
    let config = e2e_skip_unless_ready!();
    let files = vec![
        UploadedFile::new("broken.pdf", "application/pdf", b"%PDF-1.4 garbage".to_vec()),
        UploadedFile::new("blank.png", "image/png", blank_png()),
    ];

    let out = process_batch(files, &Extractor::from_config(&config), &config)
        .await
        .unwrap();

    assert_eq!(out.table.len(), 2);
    assert!(matches!(
        out.reports[0].error(),
        Some(FileError::Rasterization { .. })
    ));
    assert!(out.reports[1].is_success());
}

#[tokio::test]
async fn test_convert_files_on_disk_to_xlsx() {
    let config = e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("memo.pdf");
    let png_path = dir.path().join("blank.png");
    let txt_path = dir.path().join("notes.txt");
    std::fs::write(&pdf_path, text_pdf(&["Invoice"])).unwrap();
    std::fs::write(&png_path, blank_png()).unwrap();
    std::fs::write(&txt_path, "plain text").unwrap();

    let inputs: Vec<String> = [&pdf_path, &png_path, &txt_path]
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let out_path: PathBuf = dir.path().join("out").join("output.xlsx");

    let output = convert_to_xlsx(&inputs, &out_path, &config)
        .await
        .expect("conversion should succeed");
    assert_eq!(output.stats.succeeded, 2);
    assert_eq!(output.stats.skipped, 1);

    let mut wb: Xlsx<_> = open_workbook(&out_path).unwrap();
    let range = wb.worksheet_range("OCR Results").unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|r| r.iter().map(Data::to_string).collect())
        .collect();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][0], "memo.pdf");
    assert!(rows[1][1].contains("Invoice"), "got {:?}", rows[1][1]);
    assert_eq!(rows[2][0], "blank.png");
    assert_eq!(rows[3][0], "notes.txt");
    assert!(rows[3][1].starts_with("[ERROR]"));
}
