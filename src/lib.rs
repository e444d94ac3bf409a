//! # scan2xlsx
//!
//! OCR a batch of scanned images and PDFs into a two-column spreadsheet.
//!
//! Every uploaded file becomes one row: its name, and the text recognised in
//! it with whitespace collapsed. PDFs are rasterised page by page and the
//! page texts joined with newlines. A file that cannot be read still gets
//! its row, holding an `[ERROR] …` marker instead of text, so the sheet
//! always lines up with the upload list.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Input     resolve local paths or download URLs
//!  ├─ 2. Classify  image / pdf / unsupported, by declared media type
//!  ├─ 3. Render    rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 4. OCR       tesseract subprocess per image or page
//!  ├─ 5. Normalize collapse whitespace, join pages with "\n"
//!  └─ 6. Export    ResultTable → output.xlsx
//! ```
//!
//! Files are processed one at a time, in upload order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2xlsx::{convert_to_xlsx, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().language("eng").build()?;
//!     let output = convert_to_xlsx(&["invoice.pdf", "receipt.jpg"], "output.xlsx", &config).await?;
//!     for (name, err) in output.failures() {
//!         eprintln!("{name}: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2xlsx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## External engines
//!
//! The `tesseract` executable and the pdfium shared library are located
//! through [`ExtractionConfig`] (`tesseract_path`, `pdfium_lib_dir`). When
//! unset, `tesseract` is looked up on `PATH` and pdfium in the system
//! library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{
    collect_table, convert_to_xlsx, process_batch, process_batch_sync, process_paths,
};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{FileError, Scan2XlsxError};
pub use export::{write_xlsx, xlsx_to_buffer, OUTPUT_FILE_NAME, XLSX_MIME_TYPE};
pub use output::{
    BatchOutput, BatchStats, BatchSummary, Extraction, ExtractionResult, FileKind, FileReport,
    FileSummary, ResultTable, UploadedFile,
};
pub use pipeline::extract::{extract_from_image, extract_from_pdf, Extractor};
pub use pipeline::normalize::normalize;
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::render::{PdfiumRasterizer, Rasterizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{process_stream, ReportStream};
