//! Error types for the scan2xlsx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Scan2XlsxError`] — **Fatal**: the batch cannot run or its result
//!   cannot be saved (input path missing, download failed, spreadsheet could
//!   not be written). Returned as `Err(Scan2XlsxError)`.
//!
//! * [`FileError`] — **Non-fatal**: a single uploaded file failed (corrupt
//!   image, broken PDF, OCR engine crash, unsupported type). Stored inside
//!   [`crate::output::FileReport`] and rendered as an error placeholder row
//!   so the rest of the batch still lands in the spreadsheet.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2xlsx library.
///
/// Per-file failures use [`FileError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum Scan2XlsxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a readable path nor a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The batch was started with no files at all.
    #[error("No input files were supplied")]
    NoInputs,

    // ── Output errors ─────────────────────────────────────────────────────
    /// rust_xlsxwriter refused to build the workbook.
    #[error("Failed to build spreadsheet: {0}")]
    SpreadsheetFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Engine binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install pdfium for your platform, then either:\n\
  • place it on the system library search path, or\n\
  • pass --pdfium-lib-dir /directory/containing/libpdfium.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    /// The tesseract executable could not be started.
    #[error(
        "OCR engine unavailable: {0}\n\
Install tesseract-ocr or pass --tesseract /path/to/tesseract."
    )]
    OcrEngineUnavailable(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for Scan2XlsxError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Scan2XlsxError::SpreadsheetFailed(e.to_string())
    }
}

/// A non-fatal error for a single uploaded file.
///
/// The batch records it, writes an error placeholder row and moves on to
/// the next file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileError {
    /// The image bytes could not be decoded.
    #[error("{file}: image could not be decoded: {detail}")]
    Decode { file: String, detail: String },

    /// The PDF could not be opened or one of its pages failed to render.
    #[error("PDF rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// The OCR engine failed or timed out. `page` is 1-indexed for PDFs.
    #[error("{}", ocr_message(.page, .detail))]
    Ocr { page: Option<usize>, detail: String },

    /// The PDF opened fine but contains no pages.
    #[error("PDF contains no pages")]
    NoPages,

    /// The declared media type is not one of the accepted types.
    #[error("unsupported media type '{media_type}' (expected image/jpeg, image/png or application/pdf)")]
    UnsupportedType { media_type: String },

    /// The batch was cancelled before this file was processed.
    #[error("cancelled before processing")]
    Cancelled,
}

fn ocr_message(page: &Option<usize>, detail: &str) -> String {
    match page {
        Some(p) => format!("OCR failed on page {p}: {detail}"),
        None => format!("OCR failed: {detail}"),
    }
}

impl FileError {
    /// Tag an OCR error with the 1-indexed page it happened on.
    pub fn on_page(self, page: usize) -> Self {
        match self {
            FileError::Ocr { detail, .. } => FileError::Ocr {
                page: Some(page),
                detail,
            },
            other => other,
        }
    }

    /// `true` for files that were never attempted (unsupported or cancelled).
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            FileError::UnsupportedType { .. } | FileError::Cancelled
        )
    }
}
