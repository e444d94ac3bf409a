//! Batch data model: uploaded files, per-file reports and the result table.

use crate::error::FileError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header row of the exported spreadsheet.
pub const COLUMNS: [&str; 2] = ["File Name", "Extracted Text"];

/// Prefix of the text stored for a file whose extraction failed.
pub const ERROR_PLACEHOLDER_PREFIX: &str = "[ERROR]";

/// One input unit of a batch: a name, the media type it was declared with,
/// and its raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Classify the declared media type.
    pub fn kind(&self) -> FileKind {
        FileKind::classify(&self.media_type)
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Extraction route chosen from a declared media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    Pdf,
    Unsupported,
}

impl FileKind {
    /// Map a declared media type onto an extraction route.
    ///
    /// Matching is case-insensitive and ignores parameters such as
    /// `; charset=binary`. `image/jpg` is accepted alongside the registered
    /// `image/jpeg` because browsers and upload widgets still send it.
    pub fn classify(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/png" => FileKind::Image,
            "application/pdf" => FileKind::Pdf,
            _ => FileKind::Unsupported,
        }
    }
}

/// Successful extraction of one file.
#[derive(Clone)]
pub struct Extraction {
    /// Normalized text. For PDFs, one normalized segment per page joined by `\n`.
    pub text: String,
    /// The decoded image, or the first rendered page of a PDF. Display only.
    pub preview: DynamicImage,
    /// Pages that went through OCR (1 for images).
    pub page_count: usize,
}

impl fmt::Debug for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extraction")
            .field("text", &self.text)
            .field(
                "preview",
                &format_args!("{}x{}", self.preview.width(), self.preview.height()),
            )
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file_name: String,
    pub extracted_text: String,
}

/// Ordered, append-only table of extraction rows.
///
/// Rows come out in the order they were pushed, which the orchestrator keeps
/// equal to upload order. There is no API to edit or remove a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<ExtractionResult>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            rows: Vec::with_capacity(n),
        }
    }

    /// Append a row for a successfully extracted file.
    pub fn push(&mut self, file_name: impl Into<String>, extracted_text: impl Into<String>) {
        self.rows.push(ExtractionResult {
            file_name: file_name.into(),
            extracted_text: extracted_text.into(),
        });
    }

    /// Append the row for a file report: the text on success, an error
    /// placeholder otherwise.
    pub fn push_report(&mut self, report: &FileReport) {
        self.push(report.file_name.clone(), report.cell_text());
    }

    pub fn rows(&self) -> &[ExtractionResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> [&'static str; 2] {
        COLUMNS
    }
}

/// Outcome of processing one uploaded file.
#[derive(Debug, Clone)]
pub struct FileReport {
    /// 0-based position in the upload order.
    pub index: usize,
    pub file_name: String,
    pub media_type: String,
    pub kind: FileKind,
    pub outcome: Result<Extraction, FileError>,
    pub duration_ms: u64,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&FileError> {
        self.outcome.as_ref().err()
    }

    /// Text written to the spreadsheet cell for this file.
    pub fn cell_text(&self) -> String {
        match &self.outcome {
            Ok(extraction) => extraction.text.clone(),
            Err(e) => error_placeholder(e),
        }
    }
}

/// Render the spreadsheet text for a failed file.
pub fn error_placeholder(error: &FileError) -> String {
    format!("{ERROR_PLACEHOLDER_PREFIX} {error}")
}

/// Serializable view of a [`FileReport`] (the preview image is left out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub index: usize,
    pub file_name: String,
    pub media_type: String,
    pub kind: FileKind,
    pub text: Option<String>,
    pub page_count: Option<usize>,
    pub error: Option<FileError>,
    pub duration_ms: u64,
}

impl From<&FileReport> for FileSummary {
    fn from(r: &FileReport) -> Self {
        let (text, page_count, error) = match &r.outcome {
            Ok(e) => (Some(e.text.clone()), Some(e.page_count), None),
            Err(e) => (None, None, Some(e.clone())),
        };
        Self {
            index: r.index,
            file_name: r.file_name.clone(),
            media_type: r.media_type.clone(),
            kind: r.kind,
            text,
            page_count,
            error,
            duration_ms: r.duration_ms,
        }
    }
}

/// Aggregate numbers for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_files: usize,
    pub succeeded: usize,
    /// Files that were attempted and failed.
    pub failed: usize,
    /// Files skipped because their media type is not supported.
    pub skipped: usize,
    pub cancelled: usize,
    /// Pages that went through OCR across all successful files.
    pub total_pages: usize,
    pub total_duration_ms: u64,
}

impl BatchStats {
    pub fn from_reports(reports: &[FileReport], total_duration_ms: u64) -> Self {
        let mut stats = BatchStats {
            total_files: reports.len(),
            total_duration_ms,
            ..Default::default()
        };
        for r in reports {
            match &r.outcome {
                Ok(e) => {
                    stats.succeeded += 1;
                    stats.total_pages += e.page_count;
                }
                Err(FileError::UnsupportedType { .. }) => stats.skipped += 1,
                Err(FileError::Cancelled) => stats.cancelled += 1,
                Err(_) => stats.failed += 1,
            }
        }
        stats
    }

    /// Files that did not produce text, for whatever reason.
    pub fn unsuccessful(&self) -> usize {
        self.failed + self.skipped + self.cancelled
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub table: ResultTable,
    pub reports: Vec<FileReport>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// `(file name, error)` for every file that did not produce text.
    pub fn failures(&self) -> Vec<(&str, &FileError)> {
        self.reports
            .iter()
            .filter_map(|r| r.error().map(|e| (r.file_name.as_str(), e)))
            .collect()
    }

    /// Serializable report: stats plus one summary per file.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            stats: self.stats.clone(),
            files: self.reports.iter().map(FileSummary::from).collect(),
        }
    }
}

/// JSON-friendly form of a [`BatchOutput`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub stats: BatchStats,
    pub files: Vec<FileSummary>,
}
