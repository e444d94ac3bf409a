//! Batch orchestration: uploaded files in, result table out.
//!
//! Files are processed strictly one at a time, in upload order. Each
//! extraction is CPU-bound and shells out to tesseract, so it runs on
//! tokio's blocking pool; the orchestrator awaits it before starting the
//! next file. A file that fails leaves an error row behind and the batch
//! moves on.
//!
//! Spreadsheet export is a separate step; see [`crate::export`] and
//! [`convert_to_xlsx`] for the one-call version.

use crate::config::ExtractionConfig;
use crate::error::{FileError, Scan2XlsxError};
use crate::export;
use crate::output::{BatchOutput, BatchStats, FileKind, FileReport, ResultTable, UploadedFile};
use crate::pipeline::extract::Extractor;
use crate::pipeline::input;
use crate::stream::process_stream;
use futures::StreamExt;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Process every file in upload order and build the result table.
///
/// # Returns
/// `Ok(BatchOutput)` whenever every file got a row, however many of them
/// failed (check `output.stats`).
///
/// # Errors
/// Only when an extraction task panicked; per-file problems never end up here.
pub async fn process_batch(
    files: Vec<UploadedFile>,
    extractor: &Extractor,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Scan2XlsxError> {
    let start = Instant::now();
    let total = files.len();
    info!("Starting batch: {} files, engine={}", total, extractor.engine_name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut table = ResultTable::with_capacity(total);
    let mut reports = Vec::with_capacity(total);

    let mut stream = process_stream(files, extractor.clone(), config.clone());
    while let Some(report) = stream.next().await {
        let report = report?;
        table.push_report(&report);
        reports.push(report);
    }

    let stats = BatchStats::from_reports(&reports, start.elapsed().as_millis() as u64);
    info!(
        "Batch complete: {}/{} files extracted, {} failed, {} skipped, {} cancelled, {}ms",
        stats.succeeded,
        stats.total_files,
        stats.failed,
        stats.skipped,
        stats.cancelled,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.succeeded);
    }

    Ok(BatchOutput {
        table,
        reports,
        stats,
    })
}

/// Build the result table from reports already collected from
/// [`crate::stream::process_stream`].
pub fn collect_table(reports: &[FileReport]) -> ResultTable {
    let mut table = ResultTable::with_capacity(reports.len());
    for report in reports {
        table.push_report(report);
    }
    table
}

/// Resolve paths/URLs, then run the batch with tesseract + pdfium as
/// configured.
pub async fn process_paths<S: AsRef<str>>(
    inputs: &[S],
    config: &ExtractionConfig,
) -> Result<BatchOutput, Scan2XlsxError> {
    let files = input::resolve_inputs(inputs, config.download_timeout_secs).await?;
    let extractor = Extractor::from_config(config);
    process_batch(files, &extractor, config).await
}

/// Resolve inputs, run the batch and write the spreadsheet to `output_path`.
///
/// The spreadsheet is written even when some files failed; their rows carry
/// error placeholders.
pub async fn convert_to_xlsx<S: AsRef<str>>(
    inputs: &[S],
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Scan2XlsxError> {
    let output = process_paths(inputs, config).await?;
    export::write_xlsx(&output.table, output_path).await?;
    Ok(output)
}

/// Synchronous wrapper around [`process_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_batch_sync(
    files: Vec<UploadedFile>,
    extractor: &Extractor,
    config: &ExtractionConfig,
) -> Result<BatchOutput, Scan2XlsxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Scan2XlsxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process_batch(files, extractor, config))
}

/// Process a single file and report the outcome.
///
/// Fires the per-file progress callbacks. Only a panicking extraction task
/// produces `Err`.
pub(crate) async fn process_file(
    index: usize,
    total: usize,
    file: UploadedFile,
    extractor: &Extractor,
    config: &ExtractionConfig,
) -> Result<FileReport, Scan2XlsxError> {
    let start = Instant::now();
    let file_name = file.name.clone();
    let media_type = file.media_type.clone();
    let kind = file.kind();

    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(index, total, &file_name);
    }

    let outcome = if config.is_cancelled() {
        Err(FileError::Cancelled)
    } else if kind == FileKind::Unsupported {
        warn!(
            "Skipping {}: unsupported media type '{}'",
            file_name, media_type
        );
        Err(FileError::UnsupportedType {
            media_type: media_type.clone(),
        })
    } else {
        info!("Extracting {} ({}/{}, {})", file_name, index + 1, total, media_type);
        let extractor = extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract(&file))
            .await
            .map_err(|e| {
                Scan2XlsxError::Internal(format!("Extraction task for '{}' panicked: {}", file_name, e))
            })?
    };

    let duration_ms = start.elapsed().as_millis() as u64;

    match &outcome {
        Ok(extraction) => {
            info!(
                "Extracted {}: {} pages, {} chars, {}ms",
                file_name,
                extraction.page_count,
                extraction.text.len(),
                duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(index, total, &file_name, extraction);
            }
        }
        Err(e) => {
            if !e.is_skip() {
                warn!("Failed {}: {}", file_name, e);
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(index, total, &file_name, e);
            }
        }
    }

    Ok(FileReport {
        index,
        file_name,
        media_type,
        kind,
        outcome,
        duration_ms,
    })
}
