//! Streaming batch API: emit one report per file as soon as it is done.
//!
//! [`process_stream`] yields a [`FileReport`] for every uploaded file, in
//! upload order, while the batch is still running. It is the event-stream
//! alternative to progress callbacks: a UI can render each preview and text
//! as it arrives and build the table at the end with
//! [`crate::batch::collect_table`].

use crate::batch::process_file;
use crate::config::ExtractionConfig;
use crate::error::Scan2XlsxError;
use crate::output::{FileReport, UploadedFile};
use crate::pipeline::extract::Extractor;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;

/// A boxed stream of per-file reports.
pub type ReportStream = Pin<Box<dyn Stream<Item = Result<FileReport, Scan2XlsxError>> + Send>>;

/// Process `files` sequentially, yielding each report in upload order.
///
/// The next file is not started until the consumer polls for it, so a
/// consumer that stops early also stops the extraction. Batch-level
/// callbacks (`on_batch_start`, `on_batch_complete`) are not fired here;
/// per-file callbacks are.
///
/// # Example
/// ```rust,no_run
/// use futures::StreamExt;
/// use scan2xlsx::{process_stream, Extractor, ExtractionConfig, UploadedFile};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let files = vec![UploadedFile::new("scan.png", "image/png", std::fs::read("scan.png")?)];
/// let mut reports = process_stream(files, Extractor::from_config(&config), config);
/// while let Some(report) = reports.next().await {
///     let report = report?;
///     println!("{}: {}", report.file_name, report.cell_text());
/// }
/// # Ok(())
/// # }
/// ```
pub fn process_stream(
    files: Vec<UploadedFile>,
    extractor: Extractor,
    config: ExtractionConfig,
) -> ReportStream {
    let total = files.len();
    let s = stream::iter(files.into_iter().enumerate()).then(move |(index, file)| {
        let extractor = extractor.clone();
        let config = config.clone();
        async move { process_file(index, total, file, &extractor, &config).await }
    });
    Box::pin(s)
}
