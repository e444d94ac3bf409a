//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch processes each uploaded file. This is how a
//! presentation layer shows previews and extracted text as soon as a file is
//! done, long before the spreadsheet is written.
//!
//! # Example
//!
//! ```rust
//! use scan2xlsx::{BatchProgressCallback, Extraction, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, name: &str, extraction: &Extraction) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: file {}/{} {name} ({} chars)", index + 1, total, extraction.text.len());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::FileError;
use crate::output::Extraction;
use std::sync::Arc;

/// Called by the batch orchestrator as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is the 0-based upload position.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is classified and extracted.
    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        let _ = (index, total_files, name);
    }

    /// Called when a file was extracted successfully. `extraction` carries
    /// the normalized text and the preview image.
    fn on_file_complete(&self, index: usize, total_files: usize, name: &str, extraction: &Extraction) {
        let _ = (index, total_files, name, extraction);
    }

    /// Called when a file failed, was skipped as unsupported, or was cancelled.
    fn on_file_error(&self, index: usize, total_files: usize, name: &str, error: &FileError) {
        let _ = (index, total_files, name, error);
    }

    /// Called once after every file has a row in the result table.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
