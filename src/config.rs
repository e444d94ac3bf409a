//! Configuration types for OCR batch extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. Engine locations (the `tesseract`
//! executable and the pdfium shared library) live here too: they are handed
//! to the engines at construction time instead of being patched into the
//! process environment.

use crate::error::Scan2XlsxError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Rasterisation resolution used for PDF pages unless overridden.
pub const DEFAULT_DPI: u32 = 300;

/// Configuration for a batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2xlsx::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .language("eng+deu")
///     .ocr_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// Tesseract is tuned for roughly 300 DPI input; lower values lose small
    /// glyphs, higher values mostly cost time and memory.
    pub dpi: u32,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 7000.
    ///
    /// A 300-DPI render of an A0 poster would be ~10 000 × 14 000 px. The cap
    /// scales such pages down proportionally so one oversized page cannot
    /// exhaust memory.
    pub max_rendered_pixels: u32,

    /// Tesseract language string, e.g. `"eng"` or `"eng+fra"`.
    /// If None, tesseract uses its own default.
    pub language: Option<String>,

    /// Location of the tesseract executable. Default: `"tesseract"` (resolved via PATH).
    pub tesseract_path: PathBuf,

    /// Directory containing the pdfium shared library.
    /// If None, pdfium is loaded from the system library search path.
    pub pdfium_lib_dir: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Per-image OCR timeout in seconds. Default: 120.
    ///
    /// The tesseract process is killed when it runs longer; the file (or page)
    /// fails with an OCR error and the batch continues.
    pub ocr_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Receives per-file events while the batch runs.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation flag, checked between files.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 7000,
            language: None,
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_lib_dir: None,
            password: None,
            ocr_timeout_secs: 120,
            download_timeout_secs: 120,
            progress_callback: None,
            cancel_flag: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("language", &self.language)
            .field("tesseract_path", &self.tesseract_path)
            .field("pdfium_lib_dir", &self.pdfium_lib_dir)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("cancel_flag", &self.cancel_flag.is_some())
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// `true` once the cancellation flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = Some(lang.into());
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn pdfium_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_dir = Some(dir.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.config.cancel_flag = Some(flag);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Scan2XlsxError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(Scan2XlsxError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.ocr_timeout_secs == 0 {
            return Err(Scan2XlsxError::InvalidConfig(
                "OCR timeout must be ≥ 1 second".into(),
            ));
        }
        if c.tesseract_path.as_os_str().is_empty() {
            return Err(Scan2XlsxError::InvalidConfig(
                "tesseract path must not be empty".into(),
            ));
        }
        if let Some(lang) = &c.language {
            if lang.trim().is_empty() {
                return Err(Scan2XlsxError::InvalidConfig(
                    "OCR language must not be blank".into(),
                ));
            }
        }
        Ok(self.config)
    }
}
