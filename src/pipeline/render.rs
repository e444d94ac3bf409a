//! PDF rasterisation: render every page to a `DynamicImage` via pdfium.
//!
//! Pages come back in document order, which the PDF extractor relies on
//! when it concatenates page text. A page that fails to render fails the
//! whole document; there is no partial output.
//!
//! ## Resolution
//!
//! Pages are scaled by `dpi / 72` (PDF user space is 72 units per inch), so
//! the default 300 DPI gives tesseract the input density it is trained on.
//! `max_rendered_pixels` caps the longest edge independently, keeping
//! oversized pages (posters, engineering drawings) within memory bounds.

use crate::config::ExtractionConfig;
use crate::error::{FileError, Scan2XlsxError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Turns PDF bytes into page images, page 1 first.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, FileError>;
}

/// pdfium-backed rasteriser.
///
/// The library is bound per call from the configured directory (or the
/// system library path when none is set).
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    lib_dir: Option<PathBuf>,
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
}

impl PdfiumRasterizer {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            lib_dir: config.pdfium_lib_dir.clone(),
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
        }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Bind to pdfium once and drop it, so a missing library is reported
    /// before the batch starts rather than against every PDF.
    pub fn check_available(&self) -> Result<(), Scan2XlsxError> {
        self.bind()
            .map(|_| ())
            .map_err(Scan2XlsxError::PdfiumBindingFailed)
    }

    fn bind(&self) -> Result<Pdfium, String> {
        let bindings = match self.lib_dir {
            Some(ref dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| format!("{:?}", e))?;
        Ok(Pdfium::new(bindings))
    }

    fn render_config(&self) -> PdfRenderConfig {
        PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, FileError> {
        let pdfium = self.bind().map_err(|detail| FileError::Rasterization {
            detail: format!("pdfium unavailable: {detail}"),
        })?;

        let password = self.password.as_deref();
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                let detail = if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        "wrong password".to_string()
                    } else {
                        "document is encrypted; a password is required".to_string()
                    }
                } else {
                    format!("not a readable PDF: {err_str}")
                };
                FileError::Rasterization { detail }
            })?;

        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let render_config = self.render_config();
        let mut images = Vec::with_capacity(pages.len() as usize);

        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page
                .render_with_config(&render_config)
                .map_err(|e| FileError::Rasterization {
                    detail: format!("page {}: {:?}", idx + 1, e),
                })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}
