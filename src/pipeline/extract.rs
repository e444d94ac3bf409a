//! Per-file extraction: images and PDFs to normalised text plus preview.
//!
//! Both extractors are synchronous and all-or-nothing. The batch
//! orchestrator runs them on a blocking thread and turns any error into an
//! error row.

use crate::config::ExtractionConfig;
use crate::error::FileError;
use crate::output::{Extraction, FileKind, UploadedFile};
use crate::pipeline::encode::decode_image;
use crate::pipeline::normalize::{join_pages, normalize};
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::render::{PdfiumRasterizer, Rasterizer};
use std::sync::Arc;
use tracing::debug;

/// Decode an uploaded image, OCR it and normalise the text.
///
/// The decoded image doubles as the preview.
pub fn extract_from_image(
    bytes: &[u8],
    file_name: &str,
    engine: &dyn OcrEngine,
) -> Result<Extraction, FileError> {
    let image = decode_image(bytes).map_err(|e| FileError::Decode {
        file: file_name.to_string(),
        detail: e.to_string(),
    })?;
    debug!(
        "Decoded {} → {}x{} px",
        file_name,
        image.width(),
        image.height()
    );

    let raw = engine.recognize(&image)?;
    Ok(Extraction {
        text: normalize(&raw),
        preview: image,
        page_count: 1,
    })
}

/// Rasterise a PDF, OCR every page in order and join the normalised text.
///
/// The first rendered page is returned as the preview. A document without
/// pages is an explicit [`FileError::NoPages`]; an OCR failure is tagged
/// with its 1-indexed page.
pub fn extract_from_pdf(
    bytes: &[u8],
    rasterizer: &dyn Rasterizer,
    engine: &dyn OcrEngine,
) -> Result<Extraction, FileError> {
    let pages = rasterizer.rasterize(bytes)?;
    if pages.is_empty() {
        return Err(FileError::NoPages);
    }

    let mut texts = Vec::with_capacity(pages.len());
    for (idx, page) in pages.iter().enumerate() {
        let raw = engine.recognize(page).map_err(|e| e.on_page(idx + 1))?;
        let text = normalize(&raw);
        debug!("Page {}: {} chars after normalisation", idx + 1, text.len());
        texts.push(text);
    }

    let page_count = pages.len();
    let preview = pages
        .into_iter()
        .next()
        .ok_or(FileError::NoPages)?;

    Ok(Extraction {
        text: join_pages(&texts),
        preview,
        page_count,
    })
}

/// The OCR engine and rasteriser a batch runs with.
///
/// Cheap to clone; both collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct Extractor {
    engine: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn Rasterizer>,
}

impl Extractor {
    pub fn new(engine: Arc<dyn OcrEngine>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { engine, rasterizer }
    }

    /// Tesseract + pdfium, located and tuned by `config`.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            Arc::new(TesseractEngine::from_config(config)),
            Arc::new(PdfiumRasterizer::from_config(config)),
        )
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Route one uploaded file by its declared media type.
    pub fn extract(&self, file: &UploadedFile) -> Result<Extraction, FileError> {
        match file.kind() {
            FileKind::Image => extract_from_image(&file.bytes, &file.name, self.engine.as_ref()),
            FileKind::Pdf => {
                extract_from_pdf(&file.bytes, self.rasterizer.as_ref(), self.engine.as_ref())
            }
            FileKind::Unsupported => Err(FileError::UnsupportedType {
                media_type: file.media_type.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::encode::encode_png;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::Mutex;

    /// Reads the text "printed" on a synthetic page from its red channel.
    struct ColourOcr;

    fn page(code: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([code, 0, 0])))
    }

    impl OcrEngine for ColourOcr {
        fn name(&self) -> &'static str {
            "colour"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<String, FileError> {
            match image.to_rgb8().get_pixel(0, 0).0[0] {
                1 => Ok("Hello\n\n  there\n".into()),
                2 => Ok("World".into()),
                3 => Ok("\tthird   page\x0c".into()),
                255 => Err(FileError::Ocr {
                    page: None,
                    detail: "engine crashed".into(),
                }),
                _ => Ok(String::new()),
            }
        }
    }

    struct FixedPages(Mutex<Option<Vec<DynamicImage>>>);

    impl FixedPages {
        fn new(pages: Vec<DynamicImage>) -> Self {
            Self(Mutex::new(Some(pages)))
        }
    }

    impl Rasterizer for FixedPages {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, FileError> {
            Ok(self.0.lock().unwrap().take().unwrap_or_default())
        }
    }

    #[test]
    fn image_text_is_normalised_and_preview_kept() {
        let png = encode_png(&page(1)).unwrap();
        let out = extract_from_image(&png, "scan.png", &ColourOcr).unwrap();
        assert_eq!(out.text, "Hello there");
        assert_eq!(out.page_count, 1);
        assert_eq!((out.preview.width(), out.preview.height()), (3, 3));
    }

    #[test]
    fn corrupt_image_is_decode_error_naming_the_file() {
        let err = extract_from_image(b"not a png", "broken.jpg", &ColourOcr).unwrap_err();
        match err {
            FileError::Decode { file, .. } => assert_eq!(file, "broken.jpg"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pdf_pages_joined_in_order_with_first_page_preview() {
        let raster = FixedPages::new(vec![page(1), page(2), page(3)]);
        let out = extract_from_pdf(b"%PDF", &raster, &ColourOcr).unwrap();
        assert_eq!(out.text, "Hello there\nWorld\nthird page");
        assert_eq!(out.page_count, 3);
        assert_eq!(out.preview.to_rgb8().get_pixel(0, 0).0[0], 1);
    }

    #[test]
    fn zero_page_pdf_is_no_pages_error() {
        let raster = FixedPages::new(vec![]);
        assert_eq!(
            extract_from_pdf(b"%PDF", &raster, &ColourOcr).unwrap_err(),
            FileError::NoPages
        );
    }

    #[test]
    fn ocr_failure_is_tagged_with_page() {
        let raster = FixedPages::new(vec![page(1), page(255), page(2)]);
        let err = extract_from_pdf(b"%PDF", &raster, &ColourOcr).unwrap_err();
        assert_eq!(
            err,
            FileError::Ocr {
                page: Some(2),
                detail: "engine crashed".into()
            }
        );
    }

    #[test]
    fn extractor_routes_unsupported_types() {
        let extractor = Extractor::new(
            Arc::new(ColourOcr),
            Arc::new(FixedPages::new(vec![page(2)])),
        );
        let txt = UploadedFile::new("notes.txt", "text/plain", b"hi".to_vec());
        assert_eq!(
            extractor.extract(&txt).unwrap_err(),
            FileError::UnsupportedType {
                media_type: "text/plain".into()
            }
        );

        let pdf = UploadedFile::new("doc.pdf", "application/pdf", b"%PDF".to_vec());
        assert_eq!(extractor.extract(&pdf).unwrap().text, "World");
        assert_eq!(extractor.engine_name(), "colour");
    }
}
