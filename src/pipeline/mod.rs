//! Extraction stages for scan-to-spreadsheet conversion.
//!
//! Each submodule implements one step; the OCR engine and the rasteriser
//! sit behind traits so tests (and other backends) can swap them out.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode/render ──▶ ocr ──▶ normalize ──▶ extract
//! (path/URL)  (decode, pdfium)  (tesseract) (whitespace)  (per-file result)
//! ```
//!
//! 1. [`input`]     — resolve a path or URL into an uploaded file
//! 2. [`encode`]    — decode uploaded images, PNG-encode images for OCR
//! 3. [`render`]    — rasterise PDF pages via pdfium
//! 4. [`ocr`]       — recognise text; tesseract runs as a subprocess
//! 5. [`normalize`] — collapse whitespace, join pages
//! 6. [`extract`]   — route a file by media type and assemble the result

pub mod encode;
pub mod extract;
pub mod input;
pub mod normalize;
pub mod ocr;
pub mod render;
