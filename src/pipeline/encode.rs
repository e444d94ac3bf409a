//! Image encoding and decoding at the engine boundary.
//!
//! Tesseract reads images from disk, so each raster is PNG-encoded before it
//! is handed over. PNG is lossless: JPEG artefacts around glyph edges cost
//! recognition accuracy. The same encoder writes preview images for the CLI.

use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a raster image as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Decode uploaded image bytes, guessing the format from the content.
///
/// The declared media type is only used for routing; a PNG uploaded as
/// `image/jpeg` still decodes.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()
}
