//! Image encoding: `BoundedImage` → base64 PNG wrapped in `ImageData`.
//!
//! The compression search in [`crate::pipeline::normalize`] works on JPEG
//! bytes, but the wire request always carries PNG: the pixels decoded from
//! the accepted JPEG are re-encoded losslessly so no second round of
//! artefacts is introduced.

use crate::pipeline::normalize::BoundedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::io::Cursor;
use tracing::debug;

/// Encode a bounded image as a base64 PNG ready for the recognition call.
pub fn encode_image(bounded: &BoundedImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    bounded
        .image()
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png"))
}
