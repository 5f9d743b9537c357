//! Image normalisation: turn any supported file into a bounded image.
//!
//! Three steps, always in this order:
//!
//! 1. **Resize**: downscale with Lanczos3, preserving aspect ratio, only
//!    when either edge exceeds `max_dimension`. Smaller images are left
//!    untouched, never upscaled.
//! 2. **Flatten**: JPEG has no alpha channel, so any alpha is composited
//!    onto a white background.
//! 3. **Compress**: encode as JPEG starting at `initial_quality`; while the
//!    result exceeds `max_bytes`, lower the quality by `quality_step` and
//!    retry. Once quality would reach `min_quality` or below the search
//!    stops with [`ExtractError::CompressionFailed`]. With the default
//!    bounds that is at most 16 attempts (85, 80, …, 10).
//!
//! The returned [`BoundedImage`] holds the pixels decoded back from the
//! accepted JPEG, so what is sent to the recognition service is exactly
//! what passed the byte cap.

use crate::config::ImageLimits;
use crate::error::ExtractError;
use crate::pipeline::input::DocumentKind;
use crate::pipeline::render;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader, RgbImage};
use std::path::Path;
use tracing::debug;

/// A raster image within the configured pixel and byte bounds.
#[derive(Debug, Clone)]
pub struct BoundedImage {
    image: DynamicImage,
    jpeg: Vec<u8>,
    quality: u8,
}

impl BoundedImage {
    /// Pixels decoded from the accepted JPEG.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The accepted JPEG bytes.
    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    /// Size of the accepted JPEG in bytes.
    pub fn encoded_len(&self) -> usize {
        self.jpeg.len()
    }

    /// JPEG quality at which the byte cap was met.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Normalise the file at `path`. Runs on the blocking thread pool since
/// decoding, pdfium rendering and JPEG search are CPU-bound.
///
/// Returns `Ok(None)` for a PDF without pages.
pub async fn normalize_file(
    path: &Path,
    limits: &ImageLimits,
) -> Result<Option<BoundedImage>, ExtractError> {
    let path = path.to_path_buf();
    let limits = *limits;

    tokio::task::spawn_blocking(move || normalize_file_blocking(&path, &limits))
        .await
        .map_err(|e| ExtractError::Internal(format!("Normalise task panicked: {}", e)))?
}

/// Blocking implementation of [`normalize_file`].
pub fn normalize_file_blocking(
    path: &Path,
    limits: &ImageLimits,
) -> Result<Option<BoundedImage>, ExtractError> {
    let image = match DocumentKind::from_path(path)? {
        DocumentKind::Raster => decode_raster(path)?,
        DocumentKind::Pdf => match render::render_first_page(path, limits.max_dimension)? {
            Some(image) => image,
            None => return Ok(None),
        },
    };

    normalize_image(image, limits).map(Some)
}

/// Resize, flatten and compress an in-memory image.
pub fn normalize_image(
    image: DynamicImage,
    limits: &ImageLimits,
) -> Result<BoundedImage, ExtractError> {
    let resized = fit_within(image, limits.max_dimension);
    let rgb = flatten_alpha(&resized);
    compress(&rgb, limits)
}

fn decode_raster(path: &Path) -> Result<DynamicImage, ExtractError> {
    let decode_err = |detail: String| ExtractError::ImageDecodeFailed {
        path: path.to_path_buf(),
        detail,
    };

    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))
}

/// Downscale so neither edge exceeds `max_dimension`.
fn fit_within(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width <= max_dimension && height <= max_dimension {
        return image;
    }

    let resized = image.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    debug!(
        "Resized {}x{} → {}x{}",
        width,
        height,
        resized.width(),
        resized.height()
    );
    resized
}

/// Drop the alpha channel by compositing onto white.
fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            let blended = (src[c] as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            dst[c] = blended as u8;
        }
    }
    rgb
}

/// Linear quality search for a JPEG encoding under `max_bytes`.
fn compress(rgb: &RgbImage, limits: &ImageLimits) -> Result<BoundedImage, ExtractError> {
    let mut quality = limits.initial_quality;

    while quality > limits.min_quality {
        let jpeg = encode_jpeg(rgb, quality)?;
        if jpeg.len() <= limits.max_bytes {
            debug!("Image compressed to {} bytes with quality {}", jpeg.len(), quality);
            let image = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?;
            return Ok(BoundedImage {
                image,
                jpeg,
                quality,
            });
        }
        debug!(
            "Quality {} gave {} bytes (cap {}), retrying",
            quality,
            jpeg.len(),
            limits.max_bytes
        );
        quality = quality.saturating_sub(limits.quality_step);
    }

    Err(ExtractError::CompressionFailed {
        max_bytes: limits.max_bytes,
        min_quality: limits.min_quality,
    })
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, ExtractError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(rgb)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba, RgbaImage};

    /// Deterministic high-entropy image that JPEG cannot squeeze much.
    fn noisy_image(width: u32, height: u32) -> DynamicImage {
        let mut state: u32 = 0x1234_5678;
        let img = RgbImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let b = state.to_le_bytes();
            Rgb([b[0], b[1], b[2]])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn small_image_keeps_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, Rgb([10, 20, 30])));
        let bounded = normalize_image(img, &ImageLimits::default()).unwrap();
        assert_eq!(bounded.dimensions(), (120, 80));
        assert_eq!(bounded.quality(), 85);
        assert!(bounded.encoded_len() <= ImageLimits::default().max_bytes);
    }

    #[test]
    fn large_image_is_downscaled_preserving_aspect() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(400, 100, Rgb([200, 200, 200])));
        let limits = ImageLimits {
            max_dimension: 200,
            ..ImageLimits::default()
        };
        let bounded = normalize_image(img, &limits).unwrap();
        assert_eq!(bounded.dimensions(), (200, 50));
    }

    #[test]
    fn normalisation_is_idempotent() {
        let limits = ImageLimits {
            max_dimension: 64,
            ..ImageLimits::default()
        };
        let first = normalize_image(noisy_image(100, 50), &limits).unwrap();
        let dims = first.dimensions();
        let second = normalize_image(first.into_image(), &limits).unwrap();
        assert_eq!(second.dimensions(), dims);
        assert!(second.encoded_len() <= limits.max_bytes);
    }

    #[test]
    fn alpha_is_composited_onto_white() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn quality_steps_down_until_under_cap() {
        let img = noisy_image(96, 96);
        let rgb = img.to_rgb8();
        let at_85 = encode_jpeg(&rgb, 85).unwrap().len();
        let at_40 = encode_jpeg(&rgb, 40).unwrap().len();
        assert!(at_40 < at_85);

        let limits = ImageLimits {
            max_bytes: at_40,
            ..ImageLimits::default()
        };
        let bounded = normalize_image(img, &limits).unwrap();
        assert!(bounded.encoded_len() <= at_40);
        assert!(bounded.quality() < 85);
        assert!(bounded.quality() >= 40);
        assert_eq!(bounded.quality() % 5, 0);
    }

    #[test]
    fn unreachable_cap_fails_instead_of_oversized_output() {
        let limits = ImageLimits {
            max_bytes: 16,
            ..ImageLimits::default()
        };
        let err = normalize_image(noisy_image(64, 64), &limits).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::CompressionFailed {
                max_bytes: 16,
                min_quality: 5
            }
        ));
    }

    #[test]
    fn floor_is_exclusive() {
        // Starting at the floor means no attempt is ever made.
        let limits = ImageLimits {
            initial_quality: 5,
            ..ImageLimits::default()
        };
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])));
        assert!(matches!(
            normalize_image(img, &limits),
            Err(ExtractError::CompressionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn normalize_file_reads_png_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.PNG");
        RgbaImage::from_pixel(30, 20, Rgba([1, 2, 3, 128]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let bounded = normalize_file(&path, &ImageLimits::default())
            .await
            .unwrap()
            .expect("raster files always produce an image");
        assert_eq!(bounded.dimensions(), (30, 20));
    }

    #[tokio::test]
    async fn normalize_file_sniffs_mislabelled_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actually_png.jpg");
        RgbImage::from_pixel(8, 8, Rgb([9, 9, 9]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let bounded = normalize_file(&path, &ImageLimits::default()).await.unwrap();
        assert!(bounded.is_some());
    }

    #[tokio::test]
    async fn normalize_file_rejects_unsupported_extension() {
        let err = normalize_file(Path::new("/tmp/whatever.gif"), &ImageLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn normalize_file_reports_corrupt_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.webp");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = normalize_file(&path, &ImageLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ImageDecodeFailed { .. }));
    }
}
