//! PDF rasterisation: render the first page of a document via pdfium.
//!
//! Only the first page of an identity document carries the data page, so
//! nothing beyond page 1 is ever rendered. A PDF with zero pages yields
//! `Ok(None)` and the caller skips the file without a record.
//!
//! The functions here are blocking; [`crate::pipeline::normalize`] calls
//! them from inside `spawn_blocking`.

use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable pointing at an existing pdfium library.
pub const PDFIUM_LIB_PATH_VAR: &str = "PDFIUM_LIB_PATH";

/// Bind to a pdfium library: `PDFIUM_LIB_PATH` if set, otherwise a copy
/// next to the working directory, otherwise the system library.
pub fn bind_pdfium() -> Result<Pdfium, ExtractError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_VAR) {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

/// Rasterise page 1 of `pdf_path`, capped at `max_pixels` on either edge.
pub fn render_first_page(
    pdf_path: &Path,
    max_pixels: u32,
) -> Result<Option<DynamicImage>, ExtractError> {
    let pdfium = bind_pdfium()?;

    let render_err = |e: PdfiumError| ExtractError::PdfRenderFailed {
        path: pdf_path.to_path_buf(),
        detail: format!("{:?}", e),
    };

    let document = pdfium.load_pdf_from_file(pdf_path, None).map_err(render_err)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages ({})", total_pages, pdf_path.display());

    if total_pages == 0 {
        return Ok(None);
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let page = pages.get(0).map_err(render_err)?;
    let bitmap = page.render_with_config(&render_config).map_err(render_err)?;

    let image = bitmap.as_image();
    debug!(
        "Rendered first page of {} → {}x{} px",
        pdf_path.display(),
        image.width(),
        image.height()
    );

    Ok(Some(image))
}
