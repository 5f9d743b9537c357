//! Error types for the edgequake-id2csv library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — the current file (or the whole run) cannot proceed.
//!   Inside a batch these abort only the file being processed: it gets no
//!   row in the CSV. A few variants (missing credential, CSV write failure,
//!   invalid paths) are fatal for the run and surface from
//!   [`crate::batch::run_batch`] or the CLI.
//!
//! * [`RecognitionError`] — the recognition service call failed. These are
//!   never propagated: [`crate::pipeline::llm::extract_fields`] turns them
//!   into an `{"error": "API call failed", ...}` record so the CSV still
//!   shows that the file was attempted.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal and per-file errors returned by the edgequake-id2csv library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Path errors ───────────────────────────────────────────────────────
    /// The input folder does not exist or is not a directory.
    #[error("Input folder not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// The parent directory of the output CSV does not exist.
    #[error("Output directory not found for '{path}'\nCreate the directory or choose another path.")]
    OutputDirNotFound { path: PathBuf },

    /// Listing the input folder failed.
    #[error("Failed to list '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Per-file errors ───────────────────────────────────────────────────
    /// File extension is not one of png, jpg, jpeg, webp, pdf.
    #[error("Unsupported file type: '{extension}' ({path})")]
    UnsupportedFileType { path: PathBuf, extension: String },

    /// The raster image could not be opened or decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    ImageDecodeFailed { path: PathBuf, detail: String },

    /// The bounded image could not be encoded for transport.
    #[error("Image encoding failed: {0}")]
    ImageEncodeFailed(#[from] image::ImageError),

    /// No JPEG quality above the floor produced an image under the byte cap.
    #[error("Unable to compress image under {max_bytes} bytes at any quality above {min_quality}")]
    CompressionFailed { max_bytes: usize, min_quality: u8 },

    /// pdfium could not open or rasterise the first page.
    #[error("PDF '{path}' could not be rendered: {detail}")]
    PdfRenderFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    /// The recovered reply is valid JSON but not an object, so no
    /// `filename` column can be attached to it.
    #[error("Recognition reply is a JSON {kind}, expected an object")]
    UnexpectedReplyShape { kind: &'static str },

    // ── Provider errors ───────────────────────────────────────────────────
    /// The credential environment variable is absent or empty.
    #[error("{var} environment variable is not set")]
    MissingCredential { var: &'static str },

    /// The provider factory refused to build the configured provider.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write CSV file '{path}': {source}")]
    CsvWriteFailed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of the recognition service call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    /// Network, authentication or service-side failure.
    #[error("{0}")]
    Transport(String),

    /// The service answered with content blocks but none carried text.
    #[error("Recognition reply contained no text content")]
    EmptyReply,
}
