//! Pipeline stages for identity-document extraction.
//!
//! Each submodule implements exactly one transformation step, so each is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ normalize ──▶ encode ──▶ llm ──▶ recover
//! (folder)  (pdfium)   (bounds)      (base64)   (VLM)   (JSON)
//! ```
//!
//! 1. [`input`]     — filter folder entries, classify files, validate paths
//! 2. [`render`]    — rasterise the first page of a PDF via pdfium
//! 3. [`normalize`] — resize, flatten alpha, JPEG quality search under a byte cap
//! 4. [`encode`]    — PNG-encode and base64-wrap the bounded image
//! 5. [`llm`]       — the single recognition call; the only stage with
//!    network I/O
//! 6. [`recover`]   — best-effort JSON recovery from free-form replies

pub mod encode;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod recover;
pub mod render;
