//! Input resolution: decide which files of a folder are processed, and
//! validate the user-supplied paths before a run starts.
//!
//! Two checks with slightly different rules are involved. The folder walk
//! keeps any entry whose lowercased *name* ends in a supported suffix
//! ([`is_supported_name`]); normalisation then classifies the file by its
//! *extension* ([`DocumentKind::from_path`]). A dot-file such as `.png`
//! passes the first test but has no extension, so it fails the second with
//! `UnsupportedFileType` and is skipped without a record.

use crate::error::ExtractError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions accepted by the pipeline (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "pdf"];

/// How a supported file is turned into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// png, jpg, jpeg or webp.
    Raster,
    /// First page rasterised through pdfium.
    Pdf,
}

impl DocumentKind {
    /// Classify a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "webp" => Ok(DocumentKind::Raster),
            "pdf" => Ok(DocumentKind::Pdf),
            _ => Err(ExtractError::UnsupportedFileType {
                path: path.to_path_buf(),
                extension: if ext.is_empty() {
                    String::new()
                } else {
                    format!(".{ext}")
                },
            }),
        }
    }
}

/// True if the lowercased file name ends with a supported `.ext` suffix.
pub fn is_supported_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// A folder entry selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// File name as listed, used for the `filename` column.
    pub name: String,
    pub path: PathBuf,
}

/// List `dir` in the order the platform returns entries and keep the
/// supported ones. Entries that cannot be read are dropped with a warning.
/// A name that is not valid UTF-8 is kept: the path stays raw and the
/// `filename` column gets a lossy rendering.
pub fn list_candidates(dir: &Path) -> Result<Vec<Candidate>, ExtractError> {
    let entries = std::fs::read_dir(dir).map_err(|e| ExtractError::ReadDirFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let file_name = entry.file_name();
        let name = file_name.to_string_lossy().into_owned();
        if file_name.to_str().is_none() {
            debug!("Non-UTF-8 file name {:?} listed as {}", file_name, name);
        }

        if is_supported_name(&name) {
            candidates.push(Candidate {
                path: entry.path(),
                name,
            });
        } else {
            debug!("Ignoring {}", name);
        }
    }

    Ok(candidates)
}

/// Check that the input folder exists and is a directory.
pub fn validate_input_dir(path: &Path) -> Result<(), ExtractError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ExtractError::InputDirNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Check that the output file's parent directory exists. A bare file name
/// resolves to the working directory and is always accepted.
pub fn validate_output_path(path: &Path) -> Result<(), ExtractError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ExtractError::OutputDirNotFound {
                path: path.to_path_buf(),
            })
        }
        _ => Ok(()),
    }
}
