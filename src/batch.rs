//! Batch orchestration: walk a folder, extract one record per file and keep
//! the CSV on disk in step with the in-memory [`ResultSet`].
//!
//! ## Per-file flow
//!
//! ```text
//! list ──▶ normalize ──▶ extract_fields ──▶ record + filename ──▶ push ──▶ rewrite CSV
//! ```
//!
//! Files are processed strictly one after another, in the order the
//! platform lists them. After every appended record the whole CSV is
//! rewritten, so a crash loses at most the file in flight. The rewrite is a
//! plain truncate-and-write; a crash during the write itself can leave a
//! truncated file.
//!
//! ## Two levels of failure
//!
//! * Recognition failures (service error, unparseable reply) are already
//!   turned into error records by [`crate::pipeline::llm::extract_fields`]
//!   and get a row like any other file.
//! * Everything else that goes wrong for one file (unsupported extension,
//!   undecodable image, compression failure, pdfium error, non-object
//!   reply) is logged and the file is skipped *without* a row.
//!
//! Only a CSV write failure or an unlistable folder stops the run.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{ExtractedRecord, ResultSet};
use crate::pipeline::input::{self, Candidate};
use crate::pipeline::llm::{extract_fields, RecognitionCapability};
use crate::pipeline::normalize;
use crate::prompts::EXTRACTION_PROMPT;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Process every supported file in `input_dir`, rewriting `output_path`
/// after each record.
///
/// # Errors
/// Returns `Err` only when the folder cannot be listed or the CSV cannot be
/// written. Per-file failures are contained.
pub async fn run_batch(
    input_dir: &Path,
    output_path: &Path,
    capability: &dyn RecognitionCapability,
    config: &ExtractionConfig,
) -> Result<ResultSet, ExtractError> {
    let start = Instant::now();
    info!("Starting batch: {}", input_dir.display());

    let candidates = input::list_candidates(input_dir)?;
    let total = candidates.len();
    debug!("{} supported files in {}", total, input_dir.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut results = ResultSet::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let index = i + 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_start(&candidate.name, index, total);
        }

        match extract_file(candidate, capability, config).await {
            Ok(Some(record)) => {
                let error = record.error_summary();
                results.push(record);
                info!("Processed {}", candidate.name);

                results.write_csv(output_path)?;
                debug!("Updated results saved to {}", output_path.display());

                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_complete(&candidate.name, index, total, error.as_deref());
                }
            }
            Ok(None) => {
                warn!("Skipping {}: PDF has no pages", candidate.name);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_skipped(&candidate.name, index, total, "PDF has no pages");
                }
            }
            Err(e) => {
                warn!("Error processing {}: {}", candidate.name, e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_file_skipped(&candidate.name, index, total, &e.to_string());
                }
            }
        }
    }

    info!(
        "Batch complete: {} records ({} degraded) from {} files in {}ms",
        results.len(),
        results.error_count(),
        total,
        start.elapsed().as_millis()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, results.len());
    }

    Ok(results)
}

/// Normalise, recognise and recover one file.
///
/// Returns `Ok(None)` for a PDF without pages.
pub async fn extract_file(
    candidate: &Candidate,
    capability: &dyn RecognitionCapability,
    config: &ExtractionConfig,
) -> Result<Option<ExtractedRecord>, ExtractError> {
    let Some(bounded) = normalize::normalize_file(&candidate.path, &config.limits).await? else {
        return Ok(None);
    };
    debug!(
        "{}: {}x{} px, {} bytes at quality {}",
        candidate.name,
        bounded.dimensions().0,
        bounded.dimensions().1,
        bounded.encoded_len(),
        bounded.quality()
    );

    let instruction = config.instruction.as_deref().unwrap_or(EXTRACTION_PROMPT);
    let value = extract_fields(capability, &bounded, instruction).await?;

    let mut record = ExtractedRecord::from_value(value)?;
    record.set_filename(&candidate.name);
    Ok(Some(record))
}
