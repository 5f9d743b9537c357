//! # edgequake-id2csv
//!
//! Extract structured fields from identity-document images and PDFs
//! (passports, ID cards) with a Vision Language Model, and collect them
//! into a CSV file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! folder
//!  │
//!  ├─ 1. Input      keep png / jpg / jpeg / webp / pdf entries
//!  ├─ 2. Render     first PDF page via pdfium (spawn_blocking)
//!  ├─ 3. Normalize  ≤ 2000×2000 px, alpha flattened, JPEG ≤ 5 MiB
//!  ├─ 4. Encode     PNG → base64 ImageData
//!  ├─ 5. VLM        one call per file with the fixed 11-field instruction
//!  ├─ 6. Recover    bare JSON, else first `{` … last `}`, else error record
//!  └─ 7. Output     append to the ResultSet and rewrite the CSV
//! ```
//!
//! Files are processed sequentially. A file that cannot be prepared is
//! skipped; a file whose recognition call or reply went wrong still gets a
//! row carrying an `error` column.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_id2csv::{run_batch, ExtractionConfig, LlmRecognizer};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Requires ANTHROPIC_API_KEY.
//!     let config = ExtractionConfig::default();
//!     let recognizer = LlmRecognizer::from_config(&config)?;
//!     let results = run_batch(
//!         Path::new("scans/"),
//!         Path::new("out/ids.csv"),
//!         &recognizer,
//!         &config,
//!     )
//!     .await?;
//!     eprintln!("{} rows, {} with errors", results.len(), results.error_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `id2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_file, run_batch};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, ImageLimits};
pub use error::{ExtractError, RecognitionError};
pub use output::{ExtractedRecord, ResultSet};
pub use pipeline::input::{validate_input_dir, validate_output_path};
pub use pipeline::llm::{
    ContentBlock, LlmRecognizer, RecognitionCapability, RecognitionReply, CREDENTIAL_ENV_VAR,
};
pub use pipeline::normalize::BoundedImage;
pub use pipeline::recover::recover;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{EXTRACTION_PROMPT, RECORD_FIELDS};

// Needed by implementors of `RecognitionCapability`.
pub use edgequake_llm::ImageData;
