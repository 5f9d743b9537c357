//! CLI binary for edgequake-id2csv.
//!
//! A thin shim over the library crate: validates the two paths (re-prompting
//! interactively when they are wrong), builds the recognizer once, runs the
//! batch and reports per-file outcomes on the terminal.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_id2csv::{
    run_batch, validate_input_dir, validate_output_path, BatchProgressCallback, ExtractError,
    ExtractionConfig, LlmRecognizer, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar over the supported files plus
/// one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start time of the file in flight.
    started: Mutex<Option<Instant>>,
    skipped: AtomicUsize,
    degraded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing folder…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            skipped: AtomicUsize::new(0),
            degraded: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} files…"))
        ));
    }

    fn on_file_start(&self, name: &str, _index: usize, _total: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, name: &str, index: usize, total: usize, error: Option<&str>) {
        let secs = self.elapsed_secs();
        let line = match error {
            Some(error) => {
                self.degraded.fetch_add(1, Ordering::SeqCst);
                format!(
                    "  {} {:>3}/{:<3}  {}  {}  {}",
                    yellow("⚠"),
                    index,
                    total,
                    name,
                    yellow(&first_line_truncated(error)),
                    dim(&format!("{secs:.1}s")),
                )
            }
            None => format!(
                "  {} {:>3}/{:<3}  {}  {}",
                green("✓"),
                index,
                total,
                name,
                dim(&format!("{secs:.1}s")),
            ),
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, name: &str, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs();
        self.skipped.fetch_add(1, Ordering::SeqCst);

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index,
            total,
            name,
            red(&first_line_truncated(error)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, records: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        let degraded = self.degraded.load(Ordering::SeqCst);

        if skipped == 0 && degraded == 0 {
            eprintln!(
                "{} {} files extracted successfully",
                green("✔"),
                bold(&records.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files written  ({} with errors, {} skipped)",
                cyan("⚠"),
                bold(&records.to_string()),
                total_files,
                yellow(&degraded.to_string()),
                red(&skipped.to_string()),
            );
        }
    }
}

/// First line of `msg`, cut to 80 characters.
fn first_line_truncated(msg: &str) -> String {
    let first_line = msg.lines().next().unwrap_or(msg);
    if first_line.chars().count() > 80 {
        format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
    } else {
        first_line.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract every passport scan in a folder
  id2csv --input scans/ --output results/passports.csv

  # Debug logging, no progress bar
  id2csv --input scans/ --output ids.csv --verbose --no-progress

SUPPORTED FILES:
  .png .jpg .jpeg .webp  — raster images
  .pdf                   — first page only
  Anything else in the folder is ignored.

OUTPUT:
  One CSV row per processed file, rewritten after every file. Columns are
  the sorted union of all fields seen so far, plus `filename`. Rows for
  files whose recognition failed carry `error` and `details` or
  `raw_content` instead of document fields.

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (required)
  PDFIUM_LIB_PATH         Path to libpdfium, needed for PDF input
  RUST_LOG                Override the log filter
"#;

/// Extract identity-document fields from a folder of images and PDFs into CSV.
#[derive(Parser, Debug)]
#[command(
    name = "id2csv",
    version,
    about = "Extract passport and ID-card fields from images and PDFs into a CSV file",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing the document images and PDFs.
    #[arg(long)]
    input: PathBuf,

    /// CSV file to write; rewritten after every processed file.
    #[arg(long)]
    output: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ID2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ID2CSV_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, env = "ID2CSV_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar reports per-file outcomes; library INFO logs would
    // only interleave with it.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Recognizer: built once, fails fast without a credential ─────────
    let base_config = ExtractionConfig::default();
    let recognizer =
        LlmRecognizer::from_config(&base_config).context("Cannot start recognition client")?;

    // ── Path validation (interactive re-prompt on failure) ───────────────
    let input = tokio::task::block_in_place(|| {
        ensure_valid_path(
            cli.input.clone(),
            validate_input_dir,
            "Please enter a valid input folder path: ",
        )
    })?;
    let output = tokio::task::block_in_place(|| {
        ensure_valid_path(
            cli.output.clone(),
            validate_output_path,
            "Please enter a valid output file path: ",
        )
    })?;

    // ── Run ──────────────────────────────────────────────────────────────
    let mut config = base_config;
    if show_progress {
        let cb = CliProgressCallback::new();
        config.progress_callback = Some(cb as ProgressCallback);
    }

    let results = run_batch(&input, &output, &recognizer, &config)
        .await
        .context("Extraction aborted")?;

    if !cli.quiet {
        if !show_progress {
            eprintln!(
                "Processed {} files ({} with errors)",
                results.len(),
                results.error_count()
            );
        }
        eprintln!("Final data saved to {}", bold(&output.display().to_string()));
    }

    Ok(())
}

/// Keep asking on the console until `validate` accepts the path.
///
/// The library only ever validates once and returns a typed error; the
/// retry loop lives here so batch logic stays non-interactive.
fn ensure_valid_path(
    initial: PathBuf,
    validate: fn(&Path) -> Result<(), ExtractError>,
    prompt: &str,
) -> Result<PathBuf> {
    let mut path = initial;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        match validate(&path) {
            Ok(()) => return Ok(path),
            Err(e) => {
                eprintln!("{} {}", red("Error:"), red(&e.to_string()));
                eprint!("{prompt}");
                io::stderr().flush().ok();

                let line = lines
                    .next()
                    .context("No more input while waiting for a valid path")?
                    .context("Failed to read from stdin")?;
                path = PathBuf::from(line.trim());
            }
        }
    }
}
