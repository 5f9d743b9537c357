//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator walks the input folder. The library itself
//! only logs through `tracing`; console rendering (progress bars, coloured
//! per-file lines) belongs to the host application.
//!
//! # Example
//!
//! ```rust
//! use edgequake_id2csv::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct SkipCounter {
//!     skipped: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for SkipCounter {
//!     fn on_file_skipped(&self, name: &str, _index: usize, _total: usize, error: &str) {
//!         self.skipped.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("skipped {name}: {error}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(SkipCounter { skipped: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `index` is 1-based over the supported files of the
/// folder, `total` is their count.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the folder has been listed and filtered.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before a file is normalised.
    fn on_file_start(&self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called once a record for the file has been appended and the CSV
    /// rewritten. `error` carries the reason for a degraded record (API
    /// failure or unparseable reply) and is `None` for a clean one.
    fn on_file_complete(&self, name: &str, index: usize, total: usize, error: Option<&str>) {
        let _ = (name, index, total, error);
    }

    /// Called when a file produced no record.
    fn on_file_skipped(&self, name: &str, index: usize, total: usize, error: &str) {
        let _ = (name, index, total, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, records: usize) {
        let _ = (total_files, records);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        degraded: AtomicUsize,
        skipped: AtomicUsize,
        records: AtomicUsize,
        last_error: std::sync::Mutex<Option<String>>,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_file_start(&self, _name: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _name: &str, _index: usize, _total: usize, error: Option<&str>) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = error {
                self.degraded.fetch_add(1, Ordering::SeqCst);
                *self.last_error.lock().unwrap() = Some(error.to_string());
            }
        }

        fn on_file_skipped(&self, _name: &str, _index: usize, _total: usize, _error: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_files: usize, records: usize) {
            self.records.store(records, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_file_start("a.png", 1, 3);
        cb.on_file_complete("a.png", 1, 3, None);
        cb.on_file_skipped("b.pdf", 2, 3, "render failed");
        cb.on_batch_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_file_start("a.png", 1, 3);
        tracker.on_file_complete("a.png", 1, 3, None);
        tracker.on_file_start("b.jpg", 2, 3);
        tracker.on_file_complete("b.jpg", 2, 3, Some("API call failed: timeout"));
        tracker.on_file_start("c.webp", 3, 3);
        tracker.on_file_skipped("c.webp", 3, 3, "decode failed");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.degraded.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.records.load(Ordering::SeqCst), 2);
        assert_eq!(
            tracker.last_error.lock().unwrap().as_deref(),
            Some("API call failed: timeout")
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10);
        cb.on_file_start("x.pdf", 1, 10);
    }
}
