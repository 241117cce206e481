//! Progress reporting for review runs.
//!
//! Hosts that want per-block feedback (a CLI progress bar, a UI spinner)
//! implement [`ReviewProgressCallback`] and hand an `Arc` of it to the
//! config. All methods have no-op defaults so implementors only override
//! what they need.

use std::sync::Arc;

/// Callback invoked as flagged blocks are resolved.
///
/// Methods are called from the pipeline task; implementations should return
/// quickly and must not panic.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once before the first block, with the number of flagged
    /// blocks that will be resolved.
    fn on_review_start(&self, total_flagged: usize) {
        let _ = total_flagged;
    }

    /// Called when work on a block begins. `index` is 0-based.
    fn on_block_start(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when a block resolved successfully.
    fn on_block_complete(&self, index: usize, total: usize, replacement_len: usize) {
        let _ = (index, total, replacement_len);
    }

    /// Called when a block's rewrite failed (the run continues).
    fn on_block_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after the last block.
    fn on_review_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// Shared handle to a progress callback.
pub type ReviewProgress = Arc<dyn ReviewProgressCallback>;

/// A callback that ignores every event. Useful in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ReviewProgressCallback for NoOpProgress {}
