//! # docrevise
//!
//! Review documents for sensitive content and emit a revised artifact.
//!
//! Given an HTML, Markdown, Word (`.docx`) or PDF document, `docrevise`
//! extracts its text blocks in order, flags the blocks matching a fixed set
//! of critical-content detectors, resolves a per-block action (rewrite via
//! a chat-completion service, delete, or ignore), splices the results back
//! into the document, and returns the revised bytes with a filename and
//! MIME type. An optional whole-document singular-to-plural conversion runs
//! after splicing.
//!
//! ## Quick start
//!
//! ```no_run
//! use docrevise::{review, ReviewConfig, ReviewPlan, Tone};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReviewConfig::default();
//!     let plan = ReviewPlan::rewrite_all(Tone::Formal);
//!     let output = review("report.html", &plan, &config).await?;
//!     std::fs::write(&output.artifact.filename, &output.artifact.bytes)?;
//!     println!("{} blocks revised", output.stats.rewritten);
//!     Ok(())
//! }
//! ```
//!
//! Scanning first (to show the flagged blocks and collect per-block
//! choices) needs no API key:
//!
//! ```no_run
//! use docrevise::{scan, ReviewConfig};
//!
//! # async fn run() -> Result<(), docrevise::ReviewError> {
//! let report = scan("report.html", &ReviewConfig::default()).await?;
//! for flagged in &report.flagged {
//!     println!("{}: {}", flagged.key, flagged.block.text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! input → extract → filter → disposition → splice → plural. Stages live in
//! [`pipeline`]; orchestration in [`review`](crate::review()).

pub mod config;
pub mod detectors;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod session;

pub use config::{
    Disposition, PdfStrategy, PluralMode, ReviewAction, ReviewConfig, ReviewConfigBuilder,
    ReviewPlan, Tone, DEFAULT_MODEL,
};
pub use detectors::{CriticalPatterns, DEFAULT_PATTERNS};
pub use error::{BlockError, ReviewError};
pub use output::{BlockOutcome, ReviewArtifact, ReviewOutput, ReviewStats, ScanReport};
pub use pipeline::disposition::REWRITE_ERROR_MARKER;
pub use pipeline::extract::Block;
pub use pipeline::filter::FlaggedBlock;
pub use pipeline::input::DocumentFormat;
pub use progress::{NoOpProgress, ReviewProgress, ReviewProgressCallback};
pub use review::{review, review_bytes, review_sync, review_to_file, scan, scan_bytes};
pub use session::ReviewSession;
