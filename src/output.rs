//! Output types: the revised artifact, per-block outcomes and run statistics.

use crate::config::{ReviewAction, Tone};
use crate::error::BlockError;
use crate::pipeline::filter::FlaggedBlock;
use crate::pipeline::input::DocumentFormat;
use serde::Serialize;

/// The revised document, ready for the host to persist or serve.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewArtifact {
    /// Raw artifact bytes. Skipped in JSON output; hosts that need the
    /// payload take it from the struct directly.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Suggested download filename, `<input stem>_revised.<ext>`.
    pub filename: String,
    /// MIME type matching the artifact format.
    pub mime: &'static str,
}

/// Outcome of resolving one flagged block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    /// Filter key (`<index>_<block text>`).
    pub key: String,
    /// Position in the original full block sequence.
    pub position: usize,
    /// The original block text.
    pub original: String,
    /// The action that was applied.
    pub action: ReviewAction,
    /// Tone used, when the action was a rewrite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    /// Final replacement text. For `Ignore` this equals `original`; for
    /// `Delete` it is empty; for a failed rewrite it is the error marker.
    pub replacement: String,
    /// Prompt tokens consumed by the chat call (0 when no call was made).
    pub input_tokens: usize,
    /// Completion tokens produced by the chat call.
    pub output_tokens: usize,
    /// Wall-clock time spent resolving this block.
    pub duration_ms: u64,
    /// Set when the rewrite failed; the replacement then carries the
    /// visible error marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<BlockError>,
}

/// Aggregate statistics for one review run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewStats {
    /// Blocks extracted from the document.
    pub total_blocks: usize,
    /// Blocks the filter flagged.
    pub flagged_blocks: usize,
    /// Flagged blocks rewritten successfully.
    pub rewritten: usize,
    /// Flagged blocks deleted.
    pub deleted: usize,
    /// Flagged blocks passed through unchanged.
    pub ignored: usize,
    /// Flagged blocks whose rewrite failed (error marker emitted).
    pub failed: usize,
    /// Modification entries the splicer could not locate in the body.
    pub splice_misses: usize,
    /// Total prompt tokens across all chat calls.
    pub total_input_tokens: u64,
    /// Total completion tokens across all chat calls.
    pub total_output_tokens: u64,
    /// Time spent in input resolution and extraction.
    pub extract_duration_ms: u64,
    /// Time spent in chat calls (dispositions plus plural conversion).
    pub llm_duration_ms: u64,
    /// End-to-end run time.
    pub total_duration_ms: u64,
}

/// Everything a `review` run produces.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutput {
    pub artifact: ReviewArtifact,
    /// One outcome per flagged block, in document order.
    pub blocks: Vec<BlockOutcome>,
    pub stats: ReviewStats,
    /// Set when a model-based plural conversion failed; the artifact is
    /// then the unconverted document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural_error: Option<BlockError>,
}

/// Result of a `scan` run: the flagged blocks, without resolving them.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    /// Name of the scanned input.
    pub filename: String,
    pub format: DocumentFormat,
    /// Blocks extracted from the document.
    pub total_blocks: usize,
    /// Flagged blocks in document order, keys unique.
    pub flagged: Vec<FlaggedBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_bytes_not_serialized() {
        let a = ReviewArtifact {
            bytes: vec![1, 2, 3],
            filename: "doc_revised.html".into(),
            mime: "text/html",
        };
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("doc_revised.html"));
        assert!(!json.contains("bytes"));
    }

    #[test]
    fn outcome_omits_empty_optionals() {
        let o = BlockOutcome {
            key: "0_x".into(),
            position: 0,
            original: "x".into(),
            action: ReviewAction::Ignore,
            tone: None,
            replacement: "x".into(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: None,
        };
        let json = serde_json::to_string(&o).unwrap();
        assert!(!json.contains("tone"));
        assert!(!json.contains("error"));
    }
}
