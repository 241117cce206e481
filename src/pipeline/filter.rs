//! The critical-block filter: select blocks that need review.
//!
//! The baseline path is a pure function over `(blocks, patterns)`. The
//! optional classifier path additionally asks the chat service to label
//! blocks the regexes did not match; selection is the OR of the two.
//!
//! The classifier fails closed: any transport error, timeout, empty
//! completion or malformed verdict counts as "not critical", so a broken
//! service can never widen the selection beyond what it actually labeled.

use crate::config::ReviewConfig;
use crate::detectors::CriticalPatterns;
use crate::pipeline::extract::Block;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A block the filter selected, keyed for plan lookup and splicing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedBlock {
    /// `<position>_<block text>`; unique within a run.
    pub key: String,
    pub block: Block,
}

/// Stable key for a block: its position in the original full sequence
/// joined with its text.
pub fn block_key(block: &Block) -> String {
    format!("{}_{}", block.position, block.text)
}

/// Select the blocks matching the detector set.
///
/// With `dedup` enabled, repeated block texts are collapsed to their first
/// occurrence (first-seen order) before matching, so one decision covers
/// every occurrence. Keys always use the block's original position, so they
/// are stable across both variants.
pub fn filter_blocks(
    blocks: &[Block],
    patterns: &CriticalPatterns,
    dedup: bool,
) -> Vec<FlaggedBlock> {
    let mut seen = HashSet::new();
    let mut flagged = Vec::new();
    for block in blocks {
        if dedup && !seen.insert(block.text.as_str()) {
            continue;
        }
        if patterns.matches(&block.text) {
            flagged.push(FlaggedBlock {
                key: block_key(block),
                block: block.clone(),
            });
        }
    }
    debug!(flagged = flagged.len(), total = blocks.len(), "filter complete");
    flagged
}

// ── Classifier path ──────────────────────────────────────────────────────

/// Verdict JSON returned by the classifier prompt.
#[derive(Debug, Deserialize)]
struct ClassifierVerdict {
    label: String,
    #[serde(default)]
    #[allow(dead_code)]
    rationale: String,
}

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("fence regex compiles")
});

/// Parse a classifier completion into a critical / not-critical verdict.
///
/// Tolerates outer Markdown code fences. Anything unparseable is not
/// critical.
fn parse_verdict(completion: &str) -> bool {
    let body = match RE_OUTER_FENCES.captures(completion) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(completion),
        None => completion.trim(),
    };
    match serde_json::from_str::<ClassifierVerdict>(body) {
        Ok(v) => v.label.trim().eq_ignore_ascii_case("critical"),
        Err(e) => {
            warn!(error = %e, "classifier verdict unparseable, treating as not critical");
            false
        }
    }
}

/// Ask the chat service whether a block is critical. Fails closed.
async fn classify_block(
    provider: &Arc<dyn LLMProvider>,
    text: &str,
    config: &ReviewConfig,
) -> bool {
    let messages = vec![
        ChatMessage::system(prompts::CLASSIFIER_SYSTEM_PROMPT),
        ChatMessage::user(prompts::classifier_instruction(text)),
    ];
    let options = CompletionOptions {
        temperature: Some(0.0),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };
    let call = provider.chat(&messages, Some(&options));
    match tokio::time::timeout(Duration::from_secs(config.api_timeout_secs), call).await {
        Ok(Ok(response)) => parse_verdict(&response.content),
        Ok(Err(e)) => {
            warn!(error = %e, "classifier call failed, treating as not critical");
            false
        }
        Err(_) => {
            warn!(
                secs = config.api_timeout_secs,
                "classifier call timed out, treating as not critical"
            );
            false
        }
    }
}

/// Classifier-augmented filter: regex matches are kept without a chat call;
/// only unmatched blocks are sent to the classifier.
pub async fn filter_blocks_with_classifier(
    blocks: &[Block],
    patterns: &CriticalPatterns,
    dedup: bool,
    provider: &Arc<dyn LLMProvider>,
    config: &ReviewConfig,
) -> Vec<FlaggedBlock> {
    let mut seen = HashSet::new();
    let mut flagged = Vec::new();
    for block in blocks {
        if dedup && !seen.insert(block.text.clone()) {
            continue;
        }
        let critical = patterns.matches(&block.text)
            || classify_block(provider, &block.text, config).await;
        if critical {
            flagged.push(FlaggedBlock {
                key: block_key(block),
                block: block.clone(),
            });
        }
    }
    debug!(
        flagged = flagged.len(),
        total = blocks.len(),
        "classifier-augmented filter complete"
    );
    flagged
}
