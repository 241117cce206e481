//! Per-block disposition: turn each flagged block into its replacement.
//!
//! `Ignore` and `Delete` resolve locally. `Rewrite` makes one chat call per
//! block, strictly sequentially, each bounded by the configured request
//! timeout. There are no automatic retries: a failed rewrite yields a
//! visible error marker in the artifact and the run moves on to the next
//! block. Re-running the review is the only retry path.

use crate::config::{ReviewAction, ReviewConfig, ReviewPlan, Tone};
use crate::error::BlockError;
use crate::output::BlockOutcome;
use crate::pipeline::extract::Block;
use crate::pipeline::filter::FlaggedBlock;
use crate::pipeline::splice::ModificationMap;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Prefix of the replacement text emitted when a rewrite fails. Visible in
/// the artifact so an incomplete revision can never pass for a complete one.
pub const REWRITE_ERROR_MARKER: &str = "[REWRITE FAILED";

/// Build the visible replacement for a failed rewrite.
pub fn failure_replacement(err: &BlockError) -> String {
    format!("{REWRITE_ERROR_MARKER}: {}]", err.detail())
}

/// The blocks immediately before and after `position` in the original full
/// sequence, or empty strings at the document boundaries.
pub fn neighbours(blocks: &[Block], position: usize) -> (String, String) {
    let prev = position
        .checked_sub(1)
        .and_then(|i| blocks.get(i))
        .map(|b| b.text.clone())
        .unwrap_or_default();
    let next = blocks
        .get(position + 1)
        .map(|b| b.text.clone())
        .unwrap_or_default();
    (prev, next)
}

/// Result of one chat-backed rewrite.
struct RewriteOutcome {
    text: String,
    input_tokens: usize,
    output_tokens: usize,
}

/// One rewrite call: system prompt + contextual instruction, bounded by the
/// request timeout. No retry loop.
async fn rewrite_block(
    provider: &Arc<dyn LLMProvider>,
    key: &str,
    block: &str,
    prev: &str,
    next: &str,
    tone: Tone,
    config: &ReviewConfig,
) -> Result<RewriteOutcome, BlockError> {
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(prompts::REWRITE_SYSTEM_PROMPT);
    let messages = vec![
        ChatMessage::system(system),
        ChatMessage::user(prompts::rewrite_instruction(block, prev, next, tone)),
    ];
    let options = CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    };

    let call = provider.chat(&messages, Some(&options));
    let response = tokio::time::timeout(Duration::from_secs(config.api_timeout_secs), call)
        .await
        .map_err(|_| BlockError::Timeout {
            key: key.to_string(),
            secs: config.api_timeout_secs,
        })?
        .map_err(|e| BlockError::RewriteFailed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;

    let text = response.content.trim().to_string();
    if text.is_empty() {
        return Err(BlockError::EmptyCompletion {
            key: key.to_string(),
        });
    }
    Ok(RewriteOutcome {
        text,
        input_tokens: response.prompt_tokens as usize,
        output_tokens: response.completion_tokens as usize,
    })
}

/// Resolve every flagged block against the plan, strictly in document
/// order. Returns the modification map for the splicer plus one outcome
/// per flagged block.
pub async fn resolve_dispositions(
    provider: Option<&Arc<dyn LLMProvider>>,
    blocks: &[Block],
    flagged: &[FlaggedBlock],
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> (ModificationMap, Vec<BlockOutcome>) {
    let total = flagged.len();
    if let Some(cb) = &config.progress_callback {
        cb.on_review_start(total);
    }

    let mut modifications: ModificationMap = Vec::new();
    let mut outcomes = Vec::with_capacity(total);
    let mut succeeded = 0usize;

    for (index, fb) in flagged.iter().enumerate() {
        if let Some(cb) = &config.progress_callback {
            cb.on_block_start(index, total);
        }
        let disposition = plan.disposition_for(&fb.key);
        let started = Instant::now();

        let mut outcome = BlockOutcome {
            key: fb.key.clone(),
            position: fb.block.position,
            original: fb.block.text.clone(),
            action: disposition.action,
            tone: disposition.tone,
            replacement: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            duration_ms: 0,
            error: None,
        };

        match disposition.action {
            ReviewAction::Ignore => {
                // Ignored blocks still enter the map with their own text,
                // so highlight mode marks every flagged block in the
                // artifact, pass-throughs included.
                outcome.replacement = fb.block.text.clone();
                modifications.push((fb.block.text.clone(), fb.block.text.clone()));
            }
            ReviewAction::Delete => {
                modifications.push((fb.block.text.clone(), String::new()));
            }
            ReviewAction::Rewrite => {
                // Plan validation upstream guarantees a tone is present.
                let tone = disposition.tone.unwrap_or_default();
                let (prev, next) = neighbours(blocks, fb.block.position);
                let result = match provider {
                    Some(p) => {
                        rewrite_block(p, &fb.key, &fb.block.text, &prev, &next, tone, config).await
                    }
                    None => Err(BlockError::RewriteFailed {
                        key: fb.key.clone(),
                        detail: "no chat provider resolved".into(),
                    }),
                };
                match result {
                    Ok(r) => {
                        debug!(key = %fb.key, len = r.text.len(), "block rewritten");
                        outcome.replacement = r.text.clone();
                        outcome.input_tokens = r.input_tokens;
                        outcome.output_tokens = r.output_tokens;
                        modifications.push((fb.block.text.clone(), r.text));
                    }
                    Err(e) => {
                        warn!(key = %fb.key, error = %e, "rewrite failed, emitting marker");
                        let marker = failure_replacement(&e);
                        outcome.replacement = marker.clone();
                        outcome.error = Some(e);
                        modifications.push((fb.block.text.clone(), marker));
                    }
                }
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        if let Some(cb) = &config.progress_callback {
            match &outcome.error {
                Some(e) => cb.on_block_error(index, total, &e.to_string()),
                None => {
                    cb.on_block_complete(index, total, outcome.replacement.len());
                }
            }
        }
        if outcome.error.is_none() {
            succeeded += 1;
        }
        outcomes.push(outcome);
    }

    if let Some(cb) = &config.progress_callback {
        cb.on_review_complete(total, succeeded);
    }
    (modifications, outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Disposition;

    fn blocks(texts: &[&str]) -> Vec<Block> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Block {
                text: t.to_string(),
                position: i,
            })
            .collect()
    }

    fn flag(blocks: &[Block], position: usize) -> FlaggedBlock {
        let b = blocks[position].clone();
        FlaggedBlock {
            key: format!("{}_{}", b.position, b.text),
            block: b,
        }
    }

    #[test]
    fn failure_marker_is_distinguishable() {
        let err = BlockError::Timeout {
            key: "0_x".into(),
            secs: 60,
        };
        let marker = failure_replacement(&err);
        assert!(marker.starts_with(REWRITE_ERROR_MARKER));
        assert!(marker.ends_with(']'));
        assert!(marker.contains("60s"));
        assert_ne!(marker, "x");
    }

    #[test]
    fn neighbours_at_boundaries_are_empty() {
        let bs = blocks(&["a", "b", "c"]);
        assert_eq!(neighbours(&bs, 0), (String::new(), "b".to_string()));
        assert_eq!(neighbours(&bs, 1), ("a".to_string(), "c".to_string()));
        assert_eq!(neighbours(&bs, 2), ("b".to_string(), String::new()));
    }

    #[tokio::test]
    async fn delete_and_ignore_resolve_without_provider() {
        let bs = blocks(&["Mi chiamo Ilias.", "neutro", "ho 41 anni"]);
        let flagged = vec![flag(&bs, 0), flag(&bs, 2)];
        let plan = crate::config::ReviewPlan::delete_all()
            .with_override(flagged[1].key.clone(), Disposition::ignore());
        let config = ReviewConfig::default();

        let (mods, outcomes) =
            resolve_dispositions(None, &bs, &flagged, &plan, &config).await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].action, ReviewAction::Delete);
        assert_eq!(outcomes[1].action, ReviewAction::Ignore);
        assert_eq!(outcomes[1].replacement, "ho 41 anni");
        // Delete maps to empty, ignore maps to itself.
        assert_eq!(
            mods,
            vec![
                ("Mi chiamo Ilias.".to_string(), String::new()),
                ("ho 41 anni".to_string(), "ho 41 anni".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn rewrite_without_provider_emits_marker() {
        let bs = blocks(&["Mi chiamo Ilias."]);
        let flagged = vec![flag(&bs, 0)];
        let plan = crate::config::ReviewPlan::rewrite_all(Tone::Formal);
        let config = ReviewConfig::default();

        let (mods, outcomes) =
            resolve_dispositions(None, &bs, &flagged, &plan, &config).await;

        assert!(outcomes[0].error.is_some());
        assert!(outcomes[0].replacement.starts_with(REWRITE_ERROR_MARKER));
        assert!(mods[0].1.starts_with(REWRITE_ERROR_MARKER));
    }
}
