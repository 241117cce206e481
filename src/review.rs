//! Top-level entry points: `scan`, `review`, `review_to_file`, `review_sync`.
//!
//! Orchestrates the pipeline stages with timing and progress reporting.
//! Provider resolution is lazy: a run whose plan never rewrites, with the
//! classifier off and model-based plural conversion off, completes without
//! touching any credential.

use crate::config::{PluralMode, ReviewAction, ReviewConfig, ReviewPlan, DEFAULT_MODEL};
use crate::error::{BlockError, ReviewError};
use crate::output::{BlockOutcome, ReviewArtifact, ReviewOutput, ReviewStats, ScanReport};
use crate::pipeline::extract::{self, DocumentBody, ExtractedDocument};
use crate::pipeline::filter::{self, FlaggedBlock};
use crate::pipeline::input::{self, DocumentFormat, ResolvedInput};
use crate::pipeline::plural;
use crate::pipeline::splice;
use crate::pipeline::disposition;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Scan a document (path or URL): extract blocks and report the flagged
/// ones without resolving any disposition.
pub async fn scan(input_str: &str, config: &ReviewConfig) -> Result<ScanReport, ReviewError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    scan_resolved(resolved, config).await
}

/// Scan uploaded bytes. See [`scan`].
pub async fn scan_bytes(
    bytes: Vec<u8>,
    name: &str,
    config: &ReviewConfig,
) -> Result<ScanReport, ReviewError> {
    let resolved = input::resolve_bytes(bytes, name)?;
    scan_resolved(resolved, config).await
}

async fn scan_resolved(
    resolved: ResolvedInput,
    config: &ReviewConfig,
) -> Result<ScanReport, ReviewError> {
    let document = extract::extract(&resolved)?;
    let flagged = select_blocks(&document, config).await?;
    Ok(ScanReport {
        filename: resolved.name,
        format: document.format,
        total_blocks: document.blocks.len(),
        flagged,
    })
}

/// Review a document (path or URL): flag, resolve each flagged block
/// against the plan, splice, and emit the revised artifact.
pub async fn review(
    input_str: &str,
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> Result<ReviewOutput, ReviewError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run_review(resolved, plan, config).await
}

/// Review uploaded bytes. See [`review`].
pub async fn review_bytes(
    bytes: Vec<u8>,
    name: &str,
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> Result<ReviewOutput, ReviewError> {
    let resolved = input::resolve_bytes(bytes, name)?;
    run_review(resolved, plan, config).await
}

/// Review a document and write the artifact directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn review_to_file(
    input_str: &str,
    output_path: impl AsRef<Path>,
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> Result<ReviewStats, ReviewError> {
    let output = review(input_str, plan, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ReviewError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("revised.tmp");
    tokio::fs::write(&tmp_path, &output.artifact.bytes)
        .await
        .map_err(|e| ReviewError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ReviewError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`review`].
///
/// Creates a temporary tokio runtime internally.
pub fn review_sync(
    input_str: &str,
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> Result<ReviewOutput, ReviewError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReviewError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(review(input_str, plan, config))
}

// ── Internal orchestration ───────────────────────────────────────────────

async fn run_review(
    resolved: ResolvedInput,
    plan: &ReviewPlan,
    config: &ReviewConfig,
) -> Result<ReviewOutput, ReviewError> {
    let total_start = Instant::now();
    validate_plan(plan)?;

    // ── Extract ──────────────────────────────────────────────────────────
    let extract_start = Instant::now();
    let document = extract::extract(&resolved)?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    debug!(blocks = document.blocks.len(), "extracted blocks");

    // ── Filter ───────────────────────────────────────────────────────────
    let flagged = select_blocks(&document, config).await?;
    info!(
        flagged = flagged.len(),
        total = document.blocks.len(),
        "flagged blocks selected"
    );

    // Resolve the provider only when a chat call is actually coming.
    let needs_provider = plan.needs_rewrite(flagged.iter().map(|f| f.key.as_str()))
        || config.plural == PluralMode::Model;
    let provider = if needs_provider {
        Some(resolve_provider(config).await?)
    } else {
        None
    };

    // ── Dispositions ─────────────────────────────────────────────────────
    let llm_start = Instant::now();
    let (modifications, outcomes) = disposition::resolve_dispositions(
        provider.as_ref(),
        &document.blocks,
        &flagged,
        plan,
        config,
    )
    .await;
    let mut llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Splice + plural ──────────────────────────────────────────────────
    let mut splice_misses = 0usize;
    let mut plural_error: Option<BlockError> = None;
    let mut plural_tokens = (0u64, 0u64);

    let artifact_bytes = match &document.body {
        DocumentBody::Markup(markup) => {
            let (spliced, misses) =
                splice::splice_markup(markup, &modifications, config.highlight);
            splice_misses = misses;
            let plural_start = Instant::now();
            let (text, err, tokens) =
                pluralize_text(spliced, provider.as_ref(), config).await;
            llm_duration_ms += plural_start.elapsed().as_millis() as u64;
            plural_error = err;
            plural_tokens = tokens;
            text.into_bytes()
        }
        DocumentBody::Paragraphs => {
            let lines = splice::final_lines(&document.blocks, &modifications);
            let plural_start = Instant::now();
            let (text, err, tokens) =
                pluralize_text(lines.join("\n"), provider.as_ref(), config).await;
            llm_duration_ms += plural_start.elapsed().as_millis() as u64;
            plural_error = err;
            plural_tokens = tokens;
            let lines: Vec<String> = text.lines().map(str::to_string).collect();
            splice::build_docx(&lines)?
        }
        DocumentBody::Pdf(bytes) => {
            if config.plural != PluralMode::Off {
                warn!("plural conversion is not supported for PDF output, skipping");
            }
            let strategy = splice::pdf_strategy(config.pdf_strategy);
            debug!(strategy = strategy.name(), "splicing PDF");
            let result = strategy.splice(bytes, &modifications)?;
            splice_misses = result.misses;
            result.bytes
        }
    };

    // ── Assemble output ──────────────────────────────────────────────────
    let artifact = ReviewArtifact {
        bytes: artifact_bytes,
        filename: artifact_filename(&resolved.name, document.format),
        mime: document.format.artifact_mime(),
    };
    let stats = build_stats(
        &document,
        &flagged,
        &outcomes,
        splice_misses,
        plural_tokens,
        extract_duration_ms,
        llm_duration_ms,
        total_start.elapsed().as_millis() as u64,
    );
    info!(
        flagged = stats.flagged_blocks,
        failed = stats.failed,
        misses = stats.splice_misses,
        total_ms = stats.total_duration_ms,
        "review complete"
    );

    Ok(ReviewOutput {
        artifact,
        blocks: outcomes,
        stats,
        plural_error,
    })
}

/// Reject plans that would rewrite without a tone, before any chat call.
fn validate_plan(plan: &ReviewPlan) -> Result<(), ReviewError> {
    let rewrite_without_tone = |d: &crate::config::Disposition| {
        d.action == ReviewAction::Rewrite && d.tone.is_none()
    };
    if rewrite_without_tone(&plan.default)
        || plan.overrides.values().any(rewrite_without_tone)
    {
        return Err(ReviewError::InvalidConfig(
            "a rewrite disposition requires a tone".into(),
        ));
    }
    Ok(())
}

/// Run the configured filter path over the extracted blocks.
async fn select_blocks(
    document: &ExtractedDocument,
    config: &ReviewConfig,
) -> Result<Vec<FlaggedBlock>, ReviewError> {
    if config.use_classifier {
        let provider = resolve_provider(config).await?;
        Ok(filter::filter_blocks_with_classifier(
            &document.blocks,
            &config.patterns,
            config.dedup_blocks,
            &provider,
            config,
        )
        .await)
    } else {
        Ok(filter::filter_blocks(
            &document.blocks,
            &config.patterns,
            config.dedup_blocks,
        ))
    }
}

/// Apply the configured plural mode to a text artifact.
async fn pluralize_text(
    text: String,
    provider: Option<&Arc<dyn LLMProvider>>,
    config: &ReviewConfig,
) -> (String, Option<BlockError>, (u64, u64)) {
    match config.plural {
        PluralMode::Off => (text, None, (0, 0)),
        PluralMode::Rules => (plural::pluralize_rules(&text), None, (0, 0)),
        PluralMode::Model => {
            let Some(provider) = provider else {
                // Resolution above guarantees a provider in Model mode; a
                // missing one is surfaced like any other conversion failure.
                let err = BlockError::RewriteFailed {
                    key: "plural-conversion".into(),
                    detail: "no chat provider resolved".into(),
                };
                return (text, Some(err), (0, 0));
            };
            match plural::pluralize_model(provider, &text, config).await {
                Ok(outcome) => (
                    outcome.text,
                    None,
                    (outcome.input_tokens as u64, outcome.output_tokens as u64),
                ),
                Err(e) => {
                    warn!(error = %e, "plural conversion failed, artifact left unconverted");
                    (text, Some(e), (0, 0))
                }
            }
        }
    }
}

fn artifact_filename(input_name: &str, format: DocumentFormat) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    format!("{stem}_revised.{}", format.artifact_extension())
}

#[allow(clippy::too_many_arguments)]
fn build_stats(
    document: &ExtractedDocument,
    flagged: &[FlaggedBlock],
    outcomes: &[BlockOutcome],
    splice_misses: usize,
    plural_tokens: (u64, u64),
    extract_duration_ms: u64,
    llm_duration_ms: u64,
    total_duration_ms: u64,
) -> ReviewStats {
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    let count = |action: ReviewAction| {
        outcomes
            .iter()
            .filter(|o| o.action == action && o.error.is_none())
            .count()
    };
    ReviewStats {
        total_blocks: document.blocks.len(),
        flagged_blocks: flagged.len(),
        rewritten: count(ReviewAction::Rewrite),
        deleted: count(ReviewAction::Delete),
        ignored: count(ReviewAction::Ignore),
        failed,
        splice_misses,
        total_input_tokens: outcomes.iter().map(|o| o.input_tokens as u64).sum::<u64>()
            + plural_tokens.0,
        total_output_tokens: outcomes.iter().map(|o| o.output_tokens as u64).sum::<u64>()
            + plural_tokens.1,
        extract_duration_ms,
        llm_duration_ms,
        total_duration_ms,
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_chat_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReviewError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — used as-is. Useful in
///    tests or when the caller needs custom middleware.
/// 2. **Named provider + model** (`config.provider_name`) — instantiated
///    via [`ProviderFactory::create_llm_provider`], which reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`) —
///    honoured before full auto-detection so the model choice wins even
///    when multiple API keys are present.
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available.
async fn resolve_provider(config: &ReviewConfig) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    // 1) User-provided provider takes priority
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    // 2) Provider name + model
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_chat_provider(name, model);
    }

    // 3) Environment pair
    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_chat_provider(&prov, &model);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a deterministic default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_chat_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReviewError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Disposition, Tone};

    #[test]
    fn artifact_filename_uses_stem_and_artifact_extension() {
        assert_eq!(
            artifact_filename("report.md", DocumentFormat::Markdown),
            "report_revised.html"
        );
        assert_eq!(
            artifact_filename("cv.docx", DocumentFormat::Docx),
            "cv_revised.docx"
        );
    }

    #[test]
    fn plan_with_toneless_rewrite_rejected() {
        let plan = ReviewPlan {
            default: Disposition {
                action: ReviewAction::Rewrite,
                tone: None,
            },
            overrides: Default::default(),
        };
        assert!(validate_plan(&plan).is_err());

        let ok = ReviewPlan::rewrite_all(Tone::Formal);
        assert!(validate_plan(&ok).is_ok());
    }
}
