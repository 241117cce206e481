//! Configuration types for a document review run.
//!
//! All pipeline behaviour is controlled through [`ReviewConfig`], built via
//! its [`ReviewConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs between runs, serialise the interesting parts
//! for logging, and diff two runs to understand why their artifacts differ.
//!
//! Per-run *choices* — what to do with each flagged block — live in
//! [`ReviewPlan`], not in the config: the config describes how the pipeline
//! behaves, the plan describes what the user decided for one upload.

use crate::detectors::CriticalPatterns;
use crate::error::ReviewError;
use crate::progress::ReviewProgress;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Default chat model when neither config nor environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for a review run.
///
/// Built via [`ReviewConfig::builder()`] or using
/// [`ReviewConfig::default()`].
///
/// # Example
/// ```rust
/// use docrevise::{PdfStrategy, PluralMode, ReviewConfig};
///
/// let config = ReviewConfig::builder()
///     .highlight(false)
///     .plural(PluralMode::Rules)
///     .pdf_strategy(PdfStrategy::Passthrough)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Compiled detector set. Default: the built-in critical patterns.
    ///
    /// Constructed once and shared; the filter never recompiles or mutates
    /// it during a run.
    pub patterns: Arc<CriticalPatterns>,

    /// Collapse repeated block texts to their first occurrence before
    /// filtering. Default: true.
    ///
    /// Mirrors the behaviour a reviewer expects: the same boilerplate
    /// sentence repeated across a document is decided once. Disable to get
    /// one key per occurrence instead.
    pub dedup_blocks: bool,

    /// Ask the chat service to label each block critical / not critical in
    /// addition to the regex detectors. Default: false.
    ///
    /// The classifier can only ADD blocks to the selection (regex OR
    /// classifier); on any transport error, empty completion, or malformed
    /// JSON it silently counts as "not critical", so a broken service never
    /// widens or narrows the regex baseline.
    pub use_classifier: bool,

    /// Wrap non-empty replacements in `<mark>…</mark>` when splicing markup
    /// artifacts. Default: true.
    pub highlight: bool,

    /// Which PDF splice strategy to use. Default: [`PdfStrategy::Rewrite`].
    pub pdf_strategy: PdfStrategy,

    /// Whole-document singular-to-plural conversion, applied after
    /// splicing. Default: [`PluralMode::Off`].
    pub plural: PluralMode,

    /// Chat model identifier, e.g. "gpt-4.1-nano", "claude-haiku-4-20250514".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// Provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    ///
    /// Provider resolution is lazy: a run whose plan never rewrites (and
    /// that uses neither the classifier nor model-based plural conversion)
    /// never touches the provider, so it runs without any credential.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for chat completions. Default: 0.2.
    ///
    /// Low temperature keeps rewrites faithful to the surrounding text;
    /// higher values introduce drift that defeats the point of a review.
    pub temperature: f32,

    /// Maximum tokens the service may generate per call. Default: 1024.
    ///
    /// Rewrites return a single sentence, so this is generous. The
    /// model-based plural pass shares the same bound; raise it for long
    /// documents.
    pub max_tokens: usize,

    /// Custom rewrite system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-chat-call timeout in seconds. Default: 60. Mandatory: every
    /// outbound call is bounded by this at the call site.
    pub api_timeout_secs: u64,

    /// Optional per-block progress callback.
    pub progress_callback: Option<ReviewProgress>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            patterns: Arc::new(CriticalPatterns::default()),
            dedup_blocks: true,
            use_classifier: false,
            highlight: true,
            pdf_strategy: PdfStrategy::default(),
            plural: PluralMode::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 1024,
            system_prompt: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("patterns", &self.patterns.len())
            .field("dedup_blocks", &self.dedup_blocks)
            .field("use_classifier", &self.use_classifier)
            .field("highlight", &self.highlight)
            .field("pdf_strategy", &self.pdf_strategy)
            .field("plural", &self.plural)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn patterns(mut self, patterns: CriticalPatterns) -> Self {
        self.config.patterns = Arc::new(patterns);
        self
    }

    pub fn dedup_blocks(mut self, v: bool) -> Self {
        self.config.dedup_blocks = v;
        self
    }

    pub fn use_classifier(mut self, v: bool) -> Self {
        self.config.use_classifier = v;
        self
    }

    pub fn highlight(mut self, v: bool) -> Self {
        self.config.highlight = v;
        self
    }

    pub fn pdf_strategy(mut self, strategy: PdfStrategy) -> Self {
        self.config.pdf_strategy = strategy;
        self
    }

    pub fn plural(mut self, mode: PluralMode) -> Self {
        self.config.plural = mode;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ReviewProgress) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.patterns.is_empty() {
            return Err(ReviewError::InvalidConfig(
                "detector pattern set must not be empty".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReviewError::InvalidConfig(
                "api_timeout_secs must be ≥ 1 (a request timeout is mandatory)".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// User-chosen treatment for a flagged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    /// Ask the chat service to rewrite the block in a chosen tone.
    Rewrite,
    /// Remove the block (replacement is the empty string).
    Delete,
    /// Pass the block through unchanged.
    Ignore,
}

/// Rewriting style instruction, one of a fixed enumerated set.
///
/// Each tone maps to a distinct instruction string in [`crate::prompts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Match the register of the surrounding text. (default)
    #[default]
    Original,
    Formal,
    Informal,
    Technical,
    Narrative,
    Promotional,
    Journalistic,
}

impl Tone {
    /// All tones, for CLI help and exhaustive tests.
    pub const ALL: [Tone; 7] = [
        Tone::Original,
        Tone::Formal,
        Tone::Informal,
        Tone::Technical,
        Tone::Narrative,
        Tone::Promotional,
        Tone::Journalistic,
    ];
}

/// Which PDF splice strategy the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PdfStrategy {
    /// Rewrite content streams in place on every page containing a flagged
    /// block (functional parity with the redaction-overlay behaviour).
    /// (default)
    #[default]
    Rewrite,
    /// Return the original PDF bytes unmodified — an explicit placeholder
    /// for hosts that only need the per-block outcomes.
    Passthrough,
}

/// Whole-document singular-to-plural conversion mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluralMode {
    /// No conversion. (default)
    #[default]
    Off,
    /// Deterministic word-substitution rules (pronouns/possessives only;
    /// verbs are intentionally not conjugated).
    Rules,
    /// One chat call rewriting the whole text to plural register.
    Model,
}

// ── Per-run plan ─────────────────────────────────────────────────────────

/// Treatment of one flagged block: the action plus rewrite parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub action: ReviewAction,
    /// Required when `action = Rewrite`; ignored otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
}

impl Disposition {
    pub fn rewrite(tone: Tone) -> Self {
        Self {
            action: ReviewAction::Rewrite,
            tone: Some(tone),
        }
    }

    pub fn delete() -> Self {
        Self {
            action: ReviewAction::Delete,
            tone: None,
        }
    }

    pub fn ignore() -> Self {
        Self {
            action: ReviewAction::Ignore,
            tone: None,
        }
    }
}

/// Per-run choices: a default disposition plus per-key overrides.
///
/// Keys are the filter keys (`<index>_<block text>`) reported by a scan, so
/// a host can show the flagged blocks, collect choices, and hand them back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewPlan {
    #[serde(default = "default_disposition")]
    pub default: Disposition,
    #[serde(default)]
    pub overrides: HashMap<String, Disposition>,
}

fn default_disposition() -> Disposition {
    Disposition::ignore()
}

impl Default for Disposition {
    fn default() -> Self {
        Disposition::ignore()
    }
}

impl ReviewPlan {
    /// Pass every flagged block through unchanged.
    pub fn ignore_all() -> Self {
        Self {
            default: Disposition::ignore(),
            overrides: HashMap::new(),
        }
    }

    /// Delete every flagged block.
    pub fn delete_all() -> Self {
        Self {
            default: Disposition::delete(),
            overrides: HashMap::new(),
        }
    }

    /// Rewrite every flagged block in the given tone.
    pub fn rewrite_all(tone: Tone) -> Self {
        Self {
            default: Disposition::rewrite(tone),
            overrides: HashMap::new(),
        }
    }

    /// Override the disposition for one flagged-block key.
    pub fn with_override(mut self, key: impl Into<String>, disposition: Disposition) -> Self {
        self.overrides.insert(key.into(), disposition);
        self
    }

    /// Resolve the disposition for a flagged-block key.
    pub fn disposition_for(&self, key: &str) -> &Disposition {
        self.overrides.get(key).unwrap_or(&self.default)
    }

    /// True when any flagged block would be rewritten under this plan.
    pub fn needs_rewrite<'a, K: IntoIterator<Item = &'a str>>(&self, keys: K) -> bool {
        keys.into_iter()
            .any(|k| self.disposition_for(k).action == ReviewAction::Rewrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let c = ReviewConfig::builder().build().unwrap();
        assert!(c.dedup_blocks);
        assert!(c.highlight);
        assert_eq!(c.pdf_strategy, PdfStrategy::Rewrite);
        assert_eq!(c.plural, PluralMode::Off);
        assert_eq!(c.api_timeout_secs, 60);
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = ReviewConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn zero_api_timeout_rejected() {
        let err = ReviewConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("mandatory"));
    }

    #[test]
    fn plan_override_wins() {
        let plan = ReviewPlan::delete_all().with_override("3_x", Disposition::ignore());
        assert_eq!(plan.disposition_for("3_x").action, ReviewAction::Ignore);
        assert_eq!(plan.disposition_for("0_y").action, ReviewAction::Delete);
    }

    #[test]
    fn plan_needs_rewrite() {
        let plan = ReviewPlan::ignore_all()
            .with_override("1_a", Disposition::rewrite(Tone::Formal));
        assert!(plan.needs_rewrite(["1_a", "2_b"]));
        assert!(!plan.needs_rewrite(["2_b"]));
    }

    #[test]
    fn disposition_json_roundtrip() {
        let d: Disposition = serde_json::from_str(r#"{"action":"rewrite","tone":"formal"}"#).unwrap();
        assert_eq!(d, Disposition::rewrite(Tone::Formal));
        let d: Disposition = serde_json::from_str(r#"{"action":"delete"}"#).unwrap();
        assert_eq!(d, Disposition::delete());
    }
}
