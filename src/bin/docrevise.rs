//! CLI binary for docrevise.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReviewConfig` / `ReviewPlan` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docrevise::{
    review, review_to_file, scan, PdfStrategy, PluralMode, ReviewConfig, ReviewPlan,
    ReviewProgress, ReviewProgressCallback, Tone,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

/// Terminal progress callback: renders a live progress bar plus one log
/// line per resolved block. Blocks are processed strictly in order.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_review_start` (called once the flagged count is known).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} blocks  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reviewing");
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_review_start(&self, total_flagged: usize) {
        self.activate_bar(total_flagged);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Resolving {total_flagged} flagged blocks…"))
        ));
    }

    fn on_block_start(&self, index: usize, _total: usize) {
        self.bar.set_message(format!("block {}", index + 1));
    }

    fn on_block_complete(&self, index: usize, total: usize, replacement_len: usize) {
        self.bar.println(format!(
            "  {} Block {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{replacement_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_block_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = truncate_message(error, 79);

        self.bar.println(format!(
            "  {} Block {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_review_complete(&self, total: usize, succeeded: usize) {
        let failed = total.saturating_sub(succeeded);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} blocks resolved",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} blocks resolved  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

/// Cap a message at `max_chars` characters, appending an ellipsis when cut.
/// Counts characters rather than bytes so multi-byte text never splits.
fn truncate_message(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\u{2026}", &message[..idx]),
        None => message.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # List the flagged blocks (no API key needed)
  docrevise --list-only report.html

  # Delete every flagged block (no API key needed)
  docrevise --action delete report.html -o report_revised.html

  # Rewrite every flagged block formally
  docrevise --action rewrite --tone formal report.html -o revised.html

  # Per-block choices from a plan file
  docrevise --plan choices.json report.docx -o revised.docx

  # Review a document from a URL
  docrevise --action delete https://example.com/page.html -o revised.html

  # Rule-based plural conversion, no highlighting
  docrevise --action rewrite --tone original --plural rules --no-highlight memo.md -o memo.html

  # JSON report (artifact bytes omitted)
  docrevise --json --action delete report.html > outcome.json

PLAN FILE FORMAT (JSON):
  {
    "default": {"action": "ignore"},
    "overrides": {
      "3_Mi chiamo Ilias Contreas.": {"action": "rewrite", "tone": "formal"},
      "7_ho 41 anni": {"action": "delete"}
    }
  }
  Keys are the flagged-block keys printed by --list-only.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Review:          docrevise --action rewrite --tone formal doc.html -o out.html

  Scanning (--list-only), deleting and ignoring need no API key.
"#;

/// Review documents for sensitive content and emit a revised artifact.
#[derive(Parser, Debug)]
#[command(
    name = "docrevise",
    version,
    about = "Flag, rewrite or delete sensitive blocks in HTML/Markdown/Word/PDF documents",
    long_about = "Review documents (local files or URLs) for sensitive content. Flagged text \
blocks are rewritten via an LLM, deleted, or passed through per a plan, and the results are \
spliced back into a revised document. Supports OpenAI, Anthropic, Google Gemini, and any \
OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path (.html, .htm, .md, .docx, .pdf) or HTTP/HTTPS URL.
    input: String,

    /// Write the revised artifact to this file instead of stdout.
    #[arg(short, long, env = "DOCREVISE_OUTPUT")]
    output: Option<PathBuf>,

    /// Default action for every flagged block: rewrite, delete, ignore.
    #[arg(long, value_enum, default_value = "ignore")]
    action: ActionArg,

    /// Tone for rewrites: original, formal, informal, technical, narrative,
    /// promotional, journalistic.
    #[arg(long, value_enum, default_value = "original")]
    tone: ToneArg,

    /// JSON plan file with per-block overrides (see --help for the format).
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Print the flagged blocks and exit, resolving nothing.
    #[arg(long)]
    list_only: bool,

    /// Do not wrap replacements in <mark> tags.
    #[arg(long, env = "DOCREVISE_NO_HIGHLIGHT")]
    no_highlight: bool,

    /// Whole-document singular-to-plural conversion: off, rules, model.
    #[arg(long, value_enum, default_value = "off", env = "DOCREVISE_PLURAL")]
    plural: PluralArg,

    /// PDF splice strategy: rewrite, passthrough.
    #[arg(long, value_enum, default_value = "rewrite", env = "DOCREVISE_PDF_STRATEGY")]
    pdf_strategy: PdfStrategyArg,

    /// Also ask the LLM to label unmatched blocks critical / not critical.
    #[arg(long)]
    classifier: bool,

    /// Keep repeated block texts as separate flagged entries.
    #[arg(long)]
    no_dedup: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-haiku-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCREVISE_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "DOCREVISE_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Path to a text file containing a custom rewrite system prompt.
    #[arg(long, env = "DOCREVISE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "DOCREVISE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOCREVISE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output structured JSON (ReviewOutput) instead of the artifact.
    #[arg(long, env = "DOCREVISE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "DOCREVISE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCREVISE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCREVISE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Rewrite,
    Delete,
    Ignore,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToneArg {
    Original,
    Formal,
    Informal,
    Technical,
    Narrative,
    Promotional,
    Journalistic,
}

impl From<ToneArg> for Tone {
    fn from(v: ToneArg) -> Self {
        match v {
            ToneArg::Original => Tone::Original,
            ToneArg::Formal => Tone::Formal,
            ToneArg::Informal => Tone::Informal,
            ToneArg::Technical => Tone::Technical,
            ToneArg::Narrative => Tone::Narrative,
            ToneArg::Promotional => Tone::Promotional,
            ToneArg::Journalistic => Tone::Journalistic,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PluralArg {
    Off,
    Rules,
    Model,
}

impl From<PluralArg> for PluralMode {
    fn from(v: PluralArg) -> Self {
        match v {
            PluralArg::Off => PluralMode::Off,
            PluralArg::Rules => PluralMode::Rules,
            PluralArg::Model => PluralMode::Model,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PdfStrategyArg {
    Rewrite,
    Passthrough,
}

impl From<PdfStrategyArg> for PdfStrategy {
    fn from(v: PdfStrategyArg) -> Self {
        match v {
            PdfStrategyArg::Rewrite => PdfStrategy::Rewrite,
            PdfStrategyArg::Passthrough => PdfStrategy::Passthrough,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list_only;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ReviewProgress> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── List-only mode ───────────────────────────────────────────────────
    if cli.list_only {
        let report = scan(&cli.input, &config)
            .await
            .context("Scan failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        } else {
            println!("File:           {}", report.filename);
            println!("Format:         {}", report.format);
            println!("Total blocks:   {}", report.total_blocks);
            println!("Flagged blocks: {}", report.flagged.len());
            for fb in &report.flagged {
                println!("  [{}]", fb.key);
            }
        }
        return Ok(());
    }

    // ── Build plan ───────────────────────────────────────────────────────
    let plan = build_plan(&cli).await?;

    // ── Run review ───────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        // --json with -o: write the artifact AND print the report.
        if cli.json {
            let output = review(&cli.input, &plan, &config)
                .await
                .context("Review failed")?;
            tokio::fs::write(output_path, &output.artifact.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output_path.display()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?
            );
        } else {
            let stats = review_to_file(&cli.input, output_path, &plan, &config)
                .await
                .context("Review failed")?;

            // Summary line (callback already printed the per-block log).
            if !cli.quiet {
                eprintln!(
                    "{}  {}/{} flagged blocks  {}ms  →  {}",
                    if stats.failed == 0 { green("✔") } else { cyan("⚠") },
                    stats.flagged_blocks - stats.failed,
                    stats.flagged_blocks,
                    stats.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
                eprintln!(
                    "   {} tokens in  /  {} tokens out",
                    dim(&stats.total_input_tokens.to_string()),
                    dim(&stats.total_output_tokens.to_string()),
                );
                if stats.splice_misses > 0 {
                    eprintln!("   {} splice misses", red(&stats.splice_misses.to_string()));
                }
            }
        }
    } else {
        let output = review(&cli.input, &plan, &config)
            .await
            .context("Review failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            // Binary artifacts cannot go to a terminal-bound stdout.
            if output.artifact.mime != "text/html" {
                anyhow::bail!(
                    "Refusing to write a {} artifact to stdout; use -o <file>",
                    output.artifact.mime
                );
            }
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(&output.artifact.bytes)
                .context("Failed to write to stdout")?;
            if !output.artifact.bytes.ends_with(b"\n") {
                handle.write_all(b"\n").ok();
            }
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ReviewConfig`.
async fn build_config(cli: &Cli, progress: Option<ReviewProgress>) -> Result<ReviewConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {path:?}"))?,
        )
    } else {
        None
    };

    let mut builder = ReviewConfig::builder()
        .dedup_blocks(!cli.no_dedup)
        .use_classifier(cli.classifier)
        .highlight(!cli.no_highlight)
        .pdf_strategy(cli.pdf_strategy.into())
        .plural(cli.plural.into())
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields the builder wraps in Into<String> setters, preserving None.
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.system_prompt = system_prompt;

    Ok(config)
}

/// Build the review plan: a plan file wins over the --action/--tone flags.
async fn build_plan(cli: &Cli) -> Result<ReviewPlan> {
    if let Some(ref path) = cli.plan {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read plan from {path:?}"))?;
        let plan: ReviewPlan =
            serde_json::from_str(&text).with_context(|| format!("Invalid plan file {path:?}"))?;
        return Ok(plan);
    }

    Ok(match cli.action {
        ActionArg::Rewrite => ReviewPlan::rewrite_all(cli.tone.into()),
        ActionArg::Delete => ReviewPlan::delete_all(),
        ActionArg::Ignore => ReviewPlan::ignore_all(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["docrevise", "doc.html"]);
        assert!(matches!(cli.action, ActionArg::Ignore));
        assert!(matches!(cli.tone, ToneArg::Original));
        assert!(!cli.no_highlight);
        assert_eq!(cli.api_timeout, 60);
    }

    #[test]
    fn cli_parses_review_flags() {
        let cli = Cli::parse_from([
            "docrevise",
            "--action",
            "rewrite",
            "--tone",
            "formal",
            "--plural",
            "rules",
            "--no-highlight",
            "doc.html",
            "-o",
            "out.html",
        ]);
        assert!(matches!(cli.action, ActionArg::Rewrite));
        assert!(matches!(cli.tone, ToneArg::Formal));
        assert!(matches!(cli.plural, PluralArg::Rules));
        assert!(cli.no_highlight);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let short = "tutto bene";
        assert_eq!(truncate_message(short, 79), short);

        // Multi-byte text around the cut point must not split a character.
        let long = "è".repeat(100);
        let cut = truncate_message(&long, 79);
        assert_eq!(cut.chars().count(), 80); // 79 kept + ellipsis
        assert!(cut.ends_with('\u{2026}'));

        let ascii_long = "x".repeat(100);
        assert_eq!(truncate_message(&ascii_long, 79).chars().count(), 80);
    }
}
