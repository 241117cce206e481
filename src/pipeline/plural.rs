//! Whole-document singular-to-plural conversion.
//!
//! Two modes:
//! * [`pluralize_rules`] — deterministic, case-preserving substitution of
//!   Italian first-person-singular pronouns and possessives. Verbs are NOT
//!   conjugated: "Io vado" becomes "Noi vado". This matches the fixed rule
//!   set the conversion is defined by; full agreement needs the model mode.
//! * [`pluralize_model`] — one chat call rewriting the whole text.

use crate::config::ReviewConfig;
use crate::error::BlockError;
use crate::prompts;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

// Longer alternatives first so "miei" wins over "mie" and "mio".
static RE_FIRST_SINGULAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(miei|mie|mio|mia|io|mi|me)\b").expect("plural rule regex compiles")
});

fn plural_form(lower: &str) -> Option<&'static str> {
    match lower {
        "io" => Some("noi"),
        "mi" => Some("ci"),
        "me" => Some("noi"),
        "mio" => Some("nostro"),
        "mia" => Some("nostra"),
        "miei" => Some("nostri"),
        "mie" => Some("nostre"),
        _ => None,
    }
}

/// Mirror the case shape of `source` onto `replacement`.
fn match_case(source: &str, replacement: &str) -> String {
    if source.chars().all(|c| c.is_uppercase()) && source.len() > 1 {
        return replacement.to_uppercase();
    }
    if source.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// Rule-based conversion: substitute pronouns/possessives, preserve case,
/// leave everything else (verbs included) untouched.
pub fn pluralize_rules(text: &str) -> String {
    RE_FIRST_SINGULAR
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let matched = &caps[1];
            match plural_form(&matched.to_lowercase()) {
                Some(plural) => match_case(matched, plural),
                None => matched.to_string(),
            }
        })
        .into_owned()
}

/// Result of a model-based conversion.
pub struct PluralOutcome {
    pub text: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Model-based conversion: one chat call over the whole text, bounded by
/// the request timeout, no retries. A failure leaves the artifact
/// unconverted; the caller surfaces the error.
pub async fn pluralize_model(
    provider: &Arc<dyn LLMProvider>,
    text: &str,
    config: &ReviewConfig,
) -> Result<PluralOutcome, BlockError> {
    const KEY: &str = "plural-conversion";
    let messages = vec![
        ChatMessage::system(prompts::PLURAL_SYSTEM_PROMPT),
        ChatMessage::user(prompts::plural_instruction(text)),
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
            key: KEY.into(),
            secs: config.api_timeout_secs,
        })?
        .map_err(|e| BlockError::RewriteFailed {
            key: KEY.into(),
            detail: e.to_string(),
        })?;

    let converted = response.content.trim().to_string();
    if converted.is_empty() {
        return Err(BlockError::EmptyCompletion { key: KEY.into() });
    }
    Ok(PluralOutcome {
        text: converted,
        input_tokens: response.prompt_tokens as usize,
        output_tokens: response.completion_tokens as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronouns_and_possessives_converted() {
        assert_eq!(
            pluralize_rules("Io vado a casa con mia moglie"),
            "Noi vado a casa con nostra moglie"
        );
    }

    #[test]
    fn verbs_intentionally_untouched() {
        // The rule set substitutes words, it does not conjugate.
        let out = pluralize_rules("Io vado al lavoro");
        assert!(out.starts_with("Noi vado"));
    }

    #[test]
    fn all_forms_converted() {
        assert_eq!(
            pluralize_rules("io, mi, me, mio, mia, miei, mie"),
            "noi, ci, noi, nostro, nostra, nostri, nostre"
        );
    }

    #[test]
    fn case_preserved() {
        assert_eq!(pluralize_rules("Mio padre"), "Nostro padre");
        assert_eq!(pluralize_rules("MIO PADRE"), "NOSTRO PADRE");
        assert_eq!(pluralize_rules("Io"), "Noi");
    }

    #[test]
    fn word_boundaries_respected() {
        // "mio" inside "premio" or "mi" inside "domani" must not convert.
        assert_eq!(pluralize_rules("il premio di domani"), "il premio di domani");
        assert_eq!(pluralize_rules("Milano rimane Milano"), "Milano rimane Milano");
    }

    #[test]
    fn text_without_singular_forms_unchanged() {
        let text = "Altro testo neutro.";
        assert_eq!(pluralize_rules(text), text);
    }
}
