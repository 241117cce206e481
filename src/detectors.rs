//! The critical-pattern set: the fixed list of detectors that decide which
//! blocks need review.
//!
//! The set is compiled once — either at config construction via
//! [`CriticalPatterns::default`] or from caller-supplied expressions via
//! [`CriticalPatterns::new`] — and passed into the filter stage as part of
//! [`crate::config::ReviewConfig`]. It is never a mutable module-level
//! singleton and is never mutated during a run.
//!
//! A block is *critical* when ANY pattern matches ANY part of its text.
//! All patterns are case-insensitive.

use crate::error::ReviewError;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Built-in detector expressions, in evaluation order.
///
/// Covers the four categories the review targets: named entities,
/// relationship references, organization names, and templated
/// self-introduction / personal-experience phrases.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // Named entities
    r"\bIlias\b",
    r"\bContreas\b",
    // Relationship references
    r"\bmia moglie\b",
    r"\bmio marito\b",
    r"\bmia madre\b",
    r"\bmio padre\b",
    r"\bmio figlio\b",
    r"\bmia figlia\b",
    r"\bmiei genitori\b",
    // Organization names
    r"\bContreas\s+Consulting\b",
    r"\bAcme\s+S\.p\.A\.",
    // Templated phrases: a self-introduction followed by an arbitrary
    // personal clause, birth/age statements, employer statements.
    r"\bmi chiamo\s+\p{L}+",
    r"\bsono nat[oa]\s+(?:a|il|nel)\b",
    r"\bho\s+\d{1,3}\s+anni\b",
    r"\blavoro\s+(?:presso|per|da)\b",
];

static BUILTIN: Lazy<CriticalPatterns> = Lazy::new(|| {
    CriticalPatterns::new(DEFAULT_PATTERNS.iter().copied())
        .expect("built-in detector patterns compile")
});

/// A fixed, ordered, read-only set of compiled detectors.
#[derive(Debug, Clone)]
pub struct CriticalPatterns {
    patterns: Vec<Regex>,
}

impl CriticalPatterns {
    /// Compile a detector set from raw expressions.
    ///
    /// All expressions are compiled case-insensitively. An invalid
    /// expression is a configuration error.
    pub fn new<I, S>(exprs: I) -> Result<Self, ReviewError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for expr in exprs {
            let expr = expr.as_ref();
            let re = RegexBuilder::new(expr)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ReviewError::InvalidConfig(format!("invalid detector pattern '{expr}': {e}"))
                })?;
            patterns.push(re);
        }
        if patterns.is_empty() {
            return Err(ReviewError::InvalidConfig(
                "detector pattern set must not be empty".into(),
            ));
        }
        Ok(Self { patterns })
    }

    /// True when any detector matches any part of `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Number of compiled detectors.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True when the set holds no detectors (cannot happen via `new`).
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for CriticalPatterns {
    /// The built-in set. `Regex` clones share the compiled program, so this
    /// is cheap.
    fn default() -> Self {
        BUILTIN.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_compiles() {
        let p = CriticalPatterns::default();
        assert_eq!(p.len(), DEFAULT_PATTERNS.len());
        assert!(!p.is_empty());
    }

    #[test]
    fn named_entity_match_is_case_insensitive() {
        let p = CriticalPatterns::default();
        assert!(p.matches("Mi chiamo Ilias Contreas."));
        assert!(p.matches("ho parlato con ILIAS ieri"));
        assert!(!p.matches("Altro testo neutro."));
    }

    #[test]
    fn word_boundaries_respected() {
        let p = CriticalPatterns::default();
        // "Iliasson" must not trip the \bIlias\b detector.
        assert!(!p.matches("Il signor Iliasson non c'entra"));
    }

    #[test]
    fn templated_phrases_match() {
        let p = CriticalPatterns::default();
        assert!(p.matches("mi chiamo Marco e mi piace il mare"));
        assert!(p.matches("Sono nato a Torino nel 1980"));
        assert!(p.matches("ho 41 anni"));
        assert!(p.matches("Lavoro presso una banca"));
    }

    #[test]
    fn custom_set_rejects_invalid_expression() {
        let err = CriticalPatterns::new(["(unclosed"]).unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn empty_set_rejected() {
        assert!(CriticalPatterns::new(Vec::<&str>::new()).is_err());
    }
}
