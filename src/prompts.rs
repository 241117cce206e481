//! All chat-completion prompt text, centralized.
//!
//! Keeping every prompt in one module makes the service contract auditable
//! and lets tests assert prompt content without reaching into the pipeline.

use crate::config::Tone;

/// System prompt for per-block rewrites.
///
/// The contract with the service: rewrite ONLY the target block, strip
/// personally identifying detail, return exactly one sentence with no
/// commentary or quotation marks.
pub const REWRITE_SYSTEM_PROMPT: &str = r#"You are an expert copy editor revising a single text block inside a larger document.

Rules:
- Rewrite ONLY the target block. The surrounding text is context; never repeat or alter it.
- Remove personal names, family references, employer names, ages, birthplaces and any other personally identifying detail, preserving the block's informational intent.
- Return EXACTLY ONE sentence in the same language as the target block.
- Return the rewritten sentence only: no preamble, no commentary, no quotation marks, no markdown."#;

/// System prompt for the optional criticality classifier.
///
/// The block is presented with no surrounding context by design: the
/// classifier must judge the text in isolation, like the regex detectors do.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You label text blocks for a document review.

A block is "critical" when it contains sensitive personal content: a person's name, a family relationship reference, an employer or organization tied to a person, a self-introduction, an age or birth statement, or similar personally identifying material.

Respond with a single JSON object and nothing else:
{"label": "critical" | "not critical", "rationale": "<one short sentence>"}"#;

/// System prompt for whole-document singular-to-plural conversion.
pub const PLURAL_SYSTEM_PROMPT: &str = r#"You convert a document from first person singular to first person plural.

Rules:
- Convert pronouns, possessives and verb agreement from singular to plural (io -> noi, mio -> nostro, and conjugate verbs accordingly).
- Change nothing else: keep the wording, order, line breaks and markup exactly as given.
- Return the converted document only, with no commentary."#;

/// Tone-specific instruction appended to the rewrite request.
pub fn tone_instruction(tone: Tone) -> &'static str {
    match tone {
        Tone::Original => "Match the tone and register of the surrounding text.",
        Tone::Formal => "Use a formal, polished register suitable for official correspondence.",
        Tone::Informal => "Use a relaxed, conversational register.",
        Tone::Technical => "Use precise, technical language suitable for specialist documentation.",
        Tone::Narrative => "Use a flowing narrative voice, as in literary prose.",
        Tone::Promotional => "Use an upbeat, persuasive marketing register.",
        Tone::Journalistic => "Use a neutral, factual journalistic register.",
    }
}

/// User message for a per-block rewrite: context, target, tone.
pub fn rewrite_instruction(block: &str, prev: &str, next: &str, tone: Tone) -> String {
    format!(
        "Preceding block:\n{prev}\n\nTarget block (rewrite this one):\n{block}\n\nFollowing block:\n{next}\n\nTone: {}",
        tone_instruction(tone)
    )
}

/// User message for the classifier: the bare block text.
pub fn classifier_instruction(text: &str) -> String {
    format!("Block:\n{text}")
}

/// User message for the model-based plural conversion.
pub fn plural_instruction(text: &str) -> String {
    format!("Document:\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_prompt_demands_single_sentence() {
        assert!(REWRITE_SYSTEM_PROMPT.contains("EXACTLY ONE sentence"));
        assert!(REWRITE_SYSTEM_PROMPT.contains("personally identifying"));
    }

    #[test]
    fn classifier_prompt_demands_json() {
        assert!(CLASSIFIER_SYSTEM_PROMPT.contains(r#""label""#));
        assert!(CLASSIFIER_SYSTEM_PROMPT.contains("not critical"));
    }

    #[test]
    fn tone_instructions_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for tone in Tone::ALL {
            assert!(seen.insert(tone_instruction(tone)), "duplicate for {tone:?}");
        }
    }

    #[test]
    fn rewrite_instruction_carries_context_and_target() {
        let msg = rewrite_instruction("target here", "before", "after", Tone::Formal);
        assert!(msg.contains("target here"));
        assert!(msg.contains("before"));
        assert!(msg.contains("after"));
        assert!(msg.contains("formal"));
    }
}
