//! Splicing: apply the modification map to the document body.
//!
//! Each format has its own splice rule:
//! * markup bodies get exact-substring replacement (with optional
//!   highlighting),
//! * Word documents are rebuilt from the in-order replacement list,
//! * PDFs go through a named [`PdfSpliceStrategy`].
//!
//! A modification whose original text cannot be located is a matching-miss:
//! it is counted, logged at WARN, and never raised as an error.

use crate::config::PdfStrategy;
use crate::error::ReviewError;
use crate::pipeline::extract::Block;
use docx_rs::{BreakType, Docx, Paragraph, Run};
use std::io::Cursor;
use tracing::warn;

/// Ordered original-text → replacement pairs, built fresh per run and
/// consumed once. Ordering keeps splicing deterministic; every original
/// text is one the filter flagged.
pub type ModificationMap = Vec<(String, String)>;

/// Look up the replacement for an original block text.
pub fn replacement_for<'a>(mods: &'a ModificationMap, original: &str) -> Option<&'a str> {
    mods.iter()
        .find(|(from, _)| from == original)
        .map(|(_, to)| to.as_str())
}

pub const HIGHLIGHT_OPEN: &str = "<mark>";
pub const HIGHLIGHT_CLOSE: &str = "</mark>";

/// Replace each original block text in the markup body.
///
/// Replacement is exact-substring and hits every occurrence, so a short
/// block's text can also match inside a larger block; that over-matching is
/// a known property of the format, not corrected here. Returns the spliced
/// markup and the number of misses.
pub fn splice_markup(markup: &str, mods: &ModificationMap, highlight: bool) -> (String, usize) {
    let mut out = markup.to_string();
    let mut misses = 0usize;
    for (original, replacement) in mods {
        if !out.contains(original.as_str()) {
            warn!(original = %original, "modification text not found in markup");
            misses += 1;
            continue;
        }
        let rendered = if highlight && !replacement.is_empty() {
            format!("{HIGHLIGHT_OPEN}{replacement}{HIGHLIGHT_CLOSE}")
        } else {
            replacement.clone()
        };
        out = out.replace(original.as_str(), &rendered);
    }
    (out, misses)
}

/// The final per-block text lines: each block's replacement when one
/// exists, its original text otherwise. Order preserved.
pub fn final_lines(blocks: &[Block], mods: &ModificationMap) -> Vec<String> {
    blocks
        .iter()
        .map(|b| {
            replacement_for(mods, &b.text)
                .map(|r| r.to_string())
                .unwrap_or_else(|| b.text.clone())
        })
        .collect()
}

/// Build a fresh Word document from the final lines: one paragraph, lines
/// separated by soft breaks. Original styling is not preserved.
pub fn build_docx(lines: &[String]) -> Result<Vec<u8>, ReviewError> {
    let mut paragraph = Paragraph::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            paragraph = paragraph.add_run(Run::new().add_break(BreakType::TextWrapping));
        }
        paragraph = paragraph.add_run(Run::new().add_text(line));
    }
    let mut buffer = Cursor::new(Vec::new());
    Docx::new()
        .add_paragraph(paragraph)
        .build()
        .pack(&mut buffer)
        .map_err(|e| ReviewError::Internal(format!("docx build: {e}")))?;
    Ok(buffer.into_inner())
}

// ── PDF strategies ───────────────────────────────────────────────────────

/// Result of a PDF splice.
#[derive(Debug)]
pub struct SpliceResult {
    pub bytes: Vec<u8>,
    /// Page-level replacements performed.
    pub replaced: usize,
    /// Modifications that could not be located on any page.
    pub misses: usize,
}

/// A named way of producing the revised PDF from the original bytes and
/// the modification map.
pub trait PdfSpliceStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn splice(&self, bytes: &[u8], mods: &ModificationMap) -> Result<SpliceResult, ReviewError>;
}

/// Select the strategy implementation for a configured [`PdfStrategy`].
pub fn pdf_strategy(strategy: PdfStrategy) -> Box<dyn PdfSpliceStrategy> {
    match strategy {
        PdfStrategy::Rewrite => Box::new(RewriteInPlace),
        PdfStrategy::Passthrough => Box::new(Passthrough),
    }
}

/// Rewrite content streams in place: on every page whose extracted text
/// contains an original block string, substitute the replacement text.
pub struct RewriteInPlace;

impl PdfSpliceStrategy for RewriteInPlace {
    fn name(&self) -> &'static str {
        "rewrite"
    }

    fn splice(&self, bytes: &[u8], mods: &ModificationMap) -> Result<SpliceResult, ReviewError> {
        let mut doc =
            lopdf::Document::load_mem(bytes).map_err(|e| ReviewError::MalformedDocument {
                format: crate::pipeline::input::DocumentFormat::Pdf,
                detail: e.to_string(),
            })?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut replaced = 0usize;
        let mut misses = 0usize;
        for (original, replacement) in mods {
            let mut hit = false;
            for &page in &pages {
                let contains = doc
                    .extract_text(&[page])
                    .map(|t| t.contains(original.as_str()))
                    .unwrap_or(false);
                if !contains {
                    continue;
                }
                match doc.replace_text(page, original, replacement) {
                    Ok(()) => {
                        hit = true;
                        replaced += 1;
                    }
                    Err(e) => {
                        warn!(page, error = %e, "content-stream rewrite failed on page");
                    }
                }
            }
            if !hit {
                warn!(original = %original, "modification text not found in any page");
                misses += 1;
            }
        }

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| ReviewError::Internal(format!("pdf save: {e}")))?;
        Ok(SpliceResult {
            bytes: out,
            replaced,
            misses,
        })
    }
}

/// Return the original bytes untouched.
pub struct Passthrough;

impl PdfSpliceStrategy for Passthrough {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn splice(&self, bytes: &[u8], _mods: &ModificationMap) -> Result<SpliceResult, ReviewError> {
        Ok(SpliceResult {
            bytes: bytes.to_vec(),
            replaced: 0,
            misses: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mods(pairs: &[(&str, &str)]) -> ModificationMap {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn markup_splice_replaces_and_highlights() {
        let (out, misses) = splice_markup(
            "<p>Mi chiamo Ilias.</p><p>neutro</p>",
            &mods(&[("Mi chiamo Ilias.", "Presentazione rimossa.")]),
            true,
        );
        assert_eq!(misses, 0);
        assert!(out.contains("<mark>Presentazione rimossa.</mark>"));
        assert!(!out.contains("Ilias"));
        assert!(out.contains("<p>neutro</p>"));
    }

    #[test]
    fn markup_splice_empty_replacement_never_highlighted() {
        let (out, _) = splice_markup("<p>x</p>", &mods(&[("x", "")]), true);
        assert_eq!(out, "<p></p>");
    }

    #[test]
    fn markup_splice_without_highlight_leaves_no_wrapper() {
        let (out, _) = splice_markup("<p>x</p>", &mods(&[("x", "y")]), false);
        assert_eq!(out, "<p>y</p>");
    }

    #[test]
    fn markup_splice_counts_misses() {
        let (out, misses) = splice_markup("<p>a</p>", &mods(&[("assente", "b")]), false);
        assert_eq!(out, "<p>a</p>");
        assert_eq!(misses, 1);
    }

    #[test]
    fn markup_splice_hits_every_occurrence() {
        let (out, misses) = splice_markup("<p>x</p><div>x</div>", &mods(&[("x", "y")]), false);
        assert_eq!(out, "<p>y</p><div>y</div>");
        assert_eq!(misses, 0);
    }

    #[test]
    fn final_lines_substitute_in_order() {
        let blocks = vec![
            Block {
                text: "a".into(),
                position: 0,
            },
            Block {
                text: "b".into(),
                position: 1,
            },
        ];
        let lines = final_lines(&blocks, &mods(&[("b", "B!")]));
        assert_eq!(lines, vec!["a".to_string(), "B!".to_string()]);
    }

    #[test]
    fn passthrough_is_identity() {
        let strategy = pdf_strategy(PdfStrategy::Passthrough);
        let result = strategy
            .splice(b"%PDF-1.4 fake", &mods(&[("a", "b")]))
            .unwrap();
        assert_eq!(result.bytes, b"%PDF-1.4 fake");
        assert_eq!(result.replaced, 0);
        assert_eq!(result.misses, 0);
    }

    #[test]
    fn docx_build_produces_zip_container() {
        let bytes = build_docx(&["prima".to_string(), "seconda".to_string()]).unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
    }
}
