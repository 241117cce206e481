//! Extraction: document bytes → ordered text blocks plus a format body.
//!
//! This stage is deliberately synchronous: `scraper::Html` is not `Send`,
//! so no parsed document may be held across an await point. The whole
//! extraction is a plain function the orchestrator calls before any I/O.

use crate::error::ReviewError;
use crate::pipeline::input::{DocumentFormat, ResolvedInput};
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild};
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

/// HTML elements whose text becomes a block.
const BLOCK_SELECTOR: &str = "p, span, div, li, a, h5";

/// One text block, in original document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub text: String,
    /// Position in the original full block sequence.
    pub position: usize,
}

/// Format-specific carrier handed to the splicer.
#[derive(Debug, Clone)]
pub enum DocumentBody {
    /// HTML markup (the input itself, or rendered from Markdown).
    Markup(String),
    /// No body beyond the blocks; the splicer rebuilds the document from
    /// the in-order replacement list.
    Paragraphs,
    /// The original PDF bytes, required by the PDF splice strategies.
    Pdf(Vec<u8>),
}

/// Output of the extraction stage.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub format: DocumentFormat,
    pub blocks: Vec<Block>,
    pub body: DocumentBody,
}

/// Extract ordered blocks from a resolved input.
pub fn extract(input: &ResolvedInput) -> Result<ExtractedDocument, ReviewError> {
    let doc = match input.format {
        DocumentFormat::Html => {
            let markup = utf8(&input.bytes, input.format)?;
            ExtractedDocument {
                format: input.format,
                blocks: html_blocks(&markup)?,
                body: DocumentBody::Markup(markup),
            }
        }
        DocumentFormat::Markdown => {
            let md = utf8(&input.bytes, input.format)?;
            // Revised Markdown artifacts are HTML: render first, then apply
            // the HTML rule to the rendered markup.
            let mut markup = String::with_capacity(md.len() * 2);
            pulldown_cmark::html::push_html(&mut markup, pulldown_cmark::Parser::new(&md));
            ExtractedDocument {
                format: input.format,
                blocks: html_blocks(&markup)?,
                body: DocumentBody::Markup(markup),
            }
        }
        DocumentFormat::Docx => ExtractedDocument {
            format: input.format,
            blocks: docx_blocks(&input.bytes)?,
            body: DocumentBody::Paragraphs,
        },
        DocumentFormat::Pdf => ExtractedDocument {
            format: input.format,
            blocks: pdf_blocks(&input.bytes)?,
            body: DocumentBody::Pdf(input.bytes.clone()),
        },
    };
    debug!(
        format = %doc.format,
        blocks = doc.blocks.len(),
        "extraction complete"
    );
    Ok(doc)
}

fn utf8(bytes: &[u8], format: DocumentFormat) -> Result<String, ReviewError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ReviewError::MalformedDocument {
        format,
        detail: "not valid UTF-8".into(),
    })
}

fn html_blocks(markup: &str) -> Result<Vec<Block>, ReviewError> {
    let selector = Selector::parse(BLOCK_SELECTOR)
        .map_err(|e| ReviewError::Internal(format!("block selector: {e:?}")))?;
    let html = Html::parse_document(markup);
    let mut blocks = Vec::new();
    for element in html.select(&selector) {
        let text = element.text().collect::<String>();
        push_block(&mut blocks, &text);
    }
    Ok(blocks)
}

fn docx_blocks(bytes: &[u8]) -> Result<Vec<Block>, ReviewError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ReviewError::MalformedDocument {
        format: DocumentFormat::Docx,
        detail: e.to_string(),
    })?;
    let mut blocks = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                push_block(&mut blocks, &paragraph_text(p));
            }
            DocumentChild::Table(table) => {
                for TableChild::TableRow(row) in &table.rows {
                    for TableRowChild::TableCell(cell) in &row.cells {
                        for content in &cell.children {
                            if let TableCellContent::Paragraph(p) = content {
                                push_block(&mut blocks, &paragraph_text(p));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(blocks)
}

fn paragraph_text(p: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &p.children {
        match child {
            ParagraphChild::Run(run) => collect_run(run, &mut text),
            ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let ParagraphChild::Run(run) = inner {
                        collect_run(run, &mut text);
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn collect_run(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        if let RunChild::Text(t) = child {
            out.push_str(&t.text);
        }
    }
}

fn pdf_blocks(bytes: &[u8]) -> Result<Vec<Block>, ReviewError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
        ReviewError::MalformedDocument {
            format: DocumentFormat::Pdf,
            detail: e.to_string(),
        }
    })?;
    let mut blocks = Vec::new();
    for page in &pages {
        for line in page.lines() {
            push_block(&mut blocks, line);
        }
    }
    Ok(blocks)
}

fn push_block(blocks: &mut Vec<Block>, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }
    blocks.push(Block {
        text: trimmed.to_string(),
        position: blocks.len(),
    });
}
