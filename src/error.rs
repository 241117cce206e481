//! Error types for the docrevise library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReviewError`] — **Fatal to the run**: the pipeline cannot produce an
//!   artifact at all (unreadable upload, unsupported extension, missing
//!   provider credential). Returned as `Err(ReviewError)` from the top-level
//!   `scan*` / `review*` functions. Never fatal to the hosting process: the
//!   caller reports it and keeps serving further uploads.
//!
//! * [`BlockError`] — **Non-fatal**: a single block's rewrite failed
//!   (transport error, timeout, empty completion) but every other block's
//!   disposition still proceeds. Stored inside
//!   [`crate::output::BlockOutcome`] and surfaced to the reader as a visible
//!   error-marker replacement, never as a silent fallback to the original
//!   text.

use crate::pipeline::input::DocumentFormat;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docrevise library.
///
/// Block-level failures use [`BlockError`] and are stored in
/// [`crate::output::BlockOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file extension is not one of html, htm, md, docx, pdf.
    #[error("Unsupported document type: '{name}'\nSupported extensions: .html, .htm, .md, .docx, .pdf")]
    UnsupportedExtension { name: String },

    /// The upload declared a supported format but could not be parsed as it.
    #[error("Cannot read {format} document: {detail}")]
    MalformedDocument {
        format: DocumentFormat,
        detail: String,
    },

    // ── Configuration errors ──────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    /// The pipeline does not run until this is resolved.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder or plan validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the revised artifact file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single block (or the whole-document plural pass).
///
/// Stored alongside [`crate::output::BlockOutcome`] when a chat call fails.
/// The overall review continues; the affected block carries an error-marker
/// replacement so an incomplete revision is visible to the reader.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum BlockError {
    /// Chat call failed (transport error or malformed response).
    #[error("Block {key}: rewrite failed: {detail}")]
    RewriteFailed { key: String, detail: String },

    /// Chat call exceeded the configured request timeout.
    #[error("Block {key}: rewrite timed out after {secs}s")]
    Timeout { key: String, secs: u64 },

    /// Chat call returned an empty or whitespace-only completion.
    #[error("Block {key}: rewrite returned an empty completion")]
    EmptyCompletion { key: String },
}

impl BlockError {
    /// Short detail string used when building the visible error marker.
    pub fn detail(&self) -> String {
        match self {
            BlockError::RewriteFailed { detail, .. } => detail.clone(),
            BlockError::Timeout { secs, .. } => format!("timed out after {secs}s"),
            BlockError::EmptyCompletion { .. } => "empty completion".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_display() {
        let e = ReviewError::UnsupportedExtension {
            name: "notes.rtf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.rtf"), "got: {msg}");
        assert!(msg.contains(".docx"));
    }

    #[test]
    fn malformed_document_display() {
        let e = ReviewError::MalformedDocument {
            format: DocumentFormat::Pdf,
            detail: "bad xref".into(),
        };
        assert!(e.to_string().contains("PDF"));
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn block_timeout_detail() {
        let e = BlockError::Timeout {
            key: "0_x".into(),
            secs: 60,
        };
        assert!(e.detail().contains("60s"));
        assert!(e.to_string().contains("0_x"));
    }
}
