//! Per-upload session cache.
//!
//! Extraction and filtering are deterministic over the upload bytes and the
//! config, so a host that scans a document, shows the flagged blocks, and
//! later reviews the same document can reuse the first pass. The cache is
//! keyed by a content digest of the upload: a different upload (different
//! digest) replaces the cached state entirely.

use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::pipeline::extract::{self, ExtractedDocument};
use crate::pipeline::filter::{self, FlaggedBlock};
use crate::pipeline::input;
use std::sync::Arc;
use tracing::debug;

struct CachedScan {
    digest: String,
    document: Arc<ExtractedDocument>,
    flagged: Arc<Vec<FlaggedBlock>>,
}

/// Holds at most one upload's extraction and filter results.
#[derive(Default)]
pub struct ReviewSession {
    cached: Option<CachedScan>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract and filter the upload, reusing the cached result when the
    /// content digest matches the previous call.
    ///
    /// Only the regex filter path is cached; the classifier path depends on
    /// a live service and goes through [`crate::review::scan_bytes`].
    pub fn scan(
        &mut self,
        bytes: &[u8],
        name: &str,
        config: &ReviewConfig,
    ) -> Result<(Arc<ExtractedDocument>, Arc<Vec<FlaggedBlock>>), ReviewError> {
        let digest = blake3::hash(bytes).to_hex().to_string();
        if let Some(cached) = &self.cached {
            if cached.digest == digest {
                debug!(digest = %digest, "session cache hit");
                return Ok((cached.document.clone(), cached.flagged.clone()));
            }
        }

        let resolved = input::resolve_bytes(bytes.to_vec(), name)?;
        let document = Arc::new(extract::extract(&resolved)?);
        let flagged = Arc::new(filter::filter_blocks(
            &document.blocks,
            &config.patterns,
            config.dedup_blocks,
        ));
        debug!(digest = %digest, flagged = flagged.len(), "session cache filled");
        self.cached = Some(CachedScan {
            digest,
            document: document.clone(),
            flagged: flagged.clone(),
        });
        Ok((document, flagged))
    }

    /// Drop any cached state.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_upload_hits_cache() {
        let mut session = ReviewSession::new();
        let config = ReviewConfig::default();
        let bytes = b"<p>Mi chiamo Ilias.</p>";

        let (doc_a, flagged_a) = session.scan(bytes, "a.html", &config).unwrap();
        let (doc_b, flagged_b) = session.scan(bytes, "a.html", &config).unwrap();
        assert!(Arc::ptr_eq(&doc_a, &doc_b));
        assert!(Arc::ptr_eq(&flagged_a, &flagged_b));
        assert_eq!(flagged_a.len(), 1);
    }

    #[test]
    fn new_upload_replaces_cache() {
        let mut session = ReviewSession::new();
        let config = ReviewConfig::default();

        let (_, first) = session
            .scan(b"<p>Mi chiamo Ilias.</p>", "a.html", &config)
            .unwrap();
        assert_eq!(first.len(), 1);

        let (_, second) = session
            .scan(b"<p>Altro testo neutro.</p>", "b.html", &config)
            .unwrap();
        assert_eq!(second.len(), 0);
    }

    #[test]
    fn invalidate_clears_cache() {
        let mut session = ReviewSession::new();
        let config = ReviewConfig::default();
        let bytes = b"<p>Mi chiamo Ilias.</p>";

        let (doc_a, _) = session.scan(bytes, "a.html", &config).unwrap();
        session.invalidate();
        let (doc_b, _) = session.scan(bytes, "a.html", &config).unwrap();
        assert!(!Arc::ptr_eq(&doc_a, &doc_b));
    }
}
