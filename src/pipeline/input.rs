//! Input resolution: turn a path, URL or raw upload into bytes plus a
//! declared document format.

use crate::error::ReviewError;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Supported document formats, declared by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Html,
    Markdown,
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Resolve a format from a filename extension.
    pub fn from_extension(name: &str) -> Result<Self, ReviewError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "html" | "htm" => Ok(Self::Html),
            "md" | "markdown" => Ok(Self::Markdown),
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ReviewError::UnsupportedExtension { name: name.into() }),
        }
    }

    /// MIME type of the revised artifact this format produces.
    ///
    /// Markdown input yields an HTML artifact (the markup body is the
    /// rendered HTML), so it shares the HTML MIME type.
    pub fn artifact_mime(self) -> &'static str {
        match self {
            Self::Html | Self::Markdown => "text/html",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Pdf => "application/pdf",
        }
    }

    /// Filename extension of the revised artifact.
    pub fn artifact_extension(self) -> &'static str {
        match self {
            Self::Html | Self::Markdown => "html",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Html => "HTML",
            Self::Markdown => "Markdown",
            Self::Docx => "Word",
            Self::Pdf => "PDF",
        };
        f.write_str(s)
    }
}

/// An input reduced to bytes plus its declared format.
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    pub bytes: Vec<u8>,
    /// Original filename (URL tail for downloads), used for the artifact
    /// filename stem.
    pub name: String,
    pub format: DocumentFormat,
}

/// True when the input string looks like an HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a path or URL into bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, ReviewError> {
    if is_url(input) {
        download(input, timeout_secs).await
    } else {
        read_file(input).await
    }
}

/// Validate raw upload bytes against the format declared by `name`.
///
/// Magic-byte checks catch the common mislabeling cases early, before the
/// extractor produces a confusing parser error.
pub fn resolve_bytes(bytes: Vec<u8>, name: &str) -> Result<ResolvedInput, ReviewError> {
    let format = DocumentFormat::from_extension(name)?;
    match format {
        DocumentFormat::Pdf => {
            if !bytes.starts_with(b"%PDF") {
                return Err(ReviewError::MalformedDocument {
                    format,
                    detail: "missing %PDF header".into(),
                });
            }
        }
        DocumentFormat::Docx => {
            // docx is a zip container
            if !bytes.starts_with(b"PK\x03\x04") {
                return Err(ReviewError::MalformedDocument {
                    format,
                    detail: "not a ZIP container".into(),
                });
            }
        }
        DocumentFormat::Html | DocumentFormat::Markdown => {
            if std::str::from_utf8(&bytes).is_err() {
                return Err(ReviewError::MalformedDocument {
                    format,
                    detail: "not valid UTF-8".into(),
                });
            }
        }
    }
    Ok(ResolvedInput {
        bytes,
        name: name.to_string(),
        format,
    })
}

async fn read_file(path: &str) -> Result<ResolvedInput, ReviewError> {
    let p = Path::new(path);
    let bytes = tokio::fs::read(p).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReviewError::FileNotFound { path: p.into() },
        std::io::ErrorKind::PermissionDenied => ReviewError::PermissionDenied { path: p.into() },
        _ => ReviewError::InvalidInput {
            input: path.to_string(),
        },
    })?;
    let name = p
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_string();
    debug!(path, size = bytes.len(), "read input file");
    resolve_bytes(bytes, &name)
}

async fn download(url: &str, timeout_secs: u64) -> Result<ResolvedInput, ReviewError> {
    info!(url, "downloading document");
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ReviewError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReviewError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ReviewError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ReviewError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ReviewError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    let name = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("download")
        .split('?')
        .next()
        .unwrap_or("download")
        .to_string();
    info!(url, size = bytes.len(), "download complete");
    resolve_bytes(bytes, &name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch() {
        assert_eq!(
            DocumentFormat::from_extension("a.HTML").unwrap(),
            DocumentFormat::Html
        );
        assert_eq!(
            DocumentFormat::from_extension("notes.md").unwrap(),
            DocumentFormat::Markdown
        );
        assert_eq!(
            DocumentFormat::from_extension("cv.docx").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(
            DocumentFormat::from_extension("x.pdf").unwrap(),
            DocumentFormat::Pdf
        );
        assert!(DocumentFormat::from_extension("x.rtf").is_err());
        assert!(DocumentFormat::from_extension("noext").is_err());
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/a.html"));
        assert!(is_url("http://example.com/a.pdf"));
        assert!(!is_url("/tmp/a.html"));
        assert!(!is_url("ftp://example.com/a.html"));
    }

    #[test]
    fn magic_byte_validation() {
        assert!(resolve_bytes(b"%PDF-1.7 ...".to_vec(), "a.pdf").is_ok());
        assert!(resolve_bytes(b"not a pdf".to_vec(), "a.pdf").is_err());
        assert!(resolve_bytes(b"PK\x03\x04...".to_vec(), "a.docx").is_ok());
        assert!(resolve_bytes(b"plain".to_vec(), "a.docx").is_err());
        assert!(resolve_bytes(b"<p>ok</p>".to_vec(), "a.html").is_ok());
        assert!(resolve_bytes(vec![0xff, 0xfe, 0x00], "a.html").is_err());
    }

    #[test]
    fn artifact_metadata() {
        assert_eq!(DocumentFormat::Markdown.artifact_mime(), "text/html");
        assert_eq!(DocumentFormat::Markdown.artifact_extension(), "html");
        assert_eq!(DocumentFormat::Pdf.artifact_mime(), "application/pdf");
    }
}
