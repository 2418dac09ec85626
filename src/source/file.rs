//! Local file document source.

use std::path::PathBuf;

use async_trait::async_trait;

use super::{DocumentSource, extract_script_body};
use crate::core::Document;
use crate::error::SourceError;

/// Reads documents from the local filesystem.
///
/// Saved script archive pages are trimmed to their script body the same
/// way fetched pages are.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDocumentSource;

#[async_trait]
impl DocumentSource for FileDocumentSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, locator: &str) -> Result<Document, SourceError> {
        let path = PathBuf::from(locator);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
        let text = extract_script_body(&raw).unwrap_or(&raw).to_string();
        Ok(Document::new(path.display().to_string(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_fetch_reads_file() {
        let file = NamedTempFile::new().unwrap_or_else(|e| unreachable!("{e}"));
        std::fs::write(file.path(), "FADE IN:").unwrap_or_else(|e| unreachable!("{e}"));
        let locator = file.path().display().to_string();

        let doc = FileDocumentSource
            .fetch(&locator)
            .await
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(doc.text(), "FADE IN:");
        assert_eq!(doc.source(), locator);
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let result = FileDocumentSource.fetch("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }

    #[test]
    fn test_check_rejects_empty() {
        assert!(FileDocumentSource.check("  ").is_err());
    }
}
