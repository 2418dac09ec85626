//! Source documents fed to the pipeline.

/// Raw document text plus the identifier it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    source: String,
    text: String,
}

impl Document {
    /// Creates a document.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Originating URL or path.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Document text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns `true` if the document has no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
