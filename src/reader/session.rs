//! Reader session
//!
//! One rendered content document plus the engine that overlays highlights on
//! it. Nothing can be placed or removed until the host signals that content
//! has finished loading.

use serde::Serialize;

use crate::annotations::{Annotation, Highlight};
use crate::document::Document;
use crate::html::{BatchReport, HighlightConfig, HighlightEngine, HighlightError, PlacedHighlight};

/// A single loaded content document
#[derive(Debug, Clone)]
pub struct ReaderSession {
    name: String,
    engine: HighlightEngine,
    document: Option<Document>,
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub name: String,
    pub content: String,
    pub revision: u64,
}

impl ReaderSession {
    /// Create a session for the named resource; content is loaded separately
    pub fn new(name: impl Into<String>, config: HighlightConfig) -> Self {
        Self {
            name: name.into(),
            engine: HighlightEngine::new(config),
            document: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Content-loaded signal
    ///
    /// Parses the content and opens the session for highlight calls. Loading
    /// again replaces the document. Malformed content leaves the session as
    /// it was.
    pub fn content_loaded(&mut self, content: impl Into<String>) -> Result<(), HighlightError> {
        let document = Document::parse(content)?.with_resource_name(self.name.clone());
        tracing::info!(
            resource = %self.name,
            elements = document.len(),
            "Content loaded"
        );
        self.document = Some(document);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.document.is_some()
    }

    /// Current serialized content, markers included
    pub fn content(&self) -> Option<&str> {
        self.document.as_ref().map(Document::source)
    }

    pub fn revision(&self) -> Option<u64> {
        self.document.as_ref().map(Document::revision)
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.document.as_ref().map(|doc| SessionSnapshot {
            name: self.name.clone(),
            content: doc.source().to_string(),
            revision: doc.revision(),
        })
    }

    pub fn place_highlight(&mut self, highlight: &Highlight) -> Result<PlacedHighlight, HighlightError> {
        let (engine, doc) = self.ready()?;
        engine.place(doc, highlight)
    }

    pub fn remove_highlights(&mut self) -> Result<usize, HighlightError> {
        let (engine, doc) = self.ready()?;
        engine.remove(doc)
    }

    /// Replace every highlight with the given annotations
    pub fn apply_annotations(&mut self, annotations: &[Annotation]) -> Result<BatchReport, HighlightError> {
        let (engine, doc) = self.ready()?;
        Ok(engine.apply(doc, annotations))
    }

    fn ready(&mut self) -> Result<(&HighlightEngine, &mut Document), HighlightError> {
        let Some(doc) = self.document.as_mut() else {
            tracing::warn!(resource = %self.name, "Highlight call before content loaded");
            return Err(HighlightError::NotReady);
        };
        Ok((&self.engine, doc))
    }
}
