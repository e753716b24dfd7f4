//! Highlight request types
//!
//! A highlight is a pair of serialized location references. Annotations
//! are the host-level objects that carry them; they are passed through
//! verbatim.

use serde::{Deserialize, Serialize};

/// A single highlight placement request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Highlight {
    /// Location reference of the first highlighted character
    pub start: String,
    /// Location reference just past the last highlighted character
    pub end: String,
}

impl Highlight {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A user annotation as supplied by the reading host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Host identifier, only echoed back in batch reports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub start_cfi: String,
    pub end_cfi: String,
}

impl Annotation {
    pub fn new(start_cfi: impl Into<String>, end_cfi: impl Into<String>) -> Self {
        Self {
            id: None,
            start_cfi: start_cfi.into(),
            end_cfi: end_cfi.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Label used in logs and reports
    pub fn label(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}..{}", self.start_cfi, self.end_cfi))
    }
}

impl From<&Annotation> for Highlight {
    fn from(annotation: &Annotation) -> Self {
        Highlight::new(annotation.start_cfi.clone(), annotation.end_cfi.clone())
    }
}
