//! Document error types
//!
//! Errors raised while parsing content, walking step-paths and slicing the
//! descendant index.

use thiserror::Error;

/// Content parsing errors
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The serialized content could not be tokenized
    #[error("Malformed content at byte {position}: {source}")]
    Malformed {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
}

/// Step-path resolution errors
///
/// Resolution is atomic: any failing step discards the whole walk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No element found at path {path}: document is empty")]
    EmptyDocument { path: String },

    #[error("No element found at path {path}: step /{step} is not an element step")]
    OddStep { path: String, step: u32 },

    #[error("No element found at path {path}: step /{step} has no children to descend into")]
    NoChildren { path: String, step: u32 },

    #[error("No element found at path {path}: step /{step} exceeds {available} child elements")]
    OutOfRange {
        path: String,
        step: u32,
        available: usize,
    },
}

/// Range extraction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Element is not part of the descendant index")]
    NotIndexed,

    #[error("Range start follows range end")]
    Reversed,

    #[error("Descendant index was built for revision {index}, document is at revision {document}")]
    StaleIndex { index: u64, document: u64 },

    #[error("Range endpoints live in different resources: {start} and {end}")]
    CrossResource { start: String, end: String },

    #[error("Range collapses to nothing once boundaries move out of markup")]
    Collapsed,

    #[error("Markers would pair with unbalanced <{tag}> tags in the range")]
    UnpairedMarker { tag: String },
}
