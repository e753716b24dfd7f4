//! Step-path resolution
//!
//! Walks element step values down from a root: step `n` selects the element
//! child at `n / 2 - 1`. Text positions (odd steps) cannot be walked.

use super::error::ResolutionError;
use super::tree::{Document, NodeId};
use crate::cfi::{format_path, step_to_child_index};

/// Resolve a step-path starting at the document element
pub fn resolve(doc: &Document, path: &[u32]) -> Result<NodeId, ResolutionError> {
    let root = doc
        .document_element()
        .ok_or_else(|| ResolutionError::EmptyDocument {
            path: format_path(path),
        })?;
    resolve_from(doc, root, path)
}

/// Resolve a step-path starting at `root`
///
/// Either the whole path resolves or nothing does; no partial node is
/// reported.
pub fn resolve_from(doc: &Document, root: NodeId, path: &[u32]) -> Result<NodeId, ResolutionError> {
    path.iter().try_fold(root, |node, &step| {
        let children = &doc.element(node).children;
        let index = step_to_child_index(step).ok_or_else(|| ResolutionError::OddStep {
            path: format_path(path),
            step,
        })?;
        if children.is_empty() {
            return Err(ResolutionError::NoChildren {
                path: format_path(path),
                step,
            });
        }
        children
            .get(index)
            .copied()
            .ok_or_else(|| ResolutionError::OutOfRange {
                path: format_path(path),
                step,
                available: children.len(),
            })
    })
}
