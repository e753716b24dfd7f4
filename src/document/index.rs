//! Descendant index and range extraction
//!
//! The index is a pre-order flattening of the element tree below the body
//! element. It is the coordinate space for ranges: only membership and
//! relative order matter. An index is tied to the document revision it was
//! built from and refuses to slice a document that has changed since.

use std::collections::HashMap;

use super::error::RangeError;
use super::tree::{Document, NodeId};

/// Pre-order list of element nodes
#[derive(Debug, Clone)]
pub struct DescendantIndex {
    nodes: Vec<NodeId>,
    positions: HashMap<NodeId, usize>,
    revision: u64,
}

impl DescendantIndex {
    /// Index everything below (and including) the body element
    pub fn build(doc: &Document) -> Self {
        match doc.body() {
            Some(body) => Self::build_from(doc, body),
            None => Self::from_nodes(Vec::new(), doc.revision()),
        }
    }

    /// Index the subtree rooted at `root`
    pub fn build_from(doc: &Document, root: NodeId) -> Self {
        let mut nodes = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            nodes.push(node);
            pending.extend(doc.element(node).children.iter().rev().copied());
        }
        Self::from_nodes(nodes, doc.revision())
    }

    fn from_nodes(nodes: Vec<NodeId>, revision: u64) -> Self {
        let positions = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        Self {
            nodes,
            positions,
            revision,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Revision of the document this index was built from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.positions.get(&node).copied()
    }

    /// Check the index still describes `doc`
    pub fn ensure_current(&self, doc: &Document) -> Result<(), RangeError> {
        if self.revision != doc.revision() {
            return Err(RangeError::StaleIndex {
                index: self.revision,
                document: doc.revision(),
            });
        }
        Ok(())
    }

    /// Inclusive slice of the index from `start` through `end`
    pub fn between(&self, doc: &Document, start: NodeId, end: NodeId) -> Result<&[NodeId], RangeError> {
        self.ensure_current(doc)?;
        let from = self.position(start).ok_or(RangeError::NotIndexed)?;
        let to = self.position(end).ok_or(RangeError::NotIndexed)?;
        if from > to {
            return Err(RangeError::Reversed);
        }
        Ok(&self.nodes[from..=to])
    }
}
