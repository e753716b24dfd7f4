//! Content document module
//!
//! Provides the element tree the highlight engine works on:
//! - `tree`: serialized content parsed into element spans
//! - `resolver`: step-path to element resolution
//! - `index`: pre-order descendant index and range extraction

mod error;
mod index;
mod resolver;
mod tree;

pub use error::{DocumentError, RangeError, ResolutionError};
pub use index::DescendantIndex;
pub use resolver::{resolve, resolve_from};
pub use tree::{Document, Element, NodeId, Region};
