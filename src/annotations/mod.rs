//! Annotation module
//!
//! Host-facing request types: a `Highlight` is one start/end pair of
//! location references, an `Annotation` is the host's record that carries
//! them (`startCfi`/`endCfi`). Persistence lives with the host.

mod types;

pub use types::{Annotation, Highlight};
