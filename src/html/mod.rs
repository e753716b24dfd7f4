//! Highlight overlay module
//!
//! - `segments`: splits a byte interval into well-formed marker segments
//! - `highlight_injector`: placement, removal and batch application

mod highlight_injector;
mod segments;

pub use highlight_injector::{
    inject_highlights, strip_highlights, BatchReport, FailedHighlight, HighlightConfig,
    HighlightEngine, HighlightError, InjectionResult, PlacedHighlight,
};
