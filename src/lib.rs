//! Los Libros Highlights
//!
//! Overlays user highlights on rendered XHTML chapter content. Highlights
//! arrive as pairs of location references (`chapter1.xhtml#epubcfi(/4/2:5)`);
//! they are resolved against the chapter's element tree and the covered
//! content is wrapped in marker elements that can be stripped again without
//! a trace.

pub mod annotations;
pub mod cfi;
pub mod config;
pub mod document;
pub mod error;
pub mod html;
pub mod reader;
pub mod routes;
pub mod state;
