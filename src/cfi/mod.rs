//! Location reference (CFI-like) module
//!
//! Parses the serialized range endpoints a reading host attaches to
//! highlights.
//!
//! # Example reference
//!
//! ```text
//! chapter1.xhtml#epubcfi(/4/2/6:10)
//! │              │       │      └── character offset 10
//! │              │       └───────── element steps (even = element)
//! │              └───────────────── scheme token
//! └──────────────────────────────── resource name
//! ```
//!
//! # Usage
//!
//! ```
//! use los_libros_highlights::cfi::parse;
//!
//! let reference = parse("chapter1.xhtml#epubcfi(/4/2/6:10)").unwrap();
//! assert_eq!(reference.path, vec![4, 2, 6]);
//! assert_eq!(reference.offset, 10);
//! ```

mod parser;
mod types;

pub use parser::{parse, try_parse, LocationParseError};
pub use types::{format_path, same_resource, step_to_child_index, LocationReference};
