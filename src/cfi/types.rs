//! Location reference types
//!
//! A location reference names a point inside a rendered content document:
//! `chapter1.xhtml#epubcfi(/4/2/6:10)`.
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use serde::{Deserialize, Serialize};
use std::fmt;

/// A parsed location reference
///
/// # Step values
///
/// CFI step values count child nodes 1-based, with element children on even
/// values (`/2` is the first element child, `/4` the second, ...) and the
/// text runs between them on odd values. Only element steps can be walked,
/// so the parser drops `0` and `1` and keeps everything `> 1`. A retained
/// odd value (`/3`, `/5`) parses fine but fails to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReference {
    /// Containing resource (usually the spine item href)
    pub resource_name: String,
    /// Addressing scheme token, carried through unchanged
    pub scheme: String,
    /// The step-path as written, kept for diagnostics
    pub raw_path: String,
    /// Element step values, in descent order
    pub path: Vec<u32>,
    /// Character offset into the resolved node's serialized content
    pub offset: usize,
}

impl LocationReference {
    /// Check whether this reference points at the document element itself
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Zero-based child index for each step (`/2` -> 0, `/4` -> 1, ...)
    ///
    /// Returns `None` for a step that is not an even element step.
    pub fn child_indices(&self) -> Vec<Option<usize>> {
        self.path.iter().map(|&step| step_to_child_index(step)).collect()
    }

    /// Check whether this reference lives in the given resource
    ///
    /// Hrefs are compared on their final path segment so that
    /// `OEBPS/ch1.xhtml` and `ch1.xhtml` refer to the same document.
    pub fn is_in_resource(&self, resource_name: &str) -> bool {
        same_resource(&self.resource_name, resource_name)
    }
}

/// Convert a CFI element step to a zero-based child index
pub fn step_to_child_index(step: u32) -> Option<usize> {
    if step < 2 || step % 2 != 0 {
        return None;
    }
    usize::try_from(step / 2 - 1).ok()
}

/// Render step values the way they appear in a reference (`/4/2/6`)
pub fn format_path(path: &[u32]) -> String {
    path.iter().map(|step| format!("/{}", step)).collect()
}

/// Compare two resource hrefs on their final path segment
pub fn same_resource(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let tail = |href: &str| href.rsplit('/').next().unwrap_or(href).to_string();
    tail(a) == tail(b)
}

impl fmt::Display for LocationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({}:{})",
            self.resource_name, self.scheme, self.raw_path, self.offset
        )
    }
}
