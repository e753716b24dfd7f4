//! Marker segment planning
//!
//! A highlight interval is given as byte positions inside one element's
//! content. Wrapping it with a single marker pair only stays well-formed
//! when both ends sit at the same nesting level. This module splits an
//! interval into segments that each open and close at one level:
//!
//! ```text
//! <p>Second <em>pa|ra</em> he|re</p>
//!   -> <p>Second <em>pa[ra]</em>[ he]re</p>
//! ```
//!
//! A boundary inside a child's start tag moves before the child, a
//! boundary inside an end tag moves after it.

use std::ops::Range;

use crate::document::{Document, NodeId, Region};

/// Plan segments for `[start, end)` inside `parent`'s content
pub fn plan(doc: &Document, parent: NodeId, start: usize, end: usize, out: &mut Vec<Range<usize>>) {
    let (mut a, mut b) = (start, end);
    if a >= b {
        return;
    }

    if let Some(child) = child_containing(doc, parent, a) {
        let el = doc.element(child);
        match el.locate(a) {
            Region::Content if b <= el.inner.end => {
                plan(doc, child, a, b, out);
                return;
            }
            Region::Content => {
                plan(doc, child, a, el.inner.end, out);
                a = el.outer().end;
            }
            Region::StartTag => a = el.open.start,
            Region::EndTag => a = el.outer().end,
            Region::Outside => {}
        }
    }

    if let Some(child) = child_containing(doc, parent, b) {
        let el = doc.element(child);
        match el.locate(b) {
            Region::Content => {
                plan(doc, child, a.max(el.inner.start), b, out);
                b = el.open.start;
            }
            Region::StartTag => b = el.open.start,
            Region::EndTag => b = el.outer().end,
            Region::Outside => {}
        }
    }

    if a < b {
        out.push(a..b);
    }
}

/// The element child of `parent` whose outer span strictly contains `pos`
fn child_containing(doc: &Document, parent: NodeId, pos: usize) -> Option<NodeId> {
    doc.element(parent)
        .children
        .iter()
        .copied()
        .find(|&child| doc.element(child).locate(pos) != Region::Outside)
}
