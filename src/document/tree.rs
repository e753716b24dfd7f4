//! Element tree over serialized content
//!
//! The serialized content is the source of truth. Parsing records, for every
//! element, the byte spans of its start tag, its inner content and its end
//! tag, so a node's serialized content is always `source[inner]` and edits
//! are plain string splices followed by a re-parse.
//!
//! Tokenizing is done with quick-xml in a lenient mode: end tag names are
//! not checked, HTML void elements (`<br>`, `<img>`) are treated as leaves,
//! and an end tag closes every element opened after its match.

use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::DocumentError;

/// HTML elements that never carry content
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Longest character reference we treat as a single token (`&CounterClockwiseContourIntegral;`)
const MAX_REFERENCE_LEN: usize = 32;

/// Handle to an element inside one parse of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the element in document order
    pub fn index(self) -> usize {
        self.0
    }
}

/// An element node
#[derive(Debug, Clone)]
pub struct Element {
    /// Lowercased local name
    pub name: String,
    /// Start tag span (`<p class="x">`)
    pub open: Range<usize>,
    /// Inner content span; empty for void and self-closing elements
    pub inner: Range<usize>,
    /// End tag span, absent for void, self-closing and implicitly closed elements
    pub close: Option<Range<usize>>,
    /// Parent element, `None` for top-level elements
    pub parent: Option<NodeId>,
    /// Element children in document order
    pub children: Vec<NodeId>,
    /// Tokens of the `class` attribute
    pub classes: Vec<String>,
}

/// Where a byte position falls relative to an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// At or beyond the element's outer edges
    Outside,
    /// Strictly inside the start tag
    StartTag,
    /// Between the end of the start tag and the start of the end tag, inclusive
    Content,
    /// Strictly inside the end tag
    EndTag,
}

impl Element {
    /// Span covering start tag, content and end tag
    pub fn outer(&self) -> Range<usize> {
        let end = self.close.as_ref().map_or(self.inner.end, |close| close.end);
        self.open.start..end
    }

    /// Length of the inner serialized content in bytes
    pub fn content_len(&self) -> usize {
        self.inner.len()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Classify a byte position against this element's spans
    pub fn locate(&self, pos: usize) -> Region {
        let outer = self.outer();
        if pos <= outer.start || pos >= outer.end {
            Region::Outside
        } else if pos < self.open.end {
            Region::StartTag
        } else if pos <= self.inner.end {
            Region::Content
        } else {
            Region::EndTag
        }
    }
}

/// A parsed content document
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    elements: Vec<Element>,
    roots: Vec<NodeId>,
    /// Spans a marker must never split: comments, CDATA, processing
    /// instructions, doctype, character references, stray end tags
    opaque: Vec<Range<usize>>,
    revision: u64,
    resource_name: Option<String>,
}

impl Document {
    /// Parse serialized content
    pub fn parse(source: impl Into<String>) -> Result<Self, DocumentError> {
        let source = source.into();
        let tree = TreeBuilder::build(&source)?;

        tracing::debug!(
            elements = tree.elements.len(),
            bytes = source.len(),
            "Parsed content document"
        );

        Ok(Self {
            source,
            elements: tree.elements,
            roots: tree.roots,
            opaque: tree.opaque,
            revision: 0,
            resource_name: None,
        })
    }

    /// Tag the document with the resource it was loaded from
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource_name.as_deref()
    }

    /// The full serialized content
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }

    /// Mutation counter, bumped by every successful [`Document::replace_source`]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of element nodes
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Look up an element
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this revision of the document.
    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id.0]
    }

    /// Top-level elements in document order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// The first top-level element (`<html>` for a full content document)
    pub fn document_element(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    /// The `<body>` element, or the document element for body-less fragments
    pub fn body(&self) -> Option<NodeId> {
        self.elements
            .iter()
            .position(|el| el.name == "body")
            .map(NodeId)
            .or_else(|| self.document_element())
    }

    /// Inner serialized content of an element
    pub fn content(&self, id: NodeId) -> &str {
        &self.source[self.element(id).inner.clone()]
    }

    /// Check whether `ancestor` is a proper ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.element(node).parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.element(id).parent;
        }
        false
    }

    /// All elements carrying `class`, in document order
    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.has_class(class))
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    /// Move a position that falls inside an opaque span to the span's start
    pub fn snap_to_token_boundary(&self, pos: usize) -> usize {
        let idx = self.opaque.partition_point(|span| span.start < pos);
        match idx.checked_sub(1).and_then(|i| self.opaque.get(i)) {
            Some(span) if span.start < pos && pos < span.end => span.start,
            _ => pos,
        }
    }

    /// Replace the serialized content and rebuild the tree
    ///
    /// On failure the document is left untouched. On success every
    /// previously issued [`NodeId`] and descendant index is invalidated.
    pub fn replace_source(&mut self, source: String) -> Result<(), DocumentError> {
        let tree = TreeBuilder::build(&source)?;
        self.source = source;
        self.elements = tree.elements;
        self.roots = tree.roots;
        self.opaque = tree.opaque;
        self.revision += 1;
        Ok(())
    }
}

/// Incremental tree construction from tokenizer events
#[derive(Default)]
struct TreeBuilder {
    elements: Vec<Element>,
    roots: Vec<NodeId>,
    opaque: Vec<Range<usize>>,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    fn build(source: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(source);
        reader.check_end_names(false);

        let mut builder = TreeBuilder::default();
        loop {
            let start = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(source) => {
                    return Err(DocumentError::Malformed {
                        position: reader.buffer_position(),
                        source,
                    })
                }
            };
            let span = start..reader.buffer_position();

            match event {
                Event::Start(e) => {
                    let name = element_name(e.local_name().as_ref());
                    let classes = class_list(&e);
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        builder.leaf(name, classes, span);
                    } else {
                        builder.open(name, classes, span);
                    }
                }
                Event::Empty(e) => {
                    let name = element_name(e.local_name().as_ref());
                    let classes = class_list(&e);
                    builder.leaf(name, classes, span);
                }
                Event::End(e) => {
                    let name = element_name(e.local_name().as_ref());
                    builder.close(&name, span);
                }
                Event::Text(_) => builder.scan_references(source, span),
                Event::Comment(_)
                | Event::CData(_)
                | Event::PI(_)
                | Event::Decl(_)
                | Event::DocType(_) => builder.opaque.push(span),
                Event::Eof => break,
            }
        }

        builder.finish(source.len());
        Ok(builder)
    }

    fn push(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.elements.len());
        match element.parent {
            Some(parent) => self.elements[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        self.elements.push(element);
        id
    }

    fn open(&mut self, name: String, classes: Vec<String>, open: Range<usize>) {
        let id = self.leaf(name, classes, open);
        self.stack.push(id);
    }

    fn leaf(&mut self, name: String, classes: Vec<String>, open: Range<usize>) -> NodeId {
        let parent = self.stack.last().copied();
        self.push(Element {
            name,
            inner: open.end..open.end,
            open,
            close: None,
            parent,
            children: Vec::new(),
            classes,
        })
    }

    fn close(&mut self, name: &str, span: Range<usize>) {
        let Some(depth) = self
            .stack
            .iter()
            .rposition(|id| self.elements[id.0].name == name)
        else {
            // Stray end tag: keep it intact, never descend into it
            self.opaque.push(span);
            return;
        };

        let closing = self.stack.split_off(depth);
        for (i, id) in closing.into_iter().enumerate() {
            let element = &mut self.elements[id.0];
            element.inner.end = span.start;
            if i == 0 {
                element.close = Some(span.clone());
            }
        }
    }

    fn scan_references(&mut self, source: &str, span: Range<usize>) {
        let bytes = source.as_bytes();
        let mut pos = span.start;
        while let Some(rel) = source[pos..span.end].find('&') {
            let amp = pos + rel;
            let tail = &bytes[amp + 1..span.end];
            let name_len = tail
                .iter()
                .take(MAX_REFERENCE_LEN)
                .position(|&b| b == b';');
            match name_len {
                Some(n) if n > 0 && tail[..n].iter().all(|&b| b.is_ascii_alphanumeric() || b == b'#') => {
                    self.opaque.push(amp..amp + n + 2);
                    pos = amp + n + 2;
                }
                _ => pos = amp + 1,
            }
        }
    }

    fn finish(&mut self, len: usize) {
        for id in self.stack.drain(..) {
            self.elements[id.0].inner.end = len;
        }
    }
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn class_list(start: &BytesStart<'_>) -> Vec<String> {
    start
        .html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(b"class"))
        .map(|attr| {
            String::from_utf8_lossy(&attr.value)
                .split_whitespace()
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
