//! Highlight injection
//!
//! Places highlight markers into a content document from a pair of location
//! references, and strips them again.
//!
//! Placement:
//! 1. Parse both references
//! 2. Resolve both step-paths from the document element
//! 3. Slice the descendant index from start to end, inclusive
//! 4. Wrap the first node from the start offset, every interior node
//!    completely and the last node up to the end offset
//!
//! Markers are inserted by splicing the serialized content, so removing
//! them restores the original bytes exactly. Paths and offsets always
//! address the content as if no markers were present: existing marker tags
//! are cut out before resolving and spliced back with the new ones.
//!
//! A placement whose markers would not pair with their own end tags (lenient
//! markup with unclosed or stray tags of the marker's name) is refused.
//! Overlapping highlights are not supported.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::segments;
use crate::annotations::{Annotation, Highlight};
use crate::cfi::{self, LocationParseError, LocationReference};
use crate::document::{
    resolve, DescendantIndex, Document, DocumentError, NodeId, RangeError, ResolutionError,
};

/// Configuration for highlight markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// Class that identifies marker elements
    pub marker_class: String,
    /// Element name used for markers
    pub marker_tag: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            marker_class: "readiumCSS-yellow-highlight".to_string(),
            marker_tag: "span".to_string(),
        }
    }
}

impl HighlightConfig {
    pub fn start_marker(&self) -> String {
        format!("<{} class=\"{}\">", self.marker_tag, self.marker_class)
    }

    pub fn end_marker(&self) -> String {
        format!("</{}>", self.marker_tag)
    }
}

/// Why a highlight could not be placed or removed
#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("Content has not finished loading")]
    NotReady,

    #[error(transparent)]
    Parse(#[from] LocationParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Reference {reference} does not belong to resource {resource}")]
    ResourceMismatch { reference: String, resource: String },
}

impl HighlightError {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            HighlightError::NotReady => "not_ready",
            HighlightError::Parse(_) => "parse_error",
            HighlightError::Resolution(_) => "resolution_error",
            HighlightError::Range(_) => "range_error",
            HighlightError::Document(_) => "document_error",
            HighlightError::ResourceMismatch { .. } => "resource_mismatch",
        }
    }
}

/// A successfully placed highlight
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedHighlight {
    pub start: LocationReference,
    pub end: LocationReference,
    /// Elements spanned by the range, including skipped descendants
    pub nodes: usize,
    /// Marker elements inserted
    pub markers: usize,
    /// Document revision after placement
    pub revision: u64,
}

/// A highlight that was skipped during a batch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedHighlight {
    pub annotation: String,
    pub kind: &'static str,
    pub message: String,
}

/// Outcome of clearing and re-applying a set of annotations
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Markers removed before placing
    pub removed: usize,
    /// Highlights placed
    pub placed: usize,
    pub failed: Vec<FailedHighlight>,
    pub revision: u64,
}

/// Places and removes highlight markers
#[derive(Debug, Clone, Default)]
pub struct HighlightEngine {
    config: HighlightConfig,
}

impl HighlightEngine {
    pub fn new(config: HighlightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    /// Wrap the content between two location references in markers
    ///
    /// Failures are logged and returned; the document is only modified when
    /// placement succeeds.
    pub fn place(
        &self,
        doc: &mut Document,
        highlight: &Highlight,
    ) -> Result<PlacedHighlight, HighlightError> {
        let result = self.try_place(doc, highlight);
        if let Err(e) = &result {
            tracing::warn!(
                start = %highlight.start,
                end = %highlight.end,
                kind = e.kind(),
                "Highlight not placed: {}",
                e
            );
        }
        result
    }

    fn try_place(
        &self,
        doc: &mut Document,
        highlight: &Highlight,
    ) -> Result<PlacedHighlight, HighlightError> {
        let start = cfi::parse(&highlight.start)?;
        let end = cfi::parse(&highlight.end)?;
        check_resources(doc, &start, &end)?;

        // References address the content without markers
        let cuts = self.marker_cuts(doc);
        let unmarked;
        let base = if cuts.is_empty() {
            &*doc
        } else {
            unmarked = Document::parse(cut_spans(doc.source(), &cuts).0)?;
            &unmarked
        };

        let start_node = resolve(base, &start.path)?;
        let end_node = resolve(base, &end.path)?;

        let index = DescendantIndex::build(base);
        let range = index.between(base, start_node, end_node)?;
        let plan = plan_range(base, range, &start, &end)?;
        let nodes = range.len();

        if !plan.is_empty() {
            let existing = reinsertions(doc.source(), &cuts);
            let spliced = self.insert_markers(base.source(), &plan, &existing);
            let candidate = Document::parse(spliced)?;
            if cut_spans(candidate.source(), &self.marker_cuts(&candidate)).0 != base.source() {
                return Err(RangeError::UnpairedMarker {
                    tag: self.config.marker_tag.clone(),
                }
                .into());
            }
            doc.replace_source(candidate.into_source())?;
        }

        tracing::debug!(
            start = %start,
            end = %end,
            nodes,
            markers = plan.len(),
            "Placed highlight"
        );

        Ok(PlacedHighlight {
            nodes,
            markers: plan.len(),
            revision: doc.revision(),
            start,
            end,
        })
    }

    /// Unwrap every marker element, keeping its content
    ///
    /// Returns the number of markers removed. A document without markers is
    /// left untouched.
    pub fn remove(&self, doc: &mut Document) -> Result<usize, HighlightError> {
        let markers = doc.find_by_class(&self.config.marker_class).len();
        if markers == 0 {
            return Ok(0);
        }

        let (stripped, _) = cut_spans(doc.source(), &self.marker_cuts(doc));
        if let Err(e) = doc.replace_source(stripped) {
            tracing::error!("Failed to remove highlights: {}", e);
            return Err(e.into());
        }

        tracing::debug!(removed = markers, "Removed highlights");
        Ok(markers)
    }

    /// Start and end tag spans of every marker, in source order
    fn marker_cuts(&self, doc: &Document) -> Vec<Range<usize>> {
        let mut cuts: Vec<Range<usize>> = doc
            .find_by_class(&self.config.marker_class)
            .into_iter()
            .flat_map(|id| {
                let el = doc.element(id);
                std::iter::once(el.open.clone()).chain(el.close.clone())
            })
            .collect();
        cuts.sort_by_key(|cut| cut.start);
        cuts
    }

    /// Clear all markers, then place each annotation in order
    ///
    /// A failing annotation is logged and skipped; the rest still apply.
    pub fn apply(&self, doc: &mut Document, annotations: &[Annotation]) -> BatchReport {
        let removed = self.remove(doc).unwrap_or_else(|e| {
            tracing::warn!("Could not clear highlights before batch: {}", e);
            0
        });

        let mut report = BatchReport {
            removed,
            ..BatchReport::default()
        };

        for annotation in annotations {
            match self.place(doc, &Highlight::from(annotation)) {
                Ok(_) => report.placed += 1,
                Err(e) => report.failed.push(FailedHighlight {
                    annotation: annotation.label(),
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }

        report.revision = doc.revision();
        tracing::info!(
            placed = report.placed,
            failed = report.failed.len(),
            "Applied annotations"
        );
        report
    }

    /// Splice new marker pairs and previously cut marker tags into `source`
    fn insert_markers(
        &self,
        source: &str,
        plan: &[Range<usize>],
        existing: &[(usize, &str)],
    ) -> String {
        let start_marker = self.config.start_marker();
        let end_marker = self.config.end_marker();

        // At a shared position: new end markers, then existing tags in their
        // original order, then new start markers
        let mut inserts: Vec<(usize, u8, usize, &str)> = existing
            .iter()
            .enumerate()
            .map(|(seq, &(pos, tag))| (pos, 1, seq, tag))
            .collect();
        for segment in plan {
            inserts.push((segment.start, 2, 0, start_marker.as_str()));
            inserts.push((segment.end, 0, 0, end_marker.as_str()));
        }
        inserts.sort();

        let extra: usize = inserts.iter().map(|insert| insert.3.len()).sum();
        let mut out = String::with_capacity(source.len() + extra);
        let mut last = 0;
        for (pos, _, _, text) in inserts {
            out.push_str(&source[last..pos]);
            out.push_str(text);
            last = pos;
        }
        out.push_str(&source[last..]);
        out
    }
}

/// Result of stateless highlight injection
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionResult {
    /// The processed content with highlight markers
    pub html: String,
    /// Number of highlights successfully injected
    pub injected_count: usize,
    /// Annotations that couldn't be resolved
    pub failed_annotations: Vec<FailedHighlight>,
}

/// Inject highlight markers into serialized content
///
/// Existing markers are cleared first, so re-injecting the same set is
/// stable.
pub fn inject_highlights(
    html: &str,
    annotations: &[Annotation],
    config: &HighlightConfig,
) -> Result<InjectionResult, DocumentError> {
    let mut doc = Document::parse(html)?;
    let report = HighlightEngine::new(config.clone()).apply(&mut doc, annotations);

    Ok(InjectionResult {
        html: doc.into_source(),
        injected_count: report.placed,
        failed_annotations: report.failed,
    })
}

/// Strip every highlight marker from serialized content
pub fn strip_highlights(html: &str, config: &HighlightConfig) -> Result<String, HighlightError> {
    let mut doc = Document::parse(html)?;
    HighlightEngine::new(config.clone()).remove(&mut doc)?;
    Ok(doc.into_source())
}

fn check_resources(
    doc: &Document,
    start: &LocationReference,
    end: &LocationReference,
) -> Result<(), HighlightError> {
    if !cfi::same_resource(&start.resource_name, &end.resource_name) {
        return Err(RangeError::CrossResource {
            start: start.resource_name.clone(),
            end: end.resource_name.clone(),
        }
        .into());
    }
    if let Some(resource) = doc.resource_name() {
        if !start.is_in_resource(resource) {
            return Err(HighlightError::ResourceMismatch {
                reference: start.to_string(),
                resource: resource.to_string(),
            });
        }
    }
    Ok(())
}

/// Remove `cuts` from `source`
///
/// Also returns where each cut sat in the resulting string.
fn cut_spans(source: &str, cuts: &[Range<usize>]) -> (String, Vec<usize>) {
    let mut out = String::with_capacity(source.len());
    let mut positions = Vec::with_capacity(cuts.len());
    let mut last = 0;
    for cut in cuts {
        out.push_str(&source[last..cut.start]);
        positions.push(out.len());
        last = cut.end;
    }
    out.push_str(&source[last..]);
    (out, positions)
}

/// Cut marker tags paired with their position in the marker-free source
fn reinsertions<'a>(source: &'a str, cuts: &[Range<usize>]) -> Vec<(usize, &'a str)> {
    let (_, positions) = cut_spans(source, cuts);
    positions
        .into_iter()
        .zip(cuts)
        .map(|(pos, cut)| (pos, &source[cut.clone()]))
        .collect()
}

/// Byte position of a UTF-16 offset inside a node's content
///
/// Reading hosts measure content in UTF-16 code units. An offset that
/// splits a surrogate pair moves before the character; offsets past the
/// end clamp to it.
fn content_point(doc: &Document, node: NodeId, offset: usize) -> usize {
    let content = doc.content(node);
    let mut units = 0;
    let byte = content
        .char_indices()
        .find(|&(_, c)| {
            units += c.len_utf16();
            units > offset
        })
        .map_or(content.len(), |(i, _)| i);
    doc.element(node).inner.start + byte
}

/// Turn a node range into well-formed marker segments
///
/// Descendants of a node that is already being wrapped are skipped, and a
/// wrapped ancestor of the end node stops at the end point.
fn plan_range(
    doc: &Document,
    range: &[NodeId],
    start: &LocationReference,
    end: &LocationReference,
) -> Result<Vec<Range<usize>>, RangeError> {
    let (Some(&first), Some(&last)) = (range.first(), range.last()) else {
        return Ok(Vec::new());
    };

    let start_point = content_point(doc, first, start.offset);
    let end_point = content_point(doc, last, end.offset);
    if start_point > end_point {
        return Err(RangeError::Reversed);
    }

    let mut wrapped: Vec<NodeId> = Vec::new();
    let mut plan = Vec::new();
    for &node in range {
        if wrapped.iter().any(|&w| doc.is_ancestor(w, node)) {
            continue;
        }
        let el = doc.element(node);
        let from = if node == first { start_point } else { el.inner.start };
        let mut to = if node == last { end_point } else { el.inner.end };
        if node != last && doc.is_ancestor(node, last) {
            to = to.min(end_point);
        }
        wrapped.push(node);

        segments::plan(
            doc,
            node,
            doc.snap_to_token_boundary(from),
            doc.snap_to_token_boundary(to),
            &mut plan,
        );
    }

    if plan.is_empty() && start_point < end_point {
        return Err(RangeError::Collapsed);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAPTER: &str = "<html><head><title>T</title></head><body>\
        <p>Hello brave new world</p>\
        <p>Second <em>para</em> here</p>\
        <p>Third one</p>\
        </body></html>";

    const S: &str = "<span class=\"readiumCSS-yellow-highlight\">";
    const E: &str = "</span>";

    fn cfi(path: &str, offset: usize) -> String {
        format!("ch1.xhtml#epubcfi({}:{})", path, offset)
    }

    fn place(doc: &mut Document, start: (&str, usize), end: (&str, usize)) -> Result<PlacedHighlight, HighlightError> {
        let highlight = Highlight::new(cfi(start.0, start.1), cfi(end.0, end.1));
        HighlightEngine::default().place(doc, &highlight)
    }

    #[test]
    fn test_single_node_highlight() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let placed = place(&mut doc, ("/4/2", 6), ("/4/2", 11)).unwrap();

        assert_eq!(placed.nodes, 1);
        assert_eq!(placed.markers, 1);
        assert_eq!(placed.revision, 1);
        assert!(doc
            .source()
            .contains(&format!("<p>Hello {S}brave{E} new world</p>")));
    }

    #[test]
    fn test_multi_node_highlight() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let placed = place(&mut doc, ("/4/2", 6), ("/4/6", 5)).unwrap();

        // p, p, em, p: the em sits inside a fully wrapped paragraph
        assert_eq!(placed.nodes, 4);
        assert_eq!(placed.markers, 3);

        let source = doc.source();
        assert!(source.contains(&format!("<p>Hello {S}brave new world{E}</p>")));
        assert!(source.contains(&format!("<p>{S}Second <em>para</em> here{E}</p>")));
        assert!(source.contains(&format!("<p>{S}Third{E} one</p>")));
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let cases = [
            (("/4/2", 6), ("/4/2", 11)),
            (("/4/2", 0), ("/4/6", 9)),
            (("/4/4", 9), ("/4/4", 23)),
            (("/4/4", 0), ("/4/4/2", 2)),
            (("/4", 0), ("/4", 200)),
        ];
        for (start, end) in cases {
            let mut doc = Document::parse(CHAPTER).unwrap();
            place(&mut doc, start, end).unwrap();
            assert_ne!(doc.source(), CHAPTER);

            HighlightEngine::default().remove(&mut doc).unwrap();
            assert_eq!(doc.source(), CHAPTER, "round trip failed for {:?}..{:?}", start, end);
        }
    }

    #[test]
    fn test_boundary_inside_child_element_stays_well_formed() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        // "Second <em>pa|ra</em> he|re"
        let placed = place(&mut doc, ("/4/4", 13), ("/4/4", 23)).unwrap();
        assert_eq!(placed.markers, 2);
        assert!(doc
            .source()
            .contains(&format!("<p>Second <em>pa{S}ra{E}</em>{S} he{E}re</p>")));
    }

    #[test]
    fn test_offset_inside_tag_moves_before_the_tag() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        // Offset 9 lands inside "<em>"
        place(&mut doc, ("/4/4", 9), ("/4/4", 25)).unwrap();
        assert!(doc
            .source()
            .contains(&format!("<p>Second {S}<em>para</em> here{E}</p>")));
    }

    #[test]
    fn test_end_inside_descendant_of_start() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let placed = place(&mut doc, ("/4/4", 0), ("/4/4/2", 2)).unwrap();
        assert_eq!(placed.nodes, 2);
        assert!(doc
            .source()
            .contains(&format!("<p>{S}Second {E}<em>{S}pa{E}ra</em> here</p>")));
    }

    #[test]
    fn test_offsets_clamp_to_content() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        place(&mut doc, ("/4/6", 0), ("/4/6", 999)).unwrap();
        assert!(doc.source().contains(&format!("<p>{S}Third one{E}</p>")));
    }

    #[test]
    fn test_offsets_count_utf16_units() {
        let source = "<p>h\u{e9}llo w\u{f6}rld</p>";
        let mut doc = Document::parse(source).unwrap();
        place(&mut doc, ("/", 1), ("/", 2)).unwrap();
        assert_eq!(doc.source(), format!("<p>h{S}\u{e9}{E}llo w\u{f6}rld</p>"));

        // U+1F600 is two code units
        let source = "<p>a\u{1F600}bc</p>";
        let mut doc = Document::parse(source).unwrap();
        place(&mut doc, ("/", 3), ("/", 4)).unwrap();
        assert_eq!(doc.source(), format!("<p>a\u{1F600}{S}b{E}c</p>"));

        // An offset inside the pair moves before the character
        let mut doc = Document::parse(source).unwrap();
        place(&mut doc, ("/", 2), ("/", 3)).unwrap();
        assert_eq!(doc.source(), format!("<p>a{S}\u{1F600}{E}bc</p>"));
    }

    #[test]
    fn test_character_references_are_not_split() {
        let source = "<p>Fish &amp; chips</p>";
        let mut doc = Document::parse(source).unwrap();
        place(&mut doc, ("/", 7), ("/", 10)).unwrap();
        assert_eq!(doc.source(), format!("<p>Fish {S}&amp;{E} chips</p>"));
    }

    #[test]
    fn test_malformed_reference_does_not_mutate() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let highlight = Highlight::new("notacfi", cfi("/4/2", 3));
        let err = HighlightEngine::default().place(&mut doc, &highlight).unwrap_err();

        assert!(matches!(err, HighlightError::Parse(LocationParseError::Malformed(_))));
        assert_eq!(err.kind(), "parse_error");
        assert_eq!(doc.source(), CHAPTER);
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_out_of_range_path_does_not_mutate() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let err = place(&mut doc, ("/4/2", 0), ("/4/8", 1)).unwrap_err();
        assert!(matches!(
            err,
            HighlightError::Resolution(ResolutionError::OutOfRange { step: 8, .. })
        ));
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_reversed_ranges_are_rejected() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let err = place(&mut doc, ("/4/6", 0), ("/4/2", 3)).unwrap_err();
        assert!(matches!(err, HighlightError::Range(RangeError::Reversed)));

        let err = place(&mut doc, ("/4/2", 10), ("/4/2", 3)).unwrap_err();
        assert!(matches!(err, HighlightError::Range(RangeError::Reversed)));
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_elements_outside_body_are_not_indexed() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let err = place(&mut doc, ("/2/2", 0), ("/4/2", 3)).unwrap_err();
        assert!(matches!(err, HighlightError::Range(RangeError::NotIndexed)));
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_resource_checks() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let highlight = Highlight::new("ch1.xhtml#epubcfi(/4/2:0)", "ch2.xhtml#epubcfi(/4/2:3)");
        let err = HighlightEngine::default().place(&mut doc, &highlight).unwrap_err();
        assert!(matches!(err, HighlightError::Range(RangeError::CrossResource { .. })));

        let mut doc = Document::parse(CHAPTER).unwrap().with_resource_name("OEBPS/ch2.xhtml");
        let err = place(&mut doc, ("/4/2", 0), ("/4/2", 3)).unwrap_err();
        assert_eq!(err.kind(), "resource_mismatch");

        let mut doc = Document::parse(CHAPTER).unwrap().with_resource_name("OEBPS/ch1.xhtml");
        assert!(place(&mut doc, ("/4/2", 0), ("/4/2", 3)).is_ok());
    }

    #[test]
    fn test_empty_range_inserts_nothing() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        let placed = place(&mut doc, ("/4/2", 4), ("/4/2", 4)).unwrap();
        assert_eq!(placed.markers, 0);
        assert_eq!(doc.source(), CHAPTER);
        assert_eq!(doc.revision(), 0);
    }

    #[test]
    fn test_range_collapsing_inside_a_reference_is_an_error() {
        let source = "<p>Fish &amp; chips</p>";
        let mut doc = Document::parse(source).unwrap();
        let err = place(&mut doc, ("/", 6), ("/", 8)).unwrap_err();
        assert!(matches!(err, HighlightError::Range(RangeError::Collapsed)));
        assert_eq!(doc.source(), source);
    }

    #[test]
    fn test_disjoint_highlights_in_one_paragraph() {
        let engine = HighlightEngine::default();
        let mut doc = Document::parse(CHAPTER).unwrap();
        let annotations = vec![
            Annotation::new(cfi("/4/2", 0), cfi("/4/2", 5)),
            Annotation::new(cfi("/4/2", 6), cfi("/4/2", 11)),
            Annotation::new(cfi("/4/2", 16), cfi("/4/2", 21)),
        ];
        let report = engine.apply(&mut doc, &annotations);

        assert_eq!(report.placed, 3);
        assert!(report.failed.is_empty());
        assert!(doc
            .source()
            .contains(&format!("<p>{S}Hello{E} {S}brave{E} new {S}world{E}</p>")));

        assert_eq!(engine.remove(&mut doc).unwrap(), 3);
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_adjacent_highlights_stay_separate() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        place(&mut doc, ("/4/2", 0), ("/4/2", 5)).unwrap();
        place(&mut doc, ("/4/2", 5), ("/4/2", 11)).unwrap();
        assert!(doc
            .source()
            .contains(&format!("<p>{S}Hello{E}{S} brave{E} new world</p>")));

        HighlightEngine::default().remove(&mut doc).unwrap();
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_paths_ignore_existing_markers() {
        let mut doc = Document::parse(CHAPTER).unwrap();
        place(&mut doc, ("/4/4", 0), ("/4/4", 3)).unwrap();
        // The marker before <em> does not shift its step
        let placed = place(&mut doc, ("/4/4/2", 0), ("/4/4/2", 4)).unwrap();
        assert_eq!(placed.markers, 1);
        assert!(doc
            .source()
            .contains(&format!("<p>{S}Sec{E}ond <em>{S}para{E}</em> here</p>")));
    }

    #[test]
    fn test_unbalanced_marker_tags_are_refused() {
        let unclosed = "<html><body><p>a<span>x</p></body></html>";
        let mut doc = Document::parse(unclosed).unwrap();
        let err = place(&mut doc, ("/2/2", 0), ("/2/2", 100)).unwrap_err();
        assert!(matches!(
            err,
            HighlightError::Range(RangeError::UnpairedMarker { .. })
        ));
        assert_eq!(doc.source(), unclosed);
        assert_eq!(doc.revision(), 0);

        let stray = "<html><body><p>a</span>b</p></body></html>";
        let mut doc = Document::parse(stray).unwrap();
        let err = place(&mut doc, ("/2/2", 0), ("/2/2", 100)).unwrap_err();
        assert_eq!(err.kind(), "range_error");
        assert_eq!(doc.source(), stray);

        // A different marker tag pairs cleanly
        let engine = HighlightEngine::new(HighlightConfig {
            marker_class: "readiumCSS-yellow-highlight".to_string(),
            marker_tag: "mark".to_string(),
        });
        let mut doc = Document::parse(unclosed).unwrap();
        engine
            .place(&mut doc, &Highlight::new(cfi("/2/2", 0), cfi("/2/2", 100)))
            .unwrap();
        engine.remove(&mut doc).unwrap();
        assert_eq!(doc.source(), unclosed);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let engine = HighlightEngine::default();
        let mut doc = Document::parse(CHAPTER).unwrap();
        assert_eq!(engine.remove(&mut doc).unwrap(), 0);
        assert_eq!(doc.revision(), 0);

        place(&mut doc, ("/4/2", 0), ("/4/6", 3)).unwrap();
        assert_eq!(engine.remove(&mut doc).unwrap(), 3);
        let once = doc.source().to_string();
        assert_eq!(engine.remove(&mut doc).unwrap(), 0);
        assert_eq!(doc.source(), once);
    }

    #[test]
    fn test_remove_keeps_nested_markup_and_other_spans() {
        let source = format!(
            "<p>a{S}b<span class=\"note\">c</span>{E}d</p><p>{S}<b>x</b>{E}</p>"
        );
        let mut doc = Document::parse(source.as_str()).unwrap();
        let removed = HighlightEngine::default().remove(&mut doc).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(
            doc.source(),
            "<p>ab<span class=\"note\">c</span>d</p><p><b>x</b></p>"
        );
    }

    #[test]
    fn test_marker_identified_by_class_only() {
        let source = "<div><b class=\"readiumCSS-yellow-highlight extra\" id=\"m\">x</b></div>";
        let mut doc = Document::parse(source).unwrap();
        assert_eq!(HighlightEngine::default().remove(&mut doc).unwrap(), 1);
        assert_eq!(doc.source(), "<div>x</div>");
    }

    #[test]
    fn test_custom_marker() {
        let config = HighlightConfig {
            marker_class: "ll-highlight".to_string(),
            marker_tag: "mark".to_string(),
        };
        let engine = HighlightEngine::new(config);
        let mut doc = Document::parse(CHAPTER).unwrap();
        engine
            .place(&mut doc, &Highlight::new(cfi("/4/6", 0), cfi("/4/6", 5)))
            .unwrap();
        assert!(doc
            .source()
            .contains("<p><mark class=\"ll-highlight\">Third</mark> one</p>"));
        assert_eq!(engine.remove(&mut doc).unwrap(), 1);
        assert_eq!(doc.source(), CHAPTER);
    }

    #[test]
    fn test_batch_clears_then_continues_past_failures() {
        let engine = HighlightEngine::default();
        let mut doc = Document::parse(CHAPTER).unwrap();
        place(&mut doc, ("/4/2", 0), ("/4/2", 5)).unwrap();

        let annotations = vec![
            Annotation::new(cfi("/4/6", 0), cfi("/4/6", 5)).with_id("ok-1"),
            Annotation::new("notacfi", cfi("/4/6", 5)).with_id("bad"),
            Annotation::new(cfi("/4/2", 6), cfi("/4/2", 11)).with_id("ok-2"),
        ];
        let report = engine.apply(&mut doc, &annotations);

        assert_eq!(report.removed, 1);
        assert_eq!(report.placed, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].annotation, "bad");
        assert_eq!(report.failed[0].kind, "parse_error");
        assert_eq!(report.revision, doc.revision());

        let source = doc.source();
        assert!(!source.contains(&format!("<p>{S}Hello{E}")));
        assert!(source.contains(&format!("<p>Hello {S}brave{E} new world</p>")));
        assert!(source.contains(&format!("<p>{S}Third{E} one</p>")));
    }

    #[test]
    fn test_inject_and_strip() {
        let annotations = vec![Annotation::new(cfi("/4/6", 0), cfi("/4/6", 5))];
        let config = HighlightConfig::default();

        let result = inject_highlights(CHAPTER, &annotations, &config).unwrap();
        assert_eq!(result.injected_count, 1);
        assert!(result.failed_annotations.is_empty());
        assert!(result.html.contains(&format!("<p>{S}Third{E} one</p>")));

        assert_eq!(strip_highlights(&result.html, &config).unwrap(), CHAPTER);
    }

    #[test]
    fn test_inject_no_annotations() {
        let result = inject_highlights(CHAPTER, &[], &HighlightConfig::default()).unwrap();
        assert_eq!(result.injected_count, 0);
        assert_eq!(result.html, CHAPTER);
    }
}
