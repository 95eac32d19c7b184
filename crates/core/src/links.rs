//! Link endpoint resolution
//!
//! Turns an annotation's `links` into plain point pairs for drawing. Targets
//! are looked up by page number and id, so a lookup covering other pages or
//! other documents yields cross-page and cross-document segments.
//!
//! Nothing here mutates state; calling it again gives the same answer.

use crate::store::AnnotationStore;
use crate::tokens::line_spans;
use doc_model::{Annotation, AnnotationId, Bound, BoundType, LinkType, Page, Point};
use serde::Serialize;

/// Source of link targets.
pub trait BoundLookup {
    fn find_annotation(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation>;
}

impl BoundLookup for AnnotationStore {
    fn find_annotation(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation> {
        self.get(page_num, id)
    }
}

impl BoundLookup for [Page] {
    fn find_annotation(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation> {
        self.iter().filter(|page| page.page_num == page_num).find_map(|page| page.find(id))
    }
}

impl BoundLookup for Vec<Page> {
    fn find_annotation(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation> {
        self.as_slice().find_annotation(page_num, id)
    }
}

/// Several lookups tried in order, e.g. the open document first and a
/// referenced document second.
#[derive(Default)]
pub struct LayeredLookup<'a> {
    layers: Vec<&'a dyn BoundLookup>,
}

impl<'a> LayeredLookup<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, layer: &'a dyn BoundLookup) -> Self {
        self.layers.push(layer);
        self
    }
}

impl BoundLookup for LayeredLookup<'_> {
    fn find_annotation(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation> {
        self.layers.iter().find_map(|layer| layer.find_annotation(page_num, id))
    }
}

/// Geometry used for connecting an annotation.
///
/// Text may wrap over several lines, so it connects through its first and
/// last line spans. Everything else connects through its bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedShape {
    pub first: Bound,
    pub last: Bound,
    pub is_text: bool,
}

impl ResolvedShape {
    pub fn of(annotation: &Annotation) -> Self {
        if annotation.bound_type == BoundType::Text {
            let spans = annotation.tokens.as_deref().map(line_spans).unwrap_or_default();
            if let (Some(first), Some(last)) = (spans.first(), spans.last()) {
                return Self { first: *first, last: *last, is_text: true };
            }
            return Self { first: annotation.bound, last: annotation.bound, is_text: true };
        }

        Self { first: annotation.bound, last: annotation.bound, is_text: false }
    }

    pub fn extent(&self) -> Bound {
        self.first.union(&self.last)
    }

    fn top_point(&self) -> Point {
        if self.is_text {
            self.first.left_middle()
        } else {
            self.first.top_center()
        }
    }

    fn bottom_point(&self) -> Point {
        if self.is_text {
            self.last.left_middle()
        } else {
            self.last.bottom_center()
        }
    }

    fn left_point(&self) -> Point {
        self.first.left_middle()
    }

    fn right_point(&self) -> Point {
        self.last.right_middle()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSegment {
    pub target: AnnotationId,
    pub target_page: u32,
    pub link_type: LinkType,
    pub category_id: String,
    /// Endpoint on the source annotation
    pub start: Point,
    pub finish: Point,
}

/// Pick the two points joining `source` and `target`, returned source side first.
///
/// Vertical separation wins: the lower edge of the higher shape joins the
/// upper edge of the lower one. When the shapes share vertical extent the
/// right edge of the left-most joins the left edge of the right-most, with
/// the source counted as left-most on a tie.
pub fn connect(source: &ResolvedShape, target: &ResolvedShape) -> (Point, Point) {
    let from = source.extent();
    let to = target.extent();

    if !from.overlaps_vertically(&to) {
        return if from.bottom() <= to.top() {
            (source.bottom_point(), target.top_point())
        } else {
            (source.top_point(), target.bottom_point())
        };
    }

    if from.center().x <= to.center().x {
        (source.right_point(), target.left_point())
    } else {
        (source.left_point(), target.right_point())
    }
}

/// Segments for every resolvable link of `source`. Missing targets are skipped.
pub fn resolve_link_points(
    source: &Annotation,
    lookup: &(impl BoundLookup + ?Sized),
) -> Vec<LinkSegment> {
    let from = ResolvedShape::of(source);

    source
        .links
        .iter()
        .filter_map(|link| {
            let Some(target) = lookup.find_annotation(link.page_num, &link.to) else {
                tracing::trace!(
                    source = %source.id,
                    target = %link.to,
                    page_num = link.page_num,
                    "link target not loaded"
                );
                return None;
            };
            let (start, finish) = connect(&from, &ResolvedShape::of(target));
            Some(LinkSegment {
                target: link.to.clone(),
                target_page: link.page_num,
                link_type: link.link_type,
                category_id: link.category_id.clone(),
                start,
                finish,
            })
        })
        .collect()
}
