//! Split (extensive-coverage) review
//!
//! Other annotators' annotations for the current page, held read-only, and
//! promotion of their annotations and links into the validator's own set.
//! Promotion always copies; ids differ between annotators, so links are
//! mapped onto the validator's annotations by geometry or text.

use crate::api::{AnnotatorAnnotations, OtherAnnotators};
use crate::ids::TimestampIds;
use crate::store::AnnotationStore;
use doc_model::{Annotation, AnnotationChanges, AnnotationId, BoundType, Link};

#[derive(Debug, Default, Clone)]
pub struct SplitReview {
    page_num: Option<u32>,
    annotators: Vec<AnnotatorAnnotations>,
}

impl SplitReview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the entries for `page_num` only; anything else in `others` is dropped.
    pub fn load(&mut self, page_num: u32, mut others: OtherAnnotators) {
        self.annotators = others.remove(&page_num).unwrap_or_default();
        self.page_num = Some(page_num);
        tracing::debug!(page_num, annotators = self.annotators.len(), "loaded other annotators");
    }

    pub fn clear(&mut self) {
        self.page_num = None;
        self.annotators.clear();
    }

    pub fn page_num(&self) -> Option<u32> {
        self.page_num
    }

    pub fn user_ids(&self) -> impl Iterator<Item = &str> {
        self.annotators.iter().map(|annotator| annotator.user_id.as_str())
    }

    pub fn annotations_of(&self, user_id: &str) -> &[Annotation] {
        self.annotators
            .iter()
            .find(|annotator| annotator.user_id == user_id)
            .map(|annotator| annotator.objs.as_slice())
            .unwrap_or_default()
    }

    fn source(&self, page_num: u32, user_id: &str, id: &AnnotationId) -> Option<&Annotation> {
        if self.page_num != Some(page_num) {
            return None;
        }
        self.annotations_of(user_id).iter().find(|annotation| &annotation.id == id)
    }

    /// Copy another annotator's annotation onto `page_num`.
    ///
    /// The copy gets a fresh id, no links and an `original_annotation_id`
    /// pointing back. Promoting the same origin twice on a page does nothing.
    pub fn promote_annotation(
        &self,
        page_num: u32,
        user_id: &str,
        source_id: &AnnotationId,
        store: &mut AnnotationStore,
        ids: &mut TimestampIds,
    ) -> Option<Annotation> {
        let source = self.source(page_num, user_id, source_id)?;

        let already_promoted = store
            .page(page_num)
            .iter()
            .any(|annotation| annotation.original_annotation_id.as_ref() == Some(source_id));
        if already_promoted {
            tracing::debug!(page_num, %source_id, "annotation already promoted");
            return None;
        }

        let mut copy = source.duplicate_as(ids.next_id());
        copy.original_annotation_id = Some(source_id.clone());
        Some(store.create(page_num, copy, None))
    }

    /// Recreate one of another annotator's links between the validator's
    /// equivalents of its endpoints.
    ///
    /// Returns the page and the pre-change snapshot of the link owner, or
    /// `None` when an endpoint has no equivalent or the link already exists.
    pub fn promote_link(
        &self,
        page_num: u32,
        user_id: &str,
        source_id: &AnnotationId,
        link: &Link,
        store: &mut AnnotationStore,
    ) -> Option<(u32, Annotation)> {
        let source = self.source(page_num, user_id, source_id)?;
        let target = self.source(link.page_num, user_id, &link.to)?;

        let own_source = find_equivalent(store.page(page_num), source)?.clone();
        let own_target = find_equivalent(store.page(link.page_num), target)?.id.clone();

        let promoted = Link { to: own_target, ..link.clone() };
        if own_source.links.iter().any(|existing| existing.same_edge(&promoted)) {
            return None;
        }

        let mut links = own_source.links.clone();
        links.push(promoted);
        store
            .modify(page_num, &own_source.id, &AnnotationChanges::links(links))
            .map(|previous| (page_num, previous))
    }
}

/// The validator's annotation matching `other`: its promoted copy, else one
/// of the same kind with an equal bound (equal tokens for text).
pub fn find_equivalent<'a>(own: &'a [Annotation], other: &Annotation) -> Option<&'a Annotation> {
    own.iter()
        .find(|annotation| annotation.original_annotation_id.as_ref() == Some(&other.id))
        .or_else(|| {
            own.iter().find(|annotation| {
                annotation.bound_type == other.bound_type
                    && if other.bound_type == BoundType::Text {
                        annotation.tokens == other.tokens
                    } else {
                        annotation.bound == other.bound
                    }
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Bound, LinkType, Token};
    use std::collections::BTreeMap;

    fn boxed(id: i64, x: f64) -> Annotation {
        Annotation::new(id, BoundType::Box, Bound::new(x, 0.0, 10.0, 10.0), "cat")
    }

    fn review() -> SplitReview {
        let theirs = vec![
            boxed(100, 0.0).with_links(vec![Link::new(101, "ref", 2, LinkType::Directional)]),
            boxed(101, 50.0),
        ];
        let mut others = BTreeMap::new();
        others.insert(2, vec![AnnotatorAnnotations { user_id: "u1".into(), objs: theirs }]);
        let elsewhere = AnnotatorAnnotations { user_id: "u1".into(), objs: vec![boxed(7, 0.0)] };
        others.insert(3, vec![elsewhere]);

        let mut review = SplitReview::new();
        review.load(2, others);
        review
    }

    #[test]
    fn load_keeps_current_page_only() {
        let review = review();
        assert_eq!(review.page_num(), Some(2));
        assert_eq!(review.annotations_of("u1").len(), 2);
        assert!(review.annotations_of("u2").is_empty());
    }

    #[test]
    fn second_promotion_of_same_origin_is_noop() {
        let review = review();
        let mut store = AnnotationStore::new();
        let mut ids = TimestampIds::new();
        let origin = AnnotationId::Number(100);

        let copy = review
            .promote_annotation(2, "u1", &origin, &mut store, &mut ids)
            .expect("first promotion");
        assert_ne!(copy.id, origin);
        assert!(copy.links.is_empty());
        assert_eq!(copy.original_annotation_id, Some(origin.clone()));

        assert!(review.promote_annotation(2, "u1", &origin, &mut store, &mut ids).is_none());
        assert_eq!(store.page(2).len(), 1);
    }

    #[test]
    fn promotion_from_other_page_is_rejected() {
        let review = review();
        let mut store = AnnotationStore::new();
        let mut ids = TimestampIds::new();
        let origin = AnnotationId::Number(7);
        assert!(review.promote_annotation(3, "u1", &origin, &mut store, &mut ids).is_none());
    }

    #[test]
    fn link_maps_onto_equivalent_annotations() {
        let review = review();
        let mut store = AnnotationStore::new();
        let mut ids = TimestampIds::new();
        review.promote_annotation(2, "u1", &AnnotationId::Number(100), &mut store, &mut ids);
        store.create(2, boxed(5, 50.0), None);

        let link = Link::new(101, "ref", 2, LinkType::Directional);
        let (page_num, previous) = review
            .promote_link(2, "u1", &AnnotationId::Number(100), &link, &mut store)
            .expect("both endpoints have equivalents");

        assert_eq!(page_num, 2);
        assert!(previous.links.is_empty());
        let owner = store.get(2, &previous.id).expect("owner still present");
        assert_eq!(owner.links, vec![Link::new(5, "ref", 2, LinkType::Directional)]);

        let origin = AnnotationId::Number(100);
        assert!(review.promote_link(2, "u1", &origin, &link, &mut store).is_none());
    }

    #[test]
    fn text_equivalence_compares_tokens() {
        let tokens = vec![Token::new("a", 0.0, 0.0, 1.0, 1.0)];
        let text = |id: i64, bound: Bound| Annotation::new(id, BoundType::Text, bound, "t");
        let theirs = text(1, Bound::new(0.0, 0.0, 5.0, 5.0)).with_tokens(tokens.clone());
        let own = vec![
            text(2, Bound::new(0.0, 0.0, 5.0, 5.0)),
            text(3, Bound::new(9.0, 9.0, 1.0, 1.0)).with_tokens(tokens),
        ];

        assert_eq!(
            find_equivalent(&own, &theirs).map(|annotation| &annotation.id),
            Some(&AnnotationId::Number(3))
        );
    }
}
