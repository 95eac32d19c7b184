//! Single-slot annotation clipboard.

use crate::ids::TimestampIds;
use crate::store::AnnotationStore;
use doc_model::Annotation;

#[derive(Debug, Default, Clone)]
pub struct Clipboard {
    copied: Option<Annotation>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, annotation: &Annotation) {
        self.copied = Some(annotation.clone());
    }

    pub fn contents(&self) -> Option<&Annotation> {
        self.copied.as_ref()
    }

    pub fn clear(&mut self) {
        self.copied = None;
    }

    /// Insert a copy onto `page_num` under a fresh id, without links or children.
    /// The caller records the returned annotation as an add.
    pub fn paste(
        &self,
        page_num: u32,
        store: &mut AnnotationStore,
        ids: &mut TimestampIds,
    ) -> Option<Annotation> {
        let copied = self.copied.as_ref()?;
        let duplicate = copied.duplicate_as(ids.next_id());
        Some(store.create(page_num, duplicate, None))
    }
}
