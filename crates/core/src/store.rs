//! Per-page annotation store
//!
//! Mutable collection of annotations keyed by page number. Mutations mark the
//! page as modified and never fail: an id that is not present (for example
//! because the lazy cache evicted its page) turns the call into a no-op.
//!
//! The store itself does not record history. User actions are recorded by
//! the caller; undo/redo replays call the same methods without recording.

use doc_model::{Annotation, AnnotationChanges, AnnotationId, BoundType, Category, Link};
use std::collections::{BTreeMap, BTreeSet};

/// Currently selected annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub page_num: u32,
    pub id: AnnotationId,
}

/// Everything a single delete removed or rewrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deletion {
    /// Removed annotations, the requested one first, cascaded cells after it
    pub removed: Vec<Annotation>,

    /// Snapshots of annotations whose `children` were stripped, taken before the strip
    pub parents_before: Vec<Annotation>,
}

impl Deletion {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }

    pub fn target(&self) -> Option<&Annotation> {
        self.removed.first()
    }

    pub fn cascaded(&self) -> &[Annotation] {
        self.removed.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone)]
pub struct AnnotationStore {
    pages: BTreeMap<u32, Vec<Annotation>>,
    modified_pages: BTreeSet<u32>,
    selected: Option<Selection>,
    table_mode: bool,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fetched annotations for a page.
    ///
    /// Pages with unsaved local modifications are left alone so a refetch
    /// cannot clobber them. Returns whether the page was replaced.
    pub fn seed_page(&mut self, page_num: u32, annotations: Vec<Annotation>) -> bool {
        if self.modified_pages.contains(&page_num) {
            tracing::debug!(page_num, "skipping seed of locally modified page");
            return false;
        }
        self.pages.insert(page_num, annotations);
        true
    }

    /// Drop cached pages that carry no unsaved modifications.
    pub fn evict_pages(&mut self, page_nums: &BTreeSet<u32>) -> Vec<u32> {
        let evictable: Vec<u32> = page_nums
            .iter()
            .copied()
            .filter(|page_num| !self.modified_pages.contains(page_num))
            .filter(|page_num| self.pages.contains_key(page_num))
            .collect();

        for page_num in &evictable {
            self.pages.remove(page_num);
        }
        evictable
    }

    pub fn page(&self, page_num: u32) -> &[Annotation] {
        self.pages.get(&page_num).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn page_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    pub fn get(&self, page_num: u32, id: &AnnotationId) -> Option<&Annotation> {
        self.page(page_num).iter().find(|annotation| &annotation.id == id)
    }

    /// Page currently holding `id`. Scans every page.
    pub fn find_owning_page(&self, id: &AnnotationId) -> Option<u32> {
        self.pages
            .iter()
            .find(|(_, annotations)| annotations.iter().any(|annotation| &annotation.id == id))
            .map(|(page_num, _)| *page_num)
    }

    pub fn modified_pages(&self) -> &BTreeSet<u32> {
        &self.modified_pages
    }

    pub fn is_modified(&self, page_num: u32) -> bool {
        self.modified_pages.contains(&page_num)
    }

    pub fn mark_modified(&mut self, page_num: u32) {
        self.modified_pages.insert(page_num);
    }

    pub fn clear_modified(&mut self) {
        self.modified_pages.clear();
    }

    /// Modified pages with their current content, in page order.
    pub fn pages_for_save(&self) -> Vec<(u32, Vec<Annotation>)> {
        self.modified_pages
            .iter()
            .map(|&page_num| (page_num, self.page(page_num).to_vec()))
            .collect()
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        let selection = self.selected.as_ref()?;
        self.get(selection.page_num, &selection.id)
    }

    /// Select an annotation. Unknown ids clear the selection.
    pub fn select(&mut self, page_num: u32, id: &AnnotationId) -> bool {
        if self.get(page_num, id).is_some() {
            self.selected = Some(Selection { page_num, id: id.clone() });
            true
        } else {
            self.selected = None;
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn is_table_mode(&self) -> bool {
        self.table_mode
    }

    pub fn set_table_mode(&mut self, enabled: bool) {
        self.table_mode = enabled;
    }

    /// Append an annotation to a page and select it.
    ///
    /// A supplied category overrides the annotation's own and seeds empty
    /// data attributes from the category template. Tables switch the editor
    /// into table mode.
    pub fn create(
        &mut self,
        page_num: u32,
        mut annotation: Annotation,
        category: Option<&Category>,
    ) -> Annotation {
        if let Some(category) = category {
            annotation.category.clone_from(&category.id);
            if annotation.data.is_empty() {
                annotation.data = category.data_template();
            }
        }

        if annotation.bound_type == BoundType::Table {
            self.table_mode = true;
        }

        self.selected = Some(Selection { page_num, id: annotation.id.clone() });
        self.insert(page_num, annotation.clone());
        annotation
    }

    /// Put an annotation back without touching selection or table mode.
    pub fn restore(&mut self, page_num: u32, annotation: Annotation) {
        self.insert(page_num, annotation);
    }

    fn insert(&mut self, page_num: u32, annotation: Annotation) {
        self.pages.entry(page_num).or_default().push(annotation);
        self.modified_pages.insert(page_num);
    }

    /// Remove an annotation from a page.
    ///
    /// Deleting a table also removes the `table_cell` children it owns on the
    /// same page, unless another annotation on the page still lists the cell.
    /// Removed ids are stripped from every remaining annotation's `children`,
    /// and same-page links to them are dropped. Links on other pages that
    /// point here are left alone; the link resolver skips missing targets.
    pub fn delete(&mut self, page_num: u32, id: &AnnotationId) -> Deletion {
        let Some(annotations) = self.pages.get_mut(&page_num) else {
            tracing::debug!(page_num, %id, "delete on unloaded page ignored");
            return Deletion::default();
        };
        let Some(position) = annotations.iter().position(|annotation| &annotation.id == id) else {
            tracing::debug!(page_num, %id, "delete of unknown annotation ignored");
            return Deletion::default();
        };

        let target = annotations.remove(position);
        let mut removed_ids: BTreeSet<AnnotationId> = BTreeSet::from([target.id.clone()]);

        if target.is_table() && !target.children.is_empty() {
            let shared: BTreeSet<&AnnotationId> =
                annotations.iter().flat_map(|annotation| annotation.children.iter()).collect();
            let cascade: BTreeSet<AnnotationId> = target
                .children
                .iter()
                .filter(|child| !shared.contains(child))
                .filter(|child| annotations.iter().any(|a| &a.id == *child && a.is_table_cell()))
                .cloned()
                .collect();
            removed_ids.extend(cascade);
        }

        let mut deletion = Deletion { removed: vec![target], parents_before: Vec::new() };

        let mut kept = Vec::with_capacity(annotations.len());
        for annotation in annotations.drain(..) {
            if removed_ids.contains(&annotation.id) {
                deletion.removed.push(annotation);
            } else {
                kept.push(annotation);
            }
        }

        let points_at_removed =
            |link: &Link| link.page_num == page_num && removed_ids.contains(&link.to);
        for annotation in &mut kept {
            let owns_removed = annotation.children.iter().any(|child| removed_ids.contains(child));
            let links_removed = annotation.links.iter().any(|link| points_at_removed(link));
            if owns_removed || links_removed {
                deletion.parents_before.push(annotation.clone());
                annotation.children.retain(|child| !removed_ids.contains(child));
                annotation.links.retain(|link| !points_at_removed(link));
            }
        }
        *annotations = kept;

        let selection_removed = self.selected.as_ref().is_some_and(|selection| {
            selection.page_num == page_num && removed_ids.contains(&selection.id)
        });
        if selection_removed {
            self.selected = None;
        }
        if deletion.removed.iter().any(Annotation::is_table) {
            self.table_mode = false;
        }

        self.modified_pages.insert(page_num);
        deletion
    }

    /// Remove exactly one annotation, with no cascade and no reference stripping.
    pub fn take(&mut self, page_num: u32, id: &AnnotationId) -> Option<Annotation> {
        let annotations = self.pages.get_mut(&page_num)?;
        let position = annotations.iter().position(|annotation| &annotation.id == id)?;
        let annotation = annotations.remove(position);

        let selection_removed = self
            .selected
            .as_ref()
            .is_some_and(|selection| selection.page_num == page_num && &selection.id == id);
        if selection_removed {
            self.selected = None;
        }
        self.modified_pages.insert(page_num);
        Some(annotation)
    }

    /// Apply `changes` to an annotation. Returns the state before the change,
    /// or `None` when the id is not on the page.
    pub fn modify(
        &mut self,
        page_num: u32,
        id: &AnnotationId,
        changes: &AnnotationChanges,
    ) -> Option<Annotation> {
        let annotation = self.find_mut(page_num, id)?;
        let previous = annotation.clone();
        annotation.apply(changes);
        self.modified_pages.insert(page_num);
        Some(previous)
    }

    /// [`modify`](Self::modify) on whichever page holds `id`.
    pub fn modify_anywhere(
        &mut self,
        id: &AnnotationId,
        changes: &AnnotationChanges,
    ) -> Option<(u32, Annotation)> {
        let page_num = self.find_owning_page(id)?;
        self.modify(page_num, id, changes).map(|previous| (page_num, previous))
    }

    /// Swap in a whole annotation with the same id. Returns the replaced state.
    pub fn replace(&mut self, page_num: u32, annotation: Annotation) -> Option<Annotation> {
        let slot = self.find_mut(page_num, &annotation.id)?;
        let previous = std::mem::replace(slot, annotation);
        self.modified_pages.insert(page_num);
        Some(previous)
    }

    /// Remove one link from an annotation. Returns the state before removal,
    /// or `None` when nothing matched.
    pub fn delete_link(
        &mut self,
        page_num: u32,
        id: &AnnotationId,
        link: &Link,
    ) -> Option<Annotation> {
        let annotation = self.find_mut(page_num, id)?;
        if !annotation.links.iter().any(|existing| existing.same_edge(link)) {
            return None;
        }

        let previous = annotation.clone();
        annotation.links.retain(|existing| !existing.same_edge(link));
        self.modified_pages.insert(page_num);
        Some(previous)
    }

    /// Rebuild a table's `children` from the cells lying inside its bound.
    /// Returns the table as it was before, or `None` if it is not a table.
    pub fn recompute_table_children(
        &mut self,
        page_num: u32,
        table_id: &AnnotationId,
    ) -> Option<Annotation> {
        let table = self.get(page_num, table_id).filter(|annotation| annotation.is_table())?;
        let bound = table.bound;

        let cells: Vec<AnnotationId> = self
            .page(page_num)
            .iter()
            .filter(|annotation| {
                annotation.is_table_cell() && bound.contains_bound(&annotation.bound)
            })
            .map(|annotation| annotation.id.clone())
            .collect();

        self.modify(page_num, table_id, &AnnotationChanges::children(cells))
    }

    fn find_mut(&mut self, page_num: u32, id: &AnnotationId) -> Option<&mut Annotation> {
        self.pages.get_mut(&page_num)?.iter_mut().find(|annotation| &annotation.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::{Bound, LinkType};

    fn boxed(id: i64) -> Annotation {
        Annotation::new(id, BoundType::Box, Bound::new(id as f64, 0.0, 10.0, 10.0), "cat")
    }

    fn cell(id: i64, x: f64) -> Annotation {
        Annotation::new(id, BoundType::TableCell, Bound::new(x, 0.0, 10.0, 10.0), "cell")
    }

    fn table(id: i64, children: &[i64]) -> Annotation {
        Annotation::new(id, BoundType::Table, Bound::new(0.0, 0.0, 100.0, 100.0), "table")
            .with_children(children.iter().map(|&child| AnnotationId::Number(child)))
    }

    #[test]
    fn create_appends_selects_and_marks_page() {
        let mut store = AnnotationStore::new();
        let created = store.create(1, boxed(5), None);

        assert_eq!(store.page(1), &[created.clone()]);
        assert_eq!(store.selected(), Some(&Selection { page_num: 1, id: created.id }));
        assert!(store.is_modified(1));
        assert!(!store.is_table_mode());
    }

    #[test]
    fn create_table_enters_table_mode() {
        let mut store = AnnotationStore::new();
        store.create(1, table(1, &[]), None);
        assert!(store.is_table_mode());
    }

    #[test]
    fn create_with_category_seeds_data_template() {
        let mut store = AnnotationStore::new();
        let category = Category::new("title", "Title").with_attribute("lang", "string");

        let created = store.create(1, boxed(1), Some(&category));

        assert_eq!(created.category, "title");
        assert_eq!(created.data.len(), 1);
        assert_eq!(store.page(1)[0].data[0].name, "lang");
    }

    #[test]
    fn deleting_table_cascades_to_cells_on_same_page() {
        let mut store = AnnotationStore::new();
        store.seed_page(3, vec![table(1, &[2, 3]), cell(2, 0.0), cell(3, 20.0)]);
        store.seed_page(4, vec![cell(2, 0.0)]);

        let deletion = store.delete(3, &AnnotationId::Number(1));

        assert!(store.page(3).is_empty());
        assert_eq!(deletion.removed.len(), 3);
        assert_eq!(deletion.target().map(|a| a.id.clone()), Some(AnnotationId::Number(1)));
        assert_eq!(store.page(4).len(), 1, "other pages are untouched");
    }

    #[test]
    fn cascade_spares_cells_owned_elsewhere_and_non_cells() {
        let mut store = AnnotationStore::new();
        let other_table = table(9, &[3]);
        store.seed_page(
            1,
            vec![table(1, &[2, 3, 4]), cell(2, 0.0), cell(3, 20.0), boxed(4), other_table],
        );

        let deletion = store.delete(1, &AnnotationId::Number(1));

        let remaining: Vec<AnnotationId> = store.page(1).iter().map(|a| a.id.clone()).collect();
        assert_eq!(
            remaining,
            vec![AnnotationId::Number(3), AnnotationId::Number(4), AnnotationId::Number(9)]
        );
        assert_eq!(deletion.cascaded().len(), 1);
    }

    #[test]
    fn delete_strips_child_references() {
        let mut store = AnnotationStore::new();
        store.seed_page(1, vec![table(1, &[2, 3]), cell(2, 0.0), cell(3, 20.0)]);

        let deletion = store.delete(1, &AnnotationId::Number(2));

        assert_eq!(
            store.get(1, &AnnotationId::Number(1)).map(|t| t.children.clone()),
            Some(vec![AnnotationId::Number(3)])
        );
        assert_eq!(deletion.parents_before.len(), 1);
        assert_eq!(deletion.parents_before[0].children.len(), 2);
    }

    #[test]
    fn delete_strips_same_page_links_to_removed_annotation() {
        let mut store = AnnotationStore::new();
        let to_target = Link::new(2, "ref", 1, LinkType::Directional);
        let cross_page = Link::new(2, "ref", 5, LinkType::Directional);
        let source = boxed(1).with_links(vec![to_target, cross_page.clone()]);
        store.seed_page(1, vec![source, boxed(2)]);

        let deletion = store.delete(1, &AnnotationId::Number(2));

        assert_eq!(
            store.get(1, &AnnotationId::Number(1)).map(|a| a.links.clone()),
            Some(vec![cross_page])
        );
        assert_eq!(deletion.parents_before.len(), 1);
        assert_eq!(deletion.parents_before[0].links.len(), 2);
    }

    #[test]
    fn delete_clears_selection_of_removed_annotation() {
        let mut store = AnnotationStore::new();
        store.create(1, boxed(1), None);
        store.delete(1, &AnnotationId::Number(1));
        assert!(store.selected().is_none());
    }

    #[test]
    fn delete_unknown_is_noop() {
        let mut store = AnnotationStore::new();
        store.seed_page(1, vec![boxed(1)]);

        assert!(store.delete(1, &AnnotationId::Number(2)).is_empty());
        assert!(store.delete(7, &AnnotationId::Number(1)).is_empty());
        assert!(store.modified_pages().is_empty());
    }

    #[test]
    fn modify_anywhere_finds_owning_page() {
        let mut store = AnnotationStore::new();
        store.seed_page(1, vec![boxed(1)]);
        store.seed_page(2, vec![boxed(2)]);

        let result =
            store.modify_anywhere(&AnnotationId::Number(2), &AnnotationChanges::category("new"));

        assert_eq!(
            result.map(|(page, previous)| (page, previous.category)),
            Some((2, "cat".to_string()))
        );
        assert_eq!(store.page(2)[0].category, "new");
        assert_eq!(store.modified_pages(), &BTreeSet::from([2]));
    }

    #[test]
    fn modify_anywhere_unknown_is_noop() {
        let mut store = AnnotationStore::new();
        store.seed_page(1, vec![boxed(1)]);

        let changes = AnnotationChanges::category("x");
        assert!(store.modify_anywhere(&AnnotationId::Number(5), &changes).is_none());
        assert!(store.modified_pages().is_empty());
    }

    #[test]
    fn modified_pages_is_a_set() {
        let mut store = AnnotationStore::new();
        store.create(1, boxed(1), None);
        store.create(1, boxed(2), None);
        store.modify(1, &AnnotationId::Number(1), &AnnotationChanges::category("x"));
        assert_eq!(store.modified_pages().len(), 1);
    }

    #[test]
    fn delete_link_removes_matching_edge_only() {
        let mut store = AnnotationStore::new();
        let link = Link::new(2, "ref", 1, LinkType::Directional);
        let other = Link::new(3, "ref", 1, LinkType::Directional);
        store.seed_page(1, vec![boxed(1).with_links(vec![link.clone(), other.clone()])]);

        assert!(store.delete_link(1, &AnnotationId::Number(1), &link).is_some());
        assert_eq!(store.page(1)[0].links, vec![other]);
        assert!(store.delete_link(1, &AnnotationId::Number(1), &link).is_none());
    }

    #[test]
    fn seed_does_not_clobber_local_edits() {
        let mut store = AnnotationStore::new();
        store.create(1, boxed(1), None);

        assert!(!store.seed_page(1, Vec::new()));
        assert_eq!(store.page(1).len(), 1);

        let evicted = store.evict_pages(&BTreeSet::from([1]));
        assert!(evicted.is_empty());
    }

    #[test]
    fn recompute_table_children_uses_cell_geometry() {
        let mut store = AnnotationStore::new();
        let mut outside = cell(3, 0.0);
        outside.bound = Bound::new(500.0, 500.0, 5.0, 5.0);
        store.seed_page(1, vec![table(1, &[]), cell(2, 10.0), outside, boxed(4)]);

        let previous = store.recompute_table_children(1, &AnnotationId::Number(1));

        assert_eq!(previous.map(|t| t.children.len()), Some(0));
        assert_eq!(store.page(1)[0].children, vec![AnnotationId::Number(2)]);
        assert!(store.recompute_table_children(1, &AnnotationId::Number(4)).is_none());
    }
}
