//! Undo/redo history over store mutations
//!
//! Linear history with a pointer. `None` means nothing is undone; `Some(i)`
//! means items `i..` have been undone and can be redone. Recording after an
//! undo discards the redoable branch.
//!
//! Replays call the store directly and never record, so the user-action path
//! is the only place that calls [`UndoHistory::record`].

use crate::store::{AnnotationStore, Deletion};
use doc_model::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoAction {
    Add,
    Edit,
    Delete,
}

/// One reversible step.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoItem {
    pub action: UndoAction,

    /// Added/deleted annotation, or for edits the state on the other side of the swap
    pub annotation: Annotation,

    pub page_num: u32,

    /// Table cells deleted together with `annotation`
    pub cascade: Vec<Annotation>,

    /// Annotations whose `children` were stripped by the delete, as they were before
    pub parents: Vec<Annotation>,
}

impl UndoItem {
    pub fn new(action: UndoAction, page_num: u32, annotation: Annotation) -> Self {
        Self { action, annotation, page_num, cascade: Vec::new(), parents: Vec::new() }
    }
}

#[derive(Debug, Default, Clone)]
pub struct UndoHistory {
    items: Vec<UndoItem>,
    pointer: Option<usize>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    pub fn items(&self) -> &[UndoItem] {
        &self.items
    }

    pub fn can_undo(&self) -> bool {
        match self.pointer {
            None => !self.items.is_empty(),
            Some(index) => index > 0,
        }
    }

    pub fn can_redo(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.pointer = None;
    }

    /// Append a step, discarding anything that was undone.
    pub fn record(&mut self, page_num: u32, snapshot: Annotation, action: UndoAction) {
        self.push(UndoItem::new(action, page_num, snapshot));
    }

    /// Record a delete together with its cascade and stripped parents.
    pub fn record_deletion(&mut self, page_num: u32, deletion: &Deletion) {
        let Some(target) = deletion.target() else {
            return;
        };

        let mut item = UndoItem::new(UndoAction::Delete, page_num, target.clone());
        item.cascade = deletion.cascaded().to_vec();
        item.parents = deletion.parents_before.clone();
        self.push(item);
    }

    fn push(&mut self, item: UndoItem) {
        if let Some(pointer) = self.pointer.take() {
            self.items.truncate(pointer);
        }
        self.items.push(item);
    }

    /// Revert the most recent step that is not undone yet.
    ///
    /// Returns the affected page, or `None` when there is nothing to undo.
    pub fn undo(&mut self, store: &mut AnnotationStore) -> Option<u32> {
        let index = match self.pointer {
            None => self.items.len().checked_sub(1)?,
            Some(0) => return None,
            Some(pointer) => pointer - 1,
        };
        self.pointer = Some(index);

        let item = &mut self.items[index];
        tracing::debug!(index, action = ?item.action, page_num = item.page_num, "undo");

        match item.action {
            UndoAction::Add => {
                if let Some(live) = store.take(item.page_num, &item.annotation.id) {
                    item.annotation = live;
                }
            }
            UndoAction::Delete => {
                store.restore(item.page_num, item.annotation.clone());
                for cell in &item.cascade {
                    store.restore(item.page_num, cell.clone());
                }
                for parent in &mut item.parents {
                    if let Some(stripped) = store.replace(item.page_num, parent.clone()) {
                        *parent = stripped;
                    }
                }
            }
            UndoAction::Edit => swap(store, item),
        }

        Some(item.page_num)
    }

    /// Re-apply the earliest undone step.
    ///
    /// Returns the affected page, or `None` when there is nothing to redo.
    pub fn redo(&mut self, store: &mut AnnotationStore) -> Option<u32> {
        let index = self.pointer?;
        let item = &mut self.items[index];
        tracing::debug!(index, action = ?item.action, page_num = item.page_num, "redo");

        match item.action {
            UndoAction::Add => store.restore(item.page_num, item.annotation.clone()),
            UndoAction::Delete => {
                let deletion = store.delete(item.page_num, &item.annotation.id);
                if let Some(target) = deletion.target() {
                    item.annotation = target.clone();
                    item.cascade = deletion.cascaded().to_vec();
                    item.parents = deletion.parents_before;
                }
            }
            UndoAction::Edit => swap(store, item),
        }

        let page_num = item.page_num;
        self.pointer = if index + 1 >= self.items.len() { None } else { Some(index + 1) };
        Some(page_num)
    }
}

/// Put the stored snapshot live and keep the displaced state in the slot,
/// so the same item can be applied again in the other direction.
fn swap(store: &mut AnnotationStore, item: &mut UndoItem) {
    if let Some(live) = store.replace(item.page_num, item.annotation.clone()) {
        item.annotation = live;
    } else {
        tracing::warn!(
            page_num = item.page_num,
            id = %item.annotation.id,
            "edit replay target missing"
        );
    }
}
