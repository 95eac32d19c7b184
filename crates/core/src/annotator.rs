//! Task annotator
//!
//! Single source of truth for one open task. Owns the store, history,
//! validation state, split review, category catalog and the document data
//! cache, and talks to the backend through [`AnnotationBackend`].
//!
//! Every user-facing mutation goes through here so it is recorded exactly
//! once. Undo and redo replay through the history, which does not record.

use crate::api::{
    AnnotationBackend, AnnotationsResponse, RevisionSelector, SaveAck, SaveRequest,
    ValidatedPageSummary,
};
use crate::catalog::CategoryCatalog;
use crate::clipboard::Clipboard;
use crate::error::{AnnotatorError, AnnotatorResult};
use crate::ids::TimestampIds;
use crate::links::{resolve_link_points, LinkSegment};
use crate::loader::{fetch_window, FetchedWindow};
use crate::settings::TaskSettings;
use crate::split::SplitReview;
use crate::store::{AnnotationStore, Selection};
use crate::tokens::{scale_ratio, scale_tokens};
use crate::undo::{UndoAction, UndoHistory};
use crate::validation::{PageStatus, PageValidation};
use annotator_cache::{DocumentDataCache, LoadRequest, LoaderConfig, MergeOutcome, WindowPlanner};
use doc_model::{
    Annotation, AnnotationChanges, AnnotationId, Category, Link, Page, Range, Token, TokenPage,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct TaskAnnotator {
    settings: TaskSettings,
    config: LoaderConfig,
    backend: Arc<dyn AnnotationBackend>,
    store: AnnotationStore,
    history: UndoHistory,
    catalog: CategoryCatalog,
    validation: PageValidation,
    split: SplitReview,
    cache: DocumentDataCache,
    clipboard: Clipboard,
    ids: TimestampIds,
    revision: Option<String>,
    current_page: Option<u32>,
}

impl TaskAnnotator {
    pub fn new(
        settings: TaskSettings,
        config: LoaderConfig,
        backend: Arc<dyn AnnotationBackend>,
        page_numbers: Vec<u32>,
    ) -> Self {
        Self {
            settings,
            config,
            backend,
            store: AnnotationStore::new(),
            history: UndoHistory::new(),
            catalog: CategoryCatalog::default(),
            validation: PageValidation::new(),
            split: SplitReview::new(),
            cache: DocumentDataCache::new(page_numbers),
            clipboard: Clipboard::new(),
            ids: TimestampIds::new(),
            revision: None,
            current_page: None,
        }
    }

    pub fn settings(&self) -> &TaskSettings {
        &self.settings
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn cache(&self) -> &DocumentDataCache {
        &self.cache
    }

    pub fn validation(&self) -> &PageValidation {
        &self.validation
    }

    pub fn split_review(&self) -> &SplitReview {
        &self.split
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.catalog.replace(categories);
    }

    pub fn page_annotations(&self, page_num: u32) -> &[Annotation] {
        self.store.page(page_num)
    }

    /// Tokens of a page in annotation-page coordinates.
    pub fn page_tokens(&self, page_num: u32) -> Vec<Token> {
        let Some(token_page) = self.cache.token_page(page_num) else {
            return Vec::new();
        };
        let annotation_size = self
            .cache
            .annotation_page(page_num)
            .map(|page| page.size)
            .unwrap_or(token_page.size);
        scale_tokens(&token_page.objs, scale_ratio(annotation_size, token_page.size))
    }

    pub fn selected(&self) -> Option<&Selection> {
        self.store.selected()
    }

    pub fn selected_annotation(&self) -> Option<&Annotation> {
        self.store.selected_annotation()
    }

    pub fn is_table_mode(&self) -> bool {
        self.store.is_table_mode()
    }

    pub fn modified_pages(&self) -> &BTreeSet<u32> {
        self.store.modified_pages()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_document_page_data_loaded(&self, index: usize) -> bool {
        self.cache.is_document_page_data_loaded(index)
    }

    pub fn page_status(&self, page_num: u32) -> PageStatus {
        self.validation.status(page_num)
    }

    pub fn can_finish_validation(&self) -> bool {
        self.validation.can_finish_validation()
    }

    pub fn save_enabled(&self) -> bool {
        self.validation.save_enabled(self.store.modified_pages())
    }

    pub fn current_page(&self) -> Option<u32> {
        self.current_page
    }

    pub fn set_current_page(&mut self, page_num: u32) {
        if self.current_page != Some(page_num) {
            self.split.clear();
        }
        self.current_page = Some(page_num);
    }

    /// Create an annotation. A known `category_id` overrides the annotation's
    /// category and seeds its data attributes.
    pub fn create(
        &mut self,
        page_num: u32,
        annotation: Annotation,
        category_id: Option<&str>,
    ) -> Annotation {
        let category = category_id.and_then(|id| self.catalog.get(id)).cloned();
        let created = self.store.create(page_num, annotation, category.as_ref());
        self.history.record(page_num, created.clone(), UndoAction::Add);
        created
    }

    /// Delete an annotation and, for tables, the cells it owns.
    /// Returns everything removed, requested annotation first.
    pub fn delete(&mut self, page_num: u32, id: &AnnotationId) -> Vec<Annotation> {
        let deletion = self.store.delete(page_num, id);
        if !deletion.is_empty() {
            self.history.record_deletion(page_num, &deletion);
        }
        deletion.removed
    }

    /// Apply `changes`. Returns the previous state, `None` when `id` is not on the page.
    pub fn modify(
        &mut self,
        page_num: u32,
        id: &AnnotationId,
        changes: &AnnotationChanges,
    ) -> Option<Annotation> {
        let previous = self.store.modify(page_num, id, changes)?;
        self.history.record(page_num, previous.clone(), UndoAction::Edit);
        Some(previous)
    }

    /// [`modify`](Self::modify) on whichever loaded page holds `id`.
    pub fn modify_anywhere(
        &mut self,
        id: &AnnotationId,
        changes: &AnnotationChanges,
    ) -> Option<u32> {
        let (page_num, previous) = self.store.modify_anywhere(id, changes)?;
        self.history.record(page_num, previous, UndoAction::Edit);
        Some(page_num)
    }

    pub fn delete_link(&mut self, page_num: u32, id: &AnnotationId, link: &Link) -> bool {
        let Some(previous) = self.store.delete_link(page_num, id, link) else {
            return false;
        };
        self.history.record(page_num, previous, UndoAction::Edit);
        true
    }

    /// Rebuild a table's cell ownership from geometry, e.g. after a resize.
    pub fn refresh_table_children(&mut self, page_num: u32, table_id: &AnnotationId) -> bool {
        let Some(previous) = self.store.recompute_table_children(page_num, table_id) else {
            return false;
        };
        self.history.record(page_num, previous, UndoAction::Edit);
        true
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.store).is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.store).is_some()
    }

    pub fn select(&mut self, page_num: u32, id: &AnnotationId) -> bool {
        self.store.select(page_num, id)
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn set_table_mode(&mut self, enabled: bool) {
        self.store.set_table_mode(enabled);
    }

    pub fn copy_selected(&mut self) -> bool {
        match self.store.selected_annotation() {
            Some(annotation) => {
                self.clipboard.copy(annotation);
                true
            }
            None => false,
        }
    }

    pub fn paste(&mut self, page_num: u32) -> Option<Annotation> {
        let pasted = self.clipboard.paste(page_num, &mut self.store, &mut self.ids)?;
        self.history.record(page_num, pasted.clone(), UndoAction::Add);
        Some(pasted)
    }

    pub fn link_segments(&self, page_num: u32, id: &AnnotationId) -> Vec<LinkSegment> {
        match self.store.get(page_num, id) {
            Some(source) => resolve_link_points(source, &self.store),
            None => Vec::new(),
        }
    }

    /// Record which page indices are rendered. Later merges keep these plus
    /// the pages fetched for the load in flight.
    pub fn set_rendered_range(&mut self, range: Range) {
        self.cache.set_available_rendered(range);
    }

    /// Start loading page indices `start..=stop`.
    pub fn begin_load(&mut self, start: usize, stop: usize) -> LoadRequest {
        let request = self.cache.begin_load(start, stop);
        tracing::debug!(
            generation = request.generation,
            pages = ?request.page_numbers,
            "loading window"
        );
        request
    }

    fn revision_selector(&self) -> RevisionSelector {
        match &self.revision {
            Some(revision) => RevisionSelector::Revision(revision.clone()),
            None => RevisionSelector::Job(self.settings.job_id),
        }
    }

    /// Load page indices `start..=stop` from both feeds and merge them.
    ///
    /// Returns once both fetches finished. On failure nothing is merged.
    pub async fn get_next_document_items(
        &mut self,
        start: usize,
        stop: usize,
    ) -> AnnotatorResult<MergeOutcome> {
        let request = self.begin_load(start, stop);
        let backend = Arc::clone(&self.backend);
        let fetched = fetch_window(
            backend.as_ref(),
            request,
            self.revision_selector(),
            self.settings.file_id,
            Some(self.settings.user_id.clone()),
        )
        .await;

        self.complete_fetched(fetched)
    }

    /// Window the planner would load for `first_visible`, or `None` when the
    /// cache already covers it.
    pub fn plan_window(&self, first_visible: usize) -> Option<Range> {
        let planner = WindowPlanner::new(&self.config);
        let page_count = self.cache.page_count();
        let cached = self.cache.annotations().cached_range();
        planner
            .needs_load(&cached, first_visible, page_count)
            .then(|| planner.next_window(first_visible, page_count))
    }

    /// Scroll to `first_visible`: mark the on-screen pages as rendered, then
    /// load the planned window around them if the cache does not cover it yet.
    pub async fn load_visible(
        &mut self,
        first_visible: usize,
    ) -> AnnotatorResult<Option<MergeOutcome>> {
        let page_count = self.cache.page_count();
        let visible = WindowPlanner::new(&self.config).visible_window(first_visible, page_count);
        self.set_rendered_range(visible);

        let Some(window) = self.plan_window(first_visible) else {
            return Ok(None);
        };
        let (Ok(start), Ok(stop)) =
            (usize::try_from(window.begin()), usize::try_from(window.end()))
        else {
            return Ok(None);
        };
        self.get_next_document_items(start, stop).await.map(Some)
    }

    fn complete_fetched(&mut self, fetched: FetchedWindow) -> AnnotatorResult<MergeOutcome> {
        let FetchedWindow { request, annotations, tokens } = fetched;
        match (annotations, tokens) {
            (Ok(annotations), Ok(tokens)) => Ok(self.complete_load(&request, annotations, tokens)),
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!(generation = request.generation, %error, "window fetch failed");
                Err(AnnotatorError::from_fetch(error))
            }
        }
    }

    /// Merge a finished load against the windows as they are now.
    ///
    /// Seeds the store with fetched pages that stay cached, evicts pages that
    /// left the window and deselects an annotation whose page was evicted.
    pub fn complete_load(
        &mut self,
        request: &LoadRequest,
        response: AnnotationsResponse,
        tokens: Vec<TokenPage>,
    ) -> MergeOutcome {
        let superseded = self.cache.is_superseded(request);
        if superseded {
            tracing::debug!(
                generation = request.generation,
                current = self.cache.generation(),
                "merging superseded load"
            );
        }
        if !superseded || self.revision.is_none() {
            self.revision = Some(response.revision.clone());
        }
        if !self.validation.is_seeded() {
            self.seed_validation(&response);
        }

        let fetched: Vec<u32> = response.pages.iter().map(|page| page.page_num).collect();
        let outcome = self.cache.merge_annotations(response.pages);
        self.cache.merge_tokens(tokens);

        for page_num in fetched.into_iter().filter(|page_num| outcome.kept.contains(page_num)) {
            if let Some(page) = self.cache.annotation_page(page_num) {
                self.store.seed_page(page_num, page.objs.clone());
            }
        }
        self.store.evict_pages(&outcome.evicted);

        let selection_evicted = self
            .store
            .selected()
            .is_some_and(|selection| outcome.is_evicted(selection.page_num));
        if selection_evicted && !self.config.keep_selection_on_evict {
            tracing::debug!("selected annotation's page was evicted");
            self.store.clear_selection();
        }

        outcome
    }

    fn seed_validation(&mut self, response: &AnnotationsResponse) {
        let decided: BTreeSet<u32> =
            response.validated.iter().chain(&response.failed_validation_pages).copied().collect();
        let summary = ValidatedPageSummary {
            validated: response.validated.clone(),
            failed_validation_pages: response.failed_validation_pages.clone(),
            not_processed: self
                .cache
                .page_numbers()
                .iter()
                .copied()
                .filter(|page| !decided.contains(page))
                .collect(),
        };
        self.validation.seed(&summary);
    }

    pub fn mark_valid(&mut self, page_num: u32) {
        self.validation.mark_valid(page_num);
    }

    pub fn mark_invalid(&mut self, page_num: u32) {
        self.validation.mark_invalid(page_num);
    }

    pub fn start_edit(&mut self, page_num: u32) -> bool {
        self.validation.start_edit(page_num)
    }

    pub fn cancel_edit(&mut self, page_num: u32) -> bool {
        self.validation.cancel_edit(page_num)
    }

    pub fn finish_edit(&mut self, page_num: u32) -> bool {
        self.validation.finish_edit(page_num)
    }

    pub async fn refresh_validation_summary(&mut self) -> AnnotatorResult<()> {
        let backend = Arc::clone(&self.backend);
        let summary = backend
            .fetch_validated_page_summary(self.settings.task_id)
            .await
            .map_err(|error| {
                tracing::warn!(%error, "validation summary fetch failed");
                AnnotatorError::from_fetch(error)
            })?;
        self.validation.seed(&summary);
        Ok(())
    }

    /// Save modified pages and validation verdicts against the loaded revision.
    ///
    /// On success the touched and modified sets are cleared and the new
    /// revision is adopted. On failure, including a revision conflict,
    /// local state is left exactly as it was.
    pub async fn save(&mut self) -> AnnotatorResult<SaveAck> {
        let base_revision = self.revision.clone().ok_or(AnnotatorError::NoRevision)?;
        let request = self.save_request(base_revision);
        let saved_pages = request.pages.clone();
        let backend = Arc::clone(&self.backend);

        let ack = backend.save_annotations(request).await.map_err(|error| {
            tracing::warn!(%error, "save failed");
            AnnotatorError::from_save(error)
        })?;

        tracing::info!(revision = %ack.revision, "annotations saved");
        self.revision = Some(ack.revision.clone());
        for page in saved_pages {
            self.cache.put_annotation_page(page);
        }
        self.store.clear_modified();
        self.validation.clear_touched();
        Ok(ack)
    }

    fn save_request(&self, base_revision: String) -> SaveRequest {
        let pages = self
            .store
            .pages_for_save()
            .into_iter()
            .map(|(page_num, objs)| {
                let size = self
                    .cache
                    .annotation_page(page_num)
                    .map(|page| page.size)
                    .unwrap_or_default();
                Page::new(page_num, size, objs)
            })
            .collect();

        SaveRequest {
            task_id: self.settings.task_id,
            pages,
            user_id: self.settings.user_id.clone(),
            base_revision,
            validated: self.validation.valid().iter().copied().collect(),
            failed_validation_pages: self.validation.invalid().iter().copied().collect(),
        }
    }

    /// Load other annotators' work for the current page. Does nothing unless
    /// the task uses extensive-coverage validation.
    pub async fn load_other_annotators(&mut self) -> AnnotatorResult<()> {
        if !self.settings.validation_type.is_split() {
            return Ok(());
        }
        let Some(page_num) = self.current_page else {
            return Ok(());
        };

        let backend = Arc::clone(&self.backend);
        let others = backend
            .fetch_other_annotators(self.settings.file_id, self.settings.job_id, vec![page_num])
            .await
            .map_err(|error| {
                tracing::warn!(page_num, %error, "other annotators fetch failed");
                AnnotatorError::from_fetch(error)
            })?;

        // The current page may have moved while the fetch was in flight.
        if self.current_page == Some(page_num) {
            self.split.load(page_num, others);
        }
        Ok(())
    }

    pub fn promote_annotation(
        &mut self,
        user_id: &str,
        source_id: &AnnotationId,
    ) -> Option<Annotation> {
        let page_num = self.current_page?;
        let promoted = self.split.promote_annotation(
            page_num,
            user_id,
            source_id,
            &mut self.store,
            &mut self.ids,
        )?;
        self.history.record(page_num, promoted.clone(), UndoAction::Add);
        Some(promoted)
    }

    pub fn promote_link(&mut self, user_id: &str, source_id: &AnnotationId, link: &Link) -> bool {
        let Some(page_num) = self.current_page else {
            return false;
        };
        let Some((page_num, previous)) =
            self.split.promote_link(page_num, user_id, source_id, link, &mut self.store)
        else {
            return false;
        };
        self.history.record(page_num, previous, UndoAction::Edit);
        true
    }
}
