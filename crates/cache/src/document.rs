//! Paired annotation/token caches for one open document
//!
//! Both feeds share the page-number list and the window state. A page index
//! only counts as loaded when both caches cover it, since rendering needs the
//! annotations and the tokens.

use crate::page_cache::{MergeOutcome, PageCache};
use crate::window::WindowState;
use doc_model::{Page, Range, TokenPage};

/// A window load that has been started but not yet merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Monotonic load counter; older requests may complete after newer ones
    pub generation: u64,

    /// Requested page-index window
    pub range: Range,

    /// Page numbers covered by `range`
    pub page_numbers: Vec<u32>,
}

impl LoadRequest {
    pub fn is_empty(&self) -> bool {
        self.page_numbers.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DocumentDataCache {
    page_numbers: Vec<u32>,
    window: WindowState,
    annotations: PageCache<Page>,
    tokens: PageCache<TokenPage>,
    generation: u64,
}

impl DocumentDataCache {
    pub fn new(page_numbers: Vec<u32>) -> Self {
        Self { page_numbers, ..Self::default() }
    }

    pub fn page_numbers(&self) -> &[u32] {
        &self.page_numbers
    }

    pub fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    pub fn page_number_at(&self, index: usize) -> Option<u32> {
        self.page_numbers.get(index).copied()
    }

    pub fn index_of(&self, page_num: u32) -> Option<usize> {
        self.page_numbers.iter().position(|&num| num == page_num)
    }

    /// Replace the page-number list. Cached data is dropped.
    pub fn reset(&mut self, page_numbers: Vec<u32>) {
        self.page_numbers = page_numbers;
        self.window = WindowState::default();
        self.annotations.clear();
        self.tokens.clear();
    }

    pub fn window(&self) -> WindowState {
        self.window
    }

    pub fn set_available_rendered(&mut self, range: Range) {
        self.window.available_rendered = range;
    }

    /// Record the requested window and hand back what to fetch.
    ///
    /// The window is clamped to the document; a start past the last page
    /// yields an empty request.
    pub fn begin_load(&mut self, start: usize, stop: usize) -> LoadRequest {
        self.generation += 1;
        let range = match self.page_count().checked_sub(1) {
            Some(last) if start.min(stop) <= last => Range::new(start.min(last), stop.min(last)),
            _ => Range::empty(),
        };
        self.window.next_loading = range;

        let page_numbers =
            range.indices().filter_map(|index| self.page_numbers.get(index).copied()).collect();

        LoadRequest { generation: self.generation, range, page_numbers }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a newer load was started after `request`.
    pub fn is_superseded(&self, request: &LoadRequest) -> bool {
        request.generation < self.generation
    }

    pub fn merge_annotations(&mut self, pages: Vec<Page>) -> MergeOutcome {
        let window = self.window;
        self.annotations.merge(pages, &window, &self.page_numbers)
    }

    pub fn merge_tokens(&mut self, pages: Vec<TokenPage>) -> MergeOutcome {
        let window = self.window;
        self.tokens.merge(pages, &window, &self.page_numbers)
    }

    /// Overwrite the cached copy of a page the user just saved.
    pub fn put_annotation_page(&mut self, page: Page) {
        self.annotations.put(page);
    }

    pub fn annotations(&self) -> &PageCache<Page> {
        &self.annotations
    }

    pub fn tokens(&self) -> &PageCache<TokenPage> {
        &self.tokens
    }

    pub fn annotation_page(&self, page_num: u32) -> Option<&Page> {
        self.annotations.get(page_num)
    }

    pub fn token_page(&self, page_num: u32) -> Option<&TokenPage> {
        self.tokens.get(page_num)
    }

    pub fn is_document_page_data_loaded(&self, index: usize) -> bool {
        self.annotations.cached_range().contains(index)
            && self.tokens.cached_range().contains(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::PageSize;

    fn annotation_pages(nums: &[u32]) -> Vec<Page> {
        nums.iter().map(|&num| Page::new(num, PageSize::new(100.0, 100.0), Vec::new())).collect()
    }

    fn token_pages(nums: &[u32]) -> Vec<TokenPage> {
        nums.iter().map(|&num| TokenPage::new(num, PageSize::new(50.0, 50.0), Vec::new())).collect()
    }

    #[test]
    fn begin_load_maps_indices_to_page_numbers() {
        let mut cache = DocumentDataCache::new(vec![1, 2, 3, 4]);
        let request = cache.begin_load(1, 9);

        assert_eq!(request.range, Range::new(1, 3));
        assert_eq!(request.page_numbers, vec![2, 3, 4]);
        assert_eq!(cache.window().next_loading, Range::new(1, 3));
    }

    #[test]
    fn begin_load_clamps_oversized_requests() {
        let mut cache = DocumentDataCache::new(vec![1, 2, 3]);

        let request = cache.begin_load(0, usize::MAX);
        assert_eq!(request.range, Range::new(0, 2));
        assert_eq!(request.page_numbers, vec![1, 2, 3]);

        let past_end = cache.begin_load(usize::MAX, usize::MAX);
        assert!(past_end.is_empty());
        assert!(past_end.range.is_empty());

        assert!(DocumentDataCache::new(Vec::new()).begin_load(0, 4).is_empty());
    }

    #[test]
    fn page_is_loaded_only_when_both_feeds_cover_it() {
        let mut cache = DocumentDataCache::new(vec![1, 2, 3]);
        cache.begin_load(0, 1);
        cache.merge_annotations(annotation_pages(&[1, 2]));

        assert!(!cache.is_document_page_data_loaded(0));

        cache.merge_tokens(token_pages(&[1, 2]));
        assert!(cache.is_document_page_data_loaded(0));
        assert!(cache.is_document_page_data_loaded(1));
        assert!(!cache.is_document_page_data_loaded(2));
    }

    #[test]
    fn later_load_supersedes_earlier_one() {
        let mut cache = DocumentDataCache::new(vec![1, 2, 3]);
        let first = cache.begin_load(0, 0);
        let second = cache.begin_load(1, 2);

        assert!(cache.is_superseded(&first));
        assert!(!cache.is_superseded(&second));
    }

    #[test]
    fn reset_forgets_cached_pages() {
        let mut cache = DocumentDataCache::new(vec![1]);
        cache.begin_load(0, 0);
        cache.merge_annotations(annotation_pages(&[1]));
        cache.reset(vec![1, 2]);

        assert!(cache.annotation_page(1).is_none());
        assert_eq!(cache.page_count(), 2);
        assert_eq!(cache.index_of(2), Some(1));
    }
}
