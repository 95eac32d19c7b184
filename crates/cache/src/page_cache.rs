//! Windowed page cache with range-merging eviction
//!
//! Holds the pages of one paginated feed. Each successful fetch is merged
//! against the windows as they are when it completes: rendered pages prefer
//! the freshest copy, freshly fetched pages of the current load are kept as
//! prefetch, and everything else is dropped.

use crate::window::WindowState;
use doc_model::{PageNumbered, Range};
use std::collections::{BTreeMap, BTreeSet};

/// Statistics about merges performed by a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of fetch results merged
    pub merges: u64,

    /// Number of fetches adopted wholesale (no prior data)
    pub adoptions: u64,

    /// Number of pages dropped because they left both windows
    pub evictions: u64,
}

/// What a merge kept and what it dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Page numbers present after the merge
    pub kept: BTreeSet<u32>,

    /// Page numbers that were cached or fetched but are no longer present
    pub evicted: BTreeSet<u32>,
}

impl MergeOutcome {
    pub fn is_evicted(&self, page_num: u32) -> bool {
        self.evicted.contains(&page_num)
    }
}

/// Cache for one feed (annotation pages or token pages).
#[derive(Debug, Clone)]
pub struct PageCache<P> {
    /// `None` until the first successful fetch
    pages: Option<BTreeMap<u32, P>>,

    /// Union of the rendered and loading windows at the last merge
    cached_range: Range,

    stats: CacheStats,
}

impl<P> Default for PageCache<P> {
    fn default() -> Self {
        Self { pages: None, cached_range: Range::empty(), stats: CacheStats::default() }
    }
}

impl<P: PageNumbered> PageCache<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.pages.is_some()
    }

    pub fn cached_range(&self) -> Range {
        self.cached_range
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn get(&self, page_num: u32) -> Option<&P> {
        self.pages.as_ref()?.get(&page_num)
    }

    /// Cached pages in page-number order.
    pub fn pages(&self) -> impl Iterator<Item = &P> {
        self.pages.iter().flat_map(|pages| pages.values())
    }

    pub fn page_numbers(&self) -> BTreeSet<u32> {
        self.pages.as_ref().map(|pages| pages.keys().copied().collect()).unwrap_or_default()
    }

    /// Merge a successful fetch.
    ///
    /// `window` must be read at the moment the fetch completes, never
    /// captured when the fetch was issued. `page_numbers` is the document's
    /// full page-number list, indexed by the window ranges.
    pub fn merge(
        &mut self,
        fetched: Vec<P>,
        window: &WindowState,
        page_numbers: &[u32],
    ) -> MergeOutcome {
        self.cached_range = window.available_rendered.union(&window.next_loading);
        self.stats.merges += 1;

        let Some(old) = self.pages.take() else {
            let adopted: BTreeMap<u32, P> =
                fetched.into_iter().map(|page| (page.page_num(), page)).collect();
            self.stats.adoptions += 1;
            let outcome =
                MergeOutcome { kept: adopted.keys().copied().collect(), evicted: BTreeSet::new() };
            self.pages = Some(adopted);
            return outcome;
        };

        let keep = window.pages_to_keep(page_numbers);
        let loading = window.pages_loading(page_numbers);
        let mut evicted: BTreeSet<u32> = BTreeSet::new();
        let mut merged: BTreeMap<u32, P> = BTreeMap::new();

        for (page_num, page) in old {
            if keep.contains(&page_num) {
                merged.insert(page_num, page);
            } else {
                evicted.insert(page_num);
            }
        }

        for page in fetched {
            let page_num = page.page_num();
            if keep.contains(&page_num) || loading.contains(&page_num) {
                evicted.remove(&page_num);
                merged.insert(page_num, page);
            } else {
                evicted.insert(page_num);
            }
        }

        self.stats.evictions += evicted.len() as u64;
        tracing::debug!(kept = merged.len(), evicted = evicted.len(), "merged fetched pages");

        let outcome = MergeOutcome { kept: merged.keys().copied().collect(), evicted };
        self.pages = Some(merged);
        outcome
    }

    /// Replace one cached page in place, e.g. after a save round-trip.
    pub fn put(&mut self, page: P) {
        self.pages.get_or_insert_with(BTreeMap::new).insert(page.page_num(), page);
    }

    pub fn clear(&mut self) {
        self.pages = None;
        self.cached_range = Range::empty();
    }
}
