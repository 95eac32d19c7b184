use crate::config::LoaderConfig;
use doc_model::Range;
use std::collections::BTreeSet;

/// The two moving windows both feeds are merged against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowState {
    /// Page indices currently rendered
    pub available_rendered: Range,

    /// Page indices of the most recently requested load
    pub next_loading: Range,
}

impl WindowState {
    /// Page numbers at the rendered indices, limited to pages the document has.
    pub fn pages_to_keep(&self, page_numbers: &[u32]) -> BTreeSet<u32> {
        pages_at(&self.available_rendered, page_numbers)
    }

    /// Page numbers at the indices of the load currently in flight.
    pub fn pages_loading(&self, page_numbers: &[u32]) -> BTreeSet<u32> {
        pages_at(&self.next_loading, page_numbers)
    }
}

fn pages_at(range: &Range, page_numbers: &[u32]) -> BTreeSet<u32> {
    range.indices().map_while(|index| page_numbers.get(index).copied()).collect()
}

/// Chooses which page indices to request next.
#[derive(Debug, Clone)]
pub struct WindowPlanner {
    page_window: usize,
    prefetch_pages: usize,
}

impl WindowPlanner {
    pub fn new(config: &LoaderConfig) -> Self {
        Self { page_window: config.page_window.max(1), prefetch_pages: config.prefetch_pages }
    }

    /// Indices on screen when `first_visible` is the top page.
    pub fn visible_window(&self, first_visible: usize, page_count: usize) -> Range {
        match page_count.checked_sub(1) {
            Some(max) => {
                let first = first_visible.min(max);
                Range::new(first, first.saturating_add(self.page_window - 1).min(max))
            }
            None => Range::empty(),
        }
    }

    /// Window starting at the first visible index, widened by the prefetch
    /// margin on both sides and clamped to the document.
    pub fn next_window(&self, first_visible: usize, page_count: usize) -> Range {
        if page_count == 0 {
            return Range::empty();
        }

        let max = page_count - 1;
        let first = first_visible.min(max);
        let begin = first.saturating_sub(self.prefetch_pages);
        let end = first
            .saturating_add(self.page_window - 1)
            .saturating_add(self.prefetch_pages)
            .min(max);

        Range::new(begin, end)
    }

    /// Whether `first_visible` moved close enough to the edge of `cached`
    /// that the next window should be requested.
    pub fn needs_load(&self, cached: &Range, first_visible: usize, page_count: usize) -> bool {
        if page_count == 0 {
            return false;
        }
        if cached.is_empty() {
            return true;
        }

        let wanted = self.next_window(first_visible, page_count);
        wanted.indices().any(|index| !cached.contains(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_window_is_widened_and_clamped() {
        let planner = WindowPlanner::new(&LoaderConfig::new(3, 1));

        assert_eq!(planner.next_window(5, 20), Range::new(4, 8));
        assert_eq!(planner.next_window(0, 20), Range::new(0, 3));
        assert_eq!(planner.next_window(19, 20), Range::new(18, 19));
        assert!(planner.next_window(0, 0).is_empty());
    }

    #[test]
    fn visible_window_has_no_prefetch_margin() {
        let planner = WindowPlanner::new(&LoaderConfig::new(3, 1));

        assert_eq!(planner.visible_window(5, 20), Range::new(5, 7));
        assert_eq!(planner.visible_window(19, 20), Range::new(19, 19));
        assert_eq!(planner.visible_window(40, 20), Range::new(19, 19));
        assert!(planner.visible_window(0, 0).is_empty());
    }

    #[test]
    fn needs_load_only_when_window_leaves_cache() {
        let planner = WindowPlanner::new(&LoaderConfig::new(2, 0));
        let cached = Range::new(0, 4);

        assert!(!planner.needs_load(&cached, 2, 10));
        assert!(planner.needs_load(&cached, 4, 10));
        assert!(planner.needs_load(&Range::empty(), 0, 10));
    }

    #[test]
    fn pages_to_keep_maps_indices_to_page_numbers() {
        let window =
            WindowState { available_rendered: Range::new(1, 3), next_loading: Range::empty() };
        assert_eq!(window.pages_to_keep(&[10, 20, 30]), BTreeSet::from([20, 30]));
        assert!(WindowState::default().pages_to_keep(&[10, 20]).is_empty());

        let huge = WindowState {
            available_rendered: Range::empty(),
            next_loading: Range::new(1, usize::MAX),
        };
        assert_eq!(huge.pages_loading(&[10, 20, 30]), BTreeSet::from([20, 30]));
    }
}
