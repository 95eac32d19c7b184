use serde::{Deserialize, Serialize};

/// Inclusive window of page indices.
///
/// Either `begin <= end`, or both are `-1` for an unset window. The same type
/// describes the rendered window, the window being loaded and the cached
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    begin: i64,
    end: i64,
}

impl Default for Range {
    fn default() -> Self {
        Self::empty()
    }
}

impl Range {
    pub const UNSET: i64 = -1;

    pub const fn empty() -> Self {
        Self { begin: Self::UNSET, end: Self::UNSET }
    }

    /// Build a window over `[begin, end]`. Reversed bounds are swapped.
    pub fn new(begin: usize, end: usize) -> Self {
        let (begin, end) = if begin <= end { (begin, end) } else { (end, begin) };
        Self { begin: saturating_index(begin), end: saturating_index(end) }
    }

    pub fn begin(&self) -> i64 {
        self.begin
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.begin == Self::UNSET
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end - self.begin + 1) as usize
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        !self.is_empty() && (index as i64) >= self.begin && (index as i64) <= self.end
    }

    /// Smallest window covering both. An unset side is ignored.
    pub fn union(&self, other: &Range) -> Range {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Range { begin: self.begin.min(other.begin), end: self.end.max(other.end) },
        }
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        if self.is_empty() {
            0..0
        } else {
            self.begin as usize..(self.end as usize).saturating_add(1)
        }
    }
}

fn saturating_index(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_contains_nothing() {
        let range = Range::empty();
        assert!(range.is_empty());
        assert_eq!(range.begin(), -1);
        assert_eq!(range.end(), -1);
        assert!(!range.contains(0));
        assert_eq!(range.len(), 0);
        assert_eq!(range.indices().count(), 0);
    }

    #[test]
    fn reversed_bounds_are_normalised() {
        let range = Range::new(7, 3);
        assert_eq!((range.begin(), range.end()), (3, 7));
        assert_eq!(range.len(), 5);
    }

    #[test]
    fn huge_bounds_saturate_instead_of_wrapping() {
        let range = Range::new(0, usize::MAX);
        assert!(!range.is_empty());
        assert_eq!(range.end(), i64::MAX);
        assert!(range.contains(5));
        assert_eq!(range.indices().take(3).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn union_ignores_unset_side() {
        let window = Range::new(2, 5);
        assert_eq!(window.union(&Range::empty()), window);
        assert_eq!(Range::empty().union(&window), window);
        assert_eq!(window.union(&Range::new(4, 9)), Range::new(2, 9));
    }
}
