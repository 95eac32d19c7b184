//! Per-page validation status for the single-validator workflow.
//!
//! A page sits in exactly one of four states. `touched` is tracked
//! separately: it records pages the validator acted on since the last save,
//! independent of annotation edits (which live in the store's modified set).

use crate::api::ValidatedPageSummary;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    NotProcessed,
    Valid,
    Invalid,
    Edited,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageValidation {
    not_processed: BTreeSet<u32>,
    valid: BTreeSet<u32>,
    invalid: BTreeSet<u32>,
    edited: BTreeSet<u32>,
    touched: BTreeSet<u32>,
    seeded: bool,
}

impl PageValidation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every status set from a backend summary. `touched` is kept.
    pub fn seed(&mut self, summary: &ValidatedPageSummary) {
        self.valid = summary.validated.iter().copied().collect();
        self.invalid = summary.failed_validation_pages.iter().copied().collect();
        self.not_processed = summary
            .not_processed
            .iter()
            .copied()
            .filter(|page| !self.valid.contains(page) && !self.invalid.contains(page))
            .collect();
        self.edited.clear();
        self.seeded = true;
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn status(&self, page_num: u32) -> PageStatus {
        if self.valid.contains(&page_num) {
            PageStatus::Valid
        } else if self.invalid.contains(&page_num) {
            PageStatus::Invalid
        } else if self.edited.contains(&page_num) {
            PageStatus::Edited
        } else {
            PageStatus::NotProcessed
        }
    }

    pub fn valid(&self) -> &BTreeSet<u32> {
        &self.valid
    }

    pub fn invalid(&self) -> &BTreeSet<u32> {
        &self.invalid
    }

    pub fn edited(&self) -> &BTreeSet<u32> {
        &self.edited
    }

    pub fn not_processed(&self) -> &BTreeSet<u32> {
        &self.not_processed
    }

    pub fn touched(&self) -> &BTreeSet<u32> {
        &self.touched
    }

    pub fn mark_valid(&mut self, page_num: u32) {
        self.move_to(page_num, PageStatus::Valid);
    }

    pub fn mark_invalid(&mut self, page_num: u32) {
        self.move_to(page_num, PageStatus::Invalid);
    }

    /// invalid → edited. Other states are left alone.
    pub fn start_edit(&mut self, page_num: u32) -> bool {
        self.transition(page_num, PageStatus::Invalid, PageStatus::Edited)
    }

    /// edited → invalid.
    pub fn cancel_edit(&mut self, page_num: u32) -> bool {
        self.transition(page_num, PageStatus::Edited, PageStatus::Invalid)
    }

    /// edited → valid, once the corrections are accepted.
    pub fn finish_edit(&mut self, page_num: u32) -> bool {
        self.transition(page_num, PageStatus::Edited, PageStatus::Valid)
    }

    fn transition(&mut self, page_num: u32, from: PageStatus, to: PageStatus) -> bool {
        if self.status(page_num) != from {
            tracing::debug!(
                page_num,
                ?from,
                ?to,
                actual = ?self.status(page_num),
                "validation transition ignored"
            );
            return false;
        }
        self.move_to(page_num, to);
        true
    }

    fn move_to(&mut self, page_num: u32, status: PageStatus) {
        self.not_processed.remove(&page_num);
        self.valid.remove(&page_num);
        self.invalid.remove(&page_num);
        self.edited.remove(&page_num);

        match status {
            PageStatus::NotProcessed => self.not_processed.insert(page_num),
            PageStatus::Valid => self.valid.insert(page_num),
            PageStatus::Invalid => self.invalid.insert(page_num),
            PageStatus::Edited => self.edited.insert(page_num),
        };
        self.touched.insert(page_num);
    }

    pub fn clear_touched(&mut self) {
        self.touched.clear();
    }

    /// Every page has a verdict and no edit is left open.
    pub fn can_finish_validation(&self) -> bool {
        self.not_processed.is_empty() && self.edited.is_empty()
    }

    pub fn save_enabled(&self, modified_pages: &BTreeSet<u32>) -> bool {
        !self.touched.is_empty() || !modified_pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> PageValidation {
        let mut validation = PageValidation::new();
        validation.seed(&ValidatedPageSummary {
            validated: vec![1],
            failed_validation_pages: vec![2],
            not_processed: vec![3, 4],
        });
        validation
    }

    #[test]
    fn each_page_has_exactly_one_status() {
        let mut validation = seeded();
        validation.mark_valid(3);
        validation.mark_invalid(1);

        assert_eq!(validation.status(1), PageStatus::Invalid);
        assert_eq!(validation.status(3), PageStatus::Valid);
        assert!(!validation.valid().contains(&1));
        assert!(!validation.not_processed().contains(&3));
        assert_eq!(validation.touched(), &BTreeSet::from([1, 3]));
    }

    #[test]
    fn edit_cycle_moves_between_invalid_and_edited() {
        let mut validation = seeded();

        assert!(!validation.start_edit(1));
        assert!(validation.start_edit(2));
        assert_eq!(validation.status(2), PageStatus::Edited);
        assert!(!validation.invalid().contains(&2));

        assert!(validation.cancel_edit(2));
        assert_eq!(validation.status(2), PageStatus::Invalid);

        validation.start_edit(2);
        assert!(validation.finish_edit(2));
        assert_eq!(validation.status(2), PageStatus::Valid);
    }

    #[test]
    fn finish_requires_no_open_pages() {
        let mut validation = seeded();
        assert!(!validation.can_finish_validation());

        validation.mark_valid(3);
        validation.mark_invalid(4);
        assert!(validation.can_finish_validation());

        validation.start_edit(4);
        assert!(!validation.can_finish_validation());
    }

    #[test]
    fn save_gate_uses_touched_or_modified() {
        let mut validation = seeded();
        assert!(!validation.save_enabled(&BTreeSet::new()));
        assert!(validation.save_enabled(&BTreeSet::from([9])));

        validation.mark_valid(3);
        assert!(validation.save_enabled(&BTreeSet::new()));

        validation.clear_touched();
        assert!(!validation.save_enabled(&BTreeSet::new()));
        assert_eq!(validation.status(3), PageStatus::Valid);
    }
}
