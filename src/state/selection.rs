//! Two-slot, FIFO-ordered selection of gallery images

use super::data::{ImageId, ImageRecord};

/// Mutation needs one selected image, crossover needs two
pub const MAX_SELECTED: usize = 2;

/// A change to the selection, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChange {
    pub record: ImageRecord,
    pub selected: bool,
    /// Selection size right after this change
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct Selection {
    /// Oldest selection first
    selected: Vec<ImageRecord>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.selected.iter().any(|image| image.id() == id)
    }

    /// Selected records, oldest selection first
    pub fn selected(&self) -> &[ImageRecord] {
        &self.selected
    }

    /// Select `record`. When both slots are taken the oldest selection is
    /// dropped first, so two changes come back: the old one unselected, then
    /// the new one selected.
    ///
    /// Selecting an already-selected record changes nothing.
    pub fn select(&mut self, record: ImageRecord) -> Vec<SelectionChange> {
        if self.contains(record.id()) {
            return Vec::new();
        }

        let mut changes = Vec::with_capacity(2);
        if self.selected.len() >= MAX_SELECTED {
            let oldest = self.selected.remove(0);
            changes.push(self.change(oldest, false));
        }
        self.selected.push(record.clone());
        changes.push(self.change(record, true));
        changes
    }

    /// Unselect by id; `None` if it was not selected
    pub fn unselect(&mut self, id: ImageId) -> Option<SelectionChange> {
        let index = self.selected.iter().position(|image| image.id() == id)?;
        let record = self.selected.remove(index);
        Some(self.change(record, false))
    }

    /// Unselect everything, oldest selection first
    pub fn unselect_all(&mut self) -> Vec<SelectionChange> {
        let mut changes = Vec::with_capacity(self.selected.len());
        while !self.selected.is_empty() {
            let record = self.selected.remove(0);
            changes.push(self.change(record, false));
        }
        changes
    }

    fn change(&self, record: ImageRecord, selected: bool) -> SelectionChange {
        SelectionChange {
            record,
            selected,
            count: self.selected.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::Embedding;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn record(n: usize) -> ImageRecord {
        let embedding = Arc::new(Embedding::new(vec![], vec![n as f32]));
        ImageRecord::new(embedding, PathBuf::from(format!("{n}.png")), 0.0, None, None)
    }

    fn selected(record: &ImageRecord, count: usize) -> SelectionChange {
        SelectionChange { record: record.clone(), selected: true, count }
    }

    fn unselected(record: &ImageRecord, count: usize) -> SelectionChange {
        SelectionChange { record: record.clone(), selected: false, count }
    }

    #[test]
    fn test_third_selection_evicts_first() {
        let mut selection = Selection::new();
        let (a, b, c) = (record(1), record(2), record(3));

        assert_eq!(selection.select(a.clone()), vec![selected(&a, 1)]);
        selection.select(b.clone());
        let changes = selection.select(c.clone());

        assert_eq!(
            changes,
            vec![unselected(&a, 1), selected(&c, 2)]
        );
        assert_eq!(selection.count(), 2);
        assert!(!selection.contains(a.id()));
        assert_eq!(selection.selected(), &[b, c]);
    }

    #[test]
    fn test_count_never_exceeds_two() {
        let mut selection = Selection::new();
        for n in 0..10 {
            selection.select(record(n));
            assert!(selection.count() <= MAX_SELECTED);
        }
    }

    #[test]
    fn test_unselect_missing_is_noop() {
        let mut selection = Selection::new();
        let a = record(1);
        selection.select(a.clone());

        assert!(selection.unselect(record(2).id()).is_none());
        assert_eq!(selection.unselect(a.id()), Some(unselected(&a, 0)));
        assert_eq!(selection.count(), 0);
    }

    #[test]
    fn test_reselecting_is_noop() {
        let mut selection = Selection::new();
        let a = record(1);
        selection.select(a.clone());
        assert!(selection.select(a).is_empty());
        assert_eq!(selection.count(), 1);
    }

    #[test]
    fn test_unselect_all_oldest_first() {
        let mut selection = Selection::new();
        let (a, b) = (record(1), record(2));
        selection.select(a.clone());
        selection.select(b.clone());

        assert_eq!(
            selection.unselect_all(),
            vec![unselected(&a, 1), unselected(&b, 0)]
        );
        assert_eq!(selection.count(), 0);
    }
}
