//! Multi-item selection slice.
//!
//! Selection mode is not stored separately: it is on exactly when the set of
//! selected ids is non-empty, so deselecting the last item leaves selection
//! mode.

use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection<Id: Ord> {
    ids: BTreeSet<Id>,
}

impl<Id: Ord> Default for Selection<Id> {
    fn default() -> Self {
        Self {
            ids: BTreeSet::new(),
        }
    }
}

impl<Id: Ord + Clone> Selection<Id> {
    /// Add `id` if absent, remove it if present
    pub fn toggle(&mut self, id: Id) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selection_mode(&self) -> bool {
        !self.ids.is_empty()
    }

    pub fn ids(&self) -> &BTreeSet<Id> {
        &self.ids
    }

    /// Selected ids in order
    pub fn to_vec(&self) -> Vec<Id> {
        self.ids.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_enters_and_leaves_selection_mode() {
        let mut selection = Selection::default();
        assert!(!selection.is_selection_mode());

        selection.toggle(1);
        assert!(selection.is_selection_mode());

        selection.toggle(1);
        assert!(!selection.is_selection_mode());
        assert!(selection.ids().is_empty());
    }

    #[test]
    fn test_ids_are_ordered() {
        let mut selection = Selection::default();
        selection.toggle(3);
        selection.toggle(1);

        assert_eq!(selection.to_vec(), vec![1, 3]);
        selection.clear();
        assert!(!selection.is_selection_mode());
    }

    #[test]
    fn test_mode_tracks_emptiness_for_any_sequence() {
        // Deterministic pseudo-random toggle sequence over a small id space
        let mut selection = Selection::default();
        let mut seed: u32 = 7;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let id = (seed >> 16) % 5;
            if seed % 17 == 0 {
                selection.clear();
            } else {
                selection.toggle(id);
            }
            assert_eq!(selection.is_selection_mode(), !selection.ids().is_empty());
        }
    }
}
