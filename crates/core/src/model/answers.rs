use std::collections::{BTreeMap, BTreeSet};

/// Selected option indices for every touched working-set position.
///
/// Positions without an entry are unanswered. An entry may become empty when the
/// last checkbox of a multi-answer question is cleared; that also counts as
/// unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerTracker {
    selections: BTreeMap<usize, BTreeSet<usize>>,
}

impl AnswerTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection stored for `position`.
    pub fn set_answer(&mut self, position: usize, selected: BTreeSet<usize>) {
        self.selections.insert(position, selected);
    }

    #[must_use]
    pub fn answer(&self, position: usize) -> Option<&BTreeSet<usize>> {
        self.selections.get(&position)
    }

    /// Apply a click on `option` at `position`.
    ///
    /// Single-answer questions keep only the clicked option; multi-answer
    /// questions flip membership of the clicked option.
    pub fn toggle(&mut self, position: usize, option: usize, multiple: bool) {
        let entry = self.selections.entry(position).or_default();
        if multiple {
            if !entry.remove(&option) {
                entry.insert(option);
            }
        } else {
            entry.clear();
            entry.insert(option);
        }
    }

    #[must_use]
    pub fn is_answered(&self, position: usize) -> bool {
        self.selections.get(&position).is_some_and(|s| !s.is_empty())
    }

    /// Count of positions holding a non-empty selection.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.selections.values().filter(|s| !s.is_empty()).count()
    }

    /// Owned copy of the selections, in position order, for report snapshots.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<usize, Vec<usize>> {
        self.selections
            .iter()
            .map(|(position, selected)| (*position, selected.iter().copied().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_answer_toggle_replaces_selection() {
        let mut tracker = AnswerTracker::new();
        tracker.toggle(0, 1, false);
        tracker.toggle(0, 2, false);
        assert_eq!(tracker.answer(0), Some(&BTreeSet::from([2])));
    }

    #[test]
    fn multi_answer_toggle_flips_membership() {
        let mut tracker = AnswerTracker::new();
        tracker.toggle(3, 0, true);
        tracker.toggle(3, 2, true);
        tracker.toggle(3, 0, true);
        assert_eq!(tracker.answer(3), Some(&BTreeSet::from([2])));
    }

    #[test]
    fn cleared_selection_counts_as_unanswered() {
        let mut tracker = AnswerTracker::new();
        tracker.toggle(1, 0, true);
        tracker.toggle(1, 0, true);
        assert!(!tracker.is_answered(1));
        assert_eq!(tracker.answered_count(), 0);
        assert!(tracker.answer(1).is_some());
    }

    #[test]
    fn untouched_positions_are_absent() {
        let mut tracker = AnswerTracker::new();
        tracker.set_answer(4, BTreeSet::from([1, 0]));
        assert!(tracker.answer(0).is_none());
        assert_eq!(tracker.snapshot().get(&4), Some(&vec![0, 1]));
    }
}
