use std::collections::VecDeque;

/// Bounded undo/redo stacks of whole answer snapshots.
///
/// The oldest undo entry is dropped once `limit` is reached. Recording a new
/// snapshot always clears the redo stack.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Push the state that is about to be replaced.
    pub fn record(&mut self, previous: T) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(previous);
        self.redo.clear();
    }

    /// Swap `current` for the last recorded state. `None` when nothing to undo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_on_empty_history_returns_none() {
        let mut history: History<i32> = History::new(5);
        assert_eq!(history.undo(1), None);
        assert_eq!(history.redo(1), None);
    }

    #[test]
    fn undo_then_redo_restores_state() {
        let mut history = History::new(5);
        history.record(0);

        let previous = history.undo(1).expect("one entry to undo");
        assert_eq!(previous, 0);
        assert!(history.can_redo());

        let next = history.redo(previous).expect("one entry to redo");
        assert_eq!(next, 1);
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn record_clears_redo() {
        let mut history = History::new(5);
        history.record(0);
        history.undo(1);
        history.record(0);

        assert!(!history.can_redo());
    }

    #[test]
    fn oldest_entries_are_dropped_at_limit() {
        let mut history = History::new(2);
        history.record(0);
        history.record(1);
        history.record(2);

        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), Some(1));
        assert_eq!(history.undo(1), None);
    }

    #[test]
    fn zero_limit_is_raised_to_one() {
        let history: History<i32> = History::new(0);
        assert_eq!(history.limit(), 1);
    }
}
