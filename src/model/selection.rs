use std::collections::HashSet;
use uuid::Uuid;

/// State related to user selection.
///
/// Tracks selected tasks and resources plus the last-selected task id,
/// which anchors range operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    pub tasks: HashSet<Uuid>,
    pub resources: HashSet<Uuid>,
    pub anchor: Option<Uuid>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.resources.clear();
        self.anchor = None;
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.resources.is_empty()
    }

    pub fn contains_task(&self, id: Uuid) -> bool {
        self.tasks.contains(&id)
    }

    /// Replace the selection with a single task.
    pub fn select_only(&mut self, id: Uuid) {
        self.tasks.clear();
        self.resources.clear();
        self.tasks.insert(id);
        self.anchor = Some(id);
    }

    /// Toggle a task in or out of the selection (modifier-click).
    pub fn toggle_task(&mut self, id: Uuid) {
        if !self.tasks.remove(&id) {
            self.tasks.insert(id);
            self.anchor = Some(id);
        } else if self.anchor == Some(id) {
            self.anchor = self.tasks.iter().next().copied();
        }
    }

    /// Replace the task selection with the given set.
    pub fn select_tasks(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.tasks = ids.into_iter().collect();
        self.anchor = self.tasks.iter().next().copied();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_and_removes() {
        let mut sel = SelectionState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        sel.toggle_task(a);
        sel.toggle_task(b);
        assert!(sel.contains_task(a) && sel.contains_task(b));
        sel.toggle_task(a);
        assert!(!sel.contains_task(a));
        assert!(sel.anchor.is_some());
    }

    #[test]
    fn select_only_replaces() {
        let mut sel = SelectionState::new();
        sel.toggle_task(Uuid::new_v4());
        let a = Uuid::new_v4();
        sel.select_only(a);
        assert_eq!(sel.tasks.len(), 1);
        assert_eq!(sel.anchor, Some(a));
    }
}
