use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::model::{Task, TaskDependency};

/// Maximum number of undo entries kept.
pub const HISTORY_LIMIT: usize = 50;

/// A committed snapshot of the tracked collections. Viewport, selection,
/// and drag state are deliberately not part of history, so panning,
/// zooming, and selecting never consume undo entries.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub tasks: HashMap<Uuid, Task>,
    pub dependencies: Vec<TaskDependency>,
}

/// Bounded undo/redo ring over task and dependency snapshots.
#[derive(Debug, Default)]
pub struct UndoHistory {
    undo: VecDeque<HistorySnapshot>,
    redo: Vec<HistorySnapshot>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the state as it was before a mutation. Entries equal to the
    /// most recent one are dropped, so no-op mutations never pollute
    /// history. Any pending redo branch is discarded.
    pub fn push(&mut self, snapshot: HistorySnapshot) {
        if self.undo.back() == Some(&snapshot) {
            return;
        }
        self.undo.push_back(snapshot);
        if self.undo.len() > HISTORY_LIMIT {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Step back: returns the snapshot to restore, moving the current
    /// state onto the redo stack. `None` when there is nothing to undo.
    pub fn undo(
        &mut self,
        current_tasks: &HashMap<Uuid, Task>,
        current_deps: &[TaskDependency],
    ) -> Option<HistorySnapshot> {
        let snapshot = self.undo.pop_back()?;
        self.redo.push(HistorySnapshot {
            tasks: current_tasks.clone(),
            dependencies: current_deps.to_vec(),
        });
        Some(snapshot)
    }

    /// Step forward again after an undo.
    pub fn redo(
        &mut self,
        current_tasks: &HashMap<Uuid, Task>,
        current_deps: &[TaskDependency],
    ) -> Option<HistorySnapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push_back(HistorySnapshot {
            tasks: current_tasks.clone(),
            dependencies: current_deps.to_vec(),
        });
        Some(snapshot)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
