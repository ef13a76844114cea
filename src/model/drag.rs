use chrono::{DateTime, Utc};
use egui::Pos2;
use uuid::Uuid;

use super::task::Task;

/// What part of the task the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeStart,
    ResizeEnd,
    Reassign,
}

/// In-progress pointer drag over a task.
///
/// Created on drag start, mutated on every pointer move, and consumed
/// exactly once on commit (or discarded on cancel). Never outlives the
/// drag session.
#[derive(Debug, Clone)]
pub struct DragState {
    pub kind: DragKind,
    pub task_id: Uuid,
    /// Snapshot of the task at drag start.
    pub original: Task,
    pub preview_start: DateTime<Utc>,
    pub preview_end: DateTime<Utc>,
    pub preview_resource: Uuid,
    /// Tasks on the preview resource overlapping the preview interval.
    pub collisions: Vec<Uuid>,
    /// Incident dependency ids violated by the preview times.
    pub violations: Vec<Uuid>,
    /// Raw pointer position, surface-relative pixels.
    pub pointer: Pos2,
}

impl DragState {
    pub fn begin(kind: DragKind, task: &Task, pointer: Pos2) -> Self {
        Self {
            kind,
            task_id: task.id,
            original: task.clone(),
            preview_start: task.start_time,
            preview_end: task.end_time(),
            preview_resource: task.resource_id,
            collisions: Vec::new(),
            violations: Vec::new(),
            pointer,
        }
    }

    /// True once the preview differs from the original snapshot.
    pub fn has_moved(&self) -> bool {
        self.preview_start != self.original.start_time
            || self.preview_end != self.original.end_time()
            || self.preview_resource != self.original.resource_id
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}
