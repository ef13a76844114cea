use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::history::{HistorySnapshot, UndoHistory};
use crate::model::{
    DragState, GroupId, GroupingMode, GroupingState, Order, Resource, ResourceGroup,
    ScheduleSnapshot, SelectionState, Task, TaskDependency, ViewportState,
};

/// Point-in-time notification emitted to the embedder.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartEvent {
    TasksMutated,
    SelectionChanged(Vec<Uuid>),
    ViewportChanged {
        scroll_x: f32,
        scroll_y: f32,
        pixels_per_hour: f32,
    },
}

/// What changed since the engine last synchronized, used to decide which
/// indexes to rebuild and which layers to mark dirty.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreChanges {
    /// Task/resource/dependency/order data or the row layout inputs.
    pub structure: bool,
    pub view: bool,
    pub selection: bool,
    /// Drag preview, hover, or other overlay-only state.
    pub overlay: bool,
}

impl StoreChanges {
    pub fn any(&self) -> bool {
        self.structure || self.view || self.selection || self.overlay
    }
}

/// Pointer-hover state feeding row stripes and resize handles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverState {
    pub task: Option<Uuid>,
    pub row: Option<usize>,
}

/// Owns all schedule entities and UI state. Indexes are derived caches
/// rebuilt from this data; they are never the source of truth.
pub struct ScheduleStore {
    tasks: HashMap<Uuid, Task>,
    resources: Vec<Resource>,
    dependencies: Vec<TaskDependency>,
    orders: Vec<Order>,
    groups: Vec<ResourceGroup>,

    viewport: ViewportState,
    selection: SelectionState,
    drag: Option<DragState>,
    grouping: GroupingState,
    hover: HoverState,

    history: UndoHistory,
    changes: StoreChanges,
    events: Vec<ChartEvent>,
}

impl ScheduleStore {
    pub fn new(time_origin: DateTime<Utc>) -> Self {
        Self {
            tasks: HashMap::new(),
            resources: Vec::new(),
            dependencies: Vec::new(),
            orders: Vec::new(),
            groups: Vec::new(),
            viewport: ViewportState::new(time_origin),
            selection: SelectionState::new(),
            drag: None,
            grouping: GroupingState::default(),
            hover: HoverState::default(),
            history: UndoHistory::new(),
            changes: StoreChanges {
                structure: true,
                view: true,
                selection: false,
                overlay: false,
            },
            events: Vec::new(),
        }
    }

    // ===== Data access =====

    pub fn tasks(&self) -> &HashMap<Uuid, Task> {
        &self.tasks
    }

    pub fn task(&self, id: Uuid) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn dependencies(&self) -> &[TaskDependency] {
        &self.dependencies
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn groups(&self) -> &[ResourceGroup] {
        &self.groups
    }

    // ===== Bulk replace =====

    /// Replace all entity collections from an external snapshot. Missing
    /// collections in the snapshot come through as empty. Hydration is not
    /// a user edit, so history starts fresh.
    pub fn apply_snapshot(&mut self, snapshot: ScheduleSnapshot) {
        self.tasks = snapshot.tasks.into_iter().map(|t| (t.id, t)).collect();
        self.resources = snapshot.resources;
        self.dependencies = snapshot.dependencies;
        self.orders = snapshot.orders;
        self.groups = snapshot.groups;
        self.history.clear();
        self.selection.clear();
        self.drag = None;
        self.changes.structure = true;
        self.events.push(ChartEvent::TasksMutated);
    }

    // ===== Task mutations (undoable) =====

    /// Apply an edit to one task. Pushes a history entry only when the
    /// tracked collections actually change value.
    pub fn update_task(&mut self, id: Uuid, edit: impl FnOnce(&mut Task)) {
        self.with_history(|store| {
            if let Some(task) = store.tasks.get_mut(&id) {
                edit(task);
            }
        });
    }

    /// Remove the given tasks along with every dependency touching them.
    pub fn delete_tasks(&mut self, ids: &[Uuid]) {
        self.with_history(|store| {
            for id in ids {
                store.tasks.remove(id);
            }
            store
                .dependencies
                .retain(|d| !ids.contains(&d.from_task) && !ids.contains(&d.to_task));
        });
        let removed_selected = ids.iter().any(|id| self.selection.contains_task(*id));
        if removed_selected {
            self.selection.tasks.retain(|id| !ids.contains(id));
            if self
                .selection
                .anchor
                .is_some_and(|anchor| ids.contains(&anchor))
            {
                self.selection.anchor = None;
            }
            self.note_selection_changed();
        }
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.tasks, &self.dependencies) {
            Some(snapshot) => {
                self.tasks = snapshot.tasks;
                self.dependencies = snapshot.dependencies;
                self.changes.structure = true;
                self.events.push(ChartEvent::TasksMutated);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.tasks, &self.dependencies) {
            Some(snapshot) => {
                self.tasks = snapshot.tasks;
                self.dependencies = snapshot.dependencies;
                self.changes.structure = true;
                self.events.push(ChartEvent::TasksMutated);
                true
            }
            None => false,
        }
    }

    fn with_history(&mut self, mutate: impl FnOnce(&mut Self)) {
        let before = HistorySnapshot {
            tasks: self.tasks.clone(),
            dependencies: self.dependencies.clone(),
        };
        mutate(self);
        if self.tasks != before.tasks || self.dependencies != before.dependencies {
            self.history.push(before);
            self.changes.structure = true;
            self.events.push(ChartEvent::TasksMutated);
        }
    }

    // ===== Viewport =====

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Mutable viewport access; marks the view changed and emits a
    /// viewport notification.
    pub fn viewport_mut(&mut self) -> &mut ViewportState {
        self.changes.view = true;
        self.events.push(ChartEvent::ViewportChanged {
            scroll_x: self.viewport.scroll_x,
            scroll_y: self.viewport.scroll_y,
            pixels_per_hour: self.viewport.pixels_per_hour,
        });
        &mut self.viewport
    }

    /// Resize the drawing surface without emitting a scroll notification.
    pub fn set_surface_size(&mut self, width: f32, height: f32) {
        if self.viewport.width != width || self.viewport.height != height {
            self.viewport.width = width;
            self.viewport.height = height;
            self.changes.view = true;
        }
    }

    // ===== Selection =====

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn select_only(&mut self, id: Uuid) {
        self.selection.select_only(id);
        self.note_selection_changed();
    }

    pub fn toggle_selected(&mut self, id: Uuid) {
        self.selection.toggle_task(id);
        self.note_selection_changed();
    }

    pub fn select_tasks(&mut self, ids: impl IntoIterator<Item = Uuid>) {
        self.selection.select_tasks(ids);
        self.note_selection_changed();
    }

    pub fn select_all(&mut self) {
        let all: Vec<Uuid> = self.tasks.keys().copied().collect();
        self.selection.select_tasks(all);
        self.note_selection_changed();
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.note_selection_changed();
        }
    }

    fn note_selection_changed(&mut self) {
        self.changes.selection = true;
        self.events.push(ChartEvent::SelectionChanged(
            self.selection.tasks.iter().copied().collect(),
        ));
    }

    // ===== Drag preview =====

    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn begin_drag(&mut self, drag: DragState) {
        self.drag = Some(drag);
        self.changes.overlay = true;
    }

    pub fn drag_mut(&mut self) -> Option<&mut DragState> {
        self.changes.overlay = true;
        self.drag.as_mut()
    }

    /// Consume the drag state at the end of a drag session. The state
    /// never persists across sessions.
    pub fn take_drag(&mut self) -> Option<DragState> {
        self.changes.overlay = true;
        self.drag.take()
    }

    // ===== Grouping =====

    pub fn grouping(&self) -> &GroupingState {
        &self.grouping
    }

    pub fn set_grouping_mode(&mut self, mode: GroupingMode) {
        if self.grouping.mode != mode {
            self.grouping.set_mode(mode);
            self.changes.structure = true;
        }
    }

    pub fn toggle_group(&mut self, id: GroupId) {
        self.grouping.toggle(id);
        self.changes.structure = true;
    }

    // ===== Hover =====

    pub fn hover(&self) -> HoverState {
        self.hover
    }

    pub fn set_hover(&mut self, hover: HoverState) {
        if self.hover != hover {
            self.hover = hover;
            self.changes.overlay = true;
        }
    }

    // ===== Change tracking =====

    pub fn take_changes(&mut self) -> StoreChanges {
        std::mem::take(&mut self.changes)
    }

    pub fn drain_events(&mut self) -> Vec<ChartEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use crate::model::ResourceKind;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    fn store_with_tasks(n: usize) -> (ScheduleStore, Vec<Uuid>) {
        let mut store = ScheduleStore::new(t0());
        let resource = Resource::new("Lathe", ResourceKind::Machine);
        let tasks: Vec<Task> = (0..n)
            .map(|i| Task::new(format!("t{i}"), t0() + Duration::hours(i as i64 * 2), 60, resource.id))
            .collect();
        let ids = tasks.iter().map(|t| t.id).collect();
        store.apply_snapshot(ScheduleSnapshot {
            tasks,
            resources: vec![resource],
            ..Default::default()
        });
        let _ = store.take_changes();
        let _ = store.drain_events();
        (store, ids)
    }

    #[test]
    fn three_moves_three_undos_restore_original() {
        let (mut store, ids) = store_with_tasks(1);
        let id = ids[0];
        let original = store.tasks().clone();

        for step in 1..=3 {
            store.update_task(id, |t| t.start_time = t.start_time + Duration::hours(step));
        }
        assert_ne!(store.tasks(), &original);

        assert!(store.undo());
        assert!(store.undo());
        assert!(store.undo());
        assert_eq!(store.tasks(), &original);

        // A fourth undo is a no-op.
        assert!(!store.undo());
        assert_eq!(store.tasks(), &original);
    }

    #[test]
    fn noop_mutation_pushes_no_history() {
        let (mut store, ids) = store_with_tasks(1);
        store.update_task(ids[0], |_t| {});
        assert!(store.drain_events().is_empty());
        assert!(!store.take_changes().structure);
    }

    #[test]
    fn viewport_changes_never_touch_history() {
        let (mut store, _) = store_with_tasks(2);
        store.viewport_mut().scroll_x = 400.0;
        store.viewport_mut().zoom(2.0, 100.0);
        assert!(!store.undo());
    }

    #[test]
    fn delete_removes_incident_dependencies_and_selection() {
        let (mut store, ids) = store_with_tasks(3);
        let dep = TaskDependency::new(ids[0], ids[1], crate::model::DependencyKind::FinishToStart);
        let before_tasks = store.tasks.clone();
        store.history.push(HistorySnapshot {
            tasks: before_tasks,
            dependencies: store.dependencies.clone(),
        });
        store.dependencies.push(dep);
        store.select_only(ids[0]);

        store.delete_tasks(&[ids[0]]);
        assert!(store.task(ids[0]).is_none());
        assert!(store.dependencies().is_empty());
        assert!(store.selection().is_empty());
    }
}
