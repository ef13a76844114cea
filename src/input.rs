use chrono::{DateTime, Duration, Utc};
use egui::{Modifiers, Pos2, Rect, Vec2};
use uuid::Uuid;

use crate::index::{RelationalIndex, SpatialIndex};
use crate::model::{
    total_height, DependencyKind, DragKind, DragState, Task, TaskDependency, VirtualRow,
};
use crate::store::{HoverState, ScheduleStore};
use crate::theme;

/// Wheel zoom sensitivity: scroll delta to zoom factor exponent.
const ZOOM_SPEED: f32 = 0.002;

/// Pointer and keyboard input, already translated from the embedding
/// toolkit into surface-relative coordinates.
#[derive(Debug, Clone, Copy)]
pub enum InputEvent {
    PointerDown {
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        pos: Pos2,
    },
    PointerUp {
        pos: Pos2,
        modifiers: Modifiers,
    },
    Wheel {
        pos: Pos2,
        delta: Vec2,
        modifiers: Modifiers,
    },
    Key(KeyCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Escape,
    Delete,
    SelectAll,
    Undo,
    Redo,
}

/// Which part of a bar the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitZone {
    Body,
    StartEdge,
    EndEdge,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    task: Option<(Uuid, HitZone)>,
    row: Option<usize>,
}

/// Interaction state machine. Every pointer session starts in `Idle`,
/// passes through `PendingClick` until the drag threshold is exceeded,
/// and always returns to `Idle` on release or cancel.
#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    PendingClick {
        origin: Pos2,
        task: Option<(Uuid, HitZone)>,
        row: Option<usize>,
        draggable: bool,
    },
    Dragging,
    Panning {
        last: Pos2,
    },
    Marquee {
        origin: Pos2,
        current: Pos2,
    },
}

pub struct InteractionController {
    state: State,
    /// Pointer grab time minus the task start at drag begin, so the bar
    /// does not jump under the cursor.
    grab_offset: Duration,
    min_resolution_minutes: i64,
}

impl InteractionController {
    pub fn new(min_resolution_minutes: i64) -> Self {
        Self {
            state: State::Idle,
            grab_offset: Duration::zero(),
            min_resolution_minutes,
        }
    }

    /// True while a pointer session is in flight (pending click, drag,
    /// pan, or marquee).
    pub fn is_engaged(&self) -> bool {
        !matches!(self.state, State::Idle)
    }

    /// Active marquee rectangle in surface pixels, for the overlay.
    pub fn marquee(&self) -> Option<Rect> {
        match self.state {
            State::Marquee { origin, current } => Some(Rect::from_two_pos(origin, current)),
            _ => None,
        }
    }

    pub fn handle(
        &mut self,
        event: InputEvent,
        store: &mut ScheduleStore,
        spatial: &SpatialIndex,
        relational: &RelationalIndex,
        rows: &[VirtualRow],
    ) {
        match event {
            InputEvent::PointerDown {
                pos,
                button,
                modifiers,
            } => self.pointer_down(pos, button, modifiers, store, spatial, rows),
            InputEvent::PointerMove { pos } => {
                self.pointer_move(pos, store, spatial, relational, rows)
            }
            InputEvent::PointerUp { pos, modifiers } => {
                self.pointer_up(pos, modifiers, store, spatial, rows)
            }
            InputEvent::Wheel {
                pos,
                delta,
                modifiers,
            } => wheel(pos, delta, modifiers, store, rows),
            InputEvent::Key(cmd) => self.key(cmd, store),
        }
    }

    fn pointer_down(
        &mut self,
        pos: Pos2,
        button: PointerButton,
        modifiers: Modifiers,
        store: &mut ScheduleStore,
        spatial: &SpatialIndex,
        rows: &[VirtualRow],
    ) {
        if button == PointerButton::Middle {
            self.state = State::Panning { last: pos };
            return;
        }

        let hit = hit_test(pos, store, spatial, rows);
        match hit.task {
            Some((id, zone)) => {
                let draggable = store.task(id).is_some_and(|t| !t.is_fixed());
                self.state = State::PendingClick {
                    origin: pos,
                    task: Some((id, zone)),
                    row: hit.row,
                    draggable,
                };
            }
            None if modifiers.shift || modifiers.command => {
                self.state = State::Marquee {
                    origin: pos,
                    current: pos,
                };
            }
            None => {
                self.state = State::PendingClick {
                    origin: pos,
                    task: None,
                    row: hit.row,
                    draggable: false,
                };
            }
        }
    }

    fn pointer_move(
        &mut self,
        pos: Pos2,
        store: &mut ScheduleStore,
        spatial: &SpatialIndex,
        relational: &RelationalIndex,
        rows: &[VirtualRow],
    ) {
        match self.state {
            State::Idle => {
                let hit = hit_test(pos, store, spatial, rows);
                store.set_hover(HoverState {
                    task: hit.task.map(|(id, _)| id),
                    row: hit.row,
                });
            }
            State::PendingClick {
                origin,
                task,
                draggable,
                ..
            } => {
                if (pos - origin).length() < theme::DRAG_THRESHOLD {
                    return;
                }
                match task {
                    Some((id, zone)) if draggable => {
                        let Some(task) = store.task(id).cloned() else {
                            self.state = State::Idle;
                            return;
                        };
                        let kind = match zone {
                            HitZone::Body => DragKind::Move,
                            HitZone::StartEdge => DragKind::ResizeStart,
                            HitZone::EndEdge => DragKind::ResizeEnd,
                        };
                        self.grab_offset =
                            store.viewport().x_to_time(origin.x) - task.start_time;
                        store.begin_drag(DragState::begin(kind, &task, pos));
                        self.state = State::Dragging;
                        self.update_preview(pos, store, relational, rows);
                    }
                    Some(_) => {
                        // Fixed tasks refuse dragging but stay clickable.
                        self.state = State::Idle;
                    }
                    None => {
                        self.state = State::Panning { last: origin };
                        self.pan(pos, store, rows);
                    }
                }
            }
            State::Dragging => self.update_preview(pos, store, relational, rows),
            State::Panning { .. } => self.pan(pos, store, rows),
            State::Marquee { origin, .. } => {
                self.state = State::Marquee {
                    origin,
                    current: pos,
                };
                // Marquee geometry lives in the controller; poke the
                // store so the interaction layer redraws.
                let _ = store.drag_mut();
            }
        }
    }

    fn pointer_up(
        &mut self,
        pos: Pos2,
        modifiers: Modifiers,
        store: &mut ScheduleStore,
        spatial: &SpatialIndex,
        rows: &[VirtualRow],
    ) {
        match self.state {
            State::PendingClick { task, row, .. } => {
                match task {
                    Some((id, _)) => {
                        if modifiers.command {
                            store.toggle_selected(id);
                        } else {
                            store.select_only(id);
                        }
                    }
                    None => {
                        let header_group = row
                            .and_then(|i| rows.get(i))
                            .filter(|r| r.is_group_header)
                            .and_then(|r| r.group);
                        match header_group {
                            Some(group) => store.toggle_group(group),
                            None => store.clear_selection(),
                        }
                    }
                }
            }
            State::Dragging => self.commit_drag(store),
            State::Marquee { origin, .. } => {
                let rect = Rect::from_two_pos(origin, pos);
                let vp = store.viewport();
                let start = vp.x_to_time(rect.left());
                let end = vp.x_to_time(rect.right());
                let min_y = vp.y_to_virtual_y(rect.top());
                let max_y = vp.y_to_virtual_y(rect.bottom());
                let hits = spatial.query_rect(start, end, min_y, max_y);
                store.select_tasks(hits);
            }
            State::Idle | State::Panning { .. } => {}
        }
        self.state = State::Idle;
    }

    fn pan(&mut self, pos: Pos2, store: &mut ScheduleStore, rows: &[VirtualRow]) {
        let State::Panning { last } = self.state else {
            return;
        };
        let delta = pos - last;
        let max_scroll_y = (total_height(rows) - store.viewport().height).max(0.0);
        let vp = store.viewport_mut();
        vp.scroll_x -= delta.x;
        vp.scroll_y = (vp.scroll_y - delta.y).clamp(0.0, max_scroll_y);
        self.state = State::Panning { last: pos };
    }

    fn update_preview(
        &mut self,
        pos: Pos2,
        store: &mut ScheduleStore,
        relational: &RelationalIndex,
        rows: &[VirtualRow],
    ) {
        let vp = store.viewport().clone();
        let pointer_time = vp.x_to_time(pos.x);
        let min_duration = Duration::minutes(self.min_resolution_minutes.max(1));
        let grab_offset = self.grab_offset;

        let row_under = row_at(rows, vp.y_to_virtual_y(pos.y));
        let target_resource = row_under
            .and_then(|i| rows[i].resource_id);

        let Some(drag) = store.drag_mut() else {
            return;
        };
        drag.pointer = pos;
        let original = drag.original.clone();

        match drag.kind {
            DragKind::Move | DragKind::Reassign => {
                let mut start = pointer_time - grab_offset;
                let duration = original.total_duration();
                if let Some(earliest) = original.constraints.earliest_start {
                    start = start.max(earliest);
                }
                if let Some(latest) = original.constraints.latest_end {
                    start = start.min(latest - duration);
                }
                drag.preview_start = start;
                drag.preview_end = start + duration;
                if let Some(resource) = target_resource {
                    drag.preview_resource = resource;
                }
                drag.kind = if drag.preview_resource != original.resource_id {
                    DragKind::Reassign
                } else {
                    DragKind::Move
                };
            }
            DragKind::ResizeStart => {
                let mut start = pointer_time.min(original.end_time() - min_duration);
                if let Some(earliest) = original.constraints.earliest_start {
                    start = start.max(earliest);
                }
                drag.preview_start = start;
                drag.preview_end = original.end_time();
            }
            DragKind::ResizeEnd => {
                let mut end = pointer_time.max(original.start_time + min_duration);
                if let Some(latest) = original.constraints.latest_end {
                    end = end.min(latest);
                }
                drag.preview_start = original.start_time;
                drag.preview_end = end;
            }
        }

        let preview = (
            drag.task_id,
            drag.preview_start,
            drag.preview_end,
            drag.preview_resource,
        );
        let new_collisions = collisions(store, relational, preview);
        let new_violations =
            violations(store.tasks(), relational, preview.0, preview.1, preview.2);
        if let Some(drag) = store.drag_mut() {
            drag.collisions = new_collisions;
            drag.violations = new_violations;
        }
    }

    /// End of a drag session: snap the manipulated edge to the grid and
    /// write the result through the undoable mutation path. Commits with
    /// no effective movement or with dependency violations change nothing.
    fn commit_drag(&mut self, store: &mut ScheduleStore) {
        let Some(drag) = store.take_drag() else {
            return;
        };
        if !drag.has_moved() || !drag.is_valid() {
            return;
        }
        let vp = store.viewport().clone();
        let min_res = self.min_resolution_minutes;
        let min_duration = Duration::minutes(min_res.max(1));
        let original = &drag.original;

        match drag.kind {
            DragKind::Move | DragKind::Reassign => {
                // Snapping can round back across a bound the preview
                // honored, so both constraints are re-applied here.
                let mut start = vp.snap_to_grid(drag.preview_start, min_res);
                if let Some(earliest) = original.constraints.earliest_start {
                    start = start.max(earliest);
                }
                if let Some(latest) = original.constraints.latest_end {
                    start = start.min(latest - original.total_duration());
                }
                let resource = drag.preview_resource;
                store.update_task(drag.task_id, |t| {
                    t.start_time = start;
                    t.resource_id = resource;
                });
            }
            DragKind::ResizeStart => {
                let end = original.end_time();
                let mut start = vp.snap_to_grid(drag.preview_start, min_res);
                if start > end - min_duration {
                    start = end - min_duration;
                }
                if let Some(earliest) = original.constraints.earliest_start {
                    start = start.max(earliest);
                }
                let old_total = original.total_duration_minutes();
                let new_total = (end - start).num_minutes();
                if old_total > 0 && new_total != old_total {
                    let factor = new_total as f64 / old_total as f64;
                    store.update_task(drag.task_id, |t| {
                        t.start_time = start;
                        t.scale_phases(factor);
                    });
                }
            }
            DragKind::ResizeEnd => {
                let start = original.start_time;
                let mut end = vp.snap_to_grid(drag.preview_end, min_res);
                if end < start + min_duration {
                    end = start + min_duration;
                }
                if let Some(latest) = original.constraints.latest_end {
                    end = end.min(latest);
                }
                let old_total = original.total_duration_minutes();
                let new_total = (end - start).num_minutes();
                if old_total > 0 && new_total != old_total {
                    let factor = new_total as f64 / old_total as f64;
                    store.update_task(drag.task_id, |t| t.scale_phases(factor));
                }
            }
        }
    }

    fn key(&mut self, cmd: KeyCommand, store: &mut ScheduleStore) {
        match cmd {
            KeyCommand::Escape => {
                if matches!(self.state, State::Dragging) {
                    let _ = store.take_drag();
                    self.state = State::Idle;
                } else if matches!(self.state, State::Marquee { .. }) {
                    self.state = State::Idle;
                    let _ = store.drag_mut();
                } else {
                    store.clear_selection();
                }
            }
            KeyCommand::Delete => {
                let ids: Vec<Uuid> = store.selection().tasks.iter().copied().collect();
                if !ids.is_empty() {
                    store.delete_tasks(&ids);
                }
            }
            KeyCommand::SelectAll => store.select_all(),
            KeyCommand::Undo => {
                store.undo();
            }
            KeyCommand::Redo => {
                store.redo();
            }
        }
    }
}

fn wheel(
    pos: Pos2,
    delta: Vec2,
    modifiers: Modifiers,
    store: &mut ScheduleStore,
    rows: &[VirtualRow],
) {
    if modifiers.command {
        let factor = (delta.y * ZOOM_SPEED).exp();
        store.viewport_mut().zoom(factor, pos.x);
    } else if modifiers.shift {
        store.viewport_mut().scroll_x -= delta.x + delta.y;
    } else {
        let max_scroll_y = (total_height(rows) - store.viewport().height).max(0.0);
        let vp = store.viewport_mut();
        vp.scroll_x -= delta.x;
        vp.scroll_y = (vp.scroll_y - delta.y).clamp(0.0, max_scroll_y);
    }
}

/// Row index under a virtual y coordinate.
fn row_at(rows: &[VirtualRow], virtual_y: f32) -> Option<usize> {
    if virtual_y < 0.0 {
        return None;
    }
    let idx = rows.partition_point(|r| r.bottom() <= virtual_y);
    (idx < rows.len()).then_some(idx)
}

/// Hit-test a surface position against bars and rows. Bars are looked up
/// through the spatial index; the resize zones are the bar's first and
/// last `RESIZE_MARGIN` pixels.
fn hit_test(
    pos: Pos2,
    store: &ScheduleStore,
    spatial: &SpatialIndex,
    rows: &[VirtualRow],
) -> Hit {
    let vp = store.viewport();
    let t = vp.x_to_time(pos.x);
    let virtual_y = vp.y_to_virtual_y(pos.y);
    let row = row_at(rows, virtual_y);

    let mut candidates = spatial.query_point(t, virtual_y);
    // Later start wins when bars overlap, matching paint order.
    candidates.sort_by_key(|id| store.task(*id).map(|t| t.start_time));
    let task = candidates.pop().and_then(|id| {
        let task = store.task(id)?;
        let x0 = vp.time_to_x(task.start_time);
        let x1 = vp.time_to_x(task.end_time());
        let zone = if task.is_fixed() {
            HitZone::Body
        } else if pos.x - x0 <= theme::RESIZE_MARGIN {
            HitZone::StartEdge
        } else if x1 - pos.x <= theme::RESIZE_MARGIN {
            HitZone::EndEdge
        } else {
            HitZone::Body
        };
        Some((id, zone))
    });

    Hit { task, row }
}

/// Tasks on `resource` whose interval overlaps `[start, end)`, excluding
/// the dragged task itself. Half-open, so back-to-back tasks never
/// collide.
fn collisions(
    store: &ScheduleStore,
    relational: &RelationalIndex,
    (task_id, start, end, resource): (Uuid, DateTime<Utc>, DateTime<Utc>, Uuid),
) -> Vec<Uuid> {
    relational
        .tasks_for_resource(resource)
        .iter()
        .copied()
        .filter(|&other| other != task_id)
        .filter(|other| {
            store
                .task(*other)
                .is_some_and(|t| t.start_time < end && start < t.end_time())
        })
        .collect()
}

/// Dependency ids incident to the dragged task that its preview interval
/// violates.
fn violations(
    tasks: &std::collections::HashMap<Uuid, Task>,
    relational: &RelationalIndex,
    task_id: Uuid,
    preview_start: DateTime<Utc>,
    preview_end: DateTime<Utc>,
) -> Vec<Uuid> {
    relational
        .incident_dependencies(task_id)
        .iter()
        .filter_map(|id| relational.dependency(*id))
        .filter(|dep| {
            let other_id = if dep.from_task == task_id {
                dep.to_task
            } else {
                dep.from_task
            };
            let Some(other) = tasks.get(&other_id) else {
                return false;
            };
            let (pred, succ) = if dep.from_task == task_id {
                (
                    (preview_start, preview_end),
                    (other.start_time, other.end_time()),
                )
            } else {
                (
                    (other.start_time, other.end_time()),
                    (preview_start, preview_end),
                )
            };
            dependency_violated(dep, pred, succ)
        })
        .map(|dep| dep.id)
        .collect()
}

/// True when the successor's constrained edge falls before where the
/// dependency kind and lag require it.
pub fn dependency_violated(
    dep: &TaskDependency,
    (pred_start, pred_end): (DateTime<Utc>, DateTime<Utc>),
    (succ_start, succ_end): (DateTime<Utc>, DateTime<Utc>),
) -> bool {
    let lag = Duration::minutes(dep.lag_minutes);
    match dep.kind {
        DependencyKind::FinishToStart => succ_start < pred_end + lag,
        DependencyKind::StartToStart => succ_start < pred_start + lag,
        DependencyKind::FinishToFinish => succ_end < pred_end + lag,
        DependencyKind::StartToFinish => succ_end < pred_start + lag,
    }
}
