use egui::{Color32, Pos2, Rect, Stroke};

use super::{tasks::bar_rect, LayerSurface, RenderError, RenderInput};
use crate::model::{DependencyKind, TaskDependency};
use crate::theme;

/// Anchor points of a dependency on the two bar rectangles. The first
/// component is where the line leaves the predecessor, the second where
/// the arrowhead lands on the successor.
pub fn endpoints(kind: DependencyKind, from: Rect, to: Rect) -> (Pos2, Pos2) {
    match kind {
        DependencyKind::FinishToStart => (from.right_center(), to.left_center()),
        DependencyKind::StartToStart => (from.left_center(), to.left_center()),
        DependencyKind::FinishToFinish => (from.right_center(), to.right_center()),
        DependencyKind::StartToFinish => (from.left_center(), to.right_center()),
    }
}

/// Horizontal direction the line leaves the predecessor (+1 right, -1
/// left) and the direction of travel when it enters the successor.
fn directions(kind: DependencyKind) -> (f32, f32) {
    match kind {
        DependencyKind::FinishToStart => (1.0, 1.0),
        DependencyKind::StartToStart => (-1.0, 1.0),
        DependencyKind::FinishToFinish => (1.0, -1.0),
        DependencyKind::StartToFinish => (-1.0, -1.0),
    }
}

/// Orthogonal polyline from `from` to `to`. The line always leaves and
/// enters horizontally with a short stub, inserting a mid-channel when the
/// direct elbow would double back through a bar.
pub fn route(from: Pos2, exit_dir: f32, to: Pos2, entry_dir: f32) -> Vec<Pos2> {
    let exit = Pos2::new(from.x + exit_dir * theme::ARROW_STUB, from.y);
    let approach = Pos2::new(to.x - entry_dir * theme::ARROW_STUB, to.y);

    let direct_ok = if entry_dir > 0.0 {
        exit.x <= approach.x
    } else {
        exit.x >= approach.x
    };

    if direct_ok && from.y != to.y {
        return vec![from, exit, Pos2::new(exit.x, to.y), to];
    }
    if direct_ok {
        return vec![from, to];
    }

    let mid_y = if from.y == to.y {
        from.y + theme::ROW_HEIGHT * 0.6
    } else {
        (from.y + to.y) * 0.5
    };
    vec![
        from,
        exit,
        Pos2::new(exit.x, mid_y),
        Pos2::new(approach.x, mid_y),
        approach,
        to,
    ]
}

fn arrow_head(tip: Pos2, travel_dir: f32) -> Vec<Pos2> {
    let back = tip.x - travel_dir * theme::ARROW_HEAD;
    vec![
        tip,
        Pos2::new(back, tip.y - theme::ARROW_HEAD * 0.65),
        Pos2::new(back, tip.y + theme::ARROW_HEAD * 0.65),
    ]
}

fn draw_arrow(surface: &mut LayerSurface, points: &[Pos2], entry_dir: f32, color: Color32, width: f32) {
    let stroke = Stroke::new(width, color);
    for pair in points.windows(2) {
        surface.line_segment([pair[0], pair[1]], stroke);
    }
    let tip = *points.last().unwrap();
    surface.polygon(arrow_head(tip, entry_dir), color, Stroke::NONE);
}

/// Dependency layer: one orthogonal arrow per visible dependency. Arrows
/// touching a selected task are drawn last in the highlight color, so
/// they sit above the rest.
pub fn render(surface: &mut LayerSurface, input: &RenderInput) -> Result<(), RenderError> {
    let bounds = surface.bounds().expand(theme::ARROW_STUB * 2.0);

    let mut plain: Vec<(Vec<Pos2>, f32)> = Vec::new();
    let mut highlighted: Vec<(Vec<Pos2>, f32)> = Vec::new();

    for dep in input.relational.dependencies() {
        let Some(geometry) = arrow_geometry(dep, input) else {
            continue;
        };
        let (points, entry_dir) = geometry;
        let envelope = Rect::from_points(&points);
        if !bounds.intersects(envelope) {
            continue;
        }
        let selected = input.selection.contains_task(dep.from_task)
            || input.selection.contains_task(dep.to_task);
        if selected {
            highlighted.push((points, entry_dir));
        } else {
            plain.push((points, entry_dir));
        }
    }

    for (points, entry_dir) in &plain {
        draw_arrow(surface, points, *entry_dir, theme::DEP_ARROW, 1.0);
    }
    for (points, entry_dir) in &highlighted {
        draw_arrow(surface, points, *entry_dir, theme::DEP_ARROW_SELECTED, 1.8);
    }

    Ok(())
}

/// Routed polyline for one dependency, or `None` when either endpoint
/// task is missing or its resource has no visible row.
fn arrow_geometry(dep: &TaskDependency, input: &RenderInput) -> Option<(Vec<Pos2>, f32)> {
    let vp = input.viewport;
    let from_task = input.tasks.get(&dep.from_task)?;
    let to_task = input.tasks.get(&dep.to_task)?;
    let from_row = input.relational.row_of_resource(from_task.resource_id)?;
    let to_row = input.relational.row_of_resource(to_task.resource_id)?;

    let from_rect = bar_rect(
        vp,
        from_task,
        vp.virtual_y_to_y(input.rows[from_row].virtual_y),
        input.rows[from_row].height,
    );
    let to_rect = bar_rect(
        vp,
        to_task,
        vp.virtual_y_to_y(input.rows[to_row].virtual_y),
        input.rows[to_row].height,
    );

    let (from, to) = endpoints(dep.kind, from_rect, to_rect);
    let (exit_dir, entry_dir) = directions(dep.kind);
    Some((route(from, exit_dir, to, entry_dir), entry_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RelationalIndex, SpatialIndex};
    use crate::model::{SelectionState, Task, ViewportState, VirtualRow};
    use crate::render::{DrawCmd, FixedTextMeasure, RenderInput};
    use crate::store::HoverState;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn endpoints_follow_the_dependency_kind() {
        let a = Rect::from_min_max(Pos2::new(10.0, 3.0), Pos2::new(50.0, 27.0));
        let b = Rect::from_min_max(Pos2::new(80.0, 33.0), Pos2::new(140.0, 57.0));

        let (p, q) = endpoints(DependencyKind::FinishToStart, a, b);
        assert_eq!((p, q), (a.right_center(), b.left_center()));

        let (p, q) = endpoints(DependencyKind::StartToStart, a, b);
        assert_eq!((p, q), (a.left_center(), b.left_center()));

        let (p, q) = endpoints(DependencyKind::FinishToFinish, a, b);
        assert_eq!((p, q), (a.right_center(), b.right_center()));

        let (p, q) = endpoints(DependencyKind::StartToFinish, a, b);
        assert_eq!((p, q), (a.left_center(), b.right_center()));
    }

    #[test]
    fn forward_route_is_a_single_elbow() {
        let from = Pos2::new(50.0, 15.0);
        let to = Pos2::new(120.0, 45.0);
        let points = route(from, 1.0, to, 1.0);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], from);
        assert_eq!(*points.last().unwrap(), to);
        // Orthogonal: consecutive points share an x or a y.
        for pair in points.windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }

    #[test]
    fn backward_route_uses_a_mid_channel() {
        // Successor starts left of the predecessor's finish.
        let from = Pos2::new(200.0, 15.0);
        let to = Pos2::new(100.0, 45.0);
        let points = route(from, 1.0, to, 1.0);
        assert_eq!(points.len(), 6);
        for pair in points.windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }

    #[test]
    fn missing_endpoint_task_draws_nothing() {
        let r = Uuid::new_v4();
        let a = Task::new("a", t0(), 60, r);
        let dep = TaskDependency::new(a.id, Uuid::new_v4(), DependencyKind::FinishToStart);

        let mut row = VirtualRow::resource(r, "r");
        row.height = 30.0;
        let rows = vec![row];
        let tasks: HashMap<Uuid, Task> = [(a.id, a.clone())].into();
        let mut relational = RelationalIndex::new();
        relational.rebuild(tasks.values(), std::slice::from_ref(&dep), &rows);
        let spatial = SpatialIndex::new();
        let mut viewport = ViewportState::new(t0());
        viewport.width = 800.0;
        viewport.height = 600.0;
        let selection = SelectionState::default();

        let input = RenderInput {
            tasks: &tasks,
            viewport: &viewport,
            selection: &selection,
            drag: None,
            hover: HoverState::default(),
            rows: &rows,
            spatial: &spatial,
            relational: &relational,
            marquee: None,
            now: t0(),
            min_resolution_minutes: 15,
            measure: &FixedTextMeasure,
        };
        let mut surface = LayerSurface::default();
        surface.set_size(800.0, 600.0);
        render(&mut surface, &input).unwrap();
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn selected_arrows_draw_on_top() {
        let r1 = Uuid::new_v4();
        let r2 = Uuid::new_v4();
        let a = Task::new("a", t0(), 60, r1);
        let b = Task::new("b", t0() + chrono::Duration::hours(2), 60, r2);
        let c = Task::new("c", t0() + chrono::Duration::hours(4), 60, r1);
        let deps = vec![
            TaskDependency::new(a.id, b.id, DependencyKind::FinishToStart),
            TaskDependency::new(b.id, c.id, DependencyKind::FinishToStart),
        ];

        let rows: Vec<VirtualRow> = [r1, r2]
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let mut row = VirtualRow::resource(r, format!("r{i}"));
                row.virtual_y = i as f32 * 30.0;
                row.height = 30.0;
                row
            })
            .collect();
        let tasks: HashMap<Uuid, Task> =
            [(a.id, a.clone()), (b.id, b), (c.id, c)].into();
        let mut relational = RelationalIndex::new();
        relational.rebuild(tasks.values(), &deps, &rows);
        let spatial = SpatialIndex::new();
        let mut viewport = ViewportState::new(t0());
        viewport.width = 800.0;
        viewport.height = 600.0;
        let mut selection = SelectionState::default();
        selection.select_only(a.id);

        let input = RenderInput {
            tasks: &tasks,
            viewport: &viewport,
            selection: &selection,
            drag: None,
            hover: HoverState::default(),
            rows: &rows,
            spatial: &spatial,
            relational: &relational,
            marquee: None,
            now: t0(),
            min_resolution_minutes: 15,
            measure: &FixedTextMeasure,
        };
        let mut surface = LayerSurface::default();
        surface.set_size(800.0, 600.0);
        render(&mut surface, &input).unwrap();

        // The highlighted arrow's segments come after every plain segment.
        let colors: Vec<Color32> = surface
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Line { stroke, .. } => Some(stroke.color),
                _ => None,
            })
            .collect();
        let first_highlight = colors
            .iter()
            .position(|&c| c == theme::DEP_ARROW_SELECTED)
            .unwrap();
        let last_plain = colors
            .iter()
            .rposition(|&c| c == theme::DEP_ARROW)
            .unwrap();
        assert!(last_plain < first_highlight);
    }
}
