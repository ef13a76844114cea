use chrono::{DateTime, Utc};
use egui::{Align2, Color32, Pos2, Rect, Rounding, Stroke};

use super::{tasks::bar_rect, LayerSurface, RenderError, RenderInput};
use crate::model::{DragKind, DragState};
use crate::theme;

const DASH: f32 = 4.0;
const GAP: f32 = 3.0;

/// The time being manipulated, shown on the snap guide and tooltip.
fn manipulated_edge(drag: &DragState) -> DateTime<Utc> {
    match drag.kind {
        DragKind::ResizeEnd => drag.preview_end,
        DragKind::Move | DragKind::ResizeStart | DragKind::Reassign => drag.preview_start,
    }
}

fn dashed_rect(surface: &mut LayerSurface, rect: Rect, stroke: Stroke) {
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    for pair in corners.windows(2) {
        surface.dashed_line([pair[0], pair[1]], stroke, DASH, GAP);
    }
}

fn with_alpha(c: Color32, a: u8) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), a)
}

fn draw_drag(surface: &mut LayerSurface, input: &RenderInput, drag: &DragState) {
    let vp = input.viewport;
    let Some(target_row_idx) = input.relational.row_of_resource(drag.preview_resource) else {
        return;
    };
    let target_row = &input.rows[target_row_idx];
    let row_y = vp.virtual_y_to_y(target_row.virtual_y);

    // Drop-zone band across the target row.
    let band = Rect::from_min_size(
        Pos2::new(0.0, row_y),
        egui::vec2(vp.width, target_row.height),
    );
    let band_fill = if drag.is_valid() {
        theme::DROP_VALID
    } else {
        theme::DROP_INVALID
    };
    surface.rect_filled(band, Rounding::ZERO, band_fill);

    // Ghost outline where the task started.
    if let Some(origin_row_idx) = input.relational.row_of_resource(drag.original.resource_id) {
        let origin_row = &input.rows[origin_row_idx];
        let ghost = bar_rect(
            vp,
            &drag.original,
            vp.virtual_y_to_y(origin_row.virtual_y),
            origin_row.height,
        );
        dashed_rect(surface, ghost, Stroke::new(1.0, theme::DRAG_GHOST));
    }

    // Collision highlights on the tasks the preview overlaps.
    for id in &drag.collisions {
        let Some(task) = input.tasks.get(id) else {
            continue;
        };
        let Some(row_idx) = input.relational.row_of_resource(task.resource_id) else {
            continue;
        };
        let row = &input.rows[row_idx];
        let rect = bar_rect(vp, task, vp.virtual_y_to_y(row.virtual_y), row.height);
        surface.rect_filled(rect, Rounding::same(theme::BAR_ROUNDING), theme::COLLISION_FILL);
    }

    // Preview bar at the candidate position.
    let x0 = vp.time_to_x(drag.preview_start);
    let x1 = vp.time_to_x(drag.preview_end).max(x0 + 2.0);
    let preview = Rect::from_min_max(
        Pos2::new(x0, row_y + theme::BAR_INSET),
        Pos2::new(x1, row_y + target_row.height - theme::BAR_INSET),
    );
    surface.rect_filled(
        preview,
        Rounding::same(theme::BAR_ROUNDING),
        with_alpha(drag.original.color, theme::DRAG_PREVIEW_ALPHA),
    );
    surface.rect_stroke(
        preview,
        Rounding::same(theme::BAR_ROUNDING),
        Stroke::new(1.5, theme::BORDER_ACCENT),
    );

    // Snap guide at where the manipulated edge would land on commit.
    let edge = manipulated_edge(drag);
    let snapped = vp.snap_to_grid(edge, input.min_resolution_minutes);
    let guide_x = vp.time_to_x(snapped);
    if (0.0..=vp.width).contains(&guide_x) {
        surface.dashed_line(
            [Pos2::new(guide_x, 0.0), Pos2::new(guide_x, vp.height)],
            Stroke::new(1.0, theme::SNAP_GUIDE),
            DASH,
            GAP,
        );
    }

    // Time tooltip pinned above the manipulated edge of the preview,
    // trailing side for end-resizes.
    let label = edge.format("%a %d %b %H:%M").to_string();
    let font = theme::font_small();
    let text_w = input.measure.text_width(&label, &font);
    let pad = egui::vec2(5.0, 3.0);
    let size = egui::vec2(text_w, font.size + 2.0) + pad * 2.0;
    let edge_x = vp.time_to_x(edge);
    let min_x = match drag.kind {
        DragKind::ResizeEnd => edge_x - size.x - 6.0,
        _ => edge_x + 6.0,
    };
    let min_y = (preview.top() - size.y - 4.0).max(2.0);
    let bubble = Rect::from_min_size(Pos2::new(min_x, min_y), size);
    surface.rect_filled(bubble, Rounding::same(3.0), theme::TOOLTIP_BG);
    surface.text(
        bubble.center(),
        Align2::CENTER_CENTER,
        label,
        font,
        theme::TEXT_PRIMARY,
    );
}

/// Top layer: everything transient. Drag preview with ghost, drop zone,
/// collision and snap feedback, plus the marquee rectangle. Empty when
/// nothing is in flight, which is the common case.
pub fn render(surface: &mut LayerSurface, input: &RenderInput) -> Result<(), RenderError> {
    if let Some(drag) = input.drag {
        if drag.has_moved() {
            draw_drag(surface, input, drag);
        }
    }

    if let Some(marquee) = input.marquee {
        surface.rect_filled(marquee, Rounding::ZERO, theme::MARQUEE_FILL);
        surface.rect_stroke(marquee, Rounding::ZERO, Stroke::new(1.0, theme::MARQUEE_STROKE));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RelationalIndex, SpatialIndex};
    use crate::model::{SelectionState, Task, ViewportState, VirtualRow};
    use crate::render::{DrawCmd, FixedTextMeasure, RenderInput};
    use crate::store::HoverState;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    struct Scene {
        tasks: HashMap<Uuid, Task>,
        rows: Vec<VirtualRow>,
        relational: RelationalIndex,
        spatial: SpatialIndex,
        viewport: ViewportState,
        selection: SelectionState,
    }

    impl Scene {
        fn new(tasks: Vec<Task>, resources: &[Uuid]) -> Self {
            let rows: Vec<VirtualRow> = resources
                .iter()
                .enumerate()
                .map(|(i, &r)| {
                    let mut row = VirtualRow::resource(r, format!("r{i}"));
                    row.virtual_y = i as f32 * 30.0;
                    row.height = 30.0;
                    row
                })
                .collect();
            let mut relational = RelationalIndex::new();
            relational.rebuild(tasks.iter(), &[], &rows);
            let mut viewport = ViewportState::new(t0());
            viewport.width = 800.0;
            viewport.height = 600.0;
            Self {
                tasks: tasks.into_iter().map(|t| (t.id, t)).collect(),
                rows,
                relational,
                spatial: SpatialIndex::new(),
                viewport,
                selection: SelectionState::default(),
            }
        }

        fn render(&self, drag: Option<&DragState>, marquee: Option<Rect>) -> LayerSurface {
            let input = RenderInput {
                tasks: &self.tasks,
                viewport: &self.viewport,
                selection: &self.selection,
                drag,
                hover: HoverState::default(),
                rows: &self.rows,
                spatial: &self.spatial,
                relational: &self.relational,
                marquee,
                now: t0(),
                min_resolution_minutes: 15,
                measure: &FixedTextMeasure,
            };
            let mut surface = LayerSurface::default();
            surface.set_size(800.0, 600.0);
            render(&mut surface, &input).unwrap();
            surface
        }
    }

    #[test]
    fn idle_overlay_is_empty() {
        let r = Uuid::new_v4();
        let scene = Scene::new(vec![Task::new("t", t0(), 60, r)], &[r]);
        let surface = scene.render(None, None);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn unmoved_drag_draws_nothing() {
        let r = Uuid::new_v4();
        let task = Task::new("t", t0(), 60, r);
        let drag = DragState::begin(DragKind::Move, &task, Pos2::new(10.0, 10.0));
        let scene = Scene::new(vec![task], &[r]);
        let surface = scene.render(Some(&drag), None);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn moved_drag_draws_ghost_preview_and_guide() {
        let r = Uuid::new_v4();
        let task = Task::new("t", t0() + Duration::hours(1), 60, r);
        let mut drag = DragState::begin(DragKind::Move, &task, Pos2::new(100.0, 15.0));
        drag.preview_start = task.start_time + Duration::hours(2);
        drag.preview_end = task.end_time() + Duration::hours(2);
        let scene = Scene::new(vec![task], &[r]);
        let surface = scene.render(Some(&drag), None);

        let dashed = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCmd::DashedLine { .. }))
            .count();
        // Four ghost edges plus the snap guide.
        assert_eq!(dashed, 5);
        assert!(surface
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCmd::RectStroke { .. })));
        assert!(surface
            .commands()
            .iter()
            .any(|c| matches!(c, DrawCmd::Text { .. })));
    }

    #[test]
    fn tooltip_sits_at_the_manipulated_edge() {
        let r = Uuid::new_v4();
        let task = Task::new("t", t0() + Duration::hours(1), 60, r);
        let mut drag = DragState::begin(DragKind::Move, &task, Pos2::new(500.0, 15.0));
        drag.preview_start = task.start_time + Duration::hours(2);
        drag.preview_end = task.end_time() + Duration::hours(2);
        let scene = Scene::new(vec![task], &[r]);
        let surface = scene.render(Some(&drag), None);

        // Preview start is t0+3h (x = 120); the bubble hugs that edge,
        // not the far-away pointer.
        let text_pos = surface
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCmd::Text { pos, .. } => Some(*pos),
                _ => None,
            })
            .expect("tooltip text");
        assert!(text_pos.x > 120.0 && text_pos.x < 250.0, "x = {}", text_pos.x);
        assert!(text_pos.y < 30.0);
    }

    #[test]
    fn collisions_are_highlighted() {
        let r = Uuid::new_v4();
        let a = Task::new("a", t0(), 60, r);
        let b = Task::new("b", t0() + Duration::hours(3), 60, r);
        let mut drag = DragState::begin(DragKind::Move, &a, Pos2::new(100.0, 15.0));
        drag.preview_start = b.start_time;
        drag.preview_end = b.end_time();
        drag.collisions = vec![b.id];
        let scene = Scene::new(vec![a, b.clone()], &[r]);
        let surface = scene.render(Some(&drag), None);

        let collision_fills = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCmd::Rect { fill, .. } if *fill == theme::COLLISION_FILL))
            .count();
        assert_eq!(collision_fills, 1);
    }

    #[test]
    fn marquee_draws_fill_and_border() {
        let r = Uuid::new_v4();
        let scene = Scene::new(vec![], &[r]);
        let rect = Rect::from_min_max(Pos2::new(20.0, 20.0), Pos2::new(140.0, 90.0));
        let surface = scene.render(None, Some(rect));
        assert_eq!(surface.commands().len(), 2);
    }
}
