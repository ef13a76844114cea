use egui::{Align2, Color32, Pos2, Rect, Rounding, Stroke};
use uuid::Uuid;

use super::{truncate_to_width, LayerSurface, RenderError, RenderInput};
use crate::model::{PhaseKind, Task, ViewportState};
use crate::theme;

/// Horizontal culling buffer so bars sliding in at the edge never pop.
const TIME_BUFFER_PX: f32 = 60.0;

fn scale_rgb(c: Color32, f: f32) -> Color32 {
    Color32::from_rgb(
        (c.r() as f32 * f) as u8,
        (c.g() as f32 * f) as u8,
        (c.b() as f32 * f) as u8,
    )
}

/// Segment color: an explicit phase color wins, otherwise setup and
/// cleanup are darkened variants of the bar color.
fn phase_color(task: &Task, kind: PhaseKind, explicit: Option<Color32>) -> Color32 {
    if let Some(c) = explicit {
        return c;
    }
    match kind {
        PhaseKind::Setup => scale_rgb(task.color, 0.65),
        PhaseKind::Execution => task.color,
        PhaseKind::Cleanup => scale_rgb(task.color, 0.5),
    }
}

/// Bar rectangle for a task on a row at screen y, inset vertically so
/// bars never touch the row separators.
pub fn bar_rect(vp: &ViewportState, task: &Task, row_y: f32, row_height: f32) -> Rect {
    let x0 = vp.time_to_x(task.start_time);
    let x1 = vp.time_to_x(task.end_time()).max(x0 + 2.0);
    Rect::from_min_max(
        Pos2::new(x0, row_y + theme::BAR_INSET),
        Pos2::new(x1, row_y + row_height - theme::BAR_INSET),
    )
}

fn draw_bar(surface: &mut LayerSurface, input: &RenderInput, task: &Task, rect: Rect) {
    let selected = input.selection.contains_task(task.id);
    let hovered = input.hover.task == Some(task.id);
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    // Body: either one filled rect or proportional phase segments.
    let total = task.total_duration_minutes();
    if rect.width() >= theme::MIN_WIDTH_FOR_PHASES && task.phases.len() > 1 && total > 0 {
        let mut x = rect.left();
        let last = task.phases.len() - 1;
        for (i, phase) in task.phases.iter().enumerate() {
            let w = rect.width() * phase.duration_minutes as f32 / total as f32;
            let seg = Rect::from_min_max(
                Pos2::new(x, rect.top()),
                Pos2::new(if i == last { rect.right() } else { x + w }, rect.bottom()),
            );
            let seg_rounding = Rounding {
                nw: if i == 0 { theme::BAR_ROUNDING } else { 0.0 },
                sw: if i == 0 { theme::BAR_ROUNDING } else { 0.0 },
                ne: if i == last { theme::BAR_ROUNDING } else { 0.0 },
                se: if i == last { theme::BAR_ROUNDING } else { 0.0 },
            };
            surface.rect_filled(seg, seg_rounding, phase_color(task, phase.kind, phase.color));
            x += w;
        }
    } else {
        surface.rect_filled(rect, rounding, task.color);
    }

    let tint = theme::status_tint(task.status);
    if tint != Color32::TRANSPARENT {
        surface.rect_filled(rect, rounding, tint);
    }

    if task.progress > 0 && task.progress < 100 {
        let track = Rect::from_min_max(
            Pos2::new(rect.left() + 1.0, rect.bottom() - theme::PROGRESS_HEIGHT - 1.0),
            Pos2::new(rect.right() - 1.0, rect.bottom() - 1.0),
        );
        surface.rect_filled(track, Rounding::ZERO, theme::PROGRESS_TRACK);
        let done = Rect::from_min_size(
            track.min,
            egui::vec2(track.width() * task.progress as f32 / 100.0, track.height()),
        );
        surface.rect_filled(done, Rounding::ZERO, theme::PROGRESS_BAR);
    }

    let stroke = if selected {
        Stroke::new(2.0, theme::BORDER_ACCENT)
    } else if hovered {
        Stroke::new(1.5, theme::BORDER_HOVER)
    } else {
        Stroke::new(1.0, theme::BORDER_SUBTLE)
    };
    surface.rect_stroke(rect, rounding, stroke);

    if rect.width() >= theme::MIN_WIDTH_FOR_TEXT {
        let label = truncate_to_width(
            &task.name,
            &theme::font_bar(),
            rect.width() - 8.0,
            input.measure,
        );
        if !label.is_empty() {
            surface.text_clipped(
                rect.center(),
                Align2::CENTER_CENTER,
                label,
                theme::font_bar(),
                theme::TEXT_ON_BAR,
                rect.shrink(1.0),
            );
        }
    }

    // Resize affordances on hover, unless the task refuses manipulation.
    if hovered && !task.is_fixed() && rect.width() >= 2.0 * theme::HANDLE_WIDTH + 4.0 {
        for x in [rect.left() + 1.0, rect.right() - theme::HANDLE_WIDTH - 1.0] {
            let handle = Rect::from_min_size(
                Pos2::new(x, rect.top() + rect.height() * 0.25),
                egui::vec2(theme::HANDLE_WIDTH, rect.height() * 0.5),
            );
            surface.rect_filled(handle, Rounding::same(1.5), theme::HANDLE_COLOR);
        }
    }
}

/// Task layer: every bar intersecting the viewport, culled through the
/// spatial index horizontally and the row layout vertically. Tasks whose
/// resource has no row (collapsed group or unknown resource) are skipped
/// without error. The actively dragged task is left to the interaction
/// layer, which draws its preview and ghost.
pub fn render(surface: &mut LayerSurface, input: &RenderInput) -> Result<(), RenderError> {
    let vp = input.viewport;
    let buffer = vp.width_to_duration(TIME_BUFFER_PX);
    let (start, end) = vp.visible_time_range();
    let mut ids = input.spatial.query_time_range(start - buffer, end + buffer);

    let dragged: Option<Uuid> = input.drag.map(|d| d.task_id);

    // Stable paint order: by row, then start, then id.
    ids.sort_by_key(|id| {
        let task = input.tasks.get(id);
        (
            task.and_then(|t| input.relational.row_of_resource(t.resource_id))
                .unwrap_or(usize::MAX),
            task.map(|t| t.start_time.timestamp()).unwrap_or(i64::MAX),
            *id,
        )
    });

    for id in ids {
        if dragged == Some(id) {
            continue;
        }
        let Some(task) = input.tasks.get(&id) else {
            continue;
        };
        let Some(row_idx) = input.relational.row_of_resource(task.resource_id) else {
            continue;
        };
        let row = &input.rows[row_idx];
        let y = vp.virtual_y_to_y(row.virtual_y);
        if y + row.height < 0.0 || y > vp.height {
            continue;
        }
        let rect = bar_rect(vp, task, y, row.height);
        draw_bar(surface, input, task, rect);
    }

    Ok(())
}
