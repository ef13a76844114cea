use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use egui::{Align2, Pos2, Rect, Rounding, Stroke};

use super::{LayerSurface, RenderError, RenderInput};
use crate::index::visible_row_range;
use crate::model::ZoomLevel;
use crate::theme;

/// Minor/major gridline cadence for a zoom tier.
fn line_intervals(level: ZoomLevel) -> (Duration, Duration) {
    match level {
        ZoomLevel::Hour => (Duration::hours(1), Duration::days(1)),
        ZoomLevel::Day => (Duration::hours(6), Duration::days(1)),
        ZoomLevel::Week => (Duration::days(1), Duration::weeks(1)),
        ZoomLevel::Month => (Duration::weeks(1), Duration::days(30)),
    }
}

/// Largest instant on the interval lattice that is `<= t`. Weeks align to
/// Monday, months to the 1st; everything shorter is a plain multiple of
/// the interval in unix seconds.
pub fn align_down(t: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    if interval >= Duration::days(28) {
        let date = t.date_naive().with_day(1).unwrap_or(t.date_naive());
        return Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
    }
    if interval == Duration::weeks(1) {
        let date = t.date_naive()
            - Duration::days(t.date_naive().weekday().num_days_from_monday() as i64);
        return Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap());
    }
    let step = interval.num_seconds().max(1);
    let floored = t.timestamp().div_euclid(step) * step;
    Utc.timestamp_opt(floored, 0).unwrap()
}

fn step_forward(t: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    if interval >= Duration::days(28) {
        let (year, month) = if t.month() == 12 {
            (t.year() + 1, 1)
        } else {
            (t.year(), t.month() + 1)
        };
        return Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap();
    }
    t + interval
}

fn major_label(t: DateTime<Utc>, level: ZoomLevel) -> String {
    match level {
        ZoomLevel::Hour | ZoomLevel::Day => t.format("%a %d %b").to_string(),
        ZoomLevel::Week => t.format("%d %b").to_string(),
        ZoomLevel::Month => t.format("%b %Y").to_string(),
    }
}

fn minor_label(t: DateTime<Utc>, level: ZoomLevel) -> Option<String> {
    match level {
        ZoomLevel::Hour => Some(format!("{:02}:00", t.hour())),
        _ => None,
    }
}

/// Bottom layer: background, row stripes and group headers, time
/// gridlines with labels, and the current-time marker.
pub fn render(surface: &mut LayerSurface, input: &RenderInput) -> Result<(), RenderError> {
    let vp = input.viewport;
    let bounds = surface.bounds();
    surface.rect_filled(bounds, Rounding::ZERO, theme::BG_DARK);

    // Row stripes and separators, culled to the visible slice.
    let range = visible_row_range(input.rows, vp.scroll_y, vp.height);
    for i in range {
        let row = &input.rows[i];
        let y = vp.virtual_y_to_y(row.virtual_y);
        let rect = Rect::from_min_size(Pos2::new(0.0, y), egui::vec2(vp.width, row.height));

        if row.is_group_header {
            surface.rect_filled(rect, Rounding::ZERO, theme::BG_GROUP_HEADER);
            let marker = if row.is_collapsed { "▸" } else { "▾" };
            surface.text(
                Pos2::new(6.0, rect.center().y),
                Align2::LEFT_CENTER,
                format!("{marker} {}", row.label),
                theme::font_group(),
                theme::TEXT_PRIMARY,
            );
            continue;
        }

        if input.hover.row == Some(i) {
            surface.rect_filled(rect, Rounding::ZERO, theme::BG_ROW_HOVER);
        } else if i % 2 == 0 {
            surface.rect_filled(rect, Rounding::ZERO, theme::BG_ROW_EVEN);
        }
        surface.line_segment(
            [Pos2::new(0.0, rect.bottom()), Pos2::new(vp.width, rect.bottom())],
            Stroke::new(1.0, theme::BORDER_SUBTLE),
        );
    }

    // Vertical time gridlines across the visible range.
    let level = vp.zoom_level();
    let (minor, major) = line_intervals(level);
    let (start, end) = vp.visible_time_range();

    let mut t = align_down(start, minor);
    while t <= end {
        if align_down(t, major) != t {
            let x = vp.time_to_x(t);
            surface.line_segment(
                [Pos2::new(x, 0.0), Pos2::new(x, vp.height)],
                Stroke::new(1.0, theme::GRID_MINOR),
            );
            if let Some(label) = minor_label(t, level) {
                surface.text(
                    Pos2::new(x + 3.0, 3.0),
                    Align2::LEFT_TOP,
                    label,
                    theme::font_small(),
                    theme::TEXT_DIM,
                );
            }
        }
        t = step_forward(t, minor);
    }

    // Major boundaries run on their own lattice so month starts are never
    // skipped by the weekly minor stepping.
    let mut t = align_down(start, major);
    while t <= end {
        let x = vp.time_to_x(t);
        surface.line_segment(
            [Pos2::new(x, 0.0), Pos2::new(x, vp.height)],
            Stroke::new(1.0, theme::GRID_MAJOR),
        );
        surface.text(
            Pos2::new(x + 4.0, 3.0),
            Align2::LEFT_TOP,
            major_label(t, level),
            theme::font_small(),
            theme::TEXT_SECONDARY,
        );
        t = step_forward(t, major);
    }

    // Current-day band and the now line.
    let day_start = align_down(input.now, Duration::days(1));
    let day_end = day_start + Duration::days(1);
    let band_left = vp.time_to_x(day_start);
    let band_right = vp.time_to_x(day_end);
    if band_right >= 0.0 && band_left <= vp.width {
        surface.rect_filled(
            Rect::from_min_max(
                Pos2::new(band_left.max(0.0), 0.0),
                Pos2::new(band_right.min(vp.width), vp.height),
            ),
            Rounding::ZERO,
            theme::TODAY_BAND,
        );
    }
    let now_x = vp.time_to_x(input.now);
    if (0.0..=vp.width).contains(&now_x) {
        surface.line_segment(
            [Pos2::new(now_x, 0.0), Pos2::new(now_x, vp.height)],
            Stroke::new(1.5, theme::TODAY_LINE),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{RelationalIndex, SpatialIndex};
    use crate::model::{SelectionState, ViewportState, VirtualRow};
    use crate::render::{DrawCmd, FixedTextMeasure};
    use crate::store::HoverState;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn origin() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn align_down_floors_hours_and_weeks() {
        let t = Utc.with_ymd_and_hms(2026, 3, 5, 14, 37, 12).unwrap();
        assert_eq!(
            align_down(t, Duration::hours(1)),
            Utc.with_ymd_and_hms(2026, 3, 5, 14, 0, 0).unwrap()
        );
        // 2026-03-05 is a Thursday; the week starts Monday 2026-03-02.
        assert_eq!(align_down(t, Duration::weeks(1)), origin());
        assert_eq!(
            align_down(t, Duration::days(30)),
            Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn month_stepping_wraps_the_year() {
        let dec = Utc.with_ymd_and_hms(2026, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(
            step_forward(dec, Duration::days(30)),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn offscreen_rows_draw_nothing() {
        let rows: Vec<VirtualRow> = (0..200)
            .map(|i| {
                let mut r = VirtualRow::resource(Uuid::new_v4(), format!("r{i}"));
                r.virtual_y = i as f32 * 30.0;
                r.height = 30.0;
                r
            })
            .collect();

        let mut vp = ViewportState::new(origin());
        vp.width = 800.0;
        vp.height = 300.0;
        vp.scroll_y = 0.0;

        let tasks = HashMap::new();
        let selection = SelectionState::default();
        let spatial = SpatialIndex::new();
        let relational = RelationalIndex::new();
        let input = RenderInput {
            tasks: &tasks,
            viewport: &vp,
            selection: &selection,
            drag: None,
            hover: HoverState::default(),
            rows: &rows,
            spatial: &spatial,
            relational: &relational,
            marquee: None,
            now: origin(),
            min_resolution_minutes: 15,
            measure: &FixedTextMeasure,
        };

        let mut surface = LayerSurface::default();
        surface.set_size(800.0, 300.0);
        render(&mut surface, &input).unwrap();

        // Separators exist only for the visible slice plus the buffer, far
        // fewer than one per row.
        let separators = surface
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCmd::Line { points, .. } if points[0].y == points[1].y))
            .count();
        assert!(separators < 20, "drew {separators} row separators");
    }
}
