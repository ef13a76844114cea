use egui::{Color32, FontId};

// ── Palette ──────────────────────────────────────────────────────────────────

pub const BG_DARK: Color32 = Color32::from_rgb(24, 24, 32);
pub const BG_PANEL: Color32 = Color32::from_rgb(30, 30, 40);
pub const BG_GROUP_HEADER: Color32 = Color32::from_rgb(38, 41, 54);
pub const BG_ROW_EVEN: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 6);
pub const BG_ROW_HOVER: Color32 = Color32::from_rgba_premultiplied(255, 255, 255, 14);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgb(50, 52, 64);
pub const BORDER_ACCENT: Color32 = Color32::from_rgb(90, 140, 220);
pub const BORDER_HOVER: Color32 = Color32::from_rgb(120, 126, 148);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(230, 232, 240);
pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(155, 160, 178);
pub const TEXT_DIM: Color32 = Color32::from_rgb(100, 105, 120);
pub const TEXT_ON_BAR: Color32 = Color32::from_rgb(255, 255, 255);

pub const ACCENT: Color32 = Color32::from_rgb(80, 140, 220);
pub const TODAY_LINE: Color32 = Color32::from_rgb(240, 75, 75);
pub const TODAY_BAND: Color32 = Color32::from_rgba_premultiplied(240, 75, 75, 8);
pub const GRID_MINOR: Color32 = Color32::from_rgb(38, 40, 50);
pub const GRID_MAJOR: Color32 = Color32::from_rgb(52, 55, 70);
pub const HANDLE_COLOR: Color32 = Color32::from_rgb(255, 255, 255);

pub const PROGRESS_BAR: Color32 = Color32::from_rgb(110, 220, 140);
pub const PROGRESS_TRACK: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 70);

pub const DEP_ARROW: Color32 = Color32::from_rgb(120, 126, 148);
pub const DEP_ARROW_SELECTED: Color32 = Color32::from_rgb(240, 200, 90);

pub const DROP_VALID: Color32 = Color32::from_rgba_premultiplied(80, 200, 120, 26);
pub const DROP_INVALID: Color32 = Color32::from_rgba_premultiplied(230, 80, 80, 26);
pub const COLLISION_FILL: Color32 = Color32::from_rgba_premultiplied(230, 80, 80, 40);
pub const SNAP_GUIDE: Color32 = Color32::from_rgb(240, 200, 90);
pub const DRAG_PREVIEW_ALPHA: u8 = 150;
pub const DRAG_GHOST: Color32 = Color32::from_rgb(130, 136, 158);
pub const MARQUEE_FILL: Color32 = Color32::from_rgba_premultiplied(80, 140, 220, 24);
pub const MARQUEE_STROKE: Color32 = Color32::from_rgb(90, 140, 220);
pub const TOOLTIP_BG: Color32 = Color32::from_rgba_premultiplied(20, 20, 28, 220);

// ── Sizes ────────────────────────────────────────────────────────────────────

pub const ROW_HEIGHT: f32 = 30.0;
pub const GROUP_HEADER_HEIGHT: f32 = 22.0;
pub const BAR_ROUNDING: f32 = 5.0;
pub const BAR_INSET: f32 = 3.0; // vertical inset so bars don't touch row edges
pub const HANDLE_WIDTH: f32 = 4.0;
pub const RESIZE_MARGIN: f32 = 6.0;
pub const DRAG_THRESHOLD: f32 = 4.0;
pub const MIN_WIDTH_FOR_PHASES: f32 = 24.0;
pub const MIN_WIDTH_FOR_TEXT: f32 = 40.0;
pub const PROGRESS_HEIGHT: f32 = 3.0;
pub const ARROW_STUB: f32 = 12.0;
pub const ARROW_HEAD: f32 = 5.0;

// ── Fonts ────────────────────────────────────────────────────────────────────

pub fn font_bar() -> FontId {
    FontId::proportional(11.5)
}

pub fn font_small() -> FontId {
    FontId::proportional(9.5)
}

pub fn font_group() -> FontId {
    FontId::proportional(11.0)
}

// ── Task status colors ───────────────────────────────────────────────────────

pub const TASK_COLORS: &[Color32] = &[
    Color32::from_rgb(66, 133, 244),  // Google blue
    Color32::from_rgb(52, 168, 83),   // Green
    Color32::from_rgb(171, 71, 188),  // Purple
    Color32::from_rgb(251, 140, 0),   // Orange
    Color32::from_rgb(3, 169, 244),   // Light blue
    Color32::from_rgb(229, 57, 53),   // Red
    Color32::from_rgb(0, 188, 212),   // Cyan
    Color32::from_rgb(255, 193, 7),   // Amber
];

pub fn task_color(index: usize) -> Color32 {
    TASK_COLORS[index % TASK_COLORS.len()]
}

pub fn status_tint(status: crate::model::TaskStatus) -> Color32 {
    use crate::model::TaskStatus;
    match status {
        TaskStatus::Scheduled => Color32::TRANSPARENT,
        TaskStatus::InProgress => Color32::from_rgba_premultiplied(255, 255, 255, 16),
        TaskStatus::Completed => Color32::from_rgba_premultiplied(0, 0, 0, 60),
        TaskStatus::Blocked => Color32::from_rgba_premultiplied(230, 80, 80, 40),
    }
}
