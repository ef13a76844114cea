pub mod dependencies;
pub mod grid;
pub mod overlay;
pub mod scheduler;
pub mod tasks;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use egui::{Align2, Color32, FontId, Pos2, Rect, Rounding, Stroke};
use uuid::Uuid;

use crate::index::{RelationalIndex, SpatialIndex};
use crate::model::{DragState, SelectionState, Task, ViewportState, VirtualRow};
use crate::store::HoverState;

pub use scheduler::{Layer, LayerMask, RenderScheduler};

/// A layer draw callback failed; the frame continues with other layers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError(pub String);

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "render error: {}", self.0)
    }
}

impl std::error::Error for RenderError {}

/// Text measurement supplied by the embedding environment, so renderers
/// can truncate labels without owning a font engine.
pub trait TextMeasure {
    fn text_width(&self, text: &str, font: &FontId) -> f32;
}

/// Approximate measure for headless tests: a fixed advance per character.
pub struct FixedTextMeasure;

impl TextMeasure for FixedTextMeasure {
    fn text_width(&self, text: &str, font: &FontId) -> f32 {
        text.chars().count() as f32 * font.size * 0.55
    }
}

/// Everything a layer renderer may read. Renderers are stateless: each
/// call redraws the whole layer from this input.
pub struct RenderInput<'a> {
    pub tasks: &'a HashMap<Uuid, Task>,
    pub viewport: &'a ViewportState,
    pub selection: &'a SelectionState,
    pub drag: Option<&'a DragState>,
    pub hover: HoverState,
    pub rows: &'a [VirtualRow],
    pub spatial: &'a SpatialIndex,
    pub relational: &'a RelationalIndex,
    /// Active marquee-selection rectangle in surface pixels.
    pub marquee: Option<Rect>,
    pub now: DateTime<Utc>,
    pub min_resolution_minutes: i64,
    pub measure: &'a dyn TextMeasure,
}

/// One retained draw command. Layers record commands instead of painting
/// immediately so unchanged layers replay their previous frame for free.
#[derive(Debug, Clone)]
pub enum DrawCmd {
    Rect {
        rect: Rect,
        rounding: Rounding,
        fill: Color32,
    },
    RectStroke {
        rect: Rect,
        rounding: Rounding,
        stroke: Stroke,
    },
    Line {
        points: [Pos2; 2],
        stroke: Stroke,
    },
    DashedLine {
        points: [Pos2; 2],
        stroke: Stroke,
        dash: f32,
        gap: f32,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
        stroke: Stroke,
    },
    Text {
        pos: Pos2,
        anchor: Align2,
        text: String,
        font: FontId,
        color: Color32,
        clip: Option<Rect>,
    },
}

/// The drawing surface of one layer: fixed pixel dimensions plus the
/// recorded command list for the layer's current frame. A surface with
/// zero size counts as not yet attached and render calls against it are
/// no-ops.
#[derive(Debug, Default)]
pub struct LayerSurface {
    width: f32,
    height: f32,
    cmds: Vec<DrawCmd>,
}

impl LayerSurface {
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    pub fn is_attached(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, egui::vec2(self.width, self.height))
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.cmds
    }

    pub fn rect_filled(&mut self, rect: Rect, rounding: Rounding, fill: Color32) {
        self.cmds.push(DrawCmd::Rect { rect, rounding, fill });
    }

    pub fn rect_stroke(&mut self, rect: Rect, rounding: Rounding, stroke: Stroke) {
        self.cmds.push(DrawCmd::RectStroke {
            rect,
            rounding,
            stroke,
        });
    }

    pub fn line_segment(&mut self, points: [Pos2; 2], stroke: Stroke) {
        self.cmds.push(DrawCmd::Line { points, stroke });
    }

    pub fn dashed_line(&mut self, points: [Pos2; 2], stroke: Stroke, dash: f32, gap: f32) {
        self.cmds.push(DrawCmd::DashedLine {
            points,
            stroke,
            dash,
            gap,
        });
    }

    pub fn polygon(&mut self, points: Vec<Pos2>, fill: Color32, stroke: Stroke) {
        self.cmds.push(DrawCmd::Polygon {
            points,
            fill,
            stroke,
        });
    }

    pub fn text(
        &mut self,
        pos: Pos2,
        anchor: Align2,
        text: impl Into<String>,
        font: FontId,
        color: Color32,
    ) {
        self.cmds.push(DrawCmd::Text {
            pos,
            anchor,
            text: text.into(),
            font,
            color,
            clip: None,
        });
    }

    pub fn text_clipped(
        &mut self,
        pos: Pos2,
        anchor: Align2,
        text: impl Into<String>,
        font: FontId,
        color: Color32,
        clip: Rect,
    ) {
        self.cmds.push(DrawCmd::Text {
            pos,
            anchor,
            text: text.into(),
            font,
            color,
            clip: Some(clip),
        });
    }

    /// Replay the recorded frame onto an egui painter, offset by `origin`.
    pub fn paint(&self, painter: &egui::Painter, origin: Pos2) {
        let offset = origin.to_vec2();
        for cmd in &self.cmds {
            match cmd {
                DrawCmd::Rect {
                    rect,
                    rounding,
                    fill,
                } => {
                    painter.rect_filled(rect.translate(offset), *rounding, *fill);
                }
                DrawCmd::RectStroke {
                    rect,
                    rounding,
                    stroke,
                } => {
                    painter.rect_stroke(rect.translate(offset), *rounding, *stroke);
                }
                DrawCmd::Line { points, stroke } => {
                    painter.line_segment([points[0] + offset, points[1] + offset], *stroke);
                }
                DrawCmd::DashedLine {
                    points,
                    stroke,
                    dash,
                    gap,
                } => {
                    painter.extend(egui::Shape::dashed_line(
                        &[points[0] + offset, points[1] + offset],
                        *stroke,
                        *dash,
                        *gap,
                    ));
                }
                DrawCmd::Polygon {
                    points,
                    fill,
                    stroke,
                } => {
                    let pts: Vec<Pos2> = points.iter().map(|p| *p + offset).collect();
                    painter.add(egui::Shape::convex_polygon(pts, *fill, *stroke));
                }
                DrawCmd::Text {
                    pos,
                    anchor,
                    text,
                    font,
                    color,
                    clip,
                } => {
                    let target = match clip {
                        Some(clip_rect) => painter.with_clip_rect(clip_rect.translate(offset)),
                        None => painter.clone(),
                    };
                    target.text(*pos + offset, *anchor, text, font.clone(), *color);
                }
            }
        }
    }
}

/// Truncate `text` so it fits in `max_width`, appending an ellipsis when
/// anything was cut.
pub fn truncate_to_width(
    text: &str,
    font: &FontId,
    max_width: f32,
    measure: &dyn TextMeasure,
) -> String {
    if measure.text_width(text, font) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() {
        out.pop();
        let candidate = format!("{out}…");
        if measure.text_width(&candidate, font) <= max_width {
            return candidate;
        }
    }
    String::new()
}
