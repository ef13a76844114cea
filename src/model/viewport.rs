use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Zoom bounds for `pixels_per_hour`.
pub const MIN_PIXELS_PER_HOUR: f32 = 0.25;
pub const MAX_PIXELS_PER_HOUR: f32 = 120.0;

/// Discrete zoom tier derived from the continuous `pixels_per_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomLevel {
    Hour,
    Day,
    Week,
    Month,
}

impl ZoomLevel {
    /// Snap granularity for drag commits at this tier, in minutes.
    pub fn snap_minutes(&self) -> i64 {
        match self {
            ZoomLevel::Hour => 15,
            ZoomLevel::Day => 60,
            ZoomLevel::Week => 360,
            ZoomLevel::Month => 1440,
        }
    }
}

/// The visible pixel window and its mapping to time/row coordinates.
///
/// All transforms are pure functions of this state. Horizontal positions
/// are computed in f64 against `time_origin` so that `x_to_time` inverts
/// `time_to_x` to floating-point tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    /// Epoch anchor; x = 0 + scroll corresponds to this instant.
    pub time_origin: DateTime<Utc>,
    /// Horizontal scroll offset in pixels.
    pub scroll_x: f32,
    /// Continuous zoom.
    pub pixels_per_hour: f32,
    /// Vertical scroll offset into virtual row space, in pixels.
    pub scroll_y: f32,
    /// Height of one resource row in pixels.
    pub row_height: f32,
    /// Drawing surface dimensions in pixels.
    pub width: f32,
    pub height: f32,
}

impl ViewportState {
    pub fn new(time_origin: DateTime<Utc>) -> Self {
        Self {
            time_origin,
            scroll_x: 0.0,
            pixels_per_hour: 40.0,
            scroll_y: 0.0,
            row_height: crate::theme::ROW_HEIGHT,
            width: 0.0,
            height: 0.0,
        }
    }

    // ===== Horizontal transforms =====

    pub fn time_to_x(&self, t: DateTime<Utc>) -> f32 {
        let hours = (t - self.time_origin).num_seconds() as f64 / 3600.0;
        (hours * self.pixels_per_hour as f64 - self.scroll_x as f64) as f32
    }

    pub fn x_to_time(&self, x: f32) -> DateTime<Utc> {
        let hours = (x as f64 + self.scroll_x as f64) / self.pixels_per_hour as f64;
        self.time_origin + Duration::seconds((hours * 3600.0).round() as i64)
    }

    pub fn duration_to_width(&self, d: Duration) -> f32 {
        (d.num_seconds() as f64 / 3600.0 * self.pixels_per_hour as f64) as f32
    }

    pub fn width_to_duration(&self, px: f32) -> Duration {
        let hours = px as f64 / self.pixels_per_hour as f64;
        Duration::seconds((hours * 3600.0).round() as i64)
    }

    /// Instants at the left and right edge of the surface.
    pub fn visible_time_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.x_to_time(0.0), self.x_to_time(self.width))
    }

    // ===== Vertical transforms =====

    pub fn virtual_y_to_y(&self, virtual_y: f32) -> f32 {
        virtual_y - self.scroll_y
    }

    pub fn y_to_virtual_y(&self, y: f32) -> f32 {
        y + self.scroll_y
    }

    // ===== Zoom =====

    pub fn zoom_level(&self) -> ZoomLevel {
        if self.pixels_per_hour >= 30.0 {
            ZoomLevel::Hour
        } else if self.pixels_per_hour >= 5.0 {
            ZoomLevel::Day
        } else if self.pixels_per_hour >= 1.0 {
            ZoomLevel::Week
        } else {
            ZoomLevel::Month
        }
    }

    /// Rescale zoom by `factor`, keeping the instant under `center_x` at
    /// the same pixel (anchor-preserving zoom).
    pub fn zoom(&mut self, factor: f32, center_x: f32) {
        let anchor = self.x_to_time(center_x);
        self.pixels_per_hour =
            (self.pixels_per_hour * factor).clamp(MIN_PIXELS_PER_HOUR, MAX_PIXELS_PER_HOUR);
        let anchor_hours = (anchor - self.time_origin).num_seconds() as f64 / 3600.0;
        self.scroll_x = (anchor_hours * self.pixels_per_hour as f64 - center_x as f64) as f32;
    }

    // ===== Snapping =====

    /// Round `t` to the nearest multiple of the effective snap interval:
    /// max(zoom-tier snap minutes, configured minimum resolution).
    pub fn snap_to_grid(&self, t: DateTime<Utc>, min_resolution_minutes: i64) -> DateTime<Utc> {
        let interval = self
            .zoom_level()
            .snap_minutes()
            .max(min_resolution_minutes)
            .max(1)
            * 60;
        let secs = t.timestamp();
        let snapped = ((secs as f64 / interval as f64).round() as i64) * interval;
        Utc.timestamp_opt(snapped, 0).unwrap()
    }
}
