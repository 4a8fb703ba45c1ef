// src/render/layout.rs

use serde::{Deserialize, Serialize};

/// Ten grid columns represent one second of audio.
pub const COLUMNS_PER_SECOND: f64 = 10.0;
/// Ruler label font size before pixel-ratio scaling.
pub const FONT_SIZE: f64 = 11.0;
/// Widest label the ruler can print, used to size label spacing.
pub const LABEL_PROBE: &str = "99:99:99";

/// `duration` seconds of ten columns each, plus `padding` columns per edge.
pub fn grid_num(duration: u32, padding: u32) -> f64 {
    duration as f64 * COLUMNS_PER_SECOND + padding as f64 * 2.0
}

/// Start of the duration-aligned window that contains `current_time`.
pub fn begin_time(current_time: f64, duration: u32) -> f64 {
    let duration = duration as f64;
    if duration <= 0.0 || !current_time.is_finite() {
        return 0.0;
    }
    (current_time / duration).floor() * duration
}

/// Smallest ruler stride (in ten-second steps) whose pixel span is more
/// than 1.5x the widest label.
pub fn density(grid_gap: f64, label_width: f64) -> u32 {
    if !(grid_gap > 0.0) || !grid_gap.is_finite() || !(label_width > 0.0) {
        return 1;
    }
    let mut second = 10.0;
    loop {
        let rate = (grid_gap * second) / (label_width * 1.5);
        if rate > 1.0 {
            return (second / 10.0).floor() as u32;
        }
        second += 10.0;
    }
}

/// `HH:MM:SS`, zero-padded. Hours keep growing past 99.
pub fn second_to_time(second: f64) -> String {
    let total = if second.is_finite() && second > 0.0 { second.floor() as u64 } else { 0 };
    let hour = total / 3600;
    let min = (total - hour * 3600) / 60;
    let sec = total - hour * 3600 - min * 60;
    format!("{hour:02}:{min:02}:{sec:02}")
}

/// Geometry resolved for one render pass and reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub padding: u32,
    pub duration: u32,
    pub grid_gap: f64,
    pub grid_num: f64,
    pub begin_time: f64,
    pub current_time: f64,
    pub density: u32,
    pub width: u32,
    pub height: u32,
}

impl RenderResult {
    /// X coordinate of the left edge of the wave area.
    pub fn wave_left(&self) -> f64 {
        self.padding as f64 * self.grid_gap
    }

    /// X coordinate of the play cursor for `time`.
    pub fn x_at(&self, time: f64) -> f64 {
        self.wave_left() + (time - self.begin_time) * self.grid_gap * COLUMNS_PER_SECOND
    }

    /// Media time under surface column `x`, or `None` inside the padding bands.
    pub fn time_at(&self, x: f64) -> Option<f64> {
        let left = self.wave_left();
        let right = self.width as f64 - left;
        if !(self.grid_gap > 0.0) || x < left || x > right {
            return None;
        }
        Some(self.begin_time + (x - left) / (self.grid_gap * COLUMNS_PER_SECOND))
    }
}
