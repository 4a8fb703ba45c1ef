// src/options.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::color::Color;
use crate::error::{PlayerError, Result};

/// Flat style/geometry configuration of a player.
///
/// Keys serialise in camelCase (`waveColor`, `rulerAtTop`, `refreshDelay`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Options {
    pub use_worker: bool,
    pub width: u32,
    pub height: u32,
    pub wave: bool,
    pub wave_color: Color,
    pub background_color: Color,
    pub padding_color: Color,
    pub cursor: bool,
    pub cursor_color: Color,
    pub progress: bool,
    pub progress_color: Color,
    pub grid: bool,
    pub grid_color: Color,
    pub ruler: bool,
    pub ruler_color: Color,
    pub ruler_at_top: bool,
    pub refresh_delay: u64,
    pub channel: usize,
    pub duration: u32,
    pub padding: u32,
    pub wave_scale: f64,
    pub pixel_ratio: f64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            use_worker: true,
            width: 1500,
            height: 500,
            wave: true,
            wave_color: Color::rgba(255, 255, 255, 0.1),
            background_color: Color::rgb(28, 32, 34),
            padding_color: Color::rgba(255, 255, 255, 0.05),
            cursor: true,
            cursor_color: Color::rgb(255, 0, 0),
            progress: true,
            progress_color: Color::rgba(255, 255, 255, 0.5),
            grid: true,
            grid_color: Color::rgba(255, 255, 255, 0.05),
            ruler: true,
            ruler_color: Color::rgba(255, 255, 255, 0.5),
            ruler_at_top: true,
            refresh_delay: 50,
            channel: 0,
            duration: 10,
            padding: 5,
            wave_scale: 0.8,
            pixel_ratio: 1.0,
        }
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64, integer: bool) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        return Ok(());
    }
    let kind = if integer { "an integer" } else { "a" };
    Err(PlayerError::option(
        name,
        format!("expect {kind} number that >= {min} and <= {max}, but got {value}"),
    ))
}

impl Options {
    pub fn validate(&self) -> Result<()> {
        check_range("refreshDelay", self.refresh_delay as f64, 16.0, 1000.0, true)?;
        check_range("channel", self.channel as f64, 0.0, 5.0, true)?;
        check_range("duration", self.duration as f64, 1.0, 100.0, true)?;
        check_range("padding", self.padding as f64, 0.0, 100.0, true)?;
        check_range("waveScale", self.wave_scale, 0.1, 10.0, false)?;
        check_range("pixelRatio", self.pixel_ratio, 1.0, 10.0, false)?;
        if self.width == 0 {
            return Err(PlayerError::option("width", "expect a number >= 1, but got 0"));
        }
        if self.height == 0 {
            return Err(PlayerError::option("height", "expect a number >= 1, but got 0"));
        }
        Ok(())
    }

    /// Applies a flat key/value patch on top of `self`.
    ///
    /// The result is fully validated before it is returned; on error `self`
    /// is left untouched by the caller.
    pub fn merged(&self, patch: &Value) -> Result<Options> {
        let Value::Object(patch) = patch else {
            return Err(PlayerError::InvalidArgument(
                "setOptions expects to receive object as a parameter".to_string(),
            ));
        };
        let mut base = serde_json::to_value(self)?;
        if let Value::Object(map) = &mut base {
            for (key, value) in patch {
                map.insert(key.clone(), value.clone());
            }
        }
        let next: Options = serde_json::from_value(base)?;
        next.validate()?;
        Ok(next)
    }

    pub fn load_from_disk(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let options: Options = serde_json::from_reader(reader)?;
        options.validate()?;
        Ok(options)
    }

    pub fn save_to_disk(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
