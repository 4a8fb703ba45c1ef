// src/render/mod.rs

pub mod canvas;
pub mod font;
pub mod layers;
pub mod layout;

use serde::{Deserialize, Serialize};

use crate::options::Options;
use crate::store::SampleBuffer;

pub use canvas::{Canvas, Frame, RasterCanvas};
pub use layout::{second_to_time, RenderResult};

/// Everything one render pass depends on besides the samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub options: Options,
    pub current_time: f64,
    pub width: u32,
    pub height: u32,
}

impl RenderRequest {
    pub fn new(options: &Options, current_time: f64) -> Self {
        Self {
            options: options.clone(),
            current_time,
            width: options.width,
            height: options.height,
        }
    }
}

/// Paints background, grid, ruler, wave and cursor, in that order, onto
/// `canvas` and returns the geometry that was used.
///
/// The canvas must already have the request's dimensions.
pub fn render<C: Canvas + ?Sized>(canvas: &mut C, samples: &SampleBuffer, req: &RenderRequest) -> RenderResult {
    let opts = &req.options;
    let grid_num = layout::grid_num(opts.duration, opts.padding);
    let grid_gap = req.width as f64 / grid_num;
    let begin_time = layout::begin_time(req.current_time, opts.duration);
    let label_width = canvas.measure_text(layout::LABEL_PROBE, layout::FONT_SIZE * opts.pixel_ratio);
    let density = layout::density(grid_gap, label_width);

    let result = RenderResult {
        padding: opts.padding,
        duration: opts.duration,
        grid_gap,
        grid_num,
        begin_time,
        current_time: req.current_time,
        density,
        width: req.width,
        height: req.height,
    };

    let pass = layers::Pass { req, result: &result };
    pass.background(canvas);
    if opts.grid {
        pass.grid(canvas);
    }
    if opts.ruler {
        pass.ruler(canvas);
    }
    if opts.wave {
        pass.wave(canvas, samples);
    }
    if opts.cursor {
        pass.cursor(canvas);
    }

    log::debug!(
        "render pass: begin={} gap={:.3} density={} {}x{}",
        begin_time,
        grid_gap,
        density,
        req.width,
        req.height
    );
    result
}
