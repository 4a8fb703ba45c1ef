// src/render/layers.rs

use crate::render::canvas::Canvas;
use crate::render::layout::{self, RenderResult};
use crate::render::RenderRequest;
use crate::store::SampleBuffer;

/// Ruler tick height before pixel-ratio scaling.
const TICK_HEIGHT: f64 = 15.0;
/// Distance of the label baseline from the ruler edge.
const LABEL_OFFSET: f64 = 30.0;

/// One render pass over resolved geometry. Each layer reads the same
/// `RenderResult`, so toggling one never moves another.
pub struct Pass<'a> {
    pub req: &'a RenderRequest,
    pub result: &'a RenderResult,
}

impl Pass<'_> {
    pub fn background<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let o = &self.req.options;
        let (width, height) = (self.result.width as f64, self.result.height as f64);
        let band = self.result.wave_left();
        canvas.clear();
        canvas.fill_rect(0.0, 0.0, width, height, o.background_color);
        canvas.fill_rect(0.0, 0.0, band, height, o.padding_color);
        canvas.fill_rect(width - band, 0.0, band, height, o.padding_color);
    }

    pub fn grid<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let o = &self.req.options;
        let r = self.result;
        let (width, height) = (r.width as f64, r.height as f64);
        let stride = r.density.max(1) as usize;

        for index in (0..r.grid_num as usize).step_by(stride) {
            canvas.fill_rect(r.grid_gap * index as f64, 0.0, o.pixel_ratio, height, o.grid_color);
        }
        if !(r.grid_gap > 0.0) {
            return;
        }
        let rows = height / r.grid_gap;
        let mut index = 0usize;
        while (index as f64) < rows {
            canvas.fill_rect(0.0, r.grid_gap * index as f64, width, o.pixel_ratio, o.grid_color);
            index += stride;
        }
    }

    pub fn ruler<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let o = &self.req.options;
        let r = self.result;
        let pr = o.pixel_ratio;
        let height = r.height as f64;
        let font_size = layout::FONT_SIZE * pr;
        let tick = TICK_HEIGHT * pr;
        let half_tick = tick / 2.0;

        let grid_num = r.grid_num as i64;
        let padding = o.padding as i64;
        let label_stride = r.density.max(1) as i64 * 10;

        for index in 0..grid_num {
            let offset = index - padding;
            let x = r.grid_gap * index as f64;
            if offset >= 0 && index <= grid_num - padding && offset % 10 == 0 {
                let y = if o.ruler_at_top { 0.0 } else { height - tick };
                canvas.fill_rect(x, y, pr, tick, o.ruler_color);

                if offset % label_stride == 0 {
                    let label = layout::second_to_time(r.begin_time + (offset / 10) as f64);
                    let baseline = if o.ruler_at_top {
                        LABEL_OFFSET * pr
                    } else {
                        height - LABEL_OFFSET * pr + layout::FONT_SIZE
                    };
                    canvas.fill_text(&label, x - font_size * 2.0 + pr, baseline, font_size, o.ruler_color);
                }
            } else if index != 0 && offset.rem_euclid(5) == 0 {
                let y = if o.ruler_at_top { 0.0 } else { height - half_tick };
                canvas.fill_rect(x, y, pr, half_tick, o.ruler_color);
            }
        }
    }

    /// Min/max decimation of the visible sample range into one-pixel
    /// columns. Samples past the end of the buffer read as silence.
    pub fn wave<C: Canvas + ?Sized>(&self, canvas: &mut C, samples: &SampleBuffer) {
        let o = &self.req.options;
        let r = self.result;
        let middle = r.height as f64 / 2.0;
        let left = r.wave_left();
        let wave_width = r.width as f64 - left * 2.0;
        if !(wave_width > 0.0) {
            return;
        }

        let rate = samples.sample_rate() as f64;
        let start = (r.begin_time * rate).max(0.0).floor() as usize;
        let end = ((r.begin_time + o.duration as f64) * rate).floor().max(start as f64) as usize;
        let step = (((end - start) as f64 / wave_width).floor() as usize).max(1);
        let cursor_x = r.x_at(r.current_time);

        let mut column = 0usize;
        let mut emit = |column: usize, min: f32, max: f32| {
            let x = left + column as f64;
            let y = (1.0 + min as f64 * o.wave_scale) * middle;
            let h = ((max - min) as f64 * middle * o.wave_scale).max(1.0);
            let color = if o.progress && cursor_x >= x { o.progress_color } else { o.wave_color };
            canvas.fill_rect(x, y, 1.0, h, color);
        };

        let mut in_bin = 0usize;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for i in start..end {
            let s = samples.get(i);
            if s < min {
                min = s;
            }
            if s > max {
                max = s;
            }
            in_bin += 1;
            if in_bin >= step {
                if column as f64 >= wave_width {
                    return;
                }
                emit(column, min, max);
                column += 1;
                in_bin = 0;
                min = f32::INFINITY;
                max = f32::NEG_INFINITY;
            }
        }

        // Partial bin at the end of the window.
        if in_bin > 0 && (column as f64) < wave_width {
            emit(column, min, max);
        }
    }

    pub fn cursor<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let o = &self.req.options;
        let r = self.result;
        let x = r.x_at(r.current_time);
        canvas.fill_rect(x, 0.0, o.pixel_ratio, r.height as f64, o.cursor_color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::options::Options;
    use crate::render::render;

    /// Records draw calls instead of rasterising them.
    #[derive(Default)]
    struct Recorder {
        width: u32,
        height: u32,
        clears: usize,
        rects: Vec<(f64, f64, f64, f64, Color)>,
    }

    impl Recorder {
        fn new(width: u32, height: u32) -> Self {
            Self { width, height, ..Default::default() }
        }

        fn with_color(&self, color: Color) -> Vec<(f64, f64, f64, f64)> {
            self.rects
                .iter()
                .filter(|r| r.4 == color)
                .map(|r| (r.0, r.1, r.2, r.3))
                .collect()
        }
    }

    impl Canvas for Recorder {
        fn width(&self) -> u32 {
            self.width
        }
        fn height(&self) -> u32 {
            self.height
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }
        fn clear(&mut self) {
            self.clears += 1;
        }
        fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
            self.rects.push((x, y, w, h, color));
        }
    }

    const WAVE: Color = Color::rgb(0, 0, 200);
    const PROGRESS: Color = Color::rgb(0, 200, 0);
    const CURSOR: Color = Color::rgb(200, 0, 0);
    const RULER: Color = Color::rgb(200, 200, 0);
    const GRID: Color = Color::rgb(0, 200, 200);

    fn options(duration: u32, padding: u32) -> Options {
        Options {
            duration,
            padding,
            width: 1500,
            height: 500,
            wave_color: WAVE,
            progress_color: PROGRESS,
            cursor_color: CURSOR,
            ruler_color: RULER,
            grid_color: GRID,
            wave_scale: 1.0,
            ..Options::default()
        }
    }

    fn request(opts: Options, current_time: f64) -> RenderRequest {
        RenderRequest::new(&opts, current_time)
    }

    #[test]
    fn reference_geometry() {
        let mut canvas = Recorder::new(1500, 500);
        let result = render(&mut canvas, &SampleBuffer::empty(44100), &request(options(3, 5), 0.0));
        assert_eq!(result.grid_num, 40.0);
        assert_eq!(result.grid_gap, 37.5);
        assert_eq!(result.begin_time, 0.0);
        assert_eq!(result.density, 1);
        assert_eq!(canvas.clears, 1);
    }

    #[test]
    fn window_snaps_to_duration() {
        let mut canvas = Recorder::new(1500, 500);
        let result = render(&mut canvas, &SampleBuffer::empty(44100), &request(options(3, 5), 7.5));
        assert_eq!(result.begin_time, 6.0);
        assert_eq!(result.current_time, 7.5);
    }

    #[test]
    fn isolated_peak_survives_decimation() {
        // 100 columns over 10 000 samples: step of 100.
        let mut opts = options(1, 0);
        opts.width = 100;
        opts.progress = false;
        let mut data = vec![0.0f32; 10_000];
        data[4_250] = 0.9;
        let samples = SampleBuffer::new(data, 10_000);
        let mut canvas = Recorder::new(100, 500);
        render(&mut canvas, &samples, &request(opts, 0.0));

        let bars = canvas.with_color(WAVE);
        assert_eq!(bars.len(), 100);
        let (x, y, _, h) = bars[42];
        assert_eq!(x, 42.0);
        // min 0, max 0.9 -> spans 250..475 px.
        assert_eq!(y, 250.0);
        assert!((h - 0.9f32 as f64 * 250.0).abs() < 1e-6);
        assert!(bars.iter().enumerate().all(|(i, b)| i == 42 || b.3 == 1.0));
    }

    #[test]
    fn empty_buffer_draws_flat_wave() {
        let mut opts = options(2, 5);
        opts.progress = false;
        let mut canvas = Recorder::new(1500, 500);
        render(&mut canvas, &SampleBuffer::empty(8000), &request(opts, 0.0));
        let bars = canvas.with_color(WAVE);
        // 1500 - 2 * 5 * (1500 / 30) = 1000 columns.
        assert_eq!(bars.len(), 1000);
        assert!(bars.iter().all(|&(_, y, w, h)| y == 250.0 && w == 1.0 && h == 1.0));
    }

    #[test]
    fn window_past_buffer_end_is_zero_filled() {
        let mut opts = options(1, 0);
        opts.width = 10;
        opts.height = 100;
        opts.progress = false;
        let samples = SampleBuffer::new(vec![0.5f32; 5], 10);
        let mut canvas = Recorder::new(10, 100);
        render(&mut canvas, &samples, &request(opts, 0.0));
        let bars = canvas.with_color(WAVE);
        assert_eq!(bars.len(), 10);
        assert!(bars[..5].iter().all(|b| b.1 == 75.0));
        assert!(bars[5..].iter().all(|b| b.1 == 50.0 && b.3 == 1.0));
    }

    #[test]
    fn progress_colors_columns_behind_cursor() {
        let mut opts = options(1, 0);
        opts.width = 100;
        opts.height = 100;
        let samples = SampleBuffer::new(vec![0.0f32; 1_000], 1_000);
        let mut canvas = Recorder::new(100, 100);
        render(&mut canvas, &samples, &request(opts, 0.5));
        // Cursor at x = 0.5 s * 10 columns * 10 px = 50.
        assert_eq!(canvas.with_color(PROGRESS).len(), 51);
        assert_eq!(canvas.with_color(WAVE).len(), 49);
        assert_eq!(canvas.with_color(CURSOR), vec![(50.0, 0.0, 1.0, 100.0)]);
    }

    #[test]
    fn ruler_ticks_and_labels() {
        let mut opts = options(3, 5);
        opts.grid = false;
        opts.wave = false;
        opts.cursor = false;
        let mut canvas = Recorder::new(1500, 500);
        render(&mut canvas, &SampleBuffer::empty(44100), &request(opts, 0.0));
        let ticks: Vec<_> = canvas
            .with_color(RULER)
            .into_iter()
            .filter(|r| r.2 == 1.0 && r.1 == 0.0 && (r.3 == 15.0 || r.3 == 7.5))
            .collect();
        let full: Vec<f64> = ticks.iter().filter(|t| t.3 == 15.0).map(|t| t.0).collect();
        // Columns 5, 15, 25, 35 at 37.5px each.
        assert_eq!(full, vec![187.5, 562.5, 937.5, 1312.5]);
        let halves = ticks.iter().filter(|t| t.3 == 7.5).count();
        // Columns 10, 20, 30 inside the window, 0 excluded, plus none in padding.
        assert_eq!(halves, 3);
    }

    #[test]
    fn ruler_at_bottom_anchors_ticks_to_bottom_edge() {
        let mut opts = options(3, 5);
        opts.ruler_at_top = false;
        opts.grid = false;
        opts.wave = false;
        opts.cursor = false;
        let mut canvas = Recorder::new(1500, 500);
        render(&mut canvas, &SampleBuffer::empty(44100), &request(opts, 0.0));
        assert!(canvas.with_color(RULER).iter().any(|r| r.1 == 485.0 && r.3 == 15.0));
        assert!(canvas.with_color(RULER).iter().all(|r| r.1 > 400.0));
    }

    #[test]
    fn grid_lines_follow_density_stride() {
        let mut opts = options(100, 0);
        opts.ruler = false;
        opts.wave = false;
        opts.cursor = false;
        let mut canvas = Recorder::new(1500, 500);
        let result = render(&mut canvas, &SampleBuffer::empty(44100), &request(opts, 0.0));
        assert!(result.density > 1);
        let verticals = canvas.with_color(GRID).into_iter().filter(|r| r.1 == 0.0 && r.3 == 500.0).count();
        assert_eq!(verticals, (1000 + result.density as usize - 1) / result.density as usize);
    }

    #[test]
    fn layers_paint_in_stacking_order() {
        let back = Color::rgb(1, 1, 1);
        let mut opts = options(3, 5);
        opts.background_color = back;
        opts.padding_color = back;
        opts.progress_color = WAVE;
        let samples = SampleBuffer::new(vec![0.25f32; 44100 * 3], 44100);
        let mut canvas = Recorder::new(1500, 500);
        render(&mut canvas, &samples, &request(opts, 1.0));

        let mut order: Vec<Color> = canvas.rects.iter().map(|r| r.4).collect();
        order.dedup();
        assert_eq!(order, vec![back, GRID, RULER, WAVE, CURSOR]);
    }

    #[test]
    fn disabling_layers_keeps_geometry() {
        let samples = SampleBuffer::new(vec![0.25f32; 44100 * 3], 44100);
        let full = render(&mut Recorder::new(1500, 500), &samples, &request(options(3, 5), 1.0));
        let mut bare = options(3, 5);
        bare.grid = false;
        bare.ruler = false;
        bare.wave = false;
        bare.cursor = false;
        let mut canvas = Recorder::new(1500, 500);
        let stripped = render(&mut canvas, &samples, &request(bare, 1.0));
        assert_eq!(full, stripped);
        // Background plus two padding bands only.
        assert_eq!(canvas.rects.len(), 3);
    }
}
