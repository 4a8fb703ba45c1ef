// src/render/canvas.rs

use image::{Rgba, RgbaImage};

use crate::color::Color;
use crate::render::font;

/// The 2D drawing surface the render engine paints on.
///
/// Coordinates are in raster pixels and may be fractional; a rect covers
/// every pixel whose centre lies inside it.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Reallocates the surface. Previous contents are discarded.
    fn resize(&mut self, width: u32, height: u32);
    /// Resets every pixel to fully transparent.
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color);

    fn measure_text(&self, text: &str, font_size: f64) -> f64 {
        font::measure(text, font_size)
    }

    fn fill_text(&mut self, text: &str, x: f64, baseline: f64, font_size: f64, color: Color) {
        font::rasterize(text, x, baseline, font_size, |cx, cy, cw, ch| {
            self.fill_rect(cx, cy, cw, ch, color)
        });
    }
}

/// A completed raster frame. Moving it between contexts moves the pixel
/// buffer, it is never copied.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// In-memory RGBA surface.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.image.width() && y < self.image.height()).then(|| self.image.get_pixel(x, y).0)
    }

    /// Hands the current contents out as a [`Frame`] and leaves a blank
    /// surface of the same size behind.
    pub fn transfer_frame(&mut self) -> Frame {
        let blank = RgbaImage::new(self.image.width(), self.image.height());
        Frame {
            image: std::mem::replace(&mut self.image, blank),
        }
    }

    /// Replaces the surface contents with `frame`, adopting its size.
    pub fn commit(&mut self, frame: Frame) {
        self.image = frame.image;
    }

    /// Pixel span `[start, end)` whose centres fall inside `[pos, pos + len)`.
    fn span(pos: f64, len: f64, limit: u32) -> Option<(u32, u32)> {
        let (lo, hi) = if len < 0.0 { (pos + len, pos) } else { (pos, pos + len) };
        if !lo.is_finite() || !hi.is_finite() {
            return None;
        }
        let start = (lo - 0.5).ceil().max(0.0);
        let end = (hi - 0.5).ceil().min(limit as f64);
        (start < end).then(|| (start as u32, end as u32))
    }
}

fn blend(dst: &mut Rgba<u8>, src: Color) {
    let sa = src.a.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| -> u8 {
        let c = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(src.r, dst.0[0]),
        mix(src.g, dst.0[1]),
        mix(src.b, dst.0[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = Rgba([0, 0, 0, 0]);
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        let Some((x0, x1)) = Self::span(x, w, self.image.width()) else { return };
        let Some((y0, y1)) = Self::span(y, h, self.image.height()) else { return };
        for py in y0..y1 {
            for px in x0..x1 {
                blend(self.image.get_pixel_mut(px, py), color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pixel_rect_covers_exactly_one_column() {
        let mut c = RasterCanvas::new(10, 2);
        c.fill_rect(3.7, 0.0, 1.0, 2.0, Color::rgb(255, 0, 0));
        let lit: Vec<u32> = (0..10).filter(|&x| c.pixel(x, 0).unwrap()[3] > 0).collect();
        assert_eq!(lit, vec![4]);
    }

    #[test]
    fn rects_are_clipped_to_the_surface() {
        let mut c = RasterCanvas::new(4, 4);
        c.fill_rect(-10.0, -10.0, 100.0, 100.0, Color::rgb(1, 2, 3));
        assert!(c.image().pixels().all(|p| p.0 == [1, 2, 3, 255]));
        c.fill_rect(f64::NAN, 0.0, 1.0, 1.0, Color::rgb(9, 9, 9));
        assert_eq!(c.pixel(0, 0), Some([1, 2, 3, 255]));
    }

    #[test]
    fn translucent_fill_blends_over_opaque() {
        let mut c = RasterCanvas::new(1, 1);
        c.fill_rect(0.0, 0.0, 1.0, 1.0, Color::rgb(0, 0, 0));
        c.fill_rect(0.0, 0.0, 1.0, 1.0, Color::rgba(255, 255, 255, 0.5));
        let p = c.pixel(0, 0).unwrap();
        assert_eq!(p[3], 255);
        assert!((127..=128).contains(&p[0]));
    }

    #[test]
    fn transfer_leaves_blank_surface_of_same_size() {
        let mut c = RasterCanvas::new(3, 2);
        c.fill_rect(0.0, 0.0, 3.0, 2.0, Color::rgb(5, 5, 5));
        let frame = c.transfer_frame();
        assert_eq!((frame.width(), frame.height()), (3, 2));
        assert_eq!(frame.image().get_pixel(0, 0).0, [5, 5, 5, 255]);
        assert!(c.image().pixels().all(|p| p.0[3] == 0));

        let mut visible = RasterCanvas::new(1, 1);
        visible.commit(frame);
        assert_eq!((visible.width(), visible.height()), (3, 2));
    }
}
