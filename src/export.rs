// src/export.rs

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const JPEG_QUALITY: u8 = 100;

/// Flattens RGBA onto black, the way a canvas exports to an opaque format.
fn flatten(image: &RgbaImage) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(image.width() as usize * image.height() as usize * 3);
    for p in image.pixels() {
        let [r, g, b, a] = p.0;
        let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        rgb.extend_from_slice(&[scale(r), scale(g), scale(b)]);
    }
    rgb
}

pub fn write_jpeg<W: Write>(image: &RgbaImage, writer: W) -> Result<()> {
    let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    encoder.write_image(&flatten(image), image.width(), image.height(), ExtendedColorType::Rgb8)?;
    Ok(())
}

pub fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write_jpeg(image, &mut bytes)?;
    Ok(bytes)
}

pub fn jpeg_data_url(image: &RgbaImage) -> Result<String> {
    let bytes = encode_jpeg(image)?;
    Ok(format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(bytes)))
}

/// Writes `<unix-millis>.jpeg` into `dir` and returns its path.
pub fn save_jpeg(image: &RgbaImage, dir: &Path) -> Result<PathBuf> {
    let name = format!("{}.jpeg", chrono::Utc::now().timestamp_millis());
    let path = dir.join(name);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_jpeg(image, &mut writer)?;
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    #[test]
    fn jpeg_keeps_dimensions() {
        let img = RgbaImage::from_pixel(33, 17, Rgba([28, 32, 34, 255]));
        let bytes = encode_jpeg(&img).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (33, 17));
    }

    #[test]
    fn transparent_pixels_flatten_to_black() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 0]));
        assert_eq!(flatten(&img), vec![0, 0, 0]);
        let img = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 255]));
        assert_eq!(flatten(&img), vec![200, 100, 50]);
    }

    #[test]
    fn data_url_has_jpeg_prefix() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let url = jpeg_data_url(&img).unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,/9j/"));
    }

    #[test]
    fn saves_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255]));
        let path = save_jpeg(&img, dir.path()).unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpeg"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
