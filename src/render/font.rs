// src/render/font.rs
//
// Fixed bitmap face for ruler labels. Only the characters a `HH:MM:SS`
// label can contain are defined; anything else advances like a space.

const ROWS: usize = 7;
const DIGIT_COLS: usize = 5;
const COLON_COLS: usize = 2;
/// Glyph cell size relative to the font size in pixels.
const CELL_PER_PX: f64 = 0.1;

// Each row is a bit mask, most significant of DIGIT_COLS bits on the left.
const DIGITS: [[u8; ROWS]; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

const COLON: [u8; ROWS] = [0b00, 0b11, 0b11, 0b00, 0b11, 0b11, 0b00];

fn glyph(c: char) -> Option<(&'static [u8; ROWS], usize)> {
    match c {
        '0'..='9' => Some((&DIGITS[c as usize - '0' as usize], DIGIT_COLS)),
        ':' => Some((&COLON, COLON_COLS)),
        _ => None,
    }
}

fn cell(font_size: f64) -> f64 {
    font_size * CELL_PER_PX
}

/// Horizontal advance of `c` in cells, including one cell of spacing.
fn advance_cells(c: char) -> usize {
    glyph(c).map_or(DIGIT_COLS, |(_, cols)| cols) + 1
}

/// Rendered width of `text` at `font_size` pixels.
pub fn measure(text: &str, font_size: f64) -> f64 {
    let cells: usize = text.chars().map(advance_cells).sum();
    cells as f64 * cell(font_size)
}

/// Calls `fill(x, y, w, h)` for every lit cell of `text`, with the glyph
/// bottoms resting on the `baseline` y coordinate.
pub fn rasterize(text: &str, x: f64, baseline: f64, font_size: f64, mut fill: impl FnMut(f64, f64, f64, f64)) {
    let size = cell(font_size);
    let top = baseline - ROWS as f64 * size;
    let mut pen = x;
    for c in text.chars() {
        if let Some((rows, cols)) = glyph(c) {
            for (r, bits) in rows.iter().enumerate() {
                for col in 0..cols {
                    if bits >> (cols - 1 - col) & 1 == 1 {
                        fill(pen + col as f64 * size, top + r as f64 * size, size, size);
                    }
                }
            }
        }
        pen += advance_cells(c) as f64 * size;
    }
}
