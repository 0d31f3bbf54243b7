use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

const GLYPH_SIZE: u32 = 8;

/// A text face used by the layout: a loaded font file, or the built-in
/// 8x8 bitmap face when the file is unavailable.
pub enum TextFace {
    Outline { font: FontVec, scale: PxScale },
    Bitmap { scale: u32 },
}

impl TextFace {
    /// Load a font file at `size` px, degrading to the bitmap face on failure.
    pub fn load(path: &Path, size: f32) -> Self {
        let loaded = std::fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| FontVec::try_from_vec(bytes).map_err(|e| e.to_string()));
        match loaded {
            Ok(font) => Self::Outline {
                font,
                scale: PxScale::from(size),
            },
            Err(e) => {
                tracing::warn!(
                    "Error loading font {}: {}. Falling back to built-in font",
                    path.display(),
                    e
                );
                Self::builtin(size)
            }
        }
    }

    /// Bitmap face scaled to roughly match a `size` px outline font
    pub fn builtin(size: f32) -> Self {
        Self::Bitmap {
            scale: ((size / 12.0).floor() as u32).max(1),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Bitmap { .. })
    }

    /// Rendered (width, height) of `text`
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Outline { font, scale } => text_size(*scale, font, text),
            Self::Bitmap { scale } => {
                let chars = text.chars().count() as u32;
                (chars * GLYPH_SIZE * scale, GLYPH_SIZE * scale)
            }
        }
    }

    /// Height used to stack wrapped lines
    pub fn line_height(&self) -> u32 {
        self.measure("Ag").1
    }

    pub fn draw(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
        match self {
            Self::Outline { font, scale } => draw_text_mut(canvas, color, x, y, *scale, font, text),
            Self::Bitmap { scale } => draw_bitmap_text(canvas, color, x, y, *scale, text),
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let advance = (GLYPH_SIZE * scale) as i32;
    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        let origin_x = x + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + (col * scale) as i32;
                let py = y + (row as u32 * scale) as i32;
                fill_block(canvas, color, px, py, scale);
            }
        }
    }
}

fn fill_block(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: u32) {
    let (width, height) = canvas.dimensions();
    for dy in 0..size as i32 {
        for dx in 0..size as i32 {
            let (px, py) = (x + dx, y + dy);
            if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                canvas.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_falls_back() {
        let face = TextFace::load(Path::new("/nonexistent/font.ttf"), 50.0);
        assert!(face.is_builtin());
        assert_eq!(face.measure("abc"), (96, 32));
    }

    #[test]
    fn test_garbage_font_falls_back() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"definitely not a font").expect("Should write");
        assert!(TextFace::load(&path, 14.0).is_builtin());
    }

    #[test]
    fn test_bitmap_draw_marks_pixels_and_clips() {
        let mut canvas = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        let face = TextFace::builtin(14.0);
        face.draw(&mut canvas, Rgb([0, 0, 0]), 0, 0, "H");
        assert!(canvas.pixels().any(|p| *p == Rgb([0, 0, 0])));

        // Partially off-canvas text must not panic
        face.draw(&mut canvas, Rgb([0, 0, 0]), -4, 6, "WIDE TEXT");
    }
}
