use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage, RgbaImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    config::DEFAULT_TEXTURES,
    error::{CompositionError, Result},
};

/// Texture alpha is scaled to this fraction before blending.
pub const TEXTURE_OPACITY: f32 = 0.7;
/// Weight of the texture in `multiply` mode.
pub const MULTIPLY_FACTOR: f32 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BlendMode {
    /// Alpha-composite each texture over the running result
    #[default]
    Normal,
    /// Fixed-factor linear blend
    Multiply,
}

/// Paper-texture finishing pass over the composited strip.
#[derive(Debug, Clone)]
pub struct TextureOverlay {
    textures: Vec<PathBuf>,
    mode: BlendMode,
}

impl Default for TextureOverlay {
    fn default() -> Self {
        Self::new(DEFAULT_TEXTURES.iter().map(PathBuf::from).collect(), BlendMode::default())
    }
}

impl TextureOverlay {
    pub fn new(textures: Vec<PathBuf>, mode: BlendMode) -> Self {
        Self { textures, mode }
    }

    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    pub fn apply(&self, base: &DynamicImage) -> Result<RgbImage> {
        let mut result = base.to_rgba8();
        for path in &self.textures {
            let texture = load_texture(path, result.width(), result.height())?;
            result = match self.mode {
                BlendMode::Normal => {
                    image::imageops::overlay(&mut result, &texture, 0, 0);
                    result
                }
                BlendMode::Multiply => blend(&result, &texture, MULTIPLY_FACTOR),
            };
        }
        Ok(DynamicImage::ImageRgba8(result).to_rgb8())
    }

    /// Apply the overlay and write the opaque result to `path`.
    pub fn apply_to(&self, base: &DynamicImage, path: &Path) -> Result<RgbImage> {
        let textured = self.apply(base)?;
        textured.save(path).map_err(|source| CompositionError::Encode {
            width: textured.width(),
            height: textured.height(),
            source,
        })?;
        tracing::debug!("Saved textured image at {}", path.display());
        Ok(textured)
    }
}

fn load_texture(path: &Path, width: u32, height: u32) -> Result<RgbaImage> {
    if !path.exists() {
        return Err(CompositionError::MissingAsset(path.to_path_buf()).into());
    }
    let texture = image::open(path).map_err(|source| CompositionError::Asset {
        path: path.to_path_buf(),
        source,
    })?;
    let mut texture = texture.resize_exact(width, height, FilterType::CatmullRom).to_rgba8();
    for pixel in texture.pixels_mut() {
        pixel[3] = (pixel[3] as f32 * TEXTURE_OPACITY) as u8;
    }
    Ok(texture)
}

/// `base * (1 - alpha) + over * alpha` on every channel, alpha included.
fn blend(base: &RgbaImage, over: &RgbaImage, alpha: f32) -> RgbaImage {
    let mut out = base.clone();
    for (dst, src) in out.pixels_mut().zip(over.pixels()) {
        for c in 0..4 {
            let mixed = dst[c] as f32 * (1.0 - alpha) + src[c] as f32 * alpha;
            dst[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn create_test_base() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(104, 54, Rgb([255, 255, 255])))
    }

    fn write_texture(dir: &Path, name: &str, width: u32, height: u32, color: Rgba<u8>) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(width, height, color).save(&path).expect("Should save texture");
        path
    }

    #[test]
    fn test_output_matches_base_dimensions() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let small = write_texture(dir.path(), "small.png", 7, 3, Rgba([120, 100, 80, 255]));
        let large = write_texture(dir.path(), "large.png", 400, 900, Rgba([10, 10, 10, 128]));

        for mode in [BlendMode::Normal, BlendMode::Multiply] {
            let overlay = TextureOverlay::new(vec![small.clone(), large.clone()], mode);
            let out = overlay.apply(&create_test_base()).expect("Should apply textures");
            assert_eq!(out.dimensions(), (104, 54));
        }
    }

    #[test]
    fn test_normal_mode_uses_reduced_opacity() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let black = write_texture(dir.path(), "black.png", 10, 10, Rgba([0, 0, 0, 255]));

        let out = TextureOverlay::new(vec![black], BlendMode::Normal)
            .apply(&create_test_base())
            .expect("Should apply texture");
        // 70% black over white leaves roughly 30% white
        let value = out.get_pixel(50, 20)[0];
        assert!((70..=84).contains(&value), "unexpected channel value {value}");
    }

    #[test]
    fn test_multiply_mode_blends_fixed_factor() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let black = write_texture(dir.path(), "black.png", 10, 10, Rgba([0, 0, 0, 255]));

        let out = TextureOverlay::new(vec![black], BlendMode::Multiply)
            .apply(&create_test_base())
            .expect("Should apply texture");
        assert_eq!(*out.get_pixel(50, 20), Rgb([204, 204, 204]));
    }

    #[test]
    fn test_missing_texture_is_composition_error() {
        let overlay = TextureOverlay::new(
            vec![PathBuf::from("/nonexistent/paper.png")],
            BlendMode::Normal,
        );
        let err = overlay.apply(&create_test_base()).expect_err("Should fail");
        assert!(matches!(
            err,
            crate::ComicError::Composition(CompositionError::MissingAsset(_))
        ));
    }

    #[test]
    fn test_empty_texture_list_is_identity() {
        let out = TextureOverlay::new(Vec::new(), BlendMode::Normal)
            .apply(&create_test_base())
            .expect("Should apply");
        assert!(out.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn test_blend_mode_parsing() {
        assert_eq!("multiply".parse::<BlendMode>().ok(), Some(BlendMode::Multiply));
        assert_eq!("Normal".parse::<BlendMode>().ok(), Some(BlendMode::Normal));
        assert!("screen".parse::<BlendMode>().is_err());
        assert_eq!(TextureOverlay::default().mode(), BlendMode::Normal);
    }
}
