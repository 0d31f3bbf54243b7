pub mod fonts;

pub use fonts::TextFace;

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage, imageops::FilterType};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
    config::AssetConfig,
    error::{CompositionError, Result},
    types::{PANEL_COUNT, PanelSet, StoryRecord},
};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

pub const TITLE_FONT_SIZE: f32 = 50.0;
pub const CAPTION_FONT_SIZE: f32 = 14.0;

/// Fixed strip geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutGeometry {
    pub image_width: u32,
    pub image_height: u32,
    pub padding: u32,
    pub title_height: u32,
    pub text_box_height: u32,
    /// Caption wrap column, in characters
    pub wrap_width: usize,
    pub caption_offset: u32,
    pub line_gap: u32,
    pub border_width: u32,
}

impl Default for LayoutGeometry {
    fn default() -> Self {
        Self {
            image_width: 300,
            image_height: 300,
            padding: 20,
            title_height: 80,
            text_box_height: 100,
            wrap_width: 28,
            caption_offset: 10,
            line_gap: 5,
            border_width: 2,
        }
    }
}

impl LayoutGeometry {
    pub fn canvas_size(&self) -> (u32, u32) {
        let count = PANEL_COUNT as u32;
        let width = self.image_width * count + self.padding * (count + 1);
        let height =
            self.title_height + self.image_height + self.text_box_height + self.padding * 3;
        (width, height)
    }

    /// Top-left corner of panel `index`
    pub fn panel_origin(&self, index: usize) -> (u32, u32) {
        let x = self.padding + index as u32 * (self.image_width + self.padding);
        (x, self.title_height + self.padding)
    }
}

/// Greedy word wrap at `width` characters; words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let used = current.chars().count();
            let needed = if used == 0 { word.len() } else { used + 1 + word.len() };
            if needed <= width {
                if used > 0 {
                    current.push(' ');
                }
                current.extend(word.iter());
                break;
            }
            if used > 0 {
                lines.push(std::mem::take(&mut current));
                continue;
            }
            // Word alone exceeds the column
            let rest = word.split_off(width);
            lines.push(word.iter().collect());
            word = rest;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Arranges three panels, a title and captions on the strip canvas.
pub struct LayoutCompositor {
    geometry: LayoutGeometry,
    title_face: TextFace,
    caption_face: TextFace,
    background: Option<PathBuf>,
}

impl LayoutCompositor {
    pub fn new(title_face: TextFace, caption_face: TextFace, background: Option<PathBuf>) -> Self {
        Self {
            geometry: LayoutGeometry::default(),
            title_face,
            caption_face,
            background,
        }
    }

    /// Load faces and background from the asset configuration
    pub fn from_assets(assets: &AssetConfig) -> Self {
        Self::new(
            TextFace::load(&assets.title_font, TITLE_FONT_SIZE),
            TextFace::load(&assets.caption_font, CAPTION_FONT_SIZE),
            assets.background_template.clone(),
        )
    }

    pub fn geometry(&self) -> &LayoutGeometry {
        &self.geometry
    }

    fn base_canvas(&self) -> Result<RgbImage> {
        let (width, height) = self.geometry.canvas_size();
        match &self.background {
            Some(path) if path.exists() => {
                let template = image::open(path).map_err(|source| CompositionError::Asset {
                    path: path.clone(),
                    source,
                })?;
                Ok(template.resize_exact(width, height, FilterType::CatmullRom).to_rgb8())
            }
            Some(path) => {
                tracing::debug!("Background {} not found, using white canvas", path.display());
                Ok(RgbImage::from_pixel(width, height, WHITE))
            }
            None => Ok(RgbImage::from_pixel(width, height, WHITE)),
        }
    }

    pub fn compose(&self, panels: &PanelSet, story: &StoryRecord) -> Result<RgbImage> {
        let g = self.geometry;
        let mut canvas = self.base_canvas()?;
        let (canvas_width, _) = canvas.dimensions();

        let (title_width, _) = self.title_face.measure(&story.title);
        let title_x = (canvas_width as i32 - title_width as i32) / 2;
        self.title_face.draw(&mut canvas, BLACK, title_x, g.padding as i32, &story.title);

        for (i, (panel, caption)) in panels.iter().zip(story.lines()).enumerate() {
            let (x, y_img) = g.panel_origin(i);
            let resized = resize_panel(panel, g.image_width, g.image_height);
            image::imageops::replace(&mut canvas, &resized, x as i64, y_img as i64);

            let y_text = y_img + g.image_height + g.caption_offset;
            let line_height = self.caption_face.line_height() + g.line_gap;
            for (j, line) in wrap_text(caption, g.wrap_width).iter().enumerate() {
                let (line_width, _) = self.caption_face.measure(line);
                let text_x = x as i32 + (g.image_width as i32 - line_width as i32) / 2;
                let text_y = (y_text + j as u32 * line_height) as i32;
                self.caption_face.draw(&mut canvas, BLACK, text_x, text_y, line);
            }

            self.draw_border(&mut canvas, x, y_img);
        }

        Ok(canvas)
    }

    /// Compose and also write the strip to `path`.
    pub fn compose_to(
        &self,
        panels: &PanelSet,
        story: &StoryRecord,
        path: &Path,
    ) -> Result<RgbImage> {
        let canvas = self.compose(panels, story)?;
        canvas.save(path).map_err(|source| CompositionError::Encode {
            width: canvas.width(),
            height: canvas.height(),
            source,
        })?;
        tracing::info!("Saved comic strip to {}", path.display());
        Ok(canvas)
    }

    fn draw_border(&self, canvas: &mut RgbImage, x: u32, y_img: u32) {
        let g = self.geometry;
        let left = x as i32 - g.border_width as i32;
        let top = y_img as i32 - g.border_width as i32;
        // Inclusive box from (x - b, y - b) to (x + w + b, y + h + text_box)
        let width = g.image_width + 2 * g.border_width + 1;
        let height = g.image_height + g.text_box_height + g.border_width + 1;
        for inset in 0..g.border_width {
            let rect = Rect::at(left + inset as i32, top + inset as i32)
                .of_size(width - 2 * inset, height - 2 * inset);
            draw_hollow_rect_mut(canvas, rect, BLACK);
        }
    }
}

fn resize_panel(panel: &DynamicImage, width: u32, height: u32) -> RgbImage {
    if panel.width() == width && panel.height() == height {
        panel.to_rgb8()
    } else {
        panel.resize_exact(width, height, FilterType::CatmullRom).to_rgb8()
    }
}
