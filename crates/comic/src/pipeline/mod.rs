pub mod builder;

use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use strum::Display;

use crate::{
    decode::{decode_image, encode_png_base64},
    error::Result,
    generation::{PanelGenerator, StoryGenerator},
    layout::LayoutCompositor,
    texture::TextureOverlay,
    traits::GenerativeModel,
    types::{ComicOutput, ComicRequest, GenerationRequest},
    working_area::WorkingArea,
};

pub const STRIP_FILE: &str = "comic_strip.png";
pub const FINAL_FILE: &str = "final_comic.png";

/// Where the style reference for a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceSource {
    Caller,
    Bundled,
    BaseImage,
}

/// End-to-end comic strip generation: panels, story, layout, texture.
pub struct ComicPipeline {
    panels: PanelGenerator,
    story: StoryGenerator,
    compositor: LayoutCompositor,
    texture: TextureOverlay,
    style_reference: Option<PathBuf>,
    work_root: Option<PathBuf>,
}

impl ComicPipeline {
    /// Create a new pipeline builder around a generative backend
    pub fn builder(model: Arc<dyn GenerativeModel>) -> builder::PipelineBuilder {
        builder::PipelineBuilder::new(model)
    }

    /// Run one invocation. Inputs are validated before any model call, and
    /// the working area is released on every exit path.
    pub async fn run(&self, request: ComicRequest) -> Result<ComicOutput> {
        // Step 1: Decode caller images
        let base_image = decode_image(&request.base_image_data)?;
        let caller_reference = request
            .reference_style_data
            .as_deref()
            .filter(|data| !data.trim().is_empty())
            .map(decode_image)
            .transpose()?;
        tracing::info!(
            "Decoded base image {}x{}",
            base_image.width(),
            base_image.height()
        );

        let area = WorkingArea::create(self.work_root.as_deref())?;

        // Step 2: Resolve the style reference
        let (reference_style_image, source) = self.resolve_reference(caller_reference, &base_image);
        tracing::info!("Using {} style reference", source);

        // Step 3: Generate panels
        let generation = GenerationRequest {
            story_guide: request.story_guide,
            base_image,
            reference_style_image,
        };
        let panels = self.panels.generate(&generation, &area).await?;

        // Step 4: Generate the story from the panels
        let story = self.story.generate(&panels, &request.character_name).await?;

        // Step 5: Lay out the strip and apply the paper texture
        let strip = self.compositor.compose_to(&panels, &story, &area.file(STRIP_FILE))?;
        let textured = self
            .texture
            .apply_to(&DynamicImage::ImageRgb8(strip), &area.file(FINAL_FILE))?;

        let (width, height) = textured.dimensions();
        let image_png_base64 = encode_png_base64(&DynamicImage::ImageRgb8(textured))?;

        Ok(ComicOutput {
            story,
            image_png_base64,
            width,
            height,
        })
    }

    /// Caller reference, else the bundled default if it loads, else the base image.
    fn resolve_reference(
        &self,
        caller: Option<DynamicImage>,
        base_image: &DynamicImage,
    ) -> (DynamicImage, ReferenceSource) {
        if let Some(image) = caller {
            return (image, ReferenceSource::Caller);
        }
        if let Some(path) = self.style_reference.as_deref().filter(|p| p.exists()) {
            match image::open(path) {
                Ok(image) => return (image, ReferenceSource::Bundled),
                Err(e) => tracing::warn!(
                    "Failed to load style reference {}: {}",
                    path.display(),
                    e
                ),
            }
        }
        (base_image.clone(), ReferenceSource::BaseImage)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        let (width, height) = self.compositor.geometry().canvas_size();
        format!(
            "Comic pipeline: {}x{} strip, {} texture blend, style reference {}",
            width,
            height,
            self.texture.mode(),
            self.style_reference
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

/// Grayscale conversion of a base64 image, returned as base64 PNG.
pub fn black_and_white(image_data: &str) -> Result<String> {
    let image = decode_image(image_data)?;
    let gray = DynamicImage::ImageLuma8(image.to_luma8());
    Ok(encode_png_base64(&gray)?)
}
