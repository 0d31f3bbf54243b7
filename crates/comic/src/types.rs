use image::DynamicImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::GenerationError;

/// Number of panels in every strip.
pub const PANEL_COUNT: usize = 3;

/// Title and one caption per panel, as returned by the story model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StoryRecord {
    pub title: String,
    pub text1: String,
    pub text2: String,
    pub text3: String,
}

impl StoryRecord {
    /// Captions in panel order
    pub fn lines(&self) -> [&str; PANEL_COUNT] {
        [&self.text1, &self.text2, &self.text3]
    }

    /// Markdown block returned to the caller alongside the image
    pub fn narration(&self) -> String {
        format!(
            "**{}**\n\n1. {}\n2. {}\n3. {}",
            self.title, self.text1, self.text2, self.text3
        )
    }
}

/// Exactly three generated panels, in arrival order.
#[derive(Debug, Clone)]
pub struct PanelSet {
    panels: [DynamicImage; PANEL_COUNT],
}

impl PanelSet {
    pub fn new(panels: [DynamicImage; PANEL_COUNT]) -> Self {
        Self { panels }
    }

    pub fn panels(&self) -> &[DynamicImage; PANEL_COUNT] {
        &self.panels
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicImage> {
        self.panels.iter()
    }
}

impl TryFrom<Vec<DynamicImage>> for PanelSet {
    type Error = GenerationError;

    /// Keeps the first three images. Fewer than three is an error.
    fn try_from(mut images: Vec<DynamicImage>) -> Result<Self, Self::Error> {
        let received = images.len();
        if received < PANEL_COUNT {
            return Err(GenerationError::InsufficientPanels {
                expected: PANEL_COUNT,
                received,
            });
        }
        images.truncate(PANEL_COUNT);
        let panels: [DynamicImage; PANEL_COUNT] =
            images.try_into().map_err(|rest: Vec<DynamicImage>| {
                GenerationError::InsufficientPanels {
                    expected: PANEL_COUNT,
                    received: rest.len(),
                }
            })?;
        Ok(Self { panels })
    }
}

/// Inputs for one panel-generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub story_guide: String,
    pub base_image: DynamicImage,
    pub reference_style_image: DynamicImage,
}

/// A tool invocation after defaults have been applied.
#[derive(Debug, Clone)]
pub struct ComicRequest {
    pub base_image_data: String,
    pub story_guide: String,
    pub character_name: String,
    pub reference_style_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ComicOutput {
    pub story: StoryRecord,
    /// Final textured strip, PNG encoded then base64 encoded
    pub image_png_base64: String,
    pub width: u32,
    pub height: u32,
}

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone)]
pub enum RequestPart {
    Text(String),
    Image(DynamicImage),
}

/// Provider-neutral generation request.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub parts: Vec<RequestPart>,
    pub modalities: Vec<Modality>,
}

/// One part of a model response, in the order the provider returned it.
#[derive(Debug, Clone)]
pub enum ContentPart {
    Text(String),
    Image(DynamicImage),
}
