use std::sync::Arc;

use crate::{
    error::{GenerationError, Result},
    generation::CallPolicy,
    traits::GenerativeModel,
    types::{
        ContentPart, GenerationRequest, Modality, ModelRequest, PANEL_COUNT, PanelSet, RequestPart,
    },
    working_area::WorkingArea,
};

const PANEL_PROMPT: &str = "\
Turn this into 3 square comic style images as in the reference comic image.
The three images should have a whacky story between them.
Generate the 3 comic panels as separate images, in order.

STRICTLY DO NOT CHANGE THE CHARACTER OR ITS RESEMBLANCE. NO REALISM ONLY CARTOON IMAGES
THE STYLE MUST BE ALWAYS CONSISTENT IN ALL THREE IMAGES, THE OUTPUT IMAGE SHOULD ALWAYS BE IN 1:1 OR SQUARE ASPECT RATIO

CARTOON STYLE IMAGES ONLY IN OUTPUT, NO TEXT BUBBLE IN THE IMAGE
";

pub fn panel_prompt(story_guide: &str) -> String {
    format!("{PANEL_PROMPT}Story Guidance from User is {story_guide} (Ignore if empty)")
}

/// Produces the three comic panels from a base image and a style reference.
pub struct PanelGenerator {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    policy: CallPolicy,
}

impl PanelGenerator {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: impl Into<String>,
        policy: CallPolicy,
    ) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            policy,
        }
    }

    /// Generate panels and persist them as `panel_{n}.png` in `area`.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        area: &WorkingArea,
    ) -> Result<PanelSet> {
        let model_request = ModelRequest {
            model: self.model_name.clone(),
            parts: vec![
                RequestPart::Text(panel_prompt(&request.story_guide)),
                RequestPart::Image(request.base_image.clone()),
                RequestPart::Image(request.reference_style_image.clone()),
            ],
            modalities: vec![Modality::Text, Modality::Image],
        };

        let images = self
            .policy
            .call_with(self.model.as_ref(), &model_request, |parts| {
                let images: Vec<_> = parts
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::Image(image) => Some(image),
                        ContentPart::Text(text) => {
                            tracing::debug!("Panel model text response: {}", text);
                            None
                        }
                    })
                    .collect();
                // Checked inside the attempt so a short response is retried
                if images.len() < PANEL_COUNT {
                    return Err(GenerationError::InsufficientPanels {
                        expected: PANEL_COUNT,
                        received: images.len(),
                    });
                }
                Ok(images)
            })
            .await?;

        for (i, image) in images.iter().enumerate() {
            let path = area.save_png(&format!("panel_{}.png", i + 1), image)?;
            tracing::debug!("Saved panel {} to {}", i + 1, path.display());
        }
        if images.len() > PANEL_COUNT {
            tracing::warn!(
                "Model returned {} panels, using the first {}",
                images.len(),
                PANEL_COUNT
            );
        }
        tracing::info!("{} comic panels saved to {}", images.len(), area.path().display());

        Ok(PanelSet::try_from(images)?)
    }
}
