use std::sync::Arc;

use crate::{
    error::{ComicError, Result},
    generation::CallPolicy,
    traits::GenerativeModel,
    types::{ContentPart, Modality, ModelRequest, PanelSet, RequestPart, StoryRecord},
};

const STORY_PROMPT: &str = r#"Create a 3-panel comic story based on these images.
Just give one line narrating the scene for each image THE STORY SHOULD BE CONSISTENT OVER THE THREE IMAGES
I need the response in the following format: ONLY THE JSON NOTHING ELSE IN RESPONSE(start with { and end with })
{title:"", text1:"", text2:"",text3:""}
Example Response:
{
  "title": "The Unexpected Curry",
  "text1": "Gopal discovers the curry his wife made is surprisingly spicy.",
  "text2": "He realizes the overwhelming heat might be more than he bargained for.",
  "text3": "But Gopal, ever the comedian, decides to embrace the heat and declare this the spiciest curry champion!"
}
CREATE WACKY FUNNY AND QUIRKY STORIES, KEEP THE LINES SHORT(less than 20 words each).
"#;

pub fn story_prompt(character_name: &str) -> String {
    format!("{STORY_PROMPT}The character's name is {character_name}")
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fence(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```") {
        // Language tag runs up to the first line break
        body = match rest.find('\n') {
            Some(newline) if !rest[..newline].trim().contains(['{', '[']) => &rest[newline + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parse model output into a story, keeping the cleaned text on failure.
pub fn parse_story(raw: &str) -> Result<StoryRecord> {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str(cleaned).map_err(|e| ComicError::StoryParse {
        raw: cleaned.to_string(),
        reason: e.to_string(),
    })
}

/// Narrates three panels with a title and one caption each.
pub struct StoryGenerator {
    model: Arc<dyn GenerativeModel>,
    model_name: String,
    policy: CallPolicy,
}

impl StoryGenerator {
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

    pub async fn generate(&self, panels: &PanelSet, character_name: &str) -> Result<StoryRecord> {
        let mut parts: Vec<RequestPart> = panels.iter().cloned().map(RequestPart::Image).collect();
        parts.push(RequestPart::Text(story_prompt(character_name)));
        let request = ModelRequest {
            model: self.model_name.clone(),
            parts,
            modalities: vec![Modality::Text],
        };

        let text = self
            .policy
            .call_with(self.model.as_ref(), &request, |parts| {
                Ok(parts
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::Text(text) => Some(text),
                        ContentPart::Image(_) => None,
                    })
                    .collect::<String>())
            })
            .await?;

        let story = parse_story(&text)?;
        tracing::info!("Generated story \"{}\"", story.title);
        Ok(story)
    }
}
