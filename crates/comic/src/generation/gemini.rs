use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{
    config::ModelConfig,
    decode::encode_png,
    error::GenerationError,
    traits::GenerativeModel,
    types::{ContentPart, Modality, ModelRequest, RequestPart},
};

/// `GenerativeModel` backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &ModelConfig, api_key: &str) -> Result<Self, GenerationError> {
        Self::new(&config.base_url, api_key, config.timeout())
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiError {
    message: String,
}

fn to_wire_part(part: &RequestPart) -> Result<GeminiPart, GenerationError> {
    Ok(match part {
        RequestPart::Text(text) => GeminiPart {
            text: Some(text.clone()),
            inline_data: None,
        },
        RequestPart::Image(image) => {
            let png = encode_png(image).map_err(|e| {
                GenerationError::Request(format!("Failed to encode image part: {e}"))
            })?;
            GeminiPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: "image/png".to_string(),
                    data: STANDARD.encode(png),
                }),
            }
        }
    })
}

fn build_request(request: &ModelRequest) -> Result<GeminiRequest, GenerationError> {
    let parts = request
        .parts
        .iter()
        .map(to_wire_part)
        .collect::<Result<Vec<_>, _>>()?;
    let generation_config = (!request.modalities.is_empty()).then(|| GenerationConfig {
        response_modalities: request.modalities.iter().map(Modality::to_string).collect(),
    });
    Ok(GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config,
    })
}

fn parse_response(body: &str) -> Result<Vec<ContentPart>, GenerationError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Response(format!("Failed to parse Gemini response: {e}")))?;

    if let Some(err) = response.error {
        return Err(GenerationError::Response(err.message));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::Response("Gemini returned no candidates".to_string()))?;
    let content = candidate.content.ok_or_else(|| {
        GenerationError::Response(format!(
            "Gemini candidate has no content. Finish reason: {}",
            candidate.finish_reason.as_deref().unwrap_or("UNKNOWN")
        ))
    })?;

    let mut parts = Vec::with_capacity(content.parts.len());
    for part in content.parts {
        if let Some(inline) = part.inline_data {
            let bytes = STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| GenerationError::InvalidImagePart(e.to_string()))?;
            let image = image::load_from_memory(&bytes).map_err(|e| {
                GenerationError::InvalidImagePart(format!("{} ({})", e, inline.mime_type))
            })?;
            parts.push(ContentPart::Image(image));
        } else if let Some(text) = part.text {
            parts.push(ContentPart::Text(text));
        }
    }
    Ok(parts)
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<Vec<ContentPart>, GenerationError> {
        let body = build_request(&request)?;
        tracing::debug!(
            "Calling Gemini model {} with {} parts",
            request.model,
            request.parts.len()
        );

        let resp = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout)
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Request(format!("Failed reading Gemini body: {e}")))?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}
