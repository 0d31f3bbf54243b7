use std::sync::Arc;

use rmcp::{
    Error as McpError, ServerHandler,
    model::{CallToolResult, Content, ErrorCode, ServerCapabilities, ServerInfo},
    schemars, tool,
};
use serde::Deserialize;

use crate::{
    config::RequestDefaults,
    error::{ComicError, ErrorKind},
    pipeline::{ComicPipeline, black_and_white},
    types::ComicRequest,
};

const PNG_MIME: &str = "image/png";
const INVALID_INPUT_MESSAGE: &str = "Invalid image data: expected a base64 encoded PNG or JPEG";
const INTERNAL_MESSAGE: &str = "Comic generation failed";

/// Request for a full comic strip
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateComicStripRequest {
    #[schemars(description = "Base64 encoded PNG or JPEG photo of the main character")]
    pub base_image_data: String,
    #[schemars(description = "What the comic should be about")]
    #[serde(default)]
    pub story_guide: Option<String>,
    #[schemars(description = "Name of the main character")]
    #[serde(default)]
    pub character_name: Option<String>,
    #[schemars(description = "Optional base64 encoded image whose art style to follow")]
    #[serde(default)]
    pub reference_style_data: Option<String>,
}

/// Request for a grayscale conversion
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BlackAndWhiteRequest {
    #[schemars(description = "Base64 encoded PNG or JPEG image")]
    pub image_data: String,
}

/// Map a pipeline failure to its wire error. The detail stays in the log.
pub fn to_mcp_error(tool: &str, err: &ComicError) -> McpError {
    let kind = err.kind();
    tracing::error!(tool, kind = %kind, "Tool call failed: {}", err);
    match kind {
        ErrorKind::InvalidInput => {
            McpError::new(ErrorCode::INVALID_PARAMS, INVALID_INPUT_MESSAGE, None)
        }
        _ => McpError::new(ErrorCode::INTERNAL_ERROR, INTERNAL_MESSAGE, None),
    }
}

/// MCP Server for comic strip generation
#[derive(Clone)]
pub struct ComicMcpServer {
    pipeline: Arc<ComicPipeline>,
    defaults: RequestDefaults,
}

impl ComicMcpServer {
    pub fn new(pipeline: Arc<ComicPipeline>, defaults: RequestDefaults) -> Self {
        Self { pipeline, defaults }
    }

    /// Fill omitted optional arguments from the configured defaults
    fn to_comic_request(&self, request: GenerateComicStripRequest) -> ComicRequest {
        ComicRequest {
            base_image_data: request.base_image_data,
            story_guide: request
                .story_guide
                .unwrap_or_else(|| self.defaults.story_guide.clone()),
            character_name: request
                .character_name
                .unwrap_or_else(|| self.defaults.character_name.clone()),
            reference_style_data: request.reference_style_data,
        }
    }

    pub async fn generate(
        &self,
        request: GenerateComicStripRequest,
    ) -> Result<CallToolResult, McpError> {
        let request = self.to_comic_request(request);
        tracing::info!(
            "Generating comic strip for {} ({})",
            request.character_name,
            request.story_guide
        );
        let output = self
            .pipeline
            .run(request)
            .await
            .map_err(|e| to_mcp_error("generate_comic_strip_tool", &e))?;

        Ok(CallToolResult::success(vec![
            Content::text(output.story.narration()),
            Content::image(output.image_png_base64, PNG_MIME),
        ]))
    }

    pub fn convert_black_and_white(
        &self,
        request: BlackAndWhiteRequest,
    ) -> Result<CallToolResult, McpError> {
        let data = black_and_white(&request.image_data)
            .map_err(|e| to_mcp_error("make_img_black_and_white", &e))?;
        Ok(CallToolResult::success(vec![Content::image(data, PNG_MIME)]))
    }
}

#[tool(tool_box)]
impl ComicMcpServer {
    #[tool(description = "Generate a three panel comic strip from a photo. \
        Returns the story as markdown text and the strip as a PNG image.")]
    async fn generate_comic_strip_tool(
        &self,
        #[tool(aggr)] request: GenerateComicStripRequest,
    ) -> Result<CallToolResult, McpError> {
        self.generate(request).await
    }

    #[tool(description = "Convert an image to black and white. Returns a PNG image.")]
    async fn make_img_black_and_white(
        &self,
        #[tool(aggr)] request: BlackAndWhiteRequest,
    ) -> Result<CallToolResult, McpError> {
        self.convert_black_and_white(request)
    }
}

#[tool(tool_box)]
impl ServerHandler for ComicMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(format!(
                "Comic Strip Server - Turn a photo into a captioned three panel comic strip. {}",
                self.pipeline.info()
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};
    use rmcp::model::RawContent;

    use super::*;
    use crate::{
        decode::{decode_image, encode_png_base64},
        error::{CompositionError, DecodeError, GenerationError},
        generation::testing::*,
        layout::{CAPTION_FONT_SIZE, LayoutCompositor, TITLE_FONT_SIZE, TextFace},
        texture::TextureOverlay,
        types::RequestPart,
    };

    fn create_server(model: Arc<ScriptedModel>) -> ComicMcpServer {
        let pipeline = ComicPipeline::builder(model)
            .with_compositor(LayoutCompositor::new(
                TextFace::builtin(TITLE_FONT_SIZE),
                TextFace::builtin(CAPTION_FONT_SIZE),
                None,
            ))
            .with_texture(TextureOverlay::new(Vec::new(), Default::default()))
            .build();
        ComicMcpServer::new(Arc::new(pipeline), RequestDefaults::default())
    }

    fn photo() -> String {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(48, 48, Rgb([200, 30, 30])));
        encode_png_base64(&image).expect("Should encode photo")
    }

    fn comic_request(base_image_data: String) -> GenerateComicStripRequest {
        GenerateComicStripRequest {
            base_image_data,
            story_guide: None,
            character_name: None,
            reference_style_data: None,
        }
    }

    fn prompt_text(model: &ScriptedModel, call: usize, part: usize) -> String {
        match &model.requests()[call].parts[part] {
            RequestPart::Text(text) => text.clone(),
            RequestPart::Image(_) => panic!("Expected a text part"),
        }
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let err =
            ComicError::InvalidInput(DecodeError::Base64(base64::DecodeError::InvalidLength(7)));
        let mcp = to_mcp_error("generate_comic_strip_tool", &err);
        assert_eq!(mcp.code.0, ErrorCode::INVALID_PARAMS.0);
        assert_eq!(mcp.message, INVALID_INPUT_MESSAGE);
    }

    #[test]
    fn test_other_failures_map_to_opaque_internal_error() {
        let errors = [
            ComicError::Generation(GenerationError::Status {
                status: 500,
                body: "secret upstream detail".to_string(),
            }),
            ComicError::StoryParse {
                raw: "prose".to_string(),
                reason: "expected value".to_string(),
            },
            ComicError::Composition(CompositionError::MissingAsset("paper.png".into())),
            ComicError::Internal("boom".to_string()),
        ];
        for err in &errors {
            let mcp = to_mcp_error("generate_comic_strip_tool", err);
            assert_eq!(mcp.code.0, ErrorCode::INTERNAL_ERROR.0);
            assert_eq!(mcp.message, INTERNAL_MESSAGE);
        }
    }

    #[test]
    fn test_defaults_fill_missing_arguments() {
        let server = create_server(Arc::new(ScriptedModel::new(vec![])));
        let request = server.to_comic_request(comic_request("abc".to_string()));
        assert_eq!(request.story_guide, "Jokes about hackathon");
        assert_eq!(request.character_name, "Your Name");

        let request = server.to_comic_request(GenerateComicStripRequest {
            story_guide: Some("jokes about dogs".to_string()),
            character_name: Some("Ramesh".to_string()),
            ..comic_request("abc".to_string())
        });
        assert_eq!(request.story_guide, "jokes about dogs");
        assert_eq!(request.character_name, "Ramesh");
    }

    #[test]
    fn test_request_deserializes_with_optional_fields() {
        let request: GenerateComicStripRequest =
            serde_json::from_str(r#"{"base_image_data": "abc"}"#).expect("Should deserialize");
        assert_eq!(request.base_image_data, "abc");
        assert!(request.story_guide.is_none());
        assert!(request.reference_style_data.is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_text_and_png() {
        let model = Arc::new(ScriptedModel::new(vec![Ok(panel_parts(3)), Ok(story_parts())]));
        let server = create_server(model.clone());

        let result = server
            .generate(GenerateComicStripRequest {
                story_guide: Some("jokes about dogs".to_string()),
                character_name: Some("Ramesh".to_string()),
                ..comic_request(photo())
            })
            .await
            .expect("Tool call should succeed");

        assert_eq!(result.content.len(), 2);
        match &result.content[0].raw {
            RawContent::Text(text) => assert!(text.text.starts_with("**Dog Days**")),
            _ => panic!("First content should be text"),
        }
        match &result.content[1].raw {
            RawContent::Image(image) => {
                assert_eq!(image.mime_type, PNG_MIME);
                let strip = decode_image(&image.data).expect("Image should decode");
                assert_eq!((strip.width(), strip.height()), (980, 540));
            }
            _ => panic!("Second content should be an image"),
        }

        assert!(prompt_text(&model, 0, 0).contains("jokes about dogs"));
        assert!(prompt_text(&model, 1, 3).contains("Ramesh"));
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_payload_without_model_calls() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let server = create_server(model.clone());

        let err = server
            .generate(comic_request("MXAENdal".to_string()))
            .await
            .expect_err("Should reject payload");
        assert_eq!(err.code.0, ErrorCode::INVALID_PARAMS.0);
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn test_black_and_white_tool() {
        let server = create_server(Arc::new(ScriptedModel::new(vec![])));
        let result = server
            .convert_black_and_white(BlackAndWhiteRequest { image_data: photo() })
            .expect("Should convert");
        assert_eq!(result.content.len(), 1);

        let err = server
            .convert_black_and_white(BlackAndWhiteRequest {
                image_data: "%%%".to_string(),
            })
            .expect_err("Should reject payload");
        assert_eq!(err.code.0, ErrorCode::INVALID_PARAMS.0);
    }
}
