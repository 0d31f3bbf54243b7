//! # Comic Strip Generation Library
//!
//! Turns a single photo into a captioned three-panel comic strip. Panels and
//! the story are produced by a generative model, then laid out on a fixed
//! canvas and finished with a paper texture.
//!
//! ## Core Features
//!
//! - **Pluggable Backend**: Any [`GenerativeModel`] can drive panel and story generation
//! - **Deterministic Layout**: Title, panels, wrapped captions and borders on a 980x540 canvas
//! - **Texture Finishing**: Paper overlay in `normal` or `multiply` blend mode
//! - **MCP Server**: Exposes the pipeline as a tool returning narration and a PNG
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use comic::{ComicConfig, ComicPipeline, ComicRequest, GeminiClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ComicConfig::default();
//! let client = GeminiClient::from_config(&config.model, &std::env::var("GEMINI_API_KEY")?)?;
//! let pipeline = ComicPipeline::builder(Arc::new(client)).build();
//!
//! let output = pipeline
//!     .run(ComicRequest {
//!         base_image_data: std::fs::read_to_string("photo.b64")?,
//!         story_guide: "jokes about dogs".to_string(),
//!         character_name: "Ramesh".to_string(),
//!         reference_style_data: None,
//!     })
//!     .await?;
//! println!("{}", output.story.narration());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod decode;
pub mod error;
pub mod generation;
pub mod layout;
pub mod mcp;
pub mod pipeline;
pub mod texture;
pub mod traits;
pub mod types;
pub mod working_area;

// Re-exports for convenience
pub use config::{ComicConfig, ConfigError};
pub use error::{ComicError, ErrorKind, Result};
pub use generation::{CallPolicy, GeminiClient};
pub use layout::{LayoutCompositor, LayoutGeometry};
pub use pipeline::{ComicPipeline, builder::PipelineBuilder};
pub use texture::{BlendMode, TextureOverlay};
pub use traits::GenerativeModel;
pub use types::{ComicOutput, ComicRequest, PanelSet, StoryRecord};
pub use working_area::WorkingArea;
