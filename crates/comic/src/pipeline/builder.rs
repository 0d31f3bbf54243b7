use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    config::{ComicConfig, ModelConfig},
    generation::{CallPolicy, PanelGenerator, StoryGenerator},
    layout::LayoutCompositor,
    pipeline::ComicPipeline,
    texture::TextureOverlay,
    traits::GenerativeModel,
};

/// Builder for the comic pipeline with a fluent API
pub struct PipelineBuilder {
    model: Arc<dyn GenerativeModel>,
    panel_model: String,
    story_model: String,
    policy: CallPolicy,
    compositor: Option<LayoutCompositor>,
    texture: Option<TextureOverlay>,
    style_reference: Option<PathBuf>,
    work_root: Option<PathBuf>,
}

impl PipelineBuilder {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        let defaults = ModelConfig::default();
        Self {
            model,
            panel_model: defaults.panel_model,
            story_model: defaults.story_model,
            policy: CallPolicy::default(),
            compositor: None,
            texture: None,
            style_reference: None,
            work_root: None,
        }
    }

    /// Pre-fill every stage from a loaded configuration
    pub fn from_config(model: Arc<dyn GenerativeModel>, config: &ComicConfig) -> Self {
        Self::new(model)
            .with_panel_model(config.model.panel_model.clone())
            .with_story_model(config.model.story_model.clone())
            .with_policy(CallPolicy::from(&config.model))
            .with_compositor(LayoutCompositor::from_assets(&config.assets))
            .with_texture(TextureOverlay::new(
                config.assets.textures.clone(),
                config.texture.blend_mode,
            ))
            .with_style_reference(config.assets.style_reference.clone())
            .with_work_root(config.work_root.clone())
    }

    pub fn with_panel_model(mut self, name: impl Into<String>) -> Self {
        self.panel_model = name.into();
        self
    }

    pub fn with_story_model(mut self, name: impl Into<String>) -> Self {
        self.story_model = name.into();
        self
    }

    /// Timeout and retry budget for both model calls
    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_compositor(mut self, compositor: LayoutCompositor) -> Self {
        self.compositor = Some(compositor);
        self
    }

    pub fn with_texture(mut self, texture: TextureOverlay) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Bundled style reference used when the caller sends none
    pub fn with_style_reference(mut self, path: Option<PathBuf>) -> Self {
        self.style_reference = path;
        self
    }

    pub fn with_work_root(mut self, root: Option<PathBuf>) -> Self {
        self.work_root = root;
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> ComicPipeline {
        let compositor = self
            .compositor
            .unwrap_or_else(|| LayoutCompositor::from_assets(&Default::default()));
        let texture = self.texture.unwrap_or_default();

        ComicPipeline {
            panels: PanelGenerator::new(self.model.clone(), self.panel_model, self.policy),
            story: StoryGenerator::new(self.model, self.story_model, self.policy),
            compositor,
            texture,
            style_reference: self.style_reference,
            work_root: self.work_root,
        }
    }
}
