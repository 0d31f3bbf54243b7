use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::texture::BlendMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFormat,
}

/// Top-level configuration for the comic pipeline and server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComicConfig {
    /// Parent directory for per-request working areas (system temp if unset)
    pub work_root: Option<PathBuf>,
    pub model: ModelConfig,
    pub assets: AssetConfig,
    pub texture: TextureConfig,
    pub defaults: RequestDefaults,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub panel_model: String,
    pub story_model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            panel_model: "gemini-2.0-flash-exp-image-generation".to_string(),
            story_model: "gemini-2.0-flash".to_string(),
            timeout_secs: 120,
            max_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub title_font: PathBuf,
    pub caption_font: PathBuf,
    pub background_template: Option<PathBuf>,
    pub style_reference: Option<PathBuf>,
    pub textures: Vec<PathBuf>,
}

/// Paper texture applied when no texture list is configured.
pub const DEFAULT_TEXTURES: &[&str] = &["assets/Textures/Paper_texture.png"];

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            title_font: PathBuf::from("assets/Fonts/Some_Time_Later.otf"),
            caption_font: PathBuf::from("assets/Fonts/digistrip.ttf"),
            background_template: Some(PathBuf::from("assets/Defaults/baseimage.png")),
            style_reference: Some(PathBuf::from("assets/Defaults/StyleReference.jpg")),
            textures: DEFAULT_TEXTURES.iter().map(PathBuf::from).collect(),
        }
    }
}

fn rebase(base: &Path, path: &mut PathBuf) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

impl AssetConfig {
    /// Anchor every relative asset path at `base`. Absolute paths are kept.
    pub fn resolve_relative(&mut self, base: &Path) {
        rebase(base, &mut self.title_font);
        rebase(base, &mut self.caption_font);
        if let Some(path) = self.background_template.as_mut() {
            rebase(base, path);
        }
        if let Some(path) = self.style_reference.as_mut() {
            rebase(base, path);
        }
        for path in &mut self.textures {
            rebase(base, path);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextureConfig {
    pub blend_mode: BlendMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestDefaults {
    pub story_guide: String,
    pub character_name: String,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            story_guide: "Jokes about hackathon".to_string(),
            character_name: "Your Name".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: Transport,
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            bind: SocketAddr::from(([0, 0, 0, 0], 8086)),
        }
    }
}

impl ComicConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format by extension and load configuration.
    ///
    /// Relative asset paths and `work_root` are taken relative to the
    /// directory holding the file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?)?,
            Some("json") => Self::from_json(&fs::read_to_string(path)?)?,
            _ => return Err(ConfigError::UnsupportedFormat),
        };
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.assets.resolve_relative(base);
            if let Some(work_root) = config.work_root.as_mut() {
                rebase(base, work_root);
            }
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
