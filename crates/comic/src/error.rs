use std::path::PathBuf;
use std::time::Duration;

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Failure to turn caller-supplied base64 into a bitmap.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Unrecognized image container: {0}")]
    ImageFormat(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Model request failed: {0}")]
    Request(String),

    #[error("Model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected model response: {0}")]
    Response(String),

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Expected {expected} panels, model returned {received}")]
    InsufficientPanels { expected: usize, received: usize },

    #[error("Model returned an undecodable image part: {0}")]
    InvalidImagePart(String),
}

impl GenerationError {
    /// Transport failures, rate limits, server errors and short panel
    /// responses may succeed on another attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout(_) | Self::InsufficientPanels { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Response(_) | Self::InvalidImagePart(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Required asset not found: {}", .0.display())]
    MissingAsset(PathBuf),

    #[error("Failed to load asset {}: {source}", path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode {width}x{height} image: {source}")]
    Encode {
        width: u32,
        height: u32,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Error, Debug)]
pub enum ComicError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] DecodeError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Failed to parse story ({reason}). Cleaned output was:\n{raw}")]
    StoryParse { raw: String, reason: String },

    #[error("Composition failed: {0}")]
    Composition(#[from] CompositionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure category, used for log fields and wire error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Generation,
    StoryParse,
    Composition,
    Internal,
}

impl ComicError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Generation(_) => ErrorKind::Generation,
            Self::StoryParse { .. } => ErrorKind::StoryParse,
            Self::Composition(_) => ErrorKind::Composition,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ComicError>;
