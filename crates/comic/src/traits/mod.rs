use async_trait::async_trait;

use crate::{
    error::GenerationError,
    types::{ContentPart, ModelRequest},
};

/// External multimodal generation capability.
///
/// Accepts prompt text and images, returns ordered content parts. Any
/// provider honouring this contract can back the pipeline.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<Vec<ContentPart>, GenerationError>;
}
