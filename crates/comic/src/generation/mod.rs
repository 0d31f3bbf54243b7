pub mod gemini;
pub mod panels;
pub mod story;

pub use gemini::GeminiClient;
pub use panels::PanelGenerator;
pub use story::{StoryGenerator, parse_story, strip_code_fence};

use std::time::Duration;

use crate::{
    config::ModelConfig,
    error::GenerationError,
    traits::GenerativeModel,
    types::{ContentPart, ModelRequest},
};

/// Timeout and attempt budget applied to every model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            max_attempts: 1,
        }
    }
}

impl From<&ModelConfig> for CallPolicy {
    fn from(config: &ModelConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_attempts: config.max_attempts,
        }
    }
}

impl CallPolicy {
    /// Run one model call bounded by the timeout.
    pub(crate) async fn call_once(
        &self,
        model: &dyn GenerativeModel,
        request: ModelRequest,
    ) -> Result<Vec<ContentPart>, GenerationError> {
        match tokio::time::timeout(self.timeout, model.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }

    /// Call the model, then `accept` the parts. A retryable failure from
    /// either step is retried until the attempt budget is spent.
    pub(crate) async fn call_with<T, F>(
        &self,
        model: &dyn GenerativeModel,
        request: &ModelRequest,
        mut accept: F,
    ) -> Result<T, GenerationError>
    where
        F: FnMut(Vec<ContentPart>) -> Result<T, GenerationError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = self
                .call_once(model, request.clone())
                .await
                .and_then(&mut accept);
            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    tracing::warn!(
                        "Model {} attempt {}/{} failed: {}",
                        request.model,
                        attempt,
                        attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::types::RequestPart;

    fn request() -> ModelRequest {
        ModelRequest {
            model: "test-model".to_string(),
            parts: vec![RequestPart::Text("hello".to_string())],
            modalities: vec![],
        }
    }

    #[tokio::test]
    async fn test_timeout_maps_to_generation_error() {
        let model = ScriptedModel::new(vec![Ok(vec![])]).with_delay(Duration::from_millis(200));
        let policy = CallPolicy { timeout: Duration::from_millis(10), max_attempts: 1 };

        let err = policy.call_once(&model, request()).await.expect_err("Should time out");
        assert!(matches!(err, GenerationError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_retry_until_accepted() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::Request("connection reset".to_string())),
            Ok(vec![ContentPart::Text("ok".to_string())]),
        ]);
        let policy = CallPolicy { max_attempts: 2, ..Default::default() };

        let parts = policy
            .call_with(&model, &request(), Ok)
            .await
            .expect("Second attempt should succeed");
        assert_eq!(parts.len(), 1);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::Request("boom".to_string())),
            Ok(vec![]),
        ]);
        let policy = CallPolicy::default();

        assert!(policy.call_with(&model, &request(), Ok).await.is_err());
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::Status {
                status: 400,
                body: "API key not valid".to_string(),
            }),
            Ok(vec![]),
        ]);
        let policy = CallPolicy { max_attempts: 3, ..Default::default() };

        let err = policy.call_with(&model, &request(), Ok).await.expect_err("Should fail");
        assert!(matches!(err, GenerationError::Status { status: 400, .. }));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
            Ok(vec![ContentPart::Text("ok".to_string())]),
        ]);
        let policy = CallPolicy { max_attempts: 2, ..Default::default() };

        assert!(policy.call_with(&model, &request(), Ok).await.is_ok());
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let model = ScriptedModel::new(vec![
            Err(GenerationError::Response("no candidates".to_string())),
            Ok(vec![]),
        ]);
        let policy = CallPolicy { max_attempts: 2, ..Default::default() };

        assert!(policy.call_with(&model, &request(), Ok).await.is_err());
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(GenerationError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(GenerationError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!GenerationError::Status { status: 403, body: String::new() }.is_retryable());
        assert!(!GenerationError::InvalidImagePart("bad".to_string()).is_retryable());
    }
}
