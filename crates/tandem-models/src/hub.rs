//! Remote model hub client

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::ModelError;

const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// Queries a remote model registry
#[trait_variant::make(ModelHub: Send)]
pub trait LocalModelHub {
    /// Whether `repo_id` exists and is visible with `token`
    async fn model_exists(
        &self,
        repo_id: &str,
        token: Option<&SecretString>,
    ) -> Result<bool, ModelError>;
}

/// Hugging Face hub over HTTP
pub struct HfHub {
    client: Client,
    endpoint: String,
}

impl HfHub {
    pub fn new() -> Result<Self, ModelError> {
        Self::with_endpoint(DEFAULT_HUB_URL)
    }

    /// Hub at a custom endpoint (mirrors, tests)
    pub fn with_endpoint(endpoint: &str) -> Result<Self, ModelError> {
        Ok(Self {
            client: Client::builder()
                .user_agent(concat!("tandem/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| ModelError::HubRequestFailed(e.to_string()))?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Download URL of a file in a repository
    pub fn file_url(&self, repo_id: &str, filename: &str) -> String {
        format!("{}/{}/resolve/main/{}", self.endpoint, repo_id, filename)
    }
}

impl ModelHub for HfHub {
    async fn model_exists(
        &self,
        repo_id: &str,
        token: Option<&SecretString>,
    ) -> Result<bool, ModelError> {
        let url = format!("{}/api/models/{}", self.endpoint, repo_id);
        debug!("Checking {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(false),
            status => Err(ModelError::HubRequestFailed(format!(
                "{} returned {}",
                url, status
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url() {
        let hub = HfHub::with_endpoint("https://mirror.example/").unwrap();
        assert_eq!(hub.endpoint(), "https://mirror.example");
        assert_eq!(
            hub.file_url("org/model", "pytorch_model.onnx"),
            "https://mirror.example/org/model/resolve/main/pytorch_model.onnx"
        );
    }
}
