//! DALL-E Provider
//!
//! AI enhancement via the OpenAI image-generations API. Unlike the
//! Replicate provider there is no job to poll: one POST returns either the
//! generated image URL or an error body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::prompt::build_prompt;
use super::traits::{AiEnhancer, AiRequest, AiResponse};

/// OpenAI image-generations client.
#[derive(Clone)]
pub struct DalleEnhancer {
    /// API key sent as `Authorization: Bearer ...`.
    api_key: String,
    /// API origin, `https://api.openai.com` in production.
    base_url: String,
    /// Model identifier.
    model: String,
    /// Output dimensions, e.g. `1024x1024`.
    size: String,
    /// Render quality tier.
    quality: String,
    /// Render style.
    style: String,
    /// HTTP client.
    http_client: reqwest::Client,
}

impl DalleEnhancer {
    /// Create a client against the production API with the default model
    /// parameters (dall-e-3, 1024x1024, standard quality, vivid style).
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
            style: "vivid".to_string(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Override the API origin (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override output size, quality, and style.
    #[must_use]
    pub fn with_render_params(
        mut self,
        size: impl Into<String>,
        quality: impl Into<String>,
        style: impl Into<String>,
    ) -> Self {
        self.size = size.into();
        self.quality = quality.into();
        self.style = style.into();
        self
    }

    /// Image-generations endpoint.
    fn generations_url(&self) -> String {
        format!("{}/v1/images/generations", self.base_url)
    }
}

#[async_trait]
impl AiEnhancer for DalleEnhancer {
    fn name(&self) -> &str {
        "DALL-E"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    async fn enhance(&self, request: &AiRequest) -> anyhow::Result<AiResponse> {
        let start = Instant::now();
        let prompt = build_prompt(request);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
            "quality": self.quality,
            "style": self.style,
        });

        let response = self
            .http_client
            .post(self.generations_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let data: serde_json::Value = response.json().await?;

        if let Some(message) = data
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(serde_json::Value::as_str)
        {
            anyhow::bail!("{message}");
        }
        if !status.is_success() {
            anyhow::bail!("image generation returned {status}");
        }

        let image_url = data
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|first| first.get("url"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("generation response carried no image URL"))?;
        debug!(model = %self.model, "generation complete");

        Ok(AiResponse {
            image_url: image_url.to_string(),
            provider: self.name().to_string(),
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let enhancer = DalleEnhancer::new("key").with_base_url("http://localhost:8080");
        assert_eq!(
            enhancer.generations_url(),
            "http://localhost:8080/v1/images/generations"
        );
    }

    #[test]
    fn test_render_param_builder() {
        let enhancer = DalleEnhancer::new("key")
            .with_model("dall-e-2")
            .with_render_params("512x512", "hd", "natural");
        assert_eq!(enhancer.model, "dall-e-2");
        assert_eq!(enhancer.size, "512x512");
        assert_eq!(enhancer.quality, "hd");
        assert_eq!(enhancer.style, "natural");
    }
}
