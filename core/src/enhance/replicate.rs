//! Replicate Provider
//!
//! AI enhancement via the Replicate predictions API: create a prediction
//! for an img2img model, then poll its status once per interval until it
//! reaches a terminal state or the poll budget runs out.
//!
//! # Prediction lifecycle
//!
//! - `POST /v1/predictions` creates the job (the `Prefer: wait` header asks
//!   the API to hold the connection when it can finish quickly)
//! - `GET /v1/predictions/{id}` reports `status` transitions until
//!   `succeeded` or `failed`
//! - `output` is either a single URL string or an array of URLs; the first
//!   entry is the generated image

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::prompt::build_prompt;
use super::traits::{AiEnhancer, AiRequest, AiResponse, ProviderTimeout};

/// Generation strength: high, for creative generation rather than subtle
/// img2img edits.
const IMG2IMG_STRENGTH: f64 = 0.95;
/// Denoising steps per prediction.
const INFERENCE_STEPS: u32 = 32;
/// Classifier-free guidance scale.
const GUIDANCE_SCALE: f64 = 7.0;

/// Replicate predictions client.
#[derive(Clone)]
pub struct ReplicateEnhancer {
    /// API token sent as `Authorization: Token ...`.
    api_token: String,
    /// API origin, `https://api.replicate.com` in production.
    base_url: String,
    /// Pinned model version hash for prediction creation.
    model_version: String,
    /// Delay between status polls.
    poll_interval: Duration,
    /// Maximum number of status polls before timing out.
    max_poll_attempts: u32,
    /// HTTP client.
    http_client: reqwest::Client,
}

impl ReplicateEnhancer {
    /// Default pinned model version.
    pub const DEFAULT_MODEL_VERSION: &'static str =
        "7762fd07cf82c948538e41f63f77d685e02b063e37e496e96eefd46c929f9bdc";

    /// Create a client against the production API with default budgets
    /// (60 polls, 1s apart).
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: "https://api.replicate.com".to_string(),
            model_version: Self::DEFAULT_MODEL_VERSION.to_string(),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 60,
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

    /// Override the pinned model version.
    #[must_use]
    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }

    /// Override the poll cadence and budget.
    #[must_use]
    pub fn with_poll_budget(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }

    /// Prediction-creation endpoint.
    fn predictions_url(&self) -> String {
        format!("{}/v1/predictions", self.base_url)
    }

    /// Status endpoint for one prediction.
    fn prediction_url(&self, id: &str) -> String {
        format!("{}/v1/predictions/{id}", self.base_url)
    }

    /// Pull the generated image URL out of a terminal prediction body.
    fn extract_output(prediction: &serde_json::Value) -> Option<String> {
        match prediction.get("output") {
            Some(serde_json::Value::String(url)) => Some(url.clone()),
            Some(serde_json::Value::Array(urls)) => urls
                .first()
                .and_then(serde_json::Value::as_str)
                .map(String::from),
            _ => None,
        }
    }
}

#[async_trait]
impl AiEnhancer for ReplicateEnhancer {
    fn name(&self) -> &str {
        "Replicate"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/v1/account", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
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
            "version": self.model_version,
            "input": {
                "image": request.image_data_url,
                "prompt": prompt,
                "strength": IMG2IMG_STRENGTH,
                "num_inference_steps": INFERENCE_STEPS,
                "guidance_scale": GUIDANCE_SCALE,
            }
        });

        let response = self
            .http_client
            .post(self.predictions_url())
            .header("Authorization", format!("Token {}", self.api_token))
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Prediction creation failed ({status}): {body}");
        }

        let mut prediction: serde_json::Value = response.json().await?;
        let id = prediction
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("prediction response carried no id"))?;
        debug!(prediction = %id, status = ?prediction.get("status"), "prediction created");

        let mut attempts: u32 = 0;
        loop {
            let status = prediction
                .get("status")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown");

            match status {
                "succeeded" => break,
                "failed" => {
                    let detail = prediction
                        .get("error")
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("unknown error");
                    warn!(prediction = %id, "prediction failed: {detail}");
                    anyhow::bail!("Image generation failed: {detail}");
                }
                _ if attempts >= self.max_poll_attempts => {
                    return Err(ProviderTimeout {
                        attempts,
                        interval: self.poll_interval,
                    }
                    .into());
                }
                _ => {
                    tokio::time::sleep(self.poll_interval).await;
                    attempts += 1;

                    let response = self
                        .http_client
                        .get(self.prediction_url(&id))
                        .header("Authorization", format!("Token {}", self.api_token))
                        .send()
                        .await?;
                    prediction = response.json().await?;
                    debug!(
                        prediction = %id,
                        attempt = attempts,
                        status = ?prediction.get("status"),
                        "poll"
                    );
                }
            }
        }

        let image_url = Self::extract_output(&prediction)
            .ok_or_else(|| anyhow::anyhow!("succeeded prediction carried no output"))?;

        Ok(AiResponse {
            image_url,
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
        let enhancer = ReplicateEnhancer::new("tok").with_base_url("http://localhost:9999");
        assert_eq!(
            enhancer.predictions_url(),
            "http://localhost:9999/v1/predictions"
        );
        assert_eq!(
            enhancer.prediction_url("abc123"),
            "http://localhost:9999/v1/predictions/abc123"
        );
    }

    #[test]
    fn test_extract_output_string_and_array() {
        let single = serde_json::json!({ "output": "https://cdn/x.png" });
        assert_eq!(
            ReplicateEnhancer::extract_output(&single).as_deref(),
            Some("https://cdn/x.png")
        );

        let multi = serde_json::json!({ "output": ["https://cdn/a.png", "https://cdn/b.png"] });
        assert_eq!(
            ReplicateEnhancer::extract_output(&multi).as_deref(),
            Some("https://cdn/a.png")
        );

        let missing = serde_json::json!({ "status": "succeeded" });
        assert_eq!(ReplicateEnhancer::extract_output(&missing), None);
    }

    #[test]
    fn test_poll_budget_builder() {
        let enhancer =
            ReplicateEnhancer::new("tok").with_poll_budget(Duration::from_millis(10), 3);
        assert_eq!(enhancer.max_poll_attempts, 3);
        assert_eq!(enhancer.poll_interval, Duration::from_millis(10));
    }
}
