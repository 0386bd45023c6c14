//! Enhancement Collaborator Traits
//!
//! Trait definitions for the two collaborators the router dispatches to.
//! This abstraction lets the core work with different AI image providers
//! (Replicate, `DALL-E`, etc.) and any overlay renderer without changing
//! routing logic.
//!
//! # Design Philosophy
//!
//! The [`AiEnhancer`] trait provides a common interface for:
//! - Submitting an image plus prompt-shaping fields
//! - Waiting out the provider's own async job handling (polling included)
//! - Health checking the provider
//!
//! Implementations handle provider-specific details (API formats, auth,
//! poll budgets). The [`OverlayRenderer`] trait is the synchronous local
//! counterpart: no network, no polling, original pixels preserved as the
//! base layer.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::SpeciesCue;
use crate::image_data::ImageData;

/// Compositing mode selected by the image's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeMode {
    /// Full effect stack for flat cartoons and mascots.
    #[serde(rename = "standard")]
    Standard,
    /// Widened center exclusion for symbolic/iconic faces.
    #[serde(rename = "face-safe")]
    FaceSafe,
}

impl std::fmt::Display for CompositeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::FaceSafe => write!(f, "face-safe"),
        }
    }
}

/// Request sent to an AI enhancement provider.
#[derive(Clone, Debug)]
pub struct AiRequest {
    /// The source image as a base64 data URL.
    pub image_data_url: String,
    /// Dominant colors extracted from the image, `#rrggbb`.
    pub palette_hex: Vec<String>,
    /// Species cue for prompt flavoring.
    pub species_cue: Option<SpeciesCue>,
    /// Free-form style hint appended to the prompt.
    pub style: Option<String>,
    /// Seed for prompt flair selection. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl AiRequest {
    /// Create a request for the given encoded image.
    pub fn new(image_data_url: impl Into<String>) -> Self {
        Self {
            image_data_url: image_data_url.into(),
            palette_hex: Vec::new(),
            species_cue: None,
            style: None,
            seed: None,
        }
    }

    /// Set the extracted palette.
    #[must_use]
    pub fn with_palette(mut self, palette_hex: Vec<String>) -> Self {
        self.palette_hex = palette_hex;
        self
    }

    /// Set the species cue.
    #[must_use]
    pub fn with_species(mut self, species_cue: SpeciesCue) -> Self {
        self.species_cue = Some(species_cue);
        self
    }

    /// Set a style hint.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Pin the prompt flair seed, making prompt construction deterministic.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Successful response from an AI enhancement provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    /// URL of the generated image, hosted by the provider.
    pub image_url: String,
    /// Name of the provider that produced it.
    pub provider: String,
    /// End-to-end generation time in milliseconds, if measured.
    pub duration_ms: Option<u64>,
}

/// Typed timeout carried inside a provider's `anyhow` error when its poll
/// budget runs out, so the router can distinguish timeouts from other
/// collaborator failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prediction did not reach a terminal state within {attempts} polls of {interval:?}")]
pub struct ProviderTimeout {
    /// Poll attempts made before giving up.
    pub attempts: u32,
    /// Interval between polls.
    pub interval: Duration,
}

/// AI enhancement provider trait.
///
/// Implement this to add support for another text-to-image provider. The
/// provider owns its entire job lifecycle: request submission, any
/// polling, and timeout enforcement. Callers see exactly one await.
#[async_trait]
pub trait AiEnhancer: Send + Sync {
    /// Provider name (e.g. "Replicate", "DALL-E").
    fn name(&self) -> &str;

    /// Check whether the provider is reachable and credentialed.
    async fn health_check(&self) -> bool;

    /// Generate the enhanced image.
    ///
    /// # Errors
    ///
    /// Any provider-side failure, with a [`ProviderTimeout`] embedded when
    /// the poll budget was exhausted.
    async fn enhance(&self, request: &AiRequest) -> anyhow::Result<AiResponse>;
}

/// Local overlay renderer trait.
///
/// Implementations must treat the input as read-only and keep the subject
/// pixels of the original as the base layer, only adding overlay effects.
pub trait OverlayRenderer: Send + Sync {
    /// Renderer name for error messages and logs.
    fn name(&self) -> &str;

    /// Render the overlay onto a copy of `image`.
    ///
    /// # Errors
    ///
    /// Renderer-specific failures; the router wraps them unchanged.
    fn apply(&self, image: &ImageData, mode: CompositeMode) -> anyhow::Result<ImageData>;
}

/// Final result of an enhancement request.
///
/// The two variants mirror the two collaborator shapes: the AI path hands
/// back a provider-hosted URL, the compositing path an encoded image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Enhanced {
    /// AI-generated image hosted by the provider.
    Remote {
        /// URL of the generated image.
        image_url: String,
    },
    /// Locally composited image.
    Composited {
        /// PNG data URL of the composited image.
        image_data_url: String,
    },
}

impl Enhanced {
    /// Approximate heap footprint, used for cache budgeting.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        let payload = match self {
            Self::Remote { image_url } => image_url.len(),
            Self::Composited { image_data_url } => image_data_url.len(),
        };
        std::mem::size_of::<Self>() + payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpeciesCue;

    #[test]
    fn test_ai_request_builder() {
        let request = AiRequest::new("data:image/png;base64,AAAA")
            .with_palette(vec!["#ff00ff".to_string()])
            .with_species(SpeciesCue::PartyPuff)
            .with_style("neon")
            .with_seed(7);

        assert_eq!(request.image_data_url, "data:image/png;base64,AAAA");
        assert_eq!(request.palette_hex, vec!["#ff00ff".to_string()]);
        assert_eq!(request.species_cue, Some(SpeciesCue::PartyPuff));
        assert_eq!(request.style.as_deref(), Some("neon"));
        assert_eq!(request.seed, Some(7));
    }

    #[test]
    fn test_composite_mode_labels() {
        assert_eq!(CompositeMode::Standard.to_string(), "standard");
        assert_eq!(CompositeMode::FaceSafe.to_string(), "face-safe");
    }

    #[test]
    fn test_enhanced_size_tracks_payload() {
        let small = Enhanced::Remote {
            image_url: "https://x/y.png".to_string(),
        };
        let large = Enhanced::Composited {
            image_data_url: "d".repeat(10_000),
        };
        assert!(large.size_bytes() > small.size_bytes());
    }
}
