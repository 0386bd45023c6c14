//! Enhancement Router
//!
//! The one entry point most callers use: classify an image, then dispatch
//! it to exactly one collaborator and surface that collaborator's outcome
//! unchanged.
//!
//! # Contract
//!
//! - Exactly one collaborator call per request; never both.
//! - No retries, no caching (unless explicitly enabled), no rate limiting;
//!   those belong to the collaborator or the caller.
//! - No fallback from the AI path to the compositing path on AI failure.
//!   Surfacing the failure and letting the caller decide is a deliberate
//!   product choice, not an omission.
//! - Collaborator error messages pass through verbatim.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::{
    classify, extract_features, extract_palette_and_species, Category, FeatureVector,
};
use crate::error::EnhanceError;
use crate::image_data::ImageData;

use super::cache::{CacheKey, CacheStats, EnhancementCache};
use super::traits::{
    AiEnhancer, AiRequest, CompositeMode, Enhanced, OverlayRenderer, ProviderTimeout,
};

/// Default longest-side bound applied before analysis. Zero disables
/// bounding; the default keeps metric costs sane on oversized uploads while
/// leaving typical profile pictures untouched.
pub const DEFAULT_MAX_ANALYSIS_DIM: u32 = 1024;

/// Routes images to the AI enhancement provider or the overlay renderer
/// based on their classification.
pub struct EnhancementRouter {
    /// Category A collaborator.
    ai: Arc<dyn AiEnhancer>,
    /// Category B/C collaborator.
    renderer: Arc<dyn OverlayRenderer>,
    /// Opt-in result cache; a zero budget keeps it inert.
    cache: Mutex<EnhancementCache>,
    /// Longest-side bound for analysis resampling (0 = unbounded).
    max_analysis_dim: u32,
}

impl EnhancementRouter {
    /// Create a router over the two collaborators, with caching disabled
    /// and the default analysis bound.
    pub fn new(ai: Arc<dyn AiEnhancer>, renderer: Arc<dyn OverlayRenderer>) -> Self {
        Self {
            ai,
            renderer,
            cache: Mutex::new(EnhancementCache::new(0)),
            max_analysis_dim: DEFAULT_MAX_ANALYSIS_DIM,
        }
    }

    /// Enable the result cache with the given byte budget.
    #[must_use]
    pub fn with_cache_budget(mut self, budget_bytes: usize) -> Self {
        self.cache = Mutex::new(EnhancementCache::new(budget_bytes));
        self
    }

    /// Override the analysis bound (0 = analyze at full resolution).
    #[must_use]
    pub fn with_analysis_bound(mut self, max_analysis_dim: u32) -> Self {
        self.max_analysis_dim = max_analysis_dim;
        self
    }

    /// Classify an image, honoring the analysis bound.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::Analysis`] when feature extraction rejects
    /// the input.
    pub fn classify_image(&self, image: &ImageData) -> Result<Category, EnhanceError> {
        let features = self.features_for(image)?;
        Ok(classify(&features))
    }

    /// The full pipeline: features, category, dispatch to one collaborator.
    ///
    /// # Errors
    ///
    /// - [`EnhanceError::Analysis`] when the image cannot be analyzed
    /// - [`EnhanceError::Collaborator`] when the dispatched collaborator
    ///   fails (its message preserved verbatim)
    /// - [`EnhanceError::Timeout`] when the AI provider's poll budget runs
    ///   out
    pub async fn enhance(&self, image: &ImageData) -> Result<Enhanced, EnhanceError> {
        let request_id = Uuid::new_v4();
        let features = self.features_for(image)?;
        let category = classify(&features);
        info!(
            %request_id,
            %category,
            symmetry = features.symmetry_score,
            variance = features.color_variance,
            gradient = features.gradient_complexity,
            distinct = features.distinct_colors,
            sharpness = features.edge_sharpness,
            face_ratio = features.face_area_ratio,
            "classified image"
        );

        let key = CacheKey {
            fingerprint: image.fingerprint(),
            category,
        };
        if let Some(cached) = self.cache.lock().get(&key) {
            debug!(%request_id, %category, "cache hit");
            return Ok(cached);
        }

        let result = self.dispatch(image, category, request_id).await?;
        self.cache.lock().insert(key, result.clone());
        Ok(result)
    }

    /// Dispatch under a caller-supplied category label, bypassing
    /// classification.
    ///
    /// This is the boundary where an out-of-range category can actually
    /// appear (the classifier itself is total over the enum).
    ///
    /// # Errors
    ///
    /// [`EnhanceError::InvalidCategory`] for labels outside {A, B, C},
    /// plus everything [`EnhancementRouter::enhance`] can return.
    pub async fn enhance_as(
        &self,
        image: &ImageData,
        category_label: &str,
    ) -> Result<Enhanced, EnhanceError> {
        let category: Category = category_label.parse()?;
        self.dispatch(image, category, Uuid::new_v4()).await
    }

    /// Current cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Feature extraction with the configured resolution bound.
    fn features_for(&self, image: &ImageData) -> Result<FeatureVector, EnhanceError> {
        let features = match image.bounded(self.max_analysis_dim) {
            Some(bounded) => {
                debug!(
                    source_width = image.width,
                    source_height = image.height,
                    bounded_width = bounded.width,
                    bounded_height = bounded.height,
                    "bounded image for analysis"
                );
                extract_features(&bounded)?
            }
            None => extract_features(image)?,
        };
        Ok(features)
    }

    /// Invoke exactly one collaborator for the category.
    async fn dispatch(
        &self,
        image: &ImageData,
        category: Category,
        request_id: Uuid,
    ) -> Result<Enhanced, EnhanceError> {
        match category {
            Category::A => {
                let extraction = extract_palette_and_species(image)?;
                let request = AiRequest::new(image.to_data_url()?)
                    .with_palette(extraction.padded_palette())
                    .with_species(extraction.species_cue);
                debug!(
                    %request_id,
                    provider = self.ai.name(),
                    species = %extraction.species_cue,
                    "dispatching to AI enhancement"
                );

                let response = self.ai.enhance(&request).await.map_err(|err| {
                    warn!(%request_id, provider = self.ai.name(), "AI enhancement failed: {err:#}");
                    match err.downcast_ref::<ProviderTimeout>() {
                        Some(timeout) => EnhanceError::Timeout {
                            provider: self.ai.name().to_string(),
                            attempts: timeout.attempts,
                        },
                        None => EnhanceError::Collaborator {
                            provider: self.ai.name().to_string(),
                            message: format!("{err:#}"),
                        },
                    }
                })?;
                debug!(
                    %request_id,
                    provider = %response.provider,
                    duration_ms = response.duration_ms,
                    "AI enhancement complete"
                );
                Ok(Enhanced::Remote {
                    image_url: response.image_url,
                })
            }
            Category::B => self.composite(image, CompositeMode::Standard, request_id),
            Category::C => self.composite(image, CompositeMode::FaceSafe, request_id),
        }
    }

    /// Category B/C path: overlay rendering on a copy of the image.
    fn composite(
        &self,
        image: &ImageData,
        mode: CompositeMode,
        request_id: Uuid,
    ) -> Result<Enhanced, EnhanceError> {
        debug!(%request_id, %mode, renderer = self.renderer.name(), "dispatching to compositor");
        let composited = self.renderer.apply(image, mode).map_err(|err| {
            warn!(%request_id, renderer = self.renderer.name(), "compositing failed: {err:#}");
            EnhanceError::Collaborator {
                provider: self.renderer.name().to_string(),
                message: format!("{err:#}"),
            }
        })?;
        Ok(Enhanced::Composited {
            image_data_url: composited.to_data_url()?,
        })
    }
}
