//! Glowup Core - PFP Classification and Enhancement Routing
//!
//! This crate is the core of the NYE profile-picture glow-up pipeline:
//! deterministic pixel analysis that classifies an uploaded avatar, and a
//! router that dispatches it to exactly one enhancement path. It is pure
//! library code, independent of any HTTP handler or UI glue wrapped around
//! it.
//!
//! # Architecture
//!
//! ```text
//!                         ┌──────────────────┐
//!          raw image ───> │  Pixel Analyzer  │ ───> FeatureVector
//!                         └──────────────────┘            │
//!                         ┌──────────────────┐            v
//!          raw image ───> │ Palette/Species  │     ┌─────────────┐
//!                         │    Extractor     │     │  Classifier │
//!                         └────────┬─────────┘     └──────┬──────┘
//!                                  │                      │ Category
//!                      palette +   │               ┌──────┴──────┐
//!                      species cue │               │   Router    │
//!                                  │               └──────┬──────┘
//!                                  │        ┌─────────────┼─────────────┐
//!                                  v        v A           v B           v C
//!                            ┌───────────────────┐ ┌─────────────────────┐
//!                            │   AI Enhancer     │ │   NYE Compositor    │
//!                            │ (Replicate/DALL-E)│ │ (standard/face-safe)│
//!                            └───────────────────┘ └─────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ImageData`]: decoded RGBA image, the input to everything
//! - [`FeatureVector`]: the six-metric summary driving classification
//! - [`Category`]: A (AI), B (standard compositing), C (face-safe)
//! - [`EnhancementRouter`]: the `enhance` entry point most callers use
//! - [`AiEnhancer`] / [`OverlayRenderer`]: the collaborator seams
//!
//! # Quick Start
//!
//! ```ignore
//! use glowup_core::{load_config, build_router, ImageData};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let router = build_router(&config);
//!
//!     let image = ImageData::from_data_url(&uploaded_data_url)?;
//!     let enhanced = router.enhance(&image).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`analysis`]: pixel analyzer, palette/species extractor, classifier
//! - [`enhance`]: router, collaborator traits, providers, compositor, cache
//! - [`config`]: TOML + environment configuration and factories
//! - [`image_data`]: the decoded image type and its codecs
//! - [`error`]: the library error taxonomy
//!
//! # Determinism
//!
//! Everything in [`analysis`] is a pure function of pixel bytes: identical
//! input always produces identical features, palette, and category. The
//! only intentional randomness lives in prompt flair and overlay placement,
//! and both accept pinned seeds.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod analysis;
pub mod config;
pub mod enhance;
pub mod error;
pub mod image_data;

pub use analysis::{
    classify, extract_features, extract_palette_and_species, Category, ExtractionStats,
    FeatureVector, PaletteExtraction, SpeciesCue,
};
pub use config::{
    build_enhancer, build_router, load_config, load_config_from_path, AiProvider, ConfigError,
    GlowupConfig,
};
pub use enhance::{
    AiEnhancer, AiRequest, AiResponse, CompositeMode, DalleEnhancer, Enhanced,
    EnhancementRouter, NyeCompositor, OverlayRenderer, ReplicateEnhancer,
};
pub use error::{AnalysisError, EnhanceError};
pub use image_data::ImageData;
