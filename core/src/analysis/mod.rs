//! Image Analysis
//!
//! The deterministic half of the pipeline: pure pixel statistics and the
//! decision procedures built on them. Nothing in this module performs I/O,
//! holds state, or consults a clock; every function is reproducible from
//! the input bytes alone.
//!
//! # Module Structure
//!
//! - [`features`]: the Pixel Analyzer producing the six-metric
//!   [`FeatureVector`]
//! - [`palette`]: the Palette & Species Extractor (64x64 downsample,
//!   bucket counting, species-cue ladder)
//! - [`classify`]: the fixed decision tree mapping features to a
//!   [`Category`]
//!
//! The analyzer and the extractor are independent: they use different
//! downsamples and different thresholds, and neither consumes the other's
//! output.

pub mod classify;
pub mod features;
pub mod palette;

pub use classify::{classify, Category};
pub use features::{extract_features, FeatureVector};
pub use palette::{
    extract_palette_and_species, ExtractionStats, PaletteExtraction, SpeciesCue,
    DEFAULT_PALETTE,
};
