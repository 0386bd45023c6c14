//! Enhancement Routing and Collaborators
//!
//! Everything downstream of classification: the router that dispatches an
//! image to exactly one enhancement path, the trait seams for the two
//! collaborator kinds, the bundled provider implementations, and the
//! opt-in result cache.
//!
//! # Module Structure
//!
//! - [`traits`]: [`AiEnhancer`] and [`OverlayRenderer`] seams plus the
//!   request/response value types
//! - [`router`]: the [`EnhancementRouter`] entry point
//! - [`replicate`] / [`openai`]: AI providers behind [`AiEnhancer`],
//!   selected by configuration
//! - [`compositing`]: the local [`NyeCompositor`] overlay renderer
//! - [`prompt`]: data-driven prompt fragments shared by the providers
//! - [`cache`]: byte-budgeted LRU for enhancement results
//!
//! # One interface, many providers
//!
//! Provider differences (auth scheme, polling vs single-shot, response
//! shape) stay inside each implementation; the router only ever sees
//! [`AiEnhancer`]. Adding a provider means implementing the trait and
//! wiring it into [`crate::config::build_enhancer`].

pub mod cache;
pub mod compositing;
pub mod openai;
pub mod prompt;
pub mod replicate;
pub mod router;
pub mod traits;

pub use cache::{CacheKey, CacheStats, EnhancementCache};
pub use compositing::NyeCompositor;
pub use openai::DalleEnhancer;
pub use replicate::ReplicateEnhancer;
pub use router::{EnhancementRouter, DEFAULT_MAX_ANALYSIS_DIM};
pub use traits::{
    AiEnhancer, AiRequest, AiResponse, CompositeMode, Enhanced, OverlayRenderer,
    ProviderTimeout,
};
