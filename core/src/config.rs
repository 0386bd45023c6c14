//! TOML Configuration File Support
//!
//! Centralized configuration loading for the enhancement pipeline,
//! supporting a TOML configuration file at `~/.config/glowup/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest
//! first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # XDG Base Directory Compliance
//!
//! The configuration file follows the XDG Base Directory specification:
//! `$XDG_CONFIG_HOME/glowup/config.toml` (typically
//! `~/.config/glowup/config.toml`). A missing file simply means defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! provider = "replicate"
//!
//! [analysis]
//! max_analysis_dim = 1024
//!
//! [cache]
//! budget_bytes = 10485760
//!
//! [replicate]
//! api_token = "r8_..."
//! poll_interval_ms = 1000
//! max_poll_attempts = 60
//!
//! [dalle]
//! api_key = "sk-..."
//! size = "1024x1024"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::enhance::{
    AiEnhancer, DalleEnhancer, EnhancementRouter, NyeCompositor, ReplicateEnhancer,
    DEFAULT_MAX_ANALYSIS_DIM,
};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from an environment variable.
    Env,
    /// Value from the TOML configuration file.
    File,
    /// Default value.
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Provenance of the values people most often need to debug.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfigProvenance {
    /// Where the provider selection came from.
    pub provider: ConfigSource,
    /// Where the Replicate API token came from.
    pub replicate_api_token: ConfigSource,
    /// Where the DALL-E API key came from.
    pub dalle_api_key: ConfigSource,
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Root of the TOML configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlowupToml {
    /// AI provider selection: "replicate" or "dalle".
    pub provider: Option<String>,
    /// Analysis section.
    pub analysis: AnalysisToml,
    /// Result cache section.
    pub cache: CacheToml,
    /// Replicate provider section.
    pub replicate: ReplicateToml,
    /// DALL-E provider section.
    pub dalle: DalleToml,
}

/// Analysis section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisToml {
    /// Longest-side bound before feature extraction (0 = unbounded).
    pub max_analysis_dim: Option<u32>,
}

/// Result cache section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheToml {
    /// Cache byte budget (0 = disabled).
    pub budget_bytes: Option<usize>,
}

/// Replicate section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateToml {
    /// API token.
    pub api_token: Option<String>,
    /// API origin override.
    pub base_url: Option<String>,
    /// Pinned model version hash.
    pub model_version: Option<String>,
    /// Milliseconds between status polls.
    pub poll_interval_ms: Option<u64>,
    /// Maximum status polls before timing out.
    pub max_poll_attempts: Option<u32>,
}

/// DALL-E section of the TOML configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DalleToml {
    /// API key.
    pub api_key: Option<String>,
    /// API origin override.
    pub base_url: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// Output dimensions.
    pub size: Option<String>,
    /// Render quality tier.
    pub quality: Option<String>,
    /// Render style.
    pub style: Option<String>,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// AI provider selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiProvider {
    /// Replicate predictions API (polled img2img).
    #[serde(rename = "replicate")]
    Replicate,
    /// OpenAI image-generations API (single shot).
    #[serde(rename = "dalle")]
    Dalle,
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replicate => write!(f, "replicate"),
            Self::Dalle => write!(f, "dalle"),
        }
    }
}

impl FromStr for AiProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replicate" => Ok(Self::Replicate),
            "dalle" | "openai" => Ok(Self::Dalle),
            other => Err(ConfigError::ValidationError(format!(
                "unknown provider '{other}' (expected 'replicate' or 'dalle')"
            ))),
        }
    }
}

/// Resolved analysis settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Longest-side bound before feature extraction (0 = unbounded).
    pub max_analysis_dim: u32,
}

/// Resolved Replicate settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicateConfig {
    /// API token; empty means unauthenticated (requests will fail).
    pub api_token: String,
    /// API origin.
    pub base_url: String,
    /// Pinned model version hash.
    pub model_version: String,
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Maximum status polls before timing out.
    pub max_poll_attempts: u32,
}

/// Resolved DALL-E settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DalleConfig {
    /// API key; empty means unauthenticated (requests will fail).
    pub api_key: String,
    /// API origin.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Output dimensions.
    pub size: String,
    /// Render quality tier.
    pub quality: String,
    /// Render style.
    pub style: String,
}

/// Fully resolved configuration.
#[derive(Clone, Debug)]
pub struct GlowupConfig {
    /// Which AI provider category A dispatches to.
    pub provider: AiProvider,
    /// Analysis settings.
    pub analysis: AnalysisConfig,
    /// Result cache byte budget (0 = disabled).
    pub cache_budget_bytes: usize,
    /// Replicate settings.
    pub replicate: ReplicateConfig,
    /// DALL-E settings.
    pub dalle: DalleConfig,
    /// Where the debug-relevant values came from.
    pub provenance: ConfigProvenance,
}

// =============================================================================
// Loading
// =============================================================================

/// The default configuration file path, when a config directory exists.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("glowup").join("config.toml"))
}

/// Load configuration from the default path (if the file exists) merged
/// with environment variables and defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] for unreadable or unparseable files and for
/// invalid values. A missing default file is not an error.
pub fn load_config() -> Result<GlowupConfig, ConfigError> {
    let toml = match default_config_path() {
        Some(path) if path.exists() => read_toml(&path)?,
        _ => GlowupToml::default(),
    };
    resolve_config(toml, &|name| std::env::var(name).ok())
}

/// Load configuration from an explicit file path merged with environment
/// variables and defaults.
///
/// # Errors
///
/// Returns [`ConfigError::ReadError`] when the file cannot be read, plus
/// everything [`load_config`] can return.
pub fn load_config_from_path(path: &Path) -> Result<GlowupConfig, ConfigError> {
    let toml = read_toml(path)?;
    resolve_config(toml, &|name| std::env::var(name).ok())
}

/// Read and parse a TOML config file.
fn read_toml(path: &Path) -> Result<GlowupToml, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&contents)?)
}

/// Merge a parsed TOML document with an environment lookup and defaults.
///
/// The lookup is injected rather than read from `std::env` directly so
/// tests (and embedders with their own environment handling) can resolve
/// deterministically.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] for unknown provider labels or
/// a zero poll budget.
pub fn resolve_config(
    toml: GlowupToml,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<GlowupConfig, ConfigError> {
    let (provider, provider_source) = match env("GLOWUP_PROVIDER") {
        Some(label) => (label.parse()?, ConfigSource::Env),
        None => match &toml.provider {
            Some(label) => (label.parse()?, ConfigSource::File),
            None => (AiProvider::Replicate, ConfigSource::Default),
        },
    };

    let (replicate_token, replicate_token_source) = resolve_secret(
        env,
        &["GLOWUP_REPLICATE_API_TOKEN", "REPLICATE_API_KEY"],
        toml.replicate.api_token.as_deref(),
    );
    let (dalle_key, dalle_key_source) = resolve_secret(
        env,
        &["GLOWUP_DALLE_API_KEY", "OPENAI_API_KEY"],
        toml.dalle.api_key.as_deref(),
    );

    let max_poll_attempts = toml.replicate.max_poll_attempts.unwrap_or(60);
    if max_poll_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "replicate.max_poll_attempts must be at least 1".to_string(),
        ));
    }

    Ok(GlowupConfig {
        provider,
        analysis: AnalysisConfig {
            max_analysis_dim: toml
                .analysis
                .max_analysis_dim
                .unwrap_or(DEFAULT_MAX_ANALYSIS_DIM),
        },
        cache_budget_bytes: toml.cache.budget_bytes.unwrap_or(0),
        replicate: ReplicateConfig {
            api_token: replicate_token,
            base_url: toml
                .replicate
                .base_url
                .unwrap_or_else(|| "https://api.replicate.com".to_string()),
            model_version: toml
                .replicate
                .model_version
                .unwrap_or_else(|| ReplicateEnhancer::DEFAULT_MODEL_VERSION.to_string()),
            poll_interval: Duration::from_millis(toml.replicate.poll_interval_ms.unwrap_or(1000)),
            max_poll_attempts,
        },
        dalle: DalleConfig {
            api_key: dalle_key,
            base_url: toml
                .dalle
                .base_url
                .unwrap_or_else(|| "https://api.openai.com".to_string()),
            model: toml.dalle.model.unwrap_or_else(|| "dall-e-3".to_string()),
            size: toml.dalle.size.unwrap_or_else(|| "1024x1024".to_string()),
            quality: toml
                .dalle
                .quality
                .unwrap_or_else(|| "standard".to_string()),
            style: toml.dalle.style.unwrap_or_else(|| "vivid".to_string()),
        },
        provenance: ConfigProvenance {
            provider: provider_source,
            replicate_api_token: replicate_token_source,
            dalle_api_key: dalle_key_source,
        },
    })
}

/// Resolve a credential from the first set environment variable, then the
/// file, then an empty default.
fn resolve_secret(
    env: &dyn Fn(&str) -> Option<String>,
    names: &[&str],
    file_value: Option<&str>,
) -> (String, ConfigSource) {
    for name in names {
        if let Some(value) = env(name) {
            return (value, ConfigSource::Env);
        }
    }
    match file_value {
        Some(value) => (value.to_string(), ConfigSource::File),
        None => (String::new(), ConfigSource::Default),
    }
}

// =============================================================================
// Factories
// =============================================================================

/// Build the configured AI enhancer.
///
/// An empty credential is allowed here (the provider's requests will fail
/// with its own error) but logged, because a missing token is the most
/// common misconfiguration.
#[must_use]
pub fn build_enhancer(config: &GlowupConfig) -> Arc<dyn AiEnhancer> {
    match config.provider {
        AiProvider::Replicate => {
            if config.replicate.api_token.is_empty() {
                warn!(
                    source = %config.provenance.replicate_api_token,
                    "Replicate API token is empty; AI enhancement requests will fail"
                );
            }
            Arc::new(
                ReplicateEnhancer::new(config.replicate.api_token.clone())
                    .with_base_url(config.replicate.base_url.clone())
                    .with_model_version(config.replicate.model_version.clone())
                    .with_poll_budget(
                        config.replicate.poll_interval,
                        config.replicate.max_poll_attempts,
                    ),
            )
        }
        AiProvider::Dalle => {
            if config.dalle.api_key.is_empty() {
                warn!(
                    source = %config.provenance.dalle_api_key,
                    "DALL-E API key is empty; AI enhancement requests will fail"
                );
            }
            Arc::new(
                DalleEnhancer::new(config.dalle.api_key.clone())
                    .with_base_url(config.dalle.base_url.clone())
                    .with_model(config.dalle.model.clone())
                    .with_render_params(
                        config.dalle.size.clone(),
                        config.dalle.quality.clone(),
                        config.dalle.style.clone(),
                    ),
            )
        }
    }
}

/// Build a fully wired [`EnhancementRouter`] from configuration: the
/// selected AI provider, the NYE compositor, the configured cache budget,
/// and the analysis bound.
#[must_use]
pub fn build_router(config: &GlowupConfig) -> EnhancementRouter {
    EnhancementRouter::new(build_enhancer(config), Arc::new(NyeCompositor::new()))
        .with_cache_budget(config.cache_budget_bytes)
        .with_analysis_bound(config.analysis.max_analysis_dim)
}
