//! Error Types
//!
//! The library's error taxonomy, split along the same line as the rest of
//! the crate: analysis failures are local and fatal to the current request
//! (the pixels will not change on retry), while collaborator failures are
//! surfaced to the caller unchanged so it can decide whether to retry the
//! whole request.
//!
//! # Taxonomy
//!
//! - [`AnalysisError`]: malformed or zero-dimension input reached the
//!   analyzer or extractor. No partial results are ever returned.
//! - [`EnhanceError`]: everything that can go wrong between classification
//!   and the final enhanced image, including defensive guards and wrapped
//!   collaborator failures.

use thiserror::Error;

/// Errors produced by image decoding, the pixel analyzer, and the
/// palette/species extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The input image is malformed: zero-dimension, buffer length mismatch,
    /// undecodable bytes, or an unparseable data URL.
    #[error("invalid input image: {reason}")]
    InvalidInput {
        /// What exactly was wrong with the input.
        reason: String,
    },
}

impl AnalysisError {
    /// Shorthand constructor for [`AnalysisError::InvalidInput`].
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }
}

/// Errors produced by the enhancement router and its collaborators.
#[derive(Debug, Error)]
pub enum EnhanceError {
    /// A category label outside {A, B, C} reached the router.
    ///
    /// Unreachable through [`classify`](crate::analysis::classify), which is
    /// total over the [`Category`](crate::analysis::Category) enum; this
    /// guards the string boundary used by non-core callers.
    #[error("invalid enhancement category: {0:?}")]
    InvalidCategory(String),

    /// A collaborator (AI provider or overlay renderer) reported a failure.
    /// The message is the collaborator's own, preserved verbatim; the router
    /// performs no interpretation and no retry.
    #[error("{provider} enhancement failed: {message}")]
    Collaborator {
        /// Name of the collaborator that failed.
        provider: String,
        /// The collaborator's error message, unchanged.
        message: String,
    },

    /// The AI provider's poll budget ran out before the prediction reached a
    /// terminal state.
    #[error("{provider} enhancement timed out after {attempts} poll attempts")]
    Timeout {
        /// Name of the provider that timed out.
        provider: String,
        /// How many poll attempts were made before giving up.
        attempts: u32,
    },

    /// Analysis of the input image failed before any collaborator was called.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = AnalysisError::invalid_input("zero-area image (0x32)");
        assert_eq!(
            err.to_string(),
            "invalid input image: zero-area image (0x32)"
        );
    }

    #[test]
    fn test_collaborator_message_preserved() {
        let err = EnhanceError::Collaborator {
            provider: "Replicate".to_string(),
            message: "Prediction creation failed: boom".to_string(),
        };
        assert!(err.to_string().contains("Prediction creation failed: boom"));
    }

    #[test]
    fn test_analysis_error_converts() {
        let err: EnhanceError = AnalysisError::invalid_input("bad").into();
        assert!(matches!(err, EnhanceError::Analysis(_)));
    }
}
