//! PFP Classifier
//!
//! Maps a [`FeatureVector`] to exactly one enhancement [`Category`]. The
//! decision tree is total: every well-formed feature vector lands in a
//! category, and there is no error path.
//!
//! # Rule order is load-bearing
//!
//! The symbolic-icon rule and the flat-cartoon rule are not mutually
//! exclusive; a highly symmetric flat icon can satisfy both. The symbolic
//! rule is checked first on purpose, and swapping the order changes the
//! category for such inputs. The thresholds are empirically calibrated
//! constants; keep them bit-exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EnhanceError;

use super::features::FeatureVector;

/// Symbolic icons mirror almost perfectly.
const SYMBOLIC_MIN_SYMMETRY: f64 = 0.85;
/// Symbolic icons use few, flat colors.
const SYMBOLIC_MAX_VARIANCE: f64 = 40.0;
/// Symbolic icons concentrate their content in the centered face region.
const SYMBOLIC_MIN_FACE_RATIO: f64 = 0.6;

/// Flat cartoons have little shading.
const FLAT_MAX_GRADIENT: f64 = 0.3;
/// Flat cartoons use a small set of distinct colors.
const FLAT_MAX_DISTINCT: usize = 20;
/// Flat cartoons keep clean, hard edges.
const FLAT_MIN_SHARPNESS: f64 = 0.7;

/// Enhancement category steering an image to one collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Illustrated/semi-realistic: routed to AI enhancement.
    A,
    /// Flat cartoon/mascot: routed to standard compositing.
    B,
    /// Symbolic/iconic face: routed to face-safe compositing.
    C,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

impl FromStr for Category {
    type Err = EnhanceError;

    /// Parse a category label from a non-core caller.
    ///
    /// This is the boundary the router's defensive `InvalidCategory` guard
    /// protects: [`classify`] itself can only produce valid variants.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            other => Err(EnhanceError::InvalidCategory(other.to_string())),
        }
    }
}

/// Classify a feature vector into its enhancement category.
///
/// Evaluated top-down, first match wins:
///
/// 1. **C** (symbolic/iconic): high symmetry, low variance, centered mass.
/// 2. **B** (flat cartoon): low gradient, few colors, sharp edges.
/// 3. **A** (illustrated/semi-realistic): everything else.
#[must_use]
pub fn classify(features: &FeatureVector) -> Category {
    if features.symmetry_score > SYMBOLIC_MIN_SYMMETRY
        && features.color_variance < SYMBOLIC_MAX_VARIANCE
        && features.face_area_ratio > SYMBOLIC_MIN_FACE_RATIO
    {
        return Category::C;
    }

    if features.gradient_complexity < FLAT_MAX_GRADIENT
        && features.distinct_colors < FLAT_MAX_DISTINCT
        && features.edge_sharpness > FLAT_MIN_SHARPNESS
    {
        return Category::B;
    }

    Category::A
}
