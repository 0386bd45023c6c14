//! Pixel Analyzer
//!
//! Computes the six-metric [`FeatureVector`] that drives PFP classification.
//! Every metric is a pure function of the pixel bytes: no hidden state, no
//! ordering dependency between metrics, identical input always yields
//! identical output. They are O(width x height) each and safe to run in any
//! order or in parallel.
//!
//! # Calibration note
//!
//! [`gradient_complexity`] and [`edge_sharpness`] read ONLY the red channel,
//! including for the vertical neighbor delta. That asymmetry looks like a
//! simplification, but the classification thresholds in
//! [`classify`](super::classify) were calibrated against it; changing it to
//! matching-channel deltas would shift every boundary. It stays.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::image_data::ImageData;

/// Fraction of `min(width, height)` used as the centered "face" radius.
const FACE_RADIUS_FRACTION: f64 = 0.35;

/// Quantization step for the distinct-color count.
const COLOR_QUANT_STEP: u32 = 10;

/// Scalar summary of one image, consumed by the classifier.
///
/// All float metrics except `color_variance` live in `[0, 1]`;
/// `color_variance` is unbounded above (typically below 150).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// 1.0 = perfect left/right mirror symmetry.
    pub symmetry_score: f64,
    /// RMS deviation of channel values from the per-channel image mean.
    pub color_variance: f64,
    /// Normalized average adjacent-pixel red-channel delta.
    pub gradient_complexity: f64,
    /// Count of unique quantized (R,G,B) colors.
    pub distinct_colors: usize,
    /// Normalized mean horizontal Sobel magnitude on the red channel.
    pub edge_sharpness: f64,
    /// Fraction of darkness-weighted content mass in the centered circle.
    pub face_area_ratio: f64,
}

/// Compute the full [`FeatureVector`] for an image.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidInput`] for a zero-area image. This is
/// unreachable for any [`ImageData`] built through its validating
/// constructors and exists as a defensive guard.
pub fn extract_features(image: &ImageData) -> Result<FeatureVector, AnalysisError> {
    if image.width == 0 || image.height == 0 {
        return Err(AnalysisError::invalid_input(format!(
            "zero-area image ({}x{})",
            image.width, image.height
        )));
    }

    Ok(FeatureVector {
        symmetry_score: symmetry_score(image),
        color_variance: color_variance(image),
        gradient_complexity: gradient_complexity(image),
        distinct_colors: distinct_colors(image),
        edge_sharpness: edge_sharpness(image),
        face_area_ratio: face_area_ratio(image),
    })
}

/// Left/right mirror symmetry in `[0, 1]`.
///
/// Accumulates the L1 color distance (R, G, B; alpha excluded) between each
/// pixel in the integer left half and its horizontal mirror, then normalizes
/// by the channel-comparison count. Single-column images have no pairs and
/// score 1.0.
#[must_use]
pub fn symmetry_score(image: &ImageData) -> f64 {
    let mut diff: u64 = 0;
    let mut count: u64 = 0;

    for y in 0..image.height {
        for x in 0..image.width / 2 {
            let left = image.rgba(x, y);
            let right = image.rgba(image.width - x - 1, y);
            for channel in 0..3 {
                diff += u64::from(left[channel].abs_diff(right[channel]));
            }
            count += 3;
        }
    }

    if count == 0 {
        return 1.0;
    }
    1.0 - (diff as f64 / count as f64 / 255.0)
}

/// RMS deviation of channel values from the per-channel mean, no alpha
/// weighting. Flat single-color images yield 0.
#[must_use]
pub fn color_variance(image: &ImageData) -> f64 {
    let pixels = image.pixel_count() as f64;
    let mut sums = [0u64; 3];

    for y in 0..image.height {
        for x in 0..image.width {
            let px = image.rgba(x, y);
            for channel in 0..3 {
                sums[channel] += u64::from(px[channel]);
            }
        }
    }
    let means = [
        sums[0] as f64 / pixels,
        sums[1] as f64 / pixels,
        sums[2] as f64 / pixels,
    ];

    let mut variance = 0.0;
    for y in 0..image.height {
        for x in 0..image.width {
            let px = image.rgba(x, y);
            for channel in 0..3 {
                let delta = f64::from(px[channel]) - means[channel];
                variance += delta * delta;
            }
        }
    }

    (variance / pixels / 3.0).sqrt()
}

/// Normalized average adjacent-pixel delta in `[0, 1]`, red channel only
/// for both the rightward and downward neighbor (see module docs).
#[must_use]
pub fn gradient_complexity(image: &ImageData) -> f64 {
    let mut gradient_sum = 0.0;
    let mut count: u64 = 0;

    for y in 0..image.height.saturating_sub(1) {
        for x in 0..image.width.saturating_sub(1) {
            let here = image.red(x, y);
            let diff_right = f64::from(here.abs_diff(image.red(x + 1, y)));
            let diff_down = f64::from(here.abs_diff(image.red(x, y + 1)));
            gradient_sum += (diff_right + diff_down) / 2.0;
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }
    gradient_sum / count as f64 / 255.0
}

/// Count of unique colors after quantizing each channel to steps of 10,
/// alpha ignored.
#[must_use]
pub fn distinct_colors(image: &ImageData) -> usize {
    let mut colors: HashSet<(u32, u32, u32)> = HashSet::new();

    for y in 0..image.height {
        for x in 0..image.width {
            let px = image.rgba(x, y);
            colors.insert((
                u32::from(px[0]) / COLOR_QUANT_STEP * COLOR_QUANT_STEP,
                u32::from(px[1]) / COLOR_QUANT_STEP * COLOR_QUANT_STEP,
                u32::from(px[2]) / COLOR_QUANT_STEP * COLOR_QUANT_STEP,
            ));
        }
    }

    colors.len()
}

/// Mean absolute horizontal Sobel gradient on the red channel over interior
/// pixels, normalized by 255 and clamped to 1.0. Images with no interior
/// pixels score 0.
#[must_use]
pub fn edge_sharpness(image: &ImageData) -> f64 {
    if image.width < 3 || image.height < 3 {
        return 0.0;
    }

    let mut edge_sum = 0.0;
    let mut count: u64 = 0;

    for y in 1..image.height - 1 {
        for x in 1..image.width - 1 {
            let gx = -f64::from(image.red(x - 1, y - 1)) + f64::from(image.red(x + 1, y - 1))
                - 2.0 * f64::from(image.red(x - 1, y))
                + 2.0 * f64::from(image.red(x + 1, y))
                - f64::from(image.red(x - 1, y + 1))
                + f64::from(image.red(x + 1, y + 1));
            edge_sum += gx.abs();
            count += 1;
        }
    }

    (edge_sum / count as f64 / 255.0).min(1.0)
}

/// Fraction of content mass within the centered circular "face" region.
///
/// Mass is darkness weighted by opacity: `(255 - mean(R,G,B)) * (A / 255)`.
/// The region is a circle of radius `0.35 * min(width, height)` around the
/// geometric center. Returns 0 when the image carries no mass at all
/// (pure white or fully transparent).
#[must_use]
pub fn face_area_ratio(image: &ImageData) -> f64 {
    let center_x = f64::from(image.width) / 2.0;
    let center_y = f64::from(image.height) / 2.0;
    let radius = f64::from(image.width.min(image.height)) * FACE_RADIUS_FRACTION;

    let mut center_mass = 0.0;
    let mut total_mass = 0.0;

    for y in 0..image.height {
        for x in 0..image.width {
            let px = image.rgba(x, y);
            let brightness =
                (f64::from(px[0]) + f64::from(px[1]) + f64::from(px[2])) / 3.0;
            let mass = (255.0 - brightness) * (f64::from(px[3]) / 255.0);
            total_mass += mass;

            let dx = f64::from(x) - center_x;
            let dy = f64::from(y) - center_y;
            if (dx * dx + dy * dy).sqrt() < radius {
                center_mass += mass;
            }
        }
    }

    if total_mass > 0.0 {
        center_mass / total_mass
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> ImageData {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        ImageData::new(width, height, data).unwrap()
    }

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> ImageData {
        from_fn(width, height, |_, _| rgba)
    }

    #[test]
    fn test_mirrored_image_scores_perfect_symmetry() {
        // Arbitrary left half, mirrored onto the right.
        let img = from_fn(16, 16, |x, y| {
            let mx = if x < 8 { x } else { 15 - x };
            [(mx * 30) as u8, (y * 14) as u8, 77, 255]
        });
        let score = symmetry_score(&img);
        assert!((score - 1.0).abs() < 1e-12, "score = {score}");
    }

    #[test]
    fn test_asymmetric_halves_score_low() {
        let img = from_fn(16, 16, |x, _| {
            if x < 8 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            }
        });
        let score = symmetry_score(&img);
        assert!(score < 0.01, "score = {score}");
    }

    #[test]
    fn test_flat_color_bounds() {
        let img = solid(20, 20, [255, 0, 0, 255]);
        assert_eq!(color_variance(&img), 0.0);
        assert_eq!(distinct_colors(&img), 1);
        assert_eq!(gradient_complexity(&img), 0.0);
        assert_eq!(edge_sharpness(&img), 0.0);
    }

    #[test]
    fn test_gradient_uses_red_channel_only() {
        // Green varies wildly, red is constant: the metric must stay 0.
        let img = from_fn(8, 8, |x, y| [100, ((x + y) * 37 % 256) as u8, 20, 255]);
        assert_eq!(gradient_complexity(&img), 0.0);
    }

    #[test]
    fn test_distinct_colors_quantizes() {
        // 9 and 0 share a bucket; 9 and 10 do not.
        let img = from_fn(2, 1, |x, _| if x == 0 { [0, 0, 0, 255] } else { [9, 9, 9, 255] });
        assert_eq!(distinct_colors(&img), 1);

        let img = from_fn(2, 1, |x, _| if x == 0 { [0, 0, 0, 255] } else { [10, 10, 10, 255] });
        assert_eq!(distinct_colors(&img), 2);
    }

    #[test]
    fn test_edge_sharpness_saturates_on_thin_stripes() {
        // Width-2 vertical stripes put opposite colors at x-1 and x+1 for
        // every interior pixel, driving |gx| to its 1020 maximum.
        let img = from_fn(20, 20, |x, _| {
            if x % 4 < 2 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            }
        });
        let score = edge_sharpness(&img);
        assert!((score - 1.0).abs() < 1e-12, "score = {score}");
    }

    #[test]
    fn test_face_area_ratio_dark_center() {
        // Dark disk inside the face radius on a white field: white carries
        // zero mass, so all mass sits in the center region.
        let img = from_fn(100, 100, |x, y| {
            let dx = f64::from(x) - 50.0;
            let dy = f64::from(y) - 50.0;
            if (dx * dx + dy * dy).sqrt() < 20.0 {
                [40, 40, 40, 255]
            } else {
                [255, 255, 255, 255]
            }
        });
        let ratio = face_area_ratio(&img);
        assert!((ratio - 1.0).abs() < 1e-12, "ratio = {ratio}");
    }

    #[test]
    fn test_face_area_ratio_zero_mass() {
        let img = solid(10, 10, [255, 255, 255, 255]);
        assert_eq!(face_area_ratio(&img), 0.0);
    }

    #[test]
    fn test_transparent_pixels_carry_no_mass() {
        // Dark but fully transparent ring contributes nothing.
        let img = from_fn(100, 100, |x, y| {
            let dx = f64::from(x) - 50.0;
            let dy = f64::from(y) - 50.0;
            if (dx * dx + dy * dy).sqrt() < 10.0 {
                [0, 0, 0, 255]
            } else {
                [0, 0, 0, 0]
            }
        });
        let ratio = face_area_ratio(&img);
        assert!((ratio - 1.0).abs() < 1e-12, "ratio = {ratio}");
    }

    #[test]
    fn test_extract_features_deterministic() {
        let img = from_fn(32, 32, |x, y| {
            [
                ((x * 13 + y * 7) % 256) as u8,
                ((x * 5) % 256) as u8,
                ((y * 11) % 256) as u8,
                255,
            ]
        });
        let a = extract_features(&img).unwrap();
        let b = extract_features(&img).unwrap();
        assert_eq!(a, b);
    }
}
