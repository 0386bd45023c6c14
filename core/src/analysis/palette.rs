//! Palette & Species Extractor
//!
//! Produces the dominant-color palette and the categorical "species cue"
//! that flavor AI-generation prompts. Runs independently of the pixel
//! analyzer, on its own fixed 64x64 downsample with its own thresholds.
//!
//! # Passes
//!
//! 1. A single pass over the 4096 downsampled pixels: transparent and
//!    near-white/near-black background pixels are skipped, the rest are
//!    bucketed at 4 bits per channel while saturation, brightness, and
//!    pinkness accumulate.
//! 2. A full-grid edge pass (every pixel, including skipped ones) summing
//!    absolute channel differences to right and down neighbors.
//!
//! The species-cue ladder is evaluated in a fixed order; the first matching
//! rule wins.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::image_data::ImageData;

/// Side length of the extraction grid.
const GRID_DIM: u32 = 64;

/// Minimum alpha for a pixel to count as content.
const MIN_ALPHA: u8 = 128;

/// Channels above this on every channel read as white background.
const NEAR_WHITE_FLOOR: u8 = 240;

/// Max channel below this reads as black background.
const NEAR_BLACK_CEIL: u8 = 15;

/// Number of palette entries reported.
const PALETTE_SIZE: usize = 4;

/// Fallback colors for missing palette slots, in slot order: magenta,
/// gold, sky blue.
pub const DEFAULT_PALETTE: [&str; 3] = ["#ff00ff", "#ffd700", "#87ceeb"];

/// Categorical label describing the visual character of an image.
///
/// Consumed by AI prompt construction; the `Display` strings are the wire
/// values downstream prompt templates expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesCue {
    /// Busy, high-edge images.
    #[serde(rename = "dino puff")]
    DinoPuff,
    /// Soft pink low-edge images.
    #[serde(rename = "kirby-like puff")]
    KirbyLikePuff,
    /// Dark, heavily saturated images.
    #[serde(rename = "cyber puff")]
    CyberPuff,
    /// Desaturated images.
    #[serde(rename = "monochrome puff")]
    MonochromePuff,
    /// Everything else.
    #[serde(rename = "party puff")]
    PartyPuff,
}

impl fmt::Display for SpeciesCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DinoPuff => "dino puff",
            Self::KirbyLikePuff => "kirby-like puff",
            Self::CyberPuff => "cyber puff",
            Self::MonochromePuff => "monochrome puff",
            Self::PartyPuff => "party puff",
        };
        write!(f, "{label}")
    }
}

/// Aggregate statistics behind the species-cue decision, reported for
/// observability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Mean absolute neighbor channel difference over the full grid.
    pub edge_score: f64,
    /// Mean saturation of valid pixels, `(max-min)/max`.
    pub avg_saturation: f64,
    /// Mean brightness of valid pixels, `max/255`.
    pub avg_brightness: f64,
    /// Fraction of valid pixels reading as pink (R>150, B>100, G<0.7R).
    pub pinkness: f64,
}

/// Result of palette and species extraction for one image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaletteExtraction {
    /// Up to 4 `#rrggbb` colors ranked by descending pixel frequency.
    /// Near-monochrome images may legitimately produce fewer than 4.
    pub palette_hex: Vec<String>,
    /// The species cue for prompt flavoring.
    pub species_cue: SpeciesCue,
    /// The statistics the cue was decided on.
    pub stats: ExtractionStats,
}

impl PaletteExtraction {
    /// The palette padded to at least three entries with the observed
    /// downstream defaults (magenta, gold, sky blue), for callers that
    /// need primary/secondary/accent slots unconditionally.
    #[must_use]
    pub fn padded_palette(&self) -> Vec<String> {
        let mut palette = self.palette_hex.clone();
        for slot in palette.len()..DEFAULT_PALETTE.len() {
            palette.push(DEFAULT_PALETTE[slot].to_string());
        }
        palette
    }
}

/// Extract the dominant palette and species cue for an image.
///
/// Deterministic for identical input bytes: the downsample is a fixed box
/// average and bucket ties break on the bucket key.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidInput`] for a zero-area image
/// (defensive; unreachable through [`ImageData`]'s constructors).
pub fn extract_palette_and_species(
    image: &ImageData,
) -> Result<PaletteExtraction, AnalysisError> {
    if image.width == 0 || image.height == 0 {
        return Err(AnalysisError::invalid_input(format!(
            "zero-area image ({}x{})",
            image.width, image.height
        )));
    }

    let grid = image.resample(GRID_DIM, GRID_DIM);

    let mut buckets: HashMap<(u8, u8, u8), u32> = HashMap::new();
    let mut total_saturation = 0.0;
    let mut total_brightness = 0.0;
    let mut pink_count: u32 = 0;
    let mut valid_pixels: u32 = 0;

    for y in 0..GRID_DIM {
        for x in 0..GRID_DIM {
            let [r, g, b, a] = grid.rgba(x, y);
            if a < MIN_ALPHA {
                continue;
            }

            let max = r.max(g).max(b);
            let min = r.min(g).min(b);
            if (max > NEAR_WHITE_FLOOR && min > NEAR_WHITE_FLOOR) || max < NEAR_BLACK_CEIL {
                continue;
            }

            *buckets.entry((r >> 4, g >> 4, b >> 4)).or_insert(0) += 1;

            let saturation = if max > 0 {
                f64::from(max - min) / f64::from(max)
            } else {
                0.0
            };
            total_saturation += saturation;
            total_brightness += f64::from(max) / 255.0;
            valid_pixels += 1;

            if r > 150 && b > 100 && f64::from(g) < f64::from(r) * 0.7 {
                pink_count += 1;
            }
        }
    }

    // Edge pass runs over the whole grid, background pixels included.
    let mut edge_sum: u64 = 0;
    for y in 0..GRID_DIM - 1 {
        for x in 0..GRID_DIM - 1 {
            let here = grid.rgba(x, y);
            let right = grid.rgba(x + 1, y);
            let down = grid.rgba(x, y + 1);
            for channel in 0..3 {
                edge_sum += u64::from(here[channel].abs_diff(right[channel]));
                edge_sum += u64::from(here[channel].abs_diff(down[channel]));
            }
        }
    }
    let edge_score = edge_sum as f64 / f64::from(GRID_DIM * GRID_DIM * 6);

    let (avg_saturation, avg_brightness, pinkness) = if valid_pixels > 0 {
        let count = f64::from(valid_pixels);
        (
            total_saturation / count,
            total_brightness / count,
            f64::from(pink_count) / count,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let mut ranked: Vec<((u8, u8, u8), u32)> = buckets.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let palette_hex = ranked
        .iter()
        .take(PALETTE_SIZE)
        .map(|&((qr, qg, qb), _)| bucket_center_hex(qr, qg, qb))
        .collect();

    let stats = ExtractionStats {
        edge_score,
        avg_saturation,
        avg_brightness,
        pinkness,
    };
    let species_cue = decide_species(&stats);

    Ok(PaletteExtraction {
        palette_hex,
        species_cue,
        stats,
    })
}

/// The species-cue ladder. Order is significant; first match wins.
fn decide_species(stats: &ExtractionStats) -> SpeciesCue {
    if stats.edge_score > 40.0 {
        SpeciesCue::DinoPuff
    } else if stats.pinkness > 0.3 && stats.edge_score < 25.0 {
        SpeciesCue::KirbyLikePuff
    } else if stats.avg_brightness < 0.4 && stats.avg_saturation > 0.5 {
        SpeciesCue::CyberPuff
    } else if stats.avg_saturation < 0.2 {
        SpeciesCue::MonochromePuff
    } else {
        SpeciesCue::PartyPuff
    }
}

/// Hex color at the center of a 4-bit bucket: `(q << 4) + 8` per channel.
fn bucket_center_hex(qr: u8, qg: u8, qb: u8) -> String {
    format!(
        "#{}",
        hex::encode([(qr << 4) + 8, (qg << 4) + 8, (qb << 4) + 8])
    )
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

    fn solid(rgba: [u8; 4]) -> ImageData {
        from_fn(64, 64, |_, _| rgba)
    }

    #[test]
    fn test_monochrome_palette_has_single_entry() {
        let result = extract_palette_and_species(&solid([128, 128, 128, 255])).unwrap();
        assert_eq!(result.palette_hex, vec!["#888888".to_string()]);
        assert_eq!(result.species_cue, SpeciesCue::MonochromePuff);
    }

    #[test]
    fn test_banded_image_yields_four_by_frequency() {
        // Five vertical bands with strictly decreasing widths; only the
        // four widest survive, in width order.
        let bands: [(u32, [u8; 4]); 5] = [
            (20, [200, 30, 30, 255]),
            (16, [30, 200, 30, 255]),
            (12, [30, 30, 200, 255]),
            (10, [200, 200, 30, 255]),
            (6, [100, 30, 160, 255]),
        ];
        let img = from_fn(64, 64, |x, _| {
            let mut edge = 0;
            for (width, color) in bands {
                edge += width;
                if x < edge {
                    return color;
                }
            }
            bands[4].1
        });

        let result = extract_palette_and_species(&img).unwrap();
        assert_eq!(
            result.palette_hex,
            vec![
                "#c81818".to_string(),
                "#18c818".to_string(),
                "#1818c8".to_string(),
                "#c8c818".to_string(),
            ]
        );
    }

    #[test]
    fn test_background_pixels_are_skipped() {
        // White field with one red band: white must not reach the palette.
        let img = from_fn(64, 64, |x, _| {
            if x < 8 {
                [200, 40, 40, 255]
            } else {
                [250, 250, 250, 255]
            }
        });
        let result = extract_palette_and_species(&img).unwrap();
        assert_eq!(result.palette_hex, vec!["#c82828".to_string()]);
    }

    #[test]
    fn test_transparent_pixels_are_skipped() {
        let img = from_fn(64, 64, |x, _| {
            if x < 8 {
                [60, 120, 180, 255]
            } else {
                [10, 10, 10, 0]
            }
        });
        let result = extract_palette_and_species(&img).unwrap();
        assert_eq!(result.palette_hex, vec!["#3878b8".to_string()]);
    }

    #[test]
    fn test_high_edge_score_wins_regardless_of_other_stats() {
        // Black/white checkerboard: every valid-pixel stat is degenerate
        // (both tones are skipped as background), but the edge pass still
        // sees maximal contrast everywhere.
        let img = from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            }
        });
        let result = extract_palette_and_species(&img).unwrap();
        assert!(result.stats.edge_score > 40.0);
        assert_eq!(result.species_cue, SpeciesCue::DinoPuff);
        assert!(result.palette_hex.is_empty());
    }

    #[test]
    fn test_pink_low_edge_is_kirby() {
        let result = extract_palette_and_species(&solid([230, 120, 180, 255])).unwrap();
        assert!(result.stats.edge_score < 25.0);
        assert!(result.stats.pinkness > 0.3);
        assert_eq!(result.species_cue, SpeciesCue::KirbyLikePuff);
    }

    #[test]
    fn test_dark_saturated_is_cyber() {
        let result = extract_palette_and_species(&solid([80, 0, 100, 255])).unwrap();
        assert_eq!(result.species_cue, SpeciesCue::CyberPuff);
    }

    #[test]
    fn test_bright_saturated_is_party() {
        let result = extract_palette_and_species(&solid([230, 150, 40, 255])).unwrap();
        assert_eq!(result.species_cue, SpeciesCue::PartyPuff);
    }

    #[test]
    fn test_padded_palette_fills_defaults() {
        let result = extract_palette_and_species(&solid([128, 128, 128, 255])).unwrap();
        let padded = result.padded_palette();
        assert_eq!(padded.len(), 3);
        assert_eq!(padded[0], "#888888");
        assert_eq!(padded[1], DEFAULT_PALETTE[1]);
        assert_eq!(padded[2], DEFAULT_PALETTE[2]);
    }

    #[test]
    fn test_extraction_deterministic() {
        let img = from_fn(100, 80, |x, y| {
            [
                ((x * 3 + y) % 256) as u8,
                ((y * 5) % 256) as u8,
                ((x * 7) % 256) as u8,
                255,
            ]
        });
        let a = extract_palette_and_species(&img).unwrap();
        let b = extract_palette_and_species(&img).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_species_display_strings() {
        assert_eq!(SpeciesCue::DinoPuff.to_string(), "dino puff");
        assert_eq!(SpeciesCue::KirbyLikePuff.to_string(), "kirby-like puff");
        assert_eq!(SpeciesCue::PartyPuff.to_string(), "party puff");
    }
}
