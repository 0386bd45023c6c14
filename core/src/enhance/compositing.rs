//! NYE Overlay Compositor
//!
//! The non-AI enhancement path: pure 2D compositing that keeps the original
//! subject pixel-for-pixel and adds festive overlays around it. No network,
//! no polling, deterministic when seeded.
//!
//! # Layer stack
//!
//! 1. Radial background tint (gold center, purple mid, midnight edge)
//! 2. Warm glow halo, visible only where the subject is transparent
//! 3. The original image, drawn source-over
//! 4. Background confetti (smaller, dimmer)
//! 5. Foreground confetti (larger, brighter; thinned in face-safe mode)
//! 6. Corner and edge sparkles at fixed anchor positions
//! 7. Motion accent streaks near the left/right edges
//!
//! Confetti centers and streak samples honor a centered exclusion circle so
//! the face region stays clear; face-safe mode widens that circle.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::{CompositeMode, OverlayRenderer};
use crate::image_data::{ImageData, BYTES_PER_PIXEL};

/// Exclusion radius as a fraction of `min(width, height)`, standard mode.
const EXCLUSION_STANDARD: f64 = 0.30;
/// Exclusion radius in face-safe mode.
const EXCLUSION_FACE_SAFE: f64 = 0.40;

/// Confetti pieces behind the subject.
const CONFETTI_BACKGROUND: usize = 15;
/// Confetti pieces in front of the subject, standard mode.
const CONFETTI_FOREGROUND: usize = 10;
/// Foreground confetti in face-safe mode.
const CONFETTI_FOREGROUND_FACE_SAFE: usize = 6;

/// Festive confetti colors.
const CONFETTI_COLORS: [[u8; 3]; 6] = [
    [255, 215, 0],   // gold
    [255, 20, 147],  // hot pink
    [0, 206, 209],   // turquoise
    [255, 99, 71],   // tomato red
    [147, 112, 219], // purple
    [50, 205, 50],   // lime green
];

/// Gold used by the halo, sparkles, and even-index streaks.
const GOLD: [u8; 3] = [255, 215, 0];
/// Hot pink used by odd-index streaks.
const HOT_PINK: [u8; 3] = [255, 20, 147];

/// Sparkle anchors as (x, y) fractions of the canvas.
const SPARKLE_ANCHORS: [(f64, f64); 8] = [
    (0.15, 0.15),
    (0.85, 0.15),
    (0.15, 0.85),
    (0.85, 0.85),
    (0.5, 0.1),
    (0.1, 0.5),
    (0.9, 0.5),
    (0.5, 0.9),
];

/// Motion accent streak count.
const STREAK_COUNT: usize = 3;
/// Samples along each streak curve.
const STREAK_SAMPLES: u32 = 48;

/// Confetti depth layer.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Depth {
    Background,
    Foreground,
}

/// Seedable overlay renderer implementing the NYE layer stack.
#[derive(Clone, Debug, Default)]
pub struct NyeCompositor {
    /// Placement seed. `None` draws placements from entropy.
    seed: Option<u64>,
}

impl NyeCompositor {
    /// Create a compositor with entropy-based placement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compositor with pinned placement, for reproducible output.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl OverlayRenderer for NyeCompositor {
    fn name(&self) -> &str {
        "nye-compositor"
    }

    fn apply(&self, image: &ImageData, mode: CompositeMode) -> anyhow::Result<ImageData> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut canvas = Canvas::new(image.width, image.height);
        let exclusion = f64::from(image.width.min(image.height))
            * match mode {
                CompositeMode::Standard => EXCLUSION_STANDARD,
                CompositeMode::FaceSafe => EXCLUSION_FACE_SAFE,
            };

        canvas.radial_tint();
        canvas.glow_halo();
        canvas.draw_base(image);

        canvas.confetti(&mut rng, Depth::Background, CONFETTI_BACKGROUND, exclusion);
        let foreground = match mode {
            CompositeMode::Standard => CONFETTI_FOREGROUND,
            CompositeMode::FaceSafe => CONFETTI_FOREGROUND_FACE_SAFE,
        };
        canvas.confetti(&mut rng, Depth::Foreground, foreground, exclusion);

        canvas.sparkles(&mut rng);
        canvas.streaks(&mut rng, exclusion);

        Ok(canvas.into_image()?)
    }
}

/// Mutable RGBA canvas with straight-alpha source-over blending.
struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    fn center(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    fn into_image(self) -> Result<ImageData, crate::error::AnalysisError> {
        ImageData::new(self.width, self.height, self.data)
    }

    /// Source-over blend of a straight-alpha color onto one pixel.
    fn blend(&mut self, x: i64, y: i64, rgb: [u8; 3], alpha: f64) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let dst_alpha = f64::from(self.data[idx + 3]) / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);
        if out_alpha <= 0.0 {
            return;
        }
        for channel in 0..3 {
            let src = f64::from(rgb[channel]);
            let dst = f64::from(self.data[idx + channel]);
            let out = (src * alpha + dst * dst_alpha * (1.0 - alpha)) / out_alpha;
            self.data[idx + channel] = out.round().clamp(0.0, 255.0) as u8;
        }
        self.data[idx + 3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Layer 1: radial gradient tint across the whole canvas.
    fn radial_tint(&mut self) {
        // (color, alpha) stops at t = 0, 0.5, 1.
        const STOPS: [([u8; 3], f64); 3] = [
            ([255, 215, 0], 0.12),  // gold center
            ([138, 43, 226], 0.08), // purple mid
            ([25, 25, 112], 0.15),  // midnight edge
        ];
        let (cx, cy) = self.center();
        let max_radius = f64::from(self.width.max(self.height)) / 2.0;

        for y in 0..self.height {
            for x in 0..self.width {
                let dx = f64::from(x) - cx;
                let dy = f64::from(y) - cy;
                let t = ((dx * dx + dy * dy).sqrt() / max_radius).min(1.0);

                let (from, to, local) = if t < 0.5 {
                    (STOPS[0], STOPS[1], t / 0.5)
                } else {
                    (STOPS[1], STOPS[2], (t - 0.5) / 0.5)
                };
                let rgb = [
                    lerp(from.0[0], to.0[0], local),
                    lerp(from.0[1], to.0[1], local),
                    lerp(from.0[2], to.0[2], local),
                ];
                let alpha = from.1 + (to.1 - from.1) * local;
                self.blend(i64::from(x), i64::from(y), rgb, alpha);
            }
        }
    }

    /// Layer 2: warm gold falloff standing in for the blurred halo. Drawn
    /// before the base layer, so it only shows through transparent regions.
    fn glow_halo(&mut self) {
        let (cx, cy) = self.center();
        let reach = f64::from(self.width.max(self.height)) * 0.55;

        for y in 0..self.height {
            for x in 0..self.width {
                let dx = f64::from(x) - cx;
                let dy = f64::from(y) - cy;
                let t = ((dx * dx + dy * dy).sqrt() / reach).min(1.0);
                let alpha = 0.18 * (1.0 - t * t);
                if alpha > 0.0 {
                    self.blend(i64::from(x), i64::from(y), GOLD, alpha);
                }
            }
        }
    }

    /// Layer 3: the original image, source-over, unmodified.
    fn draw_base(&mut self, image: &ImageData) {
        for y in 0..self.height {
            for x in 0..self.width {
                let [r, g, b, a] = image.rgba(x, y);
                self.blend(i64::from(x), i64::from(y), [r, g, b], f64::from(a) / 255.0);
            }
        }
    }

    /// Layers 4-5: rotated confetti rectangles, center excluded.
    ///
    /// All random draws for a piece happen before the exclusion check so the
    /// placement sequence is independent of how many pieces get skipped.
    fn confetti(&mut self, rng: &mut StdRng, depth: Depth, count: usize, exclusion: f64) {
        let (cx, cy) = self.center();

        for _ in 0..count {
            let x = rng.gen::<f64>() * f64::from(self.width);
            let y = rng.gen::<f64>() * f64::from(self.height);
            let size = match depth {
                Depth::Background => 4.0 + rng.gen::<f64>() * 8.0,
                Depth::Foreground => 6.0 + rng.gen::<f64>() * 12.0,
            };
            let rotation = rng.gen::<f64>() * 360.0_f64.to_radians();
            let color = CONFETTI_COLORS[rng.gen_range(0..CONFETTI_COLORS.len())];
            let opacity = match depth {
                Depth::Background => 0.4 + rng.gen::<f64>() * 0.3,
                Depth::Foreground => 0.6 + rng.gen::<f64>() * 0.4,
            };

            let dx = x - cx;
            let dy = y - cy;
            if (dx * dx + dy * dy).sqrt() < exclusion {
                continue;
            }

            self.fill_rotated_rect(x, y, size / 2.0, size / 4.0, rotation, color, opacity);
        }
    }

    /// Fill a rectangle of half-extents `(half_w, half_h)` centered at
    /// `(cx, cy)`, rotated by `angle`.
    #[allow(clippy::too_many_arguments)]
    fn fill_rotated_rect(
        &mut self,
        cx: f64,
        cy: f64,
        half_w: f64,
        half_h: f64,
        angle: f64,
        color: [u8; 3],
        opacity: f64,
    ) {
        let reach = half_w.hypot(half_h).ceil();
        let (sin, cos) = angle.sin_cos();

        let x0 = (cx - reach).floor() as i64;
        let x1 = (cx + reach).ceil() as i64;
        let y0 = (cy - reach).floor() as i64;
        let y1 = (cy + reach).ceil() as i64;

        for py in y0..=y1 {
            for px in x0..=x1 {
                let rx = px as f64 - cx;
                let ry = py as f64 - cy;
                let u = rx * cos + ry * sin;
                let v = -rx * sin + ry * cos;
                if u.abs() <= half_w && v.abs() <= half_h {
                    self.blend(px, py, color, opacity);
                }
            }
        }
    }

    /// Layer 6: four-point stars at the fixed anchor positions.
    fn sparkles(&mut self, rng: &mut StdRng) {
        for (fx, fy) in SPARKLE_ANCHORS {
            let x = fx * f64::from(self.width);
            let y = fy * f64::from(self.height);
            let size = 3.0 + rng.gen::<f64>() * 4.0;
            let alpha = 0.7 + rng.gen::<f64>() * 0.3;

            self.fill_star(x, y, size, size * 2.0, GOLD, alpha);
            self.fill_star(x, y, size * 0.6, size * 1.2, [255, 255, 255], alpha * 0.9);
        }
    }

    /// Fill a 4-point star (8 alternating outer/inner vertices).
    fn fill_star(
        &mut self,
        cx: f64,
        cy: f64,
        inner_radius: f64,
        outer_radius: f64,
        color: [u8; 3],
        alpha: f64,
    ) {
        const POINTS: usize = 4;
        let vertices: Vec<(f64, f64)> = (0..POINTS * 2)
            .map(|i| {
                let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
                let angle = (i as f64 * std::f64::consts::PI) / POINTS as f64
                    - std::f64::consts::FRAC_PI_2;
                (cx + angle.cos() * radius, cy + angle.sin() * radius)
            })
            .collect();

        let x0 = (cx - outer_radius).floor() as i64;
        let x1 = (cx + outer_radius).ceil() as i64;
        let y0 = (cy - outer_radius).floor() as i64;
        let y1 = (cy + outer_radius).ceil() as i64;

        for py in y0..=y1 {
            for px in x0..=x1 {
                if point_in_polygon(px as f64, py as f64, &vertices) {
                    self.blend(px, py, color, alpha);
                }
            }
        }
    }

    /// Layer 7: quadratic streaks near the side edges. Samples inside the
    /// exclusion circle are dropped so streaks never cross the face region.
    fn streaks(&mut self, rng: &mut StdRng, exclusion: f64) {
        let (cx, cy) = self.center();
        let width = f64::from(self.width);
        let height = f64::from(self.height);

        for i in 0..STREAK_COUNT {
            let start_x = if rng.gen::<f64>() < 0.5 {
                rng.gen::<f64>() * width * 0.2
            } else {
                width - rng.gen::<f64>() * width * 0.2
            };
            let start_y = rng.gen::<f64>() * height;
            let alpha = 0.15 + rng.gen::<f64>() * 0.15;
            let line_width = 2.0 + rng.gen::<f64>() * 3.0;
            let control = (
                start_x + (rng.gen::<f64>() - 0.5) * 100.0,
                start_y + (rng.gen::<f64>() - 0.5) * 100.0,
            );
            let end = (
                start_x + (rng.gen::<f64>() - 0.5) * 60.0,
                start_y + (rng.gen::<f64>() - 0.5) * 60.0,
            );
            let color = if i % 2 == 0 { GOLD } else { HOT_PINK };

            // Rasterize the stroke into a mask first so overlapping samples
            // blend exactly once per pixel.
            let mut mask = vec![false; self.width as usize * self.height as usize];
            for step in 0..=STREAK_SAMPLES {
                let t = f64::from(step) / f64::from(STREAK_SAMPLES);
                let inv = 1.0 - t;
                let px = inv * inv * start_x + 2.0 * inv * t * control.0 + t * t * end.0;
                let py = inv * inv * start_y + 2.0 * inv * t * control.1 + t * t * end.1;

                let dx = px - cx;
                let dy = py - cy;
                if (dx * dx + dy * dy).sqrt() < exclusion + line_width {
                    continue;
                }
                self.mark_disc(&mut mask, px, py, line_width / 2.0);
            }

            for py in 0..self.height {
                for px in 0..self.width {
                    if mask[py as usize * self.width as usize + px as usize] {
                        self.blend(i64::from(px), i64::from(py), color, alpha);
                    }
                }
            }
        }
    }

    /// Mark the pixels of a filled disc in a coverage mask.
    fn mark_disc(&self, mask: &mut [bool], cx: f64, cy: f64, radius: f64) {
        let x0 = (cx - radius).floor() as i64;
        let x1 = (cx + radius).ceil() as i64;
        let y0 = (cy - radius).floor() as i64;
        let y1 = (cy + radius).ceil() as i64;

        for py in y0..=y1 {
            for px in x0..=x1 {
                if px < 0 || py < 0 || px >= i64::from(self.width) || py >= i64::from(self.height)
                {
                    continue;
                }
                let dx = px as f64 - cx;
                let dy = py as f64 - cy;
                if (dx * dx + dy * dy).sqrt() <= radius {
                    mask[py as usize * self.width as usize + px as usize] = true;
                }
            }
        }
    }
}

/// Linear interpolation between two channel values.
fn lerp(from: u8, to: u8, t: f64) -> u8 {
    (f64::from(from) + (f64::from(to) - f64::from(from)) * t)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Even-odd ray-cast point-in-polygon test.
fn point_in_polygon(px: f64, py: f64, vertices: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
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

    /// Opaque field with a distinctive center disk of the given radius.
    fn disk_image(radius: f64) -> ImageData {
        from_fn(100, 100, |x, y| {
            let dx = f64::from(x) - 50.0;
            let dy = f64::from(y) - 50.0;
            if (dx * dx + dy * dy).sqrt() < radius {
                [10, 200, 30, 255]
            } else {
                [90, 90, 90, 255]
            }
        })
    }

    #[test]
    fn test_same_seed_same_output() {
        let img = disk_image(15.0);
        let a = NyeCompositor::with_seed(99)
            .apply(&img, CompositeMode::Standard)
            .unwrap();
        let b = NyeCompositor::with_seed(99)
            .apply(&img, CompositeMode::Standard)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_standard_mode_keeps_center_subject() {
        // Exclusion radius is 30 for a 100x100 canvas; every overlay stays
        // clear of the inner disk with margin to spare.
        let img = disk_image(15.0);
        let out = NyeCompositor::with_seed(7)
            .apply(&img, CompositeMode::Standard)
            .unwrap();

        for y in 0..100u32 {
            for x in 0..100u32 {
                let dx = f64::from(x) - 50.0;
                let dy = f64::from(y) - 50.0;
                if (dx * dx + dy * dy).sqrt() <= 14.0 {
                    assert_eq!(out.rgba(x, y), img.rgba(x, y), "pixel ({x},{y}) changed");
                }
            }
        }
    }

    #[test]
    fn test_face_safe_mode_widens_clear_region() {
        let img = disk_image(20.0);
        let out = NyeCompositor::with_seed(7)
            .apply(&img, CompositeMode::FaceSafe)
            .unwrap();

        for y in 0..100u32 {
            for x in 0..100u32 {
                let dx = f64::from(x) - 50.0;
                let dy = f64::from(y) - 50.0;
                if (dx * dx + dy * dy).sqrt() <= 19.0 {
                    assert_eq!(out.rgba(x, y), img.rgba(x, y), "pixel ({x},{y}) changed");
                }
            }
        }
    }

    #[test]
    fn test_output_dimensions_match_input() {
        let img = disk_image(10.0);
        let out = NyeCompositor::with_seed(1)
            .apply(&img, CompositeMode::Standard)
            .unwrap();
        assert_eq!(out.width, img.width);
        assert_eq!(out.height, img.height);
    }

    #[test]
    fn test_transparent_background_gains_tint() {
        // A fully transparent image must come back with visible background
        // layers rather than staying empty.
        let img = from_fn(64, 64, |_, _| [0, 0, 0, 0]);
        let out = NyeCompositor::with_seed(3)
            .apply(&img, CompositeMode::Standard)
            .unwrap();
        let corner = out.rgba(0, 0);
        assert!(corner[3] > 0, "corner stayed fully transparent");
    }

    #[test]
    fn test_overlays_are_actually_added() {
        let img = disk_image(15.0);
        let out = NyeCompositor::with_seed(11)
            .apply(&img, CompositeMode::Standard)
            .unwrap();
        let changed = (0..100u32)
            .flat_map(|y| (0..100u32).map(move |x| (x, y)))
            .filter(|&(x, y)| out.rgba(x, y) != img.rgba(x, y))
            .count();
        assert!(changed > 0, "compositor produced a byte-identical image");
    }
}
