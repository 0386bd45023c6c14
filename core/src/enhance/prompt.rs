//! Prompt Construction
//!
//! Builds the short, data-driven prompt the AI providers submit: coarse
//! color names derived from the extracted palette, the species cue, and a
//! randomly flavored character variation. The random pickers draw from an
//! injected seed so tests (and callers wanting reproducible output) can pin
//! the selection; an unseeded request draws from entropy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::traits::AiRequest;

/// Character body variations, picked per request for visual diversity.
const SUB_SPECIES: [&str; 10] = [
    "with tiny stubby arms",
    "with little round feet",
    "with small pointy ears",
    "with a fluffy tuft on top",
    "with tiny wings",
    "with a curly tail",
    "with antenna on head",
    "with small spikes along back",
    "with big round ears",
    "with a small horn",
];

/// Celebration poses, picked per request.
const VIBES: [&str; 10] = [
    "ecstatic and jumping with joy, confetti exploding around them",
    "dizzy and spinning with stars circling their head, party hat flying off",
    "exhausted but happy, surrounded by empty champagne bottles and party debris",
    "mischievously laughing while covered in glitter and streamers",
    "dancing wildly with arms up, champagne foam spraying",
    "sleepy and content, hugging a champagne bottle like a teddy bear",
    "excited and yelling with a party horn, confetti shooting out",
    "playfully tangled in streamers, giggling",
    "triumphantly raising a champagne bottle overhead like a trophy",
    "laying down surrounded by party chaos, looking satisfied",
];

/// A picked sub-species/vibe pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptFlair {
    /// Body variation line.
    pub sub_species: &'static str,
    /// Celebration pose line.
    pub vibe: &'static str,
}

impl PromptFlair {
    /// Pick a flair pair from a seed. Identical seeds always pick the same
    /// pair.
    #[must_use]
    pub fn pick(seed: u64) -> Self {
        Self::pick_with_rng(&mut StdRng::seed_from_u64(seed))
    }

    /// Pick a flair pair from any RNG.
    pub fn pick_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            sub_species: SUB_SPECIES[rng.gen_range(0..SUB_SPECIES.len())],
            vibe: VIBES[rng.gen_range(0..VIBES.len())],
        }
    }
}

/// Map an RGB color to a coarse human-readable name.
///
/// The decision ladder is evaluated top-down; the dominant channel wins,
/// then mixed and achromatic cases.
#[must_use]
pub fn color_name(r: u8, g: u8, b: u8) -> &'static str {
    let brightness = r.max(g).max(b);

    if r > g && r > b {
        return match brightness {
            0..=99 => "dark red",
            201..=255 => "bright red",
            _ => "red",
        };
    }
    if g > r && g > b {
        return match brightness {
            0..=99 => "dark green",
            201..=255 => "bright green",
            _ => "green",
        };
    }
    if b > r && b > g {
        return match brightness {
            0..=99 => "dark blue",
            201..=255 => "bright blue",
            _ => "blue",
        };
    }
    if r > 150 && g > 150 {
        return "yellow";
    }
    if r > 150 && b > 150 {
        return "pink";
    }
    if brightness < 80 {
        return "black";
    }
    if brightness > 200 {
        return "white";
    }
    "gray"
}

/// Map a `#rrggbb` hex string to a coarse color name, `None` when the
/// string is not parseable.
#[must_use]
pub fn color_name_for_hex(hex: &str) -> Option<&'static str> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some(color_name(r, g, b))
}

/// Build the generation prompt for a request.
///
/// Deliberately compact: the character species, a flair pair, the coarse
/// palette color names, and the optional style hint. Seeded requests
/// produce identical prompts on every call.
#[must_use]
pub fn build_prompt(request: &AiRequest) -> String {
    let flair = match request.seed {
        Some(seed) => PromptFlair::pick(seed),
        None => PromptFlair::pick_with_rng(&mut StdRng::from_entropy()),
    };

    let species = request
        .species_cue
        .map_or_else(|| "party puff".to_string(), |cue| cue.to_string());

    let color_names: Vec<&str> = request
        .palette_hex
        .iter()
        .filter_map(|hex| color_name_for_hex(hex))
        .collect();

    let mut prompt = format!(
        "A cute round party mascot - a {species} {sub}, celebrating New Year's Eve. \
         The mascot is {vibe}.",
        sub = flair.sub_species,
        vibe = flair.vibe,
    );

    match color_names.as_slice() {
        [] => {}
        [primary] => {
            prompt.push_str(&format!(" Body color: {primary}."));
        }
        [primary, secondary] => {
            prompt.push_str(&format!(" Body: {primary}. Details: {secondary}."));
        }
        [primary, secondary, accent, ..] => {
            prompt.push_str(&format!(
                " Body: {primary}. Details: {secondary}. Accents: {accent}."
            ));
        }
    }

    if let Some(style) = &request.style {
        prompt.push(' ');
        prompt.push_str(style);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpeciesCue;

    #[test]
    fn test_flair_pick_is_seed_deterministic() {
        assert_eq!(PromptFlair::pick(7), PromptFlair::pick(7));
        assert_eq!(PromptFlair::pick(u64::MAX), PromptFlair::pick(u64::MAX));
    }

    #[test]
    fn test_color_name_ladder() {
        assert_eq!(color_name(255, 0, 0), "bright red");
        assert_eq!(color_name(80, 0, 0), "dark red");
        assert_eq!(color_name(150, 20, 20), "red");
        assert_eq!(color_name(0, 160, 0), "green");
        assert_eq!(color_name(0, 0, 250), "bright blue");
        assert_eq!(color_name(255, 255, 0), "yellow");
        assert_eq!(color_name(255, 100, 255), "pink");
        assert_eq!(color_name(30, 30, 30), "black");
        assert_eq!(color_name(230, 230, 230), "white");
        assert_eq!(color_name(128, 128, 128), "gray");
    }

    #[test]
    fn test_color_name_for_hex() {
        assert_eq!(color_name_for_hex("#ff0000"), Some("bright red"));
        assert_eq!(color_name_for_hex("888888"), Some("gray"));
        assert_eq!(color_name_for_hex("#nothex"), None);
        assert_eq!(color_name_for_hex("#fff"), None);
    }

    #[test]
    fn test_seeded_prompt_is_stable() {
        let request = AiRequest::new("data:image/png;base64,AAAA")
            .with_palette(vec![
                "#c81818".to_string(),
                "#18c818".to_string(),
                "#1818c8".to_string(),
            ])
            .with_species(SpeciesCue::CyberPuff)
            .with_seed(42);

        let a = build_prompt(&request);
        let b = build_prompt(&request);
        assert_eq!(a, b);
        assert!(a.contains("cyber puff"));
        assert!(a.contains("Body: red."));
        assert!(a.contains("Details: green."));
        assert!(a.contains("Accents: blue."));
    }

    #[test]
    fn test_style_hint_is_appended() {
        let request = AiRequest::new("data:x;base64,AAAA")
            .with_style("flat sticker art")
            .with_seed(1);
        assert!(build_prompt(&request).ends_with("flat sticker art"));
    }
}
