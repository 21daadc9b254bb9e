use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::project::error::ProjectColorsError;

pub const BLACK: &str = "#000000";
pub const WHITE: &str = "#ffffff";

/// Alpha suffix appended to the contrast color for dimmed foregrounds.
pub const SEMI_TRANSPARENT_SUFFIX: &str = "90";

/// A `#rrggbb` color. Always six hex digits, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HexColor(String);

impl HexColor {
    /// Parses `#rrggbb` (either case). Shorthand and alpha forms are rejected.
    pub fn parse(s: &str) -> Result<Self, ProjectColorsError> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('#')
            .ok_or_else(|| ProjectColorsError::InvalidColor(s.to_string()))?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ProjectColorsError::InvalidColor(s.to_string()));
        }
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        // parse() guarantees six hex digits after '#'
        let value = u32::from_str_radix(&self.0[1..], 16).unwrap_or(0);
        (
            ((value >> 16) & 0xff) as u8,
            ((value >> 8) & 0xff) as u8,
            (value & 0xff) as u8,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn black() -> Self {
        Self(BLACK.to_string())
    }

    pub fn white() -> Self {
        Self(WHITE.to_string())
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexColor {
    type Err = ProjectColorsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Half-up rounding: negative halves round toward positive infinity
/// (`-25.5` becomes `-25`), unlike `f64::round`.
fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Black for bright colors, white for dark ones.
///
/// Uses the fixed weighted sum `(0.299 R + 0.587 G + 0.114 B) / 255` and a
/// strict `> 0.5` threshold.
pub fn contrast_color(color: &HexColor) -> HexColor {
    let (r, g, b) = color.rgb();
    let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
    if luminance > 0.5 {
        HexColor::black()
    } else {
        HexColor::white()
    }
}

/// The opposite of [`contrast_color`].
pub fn inverse_contrast_color(color: &HexColor) -> HexColor {
    if contrast_color(color).as_str() == WHITE {
        HexColor::black()
    } else {
        HexColor::white()
    }
}

/// Shifts every channel by `round(2.55 * percent)` and clamps each channel
/// to `0..=255` on its own. Positive percent lightens, negative darkens.
///
/// Channels are recombined in decode order (R, G, B).
pub fn lighten_or_darken(color: &HexColor, percent: f64) -> HexColor {
    let amount = round_half_up(2.55 * percent);
    let (r, g, b) = color.rgb();
    HexColor::from_rgb(
        clamp_channel(r as i64 + amount),
        clamp_channel(g as i64 + amount),
        clamp_channel(b as i64 + amount),
    )
}

/// Linear per-channel interpolation from `a` toward `b`.
/// `weight` is the percentage of `b` in the result (clamped to `0..=100`).
pub fn mix(a: &HexColor, b: &HexColor, weight: f64) -> HexColor {
    let w = weight.clamp(0.0, 100.0) / 100.0;
    let (ar, ag, ab) = a.rgb();
    let (br, bg, bb) = b.rgb();
    let blend = |x: u8, y: u8| clamp_channel(round_half_up(x as f64 * (1.0 - w) + y as f64 * w));
    HexColor::from_rgb(blend(ar, br), blend(ag, bg), blend(ab, bb))
}

/// Appends a two-digit alpha suffix, producing `#rrggbbaa`.
pub fn with_alpha(color: &HexColor, alpha: f64) -> String {
    let a = round_half_up(alpha.clamp(0.0, 1.0) * 255.0);
    format!("{}{:02x}", color, clamp_channel(a))
}

/// The contrast color at the fixed semi-transparent alpha (`#rrggbb90`).
pub fn semi_transparent(color: &HexColor) -> String {
    format!("{}{}", color, SEMI_TRANSPARENT_SUFFIX)
}

pub fn random_color<R: Rng>(rng: &mut R) -> HexColor {
    let value: u32 = rng.gen_range(0..=0x00ff_ffff);
    HexColor(format!("#{:06x}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hex(s: &str) -> HexColor {
        HexColor::parse(s).unwrap()
    }

    #[test]
    fn test_parse_normalizes_case() {
        assert_eq!(hex("#681DD7").as_str(), "#681dd7");
        assert_eq!(hex("  #AbCdEf ").as_str(), "#abcdef");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "#", "681dd7", "#fff", "#681dd7ff", "#68 1dd", "#gggggg", "red"] {
            assert!(HexColor::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_rgb_decoding() {
        assert_eq!(hex("#681dd7").rgb(), (0x68, 0x1d, 0xd7));
        assert_eq!(HexColor::from_rgb(1, 2, 3).as_str(), "#010203");
    }

    #[test]
    fn test_contrast_extremes() {
        assert_eq!(contrast_color(&hex("#ffffff")).as_str(), BLACK);
        assert_eq!(contrast_color(&hex("#000000")).as_str(), WHITE);
        assert_eq!(contrast_color(&hex("#681dd7")).as_str(), WHITE);
        assert_eq!(contrast_color(&hex("#ffd700")).as_str(), BLACK);
    }

    #[test]
    fn test_contrast_threshold_is_strict() {
        // #808080 → 128/255 ≈ 0.502, just above the threshold
        assert_eq!(contrast_color(&hex("#808080")).as_str(), BLACK);
        // #7f7f7f → 127/255 ≈ 0.498
        assert_eq!(contrast_color(&hex("#7f7f7f")).as_str(), WHITE);
    }

    #[test]
    fn test_inverse_contrast() {
        assert_eq!(inverse_contrast_color(&hex("#ffffff")).as_str(), WHITE);
        assert_eq!(inverse_contrast_color(&hex("#000000")).as_str(), BLACK);
    }

    #[test]
    fn test_lighten_clamps_high() {
        assert_eq!(lighten_or_darken(&hex("#ffffff"), 50.0).as_str(), "#ffffff");
    }

    #[test]
    fn test_darken_clamps_low() {
        assert_eq!(lighten_or_darken(&hex("#000000"), -50.0).as_str(), "#000000");
    }

    #[test]
    fn test_lighten_or_darken_regression() {
        // Pinned output: channels are shifted by 51 and recombined in R, G, B order.
        assert_eq!(lighten_or_darken(&hex("#681dd7"), 20.0).as_str(), "#9b50ff");
        assert_eq!(lighten_or_darken(&hex("#681dd7"), -20.0).as_str(), "#3500a4");
        assert_eq!(lighten_or_darken(&hex("#102030"), 0.0).as_str(), "#102030");
    }

    #[test]
    fn test_lighten_is_cumulative() {
        let once = lighten_or_darken(&hex("#202020"), 20.0);
        let twice = lighten_or_darken(&once, 20.0);
        assert_eq!(once.as_str(), "#535353");
        assert_eq!(twice.as_str(), "#868686");
    }

    #[test]
    fn test_mix_endpoints_and_midpoint() {
        let a = hex("#000000");
        let b = hex("#ffffff");
        assert_eq!(mix(&a, &b, 0.0), a);
        assert_eq!(mix(&a, &b, 100.0), b);
        assert_eq!(mix(&a, &b, 50.0).as_str(), "#808080");
    }

    #[test]
    fn test_mix_keeps_leading_zeros() {
        assert_eq!(mix(&hex("#000010"), &hex("#000010"), 30.0).as_str(), "#000010");
    }

    #[test]
    fn test_with_alpha() {
        let result = with_alpha(&hex("#681dd7"), 0.6);
        assert_eq!(result, "#681dd799");
        assert_eq!(result.len(), 9);
        assert_eq!(with_alpha(&hex("#681dd7"), 0.0), "#681dd700");
        assert_eq!(with_alpha(&hex("#681dd7"), 1.0), "#681dd7ff");
    }

    #[test]
    fn test_semi_transparent() {
        assert_eq!(semi_transparent(&HexColor::white()), "#ffffff90");
    }

    #[test]
    fn test_random_color_is_valid_and_seedable() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = random_color(&mut rng);
        assert!(HexColor::parse(first.as_str()).is_ok());
        let mut again = StdRng::seed_from_u64(7);
        assert_eq!(random_color(&mut again), first);
    }

    #[test]
    fn test_serde_round_trip_rejects_bad_value() {
        let parsed: HexColor = serde_json::from_str("\"#ABCDEF\"").unwrap();
        assert_eq!(parsed.as_str(), "#abcdef");
        assert!(serde_json::from_str::<HexColor>("\"blue\"").is_err());
    }

    fn any_color() -> impl Strategy<Value = HexColor> {
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| HexColor::from_rgb(r, g, b))
    }

    proptest! {
        #[test]
        fn prop_contrast_is_black_or_white(c in any_color()) {
            let first = contrast_color(&c);
            prop_assert!(first.as_str() == BLACK || first.as_str() == WHITE);
            prop_assert_eq!(contrast_color(&c), first);
        }

        #[test]
        fn prop_shift_stays_valid(c in any_color(), p in -200.0f64..200.0) {
            let shifted = lighten_or_darken(&c, p);
            prop_assert!(HexColor::parse(shifted.as_str()).is_ok());
            prop_assert_eq!(lighten_or_darken(&c, p), shifted);
        }

        #[test]
        fn prop_mix_stays_between_inputs(a in any_color(), b in any_color(), w in 0.0f64..=100.0) {
            let (mr, mg, mb) = mix(&a, &b, w).rgb();
            let (ar, ag, ab) = a.rgb();
            let (br, bg, bb) = b.rgb();
            prop_assert!(mr >= ar.min(br) && mr <= ar.max(br));
            prop_assert!(mg >= ag.min(bg) && mg <= ag.max(bg));
            prop_assert!(mb >= ab.min(bb) && mb <= ab.max(bb));
        }
    }
}
