// Color Layer - the two map color policies
// "grupos" mode: continent gradient by rank position.
// "escala" mode: mono cyan scale by value percentile bucket.

use serde::{Serialize, Serializer};

// ============================================================================
// RGB
// ============================================================================

/// An sRGB color. Serializes as a `#rrggbb` hex string for the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Build an `Rgb` from a packed `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Rgb {
    Rgb {
        r: ((hex >> 16) & 0xFF) as u8,
        g: ((hex >> 8) & 0xFF) as u8,
        b: (hex & 0xFF) as u8,
    }
}

impl Rgb {
    /// Parse a `#rrggbb` hex string (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Rgb> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        if digits.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        Some(rgb(value))
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Channel-wise linear interpolation at `t` in `[0, 1]`, rounded to the
    /// nearest channel value. Matches d3's `interpolateRgb`.
    pub fn lerp(&self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let channel = |a: u8, b: u8| -> u8 {
            (a as f64 + (b as f64 - a as f64) * t).round() as u8
        };
        Rgb {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
        }
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

// ============================================================================
// PALETTES
// ============================================================================

/// The fixed color triple assigned to a continent: `base` for flat fills,
/// `top`/`bottom` as the ends of the rank gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContinentPalette {
    pub name: &'static str,
    pub base: Rgb,
    pub top: Rgb,
    pub bottom: Rgb,
}

/// Per-continent palettes. Names match the dataset's Spanish continent labels.
pub const CONTINENT_PALETTES: [ContinentPalette; 5] = [
    ContinentPalette {
        name: "Asia",
        base: rgb(0xFFA1A2),
        top: rgb(0xE7000B),
        bottom: rgb(0xFFE1E2),
    },
    ContinentPalette {
        name: "América",
        base: rgb(0x7BF2A7),
        top: rgb(0x00A63D),
        bottom: rgb(0xDCFCE7),
    },
    ContinentPalette {
        name: "Europa",
        base: rgb(0xDAB2FF),
        top: rgb(0x6D11B0),
        bottom: rgb(0xEDE9FE),
    },
    ContinentPalette {
        name: "África",
        base: rgb(0xF0B100),
        top: rgb(0xD18700),
        bottom: rgb(0xFEF9C2),
    },
    ContinentPalette {
        name: "Oceanía",
        base: rgb(0x8EC6FF),
        top: rgb(0x155DFC),
        bottom: rgb(0xDBEAFE),
    },
];

/// Neutral fallback for continents the palette table doesn't know.
pub const DEFAULT_COLOR: Rgb = rgb(0xCCCCCC);

/// Tailwind cyan scale (50..950), used by the mono color mode.
pub const CYAN_COLOR_SCALE: [Rgb; 11] = [
    rgb(0xECFEFF),
    rgb(0xCFFAFE),
    rgb(0xA5F3FC),
    rgb(0x67E8F9),
    rgb(0x22D3EE),
    rgb(0x06B6D4),
    rgb(0x0891B2),
    rgb(0x0E7490),
    rgb(0x155E75),
    rgb(0x164E63),
    rgb(0x083344),
];

pub fn continent_palette(name: &str) -> Option<&'static ContinentPalette> {
    CONTINENT_PALETTES.iter().find(|p| p.name == name)
}

/// Base color for a continent, or neutral gray if unknown.
pub fn continent_color(name: &str) -> Rgb {
    continent_palette(name).map(|p| p.base).unwrap_or(DEFAULT_COLOR)
}

// ============================================================================
// RANK-BASED POLICY ("grupos")
// ============================================================================

/// Color for a country from its 1-based rank within its continent.
///
/// Top 3 ranks get the continent's `top` color, the bottom 3 its `bottom`
/// color, and everything between interpolates at `(rank - 3) / (total - 6)`.
/// The top/bottom bands overlap for `total <= 6`, so the interpolation
/// branch is unreachable there and its denominator is never <= 0; keep the
/// branch order if touching this. Invalid positions get the `base` color,
/// unknown continents neutral gray throughout.
pub fn color_by_ranking(continent: &str, rank: usize, total: usize) -> Rgb {
    let palette = match continent_palette(continent) {
        Some(palette) => *palette,
        None => ContinentPalette {
            name: "",
            base: DEFAULT_COLOR,
            top: DEFAULT_COLOR,
            bottom: DEFAULT_COLOR,
        },
    };

    if rank < 1 || total < 1 {
        return palette.base;
    }
    if rank <= 3 {
        return palette.top;
    }
    if rank + 3 > total {
        return palette.bottom;
    }

    let position = (rank - 3) as f64 / (total - 6) as f64;
    palette.top.lerp(palette.bottom, position)
}

// ============================================================================
// SCALE-BASED POLICY ("escala")
// ============================================================================

// Every other cyan step, for contrast between adjacent buckets.
const BUCKET_COLORS: [Rgb; 5] = [
    CYAN_COLOR_SCALE[2],
    CYAN_COLOR_SCALE[4],
    CYAN_COLOR_SCALE[6],
    CYAN_COLOR_SCALE[8],
    CYAN_COLOR_SCALE[10],
];

/// Bucket index (0..=4) for a value within `[min, max]`: five equal-width
/// bands over the normalized range, clamped at both ends. A degenerate range
/// (`max <= min`) lands everything in bucket 0.
pub fn percentile_bucket(value: f64, min: f64, max: f64) -> usize {
    let span = max - min;
    let normalized = if span > 0.0 { (value - min) / span } else { 0.0 };
    let bucket = (normalized * 5.0).floor();
    bucket.clamp(0.0, 4.0) as usize
}

/// Mono-mode color: light cyan for the bottom band through dark for the top.
pub fn color_by_percentile(value: f64, min: f64, max: f64) -> Rgb {
    BUCKET_COLORS[percentile_bucket(value, min, max)]
}

// ============================================================================
// TESTS
// ============================================================================
