//! Color schemes and multi-stop interpolation engine.

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Transparent black (used for nodata).
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0 };
}

/// A color stop: position in [0, 1] mapped to an RGB color.
#[derive(Debug, Clone, Copy)]
pub struct ColorStop {
    pub t: f64,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(t: f64, r: u8, g: u8, b: u8) -> Self {
        Self {
            t,
            color: Rgb::new(r, g, b),
        }
    }
}

/// Available color schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorScheme {
    /// Brown -> Yellow -> Green (vegetation indices)
    Ndvi,
    /// White -> Cyan -> Blue (water/moisture indices)
    Water,
    /// Blue -> White -> Red (anomaly scores, divergent data)
    Anomaly,
    /// White -> Yellow -> Orange -> Red (risk masks and probabilities)
    Risk,
    /// Black -> White
    Grayscale,
}

impl ColorScheme {
    /// All available schemes, useful for CLI listings.
    pub const ALL: &[ColorScheme] = &[
        Self::Ndvi,
        Self::Water,
        Self::Anomaly,
        Self::Risk,
        Self::Grayscale,
    ];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ndvi => "NDVI",
            Self::Water => "Water",
            Self::Anomaly => "Anomaly",
            Self::Risk => "Risk",
            Self::Grayscale => "Grayscale",
        }
    }

    /// Parse a scheme name (case-insensitive).
    pub fn parse(s: &str) -> Option<ColorScheme> {
        Self::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(s))
    }
}

// ─── Color stop definitions ────────────────────────────────────────────

const NDVI_STOPS: &[ColorStop] = &[
    ColorStop::new(0.0, 120, 70, 20),
    ColorStop::new(0.3, 200, 170, 60),
    ColorStop::new(0.5, 240, 230, 100),
    ColorStop::new(0.7, 100, 180, 50),
    ColorStop::new(1.0, 10, 100, 20),
];

const WATER_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 240, 249, 255),
    ColorStop::new(0.25, 186, 228, 250),
    ColorStop::new(0.50, 80, 180, 230),
    ColorStop::new(0.75, 30, 120, 200),
    ColorStop::new(1.00, 8, 48, 107),
];

const ANOMALY_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 33, 102, 172),
    ColorStop::new(0.25, 103, 169, 207),
    ColorStop::new(0.50, 247, 247, 247),
    ColorStop::new(0.75, 239, 138, 98),
    ColorStop::new(1.00, 178, 24, 43),
];

const RISK_STOPS: &[ColorStop] = &[
    ColorStop::new(0.00, 255, 255, 245),
    ColorStop::new(0.35, 254, 217, 118),
    ColorStop::new(0.65, 253, 141, 60),
    ColorStop::new(0.85, 227, 26, 28),
    ColorStop::new(1.00, 128, 0, 38),
];

// ─── Interpolation engine ──────────────────────────────────────────────

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_color(c1: Rgb, c2: Rgb, t: f64) -> Rgb {
    Rgb::new(
        lerp(c1.r as f64, c2.r as f64, t).round() as u8,
        lerp(c1.g as f64, c2.g as f64, t).round() as u8,
        lerp(c1.b as f64, c2.b as f64, t).round() as u8,
    )
}

fn multi_stop(stops: &[ColorStop], t: f64) -> Rgb {
    if t <= 0.0 {
        return stops[0].color;
    }
    if t >= 1.0 {
        return stops[stops.len() - 1].color;
    }
    for i in 1..stops.len() {
        if t <= stops[i].t {
            let ratio = (t - stops[i - 1].t) / (stops[i].t - stops[i - 1].t);
            return lerp_color(stops[i - 1].color, stops[i].color, ratio);
        }
    }
    stops[stops.len() - 1].color
}

/// Evaluate a color scheme at normalized position `t` ∈ [0, 1].
///
/// Most schemes interpolate linearly between multiple stops; `Grayscale`
/// uses a plain ramp.
pub fn evaluate(scheme: ColorScheme, t: f64) -> Rgb {
    match scheme {
        ColorScheme::Ndvi => multi_stop(NDVI_STOPS, t),
        ColorScheme::Water => multi_stop(WATER_STOPS, t),
        ColorScheme::Anomaly => multi_stop(ANOMALY_STOPS, t),
        ColorScheme::Risk => multi_stop(RISK_STOPS, t),
        ColorScheme::Grayscale => {
            let v = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
            Rgb::new(v, v, v)
        }
    }
}
