use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GradientError, GradientResult};

/// Color token exactly as the caller wrote it (`"#1e3c72"`, `"#ffe864ff"`).
///
/// Tokens pass through gradient descriptors untouched, alpha digits included.
/// Only interpolation looks inside them, and it works on the RGB part alone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub const WHITE: &'static str = "#ffffff";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn white() -> Self {
        Self::new(Self::WHITE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// RGB triple of a hex token; any alpha digits are ignored.
    pub fn to_rgb(&self) -> GradientResult<Rgb> {
        let [r, g, b, _] = self.to_rgba8()?;
        Ok(Rgb { r, g, b })
    }

    /// Straight (non-premultiplied) RGBA bytes of a hex token.
    pub fn to_rgba8(&self) -> GradientResult<[u8; 4]> {
        parse_hex(&self.0)
    }

    pub fn is_hex(&self) -> bool {
        parse_hex(&self.0).is_ok()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Rgb> for Color {
    fn from(value: Rgb) -> Self {
        Self(value.to_hex())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Component-wise linear blend, rounded to nearest and clamped to `0..=255`.
///
/// `t` is used as given; callers clamp it.
pub fn blend(a: Rgb, b: Rgb, t: f64) -> Rgb {
    fn channel(a: u8, b: u8, t: f64) -> u8 {
        let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
        v.round().clamp(0.0, 255.0) as u8
    }

    Rgb {
        r: channel(a.r, b.r, t),
        g: channel(a.g, b.g, t),
        b: channel(a.b, b.b, t),
    }
}

/// Blends two color tokens, substituting white for a token that does not parse.
pub fn blend_colors(a: &Color, b: &Color, t: f64) -> Color {
    let a = rgb_or_white(a);
    let b = rgb_or_white(b);
    Color::from(blend(a, b, t))
}

fn rgb_or_white(c: &Color) -> Rgb {
    match c.to_rgb() {
        Ok(rgb) => rgb,
        Err(err) => {
            tracing::warn!(%err, "substituting white for unparseable color");
            Rgb::new(255, 255, 255)
        }
    }
}

fn parse_hex(s: &str) -> GradientResult<[u8; 4]> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix('#')
        .ok_or_else(|| GradientError::malformed_color(format!("\"{s}\" has no leading '#'")))?;

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(GradientError::malformed_color(format!(
            "\"{s}\" contains non-hex digits"
        )));
    }

    let nibble = |i: usize| -> u8 {
        let v = u8::from_str_radix(&digits[i..i + 1], 16).unwrap_or(0);
        v * 17
    };
    let byte = |i: usize| -> u8 { u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0) };

    match digits.len() {
        3 => Ok([nibble(0), nibble(1), nibble(2), 255]),
        4 => Ok([nibble(0), nibble(1), nibble(2), nibble(3)]),
        6 => Ok([byte(0), byte(2), byte(4), 255]),
        8 => Ok([byte(0), byte(2), byte(4), byte(6)]),
        _ => Err(GradientError::malformed_color(format!(
            "\"{s}\" must be #rgb, #rgba, #rrggbb or #rrggbbaa"
        ))),
    }
}
