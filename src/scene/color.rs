use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// RGBA color, stored the way documents store it: as a CSS-style string.
///
/// Serializes as `#rrggbb` (or `#rrggbbaa` when alpha is involved).
/// Deserialization also accepts short hex, `rgb(..)`/`rgba(..)` and the
/// empty string, all of which occur in documents saved by older builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::from_rgb(0, 0, 0);
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::from_rgba(0, 0, 0, 0);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Parse any of the color spellings found in stored documents.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Color::TRANSPARENT);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return Self::parse_hex(hex).ok_or_else(|| format!("bad hex color {s:?}"));
        }
        if let Some(inner) = s
            .strip_prefix("rgba(")
            .or_else(|| s.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_components(inner).ok_or_else(|| format!("bad color {s:?}"));
        }
        Err(format!("unrecognized color {s:?}"))
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digit = |b: u8| char::from(b).to_digit(16).map(|d| d as u8);
        let byte = |pair: &[u8]| Some(digit(pair[0])? * 16 + digit(pair[1])?);
        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => {
                let r = digit(bytes[0])?;
                let g = digit(bytes[1])?;
                let b = digit(bytes[2])?;
                Some(Color::from_rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Color::from_rgb(
                byte(&bytes[0..2])?,
                byte(&bytes[2..4])?,
                byte(&bytes[4..6])?,
            )),
            8 => Some(Color::from_rgba(
                byte(&bytes[0..2])?,
                byte(&bytes[2..4])?,
                byte(&bytes[4..6])?,
                byte(&bytes[6..8])?,
            )),
            _ => None,
        }
    }

    fn parse_components(inner: &str) -> Option<Self> {
        let mut parts = inner.split(',').map(str::trim);
        let channel = |p: Option<&str>| -> Option<u8> {
            p?.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8)
        };
        let r = channel(parts.next())?;
        let g = channel(parts.next())?;
        let b = channel(parts.next())?;
        // Alpha, when present, is a 0..1 fraction
        let a = match parts.next() {
            Some(p) => (p.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Color::from_rgba(r, g, b, a))
    }

    pub fn to_hex_string(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_color32(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(self.r, self.g, self.b, self.a)
    }

    pub fn from_color32(c: egui::Color32) -> Self {
        let [r, g, b, a] = c.to_srgba_unmultiplied();
        Self { r, g, b, a }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::parse(&s).map_err(D::Error::custom)
    }
}

/// Fail-soft variant used on decode paths that must not abort: malformed
/// strings become opaque black with a diagnostic.
pub fn parse_lenient(s: &str) -> Color {
    match Color::parse(s) {
        Ok(c) => c,
        Err(err) => {
            log::warn!("Unparseable color in document ({err}), substituting black");
            Color::BLACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse("#d7385e").unwrap(), Color::from_rgb(0xd7, 0x38, 0x5e));
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(
            Color::parse("#00000000").unwrap(),
            Color::from_rgba(0, 0, 0, 0)
        );
    }

    #[test]
    fn parses_legacy_functional_forms() {
        assert_eq!(Color::parse("rgb(255, 0, 0)").unwrap(), Color::from_rgb(255, 0, 0));
        assert_eq!(
            Color::parse("rgba(0,0,0,0)").unwrap(),
            Color::TRANSPARENT
        );
        assert_eq!(
            Color::parse("rgba(215, 56, 94, 0.5)").unwrap(),
            Color::from_rgba(215, 56, 94, 128)
        );
    }

    #[test]
    fn empty_string_is_transparent() {
        assert_eq!(Color::parse("").unwrap(), Color::TRANSPARENT);
    }

    #[test]
    fn round_trips_through_hex() {
        let c = Color::from_rgba(12, 200, 7, 99);
        assert_eq!(Color::parse(&c.to_hex_string()).unwrap(), c);
    }

    #[test]
    fn lenient_parse_substitutes_black() {
        assert_eq!(parse_lenient("not-a-color"), Color::BLACK);
    }
}
