//! Reelworks Core Type Definitions
//!
//! Defines fundamental types used throughout the project.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Job unique identifier (ULID)
pub type JobId = String;

/// Render session unique identifier (ULID)
pub type SessionId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// Time in frames (integer)
pub type Frame = i64;

/// Ratio (for fps, aspect ratio, etc.)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ratio {
    /// Numerator
    pub num: i32,
    /// Denominator
    pub den: i32,
}

impl Ratio {
    /// Creates a new ratio with validation
    pub fn new(num: i32, den: i32) -> Self {
        if den == 0 {
            warn!("Ratio created with zero denominator, defaulting to 1");
            return Self { num, den: 1 };
        }
        Self { num, den }
    }

    /// Converts to floating point value
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self { num: 30, den: 1 } // Default 30fps
    }
}

impl std::str::FromStr for Ratio {
    type Err = String;

    /// Parses the `num/den` form MLT profiles carry frame rates in
    /// (`30000/1001`), or a bare integer as `num/1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (
                n.trim()
                    .parse()
                    .map_err(|_| format!("Invalid ratio numerator: {n}"))?,
                d.trim()
                    .parse()
                    .map_err(|_| format!("Invalid ratio denominator: {d}"))?,
            ),
            None => (
                s.trim()
                    .parse()
                    .map_err(|_| format!("Invalid ratio: {s}"))?,
                1,
            ),
        };
        if den == 0 {
            return Err("Ratio denominator is zero".to_string());
        }
        Ok(Self { num, den })
    }
}

// =============================================================================
// Color
// =============================================================================

/// Color (RGBA)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red (0.0 ~ 1.0)
    pub r: f32,
    /// Green (0.0 ~ 1.0)
    pub g: f32,
    /// Blue (0.0 ~ 1.0)
    pub b: f32,
    /// Alpha (0.0 ~ 1.0, optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub a: Option<f32>,
}

impl Color {
    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: None,
        }
    }

    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: Some(a.clamp(0.0, 1.0)),
        }
    }

    pub fn white() -> Self {
        Self::rgb(1.0, 1.0, 1.0)
    }

    pub fn black() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }

    /// Parses a hex color string (e.g. `#RRGGBB`, `#RRGGBBAA`, `#RGB`).
    pub fn try_from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim().trim_start_matches('#');
        let len = hex.len();

        if len != 3 && len != 4 && len != 6 && len != 8 {
            return Err(format!("Invalid hex color length: {}", len));
        }

        let parse_channel = |s: &str| -> Result<f32, String> {
            u8::from_str_radix(s, 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|e| e.to_string())
        };

        // Short hex expands each nibble (0xF -> 0xFF).
        if len == 3 || len == 4 {
            let expand = |s: &str| -> Result<f32, String> {
                u8::from_str_radix(s, 16)
                    .map(|v| (v * 17) as f32 / 255.0)
                    .map_err(|e| e.to_string())
            };

            let r = expand(&hex[0..1])?;
            let g = expand(&hex[1..2])?;
            let b = expand(&hex[2..3])?;

            if len == 4 {
                let a = expand(&hex[3..4])?;
                return Ok(Self::rgba(r, g, b, a));
            }
            return Ok(Self::rgb(r, g, b));
        }

        let r = parse_channel(&hex[0..2])?;
        let g = parse_channel(&hex[2..4])?;
        let b = parse_channel(&hex[4..6])?;

        if len == 8 {
            let a = parse_channel(&hex[6..8])?;
            Ok(Self::rgba(r, g, b, a))
        } else {
            Ok(Self::rgb(r, g, b))
        }
    }

    /// Parses a hex color string, falling back to black on invalid input.
    pub fn from_hex(hex: &str) -> Self {
        match Self::try_from_hex(hex) {
            Ok(c) => c,
            Err(e) => {
                warn!(
                    "Failed to parse hex color '{}': {}, defaulting to black",
                    hex, e
                );
                Self::black()
            }
        }
    }

    /// Formats as `#rrggbb`, ignoring alpha.
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8
        )
    }

    /// Packs into a 32-bit RGBA integer with alpha 00.
    pub fn to_rgba_u32(&self) -> u32 {
        let r = (self.r * 255.0).round() as u32;
        let g = (self.g * 255.0).round() as u32;
        let b = (self.b * 255.0).round() as u32;
        (r << 24) + (g << 16) + (b << 8)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator() {
        let r = Ratio::new(30, 0);
        assert_eq!(r.den, 1);
        assert_eq!(Ratio { num: 1, den: 0 }.as_f64(), 0.0);
    }

    #[test]
    fn test_ratio_as_f64() {
        let ntsc = Ratio::new(30000, 1001);
        assert!((ntsc.as_f64() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_ratio_from_str() {
        assert_eq!("30000/1001".parse::<Ratio>().unwrap(), Ratio::new(30000, 1001));
        assert_eq!("25".parse::<Ratio>().unwrap(), Ratio::new(25, 1));
        assert!("30/0".parse::<Ratio>().is_err());
        assert!("abc".parse::<Ratio>().is_err());
    }

    #[test]
    fn test_color_hex_round_trip() {
        let c = Color::try_from_hex("#3b82f6").unwrap();
        assert_eq!(c.to_hex(), "#3b82f6");
    }

    #[test]
    fn test_color_short_hex_expands() {
        let c = Color::try_from_hex("#f00").unwrap();
        assert_eq!(c.to_hex(), "#ff0000");
    }

    #[test]
    fn test_color_invalid_hex_falls_back_to_black() {
        assert_eq!(Color::from_hex("not-a-color"), Color::black());
    }

    #[test]
    fn test_color_packs_rgba_with_zero_alpha() {
        let c = Color::try_from_hex("#102030").unwrap();
        assert_eq!(c.to_rgba_u32(), 0x10203000);
    }
}
