//! RGBA colors and their textual forms.

use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::error::{Error, Result};

/// A straight (non-premultiplied) 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel, 255 is fully opaque.
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    /// An opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// A color with explicit alpha.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether the color fully covers whatever lies beneath it.
    #[must_use]
    pub const fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Linear interpolation between two colors, channel by channel.
    ///
    /// `t` is clamped to `[0, 1]`; results are rounded to nearest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            let v = f32::from(a) + (f32::from(b) - f32::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBackground`] for anything else.
    pub fn from_hex(input: &str) -> Result<Self> {
        let digits = input
            .strip_prefix('#')
            .ok_or_else(|| Error::invalid_background(input, "hex color must start with '#'"))?;
        if !digits.is_ascii() {
            return Err(Error::invalid_background(input, "non-ASCII hex color"));
        }

        let nibble = |i: usize| -> Result<u8> {
            u8::from_str_radix(&digits[i..=i], 16)
                .map_err(|_| Error::invalid_background(input, "bad hex digit"))
        };
        let byte = |i: usize| -> Result<u8> {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| Error::invalid_background(input, "bad hex digit"))
        };

        match digits.len() {
            3 | 4 => {
                let mut ch = [255u8; 4];
                for (i, slot) in ch.iter_mut().enumerate().take(digits.len()) {
                    *slot = nibble(i)? * 17;
                }
                Ok(Self::rgba(ch[0], ch[1], ch[2], ch[3]))
            }
            6 | 8 => {
                let mut ch = [255u8; 4];
                for (i, slot) in ch.iter_mut().enumerate().take(digits.len() / 2) {
                    *slot = byte(i * 2)?;
                }
                Ok(Self::rgba(ch[0], ch[1], ch[2], ch[3]))
            }
            n => Err(Error::invalid_background(
                input,
                format!("hex color has {n} digits, expected 3, 4, 6 or 8"),
            )),
        }
    }

    /// Look up a CSS color keyword.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "transparent" => Self::TRANSPARENT,
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::rgb(255, 0, 0),
            "lime" | "green" => Self::rgb(0, 255, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "cyan" | "aqua" => Self::rgb(0, 255, 255),
            "magenta" | "fuchsia" => Self::rgb(255, 0, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "orange" => Self::rgb(255, 165, 0),
            "purple" => Self::rgb(128, 0, 128),
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('#') {
            Self::from_hex(s)
        } else {
            Self::named(s).ok_or_else(|| Error::invalid_background(s, "unknown color"))
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Rgba([c.r, c.g, c.b, c.a])
    }
}

impl From<Rgba<u8>> for Color {
    fn from(px: Rgba<u8>) -> Self {
        Self::rgba(px[0], px[1], px[2], px[3])
    }
}
