//! Color representation

use crate::error::{Error, Result};
use crate::schema::ColorValue;
use std::fmt;
use std::str::FromStr;

/// 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Create from a hex string (e.g., "#FF0000" or "ff0000")
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidColor(hex.to_string()));
        }

        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| Error::InvalidColor(hex.to_string()))
        };

        Ok(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Convert to hex string (without # prefix)
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Fractional components in `[0, 1]` as the remote API expects them
    pub fn to_color_value(&self) -> ColorValue {
        ColorValue {
            red: self.r as f64 / 255.0,
            green: self.g as f64 / 255.0,
            blue: self.b as f64 / 255.0,
            alpha: None,
        }
    }

    // Common colors
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
}

impl From<Color> for ColorValue {
    fn from(color: Color) -> Self {
        color.to_color_value()
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF0000").unwrap(), Color::RED);
        assert_eq!(Color::from_hex("00ff00").unwrap(), Color::GREEN);
        assert_eq!(Color::from_hex("#ff00ff").unwrap(), Color::MAGENTA);
    }

    #[test]
    fn test_from_hex_errors() {
        assert!(matches!(Color::from_hex("zzz"), Err(Error::InvalidColor(_))));
        assert!(Color::from_hex("").is_err());
        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#ff00ff00").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
        assert!(Color::from_hex("##ff00ff").is_err());
    }

    #[test]
    fn test_to_color_value() {
        let value = Color::from_hex("#ff00ff").unwrap().to_color_value();
        assert_eq!(value.red, 1.0);
        assert_eq!(value.green, 0.0);
        assert_eq!(value.blue, 1.0);

        let gray = Color::GRAY.to_color_value();
        assert!((gray.red - 128.0 / 255.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        assert_eq!(Color::rgb(18, 52, 86).to_string(), "#123456");
        assert_eq!("#123456".parse::<Color>().unwrap(), Color::rgb(18, 52, 86));
    }
}
