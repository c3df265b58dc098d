//! Cell values and the styled cell builder

use crate::color::Color;
use crate::error::{Error, Result};
use crate::schema::{CellData, CellFormat, ExtendedValue, TextFormat};
use std::fmt;

/// The value written into a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// String value
    Text(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
}

impl CellValue {
    /// Convert to the wire representation, filling exactly one slot
    pub fn to_extended_value(&self) -> ExtendedValue {
        match self {
            CellValue::Text(s) => ExtendedValue {
                string_value: Some(s.clone()),
                ..Default::default()
            },
            CellValue::Number(n) => ExtendedValue {
                number_value: Some(*n),
                ..Default::default()
            },
            CellValue::Bool(b) => ExtendedValue {
                bool_value: Some(*b),
                ..Default::default()
            },
        }
    }

    /// Reject values the remote API cannot represent
    pub fn validate(&self) -> Result<()> {
        match self {
            CellValue::Number(n) if !n.is_finite() => {
                Err(Error::InvalidCellValue(format!("non-finite number {}", n)))
            }
            _ => Ok(()),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Text(String::new())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

/// Builder for one styled cell of a range update.
///
/// Style setters merge into the existing format field by field, so a later
/// `bold` keeps an earlier background color and vice versa.
///
/// # Example
/// ```
/// use cloudsheets_core::CellBuilder;
///
/// let header = CellBuilder::new("name")
///     .bold(true)
///     .background_color("#ff00ff")?
///     .build();
///
/// let format = header.user_entered_format.unwrap();
/// assert!(format.background_color.is_some());
/// assert_eq!(format.text_format.unwrap().bold, Some(true));
/// # Ok::<(), cloudsheets_core::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellBuilder {
    value: CellValue,
    format: CellFormat,
}

impl CellBuilder {
    /// Create a builder holding `value` and no style
    pub fn new<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            format: CellFormat::default(),
        }
    }

    /// Replace the value, keeping the style
    pub fn value<V: Into<CellValue>>(mut self, value: V) -> Self {
        self.value = value.into();
        self
    }

    /// Set the background color
    pub fn background(mut self, color: Color) -> Self {
        self.format.background_color = Some(color.to_color_value());
        self
    }

    /// Set the background color from a `#rrggbb` or `rrggbb` code
    pub fn background_color(self, code: &str) -> Result<Self> {
        Ok(self.background(Color::from_hex(code)?))
    }

    /// Set the font color
    pub fn font(mut self, color: Color) -> Self {
        self.text_format().foreground_color = Some(color.to_color_value());
        self
    }

    /// Set the font color from a `#rrggbb` or `rrggbb` code
    pub fn font_color(self, code: &str) -> Result<Self> {
        Ok(self.font(Color::from_hex(code)?))
    }

    /// Set bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.text_format().bold = Some(bold);
        self
    }

    /// Set italic
    pub fn italic(mut self, italic: bool) -> Self {
        self.text_format().italic = Some(italic);
        self
    }

    /// The value the cell will hold
    pub fn cell_value(&self) -> &CellValue {
        &self.value
    }

    /// Produce the update payload. May be called any number of times.
    pub fn build(&self) -> CellData {
        let format = if self.format == CellFormat::default() {
            None
        } else {
            Some(self.format.clone())
        };

        CellData {
            user_entered_value: Some(self.value.to_extended_value()),
            user_entered_format: format,
            ..Default::default()
        }
    }

    fn text_format(&mut self) -> &mut TextFormat {
        self.format.text_format.get_or_insert_with(TextFormat::default)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CellBuilder {
                fn from(value: $ty) -> Self {
                    CellBuilder::new(value)
                }
            }
        )*
    };
}

impl_from_value!(CellValue, &str, String, f64, i32, i64, bool);
