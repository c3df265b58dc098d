//! A1-style range addresses
//!
//! A range string has the shape `[SheetName][!StartCell[:EndCell]]`. Sheet
//! names that contain anything other than ASCII letters, digits and `_` are
//! wrapped in single quotes, with embedded quotes doubled (`'Bob''s data'`).
//! Cells are column letters followed by a 1-based row number; either half may
//! be missing on the end cell (`A2:C` is columns A through C from row 2 down).

use crate::column::{column_to_letters, letters_to_column};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A parsed range address with zero-based grid coordinates.
///
/// An address without end bounds is open: it extends to the edge of the sheet
/// and only its start corner takes part in [`RangeAddress::distance`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RangeAddress {
    sheet_name: String,
    start_column: u32,
    start_row: u32,
    end_column: Option<u32>,
    end_row: Option<u32>,
}

impl RangeAddress {
    /// Create an address from zero-based coordinates.
    ///
    /// End bounds are inclusive. An address with neither end bound only has
    /// an A1 form when it starts at the origin (the whole sheet); elsewhere it
    /// serializes as its start cell.
    pub fn new<S: Into<String>>(
        sheet_name: S,
        start_column: u32,
        start_row: u32,
        end_column: Option<u32>,
        end_row: Option<u32>,
    ) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            start_column,
            start_row,
            end_column,
            end_row,
        }
    }

    /// Address covering a whole sheet
    pub fn whole_sheet<S: Into<String>>(sheet_name: S) -> Self {
        Self::new(sheet_name, 0, 0, None, None)
    }

    /// Bounding box of a block of `row_count` rows, the widest of which holds
    /// `column_count` cells, anchored at the given origin.
    ///
    /// An empty block at the sheet origin covers the whole sheet; elsewhere it
    /// is the one cell at its origin. End bounds saturate at the grid limit.
    pub fn from_grid<S: Into<String>>(
        sheet_name: S,
        start_column: u32,
        start_row: u32,
        column_count: u32,
        row_count: u32,
    ) -> Self {
        if column_count == 0 || row_count == 0 {
            if start_column == 0 && start_row == 0 {
                return Self::whole_sheet(sheet_name);
            }
            return Self::new(
                sheet_name,
                start_column,
                start_row,
                Some(start_column),
                Some(start_row),
            );
        }

        Self::new(
            sheet_name,
            start_column,
            start_row,
            Some(start_column.saturating_add(column_count - 1)),
            Some(start_row.saturating_add(row_count - 1)),
        )
    }

    /// Parse a range string.
    ///
    /// # Examples
    /// ```
    /// use cloudsheets_core::RangeAddress;
    ///
    /// let range = RangeAddress::parse("Sheet1!A2:C10").unwrap();
    /// assert_eq!(range.sheet_name(), "Sheet1");
    /// assert_eq!((range.start_column(), range.start_row()), (0, 1));
    /// assert_eq!((range.end_column(), range.end_row()), (Some(2), Some(9)));
    ///
    /// let sheet = RangeAddress::parse("Data").unwrap();
    /// assert!(sheet.is_open());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (sheet_name, cells) = split_sheet_name(s)?;

        let cells = match cells {
            Some(cells) => cells,
            None => return Ok(Self::whole_sheet(sheet_name)),
        };

        if cells.is_empty() {
            return Err(Error::InvalidRange(format!("no cells after '!' in '{}'", s)));
        }

        let (start, end) = match cells.split_once(':') {
            Some((start, end)) => (CellRef::parse(start, s)?, CellRef::parse(end, s)?),
            None => {
                // A single cell is a one-by-one range
                let cell = CellRef::parse(cells, s)?;
                (cell, cell)
            }
        };

        Ok(Self {
            sheet_name,
            start_column: start.column.unwrap_or(0),
            start_row: start.row.unwrap_or(0),
            end_column: end.column,
            end_row: end.row,
        })
    }

    /// Sheet name, unquoted. Empty for the default sheet.
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Zero-based first column
    pub fn start_column(&self) -> u32 {
        self.start_column
    }

    /// Zero-based first row
    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    /// Zero-based last column (inclusive), if bounded
    pub fn end_column(&self) -> Option<u32> {
        self.end_column
    }

    /// Zero-based last row (inclusive), if bounded
    pub fn end_row(&self) -> Option<u32> {
        self.end_row
    }

    /// Whether the address has no end bound at all
    pub fn is_open(&self) -> bool {
        self.end_column.is_none() && self.end_row.is_none()
    }

    /// Similarity between two addresses; lower is closer, zero for identical
    /// rectangles.
    ///
    /// Manhattan distance between the start corners, plus the difference of
    /// each end bound that both addresses carry. Sheet names are ignored.
    pub fn distance(&self, other: &RangeAddress) -> u64 {
        let mut distance = self.start_column.abs_diff(other.start_column) as u64
            + self.start_row.abs_diff(other.start_row) as u64;

        if let (Some(a), Some(b)) = (self.end_column, other.end_column) {
            distance += a.abs_diff(b) as u64;
        }
        if let (Some(a), Some(b)) = (self.end_row, other.end_row) {
            distance += a.abs_diff(b) as u64;
        }

        distance
    }

    /// Check if two addresses on the same sheet share at least one cell.
    pub fn overlaps(&self, other: &RangeAddress) -> bool {
        if self.sheet_name != other.sheet_name {
            return false;
        }

        fn spans(start: u32, end: Option<u32>, other_start: u32, other_end: Option<u32>) -> bool {
            end.map_or(true, |end| end >= other_start)
                && other_end.map_or(true, |other_end| other_end >= start)
        }

        spans(
            self.start_column,
            self.end_column,
            other.start_column,
            other.end_column,
        ) && spans(self.start_row, self.end_row, other.start_row, other.end_row)
    }

    /// Format as an A1 range string.
    ///
    /// The output is the normalized form of any string this address was
    /// parsed from: uppercase column letters, a full start cell, and quotes
    /// around sheet names only where needed.
    pub fn to_a1_string(&self) -> String {
        let mut result = quote_sheet_name(&self.sheet_name);

        if self.is_open() && self.start_column == 0 && self.start_row == 0 {
            return result;
        }

        if !self.sheet_name.is_empty() {
            result.push('!');
        }

        result.push_str(&column_to_letters(self.start_column));
        result.push_str(&(self.start_row as u64 + 1).to_string());

        let is_single_cell = self.end_column == Some(self.start_column)
            && self.end_row == Some(self.start_row);

        // Without a sheet name a lone cell would read back as a sheet name
        if is_single_cell && !self.sheet_name.is_empty() {
            return result;
        }

        if !self.is_open() {
            result.push(':');
            if let Some(col) = self.end_column {
                result.push_str(&column_to_letters(col));
            }
            if let Some(row) = self.end_row {
                result.push_str(&(row as u64 + 1).to_string());
            }
        }

        result
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for RangeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One side of a cell range; either half may be absent.
#[derive(Debug, Clone, Copy)]
struct CellRef {
    column: Option<u32>,
    row: Option<u32>,
}

impl CellRef {
    fn parse(s: &str, full: &str) -> Result<Self> {
        // Absolute markers carry no meaning for remote ranges
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        if cleaned.is_empty() {
            return Err(Error::InvalidRange(format!("empty cell in '{}'", full)));
        }

        let split = cleaned
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::InvalidRange(format!(
                "invalid cell '{}' in '{}'",
                s, full
            )));
        }

        let column = if letters.is_empty() {
            None
        } else {
            Some(letters_to_column(letters)?)
        };

        let row = if digits.is_empty() {
            None
        } else {
            let row: u64 = digits
                .parse()
                .map_err(|_| Error::InvalidRange(format!("invalid row number in '{}'", full)))?;
            if row == 0 {
                return Err(Error::InvalidRange(format!(
                    "row number must be >= 1 in '{}'",
                    full
                )));
            }
            if row > u32::MAX as u64 {
                return Err(Error::RowOutOfBounds(row, u32::MAX));
            }
            Some((row - 1) as u32)
        };

        Ok(Self { column, row })
    }

    fn is_cell_like(s: &str) -> bool {
        let s = s.trim();
        !s.is_empty()
            && s.chars().all(|c| c == '$' || c.is_ascii_alphanumeric())
            && s.trim_start_matches('$')
                .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .trim_start_matches('$')
                .chars()
                .all(|c| c.is_ascii_digit())
    }
}

/// Split a range string into its unquoted sheet name and optional cell part.
fn split_sheet_name(s: &str) -> Result<(String, Option<&str>)> {
    if let Some(quoted) = s.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = quoted.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c != '\'' {
                name.push(c);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
                continue;
            }

            let rest = &quoted[i + 1..];
            return match rest.strip_prefix('!') {
                Some(cells) => Ok((name, Some(cells))),
                None if rest.is_empty() => Ok((name, None)),
                None => Err(Error::InvalidRange(format!(
                    "unexpected '{}' after sheet name in '{}'",
                    rest, s
                ))),
            };
        }

        return Err(Error::InvalidRange(format!("unterminated sheet name in '{}'", s)));
    }

    if let Some((name, cells)) = s.split_once('!') {
        return Ok((name.to_string(), Some(cells)));
    }

    // `A1:B2` on its own addresses the default sheet
    if let Some((start, end)) = s.split_once(':') {
        if CellRef::is_cell_like(start) && CellRef::is_cell_like(end) {
            return Ok((String::new(), Some(s)));
        }
    }

    Ok((s.to_string(), None))
}

/// A sheet name that reads back as a sheet, whatever it looks like.
///
/// Titles such as `A1` or `AB12` would otherwise be taken for a cell on the
/// default sheet by the remote side.
pub fn quoted_sheet_name(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

fn quote_sheet_name(name: &str) -> String {
    let plain = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        quoted_sheet_name(name)
    }
}
