//! Matching server-returned blocks back to requested ranges
//!
//! A grid read groups its response by sheet and by contiguous region rather
//! than by the caller's range strings, and echoes ranges in its own normalized
//! form. The reconciler maps every returned block to the requested range it
//! most likely answers, keyed by the caller's original string.

use crate::address::RangeAddress;
use crate::error::Result;
use crate::schema::{BatchGetValuesResponse, CellData, DimensionProperties, GridData, Spreadsheet};
use std::collections::HashMap;

/// Column width used when the server sends no pixel size
pub const DEFAULT_COLUMN_WIDTH: u32 = 100;

/// Row height used when the server sends no pixel size
pub const DEFAULT_ROW_HEIGHT: u32 = 20;

/// One cell of a grid read together with its layout
#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    /// Cell payload as returned by the server
    pub cell: CellData,
    /// Column width in pixels
    pub width: u32,
    /// Row height in pixels
    pub height: u32,
    /// False when the row or the column is hidden by a filter or by the user
    pub visible: bool,
}

/// Rows of snapshots keyed by requested range (or sheet name in bulk mode)
pub type CellGrid = Vec<Vec<CellSnapshot>>;

/// Matches response blocks to a fixed set of requested ranges.
#[derive(Debug, Clone, Default)]
pub struct BatchReconciler {
    requested: Vec<(String, RangeAddress)>,
}

impl BatchReconciler {
    /// Parse the requested ranges once.
    ///
    /// Blank strings are dropped; with no ranges left the reconciler works in
    /// bulk mode and keys results by sheet name.
    pub fn new<I, S>(ranges: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested = ranges
            .into_iter()
            .filter(|r| !r.as_ref().trim().is_empty())
            .map(|r| Ok((r.as_ref().to_string(), RangeAddress::parse(r.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { requested })
    }

    /// Whether no ranges were requested
    pub fn is_bulk(&self) -> bool {
        self.requested.is_empty()
    }

    /// Original range strings, in request order
    pub fn requested_ranges(&self) -> impl Iterator<Item = &str> {
        self.requested.iter().map(|(raw, _)| raw.as_str())
    }

    /// Key for a block whose bounding box is `bounds`.
    ///
    /// Candidates on the block's own sheet are preferred; if none name that
    /// sheet, every requested range competes. Among candidates the smallest
    /// [`RangeAddress::distance`] wins and ties go to the earlier request.
    pub fn match_range(&self, bounds: &RangeAddress) -> String {
        self.nearest(bounds, false)
            .unwrap_or_else(|| bounds.sheet_name().to_string())
    }

    fn nearest(&self, bounds: &RangeAddress, same_sheet_only: bool) -> Option<String> {
        let on_sheet = self
            .requested
            .iter()
            .filter(|(_, address)| address.sheet_name() == bounds.sheet_name())
            .min_by_key(|(_, address)| address.distance(bounds));

        let candidate = match on_sheet {
            Some(found) => Some(found),
            None if same_sheet_only => None,
            None => self
                .requested
                .iter()
                .min_by_key(|(_, address)| address.distance(bounds)),
        };

        candidate.map(|(raw, _)| raw.clone())
    }

    /// Key and cell snapshots for every block of a grid read.
    ///
    /// When two blocks resolve to the same key the later one replaces the
    /// earlier.
    pub fn reconcile(&self, spreadsheet: &Spreadsheet) -> HashMap<String, CellGrid> {
        let mut result = HashMap::new();

        for sheet in &spreadsheet.sheets {
            let sheet_name = sheet
                .properties
                .as_ref()
                .and_then(|p| p.title.as_deref())
                .unwrap_or_default();

            for grid in &sheet.data {
                let key = self.match_range(&block_bounds(sheet_name, grid));
                result.insert(key, snapshots(grid));
            }
        }

        result
    }

    /// Formatted values of a batch value read keyed by requested range.
    ///
    /// A block is matched by its echoed range string, then by parsed address
    /// equality, then by the nearest requested range on the same sheet.
    /// Blocks that match nothing are dropped.
    pub fn reconcile_values(
        &self,
        response: BatchGetValuesResponse,
    ) -> HashMap<String, Vec<Vec<String>>> {
        let mut result = HashMap::new();

        for value_range in response.value_ranges {
            let echoed = value_range.range.unwrap_or_default();
            if let Some(key) = self.match_echoed(&echoed) {
                result.insert(key, value_range.values);
            }
        }

        result
    }

    fn match_echoed(&self, echoed: &str) -> Option<String> {
        if let Some((raw, _)) = self.requested.iter().find(|(raw, _)| raw == echoed) {
            return Some(raw.clone());
        }

        let address = RangeAddress::parse(echoed).ok()?;
        if self.is_bulk() {
            return Some(address.sheet_name().to_string());
        }

        if let Some((raw, _)) = self.requested.iter().find(|(_, a)| *a == address) {
            return Some(raw.clone());
        }

        self.nearest(&address, true)
    }
}

/// Bounding box of a block: its origin plus the row count and the longest row.
pub fn block_bounds(sheet_name: &str, grid: &GridData) -> RangeAddress {
    let width = grid
        .row_data
        .iter()
        .map(|row| row.values.len())
        .max()
        .unwrap_or(0);

    RangeAddress::from_grid(
        sheet_name,
        grid.start_column.unwrap_or(0),
        grid.start_row.unwrap_or(0),
        width as u32,
        grid.row_data.len() as u32,
    )
}

/// Cell snapshots of one block, row by row.
///
/// Row and column indices are positional within the block; each row keeps
/// the number of cells the server sent for it.
pub fn snapshots(grid: &GridData) -> CellGrid {
    let default_meta = DimensionProperties::default();

    grid.row_data
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let row_meta = grid.row_metadata.get(row_index).unwrap_or(&default_meta);

            row.values
                .iter()
                .enumerate()
                .map(|(col_index, cell)| {
                    let col_meta = grid
                        .column_metadata
                        .get(col_index)
                        .unwrap_or(&default_meta);

                    CellSnapshot {
                        cell: cell.clone(),
                        width: pixel_size(col_meta).unwrap_or(DEFAULT_COLUMN_WIDTH),
                        height: pixel_size(row_meta).unwrap_or(DEFAULT_ROW_HEIGHT),
                        visible: !(row_meta.is_hidden() || col_meta.is_hidden()),
                    }
                })
                .collect()
        })
        .collect()
}

fn pixel_size(meta: &DimensionProperties) -> Option<u32> {
    meta.pixel_size.filter(|size| *size > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RowData, Sheet, SheetProperties, ValueRange};
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> CellData {
        CellData {
            formatted_value: Some(s.to_string()),
            ..Default::default()
        }
    }

    fn block(start_column: u32, start_row: u32, rows: &[&[&str]]) -> GridData {
        GridData {
            start_column: Some(start_column),
            start_row: Some(start_row),
            row_data: rows
                .iter()
                .map(|row| RowData {
                    values: row.iter().map(|s| text(s)).collect(),
                })
                .collect(),
            ..Default::default()
        }
    }

    fn sheet(title: &str, data: Vec<GridData>) -> Sheet {
        Sheet {
            properties: Some(SheetProperties {
                title: Some(title.to_string()),
                ..Default::default()
            }),
            data,
        }
    }

    fn spreadsheet(sheets: Vec<Sheet>) -> Spreadsheet {
        Spreadsheet {
            sheets,
            ..Default::default()
        }
    }

    #[test]
    fn test_blocks_keyed_by_requested_strings() {
        let reconciler = BatchReconciler::new(["Sheet1!A1:B2", "Sheet1!D1:E2"]).unwrap();
        let response = spreadsheet(vec![sheet(
            "Sheet1",
            vec![
                block(0, 0, &[&["a", "b"], &["c", "d"]]),
                block(3, 0, &[&["w", "x"], &["y", "z"]]),
            ],
        )]);

        let result = reconciler.reconcile(&response);

        assert_eq!(result.len(), 2);
        assert_eq!(
            result["Sheet1!A1:B2"][1][0].cell.formatted_value.as_deref(),
            Some("c")
        );
        assert_eq!(
            result["Sheet1!D1:E2"][0][1].cell.formatted_value.as_deref(),
            Some("x")
        );
    }

    #[test]
    fn test_bulk_mode_keys_by_sheet_name() {
        let reconciler = BatchReconciler::new(Vec::<String>::new()).unwrap();
        assert!(reconciler.is_bulk());

        let response = spreadsheet(vec![sheet("Data", vec![block(0, 0, &[&["1"]])])]);
        let result = reconciler.reconcile(&response);

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["Data"]);
    }

    #[test]
    fn test_blank_range_means_bulk_mode() {
        let reconciler = BatchReconciler::new([""]).unwrap();
        assert!(reconciler.is_bulk());
    }

    #[test]
    fn test_sheet_name_request_matches_whole_sheet_block() {
        let reconciler = BatchReconciler::new(["Data"]).unwrap();
        let response = spreadsheet(vec![sheet(
            "Data",
            vec![block(0, 0, &[&["1", "2", "3"], &["4"]])],
        )]);

        let result = reconciler.reconcile(&response);
        assert_eq!(result["Data"].len(), 2);
    }

    #[test]
    fn test_quoted_request_matches_unquoted_title() {
        let reconciler = BatchReconciler::new(["Other!A1", "'My Sheet'!B2:C3"]).unwrap();
        let response = spreadsheet(vec![sheet(
            "My Sheet",
            vec![block(1, 1, &[&["x", "y"], &["z"]])],
        )]);

        let result = reconciler.reconcile(&response);
        assert!(result.contains_key("'My Sheet'!B2:C3"));
    }

    #[test]
    fn test_same_sheet_candidates_preferred() {
        let reconciler = BatchReconciler::new(["Sheet1!A1:B2", "Sheet2!C5:D9"]).unwrap();
        let bounds = RangeAddress::parse("Sheet2!A1:B2").unwrap();

        assert_eq!(reconciler.match_range(&bounds), "Sheet2!C5:D9");
    }

    #[test]
    fn test_falls_back_to_other_sheets() {
        let reconciler = BatchReconciler::new(["Sheet1!A1:B2"]).unwrap();
        let bounds = RangeAddress::parse("Renamed!A1:B2").unwrap();

        assert_eq!(reconciler.match_range(&bounds), "Sheet1!A1:B2");
    }

    #[test]
    fn test_ties_go_to_earlier_request() {
        let reconciler = BatchReconciler::new(["Sheet1!B1:B2", "Sheet1!A2:A3"]).unwrap();
        let bounds = RangeAddress::parse("Sheet1!A1:A2").unwrap();

        assert_eq!(reconciler.match_range(&bounds), "Sheet1!B1:B2");
    }

    #[test]
    fn test_later_block_overwrites_same_key() {
        let reconciler = BatchReconciler::new(["Sheet1!A1:B2"]).unwrap();
        let response = spreadsheet(vec![sheet(
            "Sheet1",
            vec![block(0, 0, &[&["first"]]), block(5, 5, &[&["second"]])],
        )]);

        let result = reconciler.reconcile(&response);

        assert_eq!(result.len(), 1);
        assert_eq!(
            result["Sheet1!A1:B2"][0][0].cell.formatted_value.as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_block_bounds_uses_longest_row() {
        let grid = block(2, 4, &[&["a"], &["b", "c", "d"], &[]]);
        let bounds = block_bounds("S", &grid);

        assert_eq!(bounds, RangeAddress::new("S", 2, 4, Some(4), Some(6)));
    }

    #[test]
    fn test_block_bounds_at_grid_limit() {
        let grid = block(u32::MAX, 0, &[&["a", "b"]]);
        let bounds = block_bounds("S", &grid);

        assert_eq!(bounds.start_column(), u32::MAX);
        assert_eq!(bounds.end_column(), Some(u32::MAX));
    }

    #[test]
    fn test_block_bounds_of_empty_block() {
        let bounds = block_bounds("S", &GridData::default());
        assert!(bounds.is_open());
    }

    #[test]
    fn test_snapshot_defaults() {
        let grid = block(0, 0, &[&["a", "b"]]);
        let cells = snapshots(&grid);

        assert_eq!(cells[0][1].width, DEFAULT_COLUMN_WIDTH);
        assert_eq!(cells[0][1].height, DEFAULT_ROW_HEIGHT);
        assert!(cells[0][1].visible);
    }

    #[test]
    fn test_snapshot_metadata() {
        let mut grid = block(0, 0, &[&["a", "b"], &["c", "d"]]);
        grid.column_metadata = vec![
            DimensionProperties {
                pixel_size: Some(150),
                ..Default::default()
            },
            DimensionProperties {
                hidden_by_filter: Some(true),
                ..Default::default()
            },
        ];
        grid.row_metadata = vec![
            DimensionProperties {
                pixel_size: Some(0),
                ..Default::default()
            },
            DimensionProperties {
                pixel_size: Some(32),
                hidden_by_user: Some(true),
                ..Default::default()
            },
        ];

        let cells = snapshots(&grid);

        assert_eq!(cells[0][0].width, 150);
        assert_eq!(cells[0][0].height, DEFAULT_ROW_HEIGHT);
        assert!(cells[0][0].visible);
        assert!(!cells[0][1].visible);
        assert_eq!(cells[1][0].height, 32);
        assert!(!cells[1][0].visible);
    }

    #[test]
    fn test_ragged_rows_keep_their_length() {
        let grid = block(0, 0, &[&["a", "b", "c"], &["d"]]);
        let cells = snapshots(&grid);

        assert_eq!(cells[0].len(), 3);
        assert_eq!(cells[1].len(), 1);
    }

    #[test]
    fn test_invalid_request_is_rejected() {
        assert!(BatchReconciler::new(["Sheet1!A0"]).is_err());
    }

    fn values(range: &str, rows: &[&[&str]]) -> ValueRange {
        ValueRange {
            range: Some(range.to_string()),
            values: rows
                .iter()
                .map(|row| row.iter().map(|s| s.to_string()).collect())
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reconcile_values() {
        let reconciler =
            BatchReconciler::new(["Sheet1!A1:B2", "People", "'My Sheet'!C1:C2"]).unwrap();
        let response = BatchGetValuesResponse {
            value_ranges: vec![
                values("Sheet1!A1:B2", &[&["a", "b"]]),
                values("People!A1:Z1000", &[&["name"]]),
                values("'My Sheet'!C1:C2", &[&["x"], &["y"]]),
                values("Unrequested!A1:A1", &[&["?"]]),
            ],
            ..Default::default()
        };

        let result = reconciler.reconcile_values(response);

        assert_eq!(result.len(), 3);
        assert_eq!(result["Sheet1!A1:B2"], vec![vec!["a", "b"]]);
        assert_eq!(result["People"], vec![vec!["name"]]);
        assert_eq!(result["'My Sheet'!C1:C2"].len(), 2);
    }

    #[test]
    fn test_reconcile_values_matches_normalized_echo() {
        let reconciler = BatchReconciler::new(["sheet1!a1:b2"]).unwrap();
        let response = BatchGetValuesResponse {
            value_ranges: vec![values("sheet1!A1:B2", &[&["v"]])],
            ..Default::default()
        };

        let result = reconciler.reconcile_values(response);
        assert_eq!(result["sheet1!a1:b2"], vec![vec!["v"]]);
    }

    #[test]
    fn test_reconcile_values_bulk_mode() {
        let reconciler = BatchReconciler::new([""]).unwrap();
        let response = BatchGetValuesResponse {
            value_ranges: vec![values("Data!A1:B3", &[&["1", "2"]])],
            ..Default::default()
        };

        let result = reconciler.reconcile_values(response);
        assert_eq!(result["Data"], vec![vec!["1", "2"]]);
    }
}
