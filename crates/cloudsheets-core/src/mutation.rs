//! Batch mutation construction
//!
//! Logical updates name their sheet either by id or through the sheet part of
//! their range. Names are resolved by the caller (see
//! [`MutationRequestBuilder::sheet_names`]) before [`MutationRequestBuilder::build`]
//! assembles the low-level operations of one batch call.

use crate::address::RangeAddress;
use crate::cell::CellBuilder;
use crate::error::{Error, Result};
use crate::schema::{
    BatchUpdateSpreadsheetRequest, GridRange, Request, RowData, SheetProperties,
    SpreadsheetProperties, UpdateCellsRequest, UpdateSheetPropertiesRequest,
    UpdateSpreadsheetPropertiesRequest,
};
use std::collections::{BTreeSet, HashMap};

/// Field mask of a cell update; every field of every cell is written
const ALL_FIELDS: &str = "*";

/// One logical update against one sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateRequest {
    /// Explicit sheet id; takes precedence over the sheet named in `range`
    pub sheet_id: Option<i64>,
    /// Sheet name or A1 range. The start cell anchors `rows`.
    pub range: String,
    /// Cells to write, row by row
    pub rows: Option<Vec<Vec<CellBuilder>>>,
    /// Sheet properties to change; unset fields are left untouched
    pub properties: Option<SheetProperties>,
}

impl UpdateRequest {
    /// Write `rows` starting at the first cell of `range`
    pub fn cells<S, R, C>(range: S, rows: R) -> Self
    where
        S: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellBuilder>,
    {
        Self {
            range: range.into(),
            rows: Some(
                rows.into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Change properties of the sheet called `sheet_name`
    pub fn properties<S: Into<String>>(sheet_name: S, properties: SheetProperties) -> Self {
        Self {
            range: sheet_name.into(),
            properties: Some(properties),
            ..Default::default()
        }
    }

    /// Address the sheet by id instead of by name
    pub fn with_sheet_id(mut self, sheet_id: i64) -> Self {
        self.sheet_id = Some(sheet_id);
        self
    }
}

#[derive(Debug, Clone)]
struct PlannedUpdate {
    request: UpdateRequest,
    address: RangeAddress,
}

/// Builds the ordered operations of one batch update.
///
/// Operations follow the order in which updates were added, a property
/// change before the cell change of the same update. A spreadsheet title
/// change is always last.
#[derive(Debug, Clone, Default)]
pub struct MutationRequestBuilder {
    updates: Vec<PlannedUpdate>,
    title: Option<String>,
}

impl MutationRequestBuilder {
    /// An empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and queue an update.
    ///
    /// The range is parsed and every cell value checked here, so malformed
    /// input is rejected before any sheet lookup happens.
    pub fn update(&mut self, request: UpdateRequest) -> Result<&mut Self> {
        let address = RangeAddress::parse(&request.range)?;

        for cell in request.rows.iter().flatten().flatten() {
            cell.cell_value().validate()?;
        }
        if let Some(rows) = &request.rows {
            cell_window(&address, rows)?;
        }

        self.updates.push(PlannedUpdate { request, address });
        Ok(self)
    }

    /// Rename the spreadsheet as part of the batch
    pub fn title<S: Into<String>>(&mut self, title: S) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    /// Whether the batch would contain no operations
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.title.is_none()
    }

    /// Sheet names that must be resolved to ids before [`build`](Self::build)
    pub fn sheet_names(&self) -> BTreeSet<&str> {
        self.updates
            .iter()
            .filter(|u| u.request.sheet_id.is_none())
            .map(|u| u.address.sheet_name())
            .collect()
    }

    /// Assemble the batch with the resolved `sheet name → id` map.
    pub fn build(&self, sheet_ids: &HashMap<String, i64>) -> Result<BatchUpdateSpreadsheetRequest> {
        let mut requests = Vec::new();

        for update in &self.updates {
            let sheet_id = match update.request.sheet_id {
                Some(id) => id,
                None => {
                    let name = update.address.sheet_name();
                    *sheet_ids
                        .get(name)
                        .ok_or_else(|| Error::UnresolvedSheet(name.to_string()))?
                }
            };

            if let Some(properties) = &update.request.properties {
                if let Some(request) = property_update(sheet_id, properties)? {
                    requests.push(request);
                }
            }

            if let Some(rows) = &update.request.rows {
                requests.push(cell_update(sheet_id, &update.address, rows)?);
            }
        }

        if let Some(title) = &self.title {
            requests.push(Request::UpdateSpreadsheetProperties(
                UpdateSpreadsheetPropertiesRequest {
                    properties: SpreadsheetProperties {
                        title: Some(title.clone()),
                        ..Default::default()
                    },
                    fields: "title".to_string(),
                },
            ));
        }

        Ok(BatchUpdateSpreadsheetRequest { requests })
    }
}

/// Comma separated wire names of the properties that are set, sorted.
///
/// The sheet id only addresses the sheet and is never part of the mask.
pub fn field_mask(properties: &SheetProperties) -> Result<String> {
    let value = serde_json::to_value(properties)?;

    let mut fields: Vec<&str> = value
        .as_object()
        .map(|object| {
            object
                .keys()
                .map(String::as_str)
                .filter(|key| *key != "sheetId")
                .collect()
        })
        .unwrap_or_default();
    fields.sort_unstable();

    Ok(fields.join(","))
}

fn property_update(sheet_id: i64, properties: &SheetProperties) -> Result<Option<Request>> {
    let fields = field_mask(properties)?;
    if fields.is_empty() {
        return Ok(None);
    }

    Ok(Some(Request::UpdateSheetProperties(
        UpdateSheetPropertiesRequest {
            properties: SheetProperties {
                sheet_id: Some(sheet_id),
                ..properties.clone()
            },
            fields,
        },
    )))
}

/// End-exclusive `(end_row, end_column)` of the window `rows` cover when
/// anchored at the start of `address`.
///
/// The window is as wide as the longest row and at least one cell in each
/// direction.
fn cell_window(address: &RangeAddress, rows: &[Vec<CellBuilder>]) -> Result<(u32, u32)> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let height = rows.len().max(1);

    let end_row = u32::try_from(height)
        .ok()
        .and_then(|h| address.start_row().checked_add(h))
        .ok_or(Error::RowOutOfBounds(
            address.start_row() as u64 + height as u64,
            u32::MAX,
        ))?;
    let end_column = u32::try_from(width)
        .ok()
        .and_then(|w| address.start_column().checked_add(w))
        .ok_or_else(|| {
            Error::InvalidRange(format!(
                "{} columns from {} run past the last column",
                width, address
            ))
        })?;

    Ok((end_row, end_column))
}

/// Cell update covering `rows` anchored at the start of `address`.
///
/// Shorter rows leave their trailing cells inside the window untouched.
fn cell_update(sheet_id: i64, address: &RangeAddress, rows: &[Vec<CellBuilder>]) -> Result<Request> {
    let (end_row_index, end_column_index) = cell_window(address, rows)?;

    Ok(Request::UpdateCells(UpdateCellsRequest {
        range: GridRange {
            sheet_id,
            start_row_index: address.start_row(),
            end_row_index,
            start_column_index: address.start_column(),
            end_column_index,
        },
        rows: rows
            .iter()
            .map(|row| RowData {
                values: row.iter().map(CellBuilder::build).collect(),
            })
            .collect(),
        fields: ALL_FIELDS.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::column::column_to_letters;
    use crate::schema::GridProperties;
    use pretty_assertions::assert_eq;

    fn ids(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_title_only() {
        let mut builder = MutationRequestBuilder::new();
        builder.title("Quarterly");

        let batch = builder.build(&HashMap::new()).unwrap();

        assert_eq!(batch.requests.len(), 1);
        assert!(matches!(
            &batch.requests[0],
            Request::UpdateSpreadsheetProperties(r)
                if r.fields == "title" && r.properties.title.as_deref() == Some("Quarterly")
        ));
    }

    #[test]
    fn test_empty_builder() {
        let builder = MutationRequestBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.build(&HashMap::new()).unwrap().requests.is_empty());
    }

    #[test]
    fn test_cell_window_uses_longest_row() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(UpdateRequest::cells(
                "Sheet1!B2:C",
                vec![vec!["a", "b", "c"], vec!["d"]],
            ))
            .unwrap();

        let batch = builder.build(&ids(&[("Sheet1", 7)])).unwrap();

        let Request::UpdateCells(update) = &batch.requests[0] else {
            panic!("expected a cell update, got {:?}", batch.requests[0]);
        };
        assert_eq!(
            update.range,
            GridRange {
                sheet_id: 7,
                start_row_index: 1,
                end_row_index: 3,
                start_column_index: 1,
                end_column_index: 4,
            }
        );
        assert_eq!(update.fields, "*");
        assert_eq!(update.rows[0].values.len(), 3);
        assert_eq!(update.rows[1].values.len(), 1);
    }

    #[test]
    fn test_sheet_name_range_starts_at_origin() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(UpdateRequest::cells("Data", vec![vec![1, 2]]))
            .unwrap();

        let batch = builder.build(&ids(&[("Data", 3)])).unwrap();
        let Request::UpdateCells(update) = &batch.requests[0] else {
            panic!("expected a cell update");
        };
        assert_eq!(update.range.start_row_index, 0);
        assert_eq!(update.range.start_column_index, 0);
        assert_eq!(update.range.end_column_index, 2);
        assert_eq!(update.range.end_row_index, 1);
    }

    #[test]
    fn test_property_mask_only_lists_set_fields() {
        let properties = SheetProperties {
            title: Some("Renamed".into()),
            tab_color: Some(Color::MAGENTA.to_color_value()),
            grid_properties: Some(GridProperties {
                frozen_row_count: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            field_mask(&properties).unwrap(),
            "gridProperties,tabColor,title"
        );
    }

    #[test]
    fn test_property_update_carries_sheet_id() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(
                UpdateRequest::properties(
                    "",
                    SheetProperties {
                        hidden: Some(true),
                        ..Default::default()
                    },
                )
                .with_sheet_id(0),
            )
            .unwrap();

        assert!(builder.sheet_names().is_empty());

        let batch = builder.build(&HashMap::new()).unwrap();
        let Request::UpdateSheetProperties(update) = &batch.requests[0] else {
            panic!("expected a property update");
        };
        assert_eq!(update.fields, "hidden");
        assert_eq!(update.properties.sheet_id, Some(0));
    }

    #[test]
    fn test_empty_properties_are_skipped() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(UpdateRequest::properties("Sheet1", SheetProperties::default()))
            .unwrap();

        let batch = builder.build(&ids(&[("Sheet1", 1)])).unwrap();
        assert!(batch.requests.is_empty());
    }

    #[test]
    fn test_operation_order() {
        let mut builder = MutationRequestBuilder::new();
        builder.title("Report");
        builder
            .update(UpdateRequest {
                range: "Sheet1!A1".into(),
                rows: Some(vec![vec![CellBuilder::new("x")]]),
                properties: Some(SheetProperties {
                    title: Some("Renamed".into()),
                    ..Default::default()
                }),
                sheet_id: None,
            })
            .unwrap()
            .update(UpdateRequest::cells("Sheet2!C3", vec![vec![true]]))
            .unwrap();

        assert_eq!(
            builder.sheet_names().into_iter().collect::<Vec<_>>(),
            vec!["Sheet1", "Sheet2"]
        );

        let batch = builder
            .build(&ids(&[("Sheet1", 10), ("Sheet2", 20)]))
            .unwrap();

        assert_eq!(batch.requests.len(), 4);
        assert!(matches!(batch.requests[0], Request::UpdateSheetProperties(_)));
        assert!(matches!(&batch.requests[1], Request::UpdateCells(u) if u.range.sheet_id == 10));
        assert!(matches!(&batch.requests[2], Request::UpdateCells(u) if u.range.sheet_id == 20));
        assert!(matches!(batch.requests[3], Request::UpdateSpreadsheetProperties(_)));
    }

    #[test]
    fn test_unresolved_sheet() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(UpdateRequest::cells("Missing!A1", vec![vec!["x"]]))
            .unwrap();

        assert!(matches!(
            builder.build(&HashMap::new()),
            Err(Error::UnresolvedSheet(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_malformed_input_rejected_early() {
        let mut builder = MutationRequestBuilder::new();

        assert!(builder
            .update(UpdateRequest::cells("Sheet1!A0", vec![vec!["x"]]))
            .is_err());
        assert!(builder
            .update(UpdateRequest::cells("Sheet1!A1", vec![vec![f64::NAN]]))
            .is_err());
        assert!(builder.is_empty());
    }

    #[test]
    fn test_window_past_last_column_is_rejected() {
        let range = format!("Sheet1!{}1", column_to_letters(u32::MAX - 1));
        let mut builder = MutationRequestBuilder::new();

        let err = builder
            .update(UpdateRequest::cells(range, vec![vec!["a", "b"]]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)), "{:?}", err);
        assert!(builder.is_empty());
    }

    #[test]
    fn test_window_past_last_row_is_rejected() {
        let mut builder = MutationRequestBuilder::new();

        let err = builder
            .update(UpdateRequest::cells(
                "Sheet1!A4294967295",
                vec![vec!["a"], vec!["b"]],
            ))
            .unwrap_err();
        assert!(matches!(err, Error::RowOutOfBounds(4294967296, _)), "{:?}", err);
    }

    #[test]
    fn test_window_ending_at_grid_limit() {
        let mut builder = MutationRequestBuilder::new();
        builder
            .update(UpdateRequest::cells("Sheet1!A4294967295", vec![vec!["a"]]))
            .unwrap();

        let batch = builder.build(&ids(&[("Sheet1", 0)])).unwrap();
        let Request::UpdateCells(update) = &batch.requests[0] else {
            panic!("expected a cell update, got {:?}", batch.requests[0]);
        };
        assert_eq!(update.range.start_row_index, u32::MAX - 1);
        assert_eq!(update.range.end_row_index, u32::MAX);
    }
}
