//! Spreadsheet facade: range reads, cell and property writes, sheet lookup.

use std::collections::HashMap;
use std::sync::Arc;

use cloudsheets_core::address::quoted_sheet_name;
use cloudsheets_core::schema::{SheetProperties, Spreadsheet};
use cloudsheets_core::{
    BatchReconciler, CellBuilder, CellGrid, MutationRequestBuilder, UpdateRequest,
};
use futures::future::try_join_all;

use crate::cache::{SheetIdCache, SheetIds};
use crate::error::{Error, ResourceKind, Result};
use crate::retry::RetryRunner;
use crate::transport::SheetsApi;

/// Sheet addressed by id or by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    Id(i64),
    Name(String),
}

impl From<i64> for SheetSelector {
    fn from(id: i64) -> Self {
        SheetSelector::Id(id)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl From<String> for SheetSelector {
    fn from(name: String) -> Self {
        SheetSelector::Name(name)
    }
}

/// High-level operations on spreadsheets.
///
/// Every remote call goes through the retry runner; a missing resource is
/// never retried. Sheet names are resolved through a [`SheetIdCache`] shared
/// by all clones of the facade.
#[derive(Clone)]
pub struct SpreadsheetFacade {
    api: Arc<dyn SheetsApi>,
    runner: RetryRunner,
    cache: Arc<SheetIdCache>,
}

impl SpreadsheetFacade {
    pub fn new(api: Arc<dyn SheetsApi>, runner: RetryRunner) -> Self {
        Self {
            api,
            runner,
            cache: Arc::new(SheetIdCache::new()),
        }
    }

    pub fn sheet_id_cache(&self) -> &SheetIdCache {
        &self.cache
    }

    /// Formatted values keyed by requested range.
    ///
    /// With no ranges (or only blank ones) every sheet is read and the result
    /// is keyed by sheet name.
    pub async fn get_sheet_values<S: AsRef<str>>(
        &self,
        spreadsheet_id: &str,
        ranges: &[S],
    ) -> Result<HashMap<String, Vec<Vec<String>>>> {
        let reconciler = BatchReconciler::new(ranges)?;

        let request_ranges: Vec<String> = if reconciler.is_bulk() {
            let ids = self.sheet_ids(spreadsheet_id).await?;
            let mut titles: Vec<&String> = ids.keys().filter(|t| !t.is_empty()).collect();
            titles.sort();
            titles.into_iter().map(|t| quoted_sheet_name(t)).collect()
        } else {
            reconciler.requested_ranges().map(str::to_string).collect()
        };

        let response = self
            .runner
            .with_retry(
                || self.api.batch_get_values(spreadsheet_id, &request_ranges),
                Error::is_retryable,
            )
            .await?;

        Ok(reconciler.reconcile_values(response))
    }

    /// Cell snapshots (value, format, size, visibility) keyed by requested range.
    ///
    /// With no ranges the whole spreadsheet is read and keyed by sheet name.
    pub async fn get_sheet_cells<S: AsRef<str>>(
        &self,
        spreadsheet_id: &str,
        ranges: &[S],
    ) -> Result<HashMap<String, CellGrid>> {
        let reconciler = BatchReconciler::new(ranges)?;
        let request_ranges: Vec<String> =
            reconciler.requested_ranges().map(str::to_string).collect();

        let spreadsheet = self
            .runner
            .with_retry(
                || self.api.get_spreadsheet(spreadsheet_id, &request_ranges, true),
                Error::is_retryable,
            )
            .await?;

        Ok(reconciler.reconcile(&spreadsheet))
    }

    /// Write `rows` starting at the first cell of `range`.
    pub async fn set_sheet_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<CellBuilder>>,
    ) -> Result<()> {
        self.update_sheets(spreadsheet_id, vec![UpdateRequest::cells(range, rows)], None)
            .await
    }

    /// Change properties of several sheets in one batch.
    pub async fn update_sheet_properties(
        &self,
        spreadsheet_id: &str,
        updates: Vec<(SheetSelector, SheetProperties)>,
    ) -> Result<()> {
        let requests = updates
            .into_iter()
            .map(|(sheet, properties)| match sheet {
                SheetSelector::Id(id) => {
                    UpdateRequest::properties("", properties).with_sheet_id(id)
                }
                SheetSelector::Name(name) => UpdateRequest::properties(name, properties),
            })
            .collect();

        self.update_sheets(spreadsheet_id, requests, None).await
    }

    /// Apply cell and property updates, and optionally a new spreadsheet
    /// title, as a single batch.
    ///
    /// All input is validated before any remote call. Sheet names are then
    /// resolved concurrently and the batch is submitted once.
    pub async fn update_sheets(
        &self,
        spreadsheet_id: &str,
        requests: Vec<UpdateRequest>,
        title: Option<&str>,
    ) -> Result<()> {
        let mut builder = MutationRequestBuilder::new();
        for request in requests {
            builder.update(request)?;
        }
        if let Some(title) = title {
            builder.title(title);
        }

        let lookups = builder.sheet_names().into_iter().map(|name| async move {
            let id = self.get_sheet_id_by_name(spreadsheet_id, name).await?;
            Ok::<_, Error>((name.to_string(), id))
        });
        let sheet_ids: HashMap<String, i64> = try_join_all(lookups).await?.into_iter().collect();

        let batch = builder.build(&sheet_ids)?;
        if batch.requests.is_empty() {
            tracing::debug!(spreadsheet_id, "Nothing to update");
            return Ok(());
        }

        self.runner
            .with_retry(
                || self.api.batch_update(spreadsheet_id, &batch),
                Error::is_retryable,
            )
            .await
    }

    /// Id of the sheet titled `sheet_name`.
    ///
    /// An empty name stands for the first sheet.
    ///
    /// The first lookup for a spreadsheet reads its metadata and caches the
    /// whole name table; later lookups are served from the cache.
    pub async fn get_sheet_id_by_name(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<i64> {
        let ids = self.sheet_ids(spreadsheet_id).await?;
        ids.get(sheet_name).copied().ok_or_else(|| {
            Error::not_found(
                ResourceKind::Sheet,
                format!("{} in spreadsheet {}", sheet_name, spreadsheet_id),
            )
        })
    }

    /// Rename the spreadsheet.
    pub async fn update_spreadsheet_title(&self, spreadsheet_id: &str, title: &str) -> Result<()> {
        self.update_sheets(spreadsheet_id, Vec::new(), Some(title))
            .await
    }

    async fn sheet_ids(&self, spreadsheet_id: &str) -> Result<Arc<SheetIds>> {
        if let Some(ids) = self.cache.get(spreadsheet_id) {
            return Ok(ids);
        }

        let spreadsheet = self
            .runner
            .with_retry(
                || self.api.get_spreadsheet(spreadsheet_id, &[], false),
                Error::is_retryable,
            )
            .await?;

        let ids = sheet_id_table(&spreadsheet);
        tracing::info!(spreadsheet_id, sheets = spreadsheet.sheets.len(), "Cached sheet ids");
        Ok(self.cache.insert(spreadsheet_id, ids))
    }
}

/// Title to id for every sheet that carries both.
///
/// The empty name maps to the first sheet, which is the one a range without
/// a sheet name addresses.
fn sheet_id_table(spreadsheet: &Spreadsheet) -> SheetIds {
    let properties = spreadsheet
        .sheets
        .iter()
        .filter_map(|sheet| sheet.properties.as_ref());

    let mut ids: SheetIds = properties
        .clone()
        .filter_map(|p| Some((p.title.clone()?, p.sheet_id?)))
        .collect();

    let first = properties
        .filter_map(|p| Some((p.index.unwrap_or(u32::MAX), p.sheet_id?)))
        .enumerate()
        .min_by_key(|(position, (index, _))| (*index, *position));
    if let Some((_, (_, id))) = first {
        ids.insert(String::new(), id);
    }
    ids
}
