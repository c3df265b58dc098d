//! # cloudsheets
//!
//! Async facade over a cloud spreadsheet service and its file store.
//!
//! - [`SpreadsheetFacade`] - range reads keyed by the requested range, batched
//!   cell and property writes, sheet lookup by name
//! - [`DriveFacade`] - upload, download, nested folder creation, listing
//! - [`Toolbox`] - both facades over one authenticated HTTP client
//!
//! Every remote call is retried with exponential backoff; a missing resource
//! fails at once.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudsheets::{AuthOption, ClientConfig, Toolbox};
//! use cloudsheets_core::CellBuilder;
//!
//! # async fn run() -> cloudsheets::Result<()> {
//! let toolbox = Toolbox::new(AuthOption::from_dir("credentials"), ClientConfig::default())?;
//!
//! let header = vec![
//!     CellBuilder::new("name").bold(true).background_color("#ff00ff")?,
//!     CellBuilder::new("count").bold(true),
//! ];
//! toolbox
//!     .spreadsheet
//!     .set_sheet_values("spreadsheet-id", "Sheet1!A1", vec![header])
//!     .await?;
//!
//! let values = toolbox
//!     .spreadsheet
//!     .get_sheet_values("spreadsheet-id", &["Sheet1!A1:B10"])
//!     .await?;
//! println!("{:?}", values.get("Sheet1!A1:B10"));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod drive;
pub mod error;
pub mod retry;
pub mod spreadsheet;
#[cfg(test)]
mod test_support;
pub mod transport;

use std::sync::Arc;

pub use auth::{AuthOption, StaticToken, TokenSource};
pub use config::{ClientConfig, RetryConfig};
pub use drive::{DriveFacade, DriveItem, DriveItemKind};
pub use error::{Error, ResourceKind, Result};
pub use retry::RetryRunner;
pub use spreadsheet::{SheetSelector, SpreadsheetFacade};
pub use transport::{DriveApi, HttpTransport, Media, SheetsApi};

/// Spreadsheet and drive facades sharing one client and one retry policy.
#[derive(Clone)]
pub struct Toolbox {
    pub spreadsheet: SpreadsheetFacade,
    pub drive: DriveFacade,
}

impl Toolbox {
    /// Build the facades over one shared transport.
    ///
    /// Fails when the credentials cannot be loaded.
    pub fn new(auth: AuthOption, config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let tokens = auth.into_token_source(client.clone(), &config)?;
        let runner = RetryRunner::new(config.retry.clone());
        let transport = Arc::new(HttpTransport::new(client, tokens, config));

        Ok(Self::with_apis(transport.clone(), transport, runner))
    }

    /// Build the facades over custom API implementations.
    pub fn with_apis(
        sheets: Arc<dyn SheetsApi>,
        drive: Arc<dyn DriveApi>,
        runner: RetryRunner,
    ) -> Self {
        Self {
            spreadsheet: SpreadsheetFacade::new(sheets, runner.clone()),
            drive: DriveFacade::new(drive, runner),
        }
    }
}
