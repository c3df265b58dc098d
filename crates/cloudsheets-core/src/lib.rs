//! # cloudsheets-core
//!
//! Range-address algebra and request construction for the cloudsheets facade.
//! Nothing in this crate performs I/O.
//!
//! - [`RangeAddress`] - A1 range strings to zero-based grid coordinates and back
//! - [`column_to_letters`] / [`letters_to_column`] - the column label codec
//! - [`CellBuilder`] - a styled cell for range updates
//! - [`BatchReconciler`] - maps returned grid blocks to the requested ranges
//! - [`MutationRequestBuilder`] - assembles the operations of one batch update
//!
//! ## Example
//!
//! ```rust
//! use cloudsheets_core::{CellBuilder, MutationRequestBuilder, RangeAddress, UpdateRequest};
//! use std::collections::HashMap;
//!
//! let range = RangeAddress::parse("Sheet1!A2:C10").unwrap();
//! assert_eq!((range.start_column(), range.start_row()), (0, 1));
//!
//! let mut builder = MutationRequestBuilder::new();
//! builder
//!     .update(UpdateRequest::cells(
//!         "Sheet1!A2",
//!         vec![vec![CellBuilder::new("name").bold(true), CellBuilder::new(42)]],
//!     ))
//!     .unwrap();
//!
//! let ids = HashMap::from([("Sheet1".to_string(), 0)]);
//! let batch = builder.build(&ids).unwrap();
//! assert_eq!(batch.requests.len(), 1);
//! ```

pub mod address;
pub mod cell;
pub mod color;
pub mod column;
pub mod error;
pub mod mutation;
pub mod reconcile;
pub mod schema;

// Re-exports for convenience
pub use address::RangeAddress;
pub use cell::{CellBuilder, CellValue};
pub use color::Color;
pub use column::{column_to_letters, letters_to_column};
pub use error::{Error, Result};
pub use mutation::{MutationRequestBuilder, UpdateRequest};
pub use reconcile::{
    BatchReconciler, CellGrid, CellSnapshot, DEFAULT_COLUMN_WIDTH, DEFAULT_ROW_HEIGHT,
};
