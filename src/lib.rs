//! Load tabular datasets from CSV, spreadsheets, JSON and remote CSV into
//! Arrow record batches, check basic structure, and write them back out.
//!
//! ```no_run
//! use std::path::Path;
//! use tabular_io::{load_multiple_datasets, preview, save_auto, validate_columns};
//!
//! # fn main() -> tabular_io::Result<()> {
//! let datasets = load_multiple_datasets([
//!     ("sales", "data/sales.csv"),
//!     ("stores", "data/stores.xlsx"),
//! ])?;
//! let sales = &datasets["sales"];
//! validate_columns(sales, &["store_id", "amount"])?;
//! save_auto(&preview(sales, 5), Path::new("out/head.json"), false)?;
//! # Ok(())
//! # }
//! ```
//!
//! Every operation logs through the [`log`] facade and returns a
//! [`LoaderError`]; installing a logger is up to the application.

pub mod config;
pub mod data;
pub mod error;

pub use config::LoaderConfig;
pub use data::loader::{
    load_csv, load_csv_from_url, load_excel, load_json, load_multiple_datasets,
    load_multiple_datasets_with,
};
pub use data::model::{
    column_names, format_preview, preview, shape, CsvReadOptions, Format, JsonOrient,
    SheetSelector, Table, DEFAULT_PREVIEW_ROWS, DEFAULT_SHEET_NAME,
};
pub use data::scan::list_csv_files;
pub use data::validate::{validate_columns, validate_file_exists};
pub use data::writer::{save_auto, save_auto_with, save_csv, save_excel, save_excel_default, save_json};
pub use error::{LoaderError, Result};
