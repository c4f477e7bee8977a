use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// Rows shown by [`preview`] when the caller has no preference.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Sheet written by the spreadsheet writer when none is named.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

// ---------------------------------------------------------------------------
// Table – the in-memory representation handed to and from every reader/writer
// ---------------------------------------------------------------------------

/// An ordered set of named columns with positionally aligned rows.
///
/// Tables are owned by the caller; nothing in this crate holds on to one past
/// the call that produced or consumed it.
pub type Table = RecordBatch;

/// `(rows, columns)`, printed the way the load/save log lines report it.
pub fn shape(table: &Table) -> (usize, usize) {
    (table.num_rows(), table.num_columns())
}

/// Column names in schema order.
pub fn column_names(table: &Table) -> Vec<String> {
    table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// The first `n` rows of `table`.
///
/// `n` larger than the row count clamps to the whole table; `n == 0` gives an
/// empty table with the same schema. The slice shares buffers with `table`,
/// which is left untouched.
pub fn preview(table: &Table, n: usize) -> Table {
    log::info!("Previewing dataset: shape={:?}", shape(table));
    table.slice(0, n.min(table.num_rows()))
}

/// [`preview`] rendered as an ASCII grid.
pub fn format_preview(table: &Table, n: usize) -> Result<String> {
    let head = preview(table, n);
    arrow::util::pretty::pretty_format_batches(&[head])
        .map(|grid| grid.to_string())
        .map_err(|e| LoaderError::io("Error formatting preview", e))
}

/// Prepend an unnamed `Int64` column holding `0..rows`, the row index written
/// when a writer is asked to include it.
pub(crate) fn with_index_column(table: &Table) -> Result<Table> {
    let rows = table.num_rows() as i64;
    let index: ArrayRef = Arc::new(Int64Array::from_iter_values(0..rows));

    let mut fields = vec![Arc::new(Field::new("", DataType::Int64, false))];
    fields.extend(table.schema().fields().iter().cloned());
    let mut columns = vec![index];
    columns.extend(table.columns().iter().cloned());

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .map_err(|e| LoaderError::io("Error adding index column", e))
}

// ---------------------------------------------------------------------------
// Format – extension lookup shared by the batch loader and auto-save
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.csv`
    Csv,
    /// `.xlsx` / `.xls`
    Excel,
    /// `.json`
    Json,
}

impl Format {
    /// Classify `path` by its extension, ignoring case.
    ///
    /// There is no fallback: anything outside the table (including a missing
    /// extension) is [`LoaderError::UnsupportedFormat`].
    pub fn from_path(path: &Path) -> Result<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            "xlsx" | "xls" => Ok(Format::Excel),
            "" => Err(LoaderError::UnsupportedFormat {
                extension: String::new(),
            }),
            other => Err(LoaderError::UnsupportedFormat {
                extension: format!(".{other}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Reader / writer options
// ---------------------------------------------------------------------------

/// Which worksheet the spreadsheet reader opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    /// 0-based position in the workbook.
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "#{i}"),
            SheetSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Layout of a JSON document holding a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonOrient {
    /// `[{"col": v, ...}, ...]`
    #[default]
    Records,
    /// One record object per line.
    Lines,
    /// `{"col": {"0": v, "1": v, ...}, ...}`
    Columns,
}

/// Options for the CSV reader.
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// WHATWG encoding label, e.g. `utf-8`, `latin1`, `windows-1252`.
    pub encoding: String,
    /// Column types that replace the inferred ones.
    pub dtypes: HashMap<String, DataType>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            dtypes: HashMap::new(),
        }
    }
}

impl CsvReadOptions {
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_dtype(mut self, column: impl Into<String>, data_type: DataType) -> Self {
        self.dtypes.insert(column.into(), data_type);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{AsArray, StringArray};
    use arrow::datatypes::Int64Type;

    fn numbered(rows: i64) -> Table {
        RecordBatch::try_from_iter([
            ("id", Arc::new(Int64Array::from_iter_values(0..rows)) as ArrayRef),
            (
                "label",
                Arc::new(StringArray::from_iter_values((0..rows).map(|i| format!("r{i}")))) as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(Format::from_path(Path::new("a.csv")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("a.CSV")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("d/a.Json")).unwrap(), Format::Json);
        assert_eq!(Format::from_path(Path::new("a.xlsx")).unwrap(), Format::Excel);
        assert_eq!(Format::from_path(Path::new("a.XLS")).unwrap(), Format::Excel);
    }

    #[test]
    fn unknown_extension_is_named() {
        match Format::from_path(Path::new("notes.txt")) {
            Err(LoaderError::UnsupportedFormat { extension }) => assert_eq!(extension, ".txt"),
            other => panic!("unexpected: {other:?}"),
        }
        match Format::from_path(Path::new("README")) {
            Err(LoaderError::UnsupportedFormat { extension }) => assert!(extension.is_empty()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn preview_takes_leading_rows() {
        let table = numbered(10);
        let head = preview(&table, 5);
        assert_eq!(shape(&head), (5, 2));
        let ids: Vec<i64> = head.column(0).as_primitive::<Int64Type>().values().to_vec();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(shape(&table), (10, 2));
    }

    #[test]
    fn preview_clamps() {
        let table = numbered(3);
        assert_eq!(preview(&table, DEFAULT_PREVIEW_ROWS).num_rows(), 3);
        let empty = preview(&table, 0);
        assert_eq!(empty.num_rows(), 0);
        assert_eq!(column_names(&empty), vec!["id", "label"]);
    }

    #[test]
    fn format_preview_renders_grid() {
        let grid = format_preview(&numbered(8), 2).unwrap();
        assert!(grid.contains("| id | label |"));
        assert!(grid.contains("r1"));
        assert!(!grid.contains("r2"));
    }

    #[test]
    fn index_column_is_prepended() {
        let indexed = with_index_column(&numbered(3)).unwrap();
        assert_eq!(column_names(&indexed), vec!["", "id", "label"]);
        let index: Vec<i64> = indexed.column(0).as_primitive::<Int64Type>().values().to_vec();
        assert_eq!(index, vec![0, 1, 2]);
    }

    #[test]
    fn sheet_selector_deserializes_untagged() {
        let by_index: SheetSelector = serde_json::from_str("2").unwrap();
        assert_eq!(by_index, SheetSelector::Index(2));
        let by_name: SheetSelector = serde_json::from_str("\"Sales\"").unwrap();
        assert_eq!(by_name, SheetSelector::Name("Sales".into()));
    }
}
