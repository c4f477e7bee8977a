use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format as CsvFormat;
use arrow::csv::ReaderBuilder as CsvReaderBuilder;
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema;
use arrow::json::ReaderBuilder as JsonReaderBuilder;
use arrow::record_batch::RecordBatch;
use encoding_rs::Encoding;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use super::excel;
use super::model::{shape, CsvReadOptions, Format, SheetSelector, Table};
use super::validate::validate_file_exists;
use crate::config::LoaderConfig;
use crate::error::{attempt, LoaderError, Result};

// ---------------------------------------------------------------------------
// Batch entry-point
// ---------------------------------------------------------------------------

/// Load several datasets at once, picking each reader by file extension.
///
/// Entries are loaded, and keyed in the result, in the order `paths` yields
/// them. The first failure aborts the batch and comes back as
/// [`LoaderError::Dataset`] naming the entry; tables already loaded by this
/// call are dropped. A name that appears twice keeps its first position and
/// the table loaded last.
pub fn load_multiple_datasets<I, K, P>(paths: I) -> Result<IndexMap<String, Table>>
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: AsRef<Path>,
{
    load_multiple_datasets_with(paths, &LoaderConfig::default())
}

/// [`load_multiple_datasets`] with reader options taken from `config`.
pub fn load_multiple_datasets_with<I, K, P>(
    paths: I,
    config: &LoaderConfig,
) -> Result<IndexMap<String, Table>>
where
    I: IntoIterator<Item = (K, P)>,
    K: Into<String>,
    P: AsRef<Path>,
{
    let csv_options = CsvReadOptions::default().with_encoding(config.encoding.clone());
    let mut datasets = IndexMap::new();

    for (name, path) in paths {
        let name = name.into();
        let path = path.as_ref();
        log::info!("Loading dataset '{name}' from: {}", path.display());

        let loaded = Format::from_path(path)
            .inspect_err(|e| log::error!("Unsupported file extension for {name}: {e}"))
            .and_then(|format| match format {
                Format::Csv => load_csv(path, &csv_options),
                Format::Json => load_json(path),
                Format::Excel => load_excel(path, &config.sheet),
            });

        match loaded {
            Ok(table) => {
                datasets.insert(name, table);
            }
            Err(e) => {
                log::error!("Failed to load dataset '{name}': {e}");
                return Err(LoaderError::Dataset {
                    name,
                    source: Box::new(e),
                });
            }
        }
    }

    Ok(datasets)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Load a CSV file with a header row.
///
/// Bytes are decoded with `options.encoding`, column types are inferred over
/// the whole file and then overridden by `options.dtypes`. A zero-byte file, a
/// missing header or content the parser rejects is
/// [`LoaderError::EmptyOrInvalid`].
pub fn load_csv(path: &Path, options: &CsvReadOptions) -> Result<Table> {
    validate_file_exists(path)?;

    let table = attempt("Error loading CSV", || {
        let bytes = std::fs::read(path)
            .map_err(|e| LoaderError::io(format!("reading {}", path.display()), e))?;
        let text = decode(&bytes, &options.encoding, path)?;
        parse_csv(&text, options).map_err(|reason| LoaderError::EmptyOrInvalid {
            path: path.to_path_buf(),
            reason,
        })
    })?;

    log::info!("Dataset loaded from: {} | Shape: {:?}", path.display(), shape(&table));
    Ok(table)
}

/// Load a CSV document served over HTTP(S).
///
/// There is no existence check; network errors, non-success statuses and
/// parse failures are all [`LoaderError::Io`].
pub fn load_csv_from_url(url: &str) -> Result<Table> {
    let table = attempt("Error loading CSV from URL", || {
        let body = reqwest::blocking::get(url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| LoaderError::io(format!("fetching {url}"), e))?;
        parse_csv(&body, &CsvReadOptions::default())
            .map_err(|reason| LoaderError::io(format!("parsing CSV from {url}"), reason))
    })?;

    log::info!("CSV loaded from URL: {url} | Shape: {:?}", shape(&table));
    Ok(table)
}

fn decode(bytes: &[u8], label: &str, path: &Path) -> Result<String> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| LoaderError::io("resolving encoding", format!("unknown encoding: {label}")))?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(LoaderError::EmptyOrInvalid {
            path: path.to_path_buf(),
            reason: format!("content is not valid {}", encoding.name()),
        });
    }
    Ok(text.into_owned())
}

/// Parse decoded CSV text; the error is the reason the content was rejected.
fn parse_csv(text: &str, options: &CsvReadOptions) -> std::result::Result<Table, String> {
    const NO_COLUMNS: &str = "No columns to parse from file";

    if text.trim().is_empty() {
        return Err(NO_COLUMNS.to_string());
    }

    // The header has to name at least one column before arrow gets involved.
    let mut headers = csv::Reader::from_reader(text.as_bytes());
    let has_columns = headers
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .any(|h| !h.is_empty());
    if !has_columns {
        return Err(NO_COLUMNS.to_string());
    }

    let parse = || -> std::result::Result<Table, ArrowError> {
        let format = CsvFormat::default().with_header(true);
        let (inferred, _) = format.infer_schema(Cursor::new(text.as_bytes()), None)?;
        let schema = apply_dtypes(inferred, options);

        let reader = CsvReaderBuilder::new(schema.clone())
            .with_format(format)
            .build(Cursor::new(text.as_bytes()))?;
        let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, ArrowError>>()?;
        arrow::compute::concat_batches(&schema, &batches)
    };
    parse().map_err(|e| e.to_string())
}

fn apply_dtypes(inferred: Schema, options: &CsvReadOptions) -> SchemaRef {
    if options.dtypes.is_empty() {
        return Arc::new(inferred);
    }
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|f| match options.dtypes.get(f.name()) {
            Some(dt) => f.as_ref().clone().with_data_type(dt.clone()),
            None => f.as_ref().clone(),
        })
        .collect();
    Arc::new(Schema::new(fields))
}

// ---------------------------------------------------------------------------
// Excel loader
// ---------------------------------------------------------------------------

/// Load one worksheet of a workbook; the first row holds the column names.
pub fn load_excel(path: &Path, sheet: &SheetSelector) -> Result<Table> {
    validate_file_exists(path)?;

    let table = attempt("Error loading Excel", || {
        let bytes = std::fs::read(path)
            .map_err(|e| LoaderError::io(format!("reading {}", path.display()), e))?;
        excel::read_sheet(bytes, sheet)
            .map_err(|e| LoaderError::io(format!("sheet {sheet} of {}", path.display()), e))
    })?;

    log::info!("Excel file loaded from: {} | Shape: {:?}", path.display(), shape(&table));
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Load a JSON table.
///
/// Accepted layouts:
/// * records – `[{"a": 1, "b": "x"}, ...]`
/// * columns – `{"a": {"0": 1, ...}, "b": {"0": "x", ...}}`
/// * lines   – one record object per line
///
/// Column order follows first appearance in the document.
pub fn load_json(path: &Path) -> Result<Table> {
    validate_file_exists(path)?;

    let table = attempt("Error loading JSON", || {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LoaderError::io(format!("reading {}", path.display()), e))?;
        parse_json(&text).map_err(|e| LoaderError::io(format!("parsing {}", path.display()), e))
    })?;

    log::info!("JSON file loaded from: {} | Shape: {:?}", path.display(), shape(&table));
    Ok(table)
}

fn parse_json(text: &str) -> std::result::Result<Table, Box<dyn std::error::Error + Send + Sync>> {
    let trimmed = text.trim_start();
    let lines = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        match serde_json::from_str::<JsonValue>(trimmed) {
            Ok(JsonValue::Array(records)) => records_to_lines(&records)?,
            Ok(JsonValue::Object(columns)) if is_columns_layout(&columns) => {
                records_to_lines(&columns_to_records(&columns))?
            }
            // A single object or several objects on separate lines.
            _ => text.to_string(),
        }
    } else {
        text.to_string()
    };

    let (schema, _) = infer_json_schema(Cursor::new(lines.as_bytes()), None)?;
    let schema = Arc::new(schema);
    let reader = JsonReaderBuilder::new(schema.clone()).build(Cursor::new(lines.as_bytes()))?;
    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, ArrowError>>()?;

    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}

fn records_to_lines(records: &[JsonValue]) -> serde_json::Result<String> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

fn is_columns_layout(object: &Map<String, JsonValue>) -> bool {
    !object.is_empty() && object.values().all(JsonValue::is_object)
}

/// Pivot `{"col": {"row": v}}` into one record per row label, keeping rows in
/// the order they first appear.
fn columns_to_records(columns: &Map<String, JsonValue>) -> Vec<JsonValue> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<Map<String, JsonValue>> = Vec::new();
    for (column, cells) in columns {
        let Some(cells) = cells.as_object() else { continue };
        for (label, value) in cells {
            let slot = *slots.entry(label.as_str()).or_insert_with(|| {
                rows.push(Map::new());
                rows.len() - 1
            });
            rows[slot].insert(column.clone(), value.clone());
        }
    }
    rows.into_iter().map(JsonValue::Object).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use arrow::array::AsArray;
    use arrow::datatypes::{DataType, Float64Type, Int64Type};

    use crate::data::model::column_names;

    fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn csv_infers_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.csv", b"id,name,score\n1,ann,0.5\n2,bob,1.25\n");
        let table = load_csv(&path, &CsvReadOptions::default()).unwrap();
        assert_eq!(shape(&table), (2, 3));
        assert_eq!(column_names(&table), vec!["id", "name", "score"]);
        assert_eq!(table.column(0).data_type(), &DataType::Int64);
        assert_eq!(table.column(2).as_primitive::<Float64Type>().value(1), 1.25);
    }

    #[test]
    fn csv_dtypes_override_inference() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.csv", b"zip,n\n01234,1\n98765,2\n");
        let options = CsvReadOptions::default().with_dtype("zip", DataType::Utf8);
        let table = load_csv(&path, &options).unwrap();
        assert_eq!(table.column(0).as_string::<i32>().value(0), "01234");
        assert_eq!(table.column(1).as_primitive::<Int64Type>().value(1), 2);
    }

    #[test]
    fn csv_decodes_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.csv", b"city\nM\xfcnchen\n");
        let table = load_csv(&path, &CsvReadOptions::default().with_encoding("latin1")).unwrap();
        assert_eq!(table.column(0).as_string::<i32>().value(0), "München");

        let err = load_csv(&path, &CsvReadOptions::default()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptyOrInvalid { .. }));
    }

    #[test]
    fn csv_unknown_encoding_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "t.csv", b"a\n1\n");
        let err = load_csv(&path, &CsvReadOptions::default().with_encoding("klingon")).unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }

    #[test]
    fn empty_csv_is_empty_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "empty.csv", b"");
        let err = load_csv(&path, &CsvReadOptions::default()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptyOrInvalid { .. }));
    }

    #[test]
    fn ragged_csv_is_empty_or_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "ragged.csv", b"a,b\n1,2\n3,4,5\n");
        let err = load_csv(&path, &CsvReadOptions::default()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptyOrInvalid { .. }));
    }

    #[test]
    fn header_only_csv_has_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "h.csv", b"a,b\n");
        let table = load_csv(&path, &CsvReadOptions::default()).unwrap();
        assert_eq!(shape(&table), (0, 2));
    }

    #[test]
    fn missing_files_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");
        assert!(matches!(
            load_csv(&path.with_extension("csv"), &CsvReadOptions::default()),
            Err(LoaderError::NotFound { .. })
        ));
        assert!(matches!(
            load_json(&path.with_extension("json")),
            Err(LoaderError::NotFound { .. })
        ));
        assert!(matches!(
            load_excel(&path.with_extension("xlsx"), &SheetSelector::default()),
            Err(LoaderError::NotFound { .. })
        ));
    }

    #[test]
    fn json_layouts_agree() {
        let dir = tempfile::tempdir().unwrap();
        let records = write(dir.path(), "r.json", br#"[{"a": 1, "b": "x"}, {"a": 2, "b": "y"}]"#);
        let columns = write(dir.path(), "c.json", br#"{"a": {"0": 1, "1": 2}, "b": {"0": "x", "1": "y"}}"#);
        let lines = write(dir.path(), "l.json", b"{\"a\": 1, \"b\": \"x\"}\n{\"a\": 2, \"b\": \"y\"}\n");

        for path in [records, columns, lines] {
            let table = load_json(&path).unwrap();
            assert_eq!(column_names(&table), vec!["a", "b"], "{}", path.display());
            assert_eq!(table.column(0).as_primitive::<Int64Type>().values().to_vec(), vec![1, 2]);
            assert_eq!(table.column(1).as_string::<i32>().value(1), "y");
        }
    }

    #[test]
    fn malformed_json_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", b"[{\"a\": 1,");
        assert!(matches!(load_json(&path), Err(LoaderError::Io { .. })));
    }

    #[test]
    fn excel_garbage_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.xlsx", b"not a workbook");
        assert!(matches!(
            load_excel(&path, &SheetSelector::default()),
            Err(LoaderError::Io { .. })
        ));
    }

    #[test]
    fn url_loader_reports_bad_urls_as_io() {
        assert!(matches!(load_csv_from_url("not a url"), Err(LoaderError::Io { .. })));
    }

    #[test]
    fn batch_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "valid.csv", b"a\n1\n");
        let missing = dir.path().join("missing.json");

        let err = load_multiple_datasets([("a", good), ("b", missing)]).unwrap_err();
        assert_eq!(err.dataset_name(), Some("b"));
        assert!(matches!(err.root_cause(), LoaderError::NotFound { .. }));
    }

    #[test]
    fn batch_rejects_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let notes = write(dir.path(), "notes.txt", b"hello");
        let err = load_multiple_datasets([("notes", notes)]).unwrap_err();
        match err.root_cause() {
            LoaderError::UnsupportedFormat { extension } => assert_eq!(extension, ".txt"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn batch_collects_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write(dir.path(), "one.CSV", b"a,b\n1,2\n");
        let json = write(dir.path(), "two.json", br#"[{"c": true}]"#);

        let datasets = load_multiple_datasets(vec![("one", csv), ("two", json)]).unwrap();
        assert_eq!(datasets.keys().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(shape(&datasets["one"]), (1, 2));
        assert_eq!(shape(&datasets["two"]), (1, 1));
    }

    #[test]
    fn batch_keeps_caller_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "first.csv", b"a\n1\n");
        let second = write(dir.path(), "second.csv", b"b\n2\n");

        let datasets = load_multiple_datasets([
            ("zeta", first.clone()),
            ("alpha", second),
            ("zeta", first),
        ])
        .unwrap();
        assert_eq!(datasets.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert_eq!(column_names(&datasets["alpha"]), vec!["b"]);
    }
}
