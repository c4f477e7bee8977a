use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::csv::WriterBuilder as CsvWriterBuilder;
use arrow::json::writer::{JsonArray, JsonFormat, LineDelimited, Writer as JsonWriter};
use arrow::json::WriterBuilder as JsonWriterBuilder;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value as JsonValue;

use super::excel;
use super::model::{shape, with_index_column, Format, JsonOrient, Table, DEFAULT_SHEET_NAME};
use crate::config::LoaderConfig;
use crate::error::{attempt, LoaderError, Result};

// ---------------------------------------------------------------------------
// Auto-format save
// ---------------------------------------------------------------------------

/// Save `table`, choosing the writer from the extension of `path`.
///
/// * `.csv`          – [`save_csv`]
/// * `.json`         – [`save_json`], always newline-delimited records
/// * `.xlsx` / `.xls` – [`save_excel`] on sheet `Sheet1`
///
/// Any other extension is [`LoaderError::UnsupportedFormat`].
pub fn save_auto(table: &Table, path: &Path, index: bool) -> Result<()> {
    let config = LoaderConfig {
        include_index: index,
        orient: JsonOrient::Lines,
        ..LoaderConfig::default()
    };
    save_auto_with(table, path, &config)
}

/// [`save_auto`] with writer options taken from `config`.
pub fn save_auto_with(table: &Table, path: &Path, config: &LoaderConfig) -> Result<()> {
    let context = format!("Failed to save DataFrame to {}", path.display());
    attempt(context, || {
        match Format::from_path(path)? {
            Format::Csv => save_csv(table, path, config.include_index)?,
            Format::Json => save_json(table, path, config.orient, config.indent)?,
            Format::Excel => save_excel(table, path, &config.sheet_name, config.include_index)?,
        }
        log::info!("DataFrame saved to: {}", path.display());
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Format writers
// ---------------------------------------------------------------------------

/// Write `table` as CSV with a header row.
///
/// With `index` set, an unnamed first column carries the row numbers.
pub fn save_csv(table: &Table, path: &Path, index: bool) -> Result<()> {
    attempt("Error saving CSV", || {
        let out = indexed(table, index)?;
        let file = create(path)?;
        let mut writer = CsvWriterBuilder::new().with_header(true).build(file);
        writer
            .write(&out)
            .map_err(|e| LoaderError::io(format!("writing {}", path.display()), e))?;
        writer
            .into_inner()
            .flush()
            .map_err(|e| LoaderError::io(format!("flushing {}", path.display()), e))
    })?;

    log::info!("DataFrame saved to {} | Shape: {:?}", path.display(), shape(table));
    Ok(())
}

/// Write `table` to a new workbook holding the single sheet `sheet_name`.
pub fn save_excel(table: &Table, path: &Path, sheet_name: &str, index: bool) -> Result<()> {
    attempt("Error saving Excel", || {
        let out = indexed(table, index)?;
        excel::write_sheet(&out, path, sheet_name)
            .map_err(|e| LoaderError::io(format!("writing {}", path.display()), e))
    })?;

    log::info!("DataFrame saved to {} | Shape: {:?}", path.display(), shape(table));
    Ok(())
}

/// [`save_excel`] with the default `Sheet1` name and no index column.
pub fn save_excel_default(table: &Table, path: &Path) -> Result<()> {
    save_excel(table, path, DEFAULT_SHEET_NAME, false)
}

/// Write `table` as JSON in the given layout.
///
/// `indent` pretty-prints `Records` and `Columns` documents with that many
/// spaces; newline-delimited output is always compact.
pub fn save_json(table: &Table, path: &Path, orient: JsonOrient, indent: Option<usize>) -> Result<()> {
    attempt("Error saving JSON", || {
        let file = create(path)?;
        let writing = |e: Box<dyn std::error::Error + Send + Sync>| {
            LoaderError::io(format!("writing {}", path.display()), e)
        };

        match orient {
            JsonOrient::Lines => {
                let mut writer = json_writer::<_, LineDelimited>(file);
                writer.write(table).map_err(|e| writing(e.into()))?;
                writer.finish().map_err(|e| writing(e.into()))?;
                writer.into_inner().flush().map_err(|e| writing(e.into()))
            }
            JsonOrient::Records | JsonOrient::Columns => {
                let records = records_value(table).map_err(writing)?;
                let document = match orient {
                    JsonOrient::Columns => records_to_columns(records),
                    _ => records,
                };
                write_document(file, &document, indent).map_err(writing)
            }
        }
    })?;

    log::info!("DataFrame saved to {} | Shape: {:?}", path.display(), shape(table));
    Ok(())
}

fn indexed(table: &Table, index: bool) -> Result<Table> {
    if index {
        with_index_column(table)
    } else {
        Ok(table.clone())
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| LoaderError::io(format!("creating {}", path.display()), e))
}

/// Null cells are written as `null` so every row carries every column key.
fn json_writer<W: Write, F: JsonFormat>(out: W) -> JsonWriter<W, F> {
    JsonWriterBuilder::new().with_explicit_nulls(true).build::<_, F>(out)
}

/// The table as a JSON array of row objects, as arrow serializes it.
fn records_value(table: &Table) -> std::result::Result<JsonValue, Box<dyn std::error::Error + Send + Sync>> {
    let mut buf = Vec::new();
    let mut writer = json_writer::<_, JsonArray>(&mut buf);
    writer.write(table)?;
    writer.finish()?;
    drop(writer);

    if buf.is_empty() {
        return Ok(JsonValue::Array(Vec::new()));
    }
    Ok(serde_json::from_slice(&buf)?)
}

/// `[{"a": 1}, {"a": 2}]` → `{"a": {"0": 1, "1": 2}}`
fn records_to_columns(records: JsonValue) -> JsonValue {
    let mut columns = serde_json::Map::new();
    let JsonValue::Array(rows) = records else {
        return JsonValue::Object(columns);
    };
    for (i, row) in rows.into_iter().enumerate() {
        let JsonValue::Object(cells) = row else { continue };
        for (name, value) in cells {
            let column = columns
                .entry(name)
                .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
            if let JsonValue::Object(column) = column {
                column.insert(i.to_string(), value);
            }
        }
    }
    JsonValue::Object(columns)
}

fn write_document(
    mut out: impl Write,
    document: &JsonValue,
    indent: Option<usize>,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match indent {
        Some(width) => {
            let pad = vec![b' '; width];
            let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&pad));
            document.serialize(&mut ser)?;
        }
        None => serde_json::to_writer(&mut out, document)?,
    }
    out.flush()?;
    Ok(())
}
