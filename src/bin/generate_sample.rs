use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use tabular_io::{format_preview, load_multiple_datasets, save_auto, validate_columns, DEFAULT_PREVIEW_ROWS};

/// One row per (store, week); amounts follow a fixed weekly step per store.
fn sample_table() -> Result<RecordBatch> {
    let stores = ["North", "South", "East"];
    let weeks = 1..=4;

    let mut ids = Vec::new();
    let mut names = Vec::new();
    let mut amounts = Vec::new();
    for (i, store) in stores.iter().enumerate() {
        for week in weeks.clone() {
            ids.push((i as i64) * 100 + week);
            names.push(*store);
            let base = 1000.0 + 250.0 * i as f64;
            amounts.push(base + 37.5 * week as f64 + 12.25 * ((week * 7 + i as i64) % 5) as f64);
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("record_id", DataType::Int64, false),
        Field::new("store", DataType::Utf8, false),
        Field::new("amount", DataType::Float64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(StringArray::from(names)),
        Arc::new(Float64Array::from(amounts)),
    ];
    RecordBatch::try_new(schema, columns).context("building sample table")
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let table = sample_table()?;

    let targets: Vec<(&str, PathBuf)> = ["csv", "json", "xlsx"]
        .into_iter()
        .map(|ext| (ext, out_dir.join(Path::new("sample_data").with_extension(ext))))
        .collect();
    for (_, path) in &targets {
        save_auto(&table, path, false).with_context(|| format!("writing {}", path.display()))?;
    }

    let datasets = load_multiple_datasets(targets.clone()).context("reloading samples")?;
    for (name, loaded) in &datasets {
        validate_columns(loaded, &["record_id", "store", "amount"])?;
        println!("{name}:\n{}", format_preview(loaded, DEFAULT_PREVIEW_ROWS)?);
    }

    println!(
        "Wrote {} rows to {} files in {}",
        table.num_rows(),
        targets.len(),
        out_dir.display()
    );
    Ok(())
}
