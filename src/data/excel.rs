use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Float64Type, Schema, TimeUnit, TimestampMillisecondType};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use calamine::{open_workbook_auto_from_rs, Data, DataType as _, Range, Reader};
use rust_xlsxwriter::{Format as CellFormat, Workbook};

use super::model::{SheetSelector, Table};

// ---------------------------------------------------------------------------
// Reading: workbook bytes → Table
// ---------------------------------------------------------------------------

/// Parse one worksheet out of raw workbook bytes.
///
/// The workbook kind (xlsx, xls, ods, …) is sniffed from the content, so a
/// file's extension does not have to match what is inside it.
pub(crate) fn read_sheet(bytes: Vec<u8>, sheet: &SheetSelector) -> anyhow::Result<Table> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).context("opening workbook")?;

    let range = match sheet {
        SheetSelector::Index(i) => workbook
            .worksheet_range_at(*i)
            .with_context(|| format!("no worksheet at index {i}"))?
            .with_context(|| format!("reading worksheet {i}"))?,
        SheetSelector::Name(name) => workbook
            .worksheet_range(name)
            .with_context(|| format!("reading worksheet '{name}'"))?,
    };

    range_to_table(&range)
}

/// First row is the header; every following row is data.
fn range_to_table(range: &Range<Data>) -> anyhow::Result<Table> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut fields = Vec::with_capacity(header.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(header.len());

    for (col, head) in header.iter().enumerate() {
        let name = match head.to_string() {
            blank if blank.is_empty() => format!("Unnamed: {col}"),
            name => name,
        };
        let cells: Vec<&Data> = body.iter().map(|row| row.get(col).unwrap_or(&Data::Empty)).collect();
        let array = column_from_cells(&cells);
        fields.push(Field::new(name, array.data_type().clone(), true));
        columns.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context("assembling sheet table")
}

fn is_integral(cell: &Data) -> bool {
    match cell {
        Data::Int(_) => true,
        Data::Float(f) => f.fract() == 0.0 && f.abs() < i64::MAX as f64,
        _ => false,
    }
}

fn is_datetime(cell: &Data) -> bool {
    match cell {
        Data::DateTime(dt) => dt.is_datetime(),
        Data::DateTimeIso(_) => true,
        _ => false,
    }
}

/// Milliseconds since the Unix epoch; `None` for cells without a calendar value.
fn cell_millis(cell: &Data) -> Option<i64> {
    cell.as_datetime().map(|dt| dt.and_utc().timestamp_millis())
}

/// Pick the narrowest column type every non-empty cell fits into.
fn column_from_cells(cells: &[&Data]) -> ArrayRef {
    let mut filled = cells.iter().filter(|c| !matches!(c, Data::Empty)).peekable();
    if filled.peek().is_none() {
        return Arc::new(StringArray::from(vec![None::<String>; cells.len()]));
    }
    let filled: Vec<&Data> = filled.copied().collect();

    if filled.iter().all(|c| is_integral(c)) {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i),
                Data::Float(f) => Some(*f as i64),
                _ => None,
            })
            .collect();
        return Arc::new(Int64Array::from(values));
    }

    if filled.iter().all(|c| matches!(c, Data::Int(_) | Data::Float(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(i) => Some(*i as f64),
                Data::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        return Arc::new(Float64Array::from(values));
    }

    if filled.iter().all(|c| matches!(c, Data::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(b) => Some(*b),
                _ => None,
            })
            .collect();
        return Arc::new(BooleanArray::from(values));
    }

    if filled.iter().all(|c| is_datetime(c)) {
        let stamps: Option<Vec<Option<i64>>> = cells
            .iter()
            .map(|c| match c {
                Data::Empty => Some(None),
                cell => cell_millis(cell).map(Some),
            })
            .collect();
        if let Some(stamps) = stamps {
            return Arc::new(TimestampMillisecondArray::from(stamps));
        }
    }

    let texts: Vec<Option<String>> = cells
        .iter()
        .map(|c| match c {
            Data::Empty => None,
            Data::String(s) | Data::DateTimeIso(s) => Some(s.clone()),
            Data::DateTime(serial) if serial.is_datetime() => Some(
                serial
                    .as_datetime()
                    .map_or_else(|| c.to_string(), |stamp| stamp.to_string()),
            ),
            other => Some(other.to_string()),
        })
        .collect();
    Arc::new(StringArray::from(texts))
}

// ---------------------------------------------------------------------------
// Writing: Table → .xlsx
// ---------------------------------------------------------------------------

/// Write `table` as the single worksheet `sheet_name` of a new workbook.
///
/// Numeric columns become number cells and booleans boolean cells. Dates and
/// timestamps become date-formatted serial numbers, anything else its display
/// text. Nulls are left blank.
pub(crate) fn write_sheet(table: &Table, path: &Path, sheet_name: &str) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    let options = FormatOptions::default();
    let date_format = CellFormat::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    for (col, field) in table.schema().fields().iter().enumerate() {
        let Ok(col_num) = u16::try_from(col) else {
            bail!("table has more columns than a worksheet holds");
        };
        sheet.write_string(0, col_num, field.name())?;

        let array = table.column(col);
        let cells = SheetColumn::new(array, &options)?;
        for row in 0..array.len() {
            if array.is_null(row) {
                continue;
            }
            let Ok(row_num) = u32::try_from(row + 1) else {
                bail!("table has more rows than a worksheet holds");
            };
            match &cells {
                SheetColumn::Bool(values) => {
                    sheet.write_boolean(row_num, col_num, values.value(row))?;
                }
                SheetColumn::Number(values) => {
                    sheet.write_number(row_num, col_num, values.as_primitive::<Float64Type>().value(row))?;
                }
                SheetColumn::Date(values) => {
                    let millis = values.as_primitive::<TimestampMillisecondType>().value(row);
                    sheet.write_number_with_format(row_num, col_num, excel_serial(millis), &date_format)?;
                }
                SheetColumn::Text(formatter) => {
                    sheet.write_string(row_num, col_num, formatter.value(row).to_string())?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Days since 1899-12-30, the 1900 date system's day zero.
fn excel_serial(millis: i64) -> f64 {
    const UNIX_EPOCH_SERIAL: f64 = 25_569.0;
    millis as f64 / 86_400_000.0 + UNIX_EPOCH_SERIAL
}

/// How the cells of one column land in the worksheet.
enum SheetColumn<'a> {
    Bool(&'a BooleanArray),
    Number(ArrayRef),
    /// Cast to millisecond timestamps.
    Date(ArrayRef),
    Text(ArrayFormatter<'a>),
}

impl<'a> SheetColumn<'a> {
    fn new(array: &'a ArrayRef, options: &'a FormatOptions<'a>) -> anyhow::Result<Self> {
        Ok(match array.data_type() {
            DataType::Boolean => SheetColumn::Bool(array.as_boolean()),
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
                let millis = DataType::Timestamp(TimeUnit::Millisecond, None);
                SheetColumn::Date(cast(array.as_ref(), &millis)?)
            }
            dt if dt.is_numeric() => SheetColumn::Number(cast(array.as_ref(), &DataType::Float64)?),
            _ => SheetColumn::Text(ArrayFormatter::try_new(array.as_ref(), options)?),
        })
    }
}
