use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Reader};

use crate::error::{Error, Result};
use crate::io::{build_series, LoaderOptions, RawCell};
use crate::temporal::TimeSeries;

/// Read a (timestamp, value) series from a spreadsheet (.xlsx, .xls, .ods, ...)
///
/// # Arguments
///
/// * `path` - Path of the workbook
/// * `options` - Sheet selection and number of leading rows to skip
///
/// Rows are counted from the top of the sheet, so blank leading rows count
/// towards `skip_rows` just like metadata rows do.
///
/// # Example
///
/// ```no_run
/// use energy_forecast::io::{read_excel_series, LoaderOptions};
///
/// let series = read_excel_series("data.xlsx", &LoaderOptions::default()).unwrap();
/// println!("{} rows", series.len());
/// ```
pub fn read_excel_series<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> Result<TimeSeries> {
    let mut workbook = open_workbook_auto(path.as_ref())?;

    let sheet_name = match &options.sheet {
        Some(name) => name.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Spreadsheet("Workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| Error::Spreadsheet(format!("Could not read sheet '{}': {}", sheet_name, e)))?;

    // The range starts at the first used cell, not at A1
    let (start_row, _) = range.start().unwrap_or((0, 0));
    let first_data_row = options.first_data_row();

    let cells = range.rows().enumerate().filter_map(|(i, row)| {
        let sheet_row = start_row as usize + i;
        if sheet_row < first_data_row {
            return None;
        }
        let cell = |c: usize| row.get(c).map(to_raw_cell).unwrap_or(RawCell::Empty);
        Some((sheet_row, cell(0), cell(1)))
    });
    build_series(cells, options.name.clone())
}

/// Names of all sheets in a workbook
pub fn list_sheet_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path.as_ref())?;
    Ok(workbook.sheet_names())
}

fn to_raw_cell(cell: &Data) -> RawCell<'_> {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(s) | Data::DateTimeIso(s) => RawCell::Text(s),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => RawCell::DateTime(dt),
            None => RawCell::Text(""),
        },
        Data::Bool(b) => RawCell::Text(if *b { "true" } else { "false" }),
        Data::DurationIso(s) => RawCell::Text(s),
        Data::Error(_) => RawCell::Text("#ERROR"),
    }
}
