use std::fs;
use std::path::Path;

use ::csv::{ReaderBuilder, StringRecord};

use crate::error::Result;
use crate::io::{build_series, LoaderOptions, RawCell};
use crate::temporal::TimeSeries;

/// Read a (timestamp, value) series from a CSV file laid out like the spreadsheet
///
/// The first `options.skip_rows` lines (plus the header when `options.header`)
/// are discarded; only the first two fields of each remaining record are used.
/// Rows are physical lines, so blank lines count towards the skipped preamble
/// and towards row numbers in errors. Quoted fields may not span lines.
pub fn read_csv_series<P: AsRef<Path>>(path: P, options: &LoaderOptions) -> Result<TimeSeries> {
    let text = fs::read_to_string(path.as_ref())?;
    let builder = {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .trim(::csv::Trim::All);
        builder
    };

    let first_data_row = options.first_data_row();
    let mut records = Vec::new();
    for (sheet_row, line) in text.lines().enumerate().skip(first_data_row) {
        // The csv reader drops blank lines, so each line is parsed on its own
        let mut record = StringRecord::new();
        builder.from_reader(line.as_bytes()).read_record(&mut record)?;
        records.push((sheet_row, record));
    }

    let cells = records.iter().map(|(sheet_row, record)| {
        let cell = |i: usize| match record.get(i) {
            Some(s) if !s.is_empty() => RawCell::Text(s),
            _ => RawCell::Empty,
        };
        (*sheet_row, cell(0), cell(1))
    });
    build_series(cells, options.name.clone())
}
