// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// CSV loading and export (comma separated, UTF-8, header row)

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, Writer};
use tracing::debug;

use super::error::Result;
use super::table::{format_number, Column, Table, Value};

/// Cell contents read as missing
pub const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing_token(field: &str) -> bool {
    MISSING_TOKENS.contains(&field)
}

fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Turn raw fields into typed cells
///
/// A column is numeric when every non-missing field parses as a finite
/// number; otherwise its non-missing fields are all kept as text.
fn infer_column(name: String, fields: Vec<String>) -> Column {
    let numeric = fields
        .iter()
        .filter(|f| !is_missing_token(f))
        .all(|f| parse_number(f).is_some());

    let values = fields
        .into_iter()
        .map(|field| {
            if is_missing_token(&field) {
                Value::Missing
            } else if numeric {
                parse_number(&field).map_or(Value::Missing, Value::Number)
            } else {
                Value::Text(field)
            }
        })
        .collect();

    Column::new(name, values)
}

/// Load a table from CSV with a header row
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut fields: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in rdr.records() {
        let record = record?;
        for (column, field) in fields.iter_mut().zip(record.iter()) {
            column.push(field.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(fields)
        .map(|(name, values)| infer_column(name, values))
        .collect();
    let table = Table::new(columns)?;

    debug!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        "loaded CSV"
    );
    Ok(table)
}

pub fn read_csv_path(path: &Path) -> Result<Table> {
    read_csv(File::open(path)?)
}

pub fn read_csv_str(text: &str) -> Result<Table> {
    read_csv(text.as_bytes())
}

fn render_field(value: &Value) -> String {
    match value {
        Value::Missing => String::new(),
        Value::Number(n) => format_number(*n),
        Value::Text(s) => s.clone(),
    }
}

/// Write a table as CSV with a header row; missing cells are empty fields
///
/// A table without columns is written as an empty file.
pub fn write_csv<W: Write>(writer: W, table: &Table) -> Result<()> {
    if table.num_columns() == 0 {
        return Ok(());
    }
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(table.column_names())?;
    for row in 0..table.num_rows() {
        wtr.write_record(table.row(row).map(render_field))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_path(path: &Path, table: &Table) -> Result<()> {
    write_csv(File::create(path)?, table)?;
    debug!(path = %path.display(), rows = table.num_rows(), "wrote CSV");
    Ok(())
}

pub fn write_csv_string(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, table)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}
