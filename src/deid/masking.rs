// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Sensitive-field masking: one-way hashing and geographic truncation

use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::{DeidError, Result};
use super::table::{Table, Value};

/// Prefix written in front of every masked geographic value
pub const GEO_PREFIX: &str = "De-identified ";

/// Hex SHA-256 of the UTF-8 text form of a cell
///
/// Uses `Value::to_text`, so missing values hash as `"nan"`.
pub fn hash_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_text().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Geographic truncation of a single text value
///
/// Keeps everything before the first comma: `"Springfield, IL"` becomes
/// `"De-identified Springfield"`.
pub fn mask_geo_value(value: &str) -> String {
    let head = value.split(',').next().unwrap_or(value);
    format!("{}{}", GEO_PREFIX, head)
}

/// Replace every cell of the listed columns with its digest
///
/// All columns are resolved before any is rewritten.
pub fn hash_columns<S: AsRef<str>>(table: &mut Table, columns: &[S]) -> Result<()> {
    table.column_indices(columns)?;
    for column in columns {
        let column = column.as_ref();
        table.map_column(column, |_, value| Ok(Value::Text(hash_value(value))))?;
        debug!(column, "hashed column");
    }
    Ok(())
}

/// Mask the listed geographic columns
///
/// Missing cells pass through unchanged. A numeric cell fails with
/// `NotText`; the table is only modified if every column succeeds.
pub fn mask_geo_columns<S: AsRef<str>>(table: &mut Table, columns: &[S]) -> Result<()> {
    let mut masked = table.clone();
    for column in columns {
        let column = column.as_ref();
        masked.map_column(column, |row, value| match value {
            Value::Text(text) => Ok(Value::Text(mask_geo_value(text))),
            Value::Missing => Ok(Value::Missing),
            Value::Number(_) => Err(DeidError::NotText {
                column: column.to_string(),
                row,
            }),
        })?;
        debug!(column, "masked geographic column");
    }
    *table = masked;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deid::table::Column;

    fn clinics() -> Table {
        Table::new(vec![
            Column::new(
                "Clinic Location",
                vec![
                    "Springfield, IL".into(),
                    "NoCommaValue".into(),
                    Value::Missing,
                ],
            ),
            Column::new("Patient ID", vec![1001i64.into(), 1002i64.into(), 1001i64.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_mask_geo_value() {
        assert_eq!(mask_geo_value("Springfield, IL"), "De-identified Springfield");
        assert_eq!(mask_geo_value("NoCommaValue"), "De-identified NoCommaValue");
        assert_eq!(mask_geo_value(",leading"), "De-identified ");
        assert_eq!(mask_geo_value(""), "De-identified ");
    }

    #[test]
    fn test_mask_geo_columns_skips_missing() {
        let mut table = clinics();
        mask_geo_columns(&mut table, &["Clinic Location"]).unwrap();
        assert_eq!(
            table.column("Clinic Location").unwrap().values(),
            &[
                Value::text("De-identified Springfield"),
                Value::text("De-identified NoCommaValue"),
                Value::Missing,
            ]
        );
    }

    #[test]
    fn test_mask_geo_rejects_numbers_without_partial_write() {
        let mut table = clinics();
        let err = mask_geo_columns(&mut table, &["Clinic Location", "Patient ID"]).unwrap_err();
        assert!(matches!(err, DeidError::NotText { row: 0, .. }));
        assert_eq!(table, clinics());
    }

    #[test]
    fn test_hash_value() {
        // sha256("abc")
        assert_eq!(
            hash_value(&Value::text("abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_value(&Value::Number(1001.0)), hash_value(&Value::text("1001")));
        assert_eq!(hash_value(&Value::Missing), hash_value(&Value::text("nan")));
        assert_eq!(hash_value(&Value::text("x")).len(), 64);
    }

    #[test]
    fn test_hash_columns_is_deterministic() {
        let mut table = clinics();
        hash_columns(&mut table, &["Patient ID"]).unwrap();

        let ids = table.column("Patient ID").unwrap().values();
        assert_eq!(ids[0], ids[2]);
        assert_ne!(ids[0], ids[1]);
        assert!(ids.iter().all(|v| v.as_text().map_or(false, |s| s.len() == 64)));
    }

    #[test]
    fn test_hash_unknown_column_changes_nothing() {
        let mut table = clinics();
        let err = hash_columns(&mut table, &["Patient ID", "SSN"]).unwrap_err();
        assert!(err.is_lookup());
        assert_eq!(table, clinics());
    }
}
