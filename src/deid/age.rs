// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Age generalization: fixed range binning and seeded random adjustment

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::config::{AgeStrategy, DeidConfig, AGE_GROUP_COLUMN};
use super::error::{DeidError, Result};
use super::table::{Column, Table, Value};

/// Bin boundaries shared by every label set
///
/// Intervals are left-inclusive and right-exclusive, except that the final
/// boundary belongs to the last bin.
pub const AGE_EDGES: [f64; 11] = [
    0.0, 18.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0,
];

/// A label set for `AGE_EDGES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBins {
    pub labels: [&'static str; 10],
}

impl AgeBins {
    /// Labels used when the age column itself is generalized
    pub const STANDARD: AgeBins = AgeBins {
        labels: [
            "<18", "18-20", "21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "81-90", "91+",
        ],
    };

    /// Labels used for the derived "Age Group" quasi-identifier
    ///
    /// Differs from `STANDARD` only in the last label ("90+" vs "91+").
    pub const AGE_GROUP: AgeBins = AgeBins {
        labels: [
            "<18", "18-20", "21-30", "31-40", "41-50", "51-60", "61-70", "71-80", "81-90", "90+",
        ],
    };

    /// Label of the bin containing `age`, or `None` outside `[0, 100]`
    pub fn label(&self, age: f64) -> Option<&'static str> {
        let (first, last) = (AGE_EDGES[0], AGE_EDGES[AGE_EDGES.len() - 1]);
        if !(first..=last).contains(&age) {
            return None;
        }
        let idx = AGE_EDGES[1..AGE_EDGES.len() - 1]
            .iter()
            .take_while(|&&edge| age >= edge)
            .count();
        Some(self.labels[idx])
    }

    /// Label a cell; missing, text and out-of-range values become `Missing`
    pub fn label_value(&self, value: &Value) -> Value {
        value
            .as_number()
            .and_then(|age| self.label(age))
            .map_or(Value::Missing, Value::text)
    }
}

/// Replace every value of `column` with its range label
pub fn bin_ages(table: &mut Table, column: &str, bins: &AgeBins) -> Result<()> {
    table.map_column(column, |_, value| Ok(bins.label_value(value)))?;
    debug!(column, "binned age column");
    Ok(())
}

/// Write (or overwrite) the "Age Group" column derived from `source`
///
/// The source must hold numbers; a text cell (for example an age column
/// that was already binned) fails with `NotNumeric` and the table is left
/// untouched. Missing and out-of-range ages derive a missing label.
pub fn derive_age_group(table: &mut Table, source: &str) -> Result<()> {
    let labels = table
        .column(source)?
        .values()
        .iter()
        .enumerate()
        .map(|(row, value)| match value {
            Value::Text(text) => Err(DeidError::NotNumeric {
                column: source.to_string(),
                row,
                value: text.clone(),
            }),
            _ => Ok(AgeBins::AGE_GROUP.label_value(value)),
        })
        .collect::<Result<Vec<_>>>()?;
    table.set_column(Column::new(AGE_GROUP_COLUMN, labels))?;
    debug!(source, "derived age group column");
    Ok(())
}

/// The offsets `jitter_ages` adds, one per row in row order
pub fn jitter_offsets(rows: usize, seed: u64, radius: u32) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let radius = i64::from(radius);
    (0..rows).map(|_| rng.gen_range(-radius..=radius)).collect()
}

/// Add a seeded uniform integer offset in `[-radius, radius]` to every value
///
/// No clamping: results may be negative. Missing values stay missing but
/// still consume an offset, so the sequence only depends on row count.
pub fn jitter_ages(table: &mut Table, column: &str, seed: u64, radius: u32) -> Result<()> {
    let offsets = jitter_offsets(table.num_rows(), seed, radius);
    table.map_column(column, |row, value| match value {
        Value::Number(age) => Ok(Value::Number(age + offsets[row] as f64)),
        Value::Missing => Ok(Value::Missing),
        Value::Text(text) => Err(DeidError::NotNumeric {
            column: column.to_string(),
            row,
            value: text.clone(),
        }),
    })?;
    debug!(column, seed, radius, "randomly adjusted age column");
    Ok(())
}

/// Apply the selected age strategy to `column`
pub fn adjust_ages(
    table: &mut Table,
    column: &str,
    strategy: AgeStrategy,
    config: &DeidConfig,
) -> Result<()> {
    match strategy {
        AgeStrategy::AgeGroup => bin_ages(table, column, &AgeBins::STANDARD),
        AgeStrategy::RandomAdjust => {
            jitter_ages(table, column, config.jitter_seed, config.jitter_radius)
        }
    }
}
