// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// K-anonymity enforcement over quasi-identifier columns
//
// Rows are grouped by their quasi-identifier combination, groups smaller
// than k are suppressed and the surviving rows are kept in input order
// with every column intact.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::age::derive_age_group;
use super::config::AGE_GROUP_COLUMN;
use super::error::{DeidError, Result};
use super::table::{GroupKey, Table};

/// Summary of one enforcement run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnonymityReport {
    pub k: usize,
    pub quasi_identifiers: Vec<String>,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Groups with no missing quasi-identifier value
    pub groups_total: usize,
    pub groups_retained: usize,
}

impl AnonymityReport {
    pub fn rows_suppressed(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Deduplicate quasi-identifier names, first occurrence wins
pub fn normalize_quasi_identifiers<S: AsRef<str>>(columns: &[S]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    columns
        .iter()
        .map(|name| name.as_ref())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

fn has_missing(key: &GroupKey<'_>) -> bool {
    key.iter().any(|value| value.is_missing())
}

/// Keep only rows whose quasi-identifier group has at least `k` members
///
/// See `enforce_with_report`.
pub fn enforce_k_anonymity<S: AsRef<str>>(
    table: &Table,
    k: usize,
    columns: &[S],
    age_source: &str,
) -> Result<Table> {
    enforce_with_report(table, k, columns, age_source).map(|(table, _)| table)
}

/// Enforce k-anonymity and report what was suppressed
///
/// If `columns` names the "Age Group" sentinel, that column is first derived
/// from `age_source` and stays in the output; a text cell in `age_source`
/// fails the call with `NotNumeric`. Group sizes are computed once
/// on the input. Rows with a missing quasi-identifier value never belong to
/// a group and are always suppressed. An empty column list puts the whole
/// table in one group. When no group qualifies the result has zero rows but
/// keeps the input's columns.
pub fn enforce_with_report<S: AsRef<str>>(
    table: &Table,
    k: usize,
    columns: &[S],
    age_source: &str,
) -> Result<(Table, AnonymityReport)> {
    if k == 0 {
        return Err(DeidError::InvalidK(k));
    }

    let quasi_identifiers = normalize_quasi_identifiers(columns);
    let working = if quasi_identifiers.iter().any(|c| c == AGE_GROUP_COLUMN) {
        let mut derived = table.clone();
        derive_age_group(&mut derived, age_source)?;
        Cow::Owned(derived)
    } else {
        Cow::Borrowed(table)
    };

    let key_columns = working.column_indices(&quasi_identifiers)?;
    let counts = working.group_counts(&key_columns);
    let groups_total = counts.keys().filter(|key| !has_missing(key)).count();

    let valid: HashSet<GroupKey<'_>> = counts
        .into_iter()
        .filter(|(key, count)| *count >= k && !has_missing(key))
        .map(|(key, _)| key)
        .collect();

    let output = if valid.is_empty() {
        warn!(k, "no group meets the k-anonymity threshold, result is empty");
        working.empty_like()
    } else {
        working.join_on_keys(&key_columns, &valid)
    };

    let report = AnonymityReport {
        k,
        quasi_identifiers,
        rows_in: table.num_rows(),
        rows_out: output.num_rows(),
        groups_total,
        groups_retained: valid.len(),
    };
    debug!(?report, "k-anonymity enforced");

    Ok((output, report))
}

/// Size of the smallest group over `columns`, `None` for an empty table
///
/// Missing values group with each other here, so the level of a table that
/// still contains them is measured rather than hidden.
pub fn anonymity_level<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Option<usize>> {
    let quasi_identifiers = normalize_quasi_identifiers(columns);
    let key_columns = table.column_indices(&quasi_identifiers)?;
    Ok(table.group_counts(&key_columns).into_values().min())
}

/// Whether every group over `columns` has at least `k` rows
pub fn is_k_anonymous<S: AsRef<str>>(table: &Table, columns: &[S], k: usize) -> Result<bool> {
    Ok(anonymity_level(table, columns)?.map_or(true, |level| level >= k))
}
