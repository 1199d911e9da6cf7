// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// In-memory columnar table with schema-validated column access

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use super::error::{DeidError, TableError};

/// Text used for missing values when a cell has to be rendered as text
pub const MISSING_TEXT: &str = "nan";

/// A single cell
///
/// Numbers are always finite; anything that is not a number is stored as
/// `Missing` instead of NaN so that values can be grouped by equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    /// Build a numeric cell, mapping non-finite input to `Missing`
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            Value::Number(n)
        } else {
            Value::Missing
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Explicit text conversion used before hashing
    ///
    /// Integral numbers render without a fractional part (`34`), other
    /// numbers in shortest round-trip form (`34.5`), missing as `"nan"`.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Missing => Cow::Borrowed(MISSING_TEXT),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Missing => {}
            // -0.0 + 0.0 == +0.0, keeps Hash consistent with PartialEq
            Value::Number(n) => (n + 0.0).to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Semantic type of a column, derived from its cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
    Mixed,
    /// Every cell is missing (or the column has no rows)
    Empty,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
            ColumnKind::Mixed => "mixed",
            ColumnKind::Empty => "empty",
        }
    }
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        let mut numbers = false;
        let mut texts = false;
        for value in &self.values {
            match value {
                Value::Number(_) => numbers = true,
                Value::Text(_) => texts = true,
                Value::Missing => {}
            }
        }
        match (numbers, texts) {
            (true, true) => ColumnKind::Mixed,
            (true, false) => ColumnKind::Numeric,
            (false, true) => ColumnKind::Text,
            (false, false) => ColumnKind::Empty,
        }
    }
}

/// Ordered collection of equally long, uniquely named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

/// Group key over a set of columns: one borrowed cell per key column
pub type GroupKey<'a> = Vec<&'a Value>;

impl Table {
    /// Build a table, validating unique names and equal column lengths
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let rows = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != rows {
                return Err(TableError::LengthMismatch {
                    column: column.name().to_string(),
                    expected: rows,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column, TableError> {
        Ok(&self.columns[self.column_index(name)?])
    }

    /// Resolve several names at once; fails on the first unknown name
    pub fn column_indices<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, TableError> {
        names
            .iter()
            .map(|name| self.column_index(name.as_ref()))
            .collect()
    }

    /// Cells of one row, in column order
    pub fn row(&self, row: usize) -> impl Iterator<Item = &Value> + '_ {
        self.columns.iter().map(move |c| &c.values[row])
    }

    /// Replace the column of the same name in place, or append it
    pub fn set_column(&mut self, column: Column) -> Result<(), TableError> {
        if !self.columns.is_empty() && column.len() != self.rows {
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.rows,
                actual: column.values.len(),
            });
        }
        if self.columns.is_empty() {
            self.rows = column.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Rewrite every cell of one column
    ///
    /// The closure receives the row index and the old cell. Either every cell
    /// is rewritten or, on the first error, the column is left untouched.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<(), DeidError>
    where
        F: FnMut(usize, &Value) -> Result<Value, DeidError>,
    {
        let idx = self.column_index(name)?;
        let rewritten = self.columns[idx]
            .values
            .iter()
            .enumerate()
            .map(|(row, value)| f(row, value))
            .collect::<Result<Vec<_>, _>>()?;
        self.columns[idx].values = rewritten;
        Ok(())
    }

    /// Remove the named columns
    ///
    /// Fails with `ColumnNotFound` if any name is absent, in which case no
    /// column is removed. Removing the last column leaves an empty table.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), TableError> {
        self.column_indices(names)?;
        self.columns
            .retain(|c| !names.iter().any(|name| name.as_ref() == c.name));
        if self.columns.is_empty() {
            self.rows = 0;
        }
        Ok(())
    }

    /// New table with only the named columns, in the requested order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table, TableError> {
        let columns = self
            .column_indices(names)?
            .into_iter()
            .map(|idx| self.columns[idx].clone())
            .collect();
        Table::new(columns)
    }

    /// New table with the given rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            rows: indices.len(),
        }
    }

    /// New table with the rows for which `predicate(row)` holds
    pub fn filter_rows<P>(&self, mut predicate: P) -> Table
    where
        P: FnMut(usize) -> bool,
    {
        let kept: Vec<usize> = (0..self.rows).filter(|&row| predicate(row)).collect();
        self.take_rows(&kept)
    }

    /// Zero-row table with the same schema
    pub fn empty_like(&self) -> Table {
        self.take_rows(&[])
    }

    /// Key of one row over the given column indices
    pub fn group_key(&self, row: usize, key_columns: &[usize]) -> GroupKey<'_> {
        key_columns
            .iter()
            .map(|&idx| &self.columns[idx].values[row])
            .collect()
    }

    /// Row count of every distinct key over the given column indices
    pub fn group_counts(&self, key_columns: &[usize]) -> HashMap<GroupKey<'_>, usize> {
        let mut counts: HashMap<GroupKey<'_>, usize> = HashMap::new();
        for row in 0..self.rows {
            *counts.entry(self.group_key(row, key_columns)).or_default() += 1;
        }
        counts
    }

    /// Inner join against a set of key combinations
    ///
    /// Keeps every column and the input row order; rows whose key is not in
    /// `keys` are dropped.
    pub fn join_on_keys(&self, key_columns: &[usize], keys: &HashSet<GroupKey<'_>>) -> Table {
        self.filter_rows(|row| keys.contains(&self.group_key(row, key_columns)))
    }
}
