// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error types for de-identification transforms

use thiserror::Error;

/// Shape and lookup failures of the in-memory table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Main error type for de-identification operations
#[derive(Error, Debug)]
pub enum DeidError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("column '{column}' row {row}: expected a number, found text '{value}'")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("column '{column}' row {row}: expected text, found a number")]
    NotText { column: String, row: usize },

    #[error("'{column}' is not a geographic column, choose from: {}", .choices.join(", "))]
    NotGeographic {
        column: String,
        choices: Vec<String>,
    },

    #[error("k must be at least 1, got {0}")]
    InvalidK(usize),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl DeidError {
    /// True for errors caused by referencing a column the table does not have
    pub fn is_lookup(&self) -> bool {
        matches!(self, DeidError::Table(TableError::ColumnNotFound(_)))
    }

    /// True for errors caused by a cell of the wrong type
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            DeidError::NotNumeric { .. } | DeidError::NotText { .. }
        )
    }
}

/// Result type for de-identification operations
pub type Result<T> = std::result::Result<T, DeidError>;
