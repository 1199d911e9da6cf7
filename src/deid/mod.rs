// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// De-identification of tabular healthcare data
//
// - Age generalization by fixed ranges or seeded random adjustment
// - K-anonymity enforcement over quasi-identifier columns
// - SHA-256 hashing and geographic truncation of sensitive fields
// - Column deletion, CSV import/export and step pipelines

pub mod age;
pub mod anonymity;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod masking;
pub mod pipeline;
#[cfg(feature = "python")]
pub mod python;
pub mod table;

pub use anonymity::{enforce_k_anonymity, AnonymityReport};
pub use config::{AgeStrategy, DeidConfig, OUTPUT_FILE_NAME, OUTPUT_MIME};
pub use error::{DeidError, Result, TableError};
pub use pipeline::{run_pipeline, PipelineSpec, Session, Step};
#[cfg(feature = "python")]
pub use python::DeidentifierRust;
pub use table::{Column, Table, Value};
