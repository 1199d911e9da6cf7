// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Configuration types for de-identification

use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;
use serde::{Deserialize, Serialize};

use super::error::Result;

/// Name of the derived column the k-anonymity enforcer builds on request
pub const AGE_GROUP_COLUMN: &str = "Age Group";

/// Default file name offered for the exported table
pub const OUTPUT_FILE_NAME: &str = "deidentified_data.csv";

/// MIME type of the exported table
pub const OUTPUT_MIME: &str = "text/csv";

/// Geographic columns offered for masking by default
pub const DEFAULT_GEO_COLUMNS: [&str; 4] =
    ["Performing Lab", "Clinic Location", "Region", "Clinic Name"];

/// How the age column is adjusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgeStrategy {
    #[default]
    AgeGroup, // Replace with range label (e.g., 21-30)
    RandomAdjust, // Add a seeded offset in [-radius, +radius]
}

impl AgeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeStrategy::AgeGroup => "age_group",
            AgeStrategy::RandomAdjust => "random_adjust",
        }
    }
}

impl FromStr for AgeStrategy {
    type Err = String;

    /// Accepts the snake/kebab-case names and the operator-facing labels
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "age_group" | "age-group" | "Age Group" => Ok(AgeStrategy::AgeGroup),
            "random_adjust" | "random-adjust" | "Randomly Adjust Age" => {
                Ok(AgeStrategy::RandomAdjust)
            }
            other => Err(format!("unknown age strategy '{}'", other)),
        }
    }
}

/// Configuration for de-identification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeidConfig {
    /// Age column the derived "Age Group" quasi-identifier is computed from
    pub age_source_column: String,

    /// k used when none is given (minimum 1)
    pub default_k: usize,

    // Random age adjustment
    pub jitter_seed: u64,
    pub jitter_radius: u32,

    /// Columns offered for geographic masking
    pub geo_column_choices: Vec<String>,

    /// Emit an info-level log line for each k-anonymity run
    pub log_reports: bool,
}

impl Default for DeidConfig {
    fn default() -> Self {
        Self {
            age_source_column: "Age at Colln".to_string(),
            default_k: 5,
            jitter_seed: 42,
            jitter_radius: 5,
            geo_column_choices: DEFAULT_GEO_COLUMNS.iter().map(|c| c.to_string()).collect(),
            log_reports: true,
        }
    }
}

impl DeidConfig {
    /// Parse configuration from JSON; absent keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Extract configuration from Python dict
    #[cfg(feature = "python")]
    pub fn from_py_dict(dict: &Bound<'_, PyDict>) -> PyResult<Self> {
        let mut config = Self::default();

        macro_rules! extract {
            ($field:ident) => {
                if let Some(value) = dict.get_item(stringify!($field))? {
                    config.$field = value.extract()?;
                }
            };
        }

        extract!(age_source_column);
        extract!(default_k);
        extract!(jitter_seed);
        extract!(jitter_radius);
        extract!(geo_column_choices);
        extract!(log_reports);

        if config.default_k == 0 {
            return Err(pyo3::exceptions::PyValueError::new_err(
                "default_k must be at least 1",
            ));
        }

        Ok(config)
    }
}
