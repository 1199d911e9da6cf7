// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// PyO3 bindings: de-identification transforms over CSV text

use pyo3::exceptions::{PyKeyError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::config::{AgeStrategy, DeidConfig};
use super::csv_io::{read_csv_str, write_csv_string};
use super::error::{DeidError, Result};
use super::pipeline::{apply_step, run_pipeline, PipelineSpec, Step};

fn to_py_err(err: DeidError) -> PyErr {
    if err.is_lookup() {
        PyKeyError::new_err(err.to_string())
    } else if err.is_type() {
        PyTypeError::new_err(err.to_string())
    } else {
        PyValueError::new_err(err.to_string())
    }
}

/// De-identifier exposed to Python
///
/// Every method takes CSV text and returns the transformed CSV text, so the
/// host never shares a table with Rust.
///
/// # Example (Python)
/// ```python
/// from deid_rust import DeidentifierRust, OUTPUT_FILE_NAME
///
/// deid = DeidentifierRust({"age_source_column": "Age at Colln"})
/// csv_text = deid.group_ages(csv_text, "Age at Colln")
/// csv_text = deid.k_anonymity(csv_text, 5, ["Region", "Age Group"])
/// csv_text = deid.mask_geo(csv_text, ["Clinic Location"])
/// open(OUTPUT_FILE_NAME, "w").write(csv_text)
/// ```
#[pyclass]
pub struct DeidentifierRust {
    config: DeidConfig,
}

#[pymethods]
impl DeidentifierRust {
    /// Create a de-identifier
    ///
    /// # Configuration Keys
    /// * `age_source_column` (str): column "Age Group" is derived from
    /// * `default_k` (int): k used by the operator form (minimum 1)
    /// * `jitter_seed` (int): seed for random age adjustment (default 42)
    /// * `jitter_radius` (int): maximum absolute age offset (default 5)
    /// * `geo_column_choices` (list[str]): geographic columns offered for masking
    /// * `log_reports` (bool): log a line per k-anonymity run
    #[new]
    #[pyo3(signature = (config_dict=None))]
    pub fn new(config_dict: Option<&Bound<'_, PyDict>>) -> PyResult<Self> {
        let config = match config_dict {
            Some(dict) => DeidConfig::from_py_dict(dict)?,
            None => DeidConfig::default(),
        };
        Ok(Self { config })
    }

    #[getter]
    pub fn default_k(&self) -> usize {
        self.config.default_k
    }

    #[getter]
    pub fn geo_column_choices(&self) -> Vec<String> {
        self.config.geo_column_choices.clone()
    }

    /// Replace ages with range labels ("<18" ... "91+")
    pub fn group_ages(&self, csv: &str, column: &str) -> PyResult<String> {
        self.adjust(csv, column, AgeStrategy::AgeGroup)
    }

    /// Apply an age strategy by name ("age_group" or "random_adjust")
    pub fn adjust_ages(&self, csv: &str, column: &str, strategy: &str) -> PyResult<String> {
        let strategy = strategy
            .parse::<AgeStrategy>()
            .map_err(PyValueError::new_err)?;
        self.adjust(csv, column, strategy)
    }

    pub fn k_anonymity(&self, csv: &str, k: usize, columns: Vec<String>) -> PyResult<String> {
        self.apply(csv, &Step::KAnonymity { k, columns })
            .map_err(to_py_err)
    }

    pub fn hash_columns(&self, csv: &str, columns: Vec<String>) -> PyResult<String> {
        self.apply(csv, &Step::Hash { columns }).map_err(to_py_err)
    }

    /// Mask geographic columns; each must be one of `geo_column_choices`
    pub fn mask_geo(&self, csv: &str, columns: Vec<String>) -> PyResult<String> {
        self.apply(csv, &Step::MaskGeo { columns }).map_err(to_py_err)
    }

    pub fn drop_columns(&self, csv: &str, columns: Vec<String>) -> PyResult<String> {
        self.apply(csv, &Step::DropColumns { columns })
            .map_err(to_py_err)
    }

    /// Run a JSON pipeline (`{"steps": [{"type": "k_anonymity", ...}]}`)
    pub fn run(&self, csv: &str, pipeline_json: &str) -> PyResult<String> {
        let run = || -> Result<String> {
            let spec = PipelineSpec::from_json_str(pipeline_json)?;
            let output = run_pipeline(&spec, read_csv_str(csv)?, &self.config)?;
            write_csv_string(&output.table)
        };
        run().map_err(to_py_err)
    }
}

// Internal methods
impl DeidentifierRust {
    fn adjust(&self, csv: &str, column: &str, strategy: AgeStrategy) -> PyResult<String> {
        let step = Step::AdjustAge {
            column: column.to_string(),
            strategy,
        };
        self.apply(csv, &step).map_err(to_py_err)
    }

    fn apply(&self, csv: &str, step: &Step) -> Result<String> {
        let table = read_csv_str(csv)?;
        let (output, _) = apply_step(&table, step, &self.config)?;
        write_csv_string(&output)
    }
}
