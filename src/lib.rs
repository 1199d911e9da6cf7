// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// De-identification transforms for tabular healthcare data
// Usable from Rust, from the `deid` CLI, and from Python via PyO3

pub mod deid;

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module: deid_rust
///
/// De-identification transforms operating on CSV text.
///
/// # Examples
///
/// ```python
/// from deid_rust import DeidentifierRust
///
/// deid = DeidentifierRust({"default_k": 5})
///
/// csv_text = "Region,Age at Colln\nA,34\nA,36\nB,70\n"
/// print(deid.k_anonymity(csv_text, 2, ["Region"]))
/// # Region,Age at Colln
/// # A,34
/// # A,36
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn deid_rust(m: &Bound<'_, pyo3::types::PyModule>) -> PyResult<()> {
    m.add_class::<deid::DeidentifierRust>()?;

    // Export defaults
    m.add("OUTPUT_FILE_NAME", deid::OUTPUT_FILE_NAME)?;
    m.add("OUTPUT_MIME", deid::OUTPUT_MIME)?;

    // Module metadata
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add(
        "__doc__",
        "De-identification transforms for tabular healthcare data",
    )?;

    Ok(())
}
