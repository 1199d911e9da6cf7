// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// De-identification pipeline: ordered steps applied to an owned table

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::age::adjust_ages;
use super::anonymity::{enforce_with_report, AnonymityReport};
use super::config::{AgeStrategy, DeidConfig};
use super::error::{DeidError, Result};
use super::masking::{hash_columns, mask_geo_columns};
use super::table::Table;

/// One operator action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    AdjustAge {
        column: String,
        #[serde(default)]
        strategy: AgeStrategy,
    },
    KAnonymity {
        k: usize,
        #[serde(default)]
        columns: Vec<String>,
    },
    MaskGeo {
        columns: Vec<String>,
    },
    Hash {
        columns: Vec<String>,
    },
    DropColumns {
        columns: Vec<String>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AdjustAge { .. } => "adjust_age",
            Step::KAnonymity { .. } => "k_anonymity",
            Step::MaskGeo { .. } => "mask_geo",
            Step::Hash { .. } => "hash",
            Step::DropColumns { .. } => "drop_columns",
        }
    }
}

/// Named, ordered list of steps; the JSON form of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<Step>,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// What a single applied step did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_after: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymity: Option<AnonymityReport>,
}

/// Apply one step to a table, returning the new table
///
/// The input is never modified, so a failing step leaves the caller's
/// table as it was.
pub fn apply_step(
    table: &Table,
    step: &Step,
    config: &DeidConfig,
) -> Result<(Table, Option<AnonymityReport>)> {
    match step {
        Step::KAnonymity { k, columns } => {
            let (output, report) =
                enforce_with_report(table, *k, columns, &config.age_source_column)?;
            if config.log_reports {
                info!(
                    k = report.k,
                    quasi_identifiers = ?report.quasi_identifiers,
                    rows_in = report.rows_in,
                    rows_out = report.rows_out,
                    groups_retained = report.groups_retained,
                    groups_total = report.groups_total,
                    "applied k-anonymity"
                );
            }
            Ok((output, Some(report)))
        }
        Step::AdjustAge { column, strategy } => {
            on_copy(table, |next| adjust_ages(next, column, *strategy, config))
        }
        Step::MaskGeo { columns } => {
            check_geo_columns(columns, config)?;
            on_copy(table, |next| mask_geo_columns(next, columns))
        }
        Step::Hash { columns } => on_copy(table, |next| hash_columns(next, columns)),
        Step::DropColumns { columns } => on_copy(table, |next| Ok(next.drop_columns(columns)?)),
    }
}

/// Only columns listed in `geo_column_choices` may be masked
fn check_geo_columns(columns: &[String], config: &DeidConfig) -> Result<()> {
    match columns
        .iter()
        .find(|c| !config.geo_column_choices.contains(*c))
    {
        Some(column) => Err(DeidError::NotGeographic {
            column: column.clone(),
            choices: config.geo_column_choices.clone(),
        }),
        None => Ok(()),
    }
}

fn on_copy<F>(table: &Table, transform: F) -> Result<(Table, Option<AnonymityReport>)>
where
    F: FnOnce(&mut Table) -> Result<()>,
{
    let mut next = table.clone();
    transform(&mut next)?;
    Ok((next, None))
}

/// The table of one operator session and the steps applied to it
///
/// Each `apply` is all-or-nothing: the current table is replaced only when
/// the step succeeds.
#[derive(Debug, Clone)]
pub struct Session {
    table: Table,
    config: DeidConfig,
    history: Vec<StepReport>,
}

impl Session {
    pub fn new(table: Table, config: DeidConfig) -> Self {
        Self {
            table,
            config,
            history: Vec::new(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn history(&self) -> &[StepReport] {
        &self.history
    }

    pub fn into_table(self) -> Table {
        self.table
    }

    pub fn apply(&mut self, step: &Step) -> Result<&StepReport> {
        let (next, anonymity) = apply_step(&self.table, step, &self.config)?;
        let report = StepReport {
            step: step.name(),
            rows_before: self.table.num_rows(),
            rows_after: next.num_rows(),
            columns_after: next.num_columns(),
            anonymity,
        };
        debug!(step = report.step, rows = report.rows_after, "step applied");

        self.table = next;
        self.history.push(report);
        Ok(&self.history[self.history.len() - 1])
    }
}

/// Result of running a whole pipeline
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub table: Table,
    pub steps: Vec<StepReport>,
}

/// Apply every step in order, stopping at the first failure
pub fn run_pipeline(spec: &PipelineSpec, table: Table, config: &DeidConfig) -> Result<RunOutput> {
    let mut session = Session::new(table, config.clone());
    for step in &spec.steps {
        session.apply(step)?;
    }
    let steps = session.history().to_vec();
    info!(
        pipeline = %spec.name,
        steps = steps.len(),
        rows = session.table().num_rows(),
        "pipeline finished"
    );
    Ok(RunOutput {
        table: session.into_table(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deid::table::{Column, Value};

    fn patients() -> Table {
        Table::new(vec![
            Column::new(
                "Age at Colln",
                vec![34i64.into(), 36i64.into(), 38i64.into(), 72i64.into()],
            ),
            Column::new(
                "Region",
                vec!["North, X".into(), "North, Y".into(), "North".into(), "South".into()],
            ),
            Column::new("Name", vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_step_json_shape() {
        let spec = PipelineSpec::from_json_str(
            r#"{
                "name": "clinic export",
                "steps": [
                    {"type": "adjust_age", "column": "Age at Colln", "strategy": "random_adjust"},
                    {"type": "k_anonymity", "k": 3, "columns": ["Region"]},
                    {"type": "drop_columns", "columns": ["Name"]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.steps.len(), 3);
        assert_eq!(
            spec.steps[0],
            Step::AdjustAge {
                column: "Age at Colln".to_string(),
                strategy: AgeStrategy::RandomAdjust,
            }
        );
        let reparsed = PipelineSpec::from_json_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, spec);
    }

    #[test]
    fn test_failed_step_keeps_previous_table() {
        let mut session = Session::new(patients(), DeidConfig::default());
        session
            .apply(&Step::AdjustAge {
                column: "Age at Colln".to_string(),
                strategy: AgeStrategy::AgeGroup,
            })
            .unwrap();
        let before = session.table().clone();

        let err = session
            .apply(&Step::DropColumns {
                columns: vec!["Name".to_string(), "Zip".to_string()],
            })
            .unwrap_err();
        assert!(err.is_lookup());
        assert_eq!(session.table(), &before);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_run_pipeline_in_operator_order() {
        let spec = PipelineSpec::new("export")
            .with_step(Step::AdjustAge {
                column: "Age at Colln".to_string(),
                strategy: AgeStrategy::AgeGroup,
            })
            .with_step(Step::KAnonymity {
                k: 3,
                columns: vec!["Age at Colln".to_string()],
            })
            .with_step(Step::MaskGeo {
                columns: vec!["Region".to_string()],
            })
            .with_step(Step::Hash {
                columns: vec!["Name".to_string()],
            });

        let output = run_pipeline(&spec, patients(), &DeidConfig::default()).unwrap();

        assert_eq!(output.table.num_rows(), 3);
        assert_eq!(
            output.table.column("Region").unwrap().values(),
            &[
                Value::text("De-identified North"),
                Value::text("De-identified North"),
                Value::text("De-identified North"),
            ]
        );
        assert_eq!(output.steps.len(), 4);
        let anonymity = output.steps[1].anonymity.as_ref().unwrap();
        assert_eq!(anonymity.rows_out, 3);
        assert_eq!(output.steps[1].rows_before, 4);
    }

    #[test]
    fn test_mask_geo_limited_to_configured_columns() {
        let mut session = Session::new(patients(), DeidConfig::default());
        let err = session
            .apply(&Step::MaskGeo {
                columns: vec!["Region".to_string(), "Name".to_string()],
            })
            .unwrap_err();
        assert!(matches!(err, DeidError::NotGeographic { ref column, .. } if column == "Name"));
        assert_eq!(session.table(), &patients());

        let config = DeidConfig {
            geo_column_choices: vec!["Name".to_string()],
            ..DeidConfig::default()
        };
        let (output, _) = apply_step(
            &patients(),
            &Step::MaskGeo {
                columns: vec!["Name".to_string()],
            },
            &config,
        )
        .unwrap();
        assert_eq!(
            output.column("Name").unwrap().values()[0],
            Value::text("De-identified a")
        );
    }

    #[test]
    fn test_age_group_after_binning_aborts_step() {
        let mut session = Session::new(patients(), DeidConfig::default());
        session
            .apply(&Step::AdjustAge {
                column: "Age at Colln".to_string(),
                strategy: AgeStrategy::AgeGroup,
            })
            .unwrap();
        let binned = session.table().clone();

        let err = session
            .apply(&Step::KAnonymity {
                k: 2,
                columns: vec!["Age Group".to_string()],
            })
            .unwrap_err();
        assert!(err.is_type());
        assert_eq!(session.table(), &binned);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_run_pipeline_stops_at_first_failure() {
        let spec = PipelineSpec::new("bad").with_step(Step::KAnonymity {
            k: 0,
            columns: vec![],
        });
        assert!(run_pipeline(&spec, patients(), &DeidConfig::default()).is_err());
    }
}
