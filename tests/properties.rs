// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Property tests for the k-anonymity enforcer and value transforms

use std::collections::HashMap;

use proptest::prelude::*;

use deid_rust::deid::age::{jitter_offsets, AgeBins};
use deid_rust::deid::anonymity::{enforce_k_anonymity, is_k_anonymous};
use deid_rust::deid::masking::{hash_value, mask_geo_value, GEO_PREFIX};
use deid_rust::deid::{Column, Table, Value};

const AGE_SOURCE: &str = "Age at Colln";

fn region_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => prop::sample::select(vec!["A", "B", "C", "D"]).prop_map(Value::text),
        1 => Just(Value::Missing),
    ]
}

/// Tables with a small-alphabet Region column and a unique row id
fn region_table() -> impl Strategy<Value = Table> {
    prop::collection::vec(region_value(), 0..60).prop_map(|regions| {
        let ids = (0..regions.len() as i64).map(Value::from).collect();
        Table::new(vec![
            Column::new("Region", regions),
            Column::new("Row", ids),
        ])
        .unwrap()
    })
}

fn region_counts(table: &Table) -> HashMap<Value, usize> {
    let mut counts = HashMap::new();
    for value in table.column("Region").unwrap().values() {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    counts
}

proptest! {
    #[test]
    fn enforced_output_is_k_anonymous(table in region_table(), k in 1usize..8) {
        let output = enforce_k_anonymity(&table, k, &["Region"], AGE_SOURCE).unwrap();

        prop_assert!(output.num_rows() <= table.num_rows());
        prop_assert!(is_k_anonymous(&output, &["Region"], k).unwrap());
        prop_assert_eq!(output.column_names(), table.column_names());
    }

    #[test]
    fn retained_rows_come_from_large_input_groups(table in region_table(), k in 1usize..8) {
        let output = enforce_k_anonymity(&table, k, &["Region"], AGE_SOURCE).unwrap();
        let input_counts = region_counts(&table);

        for value in output.column("Region").unwrap().values() {
            prop_assert!(!value.is_missing());
            prop_assert!(input_counts[value] >= k);
        }

        // every qualifying input row survives, in order
        let expected: Vec<Value> = table
            .column("Region")
            .unwrap()
            .values()
            .iter()
            .zip(table.column("Row").unwrap().values())
            .filter(|(region, _)| !region.is_missing() && input_counts[*region] >= k)
            .map(|(_, id)| id.clone())
            .collect();
        prop_assert_eq!(output.column("Row").unwrap().values(), &expected[..]);
    }

    #[test]
    fn k_above_row_count_empties_table(table in region_table()) {
        let k = table.num_rows() + 1;
        let output = enforce_k_anonymity(&table, k, &["Region"], AGE_SOURCE).unwrap();
        prop_assert_eq!(output.num_rows(), 0);
    }

    #[test]
    fn enforcement_is_idempotent(table in region_table(), k in 1usize..8) {
        let once = enforce_k_anonymity(&table, k, &["Region"], AGE_SOURCE).unwrap();
        let twice = enforce_k_anonymity(&once, k, &["Region"], AGE_SOURCE).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn hash_is_deterministic_hex(text in ".*") {
        let value = Value::text(text);
        let digest = hash_value(&value);
        prop_assert_eq!(digest.len(), 64);
        prop_assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        prop_assert_eq!(digest, hash_value(&value));
    }

    #[test]
    fn geo_mask_keeps_prefix_before_first_comma(head in "[^,]*", tail in ".*") {
        let masked = mask_geo_value(&format!("{},{}", head, tail));
        prop_assert_eq!(masked, format!("{}{}", GEO_PREFIX, head));
    }

    #[test]
    fn jitter_offsets_are_bounded_and_seeded(rows in 0usize..200, seed in any::<u64>(), radius in 0u32..10) {
        let offsets = jitter_offsets(rows, seed, radius);
        let bound = i64::from(radius);
        prop_assert_eq!(offsets.len(), rows);
        prop_assert!(offsets.iter().all(|o| (-bound..=bound).contains(o)));
        prop_assert_eq!(offsets, jitter_offsets(rows, seed, radius));
    }

    #[test]
    fn every_age_in_range_has_a_label(age in 0.0f64..=100.0) {
        prop_assert!(AgeBins::STANDARD.label(age).is_some());
        prop_assert!(AgeBins::AGE_GROUP.label(age).is_some());
    }
}
