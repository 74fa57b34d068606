//! Named-column scratch report.

use serde::Serialize;
use std::collections::BTreeMap;

/// Column-oriented collector for values that do not fit a fixed row type:
/// per-individual parameter draws, PSA test records and the like.
///
/// Columns grow independently; consumers align them by recording in a fixed
/// pattern per individual.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimpleReport {
    columns: BTreeMap<String, Vec<f64>>,
}

impl SimpleReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` to the named column.
    pub fn record(&mut self, field: &str, value: f64) {
        self.columns.entry(field.to_string()).or_default().push(value);
    }

    /// Replace the last value of the named column.
    ///
    /// # Panics
    ///
    /// Panics if the column is missing or empty (contract violation: `revise`
    /// only makes sense after a `record`).
    pub fn revise(&mut self, field: &str, value: f64) {
        let column = self
            .columns
            .get_mut(field)
            .unwrap_or_else(|| panic!("revise on unknown column {field:?}"));
        let last = column
            .last_mut()
            .unwrap_or_else(|| panic!("revise on empty column {field:?}"));
        *last = value;
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }

    /// Concatenate another report's columns onto this one.
    pub fn append(&mut self, other: &SimpleReport) {
        for (field, values) in &other.columns {
            self.columns
                .entry(field.clone())
                .or_default()
                .extend_from_slice(values);
        }
    }

    pub fn column(&self, field: &str) -> Option<&[f64]> {
        self.columns.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
