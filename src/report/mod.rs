//! Age-partitioned result aggregation.
//!
//! Reports consume (state, event, interval) records emitted by processes and
//! aggregate them across individuals:
//! - [`EventReport`]: person-time, event counts and point prevalence per
//!   state and age bucket
//! - [`CostReport`]: discounted cost accumulation per key and age bucket
//! - [`SimpleReport`]: named columns of raw values for life histories and
//!   similar scratch output
//!
//! All aggregation is keyed by bucket index into a shared [`Partition`] so
//! that no floating-point values ever act as map keys; output rows emit the
//! bucket's left edge.

mod cost_report;
mod event_report;
mod simple;

pub use cost_report::{discounted_interval, CostReport, CostRow};
pub use event_report::{EventCountRow, EventReport, EventReportOutput, PersonTimeRow, PrevalenceRow};
pub use simple::SimpleReport;

use serde::{Deserialize, Serialize};

/// A strictly increasing sequence of age cutpoints.
///
/// Intervals extending past the last cutpoint are truncated: person-time up
/// to the last cutpoint is still credited, but no event is recorded. Drivers
/// wanting full life histories append a sentinel edge (e.g. `1.0e6`) well
/// beyond any plausible death age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    edges: Vec<f64>,
}

impl Partition {
    /// # Panics
    ///
    /// Panics unless `edges` has at least two strictly increasing elements
    /// (contract violation).
    pub fn new(edges: Vec<f64>) -> Self {
        assert!(edges.len() >= 2, "partition needs at least two cutpoints");
        assert!(
            edges.windows(2).all(|w| w[0] < w[1]),
            "partition cutpoints must be strictly increasing"
        );
        Self { edges }
    }

    /// One-year buckets covering `[0, years]` plus a far sentinel edge.
    pub fn single_years_with_sentinel(years: u32) -> Self {
        let mut edges: Vec<f64> = (0..=years).map(f64::from).collect();
        edges.push(1.0e6);
        Self::new(edges)
    }

    /// The last cutpoint; the truncation horizon.
    pub fn max(&self) -> f64 {
        *self.edges.last().expect("partition is non-empty")
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, index: usize) -> f64 {
        self.edges[index]
    }

    /// Index of the greatest cutpoint at or below `t` (0 if `t` lies below
    /// the first cutpoint).
    pub fn bucket_of(&self, t: f64) -> usize {
        self.edges
            .partition_point(|edge| *edge <= t)
            .saturating_sub(1)
    }

    /// Index of the greatest cutpoint strictly below `t` (0 if none).
    pub fn bucket_below(&self, t: f64) -> usize {
        self.edges
            .partition_point(|edge| *edge < t)
            .saturating_sub(1)
    }
}
