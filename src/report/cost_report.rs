//! Discounted cost accumulation.

use super::Partition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Integral of `(1 + rate)^(-u)` over `[start, end]`.
///
/// With a zero rate this is simply the interval length.
pub fn discounted_interval(start: f64, end: f64, rate: f64) -> f64 {
    assert!(start <= end, "interval must satisfy start <= end");
    if rate == 0.0 {
        return end - start;
    }
    let base = 1.0 + rate;
    (base.powf(-start) - base.powf(-end)) / base.ln()
}

/// One accumulated cost cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostRow<K> {
    pub key: K,
    pub age: f64,
    pub cost: f64,
}

/// Age-partitioned accumulator of discounted costs, keyed by an arbitrary
/// ordered key (the cancer model uses cost item × cohort year).
#[derive(Debug, Clone)]
pub struct CostReport<K> {
    partition: Option<Partition>,
    /// Discount rate applied as `(1 + rate)^(-t)` at spending time `t`.
    pub discount_rate: f64,
    costs: BTreeMap<K, BTreeMap<usize, f64>>,
}

impl<K: Ord + Clone> CostReport<K> {
    pub fn new() -> Self {
        Self {
            partition: None,
            discount_rate: 0.0,
            costs: BTreeMap::new(),
        }
    }

    pub fn set_partition(&mut self, partition: Partition) {
        self.partition = Some(partition);
    }

    pub fn clear(&mut self) {
        self.partition = None;
        self.costs.clear();
    }

    /// Add `amount` spent at time `t`, discounted back to time zero.
    ///
    /// # Panics
    ///
    /// Panics if no partition is set (contract violation).
    pub fn add(&mut self, key: K, t: f64, amount: f64) {
        let partition = self
            .partition
            .as_ref()
            .expect("partition not set: call set_partition() before add()");
        let discounted = amount * (1.0 + self.discount_rate).powf(-t);
        let bucket = partition.bucket_of(t.min(partition.max()));
        *self
            .costs
            .entry(key)
            .or_default()
            .entry(bucket)
            .or_insert(0.0) += discounted;
    }

    /// Flatten into rows in deterministic key order.
    pub fn out(&self) -> Vec<CostRow<K>> {
        let partition = self
            .partition
            .as_ref()
            .expect("partition not set: call set_partition() before out()");
        self.costs
            .iter()
            .flat_map(|(key, buckets)| {
                buckets.iter().map(move |(&index, &cost)| CostRow {
                    key: key.clone(),
                    age: partition.edge(index),
                    cost,
                })
            })
            .collect()
    }

    /// Total cost for one key across all buckets.
    pub fn total(&self, key: &K) -> f64 {
        self.costs
            .get(key)
            .map(|buckets| buckets.values().sum())
            .unwrap_or(0.0)
    }
}

impl<K: Ord + Clone> Default for CostReport<K> {
    fn default() -> Self {
        Self::new()
    }
}
