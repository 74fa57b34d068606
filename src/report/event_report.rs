//! Person-time, event-count and prevalence aggregation.

use super::Partition;
use serde::Serialize;
use std::collections::BTreeMap;

/// Person-time in `state` credited to the bucket starting at `age`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonTimeRow<S> {
    pub state: S,
    pub age: f64,
    pub pt: f64,
}

/// Count of events of kind `event` occurring while in `state` within the
/// bucket starting at `age`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCountRow<S, E> {
    pub state: S,
    pub event: E,
    pub age: f64,
    pub n: u64,
}

/// Count of individuals whose interval contained the bucket edge `age`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrevalenceRow<S> {
    pub state: S,
    pub age: f64,
    pub n: u64,
}

/// The three output frames of an [`EventReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReportOutput<S, E> {
    pub person_time: Vec<PersonTimeRow<S>>,
    pub events: Vec<EventCountRow<S, E>>,
    pub prevalence: Vec<PrevalenceRow<S>>,
}

/// Age-partitioned aggregator over (state, event, interval) records.
///
/// Each call to [`add`](EventReport::add) credits a half-open interval
/// `[lhs, rhs)` spent in a state, terminated by an event at `rhs`. The
/// interval is split across the partition's buckets; person-time past the
/// last cutpoint is truncated and the terminating event of a truncated
/// interval is dropped.
#[derive(Debug, Clone)]
pub struct EventReport<S, E> {
    partition: Option<Partition>,
    pt: BTreeMap<S, BTreeMap<usize, f64>>,
    events: BTreeMap<S, BTreeMap<E, BTreeMap<usize, u64>>>,
    prev: BTreeMap<S, BTreeMap<usize, u64>>,
}

impl<S: Ord + Clone, E: Ord + Clone> EventReport<S, E> {
    pub fn new() -> Self {
        Self {
            partition: None,
            pt: BTreeMap::new(),
            events: BTreeMap::new(),
            prev: BTreeMap::new(),
        }
    }

    /// Install the age partition. Replaces any previous partition, so calling
    /// it twice with the same cutpoints is equivalent to calling it once.
    pub fn set_partition(&mut self, partition: Partition) {
        self.partition = Some(partition);
    }

    /// Drop all accumulated values and the partition.
    pub fn clear(&mut self) {
        self.partition = None;
        self.pt.clear();
        self.events.clear();
        self.prev.clear();
    }

    /// Credit the interval `[lhs, rhs)` spent in `state`, ending with `event`
    /// at `rhs`.
    ///
    /// # Panics
    ///
    /// Panics if no partition is set or if `lhs > rhs` (contract violations).
    pub fn add(&mut self, state: S, event: E, lhs: f64, rhs: f64) {
        let partition = self
            .partition
            .as_ref()
            .expect("partition not set: call set_partition() before add()");
        assert!(lhs <= rhs, "interval must satisfy lhs <= rhs");

        let cap = rhs.min(partition.max());
        let mut index = partition.bucket_of(lhs);
        while partition.edge(index) < cap {
            let edge = partition.edge(index);
            let next = partition.edge(index + 1);
            let credit = next.min(rhs) - edge.max(lhs);
            *self
                .pt
                .entry(state.clone())
                .or_default()
                .entry(index)
                .or_insert(0.0) += credit;
            if lhs <= edge && edge < rhs {
                *self
                    .prev
                    .entry(state.clone())
                    .or_default()
                    .entry(index)
                    .or_insert(0) += 1;
            }
            index += 1;
        }

        // An interval reaching the last cutpoint is truncated: its event
        // falls outside the partition and is not recorded.
        if rhs < partition.max() {
            let last = partition.bucket_below(rhs);
            *self
                .events
                .entry(state)
                .or_default()
                .entry(event)
                .or_default()
                .entry(last)
                .or_insert(0) += 1;
        }
    }

    /// Flatten the aggregation into three row-oriented frames, in
    /// deterministic key order.
    pub fn out(&self) -> EventReportOutput<S, E> {
        let partition = self
            .partition
            .as_ref()
            .expect("partition not set: call set_partition() before out()");

        let person_time = self
            .pt
            .iter()
            .flat_map(|(state, buckets)| {
                buckets.iter().map(move |(&index, &pt)| PersonTimeRow {
                    state: state.clone(),
                    age: partition.edge(index),
                    pt,
                })
            })
            .collect();

        let events = self
            .events
            .iter()
            .flat_map(|(state, per_event)| {
                per_event.iter().flat_map(move |(event, buckets)| {
                    buckets.iter().map(move |(&index, &n)| EventCountRow {
                        state: state.clone(),
                        event: event.clone(),
                        age: partition.edge(index),
                        n,
                    })
                })
            })
            .collect();

        let prevalence = self
            .prev
            .iter()
            .flat_map(|(state, buckets)| {
                buckets.iter().map(move |(&index, &n)| PrevalenceRow {
                    state: state.clone(),
                    age: partition.edge(index),
                    n,
                })
            })
            .collect();

        EventReportOutput {
            person_time,
            events,
            prevalence,
        }
    }

    /// Total person-time recorded for one state, across all buckets.
    pub fn person_time_total(&self, state: &S) -> f64 {
        self.pt
            .get(state)
            .map(|buckets| buckets.values().sum())
            .unwrap_or(0.0)
    }
}

impl<S: Ord + Clone, E: Ord + Clone> Default for EventReport<S, E> {
    fn default() -> Self {
        Self::new()
    }
}
