//! Life-course Microsimulation Core - Rust Engine
//!
//! Discrete-event microsimulation of individual life courses with
//! deterministic execution, plus the prostate-cancer natural-history and
//! screening model built on top of it.
//!
//! # Architecture
//!
//! - **kernel**: virtual-time message queue and dispatch loop
//! - **rng**: reproducible random streams (MRG32k3a with substreams)
//! - **report**: age-partitioned person-time, event, prevalence and cost
//!   aggregation
//! - **tables**: interpolated curves, piecewise-exponential mortality,
//!   clamped grid tables
//! - **cancer**: the prostate-cancer process and its driver
//! - **illness_death**: minimal two-state conformance client
//! - **calibration**: explicitly seeded staged-disease client
//!
//! # Critical Invariants
//!
//! 1. All randomness is deterministic: fixed package seed + substream index
//!    reproduce an individual's life history bit-for-bit
//! 2. Messages dispatch in time order; equal timestamps dispatch in
//!    insertion order
//! 3. Person-time per individual sums to min(death age, partition max)

// Module declarations
pub mod calibration;
pub mod cancer;
pub mod illness_death;
pub mod kernel;
pub mod report;
pub mod rng;
pub mod tables;

// Re-exports for convenience
pub use cancer::{
    CancerConfig, CancerModelOutput, ConfigError, NaturalHistoryParams, ScreeningPolicy,
};
pub use kernel::{KernelError, Message, Process, Simulation, Time};
pub use report::{CostReport, EventReport, Partition, SimpleReport};
pub use rng::{RngManager, RngStream, DEFAULT_PACKAGE_SEED};
