//! Deterministic random number streams
//!
//! Implements the RngStreams design of L'Ecuyer: multiple independent
//! streams, each divided into substreams that can be advanced and rewound
//! deterministically. CRITICAL: all randomness in the simulator MUST go
//! through this module.

mod streams;

pub use streams::{RngManager, RngStream, SeedError, DEFAULT_PACKAGE_SEED};
