//! MRG32k3a random number streams
//!
//! Combined multiple-recursive generator (L'Ecuyer's MRG32k3a) with the
//! RngStreams stream/substream structure. Each stream keeps three copies of
//! the six-element state: the stream anchor, the current substream anchor and
//! the current position. Stream anchors are spaced 2^127 steps apart and
//! substream anchors 2^76 steps apart, so streams and substreams never
//! overlap in any practical simulation.
//!
//! # Determinism
//!
//! Same package seed → same stream anchors → same sequences. This is CRITICAL
//! for:
//! - Debugging (reproduce an exact individual's life history)
//! - Variance reduction (hold one stream fixed while varying another)
//! - Testing (verify behaviour bit-for-bit)

use std::collections::BTreeMap;
use thiserror::Error;

const M1: u64 = 4_294_967_087;
const M2: u64 = 4_294_944_443;
const A12: u64 = 1_403_580;
const A13N: u64 = 810_728;
const A21: u64 = 527_612;
const A23N: u64 = 1_370_589;

/// 1 / (m1 + 1); maps the combined state into (0, 1).
const NORM: f64 = 2.328306549295727688e-10;

/// Transition matrix of the first component raised to the power 2^76.
const A1P76: [[u64; 3]; 3] = [
    [82_758_667, 1_871_391_091, 4_127_413_238],
    [3_672_831_523, 69_195_019, 1_871_391_091],
    [3_672_091_415, 3_528_743_235, 69_195_019],
];

/// Transition matrix of the second component raised to the power 2^76.
const A2P76: [[u64; 3]; 3] = [
    [1_511_326_704, 3_759_209_742, 1_610_795_712],
    [4_292_754_251, 1_511_326_704, 3_889_917_532],
    [3_859_662_829, 4_292_754_251, 3_708_466_080],
];

/// Transition matrix of the first component raised to the power 2^127.
const A1P127: [[u64; 3]; 3] = [
    [2_427_906_178, 3_580_155_704, 949_770_784],
    [226_153_695, 1_230_515_664, 3_580_155_704],
    [1_988_835_001, 986_791_581, 1_230_515_664],
];

/// Transition matrix of the second component raised to the power 2^127.
const A2P127: [[u64; 3]; 3] = [
    [1_464_411_153, 277_697_599, 1_610_723_613],
    [32_183_930, 1_464_411_153, 1_022_607_788],
    [2_824_425_944, 32_183_930, 2_093_834_863],
];

/// Default package seed, as in the reference RngStreams library.
pub const DEFAULT_PACKAGE_SEED: [u64; 6] = [12345; 6];

/// Invalid package seed supplied to [`RngManager::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// A seed element is at or above the modulus of its component.
    #[error("seed element {index} ({value}) must be below {modulus}")]
    OutOfRange {
        index: usize,
        value: u64,
        modulus: u64,
    },

    /// One of the two seed triples is all zero.
    #[error("seed elements {0}..={1} must not all be zero")]
    ZeroTriple(usize, usize),
}

fn validate_seed(seed: &[u64; 6]) -> Result<(), SeedError> {
    for (i, &s) in seed.iter().enumerate() {
        let modulus = if i < 3 { M1 } else { M2 };
        if s >= modulus {
            return Err(SeedError::OutOfRange {
                index: i,
                value: s,
                modulus,
            });
        }
    }
    if seed[..3].iter().all(|&s| s == 0) {
        return Err(SeedError::ZeroTriple(0, 2));
    }
    if seed[3..].iter().all(|&s| s == 0) {
        return Err(SeedError::ZeroTriple(3, 5));
    }
    Ok(())
}

/// v = A·v mod m, for one 3x3 component matrix.
fn mat_vec_mod(a: &[[u64; 3]; 3], v: &mut [u64], m: u64) {
    let mut out = [0u64; 3];
    for (i, row) in a.iter().enumerate() {
        let mut acc: u128 = 0;
        for (j, &aij) in row.iter().enumerate() {
            acc += aij as u128 * v[j] as u128;
        }
        out[i] = (acc % m as u128) as u64;
    }
    v.copy_from_slice(&out);
}

/// A single MRG32k3a stream.
///
/// Streams are created through [`RngManager`], which spaces them 2^127 steps
/// apart along the backbone sequence. A stream remembers where it and its
/// current substream started, so both can be rewound.
#[derive(Debug, Clone)]
pub struct RngStream {
    /// Start of the stream.
    ig: [u64; 6],
    /// Start of the current substream.
    bg: [u64; 6],
    /// Current position.
    cg: [u64; 6],
}

impl RngStream {
    fn from_seed(seed: [u64; 6]) -> Self {
        Self {
            ig: seed,
            bg: seed,
            cg: seed,
        }
    }

    /// Generate the next value in (0, 1).
    pub fn uniform(&mut self) -> f64 {
        // first component
        let p1 = (A12 as i128 * self.cg[1] as i128 - A13N as i128 * self.cg[0] as i128)
            .rem_euclid(M1 as i128) as u64;
        self.cg[0] = self.cg[1];
        self.cg[1] = self.cg[2];
        self.cg[2] = p1;

        // second component
        let p2 = (A21 as i128 * self.cg[5] as i128 - A23N as i128 * self.cg[3] as i128)
            .rem_euclid(M2 as i128) as u64;
        self.cg[3] = self.cg[4];
        self.cg[4] = self.cg[5];
        self.cg[5] = p2;

        if p1 > p2 {
            (p1 - p2) as f64 * NORM
        } else {
            (p1 + M1 - p2) as f64 * NORM
        }
    }

    /// Advance to the start of the next substream (2^76 steps from the
    /// current substream anchor).
    pub fn next_substream(&mut self) {
        mat_vec_mod(&A1P76, &mut self.bg[..3], M1);
        mat_vec_mod(&A2P76, &mut self.bg[3..], M2);
        self.cg = self.bg;
    }

    /// Rewind to the start of the current substream.
    pub fn reset_substream(&mut self) {
        self.cg = self.bg;
    }

    /// Rewind to the start of the stream (first substream).
    pub fn reset_stream(&mut self) {
        self.bg = self.ig;
        self.cg = self.ig;
    }

    // ------------------------------------------------------------------
    // Sampling helpers, layered over the uniform source
    // ------------------------------------------------------------------

    /// Uniform draw on [low, high).
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        assert!(low <= high, "low must not exceed high");
        low + (high - low) * self.uniform()
    }

    /// Bernoulli draw with success probability `p`.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.uniform() < p
    }

    /// Exponential draw with the given mean.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        assert!(mean > 0.0, "exponential mean must be positive");
        -mean * self.uniform().ln()
    }

    /// Normal draw via the Box-Muller transform.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        let u1 = self.uniform();
        let u2 = self.uniform();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + sd * z
    }

    /// Normal draw constrained to be positive, by rejection.
    ///
    /// Terminates for any finite mean with positive sd.
    pub fn normal_positive(&mut self, mean: f64, sd: f64) -> f64 {
        assert!(sd > 0.0, "normal_positive sd must be positive");
        loop {
            let x = self.normal(mean, sd);
            if x > 0.0 {
                return x;
            }
        }
    }

    /// Weibull draw by inverse CDF.
    pub fn weibull(&mut self, shape: f64, scale: f64) -> f64 {
        scale * (-self.uniform().ln()).powf(1.0 / shape)
    }

    /// Log-logistic draw by inverse CDF.
    pub fn log_logistic(&mut self, shape: f64, scale: f64) -> f64 {
        let u = self.uniform();
        scale * (u / (1.0 - u)).powf(1.0 / shape)
    }

    /// Log-logistic draw conditioned on exceeding `left`.
    pub fn log_logistic_truncated(&mut self, shape: f64, scale: f64, left: f64) -> f64 {
        let f_left = if left <= 0.0 {
            0.0
        } else {
            let r = (left / scale).powf(shape);
            r / (1.0 + r)
        };
        let u = f_left + self.uniform() * (1.0 - f_left);
        scale * (u / (1.0 - u)).powf(1.0 / shape)
    }
}

/// Named, independent random streams with an active-stream selector.
///
/// Streams are allocated in creation order from the package seed; each new
/// stream starts 2^127 steps beyond the previous one. A stream must be
/// selected with [`set`](RngManager::set) before drawing; draws then read
/// from the selected stream until another `set` call. Selecting the wrong
/// stream gives defined-but-wrong results — the draws come from whichever
/// stream was last set.
///
/// # Example
/// ```
/// use lifecourse_simulator_core_rs::rng::RngManager;
///
/// let mut rng = RngManager::with_default_seed();
/// rng.create_stream("nh");
/// rng.create_stream("screen");
/// rng.set("nh");
/// let u = rng.uniform();
/// assert!(u > 0.0 && u < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct RngManager {
    next_seed: [u64; 6],
    streams: Vec<RngStream>,
    names: BTreeMap<String, usize>,
    active: Option<usize>,
}

impl RngManager {
    /// Create a manager from a six-element package seed.
    pub fn new(package_seed: [u64; 6]) -> Result<Self, SeedError> {
        validate_seed(&package_seed)?;
        Ok(Self {
            next_seed: package_seed,
            streams: Vec::new(),
            names: BTreeMap::new(),
            active: None,
        })
    }

    /// Create a manager from the reference default seed (all 12345).
    pub fn with_default_seed() -> Self {
        Self::new(DEFAULT_PACKAGE_SEED).expect("default package seed is valid")
    }

    /// Allocate a new named stream at the next stream anchor.
    ///
    /// # Panics
    ///
    /// Panics if a stream with this name already exists (contract violation).
    pub fn create_stream(&mut self, name: &str) {
        assert!(
            !self.names.contains_key(name),
            "stream {name:?} already exists"
        );
        let stream = RngStream::from_seed(self.next_seed);
        mat_vec_mod(&A1P127, &mut self.next_seed[..3], M1);
        mat_vec_mod(&A2P127, &mut self.next_seed[3..], M2);
        self.names.insert(name.to_string(), self.streams.len());
        self.streams.push(stream);
    }

    /// Select the active stream; subsequent draws read from it.
    ///
    /// # Panics
    ///
    /// Panics if no stream with this name exists (contract violation).
    pub fn set(&mut self, name: &str) {
        let idx = *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("unknown random stream {name:?}"));
        self.active = Some(idx);
    }

    /// Access a named stream directly, e.g. for substream control.
    pub fn stream_mut(&mut self, name: &str) -> &mut RngStream {
        let idx = *self
            .names
            .get(name)
            .unwrap_or_else(|| panic!("unknown random stream {name:?}"));
        &mut self.streams[idx]
    }

    /// Advance every stream to its next substream.
    ///
    /// The per-individual protocol: call once between individuals so that
    /// each individual sees non-overlapping subsequences on every stream.
    pub fn next_substream_all(&mut self) {
        for stream in &mut self.streams {
            stream.next_substream();
        }
    }

    fn active_stream(&mut self) -> &mut RngStream {
        let idx = self
            .active
            .expect("no random stream selected: call set() before drawing");
        &mut self.streams[idx]
    }

    // Draws delegate to the active stream.

    /// Next value in (0, 1) from the active stream.
    pub fn uniform(&mut self) -> f64 {
        self.active_stream().uniform()
    }

    /// Uniform draw on [low, high) from the active stream.
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        self.active_stream().uniform_range(low, high)
    }

    /// Bernoulli draw from the active stream.
    pub fn bernoulli(&mut self, p: f64) -> bool {
        self.active_stream().bernoulli(p)
    }

    /// Exponential draw with the given mean from the active stream.
    pub fn exponential(&mut self, mean: f64) -> f64 {
        self.active_stream().exponential(mean)
    }

    /// Normal draw from the active stream.
    pub fn normal(&mut self, mean: f64, sd: f64) -> f64 {
        self.active_stream().normal(mean, sd)
    }

    /// Positive-constrained normal draw from the active stream.
    pub fn normal_positive(&mut self, mean: f64, sd: f64) -> f64 {
        self.active_stream().normal_positive(mean, sd)
    }

    /// Weibull draw from the active stream.
    pub fn weibull(&mut self, shape: f64, scale: f64) -> f64 {
        self.active_stream().weibull(shape, scale)
    }

    /// Log-logistic draw from the active stream.
    pub fn log_logistic(&mut self, shape: f64, scale: f64) -> f64 {
        self.active_stream().log_logistic(shape, scale)
    }

    /// Left-truncated log-logistic draw from the active stream.
    pub fn log_logistic_truncated(&mut self, shape: f64, scale: f64, left: f64) -> f64 {
        self.active_stream().log_logistic_truncated(shape, scale, left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_seed() {
        let err = RngManager::new([M1, 1, 1, 1, 1, 1]).unwrap_err();
        assert!(matches!(err, SeedError::OutOfRange { index: 0, .. }));
    }

    #[test]
    fn rejects_zero_triple() {
        let err = RngManager::new([0, 0, 0, 1, 1, 1]).unwrap_err();
        assert_eq!(err, SeedError::ZeroTriple(0, 2));
    }

    #[test]
    fn uniform_stays_in_open_unit_interval() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("a");
        rng.set("a");
        for _ in 0..10_000 {
            let u = rng.uniform();
            assert!(u > 0.0 && u < 1.0, "uniform produced {u}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RngManager::with_default_seed();
        let mut b = RngManager::with_default_seed();
        a.create_stream("s");
        b.create_stream("s");
        a.set("s");
        b.set("s");
        for _ in 0..1_000 {
            assert_eq!(a.uniform().to_bits(), b.uniform().to_bits());
        }
    }

    #[test]
    fn streams_are_distinct() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("a");
        rng.create_stream("b");
        rng.set("a");
        let ua = rng.uniform();
        rng.set("b");
        let ub = rng.uniform();
        assert_ne!(ua, ub);
    }

    #[test]
    fn interleaving_does_not_perturb_streams() {
        // draws from stream a with b interleaved vs. not interleaved
        let mut plain = RngManager::with_default_seed();
        plain.create_stream("a");
        plain.create_stream("b");
        plain.set("a");
        let expected: Vec<u64> = (0..10).map(|_| plain.uniform().to_bits()).collect();

        let mut mixed = RngManager::with_default_seed();
        mixed.create_stream("a");
        mixed.create_stream("b");
        let mut got = Vec::new();
        for _ in 0..10 {
            mixed.set("a");
            got.push(mixed.uniform().to_bits());
            mixed.set("b");
            mixed.uniform();
        }
        assert_eq!(expected, got);
    }

    #[test]
    fn reset_substream_replays() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("s");
        rng.set("s");
        let first: Vec<u64> = (0..5).map(|_| rng.uniform().to_bits()).collect();
        rng.stream_mut("s").reset_substream();
        let replay: Vec<u64> = (0..5).map(|_| rng.uniform().to_bits()).collect();
        assert_eq!(first, replay);
    }

    #[test]
    fn next_substream_changes_and_reset_stream_rewinds() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("s");
        rng.set("s");
        let u0 = rng.uniform();
        rng.stream_mut("s").next_substream();
        let u1 = rng.uniform();
        assert_ne!(u0, u1);
        rng.stream_mut("s").reset_stream();
        assert_eq!(u0.to_bits(), rng.uniform().to_bits());
    }

    #[test]
    fn substream_index_reproduces_subsequence() {
        // running substreams 0 and 1 vs. jumping straight to substream 1
        let mut walked = RngManager::with_default_seed();
        walked.create_stream("s");
        walked.set("s");
        for _ in 0..100 {
            walked.uniform();
        }
        walked.stream_mut("s").next_substream();
        let expected = walked.uniform().to_bits();

        let mut jumped = RngManager::with_default_seed();
        jumped.create_stream("s");
        jumped.set("s");
        jumped.stream_mut("s").next_substream();
        assert_eq!(expected, jumped.uniform().to_bits());
    }

    #[test]
    #[should_panic(expected = "no random stream selected")]
    fn drawing_without_set_panics() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("s");
        rng.uniform();
    }

    #[test]
    fn normal_positive_is_positive() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("s");
        rng.set("s");
        for _ in 0..1_000 {
            assert!(rng.normal_positive(-1.0, 2.0) > 0.0);
        }
    }

    #[test]
    fn truncated_log_logistic_exceeds_left_bound() {
        let mut rng = RngManager::with_default_seed();
        rng.create_stream("s");
        rng.set("s");
        for _ in 0..1_000 {
            assert!(rng.log_logistic_truncated(3.8, 15.0, 10.0) >= 10.0);
        }
    }
}
