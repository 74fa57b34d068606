//! Piecewise-exponential sampling.

/// Survival distribution with constant hazards on a time grid.
///
/// Built from hazard values `h[i]` applying on `[t[i], t[i+1])`, with the
/// last hazard extending to infinity. Sampling inverts the cumulative hazard
/// against a unit-exponential draw; an optional left-truncation point
/// conditions the draw on survival to that time.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseExponential {
    times: Vec<f64>,
    hazards: Vec<f64>,
    cumulative: Vec<f64>,
}

impl PiecewiseExponential {
    /// # Panics
    ///
    /// Panics if the grids differ in length, are empty, are not strictly
    /// increasing in time, or contain a non-positive hazard (contract
    /// violations).
    pub fn new(times: Vec<f64>, hazards: Vec<f64>) -> Self {
        assert_eq!(times.len(), hazards.len(), "time and hazard grids differ");
        assert!(!times.is_empty(), "hazard grid must not be empty");
        assert!(
            times.windows(2).all(|w| w[0] < w[1]),
            "time grid must be strictly increasing"
        );
        assert!(
            hazards.iter().all(|&h| h > 0.0 && h.is_finite()),
            "hazards must be positive and finite"
        );
        let mut cumulative = vec![0.0; times.len()];
        for i in 1..times.len() {
            cumulative[i] = cumulative[i - 1] + (times[i] - times[i - 1]) * hazards[i - 1];
        }
        Self {
            times,
            hazards,
            cumulative,
        }
    }

    /// One-year grid starting at zero.
    pub fn from_annual_rates(hazards: Vec<f64>) -> Self {
        let times = (0..hazards.len()).map(|i| i as f64).collect();
        Self::new(times, hazards)
    }

    /// Invert the cumulative hazard against `unit_exponential` (a draw from
    /// Exp(1)), conditioned on survival to `from`.
    pub fn sample(&self, unit_exponential: f64, from: f64) -> f64 {
        let n = self.times.len();
        let baseline = if from > 0.0 {
            let i0 = if from >= self.times[n - 1] {
                n - 1
            } else {
                self.times.partition_point(|&t| t <= from) - 1
            };
            self.cumulative[i0] + (from - self.times[i0]) * self.hazards[i0]
        } else {
            0.0
        };
        let target = unit_exponential + baseline;
        let i = if target >= self.cumulative[n - 1] {
            n - 1
        } else {
            self.cumulative.partition_point(|&c| c <= target) - 1
        };
        self.times[i] + (target - self.cumulative[i]) / self.hazards[i]
    }
}
