//! Calibration client: an explicitly seeded staged-disease model.
//!
//! Simulates a four-stage disease process (disease-free → precursor →
//! preclinical → clinical) against a Gumbel death distribution, counting the
//! population by stage at each decade of age and accumulating time at risk
//! truncated at clinical onset. The entry point takes the six-integer
//! package seed explicitly so calibration loops control reproducibility.

use crate::cancer::ConfigError;
use crate::kernel::{Message, Process, Simulation};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NH_STREAM: &str = "nh";

/// Census ages for the stage counts: 10, 20, .., 100.
const CENSUS_BUCKETS: usize = 10;
/// Cutoffs for time-at-risk accumulation.
const RISK_CUTOFFS: [f64; 4] = [20.0, 40.0, 60.0, 80.0];
/// Sentinel clinical-onset time for individuals who never present.
const NEVER_CLINICAL: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    DiseaseFree,
    Precursor,
    PreClinical,
    Clinical,
    Death,
}

impl Stage {
    const ALL: [Stage; 5] = [
        Stage::DiseaseFree,
        Stage::Precursor,
        Stage::PreClinical,
        Stage::Clinical,
        Stage::Death,
    ];

    fn name(self) -> &'static str {
        match self {
            Stage::DiseaseFree => "DiseaseFree",
            Stage::Precursor => "Precursor",
            Stage::PreClinical => "PreClinical",
            Stage::Clinical => "Clinical",
            Stage::Death => "Death",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CalibrationEvent {
    Precursor,
    PreClinical,
    Clinical,
    Death,
    /// Decade census tick.
    Census,
}

/// The six calibrated rate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    /// Mean of the log precursor-onset scale.
    pub onset_meanlog: f64,
    /// Standard deviation of the log precursor-onset scale.
    pub onset_sdlog: f64,
    /// Probability that a precursor can progress at all.
    pub disease_potential: f64,
    /// Mean precursor-to-preclinical dwell time.
    pub preclinical_mean: f64,
    /// Mean of the log preclinical-to-clinical dwell time.
    pub clinical_meanlog: f64,
    /// Coefficient of variation of the log dwell time.
    pub clinical_cv: f64,
}

/// Stage counts per decade of age plus truncated time at risk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationOutput {
    pub counts: BTreeMap<&'static str, [u64; CENSUS_BUCKETS]>,
    pub time_at_risk: [f64; 4],
}

#[derive(Debug, Default)]
struct CalibrationReport {
    counts: BTreeMap<&'static str, [u64; CENSUS_BUCKETS]>,
    time_at_risk: [f64; 4],
}

struct CalibrationPerson<'a> {
    params: &'a CalibrationParams,
    rng: &'a mut RngManager,
    report: &'a mut CalibrationReport,
    stage: Stage,
    disease_potential: bool,
    clinical_time: f64,
}

impl Process<CalibrationEvent> for CalibrationPerson<'_> {
    fn init(&mut self, sim: &mut Simulation<CalibrationEvent>) {
        self.rng.set(NH_STREAM);
        self.disease_potential = self.rng.uniform() < self.params.disease_potential;
        self.clinical_time = NEVER_CLINICAL;
        self.stage = Stage::DiseaseFree;

        let onset_scale = self
            .rng
            .normal(self.params.onset_meanlog, self.params.onset_sdlog)
            .exp();
        sim.schedule_at(self.rng.exponential(onset_scale), CalibrationEvent::Precursor);

        // Gumbel death distribution centred at 65
        let u = self.rng.uniform();
        sim.schedule_at(65.0 - 15.0 * (-u.ln()).ln(), CalibrationEvent::Death);

        for decade in 1..=CENSUS_BUCKETS {
            sim.schedule_at((decade * 10) as f64, CalibrationEvent::Census);
        }
    }

    fn handle(&mut self, sim: &mut Simulation<CalibrationEvent>, msg: &Message<CalibrationEvent>) {
        match msg.kind {
            CalibrationEvent::Death => {
                self.stage = Stage::Death;
                self.clinical_time = self.clinical_time.min(sim.now());
                for (i, &cutoff) in RISK_CUTOFFS.iter().enumerate() {
                    self.report.time_at_risk[i] += self.clinical_time.min(cutoff);
                    if self.clinical_time < cutoff {
                        break;
                    }
                }
                sim.stop();
            }

            CalibrationEvent::Precursor => {
                self.stage = Stage::Precursor;
                if self.disease_potential {
                    let dwell = self.rng.exponential(self.params.preclinical_mean);
                    sim.schedule_at(sim.now() + dwell, CalibrationEvent::PreClinical);
                }
            }

            CalibrationEvent::PreClinical => {
                self.stage = Stage::PreClinical;
                let dwell = self
                    .rng
                    .normal(
                        self.params.clinical_meanlog,
                        self.params.clinical_cv * self.params.clinical_meanlog,
                    )
                    .exp();
                sim.schedule_at(sim.now() + dwell, CalibrationEvent::Clinical);
            }

            CalibrationEvent::Clinical => {
                self.stage = Stage::Clinical;
                self.clinical_time = sim.now();
            }

            CalibrationEvent::Census => {
                let bucket = ((sim.now() / 10.0) as usize)
                    .saturating_sub(1)
                    .min(CENSUS_BUCKETS - 1);
                self.report.counts.entry(self.stage.name()).or_default()[bucket] += 1;
            }
        }
    }
}

/// Run `n` individuals under the given package seed.
pub fn run(
    package_seed: [u64; 6],
    params: &CalibrationParams,
    n: usize,
) -> Result<CalibrationOutput, ConfigError> {
    if n == 0 {
        return Err(ConfigError::Invalid("n must be > 0".to_string()));
    }
    let mut rng = RngManager::new(package_seed)?;
    rng.create_stream(NH_STREAM);
    rng.set(NH_STREAM);

    let mut report = CalibrationReport::default();
    let mut sim = Simulation::new();

    for _ in 0..n {
        rng.next_substream_all();
        let mut person = CalibrationPerson {
            params,
            rng: &mut rng,
            report: &mut report,
            stage: Stage::DiseaseFree,
            disease_potential: false,
            clinical_time: NEVER_CLINICAL,
        };
        sim.create_process(&mut person)
            .expect("kernel is idle between individuals");
        sim.run(&mut person);
        sim.clear();
    }

    let mut counts = report.counts;
    for stage in Stage::ALL {
        counts.entry(stage.name()).or_default();
    }
    Ok(CalibrationOutput {
        counts,
        time_at_risk: report.time_at_risk,
    })
}
