//! Minimal illness-death conformance client.
//!
//! Two live states (healthy, cancer) with Weibull onset and death draws.
//! Exercises the kernel contract end to end: scheduling, competing-event
//! removal by kind, `stop()` on death, and event-report aggregation over the
//! standard one-year partition.

use crate::kernel::{Message, Process, Simulation};
use crate::report::{EventReport, EventReportOutput, Partition};
use crate::rng::{RngManager, DEFAULT_PACKAGE_SEED};
use crate::tables::gamma;
use crate::cancer::ConfigError;
use serde::{Deserialize, Serialize};

const NH_STREAM: &str = "nh";

/// Fraction of individuals with a latent cancer onset.
const CANCER_INCIDENCE: f64 = 0.1;
/// Fraction of cancers that never progress to cancer death.
const CURE_FRACTION: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IllnessState {
    Healthy,
    Cancer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IllnessEvent {
    OtherDeath,
    Cancer,
    CancerDeath,
}

/// Scale of a Weibull distribution with the given mean, shape and hazard
/// ratio.
pub fn weibull_scale_for_mean(mean: f64, shape: f64, hazard_ratio: f64) -> f64 {
    mean / gamma(1.0 + 1.0 / shape) * hazard_ratio.powf(-1.0 / shape)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllnessDeathConfig {
    pub n: usize,
    /// Six-integer package seed; defaults to the reference seed when absent.
    pub package_seed: Option<[u64; 6]>,
}

struct IllnessPerson<'a> {
    rng: &'a mut RngManager,
    report: &'a mut EventReport<IllnessState, IllnessEvent>,
    state: IllnessState,
    frailty: f64,
}

impl Process<IllnessEvent> for IllnessPerson<'_> {
    fn init(&mut self, sim: &mut Simulation<IllnessEvent>) {
        self.state = IllnessState::Healthy;
        self.frailty = 1.0;
        self.rng.set(NH_STREAM);
        let death_age = self
            .rng
            .weibull(4.0, weibull_scale_for_mean(80.0, 4.0, 1.0));
        sim.schedule_at(death_age, IllnessEvent::OtherDeath);
        if self.rng.uniform() < CANCER_INCIDENCE {
            let onset_age = self
                .rng
                .weibull(3.0, weibull_scale_for_mean(80.0, 4.0, self.frailty));
            sim.schedule_at(onset_age, IllnessEvent::Cancer);
        }
    }

    fn handle(&mut self, sim: &mut Simulation<IllnessEvent>, msg: &Message<IllnessEvent>) {
        self.report
            .add(self.state, msg.kind, sim.previous_event_time(), sim.now());

        match msg.kind {
            IllnessEvent::OtherDeath | IllnessEvent::CancerDeath => sim.stop(),

            IllnessEvent::Cancer => {
                self.state = IllnessState::Cancer;
                sim.remove_kind(IllnessEvent::OtherDeath);
                if self.rng.uniform() < CURE_FRACTION {
                    let death_age = sim.now() + self.rng.weibull(1.0, 10.0);
                    sim.schedule_at(death_age, IllnessEvent::CancerDeath);
                }
            }
        }
    }
}

/// Run `n` independent individuals and return the aggregated event report.
pub fn run(
    config: &IllnessDeathConfig,
) -> Result<EventReportOutput<IllnessState, IllnessEvent>, ConfigError> {
    if config.n == 0 {
        return Err(ConfigError::Invalid("n must be > 0".to_string()));
    }
    let mut rng = RngManager::new(config.package_seed.unwrap_or(DEFAULT_PACKAGE_SEED))?;
    rng.create_stream(NH_STREAM);
    rng.set(NH_STREAM);

    let mut report = EventReport::new();
    report.set_partition(Partition::single_years_with_sentinel(100));

    let mut sim = Simulation::new();
    for _ in 0..config.n {
        let mut person = IllnessPerson {
            rng: &mut rng,
            report: &mut report,
            state: IllnessState::Healthy,
            frailty: 1.0,
        };
        sim.create_process(&mut person)
            .expect("kernel is idle between individuals");
        sim.run(&mut person);
        sim.clear();
        rng.next_substream_all();
    }

    Ok(report.out())
}
