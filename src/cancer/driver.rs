//! Cancer-model run loop.

use super::person::{
    CancerAccumulators, CancerPerson, NH_STREAM, OTHER_STREAM, SCREEN_STREAM, TREATMENT_STREAM,
};
use super::{CancerConfig, CancerModel, CancerModelOutput, ConfigError};
use crate::kernel::Simulation;
use crate::report::{CostReport, EventReport, Partition, SimpleReport};
use crate::rng::{RngManager, DEFAULT_PACKAGE_SEED};

impl CancerAccumulators {
    fn new(discount_rate: f64) -> Self {
        let partition = Partition::single_years_with_sentinel(100);
        let mut report = EventReport::new();
        report.set_partition(partition.clone());
        let mut costs = CostReport::new();
        costs.set_partition(partition);
        costs.discount_rate = discount_rate;
        Self {
            report,
            costs,
            life_histories: Vec::new(),
            parameters: SimpleReport::new(),
            psa_records: SimpleReport::new(),
        }
    }

    fn into_output(self) -> CancerModelOutput {
        CancerModelOutput {
            costs: self.costs.out(),
            summary: self.report.out(),
            life_histories: self.life_histories,
            parameters: self.parameters,
            psa_records: self.psa_records,
        }
    }
}

/// Run `n` independent individuals and aggregate their reports.
///
/// Individuals are simulated sequentially; between individuals every named
/// stream advances to its next substream, so a fixed package seed reproduces
/// each individual's life history bit-for-bit regardless of `n`.
pub fn run(config: &CancerConfig) -> Result<CancerModelOutput, ConfigError> {
    config.validate()?;
    let model = CancerModel::build(config)?;

    let mut rng = RngManager::new(config.package_seed.unwrap_or(DEFAULT_PACKAGE_SEED))?;
    rng.create_stream(NH_STREAM);
    rng.create_stream(OTHER_STREAM);
    rng.create_stream(SCREEN_STREAM);
    rng.create_stream(TREATMENT_STREAM);
    rng.set(NH_STREAM);

    let mut out = CancerAccumulators::new(config.discount_rate);
    let mut sim = Simulation::new();

    for i in 0..config.n {
        let mut person = CancerPerson::new(
            &model,
            &mut rng,
            &mut out,
            config.first_id + i,
            config.cohorts[i],
        );
        sim.create_process(&mut person)
            .expect("kernel is idle between individuals");
        sim.run(&mut person);
        sim.clear();
        rng.next_substream_all();
    }

    Ok(out.into_output())
}
