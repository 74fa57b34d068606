//! Prostate-cancer natural-history and screening model.
//!
//! The canonical client of the simulation kernel: individuals progress
//! Healthy → Localised → Metastatic with PSA-informed screening, biopsy,
//! treatment and survival, and every transition is recorded into the
//! age-partitioned reports.
//!
//! # Architecture
//!
//! - `mod.rs`: domain enums, parameter bundles, lookup-table bundle, outputs
//! - `person`: the per-individual process (`init` + `handle`)
//! - `driver`: runs `n` individuals with the four-stream substream protocol

mod driver;
mod person;

pub use driver::run;

use crate::report::{CostRow, EventReportOutput, SimpleReport};
use crate::rng::SeedError;
use crate::tables::{PiecewiseExponential, PiecewiseLinear, Table};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Domain enums
// ============================================================================

/// Disease state. Monotone: Healthy → Localised → Metastatic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum State {
    Healthy,
    Localised,
    Metastatic,
}

/// Diagnosis status. Monotone: NotDiagnosed → {Clinical, Screen}, once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Diagnosis {
    NotDiagnosed,
    ClinicalDiagnosis,
    ScreenDiagnosis,
}

/// Internal two-level Gleason grade; indexes the β₂ and survival tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Grade {
    GleasonLe7,
    GleasonGe8,
}

impl Grade {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Extended three-level Gleason grade, refined from [`Grade`] by the
/// interpolated Pr(Gleason 7 | β₂) curve.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ExtGrade {
    GleasonLe6,
    Gleason7,
    GleasonGe8,
}

/// Primary treatment for localised disease.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Treatment {
    NoTreatment,
    /// Conservative management (active surveillance).
    ConservativeManagement,
    /// Radical prostatectomy.
    Prostatectomy,
    Radiotherapy,
}

impl Treatment {
    /// Key used on the ADT probability table's treatment axis.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The model's self-message vocabulary. Payload-bearing utility updates are
/// ordinary variants; no downcasting anywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CancerEvent {
    Localised,
    Metastatic,
    ClinicalDiagnosis,
    CancerDeath,
    OtherDeath,
    Screen,
    BiopsyFollowUpScreen,
    ScreenInitiatedBiopsy,
    ClinicalDiagnosticBiopsy,
    ScreenDiagnosis,
    Organised,
    Treatment,
    ConservativeManagement,
    Prostatectomy,
    Radiotherapy,
    Adt,
    /// Add the payload to the current utility.
    UtilityChange(f64),
    /// Replace the current utility with the payload.
    UtilitySet(f64),
}

impl CancerEvent {
    /// Stable label used as the event key in report output.
    pub fn label(&self) -> &'static str {
        match self {
            CancerEvent::Localised => "localised",
            CancerEvent::Metastatic => "metastatic",
            CancerEvent::ClinicalDiagnosis => "clinical_diagnosis",
            CancerEvent::CancerDeath => "cancer_death",
            CancerEvent::OtherDeath => "other_death",
            CancerEvent::Screen => "screen",
            CancerEvent::BiopsyFollowUpScreen => "biopsy_follow_up_screen",
            CancerEvent::ScreenInitiatedBiopsy => "screen_initiated_biopsy",
            CancerEvent::ClinicalDiagnosticBiopsy => "clinical_diagnostic_biopsy",
            CancerEvent::ScreenDiagnosis => "screen_diagnosis",
            CancerEvent::Organised => "organised",
            CancerEvent::Treatment => "treatment",
            CancerEvent::ConservativeManagement => "conservative_management",
            CancerEvent::Prostatectomy => "prostatectomy",
            CancerEvent::Radiotherapy => "radiotherapy",
            CancerEvent::Adt => "adt",
            CancerEvent::UtilityChange(_) => "utility_change",
            CancerEvent::UtilitySet(_) => "utility_set",
        }
    }
}

/// Screening protocol. Each policy fully determines the initial screen
/// schedule and the re-screening rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
pub enum ScreeningPolicy {
    NoScreening,
    RandomScreen50To70,
    TwoYearlyScreen50To70,
    FourYearlyScreen50To70,
    Screen50,
    Screen60,
    Screen70,
    ScreenUptake,
    Stockholm3Goteborg,
    Stockholm3RiskStratified,
}

impl ScreeningPolicy {
    pub fn is_stockholm3(self) -> bool {
        matches!(
            self,
            ScreeningPolicy::Stockholm3Goteborg | ScreeningPolicy::Stockholm3RiskStratified
        )
    }
}

/// Report state key: the observable strata of one individual at event time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize,
)]
pub struct FullState {
    pub state: State,
    pub ext_grade: ExtGrade,
    pub diagnosis: Diagnosis,
    /// Measured PSA at or above the reporting cutoff (3 ng/ml).
    pub psa_ge_3: bool,
    pub cohort: i32,
}

/// Cost accumulation key: item crossed with birth cohort.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CostKey {
    pub item: String,
    pub cohort: i32,
}

// ============================================================================
// Parameters
// ============================================================================

/// Scalar and vector natural-history parameters.
///
/// β coefficients describe the log-linear PSA trajectory with a kink at
/// cancer onset; `g*` are the integrated-hazard rates for onset, metastasis
/// and clinical presentation; `mu0` is the one-year other-cause mortality
/// grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaturalHistoryParams {
    pub g0: f64,
    pub gm: f64,
    pub gc: f64,
    pub thetac: f64,
    pub tau2: f64,
    pub mubeta0: f64,
    pub sebeta0: f64,
    pub mubeta1: f64,
    pub sebeta1: f64,
    /// Mean of β₂ by grade (≤7, ≥8).
    pub mubeta2: [f64; 2],
    /// Standard deviation of β₂ by grade.
    pub sebeta2: [f64; 2],
    pub c_low_grade_slope: f64,
    pub c_txlt_interaction: f64,
    pub c_baseline_specific: f64,
    pub sxbenefit: f64,
    pub c_benefit_value: f64,
    pub psa_threshold: f64,
    pub psa_threshold_biopsy_follow_up: f64,
    pub biopsy_sensitivity: f64,
    pub screening_compliance: f64,
    pub study_participation: f64,
    /// Annual other-cause mortality hazards for ages 0, 1, ..
    pub mu0: Vec<f64>,
}

/// Named scalar bundle (costs, utility estimates, utility durations).
///
/// Reading an unset name is a contract violation and panics; the model's
/// item names are fixed, so a missing entry is a configuration programming
/// error, not data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamedValues(BTreeMap<String, f64>);

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) -> &mut Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// # Panics
    ///
    /// Panics if `name` was never set.
    pub fn get(&self, name: &str) -> f64 {
        *self
            .0
            .get(name)
            .unwrap_or_else(|| panic!("parameter {name:?} not set"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl FromIterator<(String, f64)> for NamedValues {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// Table inputs
// ============================================================================

/// One row of the primary-treatment probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRow {
    pub age: f64,
    pub dx_year: f64,
    pub grade: Grade,
    /// P(conservative management).
    pub cm: f64,
    /// P(radical prostatectomy); the residual after cm + rp is radiotherapy.
    pub rp: f64,
}

/// One row of the ADT probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdtRow {
    pub tx: Treatment,
    pub age: f64,
    pub dx_year: f64,
    pub grade: Grade,
    pub adt: f64,
}

/// One row of the biopsy-compliance surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiopsyComplianceRow {
    pub psa: f64,
    pub age: f64,
    pub compliance: f64,
}

/// One row of the opportunistic re-screening surface (Weibull interval with
/// a cure fraction of never re-screening).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RescreeningRow {
    pub age: f64,
    pub psa: f64,
    pub shape: f64,
    pub scale: f64,
    pub cure: f64,
}

/// One knot of the Pr(Gleason 7 | β₂) curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade7Row {
    pub beta2: f64,
    pub p: f64,
}

/// One knot of a metastatic survival curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalDistRow {
    pub grade: Grade,
    pub time: f64,
    pub survival: f64,
}

/// One knot of a localised survival curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalLocalRow {
    pub age: f64,
    pub grade: Grade,
    pub time: f64,
    pub survival: f64,
}

/// Raw table rows as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancerTableInputs {
    pub prtx: Vec<TreatmentRow>,
    pub pradt: Vec<AdtRow>,
    pub biopsy_compliance: Vec<BiopsyComplianceRow>,
    pub rescreening: Vec<RescreeningRow>,
    pub prob_grade7: Vec<Grade7Row>,
    pub survival_dist: Vec<SurvivalDistRow>,
    pub survival_local: Vec<SurvivalLocalRow>,
}

/// Prepared lookup structures, built once per run from the raw rows.
#[derive(Debug, Clone)]
pub(crate) struct CancerTables {
    pub(crate) prtx_cm: Table<3>,
    pub(crate) prtx_rp: Table<3>,
    pub(crate) pradt: Table<4>,
    pub(crate) biopsy_compliance: Table<2>,
    pub(crate) rescreen_shape: Table<2>,
    pub(crate) rescreen_scale: Table<2>,
    pub(crate) rescreen_cure: Table<2>,
    pub(crate) prob_grade7: PiecewiseLinear,
    /// Cumulative-hazard curves by grade for metastatic diagnoses.
    pub(crate) survival_dist: BTreeMap<usize, PiecewiseLinear>,
    /// Cumulative-hazard curves by (age index, grade) for localised
    /// diagnoses, with the sorted diagnosis-age grid alongside.
    pub(crate) survival_local: BTreeMap<(usize, usize), PiecewiseLinear>,
    pub(crate) local_ages: Vec<f64>,
}

impl CancerTables {
    pub(crate) fn build(inputs: &CancerTableInputs) -> Result<Self, ConfigError> {
        fn require(name: &str, ok: bool) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("table {name} is empty")))
            }
        }
        require("prtx", !inputs.prtx.is_empty())?;
        require("pradt", !inputs.pradt.is_empty())?;
        require("biopsy_compliance", !inputs.biopsy_compliance.is_empty())?;
        require("rescreening", !inputs.rescreening.is_empty())?;
        require("prob_grade7", !inputs.prob_grade7.is_empty())?;
        require("survival_dist", !inputs.survival_dist.is_empty())?;
        require("survival_local", !inputs.survival_local.is_empty())?;

        let prtx_cm = Table::from_rows(
            &inputs
                .prtx
                .iter()
                .map(|r| ([r.age, r.dx_year, r.grade.index() as f64], r.cm))
                .collect::<Vec<_>>(),
        );
        let prtx_rp = Table::from_rows(
            &inputs
                .prtx
                .iter()
                .map(|r| ([r.age, r.dx_year, r.grade.index() as f64], r.rp))
                .collect::<Vec<_>>(),
        );
        let pradt = Table::from_rows(
            &inputs
                .pradt
                .iter()
                .map(|r| {
                    (
                        [
                            r.tx.index() as f64,
                            r.age,
                            r.dx_year,
                            r.grade.index() as f64,
                        ],
                        r.adt,
                    )
                })
                .collect::<Vec<_>>(),
        );
        let biopsy_compliance = Table::from_rows(
            &inputs
                .biopsy_compliance
                .iter()
                .map(|r| ([r.psa, r.age], r.compliance))
                .collect::<Vec<_>>(),
        );
        let rescreen_shape = Table::from_rows(
            &inputs
                .rescreening
                .iter()
                .map(|r| ([r.age, r.psa], r.shape))
                .collect::<Vec<_>>(),
        );
        let rescreen_scale = Table::from_rows(
            &inputs
                .rescreening
                .iter()
                .map(|r| ([r.age, r.psa], r.scale))
                .collect::<Vec<_>>(),
        );
        let rescreen_cure = Table::from_rows(
            &inputs
                .rescreening
                .iter()
                .map(|r| ([r.age, r.psa], r.cure))
                .collect::<Vec<_>>(),
        );
        let prob_grade7 =
            PiecewiseLinear::new(inputs.prob_grade7.iter().map(|r| (r.beta2, r.p)).collect());

        // Survival tables arrive as S(t); curves store the cumulative hazard
        // -ln S(t) so that inversion against -ln(u*) yields a time.
        let mut dist_points: BTreeMap<usize, Vec<(f64, f64)>> = BTreeMap::new();
        for row in &inputs.survival_dist {
            dist_points
                .entry(row.grade.index())
                .or_default()
                .push((row.time, -row.survival.ln()));
        }
        let survival_dist = dist_points
            .into_iter()
            .map(|(grade, points)| (grade, PiecewiseLinear::new(points)))
            .collect();

        let mut local_ages: Vec<f64> = inputs.survival_local.iter().map(|r| r.age).collect();
        local_ages.sort_by(f64::total_cmp);
        local_ages.dedup();
        let mut local_points: BTreeMap<(usize, usize), Vec<(f64, f64)>> = BTreeMap::new();
        for row in &inputs.survival_local {
            let age_index = local_ages
                .iter()
                .position(|&a| a == row.age)
                .expect("age came from the same rows");
            local_points
                .entry((age_index, row.grade.index()))
                .or_default()
                .push((row.time, -row.survival.ln()));
        }
        let survival_local = local_points
            .into_iter()
            .map(|(key, points)| (key, PiecewiseLinear::new(points)))
            .collect();

        Ok(Self {
            prtx_cm,
            prtx_rp,
            pradt,
            biopsy_compliance,
            rescreen_shape,
            rescreen_scale,
            rescreen_cure,
            prob_grade7,
            survival_dist,
            survival_local,
            local_ages,
        })
    }

    /// The localised cumulative-hazard curve for a diagnosis age and grade:
    /// clamp the age to the table range, then take the smallest tabulated
    /// age at or above it.
    pub(crate) fn local_curve(&self, age_diag: f64, grade: Grade) -> &PiecewiseLinear {
        let clamped = age_diag.clamp(self.local_ages[0], self.local_ages[self.local_ages.len() - 1]);
        let mut index = self.local_ages.partition_point(|&a| a < clamped);
        if index == self.local_ages.len() {
            index -= 1;
        }
        self.survival_local
            .get(&(index, grade.index()))
            .unwrap_or_else(|| {
                eprintln!(
                    "no localised survival curve for age {} grade {:?}; using nearest",
                    self.local_ages[index], grade
                );
                self.survival_local
                    .values()
                    .next()
                    .expect("survival_local is non-empty")
            })
    }

    /// The metastatic cumulative-hazard curve for a grade.
    pub(crate) fn dist_curve(&self, grade: Grade) -> &PiecewiseLinear {
        self.survival_dist
            .get(&grade.index())
            .unwrap_or_else(|| {
                eprintln!("no metastatic survival curve for grade {grade:?}; using nearest");
                self.survival_dist
                    .values()
                    .next()
                    .expect("survival_dist is non-empty")
            })
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Complete cancer-model run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancerConfig {
    /// Number of individuals to simulate.
    pub n: usize,

    /// Identifier of the first individual (life histories are recorded for
    /// ids below `n_life_histories`).
    pub first_id: usize,

    /// Birth cohort (calendar year) per individual; length must equal `n`.
    pub cohorts: Vec<f64>,

    /// Screening protocol for the whole run.
    pub screen: ScreeningPolicy,

    /// Record full life histories for ids below this bound.
    pub n_life_histories: usize,

    /// Record one row per PSA test.
    pub include_psa_records: bool,

    /// Use the biomarker panel instead of plain PSA for test costs.
    pub panel: bool,

    /// Discount rate applied by the cost report.
    pub discount_rate: f64,

    /// Six-integer package seed; defaults to the reference seed when absent.
    pub package_seed: Option<[u64; 6]>,

    pub parameters: NaturalHistoryParams,
    pub cost_parameters: NamedValues,
    pub utility_estimates: NamedValues,
    pub utility_duration: NamedValues,
    pub tables: CancerTableInputs,
}

impl CancerConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::Invalid(format!("configuration JSON: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n == 0 {
            return Err(ConfigError::Invalid("n must be > 0".to_string()));
        }
        if self.cohorts.len() != self.n {
            return Err(ConfigError::Invalid(format!(
                "cohorts has {} entries for n = {}",
                self.cohorts.len(),
                self.n
            )));
        }
        if self.parameters.mu0.is_empty() {
            return Err(ConfigError::Invalid(
                "mu0 mortality grid must not be empty".to_string(),
            ));
        }
        if !self.parameters.mu0.iter().all(|&h| h > 0.0 && h.is_finite()) {
            return Err(ConfigError::Invalid(
                "mu0 hazards must be positive and finite".to_string(),
            ));
        }
        for (name, value) in [
            ("g0", self.parameters.g0),
            ("gm", self.parameters.gm),
            ("gc", self.parameters.gc),
            ("thetac", self.parameters.thetac),
            ("sebeta0", self.parameters.sebeta0),
            ("sebeta1", self.parameters.sebeta1),
        ] {
            if value <= 0.0 || !value.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Configuration-stage failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Seed(#[from] SeedError),
}

// ============================================================================
// Outputs
// ============================================================================

/// One recorded life-history event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifeHistoryRow {
    pub id: usize,
    pub state: State,
    pub ext_grade: ExtGrade,
    pub diagnosis: Diagnosis,
    pub event: &'static str,
    pub begin: f64,
    pub end: f64,
    pub year: f64,
    pub psa: f64,
}

/// The result bundle of one cancer-model run.
#[derive(Debug, Clone, Serialize)]
pub struct CancerModelOutput {
    pub costs: Vec<CostRow<CostKey>>,
    pub summary: EventReportOutput<FullState, &'static str>,
    pub life_histories: Vec<LifeHistoryRow>,
    pub parameters: SimpleReport,
    pub psa_records: SimpleReport,
}

/// Prepared, immutable model context shared by all individuals in a run.
#[derive(Debug, Clone)]
pub(crate) struct CancerModel {
    pub(crate) params: NaturalHistoryParams,
    pub(crate) cost_parameters: NamedValues,
    pub(crate) utility_estimates: NamedValues,
    pub(crate) utility_duration: NamedValues,
    pub(crate) tables: CancerTables,
    pub(crate) other_cause_mortality: PiecewiseExponential,
    pub(crate) screen: ScreeningPolicy,
    pub(crate) n_life_histories: usize,
    pub(crate) include_psa_records: bool,
    pub(crate) panel: bool,
}

impl CancerModel {
    pub(crate) fn build(config: &CancerConfig) -> Result<Self, ConfigError> {
        let tables = CancerTables::build(&config.tables)?;
        let other_cause_mortality =
            PiecewiseExponential::from_annual_rates(config.parameters.mu0.clone());
        Ok(Self {
            params: config.parameters.clone(),
            cost_parameters: config.cost_parameters.clone(),
            utility_estimates: config.utility_estimates.clone(),
            utility_duration: config.utility_duration.clone(),
            tables,
            other_cause_mortality,
            screen: config.screen,
            n_life_histories: config.n_life_histories,
            include_psa_records: config.include_psa_records,
            panel: config.panel,
        })
    }
}
