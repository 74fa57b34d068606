//! The per-individual prostate-cancer process.

use super::{
    CancerEvent, CancerModel, CostKey, Diagnosis, ExtGrade, FullState, Grade, LifeHistoryRow,
    ScreeningPolicy, State, Treatment,
};
use crate::kernel::{Message, Process, Simulation, Time};
use crate::report::{CostReport, EventReport, SimpleReport};
use crate::rng::RngManager;

pub(crate) const NH_STREAM: &str = "nh";
pub(crate) const OTHER_STREAM: &str = "other";
pub(crate) const SCREEN_STREAM: &str = "screen";
pub(crate) const TREATMENT_STREAM: &str = "treatment";

/// PSA cutoff for the `psa_ge_3` reporting stratum.
const PSA_REPORT_CUTOFF: f64 = 3.0;

/// Baseline utility at entry; revised downwards at the ages below.
const BASELINE_UTILITY: f64 = 0.98;
const AGE_UTILITIES: [(f64, f64); 4] = [(20.0, 0.97), (40.0, 0.96), (60.0, 0.95), (80.0, 0.91)];

/// Hazard ratio of curative treatment for localised disease.
const CURATIVE_TX_HAZARD: f64 = 0.62;

/// Neoplastic growth begins at age 35; natural-history times count from it.
const ONSET_AGE: f64 = 35.0;

/// Run-level result accumulators shared by all individuals.
pub(crate) struct CancerAccumulators {
    pub(crate) report: EventReport<FullState, &'static str>,
    pub(crate) costs: CostReport<CostKey>,
    pub(crate) life_histories: Vec<LifeHistoryRow>,
    pub(crate) parameters: SimpleReport,
    pub(crate) psa_records: SimpleReport,
}

/// One individual's state, plus borrows of the run-wide context.
pub(crate) struct CancerPerson<'a> {
    model: &'a CancerModel,
    rng: &'a mut RngManager,
    out: &'a mut CancerAccumulators,

    id: usize,
    cohort: f64,

    state: State,
    diagnosis: Diagnosis,
    grade: Grade,
    ext_grade: ExtGrade,
    tx: Treatment,
    #[allow(dead_code)]
    adt: bool,

    // PSA trajectory coefficients and derived natural-history times,
    // all in years since age 35
    beta0: f64,
    beta1: f64,
    beta2: f64,
    t0: f64,
    y0: f64,
    tm: f64,
    tc: f64,
    tmc: f64,

    #[allow(dead_code)]
    utility: f64,
    ever_psa: bool,
    #[allow(dead_code)]
    previous_negative_biopsy: bool,
    organised: bool,
}

impl<'a> CancerPerson<'a> {
    pub(crate) fn new(
        model: &'a CancerModel,
        rng: &'a mut RngManager,
        out: &'a mut CancerAccumulators,
        id: usize,
        cohort: f64,
    ) -> Self {
        Self {
            model,
            rng,
            out,
            id,
            cohort,
            state: State::Healthy,
            diagnosis: Diagnosis::NotDiagnosed,
            grade: Grade::GleasonLe7,
            ext_grade: ExtGrade::GleasonLe6,
            tx: Treatment::NoTreatment,
            adt: false,
            beta0: 0.0,
            beta1: 0.0,
            beta2: 0.0,
            t0: 0.0,
            y0: 0.0,
            tm: 0.0,
            tc: 0.0,
            tmc: 0.0,
            utility: BASELINE_UTILITY,
            ever_psa: false,
            previous_negative_biopsy: false,
            organised: false,
        }
    }

    /// Geometric-mean PSA at `t` years after age 35, with the trajectory
    /// kinked at cancer onset `t0`.
    fn psa_mean(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        if t < self.t0 {
            (self.beta0 + self.beta1 * t).exp()
        } else {
            (self.beta0 + self.beta1 * t + self.beta2 * (t - self.t0)).exp()
        }
    }

    /// Measured PSA: the mean trajectory with multiplicative log-normal
    /// noise. Draws from the currently active stream.
    fn psa_measured(&mut self, t: f64) -> f64 {
        let noise = self.rng.normal(0.0, self.model.params.tau2.sqrt());
        self.psa_mean(t) * noise.exp()
    }

    fn add_costs(&mut self, item: &str, now: Time) {
        let amount = self.model.cost_parameters.get(item);
        self.out.costs.add(
            CostKey {
                item: item.to_string(),
                cohort: self.cohort as i32,
            },
            now,
            amount,
        );
    }

    /// Schedule the standard utility dip for a procedure: a decrement now and
    /// the matching recovery after the tabulated duration.
    fn schedule_utility_dip(
        &mut self,
        sim: &mut Simulation<CancerEvent>,
        estimate: &str,
        duration: &str,
    ) {
        let loss = self.model.utility_estimates.get(estimate);
        let span = self.model.utility_duration.get(duration);
        sim.schedule_at(sim.now(), CancerEvent::UtilityChange(-loss));
        sim.schedule_at(sim.now() + span, CancerEvent::UtilityChange(loss));
    }

    /// Primary-treatment assignment by CDF inversion on the (age, year,
    /// grade) treatment table. Any residual probability after CM and RP is
    /// radiotherapy.
    fn calculate_treatment(&self, u: f64, age: f64, year: f64) -> Treatment {
        let key = [age, year, self.grade.index() as f64];
        let p_cm = self.model.tables.prtx_cm.get(key);
        let p_rp = self.model.tables.prtx_rp.get(key);
        if u < p_cm {
            Treatment::ConservativeManagement
        } else if u < p_cm + p_rp {
            Treatment::Prostatectomy
        } else {
            Treatment::Radiotherapy
        }
    }

    /// Age at cancer death for survival fraction `u`, given the diagnosis
    /// age, the counterfactual clinical-diagnosis age `age_c` and the
    /// assigned treatment.
    fn calculate_survival(&self, u: f64, age_diag: f64, age_c: f64, tx: Treatment) -> f64 {
        let params = &self.model.params;
        let age_m = self.tm + ONSET_AGE;
        let localised = age_diag < age_m;
        let txhaz = if localised
            && matches!(tx, Treatment::Prostatectomy | Treatment::Radiotherapy)
        {
            CURATIVE_TX_HAZARD
        } else {
            1.0
        };
        let lead_time = age_c - age_diag;
        let txbenefit = (txhaz.ln() + params.c_txlt_interaction.ln() * lead_time).exp();
        let ustar = u.powf(1.0 / (params.c_baseline_specific * txbenefit * params.sxbenefit));
        let curve = if localised {
            self.model.tables.local_curve(age_diag, self.grade)
        } else {
            self.model.tables.dist_curve(self.grade)
        };
        age_c + curve.invert(-ustar.ln())
    }

    fn record_life_history(&mut self, event: &'static str, begin: f64, end: f64, psa: f64) {
        if self.id < self.model.n_life_histories {
            self.out.life_histories.push(LifeHistoryRow {
                id: self.id,
                state: self.state,
                ext_grade: self.ext_grade,
                diagnosis: self.diagnosis,
                event,
                begin,
                end,
                year: end + self.cohort,
                psa,
            });
        }
    }

    fn schedule_first_screen(&mut self, sim: &mut Simulation<CancerEvent>) {
        match self.model.screen {
            ScreeningPolicy::NoScreening => {}
            ScreeningPolicy::RandomScreen50To70 => {
                let age = self.rng.uniform_range(50.0, 70.0);
                sim.schedule_at(age, CancerEvent::Screen);
            }
            ScreeningPolicy::TwoYearlyScreen50To70 => {
                let mut age = 50.0;
                while age <= 70.0 {
                    sim.schedule_at(age, CancerEvent::Screen);
                    age += 2.0;
                }
            }
            ScreeningPolicy::FourYearlyScreen50To70 => {
                let mut age = 50.0;
                while age <= 70.0 {
                    sim.schedule_at(age, CancerEvent::Screen);
                    age += 4.0;
                }
            }
            ScreeningPolicy::Screen50 => sim.schedule_at(50.0, CancerEvent::Screen),
            ScreeningPolicy::Screen60 => sim.schedule_at(60.0, CancerEvent::Screen),
            ScreeningPolicy::Screen70 => sim.schedule_at(70.0, CancerEvent::Screen),
            ScreeningPolicy::ScreenUptake
            | ScreeningPolicy::Stockholm3Goteborg
            | ScreeningPolicy::Stockholm3RiskStratified => {
                self.schedule_uptake_screen(sim);
            }
        }
    }

    /// First screen under the uptake model: cohorts entering adulthood after
    /// 1995 take a log-logistic age distribution from 35, cohorts already 50+
    /// in 1995 a log-logistic period distribution from 1995, and the cohorts
    /// between a mixture of the two.
    fn schedule_uptake_screen(&mut self, sim: &mut Simulation<CancerEvent>) {
        let p_screening = if self.cohort >= 1932.0 {
            0.9
        } else {
            0.9 - (1932.0 - self.cohort) * 0.03
        };
        let (shape_age, scale_age) = (3.8, 15.0);
        let (shape_period, scale_period) = (2.0, 10.0);
        let u_screening = self.rng.uniform();
        let first_screen = if self.cohort > 1960.0 {
            35.0 + self.rng.log_logistic(shape_age, scale_age)
        } else if self.cohort < 1945.0 {
            (1995.0 - self.cohort) + self.rng.log_logistic(shape_period, scale_period)
        } else {
            let age0 = 1995.0 - self.cohort;
            let u = self.rng.uniform();
            if (age0 - 35.0) / 15.0 < u {
                age0 + self
                    .rng
                    .log_logistic_truncated(shape_age, scale_age, age0 - 35.0)
            } else {
                age0 + self.rng.log_logistic(shape_period, scale_period)
            }
        };
        if u_screening < p_screening {
            sim.schedule_at(first_screen, CancerEvent::Screen);
        }
    }

    fn on_screen(
        &mut self,
        sim: &mut Simulation<CancerEvent>,
        kind: CancerEvent,
        age: f64,
        psa: f64,
        mean_psa: f64,
    ) {
        let params = &self.model.params;
        if self.model.include_psa_records {
            let rec = &mut self.out.psa_records;
            rec.record("id", self.id as f64);
            rec.record("state", self.state as u8 as f64);
            rec.record("ext_grade", self.ext_grade as u8 as f64);
            rec.record("organised", self.organised as u8 as f64);
            rec.record("dx", self.diagnosis as u8 as f64);
            rec.record("age", age);
            rec.record("psa", psa);
            rec.record("t0", self.t0);
            rec.record("beta0", self.beta0);
            rec.record("beta1", self.beta1);
            rec.record("beta2", self.beta2);
            rec.record("mean_psa", mean_psa);
        }

        // test cost and the transient utility dip of being tested
        if self.organised {
            self.add_costs("InvitationCost", age);
            let biomarker = self.model.panel
                || (self.model.screen == ScreeningPolicy::Stockholm3RiskStratified && psa >= 1.0);
            if biomarker {
                self.add_costs("FormalPSABiomarkerCost", age);
            } else {
                self.add_costs("FormalPSACost", age);
            }
            self.schedule_utility_dip(sim, "FormalPSAUtility", "FormalPSAUtilityDuration");
        } else {
            if self.model.panel {
                self.add_costs("OpportunisticPSABiomarkerCost", age);
            } else {
                self.add_costs("OpportunisticPSACost", age);
            }
            self.schedule_utility_dip(
                sim,
                "OpportunisticPSAUtility",
                "OpportunisticPSAUtilityDuration",
            );
        }

        if !self.ever_psa {
            if self.id < self.model.n_life_histories {
                self.out.parameters.revise("age_psa", age);
            }
            self.ever_psa = true;
        }

        let compliance = self.model.tables.biopsy_compliance.get([psa, age]);
        let to_biopsy = match kind {
            CancerEvent::Screen => {
                psa >= params.psa_threshold && self.rng.uniform() < compliance
            }
            _ => {
                psa >= params.psa_threshold_biopsy_follow_up && self.rng.uniform() < compliance
            }
        };
        if to_biopsy {
            sim.schedule_at(sim.now(), CancerEvent::ScreenInitiatedBiopsy);
            return;
        }

        // re-screening schedule
        self.rng.set(SCREEN_STREAM);
        if self.organised {
            match self.model.screen {
                ScreeningPolicy::Stockholm3Goteborg => {
                    let gap = if psa < 1.0 { 4.0 } else { 2.0 };
                    sim.schedule_at(sim.now() + gap, CancerEvent::Screen);
                }
                ScreeningPolicy::Stockholm3RiskStratified => {
                    let gap = if psa < 1.0 { 8.0 } else { 4.0 };
                    sim.schedule_at(sim.now() + gap, CancerEvent::Screen);
                }
                other => {
                    eprintln!("no organised re-screening rule for {other:?}; none scheduled");
                }
            }
        } else {
            match self.model.screen {
                ScreeningPolicy::ScreenUptake
                | ScreeningPolicy::Stockholm3Goteborg
                | ScreeningPolicy::Stockholm3RiskStratified => {
                    let key = [age, psa];
                    let rescreened = 1.0 - self.model.tables.rescreen_cure.get(key);
                    let shape = self.model.tables.rescreen_shape.get(key);
                    let scale = self.model.tables.rescreen_scale.get(key);
                    let u = self.rng.uniform();
                    let at = sim.now() + self.rng.weibull(shape, scale);
                    if u < rescreened {
                        sim.schedule_at(at, CancerEvent::Screen);
                    }
                }
                _ => {} // fixed protocols already scheduled every screen
            }
        }
        self.rng.set(NH_STREAM);
    }

    fn on_screen_initiated_biopsy(&mut self, sim: &mut Simulation<CancerEvent>, age: f64) {
        let params = &self.model.params;
        self.add_costs("BiopsyCost", age);
        self.schedule_utility_dip(sim, "BiopsyUtility", "BiopsyUtilityDuration");

        match self.state {
            State::Healthy => {
                self.previous_negative_biopsy = true;
                if age < 70.0 && self.rng.uniform() < params.screening_compliance {
                    sim.schedule_at(sim.now() + 1.0, CancerEvent::BiopsyFollowUpScreen);
                }
            }
            State::Metastatic => {
                sim.schedule_at(sim.now(), CancerEvent::ScreenDiagnosis);
            }
            State::Localised => {
                if self.rng.uniform() < params.biopsy_sensitivity {
                    sim.schedule_at(sim.now(), CancerEvent::ScreenDiagnosis);
                } else {
                    // false negative
                    if age < 70.0 && self.rng.uniform() < params.screening_compliance {
                        sim.schedule_at(sim.now() + 1.0, CancerEvent::BiopsyFollowUpScreen);
                    }
                }
            }
        }
    }

    fn on_treatment(&mut self, sim: &mut Simulation<CancerEvent>, age: f64, year: f64) {
        let params = &self.model.params;

        self.rng.set(TREATMENT_STREAM);
        let u_tx = self.rng.uniform();
        let u_adt = self.rng.uniform();
        if self.state == State::Metastatic {
            self.add_costs("MetastaticCancerCost", age);
            let loss = self.model.utility_estimates.get("MetastaticCancerUtility");
            sim.schedule_at(sim.now(), CancerEvent::UtilityChange(-loss));
        } else {
            self.tx = self.calculate_treatment(u_tx, age, year);
            match self.tx {
                Treatment::ConservativeManagement => {
                    sim.schedule_at(sim.now(), CancerEvent::ConservativeManagement)
                }
                Treatment::Prostatectomy => {
                    sim.schedule_at(sim.now(), CancerEvent::Prostatectomy)
                }
                Treatment::Radiotherapy => {
                    sim.schedule_at(sim.now(), CancerEvent::Radiotherapy)
                }
                Treatment::NoTreatment => {}
            }
            let p_adt = self.model.tables.pradt.get([
                self.tx.index() as f64,
                age,
                year,
                self.grade.index() as f64,
            ]);
            if u_adt < p_adt {
                self.adt = true;
                sim.schedule_at(sim.now(), CancerEvent::Adt);
            }
        }
        self.rng.set(NH_STREAM);

        // Cancer survival: mix the counterfactual no-lead-time survival with
        // the screened-arm survival, weighting by exponentially decaying
        // lead-time benefit.
        let u_surv = self.rng.uniform();
        let age_c = if self.state == State::Localised {
            self.tc + ONSET_AGE
        } else {
            self.tmc + ONSET_AGE
        };
        let lead_time = age_c - age;
        let counterfactual_tx = self.calculate_treatment(u_tx, age_c, year + lead_time);
        let age_cd = self.calculate_survival(u_surv, age_c, age_c, counterfactual_tx);
        let age_sd = self.calculate_survival(u_surv, age, age_c, self.tx);
        let weight = (-params.c_benefit_value * lead_time).exp();
        let age_cancer_death = weight * age_cd + (1.0 - weight) * age_sd;
        sim.schedule_at(age_cancer_death, CancerEvent::CancerDeath);

        // Utility decrements for the metastatic and palliative phases that
        // precede cancer death.
        let metastatic_loss = self.model.utility_estimates.get("MetastaticCancerUtility");
        let palliative_loss = self.model.utility_estimates.get("PalliativeUtility");
        let metastatic_span = self
            .model
            .utility_duration
            .get("MetastaticCancerUtilityDuration");
        let palliative_span = self.model.utility_duration.get("PalliativeUtilityDuration");
        if self.state == State::Localised {
            let onset = age_cancer_death - metastatic_span - palliative_span;
            let at = if onset > sim.now() { onset } else { sim.now() };
            sim.schedule_at(at, CancerEvent::UtilityChange(-metastatic_loss));
        }
        let palliative_onset = age_cancer_death - palliative_span;
        let at = if palliative_onset > sim.now() {
            palliative_onset
        } else {
            sim.now()
        };
        sim.schedule_at(
            at,
            CancerEvent::UtilityChange(-palliative_loss + metastatic_loss),
        );
    }
}

impl Process<CancerEvent> for CancerPerson<'_> {
    /// Draw the individual's natural history and prime the queue.
    fn init(&mut self, sim: &mut Simulation<CancerEvent>) {
        let params = &self.model.params;

        self.rng.set(NH_STREAM);
        self.t0 = (2.0 * self.rng.exponential(1.0) / params.g0).sqrt();
        self.grade = if self.rng.uniform() >= 1.0 + params.c_low_grade_slope * self.t0 {
            Grade::GleasonGe8
        } else {
            Grade::GleasonLe7
        };
        self.beta0 = self.rng.normal(params.mubeta0, params.sebeta0);
        self.beta1 = self.rng.normal_positive(params.mubeta1, params.sebeta1);
        self.beta2 = self.rng.normal_positive(
            params.mubeta2[self.grade.index()],
            params.sebeta2[self.grade.index()],
        );
        self.y0 = self.psa_mean(self.t0);

        // invert the integrated hazards for metastasis and clinical
        // presentation
        let slope = self.beta1 + self.beta2;
        self.tm = ((slope * self.rng.exponential(1.0) / params.gm + self.y0).ln() - self.beta0
            + self.beta2 * self.t0)
            / slope;
        let ym = self.psa_mean(self.tm);
        self.tc = ((slope * self.rng.exponential(1.0) / params.gc + self.y0).ln() - self.beta0
            + self.beta2 * self.t0)
            / slope;
        self.tmc = ((slope * self.rng.exponential(1.0) / (params.gc * params.thetac) + ym).ln()
            - self.beta0
            + self.beta2 * self.t0)
            / slope;

        let birth_offset = self.rng.uniform();
        let exp_draw = self.rng.exponential(1.0);
        let age_other_death = self.model.other_cause_mortality.sample(exp_draw, birth_offset);

        self.ext_grade = if self.grade == Grade::GleasonLe7 {
            if self.rng.uniform() <= self.model.tables.prob_grade7.approx(self.beta2) {
                ExtGrade::Gleason7
            } else {
                ExtGrade::GleasonLe6
            }
        } else {
            ExtGrade::GleasonGe8
        };
        self.tx = Treatment::NoTreatment;

        sim.schedule_at(self.t0 + ONSET_AGE, CancerEvent::Localised);
        sim.schedule_at(age_other_death, CancerEvent::OtherDeath);

        self.rng.set(SCREEN_STREAM);
        if self.rng.uniform() < params.screening_compliance {
            self.schedule_first_screen(sim);
        }
        let u_study = self.rng.uniform();
        let age_2013 = 2013.0 - self.cohort;
        if u_study < params.study_participation
            && self.model.screen.is_stockholm3()
            && (50.0..70.0).contains(&age_2013)
        {
            let organised_at = self.rng.uniform_range(2013.0, 2015.0) - self.cohort;
            sim.schedule_at(organised_at, CancerEvent::Organised);
        }
        self.rng.set(NH_STREAM);

        self.utility = BASELINE_UTILITY;
        for (at, utility) in AGE_UTILITIES {
            sim.schedule_at(at, CancerEvent::UtilitySet(utility));
        }

        if self.id < self.model.n_life_histories {
            let rec = &mut self.out.parameters;
            rec.record("id", self.id as f64);
            rec.record("beta0", self.beta0);
            rec.record("beta1", self.beta1);
            rec.record("beta2", self.beta2);
            rec.record("t0", self.t0);
            rec.record("tm", self.tm);
            rec.record("tc", self.tc);
            rec.record("tmc", self.tmc);
            rec.record("y0", self.y0);
            rec.record("ym", ym);
            rec.record("aoc", age_other_death);
            rec.record("cohort", self.cohort);
            rec.record("ext_grade", self.ext_grade as u8 as f64);
            rec.record("age_psa", -1.0);
            rec.record("pca_death", 0.0);
        }
    }

    fn handle(&mut self, sim: &mut Simulation<CancerEvent>, msg: &Message<CancerEvent>) {
        // The measurement noise draw reads from whichever stream is active on
        // entry; every handler exits with the natural-history stream set.
        let age = sim.now();
        let psa = self.psa_measured(age - ONSET_AGE);
        let mean_psa = self.psa_mean(age - ONSET_AGE);
        let year = age + self.cohort;

        self.out.report.add(
            FullState {
                state: self.state,
                ext_grade: self.ext_grade,
                diagnosis: self.diagnosis,
                psa_ge_3: psa >= PSA_REPORT_CUTOFF,
                cohort: self.cohort as i32,
            },
            msg.kind.label(),
            sim.previous_event_time(),
            age,
        );
        self.record_life_history(msg.kind.label(), sim.previous_event_time(), age, psa);

        self.rng.set(NH_STREAM);

        match msg.kind {
            CancerEvent::CancerDeath => {
                self.add_costs("DeathCost", age);
                if self.id < self.model.n_life_histories {
                    self.out.parameters.record("age_d", age);
                    self.out.parameters.revise("pca_death", 1.0);
                }
                sim.stop();
            }

            CancerEvent::OtherDeath => {
                self.add_costs("DeathCost", age);
                if self.id < self.model.n_life_histories {
                    self.out.parameters.record("age_d", age);
                }
                sim.stop();
            }

            CancerEvent::Localised => {
                self.state = State::Localised;
                sim.schedule_at(self.tc + ONSET_AGE, CancerEvent::ClinicalDiagnosis);
                sim.schedule_at(self.tm + ONSET_AGE, CancerEvent::Metastatic);
            }

            CancerEvent::Metastatic => {
                self.state = State::Metastatic;
                sim.remove_kind(CancerEvent::ClinicalDiagnosis);
                sim.remove_if(|m| matches!(m.kind, CancerEvent::UtilitySet(_)));
                sim.schedule_at(self.tmc + ONSET_AGE, CancerEvent::ClinicalDiagnosis);
            }

            CancerEvent::ClinicalDiagnosis => {
                self.diagnosis = Diagnosis::ClinicalDiagnosis;
                sim.remove_kind(CancerEvent::Metastatic); // competing events
                sim.remove_kind(CancerEvent::Screen);
                sim.remove_kind(CancerEvent::BiopsyFollowUpScreen);
                // three biopsies per clinical diagnosis, then treatment, all
                // at the same instant in FIFO order
                sim.schedule_at(sim.now(), CancerEvent::ClinicalDiagnosticBiopsy);
                sim.schedule_at(sim.now(), CancerEvent::ClinicalDiagnosticBiopsy);
                sim.schedule_at(sim.now(), CancerEvent::ClinicalDiagnosticBiopsy);
                sim.schedule_at(sim.now(), CancerEvent::Treatment);
            }

            CancerEvent::Organised => {
                self.organised = true;
                sim.remove_kind(CancerEvent::Screen); // drop opportunistic screens
                sim.schedule_at(sim.now(), CancerEvent::Screen);
            }

            CancerEvent::Screen | CancerEvent::BiopsyFollowUpScreen => {
                self.on_screen(sim, msg.kind, age, psa, mean_psa);
            }

            CancerEvent::ScreenDiagnosis => {
                self.diagnosis = Diagnosis::ScreenDiagnosis;
                sim.remove_kind(CancerEvent::Metastatic); // competing events
                sim.remove_kind(CancerEvent::ClinicalDiagnosis);
                sim.remove_kind(CancerEvent::Screen);
                sim.remove_kind(CancerEvent::BiopsyFollowUpScreen);
                sim.schedule_at(sim.now(), CancerEvent::Treatment);
            }

            CancerEvent::ClinicalDiagnosticBiopsy => {
                self.add_costs("BiopsyCost", age);
                self.schedule_utility_dip(sim, "BiopsyUtility", "BiopsyUtilityDuration");
            }

            CancerEvent::ScreenInitiatedBiopsy => {
                self.on_screen_initiated_biopsy(sim, age);
            }

            CancerEvent::Treatment => {
                self.on_treatment(sim, age, year);
            }

            CancerEvent::Prostatectomy => {
                self.add_costs("ProstatectomyCost", age);
                // utility dips for the first two months, then months 3-12
                self.schedule_utility_dip(
                    sim,
                    "ProstatectomyUtilityPart1",
                    "ProstatectomyUtilityDurationPart1",
                );
                let part2 = self.model.utility_estimates.get("ProstatectomyUtilityPart2");
                let start = self
                    .model
                    .utility_duration
                    .get("ProstatectomyUtilityDurationPart1");
                let end = self
                    .model
                    .utility_duration
                    .get("ProstatectomyUtilityDurationPart2");
                sim.schedule_at(sim.now() + start, CancerEvent::UtilityChange(-part2));
                sim.schedule_at(sim.now() + end, CancerEvent::UtilityChange(part2));
            }

            CancerEvent::Radiotherapy => {
                self.add_costs("RadiationTherapyCost", age);
                self.schedule_utility_dip(
                    sim,
                    "RadiationTherapyUtilityPart1",
                    "RadiationTherapyUtilityDurationPart1",
                );
                let part2 = self
                    .model
                    .utility_estimates
                    .get("RadiationTherapyUtilityPart2");
                let start = self
                    .model
                    .utility_duration
                    .get("RadiationTherapyUtilityDurationPart1");
                let end = self
                    .model
                    .utility_duration
                    .get("RadiationTherapyUtilityDurationPart2");
                sim.schedule_at(sim.now() + start, CancerEvent::UtilityChange(-part2));
                sim.schedule_at(sim.now() + end, CancerEvent::UtilityChange(part2));
            }

            CancerEvent::ConservativeManagement => {
                self.add_costs("ActiveSurveillanceCost", age);
                self.schedule_utility_dip(
                    sim,
                    "ActiveSurveillanceUtility",
                    "ActiveSurveillanceUtilityDuration",
                );
            }

            CancerEvent::Adt => {
                // androgen-deprivation therapy carries no separate cost or
                // utility in the current tables
            }

            CancerEvent::UtilitySet(utility) => {
                self.utility = utility;
            }

            CancerEvent::UtilityChange(change) => {
                self.utility += change;
            }
        }
    }
}
