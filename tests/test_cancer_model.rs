//! End-to-end scenarios for the prostate-cancer model.
//!
//! The fixtures pin the natural history into known corners (no cancer, early
//! clinical presentation) by choosing extreme integrated-hazard rates, so the
//! assertions hold for every draw rather than for one lucky seed.

use lifecourse_simulator_core_rs::cancer::{
    run, AdtRow, BiopsyComplianceRow, CancerConfig, CancerTableInputs, Grade, Grade7Row,
    NamedValues, NaturalHistoryParams, RescreeningRow, ScreeningPolicy, SurvivalDistRow,
    SurvivalLocalRow, Treatment, TreatmentRow,
};

const ALL_ONES: [u64; 6] = [1, 1, 1, 1, 1, 1];

fn named(pairs: &[(&str, f64)]) -> NamedValues {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

fn cost_parameters() -> NamedValues {
    named(&[
        ("DeathCost", 1_000.0),
        ("InvitationCost", 5.0),
        ("FormalPSACost", 30.0),
        ("FormalPSABiomarkerCost", 90.0),
        ("OpportunisticPSACost", 25.0),
        ("OpportunisticPSABiomarkerCost", 85.0),
        ("BiopsyCost", 400.0),
        ("MetastaticCancerCost", 20_000.0),
        ("ProstatectomyCost", 12_000.0),
        ("RadiationTherapyCost", 9_000.0),
        ("ActiveSurveillanceCost", 2_000.0),
    ])
}

fn utility_estimates() -> NamedValues {
    named(&[
        ("FormalPSAUtility", 0.01),
        ("OpportunisticPSAUtility", 0.01),
        ("BiopsyUtility", 0.05),
        ("MetastaticCancerUtility", 0.40),
        ("PalliativeUtility", 0.60),
        ("ProstatectomyUtilityPart1", 0.20),
        ("ProstatectomyUtilityPart2", 0.10),
        ("RadiationTherapyUtilityPart1", 0.18),
        ("RadiationTherapyUtilityPart2", 0.08),
        ("ActiveSurveillanceUtility", 0.03),
    ])
}

fn utility_duration() -> NamedValues {
    named(&[
        ("FormalPSAUtilityDuration", 0.05),
        ("OpportunisticPSAUtilityDuration", 0.05),
        ("BiopsyUtilityDuration", 0.1),
        ("MetastaticCancerUtilityDuration", 3.0),
        ("PalliativeUtilityDuration", 0.5),
        ("ProstatectomyUtilityDurationPart1", 0.1667),
        ("ProstatectomyUtilityDurationPart2", 1.0),
        ("RadiationTherapyUtilityDurationPart1", 0.1667),
        ("RadiationTherapyUtilityDurationPart2", 1.0),
        ("ActiveSurveillanceUtilityDuration", 7.0),
    ])
}

fn tables() -> CancerTableInputs {
    let mut prtx = Vec::new();
    let mut pradt = Vec::new();
    let mut survival_dist = Vec::new();
    let mut survival_local = Vec::new();
    for grade in [Grade::GleasonLe7, Grade::GleasonGe8] {
        for age in [50.0, 65.0, 80.0] {
            for dx_year in [1973.0, 1995.0] {
                prtx.push(TreatmentRow {
                    age,
                    dx_year,
                    grade,
                    cm: 1.0,
                    rp: 0.0,
                });
                for tx in [
                    Treatment::ConservativeManagement,
                    Treatment::Prostatectomy,
                    Treatment::Radiotherapy,
                ] {
                    pradt.push(AdtRow {
                        tx,
                        age,
                        dx_year,
                        grade,
                        adt: 0.0,
                    });
                }
            }
        }
        for (time, survival) in [(0.0, 1.0), (10.0, 0.7), (30.0, 0.2)] {
            survival_dist.push(SurvivalDistRow {
                grade,
                time,
                survival,
            });
            for age in [50.0, 65.0, 80.0] {
                survival_local.push(SurvivalLocalRow {
                    age,
                    grade,
                    time,
                    survival: survival.powf(0.5),
                });
            }
        }
    }
    CancerTableInputs {
        prtx,
        pradt,
        biopsy_compliance: vec![
            BiopsyComplianceRow {
                psa: 4.0,
                age: 55.0,
                compliance: 1.0,
            },
            BiopsyComplianceRow {
                psa: 7.0,
                age: 75.0,
                compliance: 1.0,
            },
        ],
        rescreening: vec![RescreeningRow {
            age: 30.0,
            psa: 0.0,
            shape: 1.0,
            scale: 2.0,
            cure: 1.0,
        }],
        prob_grade7: vec![
            Grade7Row { beta2: 0.0, p: 0.4 },
            Grade7Row { beta2: 0.5, p: 0.8 },
        ],
        survival_dist,
        survival_local,
    }
}

/// Negligible mortality until `age`, overwhelming after it: death lands in
/// the year following `age`.
fn mortality_spike_at(age: usize) -> Vec<f64> {
    let mut mu0 = vec![1e-9; age];
    mu0.extend(vec![20.0; 106 - age]);
    mu0
}

fn base_params(mu0: Vec<f64>) -> NaturalHistoryParams {
    NaturalHistoryParams {
        g0: 0.0005,
        gm: 0.0004,
        gc: 0.0015,
        thetac: 19.2,
        tau2: 0.0829,
        mubeta0: -1.6094,
        sebeta0: 0.7106,
        mubeta1: 0.04463,
        sebeta1: 0.0326,
        mubeta2: [0.0397, 0.1678],
        sebeta2: [0.0913, 0.3968],
        c_low_grade_slope: -0.006,
        c_txlt_interaction: 1.0,
        c_baseline_specific: 1.0,
        sxbenefit: 1.0,
        c_benefit_value: 1.0,
        psa_threshold: 3.0,
        psa_threshold_biopsy_follow_up: 1.0,
        biopsy_sensitivity: 0.9,
        screening_compliance: 1.0,
        study_participation: 0.0,
        mu0,
    }
}

/// Parameters driving the cancer branch out of reach: onset far beyond any
/// death age, vanishing PSA.
fn quiet_cancer(params: &mut NaturalHistoryParams) {
    params.g0 = 1e-12;
    params.mubeta0 = -20.0;
    params.mubeta1 = 0.001;
    params.sebeta1 = 0.0005;
    params.tau2 = 1e-6;
}

fn config(n: usize, params: NaturalHistoryParams, screen: ScreeningPolicy) -> CancerConfig {
    CancerConfig {
        n,
        first_id: 0,
        cohorts: vec![1950.0; n],
        screen,
        n_life_histories: n,
        include_psa_records: false,
        panel: false,
        discount_rate: 0.0,
        package_seed: Some(ALL_ONES),
        parameters: params,
        cost_parameters: cost_parameters(),
        utility_estimates: utility_estimates(),
        utility_duration: utility_duration(),
        tables: tables(),
    }
}

#[test]
fn other_death_only_life_history() {
    let mut params = base_params(mortality_spike_at(78));
    quiet_cancer(&mut params);
    let out = run(&config(1, params, ScreeningPolicy::NoScreening)).unwrap();

    // the final event is other-cause death shortly after 78
    let last = out.life_histories.last().unwrap();
    assert_eq!(last.event, "other_death");
    assert!(last.end > 78.0 && last.end < 80.0, "death at {}", last.end);

    // exactly one death across the whole history
    let deaths = out
        .life_histories
        .iter()
        .filter(|row| row.event == "other_death" || row.event == "cancer_death")
        .count();
    assert_eq!(deaths, 1);

    // person-time identity: all state-time sums to the death age
    let total: f64 = out.summary.person_time.iter().map(|row| row.pt).sum();
    assert!((total - last.end).abs() < 1e-9);

    // the death cost was charged once
    let death_cost: f64 = out
        .costs
        .iter()
        .filter(|row| row.key.item == "DeathCost")
        .map(|row| row.cost)
        .sum();
    assert!((death_cost - 1_000.0).abs() < 1e-9);
}

#[test]
fn baseline_utility_revisions_fire_by_age() {
    let mut params = base_params(mortality_spike_at(78));
    quiet_cancer(&mut params);
    let out = run(&config(1, params, ScreeningPolicy::NoScreening)).unwrap();

    let utility_ages: Vec<f64> = out
        .life_histories
        .iter()
        .filter(|row| row.event == "utility_set")
        .map(|row| row.end)
        .collect();
    // death near 78 precedes the revision at 80
    assert_eq!(utility_ages, vec![20.0, 40.0, 60.0]);
}

#[test]
fn four_yearly_screening_schedules_exactly_six_screens() {
    let mut params = base_params(mortality_spike_at(98));
    quiet_cancer(&mut params);
    let out = run(&config(1, params, ScreeningPolicy::FourYearlyScreen50To70)).unwrap();

    let screen_ages: Vec<f64> = out
        .life_histories
        .iter()
        .filter(|row| row.event == "screen")
        .map(|row| row.end)
        .collect();
    assert_eq!(screen_ages, vec![50.0, 54.0, 58.0, 62.0, 66.0, 70.0]);

    // one opportunistic PSA cost per screen, none organised
    let psa_cost: f64 = out
        .costs
        .iter()
        .filter(|row| row.key.item == "OpportunisticPSACost")
        .map(|row| row.cost)
        .sum();
    assert!((psa_cost - 6.0 * 25.0).abs() < 1e-9);
    assert!(!out.costs.iter().any(|row| row.key.item == "InvitationCost"));
}

#[test]
fn two_yearly_screening_stays_inside_the_age_window() {
    let mut params = base_params(mortality_spike_at(98));
    quiet_cancer(&mut params);
    let out = run(&config(1, params, ScreeningPolicy::TwoYearlyScreen50To70)).unwrap();

    let screen_ages: Vec<f64> = out
        .life_histories
        .iter()
        .filter(|row| row.event == "screen")
        .map(|row| row.end)
        .collect();
    assert_eq!(screen_ages.len(), 11);
    assert!(screen_ages.iter().all(|&age| (50.0..=70.0).contains(&age)));
}

#[test]
fn clinical_diagnosis_fires_three_biopsies_then_treatment_in_fifo_order() {
    // early, certain clinical presentation: strong onset and clinical
    // hazards, metastasis pushed far out, death pushed to 98
    let mut params = base_params(mortality_spike_at(98));
    params.g0 = 10.0;
    params.gc = 100.0;
    params.gm = 1e-4;
    params.mubeta0 = 0.0;
    params.sebeta0 = 0.01;
    let out = run(&config(1, params, ScreeningPolicy::NoScreening)).unwrap();

    let rows = &out.life_histories;
    let dx = rows
        .iter()
        .position(|row| row.event == "clinical_diagnosis")
        .expect("clinical diagnosis occurred");
    let dx_age = rows[dx].end;

    assert_eq!(rows[dx + 1].event, "clinical_diagnostic_biopsy");
    assert_eq!(rows[dx + 2].event, "clinical_diagnostic_biopsy");
    assert_eq!(rows[dx + 3].event, "clinical_diagnostic_biopsy");
    assert_eq!(rows[dx + 4].event, "treatment");
    for offset in 1..=4 {
        assert_eq!(rows[dx + offset].end, dx_age);
    }

    // three biopsies were costed
    let biopsy_cost: f64 = out
        .costs
        .iter()
        .filter(|row| row.key.item == "BiopsyCost")
        .map(|row| row.cost)
        .sum();
    assert!((biopsy_cost - 3.0 * 400.0).abs() < 1e-9);

    // treatment CDF is all conservative management in the fixture
    assert!(rows.iter().any(|row| row.event == "conservative_management"));
}

#[test]
fn population_run_preserves_the_monotone_invariants() {
    let params = base_params(mortality_spike_at(90));
    let out = run(&config(40, params, ScreeningPolicy::TwoYearlyScreen50To70)).unwrap();

    for id in 0..40 {
        let rows: Vec<_> = out
            .life_histories
            .iter()
            .filter(|row| row.id == id)
            .collect();
        assert!(!rows.is_empty(), "individual {id} left no history");

        // exactly one death, and it comes last
        let deaths: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.event == "cancer_death" || row.event == "other_death")
            .map(|(i, _)| i)
            .collect();
        assert_eq!(deaths, vec![rows.len() - 1], "individual {id}");

        // disease state never regresses
        for pair in rows.windows(2) {
            assert!(pair[0].state <= pair[1].state, "individual {id}");
        }

        // diagnosis happens at most once and never reverts
        for pair in rows.windows(2) {
            use lifecourse_simulator_core_rs::cancer::Diagnosis;
            if pair[0].diagnosis != Diagnosis::NotDiagnosed {
                assert_eq!(pair[0].diagnosis, pair[1].diagnosis, "individual {id}");
            }
        }

        // after metastasis, any clinical diagnosis is the rescheduled one
        if let Some(met) = rows.iter().find(|row| row.event == "metastatic") {
            for row in &rows {
                if row.event == "clinical_diagnosis" {
                    assert!(row.end >= met.end, "individual {id}");
                }
            }
        }
    }
}

#[test]
fn fixed_seed_reproduces_the_whole_output() {
    let params = base_params(mortality_spike_at(90));
    let cfg = config(10, params, ScreeningPolicy::TwoYearlyScreen50To70);
    let a = run(&cfg).unwrap();
    let b = run(&cfg).unwrap();
    assert_eq!(a.life_histories, b.life_histories);
    assert_eq!(a.summary, b.summary);
    assert_eq!(a.costs, b.costs);
}

#[test]
fn individual_traces_do_not_depend_on_population_size() {
    // the substream protocol makes individual 0's history identical whether
    // or not individual 1 runs afterwards
    let params = base_params(mortality_spike_at(90));
    let solo = run(&config(1, params.clone(), ScreeningPolicy::TwoYearlyScreen50To70)).unwrap();
    let pair = run(&config(2, params, ScreeningPolicy::TwoYearlyScreen50To70)).unwrap();

    let pair_first: Vec<_> = pair
        .life_histories
        .iter()
        .filter(|row| row.id == 0)
        .cloned()
        .collect();
    assert_eq!(solo.life_histories, pair_first);
}

#[test]
fn config_validation_rejects_malformed_runs() {
    let params = base_params(mortality_spike_at(90));

    let mut zero_n = config(1, params.clone(), ScreeningPolicy::NoScreening);
    zero_n.n = 0;
    zero_n.cohorts.clear();
    assert!(run(&zero_n).is_err());

    let mut short_cohorts = config(3, params.clone(), ScreeningPolicy::NoScreening);
    short_cohorts.cohorts.pop();
    assert!(run(&short_cohorts).is_err());

    let mut bad_rate = config(1, params, ScreeningPolicy::NoScreening);
    bad_rate.parameters.g0 = -1.0;
    assert!(run(&bad_rate).is_err());
}

#[test]
fn config_survives_a_json_round_trip() {
    let params = base_params(mortality_spike_at(90));
    let cfg = config(2, params, ScreeningPolicy::Stockholm3Goteborg);
    let json = serde_json::to_string(&cfg).unwrap();
    let parsed = CancerConfig::from_json(&json).unwrap();
    assert_eq!(cfg, parsed);
}
