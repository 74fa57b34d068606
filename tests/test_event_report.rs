//! Event-report aggregation identities.

use lifecourse_simulator_core_rs::report::{discounted_interval, CostReport, EventReport, Partition};

fn year_partition() -> Partition {
    Partition::single_years_with_sentinel(100)
}

#[test]
fn person_time_identity_for_one_individual() {
    // an individual's interval chain [0, death) tiles exactly
    let mut report: EventReport<&str, &str> = EventReport::new();
    report.set_partition(year_partition());
    report.add("healthy", "onset", 0.0, 52.3);
    report.add("localised", "metastatic", 52.3, 61.7);
    report.add("metastatic", "death", 61.7, 84.25);

    let total = report.person_time_total(&"healthy")
        + report.person_time_total(&"localised")
        + report.person_time_total(&"metastatic");
    assert!((total - 84.25).abs() < 1e-9);
}

#[test]
fn person_time_truncates_at_the_partition_max() {
    let mut report: EventReport<&str, &str> = EventReport::new();
    let partition = Partition::new((0..=100).map(f64::from).collect());
    report.set_partition(partition);
    report.add("healthy", "death", 0.0, 250.0);

    assert!((report.person_time_total(&"healthy") - 100.0).abs() < 1e-9);
    // the terminating event fell outside the partition
    assert!(report.out().events.is_empty());
}

#[test]
fn sentinel_edge_keeps_late_events() {
    let mut report: EventReport<&str, &str> = EventReport::new();
    report.set_partition(year_partition());
    report.add("healthy", "death", 0.0, 250.0);

    let out = report.out();
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].age, 100.0);
    assert_eq!(out.events[0].n, 1);
}

#[test]
fn prevalence_counts_individuals_not_years() {
    let mut report: EventReport<&str, &str> = EventReport::new();
    report.set_partition(year_partition());
    // two individuals both alive across age 50
    report.add("healthy", "death", 0.0, 50.5);
    report.add("healthy", "death", 0.0, 50.5);

    let out = report.out();
    let at_50 = out
        .prevalence
        .iter()
        .find(|row| row.age == 50.0)
        .expect("prevalence at 50");
    assert_eq!(at_50.n, 2);
}

#[test]
fn set_partition_is_idempotent() {
    let mut a: EventReport<&str, &str> = EventReport::new();
    a.clear();
    a.set_partition(year_partition());
    a.set_partition(year_partition());
    a.add("s", "e", 0.0, 10.0);

    let mut b: EventReport<&str, &str> = EventReport::new();
    b.clear();
    b.set_partition(year_partition());
    b.add("s", "e", 0.0, 10.0);

    assert_eq!(a.out(), b.out());
}

#[test]
fn clear_discards_a_tainted_individual() {
    let mut report: EventReport<&str, &str> = EventReport::new();
    report.set_partition(year_partition());
    report.add("s", "e", 0.0, 10.0);
    report.clear();
    report.set_partition(year_partition());

    assert_eq!(report.person_time_total(&"s"), 0.0);
    assert!(report.out().events.is_empty());
}

#[test]
fn cost_report_discounting_matches_closed_form() {
    let mut costs: CostReport<&str> = CostReport::new();
    costs.set_partition(year_partition());
    costs.discount_rate = 0.03;
    costs.add("test", 10.0, 500.0);
    costs.add("test", 20.0, 500.0);

    let expected = 500.0 * 1.03f64.powf(-10.0) + 500.0 * 1.03f64.powf(-20.0);
    assert!((costs.total(&"test") - expected).abs() < 1e-9);
}

#[test]
fn discounted_interval_brackets() {
    // discounting can only shrink an interval
    let plain = discounted_interval(0.0, 30.0, 0.0);
    let discounted = discounted_interval(0.0, 30.0, 0.05);
    assert_eq!(plain, 30.0);
    assert!(discounted < plain);
    assert!(discounted > 0.0);
}
