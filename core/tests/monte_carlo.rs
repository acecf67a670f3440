use railrm_core::{
    config::RmConfig,
    error::SimError,
    monte_carlo::{MonteCarloDriver, RevenueStats, RunEvent},
};

mod common;

fn quick_config(trials: usize) -> RmConfig {
    let mut config = RmConfig::reference();
    config.settings.n_simulations = trials;
    config
}

#[test]
fn aggregate_statistics_are_consistent() {
    common::init_logging();
    let driver = MonteCarloDriver::new(&quick_config(20)).expect("driver");
    let result = driver.run(|_| {}).expect("run");

    assert_eq!(result.n_simulations, 20);
    assert_eq!(result.all_revenues.len(), 20);
    assert_eq!(result.all_revenues[0], result.baseline_revenue);
    assert!(result.min_revenue <= result.mean_revenue);
    assert!(result.mean_revenue <= result.max_revenue);
    assert!(result.p10_revenue <= result.p50_revenue && result.p50_revenue <= result.p90_revenue);
    assert!(result.std_dev >= 0.0);
    assert!(result.baseline_revenue > 0.0);
}

#[test]
fn baseline_log_and_breakdown_are_kept() {
    let driver = MonteCarloDriver::new(&quick_config(3)).expect("driver");
    let result = driver.run(|_| {}).expect("run");

    assert!(result.baseline_log.contains("master allocation"));
    assert!(result.baseline_log.contains("trial 0 complete"));
    assert!(
        !result.baseline_log.contains("[trial 1]"),
        "stochastic trials must not be logged"
    );

    let classes: Vec<&str> = result.baseline_breakdown.iter().map(|c| c.class.as_str()).collect();
    assert_eq!(classes, vec!["1AC", "2AC", "3AC"]);
    let total: f64 = result.baseline_breakdown.iter().map(|c| c.revenue).sum();
    assert!((total - result.baseline_revenue).abs() < 1e-6);
}

#[test]
fn progress_is_reported_between_trials() {
    let mut config = quick_config(25);
    config.settings.progress_interval = 10;
    let driver = MonteCarloDriver::new(&config).expect("driver");

    let mut events = Vec::new();
    driver.run(|e| events.push(e)).expect("run");

    assert!(matches!(events.first(), Some(RunEvent::Status(_))));
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress { completed, total } => {
                assert_eq!(*total, 25);
                Some(*completed)
            }
            RunEvent::Status(_) => None,
        })
        .collect();
    assert_eq!(progress, vec![10, 20, 25]);
}

#[test]
fn single_trial_run_is_the_baseline() {
    let driver = MonteCarloDriver::new(&quick_config(1)).expect("driver");
    let result = driver.run(|_| {}).expect("run");
    assert_eq!(result.all_revenues, vec![result.baseline_revenue]);
    assert_eq!(result.std_dev, 0.0);
    assert_eq!(result.min_revenue, result.max_revenue);
}

#[test]
fn zero_trials_is_rejected() {
    let driver = MonteCarloDriver::new(&quick_config(5)).expect("driver");
    assert!(matches!(
        driver.run_trials(0, 42, |_| {}),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn infeasible_floor_aborts_the_run() {
    let mut config = quick_config(5);
    let class = config.classes.iter_mut().find(|c| c.code == "1AC").expect("1AC");
    for cq in &mut class.quotas {
        cq.policy_floor = Some(20);
    }
    let driver = MonteCarloDriver::new(&config).expect("driver");

    let mut statuses = 0;
    let err = driver
        .run(|e| {
            if let RunEvent::Status(_) = e {
                statuses += 1;
            }
        })
        .expect_err("60 floor seats cannot fit 30 seats");
    assert!(matches!(
        err,
        SimError::MasterAllocationInfeasible { ref class, .. } if class == "1AC"
    ));
    assert_eq!(statuses, 1, "no trial completed");
}

#[test]
fn revenue_stats_use_population_std_and_nearest_rank() {
    let revenues: Vec<f64> = (1..=11).map(|v| v as f64).collect();
    let stats = RevenueStats::from_revenues(&revenues);
    assert_eq!(stats.mean, 6.0);
    assert!((stats.std_dev - 10f64.sqrt()).abs() < 1e-12);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 11.0);
    assert_eq!(stats.p10, 2.0);
    assert_eq!(stats.p50, 6.0);
    assert_eq!(stats.p90, 10.0);
}

#[test]
fn percentiles_take_the_ceiling_rank() {
    let revenues: Vec<f64> = (1..=20).rev().map(|v| v as f64).collect();
    let stats = RevenueStats::from_revenues(&revenues);
    assert_eq!(stats.p10, 2.0, "rank ceil(0.1 * 20) = 2");
    assert_eq!(stats.p50, 10.0, "rank ceil(0.5 * 20) = 10");
    assert_eq!(stats.p90, 18.0, "rank ceil(0.9 * 20) = 18");

    let tens: Vec<f64> = (1..=30).map(|v| v as f64).collect();
    assert_eq!(RevenueStats::from_revenues(&tens).p10, 3.0, "exact rank stays put");

    let single = RevenueStats::from_revenues(&[7.5]);
    assert_eq!((single.p10, single.p50, single.p90), (7.5, 7.5, 7.5));
}

#[test]
fn run_events_serialize_with_type_tag() {
    let json = serde_json::to_string(&RunEvent::Progress { completed: 3, total: 9 }).expect("json");
    assert!(json.contains("\"type\":\"progress\""), "got {json}");
    let status = serde_json::to_string(&RunEvent::Status("done".into())).expect("json");
    assert!(status.contains("\"type\":\"status\""), "got {status}");
}
