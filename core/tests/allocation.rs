use railrm_core::{
    allocation::{
        allocate_buckets, allocate_class, allocate_master, truncate_seats, AllocationSource,
    },
    config::{ClassConfig, ClassQuota, PriceBucket, PriceStructure, RmConfig},
    error::SimError,
    forecast::{independent_to_cumulative, DemandModel, QuotaForecast},
    lp::{ClarabelSolver, LinearProgram, LpSolution, LpSolver, LpStatus},
};

mod common;

fn flexi(prices: &[f64]) -> PriceStructure {
    PriceStructure::Flexi {
        buckets: prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PriceBucket { name: format!("Bucket_{i}"), price })
            .collect(),
    }
}

/// A forecast with the given independent demand, bypassing elasticity.
fn forecast_with(quota: &str, prices: &[f64], independent: &[u32]) -> QuotaForecast {
    let total: u32 = independent.iter().sum();
    let weighted: f64 = independent.iter().zip(prices).map(|(&d, &p)| d as f64 * p).sum();
    QuotaForecast {
        quota: quota.to_string(),
        market_mu: total as f64,
        total_demand: total,
        avg_revenue_per_seat: if total > 0 { weighted / total as f64 } else { prices[0] },
        cumulative_demands: independent_to_cumulative(independent),
        independent_bucket_demands: independent.to_vec(),
        prices: prices.to_vec(),
    }
}

fn class(capacity: u32, quotas: Vec<ClassQuota>) -> ClassConfig {
    ClassConfig { code: "2AC".into(), capacity, quotas }
}

fn quota(code: &str, pricing: PriceStructure, policy_floor: Option<u32>) -> ClassQuota {
    ClassQuota { quota: code.into(), pricing, policy_floor }
}

struct FailingSolver(LpStatus);

impl LpSolver for FailingSolver {
    fn solve(&self, lp: &LinearProgram) -> LpSolution {
        LpSolution::empty(self.0, lp.var_count(), lp.constraints().len())
    }
}

#[test]
fn oversubscribed_flat_quota_takes_whole_class() {
    let cls = class(10, vec![quota("GN", PriceStructure::Flat { price: 100.0 }, None)]);
    let forecasts = vec![QuotaForecast::build("GN", 20.0, &cls.quotas[0].pricing, 1.5)];

    let master = allocate_master(&cls, &forecasts, &ClarabelSolver::default()).expect("master");
    assert_eq!(master.seats_for("GN"), 10, "capacity-bound allocation");
    assert_eq!(master.status, LpStatus::Optimal);
    assert!((master.bid_price - 100.0).abs() < 1e-5, "bid price was {}", master.bid_price);
}

#[test]
fn undersubscribed_class_has_zero_bid_price() {
    let cls = class(50, vec![quota("GN", PriceStructure::Flat { price: 100.0 }, None)]);
    let forecasts = vec![QuotaForecast::build("GN", 20.0, &cls.quotas[0].pricing, 1.5)];

    let master = allocate_master(&cls, &forecasts, &ClarabelSolver::default()).expect("master");
    assert_eq!(master.seats_for("GN"), 20, "never allocate beyond demand");
    assert!(master.bid_price.abs() < 1e-5, "spare seats are worth nothing");
}

#[test]
fn master_prefers_higher_revenue_quota() {
    let cls = class(
        10,
        vec![
            quota("GN", PriceStructure::Flat { price: 100.0 }, None),
            quota("TQ", PriceStructure::Flat { price: 150.0 }, None),
        ],
    );
    let forecasts = vec![
        QuotaForecast::build("GN", 8.0, &cls.quotas[0].pricing, 1.5),
        QuotaForecast::build("TQ", 6.0, &cls.quotas[1].pricing, 1.5),
    ];

    let master = allocate_master(&cls, &forecasts, &ClarabelSolver::default()).expect("master");
    assert_eq!(master.seats_for("TQ"), 6);
    assert_eq!(master.seats_for("GN"), 4);
    assert_eq!(master.total(), 10);
}

#[test]
fn policy_floor_is_protected() {
    let cls = class(
        10,
        vec![
            quota("GN", PriceStructure::Flat { price: 100.0 }, None),
            quota("LD", PriceStructure::Flat { price: 50.0 }, Some(3)),
        ],
    );
    let forecasts = vec![
        QuotaForecast::build("GN", 30.0, &cls.quotas[0].pricing, 1.5),
        QuotaForecast::build("LD", 1.0, &cls.quotas[1].pricing, 1.5),
    ];

    let master = allocate_master(&cls, &forecasts, &ClarabelSolver::default()).expect("master");
    assert_eq!(master.seats_for("LD"), 3, "floor above demand still holds");
    assert_eq!(master.seats_for("GN"), 7);
}

#[test]
fn floors_beyond_capacity_are_fatal() {
    let cls = class(
        5,
        vec![
            quota("GN", PriceStructure::Flat { price: 100.0 }, Some(3)),
            quota("LD", PriceStructure::Flat { price: 50.0 }, Some(4)),
        ],
    );
    let forecasts = vec![
        QuotaForecast::build("GN", 10.0, &cls.quotas[0].pricing, 1.5),
        QuotaForecast::build("LD", 10.0, &cls.quotas[1].pricing, 1.5),
    ];

    match allocate_master(&cls, &forecasts, &ClarabelSolver::default()) {
        Err(SimError::MasterAllocationInfeasible { class, capacity, floor_total }) => {
            assert_eq!(class, "2AC");
            assert_eq!(capacity, 5);
            assert_eq!(floor_total, 7);
        }
        other => panic!("expected infeasible master allocation, got {other:?}"),
    }
}

#[test]
fn master_invariants_hold_for_reference_config() {
    common::init_logging();
    let config = RmConfig::reference();
    let model = DemandModel::build(&config);
    let solver = ClarabelSolver::default();

    for cls in &config.classes {
        let forecasts: Vec<QuotaForecast> = cls
            .quotas
            .iter()
            .map(|cq| {
                let qd = model.quota(&cls.code, &cq.quota).expect("demand");
                let elasticity = config.settings.elasticity;
                QuotaForecast::build(&cq.quota, qd.forecast.mu, &cq.pricing, elasticity)
            })
            .collect();
        let plan = allocate_class(cls, &forecasts, &solver).expect("plan");

        assert!(plan.master.total() <= cls.capacity, "{} over capacity", cls.code);
        for (cq, f) in cls.quotas.iter().zip(&forecasts) {
            let seats = plan.master.seats_for(&cq.quota);
            let cap = f.total_demand.max(cq.policy_floor.unwrap_or(0));
            assert!(seats <= cap, "{}/{} allocated {seats} > {cap}", cls.code, cq.quota);
            assert!(seats >= cq.policy_floor.unwrap_or(0));
        }
        for (b, f) in plan.buckets.iter().zip(&forecasts) {
            assert!(b.total() <= plan.master.seats_for(&b.quota));
            if let AllocationSource::Lp | AllocationSource::Direct = b.source {
                for (seats, demand) in b.seats.iter().zip(&f.independent_bucket_demands) {
                    assert!(seats <= demand, "{}/{} bucket over demand", cls.code, b.quota);
                }
            }
        }
    }
}

#[test]
fn nested_inner_allocation_protects_dearer_buckets() {
    let prices = [100.0, 110.0, 120.0];
    let forecast = forecast_with("GN", &prices, &[50, 20, 10]);
    let alloc = allocate_buckets("2AC", &forecast, &flexi(&prices), 40, &ClarabelSolver::default());

    assert_eq!(alloc.source, AllocationSource::Lp);
    assert_eq!(alloc.seats, vec![10, 20, 10]);
    let revenue: f64 = alloc.seats.iter().zip(&prices).map(|(&s, &p)| s as f64 * p).sum();
    assert_eq!(revenue, 4400.0);
}

#[test]
fn demand_within_quota_skips_the_lp() {
    let prices = [100.0, 110.0, 120.0];
    let forecast = forecast_with("GN", &prices, &[5, 3, 2]);
    // A solver that would fail proves the LP is never called.
    let solver = FailingSolver(LpStatus::Infeasible);
    let alloc = allocate_buckets("2AC", &forecast, &flexi(&prices), 40, &solver);

    assert_eq!(alloc.source, AllocationSource::Direct);
    assert_eq!(alloc.seats, vec![5, 3, 2]);
}

#[test]
fn failed_inner_lp_allocates_nothing() {
    common::init_logging();
    let prices = [100.0, 110.0, 120.0];
    let forecast = forecast_with("GN", &prices, &[50, 20, 10]);
    let solver = FailingSolver(LpStatus::IterationLimit);
    let alloc = allocate_buckets("2AC", &forecast, &flexi(&prices), 40, &solver);

    assert_eq!(alloc.source, AllocationSource::Failed(LpStatus::IterationLimit));
    assert_eq!(alloc.seats, vec![0, 0, 0]);
}

#[test]
fn flat_quota_takes_master_seats() {
    let forecast = forecast_with("TQ", &[250.0], &[30]);
    let alloc = allocate_buckets(
        "3AC",
        &forecast,
        &PriceStructure::Flat { price: 250.0 },
        12,
        &ClarabelSolver::default(),
    );
    assert_eq!(alloc.source, AllocationSource::Flat);
    assert_eq!(alloc.seats, vec![12]);
}

#[test]
fn degraded_master_keeps_running() {
    common::init_logging();
    let cls = class(10, vec![quota("GN", PriceStructure::Flat { price: 100.0 }, None)]);
    let forecasts = vec![QuotaForecast::build("GN", 20.0, &cls.quotas[0].pricing, 1.5)];
    let master = allocate_master(&cls, &forecasts, &FailingSolver(LpStatus::IterationLimit))
        .expect("non-optimal master is not fatal");
    assert_eq!(master.status, LpStatus::IterationLimit);
    assert_eq!(master.total(), 0);
}

#[test]
fn seat_truncation_absorbs_round_off() {
    assert_eq!(truncate_seats(9.999_999_9), 10);
    assert_eq!(truncate_seats(9.6), 9);
    assert_eq!(truncate_seats(-0.5), 0);
}
