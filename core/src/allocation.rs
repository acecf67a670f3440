//! Allocation engine: two-stage LP.
//!
//! Master LP (per class): split class capacity across quotas.
//!   max  Σ_q avg_rev(q) · x_q
//!   s.t. Σ_q x_q ≤ capacity
//!        x_q ≤ max(total_demand(q), floor(q))
//!        x_q ≥ floor(q)                      (policy quotas only)
//!
//! Inner LP (per FLEXI quota): split the quota's seats across buckets.
//!   max  Σ_i price_i · x_i
//!   s.t. Σ_i x_i ≤ quota seats
//!        Σ_{j≥i} x_j ≤ cumulative_demand_i  (nested demand)
//!
//! Master infeasibility is a configuration error and aborts the run.
//! Every other solver failure degrades: a non-optimal master result is
//! used as-is, a failed inner LP allocates nothing to that quota.

use serde::{Deserialize, Serialize};

use crate::{
    config::{ClassConfig, PriceStructure},
    error::{SimError, SimResult},
    forecast::QuotaForecast,
    lp::{LinearProgram, LpSolver, LpStatus, Relation, Sense},
    types::{ClassCode, QuotaCode},
};

/// LP values are truncated to whole seats; the tolerance absorbs
/// interior-point round-off such as 9.99999.
const SEAT_TOLERANCE: f64 = 1e-4;

pub fn truncate_seats(value: f64) -> u32 {
    (value + SEAT_TOLERANCE).floor().max(0.0) as u32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterAllocation {
    pub class: ClassCode,
    pub capacity: u32,
    /// Seats per quota, in class quota order.
    pub seats: Vec<(QuotaCode, u32)>,
    /// Dual value of the capacity constraint: revenue of one more seat.
    pub bid_price: f64,
    pub status: LpStatus,
}

impl MasterAllocation {
    pub fn seats_for(&self, quota: &str) -> u32 {
        self.seats
            .iter()
            .find(|(q, _)| q == quota)
            .map(|(_, s)| *s)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.seats.iter().map(|(_, s)| s).sum()
    }
}

/// How a quota's bucket allocation was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationSource {
    /// FLAT quota: the single bucket takes the master allocation.
    Flat,
    /// Demand fit within the quota, no LP needed.
    Direct,
    Lp,
    /// Inner LP failed; nothing allocated.
    Failed(LpStatus),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketAllocation {
    pub quota: QuotaCode,
    /// Seats per bucket, lowest price first.
    pub seats: Vec<u32>,
    pub source: AllocationSource,
}

impl BucketAllocation {
    pub fn total(&self) -> u32 {
        self.seats.iter().sum()
    }
}

/// Both allocation stages for one class in one trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassPlan {
    pub master: MasterAllocation,
    /// In class quota order.
    pub buckets: Vec<BucketAllocation>,
}

/// Solve the master LP for one class. `forecasts` follow `class.quotas`.
pub fn allocate_master(
    class: &ClassConfig,
    forecasts: &[QuotaForecast],
    solver: &dyn LpSolver,
) -> SimResult<MasterAllocation> {
    let mut lp = LinearProgram::new(
        format!("Master_Quota_Allocation_{}", class.code),
        Sense::Maximize,
    );

    let floors: Vec<u32> = forecasts
        .iter()
        .map(|f| {
            class
                .quotas
                .iter()
                .find(|cq| cq.quota == f.quota)
                .and_then(|cq| cq.policy_floor)
                .unwrap_or(0)
        })
        .collect();

    let vars: Vec<_> = forecasts
        .iter()
        .map(|f| lp.add_var(format!("Allocation_{}", f.quota), f.avg_revenue_per_seat))
        .collect();

    let capacity_row = lp.add_constraint(
        "Capacity_Constraint",
        vars.iter().map(|&v| (v, 1.0)).collect(),
        Relation::Le,
        class.capacity as f64,
    );

    for ((f, &v), &floor) in forecasts.iter().zip(&vars).zip(&floors) {
        let cap = f.total_demand.max(floor);
        lp.add_constraint(
            format!("Demand_Constraint_{}", f.quota),
            vec![(v, 1.0)],
            Relation::Le,
            cap as f64,
        );
        if floor > 0 {
            lp.add_constraint(
                format!("Policy_Floor_{}", f.quota),
                vec![(v, 1.0)],
                Relation::Ge,
                floor as f64,
            );
        }
    }

    let solution = solver.solve(&lp);
    match solution.status {
        LpStatus::Optimal => {}
        LpStatus::Infeasible => {
            return Err(SimError::MasterAllocationInfeasible {
                class: class.code.clone(),
                capacity: class.capacity,
                floor_total: floors.iter().sum(),
            });
        }
        status => {
            log::warn!(
                "allocation: master LP for {} ended {:?}; using best available values",
                class.code,
                status
            );
        }
    }

    let seats: Vec<(QuotaCode, u32)> = forecasts
        .iter()
        .zip(&vars)
        .map(|(f, &v)| (f.quota.clone(), truncate_seats(solution.value(v))))
        .collect();

    let allocation = MasterAllocation {
        class: class.code.clone(),
        capacity: class.capacity,
        seats,
        bid_price: solution.dual(capacity_row).max(0.0),
        status: solution.status,
    };

    log::debug!(
        "allocation: master {} seats={:?} bid_price={:.2}",
        allocation.class,
        allocation.seats,
        allocation.bid_price
    );
    Ok(allocation)
}

/// Split one quota's seats across its price buckets.
pub fn allocate_buckets(
    class: &str,
    forecast: &QuotaForecast,
    pricing: &PriceStructure,
    quota_seats: u32,
    solver: &dyn LpSolver,
) -> BucketAllocation {
    let quota = forecast.quota.clone();
    match pricing {
        PriceStructure::Flat { .. } => BucketAllocation {
            quota,
            seats: vec![quota_seats],
            source: AllocationSource::Flat,
        },
        PriceStructure::Flexi { .. } => {
            let demand: u32 = forecast.independent_bucket_demands.iter().sum();
            if demand <= quota_seats {
                return BucketAllocation {
                    quota,
                    seats: forecast.independent_bucket_demands.clone(),
                    source: AllocationSource::Direct,
                };
            }
            solve_inner_lp(class, forecast, quota_seats, solver)
        }
    }
}

fn solve_inner_lp(
    class: &str,
    forecast: &QuotaForecast,
    quota_seats: u32,
    solver: &dyn LpSolver,
) -> BucketAllocation {
    let q = &forecast.quota;
    let mut lp = LinearProgram::new(format!("Inner_Allocation_{class}_{q}"), Sense::Maximize);

    let vars: Vec<_> = forecast
        .prices
        .iter()
        .enumerate()
        .map(|(i, &price)| lp.add_var(format!("{q}_Bucket_{i}"), price))
        .collect();

    lp.add_constraint(
        "Quota_Capacity_Constraint",
        vars.iter().map(|&v| (v, 1.0)).collect(),
        Relation::Le,
        quota_seats as f64,
    );
    for (i, &cumulative) in forecast.cumulative_demands.iter().enumerate() {
        lp.add_constraint(
            format!("Nested_Demand_B{i}"),
            vars[i..].iter().map(|&v| (v, 1.0)).collect(),
            Relation::Le,
            cumulative as f64,
        );
    }

    let solution = solver.solve(&lp);
    if solution.status != LpStatus::Optimal {
        log::warn!(
            "allocation: inner LP for {class}/{q} ended {:?}; allocating 0 seats",
            solution.status
        );
        return BucketAllocation {
            quota: q.clone(),
            seats: vec![0; vars.len()],
            source: AllocationSource::Failed(solution.status),
        };
    }

    BucketAllocation {
        quota: q.clone(),
        seats: vars.iter().map(|&v| truncate_seats(solution.value(v))).collect(),
        source: AllocationSource::Lp,
    }
}

/// Run both stages for one class.
pub fn allocate_class(
    class: &ClassConfig,
    forecasts: &[QuotaForecast],
    solver: &dyn LpSolver,
) -> SimResult<ClassPlan> {
    let master = allocate_master(class, forecasts, solver)?;
    let buckets = class
        .quotas
        .iter()
        .zip(forecasts)
        .map(|(cq, f)| {
            let seats = master.seats_for(&cq.quota);
            allocate_buckets(&class.code, f, &cq.pricing, seats, solver)
        })
        .collect();
    Ok(ClassPlan { master, buckets })
}
