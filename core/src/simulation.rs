//! Dynamic booking simulation.
//!
//! Walks the booking horizon from the opening day down to departure eve.
//! Each day, for every open (class, quota), the expected arrivals come
//! from the quota's booking profile; the actual count is a Poisson draw.
//! Each arrival buys the cheapest bucket that still has allocation left,
//! or is turned away.
//!
//! Allocations are fixed for the whole horizon; nothing is re-optimised
//! mid-trial. The state is owned by one trial and dropped with it.

use serde::{Deserialize, Serialize};

use crate::{
    allocation::ClassPlan,
    booking_curve::BookingCurves,
    clock::BookingClock,
    config::{ClassConfig, PriceStructure, RmConfig},
    error::{SimError, SimResult},
    event::{EventLog, SimEvent},
    forecast::QuotaForecast,
    rng::TrialRng,
    types::{ClassCode, QuotaCode, TrialIndex},
};

/// Forecasts and allocations for one class, ready to be sold down.
#[derive(Debug, Clone)]
pub struct ClassTrial<'a> {
    pub config: &'a ClassConfig,
    /// In class quota order.
    pub forecasts: Vec<QuotaForecast>,
    pub plan: ClassPlan,
}

#[derive(Debug, Clone, Default)]
pub struct QuotaState {
    /// Seats sold per bucket.
    pub sold: Vec<u32>,
    pub accepted: u64,
    pub rejected: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ClassState {
    pub seats_sold: u32,
    pub quotas: Vec<QuotaState>,
}

/// Seats sold per (class, quota, bucket) for the trial in progress.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    pub classes: Vec<ClassState>,
}

impl SimulationState {
    pub fn new(trials: &[ClassTrial<'_>]) -> Self {
        let classes = trials
            .iter()
            .map(|ct| ClassState {
                seats_sold: 0,
                quotas: ct
                    .config
                    .quotas
                    .iter()
                    .map(|cq| QuotaState {
                        sold: vec![0; cq.pricing.bucket_count()],
                        ..QuotaState::default()
                    })
                    .collect(),
            })
            .collect();
        Self { classes }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaOutcome {
    pub quota: QuotaCode,
    pub bucket_names: Vec<String>,
    pub prices: Vec<f64>,
    pub allocated: Vec<u32>,
    pub sold: Vec<u32>,
    pub accepted: u64,
    pub rejected: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassOutcome {
    pub class: ClassCode,
    pub capacity: u32,
    pub seats_sold: u32,
    pub load_factor: f64,
    pub revenue: f64,
    pub accepted: u64,
    pub rejected: u64,
    pub quotas: Vec<QuotaOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub trial: TrialIndex,
    pub revenue: f64,
    pub accepted: u64,
    pub rejected: u64,
    pub classes: Vec<ClassOutcome>,
}

/// Pick the bucket an arriving customer buys, or `None` if the quota is
/// closed. FLEXI fills the cheapest open bucket first.
pub fn choose_bucket(pricing: &PriceStructure, sold: &[u32], allocated: &[u32]) -> Option<usize> {
    match pricing {
        PriceStructure::Flexi { .. } => sold
            .iter()
            .zip(allocated)
            .position(|(s, a)| s < a),
        PriceStructure::Flat { .. } => {
            let (s, a) = (sold.first()?, allocated.first()?);
            (s < a).then_some(0)
        }
    }
}

pub fn simulate_booking_horizon(
    trial: TrialIndex,
    config: &RmConfig,
    curves: &BookingCurves,
    classes: &[ClassTrial<'_>],
    rng: &mut TrialRng,
    log: &mut EventLog,
) -> SimResult<TrialOutcome> {
    let mut state = SimulationState::new(classes);
    let mut clock = BookingClock::new(config.settings.booking_window_days);

    while let Some(day) = clock.advance() {
        for (ct, class_state) in classes.iter().zip(state.classes.iter_mut()) {
            let capacity = ct.config.capacity;

            for (qi, cq) in ct.config.quotas.iter().enumerate() {
                let quota = config.quota(&cq.quota).ok_or_else(|| SimError::UnknownQuota {
                    class: ct.config.code.clone(),
                    quota: cq.quota.clone(),
                })?;
                if day > quota.window_open {
                    continue;
                }
                let profile = curves.profile(&cq.quota).ok_or_else(|| SimError::UnknownQuota {
                    class: ct.config.code.clone(),
                    quota: cq.quota.clone(),
                })?;

                let forecast = &ct.forecasts[qi];
                let expected = profile.expected_arrivals(day, forecast.total_demand as f64);
                let arrivals = rng.poisson(expected);
                if arrivals == 0 {
                    continue;
                }

                let allocated = &ct.plan.buckets[qi].seats;
                let (mut accepted, mut rejected) = (0u64, 0u64);
                for _ in 0..arrivals {
                    let qs = &mut class_state.quotas[qi];
                    let bucket = if class_state.seats_sold < capacity {
                        choose_bucket(&cq.pricing, &qs.sold, allocated)
                    } else {
                        None
                    };
                    match bucket {
                        Some(b) => {
                            qs.sold[b] += 1;
                            qs.accepted += 1;
                            qs.revenue += forecast.prices[b];
                            class_state.seats_sold += 1;
                            accepted += 1;
                        }
                        None => {
                            qs.rejected += 1;
                            rejected += 1;
                        }
                    }
                }

                if log.is_enabled() {
                    log.record(
                        trial,
                        SimEvent::BookingsProcessed {
                            day,
                            class: ct.config.code.clone(),
                            quota: cq.quota.clone(),
                            expected,
                            arrivals,
                            accepted,
                            rejected,
                        },
                    );
                }
            }
        }
    }

    let classes_out: Vec<ClassOutcome> = classes
        .iter()
        .zip(state.classes)
        .map(|(ct, cs)| summarize_class(ct, cs))
        .collect();

    for c in &classes_out {
        log.record(
            trial,
            SimEvent::ClassSummary {
                class: c.class.clone(),
                seats_sold: c.seats_sold,
                capacity: c.capacity,
                revenue: c.revenue,
                accepted: c.accepted,
                rejected: c.rejected,
            },
        );
    }

    Ok(TrialOutcome {
        trial,
        revenue: classes_out.iter().map(|c| c.revenue).sum(),
        accepted: classes_out.iter().map(|c| c.accepted).sum(),
        rejected: classes_out.iter().map(|c| c.rejected).sum(),
        classes: classes_out,
    })
}

fn summarize_class(ct: &ClassTrial<'_>, cs: ClassState) -> ClassOutcome {
    let quotas: Vec<QuotaOutcome> = ct
        .config
        .quotas
        .iter()
        .zip(&ct.forecasts)
        .zip(&ct.plan.buckets)
        .zip(cs.quotas)
        .map(|(((cq, f), alloc), qs)| QuotaOutcome {
            quota: cq.quota.clone(),
            bucket_names: (0..cq.pricing.bucket_count())
                .map(|i| cq.pricing.bucket_name(i))
                .collect(),
            prices: f.prices.clone(),
            allocated: alloc.seats.clone(),
            sold: qs.sold,
            accepted: qs.accepted,
            rejected: qs.rejected,
            revenue: qs.revenue,
        })
        .collect();

    let capacity = ct.config.capacity;
    ClassOutcome {
        class: ct.config.code.clone(),
        capacity,
        seats_sold: cs.seats_sold,
        load_factor: if capacity > 0 {
            cs.seats_sold as f64 / capacity as f64
        } else {
            0.0
        },
        revenue: quotas.iter().map(|q| q.revenue).sum(),
        accepted: quotas.iter().map(|q| q.accepted).sum(),
        rejected: quotas.iter().map(|q| q.rejected).sum(),
        quotas,
    }
}
