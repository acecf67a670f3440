//! The trial engine: one full forecast → allocate → simulate pass.
//!
//! EXECUTION ORDER (fixed, never reordered):
//!   1. Forecast   per class, per quota (market draw in stochastic mode)
//!   2. Allocation master LP per class, then inner LP per FLEXI quota
//!   3. Simulation booking horizon, day by day
//!
//! RULES:
//!   - A trial owns its simulation state and RNG streams.
//!   - Static inputs (config, curves, demand model) are borrowed, never mutated.
//!   - All randomness flows through the RngBank.

use serde::{Deserialize, Serialize};

use crate::{
    allocation::allocate_class,
    booking_curve::BookingCurves,
    config::RmConfig,
    error::{SimError, SimResult},
    event::{EventLog, SimEvent},
    forecast::{DemandModel, QuotaForecast},
    lp::LpSolver,
    rng::{RngBank, RngStream},
    simulation::{simulate_booking_horizon, ClassTrial, TrialOutcome},
    types::TrialIndex,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialMode {
    /// Forecast means used directly; full event log recorded.
    Deterministic,
    /// Market demand re-sampled from the forecast; no event log.
    Stochastic,
}

/// Result of one trial plus its event log (empty unless deterministic).
#[derive(Debug, Clone)]
pub struct TrialReport {
    pub outcome: TrialOutcome,
    pub log: EventLog,
}

pub struct TrialEngine<'a> {
    config: &'a RmConfig,
    curves: &'a BookingCurves,
    demand: &'a DemandModel,
    solver: &'a dyn LpSolver,
    rng_bank: RngBank,
}

impl<'a> TrialEngine<'a> {
    pub fn new(
        config: &'a RmConfig,
        curves: &'a BookingCurves,
        demand: &'a DemandModel,
        solver: &'a dyn LpSolver,
        seed: u64,
    ) -> Self {
        Self {
            config,
            curves,
            demand,
            solver,
            rng_bank: RngBank::new(seed),
        }
    }

    pub fn run_trial(&self, trial: TrialIndex, mode: TrialMode) -> SimResult<TrialReport> {
        let mut log = EventLog::new(mode == TrialMode::Deterministic);
        log.record(trial, SimEvent::TrialStarted { trial, mode });

        let mut demand_rng = self.rng_bank.for_trial(trial, RngStream::Demand);
        let mut class_trials = Vec::with_capacity(self.config.classes.len());

        for class in &self.config.classes {
            let mut forecasts = Vec::with_capacity(class.quotas.len());
            for cq in &class.quotas {
                let qd = self.demand.quota(&class.code, &cq.quota).ok_or_else(|| {
                    SimError::UnknownQuota {
                        class: class.code.clone(),
                        quota: cq.quota.clone(),
                    }
                })?;

                let market_mu = match mode {
                    TrialMode::Deterministic => qd.forecast.mu,
                    TrialMode::Stochastic => demand_rng
                        .normal(qd.forecast.mu, qd.forecast.sigma)
                        .max(0.0),
                };

                let forecast = QuotaForecast::build(
                    &cq.quota,
                    market_mu,
                    &cq.pricing,
                    self.config.settings.elasticity,
                );
                log.record(
                    trial,
                    SimEvent::DemandForecast {
                        class: class.code.clone(),
                        quota: cq.quota.clone(),
                        market_mu,
                        total_demand: forecast.total_demand,
                        independent_demands: forecast.independent_bucket_demands.clone(),
                        avg_revenue_per_seat: forecast.avg_revenue_per_seat,
                    },
                );
                forecasts.push(forecast);
            }

            let plan = allocate_class(class, &forecasts, self.solver)?;
            log.record(
                trial,
                SimEvent::MasterAllocated {
                    class: class.code.clone(),
                    capacity: plan.master.capacity,
                    seats: plan.master.seats.clone(),
                    bid_price: plan.master.bid_price,
                    status: plan.master.status,
                },
            );
            for b in &plan.buckets {
                log.record(
                    trial,
                    SimEvent::BucketsAllocated {
                        class: class.code.clone(),
                        quota: b.quota.clone(),
                        seats: b.seats.clone(),
                        source: b.source,
                    },
                );
            }

            class_trials.push(ClassTrial {
                config: class,
                forecasts,
                plan,
            });
        }

        let mut arrivals_rng = self.rng_bank.for_trial(trial, RngStream::Arrivals);
        let outcome = simulate_booking_horizon(
            trial,
            self.config,
            self.curves,
            &class_trials,
            &mut arrivals_rng,
            &mut log,
        )?;

        log.record(
            trial,
            SimEvent::TrialCompleted {
                trial,
                revenue: outcome.revenue,
                accepted: outcome.accepted,
                rejected: outcome.rejected,
            },
        );
        log::debug!(
            "trial={trial} engine: {mode:?} revenue={:.2} accepted={} rejected={}",
            outcome.revenue,
            outcome.accepted,
            outcome.rejected
        );

        Ok(TrialReport { outcome, log })
    }
}
