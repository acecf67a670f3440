//! Monte Carlo driver.
//!
//! Trial 0 is the deterministic baseline: forecast means, full event log.
//! Trials 1..N re-sample market demand per quota and run silently.
//!
//! RULES:
//!   - Progress is reported between trials, never mid-trial.
//!   - A configuration error in any trial aborts the whole run.
//!   - The structured result is the return value; the observer only ever
//!     sees RunEvents.

use serde::{Deserialize, Serialize};

use crate::{
    booking_curve::BookingCurves,
    config::RmConfig,
    engine::{TrialEngine, TrialMode},
    error::{SimError, SimResult},
    forecast::DemandModel,
    lp::{ClarabelSolver, LpSolver},
    simulation::ClassOutcome,
    types::TrialIndex,
};

/// Notification delivered to the caller between trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RunEvent {
    Status(String),
    Progress { completed: usize, total: usize },
}

/// Summary statistics over a list of trial revenues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

impl RevenueStats {
    pub fn from_revenues(revenues: &[f64]) -> Self {
        if revenues.is_empty() {
            return Self::default();
        }
        let n = revenues.len() as f64;
        let mean = revenues.iter().sum::<f64>() / n;
        let variance = revenues.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = revenues.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Self {
            mean,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            p10: percentile(&sorted, 10.0),
            p50: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
        }
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice: the
/// `ceil(p/100 * n)`-th smallest value.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = (p * sorted.len() as f64 / 100.0).ceil().max(1.0) as usize;
    sorted[rank.min(sorted.len()) - 1]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub n_simulations: usize,
    pub seed: u64,
    pub baseline_revenue: f64,
    pub mean_revenue: f64,
    pub std_dev: f64,
    pub min_revenue: f64,
    pub max_revenue: f64,
    pub p10_revenue: f64,
    pub p50_revenue: f64,
    pub p90_revenue: f64,
    /// One entry per trial; the baseline is first.
    pub all_revenues: Vec<f64>,
    pub mean_accepted: f64,
    pub mean_rejected: f64,
    pub baseline_breakdown: Vec<ClassOutcome>,
    /// Rendered event log of the baseline trial.
    pub baseline_log: String,
}

/// Owns the static inputs of a run: validated config, booking curves,
/// the demand model and the LP backend.
pub struct MonteCarloDriver {
    config: RmConfig,
    curves: BookingCurves,
    demand: DemandModel,
    solver: Box<dyn LpSolver>,
}

impl MonteCarloDriver {
    pub fn new(config: &RmConfig) -> SimResult<Self> {
        let solver = ClarabelSolver::new(config.settings.lp_max_iterations);
        Self::with_solver(config, Box::new(solver))
    }

    pub fn with_solver(config: &RmConfig, solver: Box<dyn LpSolver>) -> SimResult<Self> {
        config.validate()?;
        let curves = BookingCurves::build(config);
        let demand = DemandModel::build(config);
        Ok(Self {
            config: config.clone(),
            curves,
            demand,
            solver,
        })
    }

    pub fn config(&self) -> &RmConfig {
        &self.config
    }

    /// Run with the trial count and seed from the config settings.
    pub fn run(&self, on_event: impl FnMut(RunEvent)) -> SimResult<MonteCarloResult> {
        let s = &self.config.settings;
        self.run_trials(s.n_simulations, s.seed, on_event)
    }

    pub fn run_trials(
        &self,
        n_simulations: usize,
        seed: u64,
        mut on_event: impl FnMut(RunEvent),
    ) -> SimResult<MonteCarloResult> {
        if n_simulations == 0 {
            return Err(SimError::InvalidConfig(
                "n_simulations must be at least 1".to_string(),
            ));
        }
        let interval = self.config.settings.progress_interval.max(1);
        let engine = TrialEngine::new(
            &self.config,
            &self.curves,
            &self.demand,
            self.solver.as_ref(),
            seed,
        );

        log::info!("monte_carlo: starting {n_simulations} trials, seed={seed}");
        on_event(RunEvent::Status("Running deterministic baseline".to_string()));

        let baseline = engine.run_trial(0, TrialMode::Deterministic)?;
        let baseline_revenue = baseline.outcome.revenue;
        on_event(RunEvent::Status(format!(
            "Baseline revenue: {baseline_revenue:.2}"
        )));

        let mut revenues = Vec::with_capacity(n_simulations);
        let mut accepted_total = baseline.outcome.accepted;
        let mut rejected_total = baseline.outcome.rejected;
        revenues.push(baseline_revenue);
        report_progress(1, n_simulations, interval, &mut on_event);

        if n_simulations > 1 {
            on_event(RunEvent::Status(format!(
                "Running {} stochastic trials",
                n_simulations - 1
            )));
        }
        for trial in 1..n_simulations {
            let report = engine.run_trial(trial as TrialIndex, TrialMode::Stochastic)?;
            revenues.push(report.outcome.revenue);
            accepted_total += report.outcome.accepted;
            rejected_total += report.outcome.rejected;
            report_progress(trial + 1, n_simulations, interval, &mut on_event);
        }

        on_event(RunEvent::Status("Aggregating results".to_string()));
        let stats = RevenueStats::from_revenues(&revenues);
        let n = n_simulations as f64;

        log::info!(
            "monte_carlo: done mean={:.2} std_dev={:.2} min={:.2} max={:.2}",
            stats.mean,
            stats.std_dev,
            stats.min,
            stats.max
        );

        Ok(MonteCarloResult {
            n_simulations,
            seed,
            baseline_revenue,
            mean_revenue: stats.mean,
            std_dev: stats.std_dev,
            min_revenue: stats.min,
            max_revenue: stats.max,
            p10_revenue: stats.p10,
            p50_revenue: stats.p50,
            p90_revenue: stats.p90,
            all_revenues: revenues,
            mean_accepted: accepted_total as f64 / n,
            mean_rejected: rejected_total as f64 / n,
            baseline_log: baseline.log.render(),
            baseline_breakdown: baseline.outcome.classes,
        })
    }
}

fn report_progress(
    completed: usize,
    total: usize,
    interval: usize,
    on_event: &mut impl FnMut(RunEvent),
) {
    if completed % interval == 0 || completed == total {
        on_event(RunEvent::Progress { completed, total });
    }
}
