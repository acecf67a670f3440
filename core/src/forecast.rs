//! Demand forecaster.
//!
//! Two stages:
//!   1. Total-market forecast per (class, quota): historical mean true
//!      demand scaled by the holiday and weekend factors that apply to the
//!      departure being priced. Sigma is a fixed fraction of mu.
//!   2. Bucket split: the market is spread over a quota's price buckets.
//!      FLEXI quotas use a constant-elasticity curve anchored at the lowest
//!      price (which captures the whole market); FLAT quotas keep the whole
//!      market in their single bucket. The resulting cumulative
//!      ("willing to pay at least p_i") demand is converted to independent
//!      per-bucket demand for the allocation engine.

use serde::{Deserialize, Serialize};

use crate::{
    config::{ExternalFactors, PriceStructure, RmConfig, SimSettings},
    factors::{calculate_demand_factors, mean, DemandFactors},
    types::{ClassCode, QuotaCode},
    unconstraining::{unconstrain_records, HistoricalRecord},
};

/// Total-market demand distribution for one (class, quota).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub mu: f64,
    pub sigma: f64,
}

/// Project total-market demand from the quota's unconstrained history.
pub fn forecast_total_demand(
    records: &[HistoricalRecord],
    factors: &DemandFactors,
    external: &ExternalFactors,
    settings: &SimSettings,
) -> Forecast {
    let Some(base) = mean(records.iter().map(HistoricalRecord::demand)) else {
        let mu = settings.default_market_size;
        return Forecast { mu, sigma: mu * settings.sigma_ratio };
    };

    let mut mu = base;
    if external.is_holiday {
        mu *= factors.factor_holiday;
    }
    if external.is_weekend() {
        mu *= factors.factor_weekend;
    }

    Forecast { mu, sigma: mu * settings.sigma_ratio }
}

/// Cumulative demand per bucket, lowest price first. Non-increasing.
pub fn cumulative_bucket_demand(
    market_mu: f64,
    pricing: &PriceStructure,
    elasticity: f64,
) -> Vec<f64> {
    let market_mu = market_mu.max(0.0);
    match pricing {
        PriceStructure::Flexi { buckets } => {
            let base_price = pricing.lowest_price();
            buckets
                .iter()
                .map(|b| market_mu * (base_price / b.price).powf(elasticity))
                .collect()
        }
        PriceStructure::Flat { .. } => vec![market_mu],
    }
}

/// Marginal demand per bucket: each bucket keeps what the next dearer
/// bucket does not absorb; the dearest bucket keeps its cumulative value.
pub fn cumulative_to_independent(cumulative: &[u32]) -> Vec<u32> {
    cumulative
        .iter()
        .enumerate()
        .map(|(i, &c)| match cumulative.get(i + 1) {
            Some(&next) => c.saturating_sub(next),
            None => c,
        })
        .collect()
}

/// Suffix sums of independent demand.
pub fn independent_to_cumulative(independent: &[u32]) -> Vec<u32> {
    let mut cumulative = vec![0u32; independent.len()];
    let mut running = 0u32;
    for (i, d) in independent.iter().enumerate().rev() {
        running += d;
        cumulative[i] = running;
    }
    cumulative
}

/// Everything the allocation engine and simulation need about one quota
/// in one trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaForecast {
    pub quota: QuotaCode,
    pub market_mu: f64,
    pub total_demand: u32,
    pub avg_revenue_per_seat: f64,
    /// Lowest price first.
    pub cumulative_demands: Vec<u32>,
    /// Lowest price first; the dearest bucket is last.
    pub independent_bucket_demands: Vec<u32>,
    pub prices: Vec<f64>,
}

impl QuotaForecast {
    pub fn build(quota: &str, market_mu: f64, pricing: &PriceStructure, elasticity: f64) -> Self {
        let cumulative_demands: Vec<u32> = cumulative_bucket_demand(market_mu, pricing, elasticity)
            .into_iter()
            .map(|d| d.max(0.0).floor() as u32)
            .collect();
        let independent_bucket_demands = cumulative_to_independent(&cumulative_demands);
        let prices = pricing.prices();
        let total_demand = independent_bucket_demands.iter().sum();

        let weighted: f64 = independent_bucket_demands
            .iter()
            .zip(&prices)
            .map(|(&d, &p)| d as f64 * p)
            .sum();
        let avg_revenue_per_seat = if total_demand > 0 {
            weighted / total_demand as f64
        } else {
            pricing.lowest_price()
        };

        Self {
            quota: quota.to_string(),
            market_mu,
            total_demand,
            avg_revenue_per_seat,
            cumulative_demands,
            independent_bucket_demands,
            prices,
        }
    }
}

/// Static demand knowledge for one (class, quota), built once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaDemand {
    pub quota: QuotaCode,
    pub history_len: usize,
    pub factors: DemandFactors,
    pub forecast: Forecast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDemand {
    pub class: ClassCode,
    pub quotas: Vec<QuotaDemand>,
}

/// Unconstrained history, factors and base forecasts for every configured
/// (class, quota). These depend only on static input, so every trial of a
/// run shares one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandModel {
    pub classes: Vec<ClassDemand>,
}

impl DemandModel {
    pub fn build(config: &RmConfig) -> Self {
        let settings = &config.settings;
        let classes = config
            .classes
            .iter()
            .map(|class| {
                let mut records = config.history_for(&class.code).to_vec();
                unconstrain_records(&mut records, class.capacity, settings.spill_factor);

                let quotas = class
                    .quotas
                    .iter()
                    .map(|cq| {
                        let quota_records: Vec<HistoricalRecord> = records
                            .iter()
                            .filter(|r| r.quota == cq.quota)
                            .cloned()
                            .collect();
                        let factors = calculate_demand_factors(&quota_records);
                        let forecast = forecast_total_demand(
                            &quota_records,
                            &factors,
                            &config.external,
                            settings,
                        );
                        log::info!(
                            "forecast: {}/{} mu={:.2} sigma={:.2} from {} records",
                            class.code,
                            cq.quota,
                            forecast.mu,
                            forecast.sigma,
                            quota_records.len()
                        );
                        QuotaDemand {
                            quota: cq.quota.clone(),
                            history_len: quota_records.len(),
                            factors,
                            forecast,
                        }
                    })
                    .collect();

                ClassDemand { class: class.code.clone(), quotas }
            })
            .collect();

        Self { classes }
    }

    pub fn quota(&self, class: &str, quota: &str) -> Option<&QuotaDemand> {
        self.classes
            .iter()
            .find(|c| c.class == class)
            .and_then(|c| c.quotas.iter().find(|q| q.quota == quota))
    }
}
