//! Demand-factor calculator: multiplicative holiday and weekend effects.
//!
//! Records are split into three segments:
//!   - baseline: non-holiday, not Friday/Sunday
//!   - holiday:  any holiday
//!   - weekend:  Friday/Sunday, non-holiday (holidays already counted)
//!
//! An empty segment borrows the next broader mean (weekend/holiday fall
//! back to baseline, baseline to the overall mean, overall to 1.0), so a
//! missing segment degrades its factor to exactly 1.0.

use serde::{Deserialize, Serialize};

use crate::{config::is_weekend_day, unconstraining::HistoricalRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DemandFactors {
    pub base_mu: f64,
    pub factor_holiday: f64,
    pub factor_weekend: f64,
}

impl Default for DemandFactors {
    fn default() -> Self {
        Self {
            base_mu: 1.0,
            factor_holiday: 1.0,
            factor_weekend: 1.0,
        }
    }
}

/// Derive factors from records whose `true_demand` is already set.
pub fn calculate_demand_factors(records: &[HistoricalRecord]) -> DemandFactors {
    let overall_mu = mean(records.iter().map(HistoricalRecord::demand)).unwrap_or(1.0);

    let base_mu = mean(
        records
            .iter()
            .filter(|r| !r.is_holiday && !is_weekend_day(r.day_of_week))
            .map(HistoricalRecord::demand),
    )
    .unwrap_or(overall_mu);

    let holiday_mu = mean(records.iter().filter(|r| r.is_holiday).map(HistoricalRecord::demand))
        .unwrap_or(base_mu);

    let weekend_mu = mean(
        records
            .iter()
            .filter(|r| !r.is_holiday && is_weekend_day(r.day_of_week))
            .map(HistoricalRecord::demand),
    )
    .unwrap_or(base_mu);

    let factors = DemandFactors {
        base_mu,
        factor_holiday: ratio(holiday_mu, base_mu),
        factor_weekend: ratio(weekend_mu, base_mu),
    };

    log::debug!(
        "factors: base_mu={:.2} holiday={:.3} weekend={:.3} from {} records",
        factors.base_mu,
        factors.factor_holiday,
        factors.factor_weekend,
        records.len()
    );
    factors
}

/// Arithmetic mean, `None` for an empty sequence.
pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Segment ratio; a zero or non-finite ratio degrades to 1.0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    let r = numerator / denominator;
    if r.is_finite() && r > 0.0 {
        r
    } else {
        1.0
    }
}
