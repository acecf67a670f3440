//! Demand unconstraining: true demand from capacity-censored sales.
//!
//! A departure that did not sell out observed its full demand. A
//! departure that sold out turned customers away; the earlier it sold
//! out, the more demand was suppressed. Each day of early sell-out
//! compounds the estimate by the spill factor.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::types::QuotaCode;

/// One historical departure's sales for one quota.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoricalRecord {
    pub train_id: u32,
    /// Days before departure on which the quota sold out (0 if it never did early).
    #[serde(alias = "days_early")]
    pub days_before_departure: u32,
    pub total_sold: u32,
    pub is_holiday: bool,
    pub day_of_week: Weekday,
    #[serde(alias = "quota_code")]
    pub quota: QuotaCode,
    /// Derived by [`unconstrain_records`]; absent in static input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_demand: Option<f64>,
}

impl HistoricalRecord {
    pub fn new(
        train_id: u32,
        days_before_departure: u32,
        total_sold: u32,
        is_holiday: bool,
        day_of_week: Weekday,
        quota: &str,
    ) -> Self {
        Self {
            train_id,
            days_before_departure,
            total_sold,
            is_holiday,
            day_of_week,
            quota: quota.to_string(),
            true_demand: None,
        }
    }

    /// Unconstrained demand, falling back to raw sales if not yet derived.
    pub fn demand(&self) -> f64 {
        self.true_demand.unwrap_or(self.total_sold as f64)
    }
}

/// Estimate true demand for a single observation.
pub fn unconstrain(sold: u32, days_early: u32, capacity: u32, spill_factor: f64) -> f64 {
    if sold < capacity {
        return sold as f64;
    }
    sold as f64 * (1.0 + spill_factor).powf(days_early as f64)
}

/// Annotate every record with its `true_demand` and return the estimates
/// in record order.
pub fn unconstrain_records(
    records: &mut [HistoricalRecord],
    capacity: u32,
    spill_factor: f64,
) -> Vec<f64> {
    let estimates: Vec<f64> = records
        .iter_mut()
        .map(|rec| {
            let estimate = unconstrain(
                rec.total_sold,
                rec.days_before_departure,
                capacity,
                spill_factor,
            );
            rec.true_demand = Some(estimate);
            estimate
        })
        .collect();

    log::debug!(
        "unconstraining: {} records against capacity {capacity}, estimates {:?}",
        records.len(),
        estimates
    );
    estimates
}
