//! Booking-curve (pick-up) model.
//!
//! A pickup curve maps a day index (days before departure) to the
//! cumulative fraction of total demand booked by the START of that day.
//! Day `window` is the opening day (0.0) and day 0 is departure (1.0).
//!
//! Curves are built once per (archetype, window) when the run starts and
//! are read-only afterwards; every trial borrows the same instance.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    config::{BookingArchetype, RmConfig},
    types::{Day, QuotaCode},
};

/// Days at the start of the window in which the bimodal curve books its
/// early half.
pub const BIMODAL_EARLY_DAYS: Day = 30;
/// Days before departure in which the bimodal curve books its late half.
pub const BIMODAL_LATE_DAYS: Day = 15;
const BIMODAL_EARLY_SHARE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct PickupCurve {
    window: Day,
    /// Indexed by day, 0..=window.
    fractions: Vec<f64>,
}

impl PickupCurve {
    /// Square-root ramp: the remaining fraction decays with sqrt(day / window),
    /// so bookings accelerate towards departure.
    pub fn general(window: Day) -> Self {
        let len = window as f64;
        let mut fractions: Vec<f64> = (0..=window)
            .map(|day| 1.0 - (day as f64 / len).sqrt())
            .collect();
        fractions[window as usize] = 0.0;
        fractions[0] = 1.0;
        Self { window, fractions }
    }

    /// Half the demand books linearly over the first 30 days of the window,
    /// nothing books in the middle, the other half books linearly over the
    /// last 15 days.
    pub fn bimodal(window: Day) -> Self {
        let early = BIMODAL_EARLY_DAYS as f64;
        let late = BIMODAL_LATE_DAYS as f64;
        let late_share = 1.0 - BIMODAL_EARLY_SHARE;

        let mut fractions: Vec<f64> = (0..=window)
            .map(|day| {
                if day + BIMODAL_EARLY_DAYS > window {
                    let days_in = (window - day) as f64;
                    days_in / early * BIMODAL_EARLY_SHARE
                } else if day <= BIMODAL_LATE_DAYS {
                    let days_in = (BIMODAL_LATE_DAYS - day) as f64;
                    BIMODAL_EARLY_SHARE + days_in / late * late_share
                } else {
                    BIMODAL_EARLY_SHARE
                }
            })
            .collect();
        fractions[window as usize] = 0.0;
        fractions[0] = 1.0;
        Self { window, fractions }
    }

    pub fn window(&self) -> Day {
        self.window
    }

    /// Cumulative fraction booked by the start of `day`. Days before the
    /// window opens have booked nothing.
    pub fn fraction(&self, day: Day) -> f64 {
        self.fractions.get(day as usize).copied().unwrap_or(0.0)
    }

    /// Share of total demand that books during `day`.
    pub fn daily_share(&self, day: Day) -> f64 {
        if day == 0 {
            return 0.0;
        }
        (self.fraction(day - 1) - self.fraction(day)).max(0.0)
    }
}

/// How one quota's demand is spread over the horizon.
#[derive(Debug, Clone)]
pub enum BookingProfile {
    Curve(Arc<PickupCurve>),
    /// Whole demand arrives on the opening day.
    Spike { open_day: Day },
}

impl BookingProfile {
    /// Expected arrivals on `day` for a quota with `total_demand`.
    pub fn expected_arrivals(&self, day: Day, total_demand: f64) -> f64 {
        match self {
            Self::Curve(curve) => total_demand * curve.daily_share(day),
            Self::Spike { open_day } => {
                if day == *open_day {
                    total_demand
                } else {
                    0.0
                }
            }
        }
    }
}

/// Booking profiles of every configured quota.
#[derive(Debug, Clone)]
pub struct BookingCurves {
    profiles: HashMap<QuotaCode, BookingProfile>,
}

impl BookingCurves {
    pub fn build(config: &RmConfig) -> Self {
        let mut cache: HashMap<(BookingArchetype, Day), Arc<PickupCurve>> = HashMap::new();
        let mut profiles = HashMap::new();

        for quota in &config.quotas {
            let window = quota.window_open;
            let profile = match quota.archetype {
                BookingArchetype::LastMinute => BookingProfile::Spike { open_day: window },
                archetype => {
                    let curve = cache
                        .entry((archetype, window))
                        .or_insert_with(|| {
                            log::debug!(
                                "booking_curve: building {archetype:?} curve over {window} days"
                            );
                            Arc::new(match archetype {
                                BookingArchetype::Bimodal => PickupCurve::bimodal(window),
                                _ => PickupCurve::general(window),
                            })
                        })
                        .clone();
                    BookingProfile::Curve(curve)
                }
            };
            profiles.insert(quota.code.clone(), profile);
        }

        Self { profiles }
    }

    pub fn profile(&self, quota: &str) -> Option<&BookingProfile> {
        self.profiles.get(quota)
    }
}
