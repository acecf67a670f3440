//! Trial event log.
//!
//! RULE: Only the baseline trial records events. Stochastic trials run
//! with a disabled log so that recording costs nothing.
//!
//! The recorded events, rendered one per line, are the full execution
//! log handed to the caller alongside the aggregate statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    allocation::AllocationSource,
    engine::TrialMode,
    lp::LpStatus,
    types::{ClassCode, Day, QuotaCode, TrialIndex},
};

/// Every event a trial can record.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Trial lifecycle ────────────────────────────
    TrialStarted {
        trial: TrialIndex,
        mode: TrialMode,
    },
    TrialCompleted {
        trial: TrialIndex,
        revenue: f64,
        accepted: u64,
        rejected: u64,
    },

    // ── Forecast ───────────────────────────────────
    DemandForecast {
        class: ClassCode,
        quota: QuotaCode,
        market_mu: f64,
        total_demand: u32,
        independent_demands: Vec<u32>,
        avg_revenue_per_seat: f64,
    },

    // ── Allocation ─────────────────────────────────
    MasterAllocated {
        class: ClassCode,
        capacity: u32,
        seats: Vec<(QuotaCode, u32)>,
        bid_price: f64,
        status: LpStatus,
    },
    BucketsAllocated {
        class: ClassCode,
        quota: QuotaCode,
        seats: Vec<u32>,
        source: AllocationSource,
    },

    // ── Booking horizon ────────────────────────────
    BookingsProcessed {
        day: Day,
        class: ClassCode,
        quota: QuotaCode,
        expected: f64,
        arrivals: u64,
        accepted: u64,
        rejected: u64,
    },
    ClassSummary {
        class: ClassCode,
        seats_sold: u32,
        capacity: u32,
        revenue: f64,
        accepted: u64,
        rejected: u64,
    },
}

impl SimEvent {
    /// Stable name of the variant.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TrialStarted { .. }      => "trial_started",
            Self::TrialCompleted { .. }    => "trial_completed",
            Self::DemandForecast { .. }    => "demand_forecast",
            Self::MasterAllocated { .. }   => "master_allocated",
            Self::BucketsAllocated { .. }  => "buckets_allocated",
            Self::BookingsProcessed { .. } => "bookings_processed",
            Self::ClassSummary { .. }      => "class_summary",
        }
    }

    /// Component that produced the event.
    pub fn component(&self) -> &'static str {
        match self {
            Self::TrialStarted { .. } | Self::TrialCompleted { .. } => "engine",
            Self::DemandForecast { .. } => "forecast",
            Self::MasterAllocated { .. } | Self::BucketsAllocated { .. } => "allocation",
            Self::BookingsProcessed { .. } | Self::ClassSummary { .. } => "simulation",
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrialStarted { trial, mode } => {
                write!(f, "trial {trial} started ({mode:?})")
            }
            Self::TrialCompleted { trial, revenue, accepted, rejected } => write!(
                f,
                "trial {trial} complete: revenue {revenue:.2}, \
                 {accepted} accepted, {rejected} rejected"
            ),
            Self::DemandForecast {
                class,
                quota,
                market_mu,
                total_demand,
                independent_demands,
                avg_revenue_per_seat,
            } => write!(
                f,
                "{class}/{quota}: market mu {market_mu:.2}, total demand {total_demand}, \
                 bucket demand {independent_demands:?}, avg revenue/seat {avg_revenue_per_seat:.2}"
            ),
            Self::MasterAllocated { class, capacity, seats, bid_price, status } => write!(
                f,
                "{class}: master allocation of {capacity} seats {seats:?} ({status:?}), \
                 bid price {bid_price:.2}"
            ),
            Self::BucketsAllocated { class, quota, seats, source } => {
                write!(f, "{class}/{quota}: bucket allocation {seats:?} ({source:?})")
            }
            Self::BookingsProcessed {
                day,
                class,
                quota,
                expected,
                arrivals,
                accepted,
                rejected,
            } => write!(
                f,
                "day {day} {class}/{quota}: expected {expected:.2}, arrivals {arrivals}, \
                 accepted {accepted}, rejected {rejected}"
            ),
            Self::ClassSummary {
                class,
                seats_sold,
                capacity,
                revenue,
                accepted,
                rejected,
            } => write!(
                f,
                "{class}: sold {seats_sold}/{capacity} seats, revenue {revenue:.2}, \
                 {accepted} accepted, {rejected} rejected"
            ),
        }
    }
}

/// A recorded event with its trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub trial: TrialIndex,
    pub component: String,
    pub event_type: String,
    pub event: SimEvent,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    enabled: bool,
    entries: Vec<EventLogEntry>,
}

impl EventLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, entries: Vec::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, trial: TrialIndex, event: SimEvent) {
        if !self.enabled {
            return;
        }
        self.entries.push(EventLogEntry {
            trial,
            component: event.component().to_string(),
            event_type: event.event_type().to_string(),
            event,
        });
    }

    pub fn entries(&self) -> &[EventLogEntry] {
        &self.entries
    }

    /// One line per event: `[trial N] component: text`.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("[trial {}] {}: {}\n", e.trial, e.component, e.event))
            .collect()
    }
}
