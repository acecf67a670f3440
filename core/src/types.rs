//! Shared primitive types used across the whole pipeline.

/// A day index counted backwards from departure. Day 0 is departure day,
/// day 1 is departure eve, day `booking_window_days` is the day sales open.
pub type Day = u32;

/// Travel class code, e.g. "1AC".
pub type ClassCode = String;

/// Quota code, e.g. "GN".
pub type QuotaCode = String;

/// Zero-based index of a Monte Carlo trial. Trial 0 is the baseline.
pub type TrialIndex = u64;
