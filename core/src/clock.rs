//! Booking clock: counts the horizon down from the opening day to
//! departure eve.

use crate::types::Day;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingClock {
    pub horizon: Day,
    /// The day being simulated; `None` before the first advance.
    pub current_day: Option<Day>,
}

impl BookingClock {
    pub fn new(horizon: Day) -> Self {
        Self { horizon, current_day: None }
    }

    /// Step to the next day. Returns `None` once day 1 has been simulated.
    pub fn advance(&mut self) -> Option<Day> {
        let next = match self.current_day {
            None if self.horizon > 0 => self.horizon,
            Some(day) if day > 1 => day - 1,
            _ => {
                self.current_day = Some(0);
                return None;
            }
        };
        self.current_day = Some(next);
        Some(next)
    }

    /// True once departure (day 0) is reached.
    pub fn is_closed(&self) -> bool {
        self.current_day == Some(0)
    }
}
