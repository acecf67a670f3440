pub mod allocation;
pub mod booking_curve;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod factors;
pub mod forecast;
pub mod lp;
pub mod monte_carlo;
pub mod rng;
pub mod simulation;
pub mod types;
pub mod unconstraining;
