//! Stats module - Window statistics

mod calculator;

pub use calculator::{BeatSummary, LeadStats, StatsCalculator, WindowSummary};
