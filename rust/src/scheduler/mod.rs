//! Scheduler module for the time-stepped transfer scheduler.
//!
//! At each unit of time the scheduler collects the eligible jobs, picks them
//! one by one with the configured selection rule, and starts every job whose
//! resources can be brought to it from finished jobs in time.

mod capacity;
mod core;
mod eligibility;
mod solution;
mod state;
mod transfer;

pub use capacity::CapacityTimeline;
pub use core::{
    default_horizon, schedule, FailureReport, ScheduleOutcome, SchedulerError, SchedulerStatus,
    TransferScheduler,
};
pub use eligibility::eligible_jobs;
pub use solution::{delay_indicator, SolutionBuilder};
pub use state::{JobStatus, ScheduleState};
pub use transfer::{
    EarliestTransfer, MinIdleGap, TransferOutcome, TransferPlanner, TransferPolicy,
    TransferRequest,
};
