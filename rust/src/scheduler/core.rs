//! Core time-stepped transfer scheduler.

use thiserror::Error;

use crate::config::{SchedulerConfig, SelectionRule};
use crate::critical_path::{critical_path_lengths, CriticalPathError};
use crate::models::{Instance, InstanceError, Solution, Time};
use crate::selection::{build_selector, JobSelector};
use crate::{log_changes, log_checks, log_debug};

use super::eligibility::eligible_jobs;
use super::solution::SolutionBuilder;
use super::state::ScheduleState;
use super::transfer::{TransferOutcome, TransferPlanner};

/// Errors that can occur while setting up a scheduler.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Unknown selection rule: {0}")]
    UnknownSelectionRule(String),
    #[error("Unknown transfer policy: {0}")]
    UnknownTransferPolicy(String),
    #[error("Invalid instance: {0}")]
    InvalidInstance(#[from] InstanceError),
    #[error("Circular dependency detected")]
    CircularDependency,
}

impl From<CriticalPathError> for SchedulerError {
    fn from(err: CriticalPathError) -> Self {
        match err {
            CriticalPathError::CircularDependency => SchedulerError::CircularDependency,
        }
    }
}

/// State of the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerStatus {
    Running,
    Completed,
    Failed,
}

/// Details of a run that hit the horizon before every job was scheduled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureReport {
    /// Time at which the run gave up (equal to the horizon)
    pub time: Time,
    /// Jobs never scheduled, in index order
    pub unscheduled: Vec<usize>,
    /// Finishing times of the jobs that were scheduled
    pub finishing_time: Vec<Option<Time>>,
}

/// Result of one scheduling run. A failed run is a normal outcome, not an error.
#[derive(Clone, Debug, PartialEq)]
pub enum ScheduleOutcome {
    Completed(Solution),
    Failed(FailureReport),
}

impl ScheduleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Completed(solution) => Some(solution),
            Self::Failed(_) => None,
        }
    }

    /// Flatten into a [`Solution`], using the undefined sentinel on failure.
    pub fn into_solution(self) -> Solution {
        match self {
            Self::Completed(solution) => solution,
            Self::Failed(report) => {
                let mut solution = Solution::undefined();
                solution.algorithm_metadata.insert(
                    "failed_at".to_string(),
                    report.time.to_string(),
                );
                solution.algorithm_metadata.insert(
                    "unscheduled".to_string(),
                    report.unscheduled.len().to_string(),
                );
                solution
            }
        }
    }
}

/// Horizon used when none is configured.
///
/// Every job may have to wait one unit for its predecessors to count as
/// completed and up to the largest transfer time for its resources, on top of
/// its own duration.
pub fn default_horizon(instance: &Instance) -> Time {
    let per_job_wait = 1 + instance.max_transfer_time() as u64;
    let bound = instance.total_duration() + instance.n_jobs as u64 * per_job_wait + 1;
    bound.min(Time::MAX as u64) as Time
}

/// Greedy discrete-time scheduler with resource transfers between job locations.
pub struct TransferScheduler<'a> {
    instance: &'a Instance,
    selection_rule: SelectionRule,
    selector: Box<dyn JobSelector>,
    planner: TransferPlanner,
    critical_paths: Vec<Time>,
    horizon: Time,
    /// Initial capacity timeline length, at most the total duration; grows on demand
    timeline_len: Time,
    verbosity: u8,
    state: ScheduleState,
    status: SchedulerStatus,
    time_steps: u64,
}

impl<'a> TransferScheduler<'a> {
    /// Create a new scheduler.
    pub fn new(instance: &'a Instance, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        // Validate configuration upfront
        let selection_rule = config
            .parsed_selection_rule()
            .map_err(SchedulerError::UnknownSelectionRule)?;
        let transfer_rule = config
            .parsed_transfer_rule()
            .map_err(SchedulerError::UnknownTransferPolicy)?;

        instance.validate()?;
        let critical_paths = critical_path_lengths(instance)?;

        let bound = default_horizon(instance);
        let horizon = config.horizon.unwrap_or(bound);
        let total = instance.total_duration().min(Time::MAX as u64) as Time;
        let timeline_len = horizon.min(total);
        let selector = build_selector(selection_rule, instance, &critical_paths);

        Ok(Self {
            instance,
            selection_rule,
            selector,
            planner: TransferPlanner::new(transfer_rule),
            critical_paths,
            horizon,
            timeline_len,
            verbosity: config.verbosity,
            state: ScheduleState::new(instance, timeline_len),
            status: SchedulerStatus::Running,
            time_steps: 0,
        })
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status
    }

    pub fn horizon(&self) -> Time {
        self.horizon
    }

    pub fn critical_paths(&self) -> &[Time] {
        &self.critical_paths
    }

    /// State after (or during) the last run.
    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// Number of time steps the last run executed.
    pub fn time_steps(&self) -> u64 {
        self.time_steps
    }

    /// Run the simulation from time 0 until every job is scheduled or the horizon is reached.
    pub fn schedule(&mut self) -> ScheduleOutcome {
        self.state = ScheduleState::new(self.instance, self.timeline_len);
        self.status = SchedulerStatus::Running;
        self.time_steps = 0;

        let verbosity = self.verbosity;
        let mut eligible = eligible_jobs(self.instance, &self.state);

        loop {
            self.time_steps += 1;
            log_changes!(verbosity, "Time: {}", self.state.current_time);
            log_debug!(verbosity, "  Eligible jobs: {:?}", eligible);

            // Each eligible job gets one attempt per time step
            while let Some(job) = self.selector.select(&eligible) {
                eligible.retain(|&j| j != job);
                self.try_start(job);
            }

            if self.state.all_scheduled() {
                self.status = SchedulerStatus::Completed;
                break;
            }

            self.state.current_time += 1;

            if self.state.current_time >= self.horizon {
                self.status = SchedulerStatus::Failed;
                let unscheduled = self.state.unscheduled();
                log_changes!(
                    verbosity,
                    "Horizon {} reached with {} unscheduled jobs: {:?}",
                    self.horizon,
                    unscheduled.len(),
                    unscheduled
                );
                return ScheduleOutcome::Failed(FailureReport {
                    time: self.state.current_time,
                    unscheduled,
                    finishing_time: self.state.finishing_time.clone(),
                });
            }

            let finished = self.state.complete_finished();
            if !finished.is_empty() {
                log_debug!(verbosity, "  Completed jobs: {:?}", finished);
            }

            eligible = eligible_jobs(self.instance, &self.state);
        }

        let solution = SolutionBuilder::new(self.instance)
            .with_delay_indicator(self.selection_rule == SelectionRule::DownstreamWorkload)
            .metadata("selection_rule", self.selector.name())
            .metadata("transfer_policy", self.planner.policy_name())
            .metadata("horizon", self.horizon)
            .metadata("time_steps", self.time_steps)
            .build(&self.state);

        log_changes!(
            verbosity,
            "All {} jobs scheduled, makespan {:?}",
            self.instance.n_jobs,
            solution.makespan
        );

        ScheduleOutcome::Completed(solution)
    }

    /// Assemble resources for `job` and commit it at the current time if that succeeds.
    fn try_start(&mut self, job: usize) -> bool {
        let verbosity = self.verbosity;
        let now = self.state.current_time;

        log_checks!(
            verbosity,
            "  Considering job {} (critical path={}, duration={})",
            job,
            self.critical_paths[job],
            self.instance.durations[job]
        );

        match self.planner.assemble(self.instance, &mut self.state, job) {
            TransferOutcome::Assembled(transfers) => {
                for record in &transfers {
                    log_debug!(
                        verbosity,
                        "    Transfer {} x resource {} from job {} to job {}",
                        record.amount,
                        record.resource,
                        record.from_job,
                        record.to_job
                    );
                }

                let duration = self.instance.durations[job];
                self.state
                    .commit(job, duration, &self.instance.required_resources[job]);
                debug_assert_eq!(
                    self.state.stock_totals(),
                    self.instance.resource_availability,
                    "resource totals must be conserved"
                );

                log_changes!(
                    verbosity,
                    "  Started job {} at {} (finishes {})",
                    job,
                    now,
                    now.saturating_add(duration)
                );
                true
            }
            TransferOutcome::InsufficientSupply {
                resource,
                supply,
                required,
            } => {
                log_checks!(
                    verbosity,
                    "    Skipping {}: resource {} supply {} < required {}",
                    job,
                    resource,
                    supply,
                    required
                );
                false
            }
        }
    }
}

/// Build a scheduler for `instance` and run it once.
pub fn schedule(
    instance: &Instance,
    config: SchedulerConfig,
) -> Result<ScheduleOutcome, SchedulerError> {
    let mut scheduler = TransferScheduler::new(instance, config)?;
    Ok(scheduler.schedule())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferRule;

    const ALL_RULES: [(SelectionRule, TransferRule); 4] = [
        (SelectionRule::CriticalPath, TransferRule::EarliestTransfer),
        (SelectionRule::CriticalPath, TransferRule::MinIdleGap),
        (SelectionRule::DownstreamWorkload, TransferRule::EarliestTransfer),
        (SelectionRule::DownstreamWorkload, TransferRule::MinIdleGap),
    ];

    /// 0 -> 1 -> 2, job 1 needs both units of the only resource.
    fn chain() -> Instance {
        Instance::new(
            vec![0, 3, 0],
            vec![vec![1], vec![2], vec![]],
            vec![vec![0], vec![2], vec![0]],
            vec![2],
            None,
        )
    }

    /// Two independent jobs that each need the full availability.
    fn contention(transfer_1_to_2: Time) -> Instance {
        let mut transfer_times = vec![vec![0; 4]; 4];
        transfer_times[1][2] = transfer_1_to_2;
        Instance::new(
            vec![0, 2, 3, 0],
            vec![vec![1, 2], vec![3], vec![3], vec![]],
            vec![vec![0], vec![2], vec![2], vec![0]],
            vec![2],
            Some(transfer_times),
        )
    }

    /// Eight jobs, two resource types, non-trivial transfer times.
    fn project() -> Instance {
        let n = 8;
        let transfer_times = (0..n)
            .map(|a| {
                (0..n)
                    .map(|b| if a == b { 0 } else { ((a * 3 + b * 5) % 4) as Time })
                    .collect()
            })
            .collect();
        Instance::new(
            vec![0, 3, 2, 4, 2, 3, 1, 0],
            vec![
                vec![1, 2, 3],
                vec![4],
                vec![4, 5],
                vec![6],
                vec![7],
                vec![7],
                vec![7],
                vec![],
            ],
            vec![
                vec![0, 0],
                vec![2, 1],
                vec![3, 2],
                vec![1, 3],
                vec![4, 0],
                vec![2, 2],
                vec![1, 1],
                vec![0, 0],
            ],
            vec![4, 3],
            Some(transfer_times),
        )
    }

    fn run(instance: &Instance, selection: SelectionRule, transfer: TransferRule) -> Solution {
        let config = SchedulerConfig::with_rules(selection, transfer);
        match schedule(instance, config).unwrap() {
            ScheduleOutcome::Completed(solution) => solution,
            ScheduleOutcome::Failed(report) => panic!("run failed: {:?}", report),
        }
    }

    fn start_times(instance: &Instance, finishing: &[Time]) -> Vec<Time> {
        finishing
            .iter()
            .zip(&instance.durations)
            .map(|(&f, &d)| f - d)
            .collect()
    }

    #[test]
    fn test_chain_scenario() {
        let instance = chain();
        let mut scheduler = TransferScheduler::new(&instance, SchedulerConfig::default()).unwrap();
        let outcome = scheduler.schedule();

        assert_eq!(scheduler.status(), SchedulerStatus::Completed);
        let solution = outcome.solution().unwrap();
        // Job 1 is gated at t = 0 and starts at t = 1; the sink follows once 1 has completed
        assert_eq!(solution.job_finishing_time, Some(vec![0, 4, 5]));
        assert_eq!(solution.makespan, Some(5));
        assert_eq!(
            solution.resource_usage,
            Some(vec![vec![2], vec![0], vec![0], vec![0], vec![2]])
        );
        assert_eq!(solution.transfers.len(), 1);
        assert_eq!(solution.delay_indicator, None);
    }

    #[test]
    fn test_chain_fails_under_total_duration_horizon() {
        let instance = chain();
        let config = SchedulerConfig {
            horizon: Some(3),
            ..SchedulerConfig::default()
        };
        let mut scheduler = TransferScheduler::new(&instance, config).unwrap();
        let outcome = scheduler.schedule();

        assert_eq!(scheduler.status(), SchedulerStatus::Failed);
        assert_eq!(
            outcome,
            ScheduleOutcome::Failed(FailureReport {
                time: 3,
                unscheduled: vec![2],
                finishing_time: vec![Some(0), Some(4), None],
            })
        );
        assert!(scheduler.time_steps() <= 3 + 1);

        let solution = outcome.into_solution();
        assert!(!solution.is_feasible());
        assert_eq!(solution.job_finishing_time, None);
        assert_eq!(solution.resource_usage, None);
        assert_eq!(solution.delay_indicator, None);
    }

    #[test]
    fn test_job_without_requirements_starts_at_zero() {
        let instance = Instance::new(
            vec![0, 2, 0],
            vec![vec![1], vec![2], vec![]],
            vec![vec![0], vec![0], vec![0]],
            vec![1],
            None,
        );
        let solution = run(
            &instance,
            SelectionRule::CriticalPath,
            TransferRule::EarliestTransfer,
        );
        assert_eq!(solution.job_finishing_time, Some(vec![0, 2, 3]));
    }

    #[test]
    fn test_dummy_start_gating_with_transfer_time() {
        let mut instance = chain();
        instance.transfer_times[0][1] = 2;
        let solution = run(
            &instance,
            SelectionRule::DownstreamWorkload,
            TransferRule::MinIdleGap,
        );
        // 0 + 2 < t first holds at t = 3
        assert_eq!(solution.job_finishing_time, Some(vec![0, 6, 7]));
    }

    #[test]
    fn test_contention_runs_sequentially() {
        let instance = contention(0);
        let solution = run(
            &instance,
            SelectionRule::CriticalPath,
            TransferRule::EarliestTransfer,
        );
        // Job 1 has the shorter critical path and goes first; job 2 reuses its units
        assert_eq!(solution.job_finishing_time, Some(vec![0, 3, 7, 8]));
        assert_eq!(
            solution.transfers,
            vec![
                crate::models::TransferRecord::new(0, 1, 0, 2),
                crate::models::TransferRecord::new(1, 2, 0, 2),
            ]
        );
    }

    #[test]
    fn test_contention_respects_transfer_time() {
        let instance = contention(2);
        let solution = run(
            &instance,
            SelectionRule::CriticalPath,
            TransferRule::EarliestTransfer,
        );
        // Job 1 finishes at 3; 3 + 2 < t first holds at t = 6
        assert_eq!(solution.job_finishing_time, Some(vec![0, 3, 9, 10]));
    }

    #[test]
    fn test_downstream_workload_picks_longer_job_first() {
        let instance = contention(0);
        let solution = run(
            &instance,
            SelectionRule::DownstreamWorkload,
            TransferRule::EarliestTransfer,
        );
        // Job 2 (3 units of work) beats job 1 (2 units)
        assert_eq!(solution.job_finishing_time, Some(vec![0, 7, 4, 8]));
        assert!(solution.delay_indicator.is_some());
    }

    #[test]
    fn test_requirement_above_availability_fails() {
        let instance = Instance::new(
            vec![0, 1, 0],
            vec![vec![1], vec![2], vec![]],
            vec![vec![0], vec![3], vec![0]],
            vec![2],
            None,
        );
        let mut scheduler = TransferScheduler::new(&instance, SchedulerConfig::default()).unwrap();
        let outcome = scheduler.schedule();
        assert!(!outcome.is_completed());
        assert_eq!(scheduler.status(), SchedulerStatus::Failed);
        assert!(scheduler.time_steps() <= scheduler.horizon() as u64 + 1);
    }

    #[test]
    fn test_schedule_properties_hold_for_all_rules() {
        let instance = project();

        for (selection, transfer) in ALL_RULES {
            let mut scheduler = TransferScheduler::new(
                &instance,
                SchedulerConfig::with_rules(selection, transfer),
            )
            .unwrap();
            let solution = match scheduler.schedule() {
                ScheduleOutcome::Completed(solution) => solution,
                ScheduleOutcome::Failed(report) => {
                    panic!("{:?}/{:?} failed: {:?}", selection, transfer, report)
                }
            };
            let finishing = solution.job_finishing_time.clone().unwrap();
            let starts = start_times(&instance, &finishing);
            let makespan = solution.makespan.unwrap();

            // Precedence
            for (job, preds) in instance.predecessors.iter().enumerate() {
                for &p in preds {
                    assert!(finishing[p] < starts[job], "{} before {}", p, job);
                }
            }

            // Capacity, and the usage timeline matches the jobs running at each t
            let usage = solution.resource_usage.as_ref().unwrap();
            assert_eq!(usage.len(), makespan as usize);
            for t in 0..makespan {
                for r in 0..instance.n_resources {
                    let in_use: u32 = (0..instance.n_jobs)
                        .filter(|&j| starts[j] <= t && t < finishing[j])
                        .map(|j| instance.required_resources[j][r])
                        .sum();
                    assert!(in_use <= instance.resource_availability[r]);
                    assert_eq!(usage[t as usize][r], instance.resource_availability[r] - in_use);
                }
            }

            // Conservation
            assert_eq!(
                scheduler.state().stock_totals(),
                instance.resource_availability
            );

            // Every job received exactly its requirement, from sources whose transfer had landed
            for job in 1..instance.n_jobs {
                for r in 0..instance.n_resources {
                    let received: u32 = solution
                        .transfers
                        .iter()
                        .filter(|rec| rec.to_job == job && rec.resource == r)
                        .map(|rec| rec.amount)
                        .sum();
                    assert_eq!(received, instance.required_resources[job][r]);
                }
            }
            for rec in &solution.transfers {
                let arrival = finishing[rec.from_job] + instance.transfer_times[rec.from_job][rec.to_job];
                assert!(arrival < starts[rec.to_job]);
            }
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let instance = project();
        for (selection, transfer) in ALL_RULES {
            let first = run(&instance, selection, transfer);
            let second = run(&instance, selection, transfer);
            assert_eq!(first.job_finishing_time, second.job_finishing_time);
            assert_eq!(first.transfers, second.transfers);
        }
    }

    #[test]
    fn test_rescheduling_resets_state() {
        let instance = project();
        let mut scheduler = TransferScheduler::new(&instance, SchedulerConfig::default()).unwrap();
        let first = scheduler.schedule();
        let second = scheduler.schedule();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_rules_rejected() {
        let instance = chain();
        let config = SchedulerConfig {
            selection_rule: "fifo".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            TransferScheduler::new(&instance, config),
            Err(SchedulerError::UnknownSelectionRule(name)) if name == "fifo"
        ));

        let config = SchedulerConfig {
            transfer_policy: "teleport".to_string(),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            TransferScheduler::new(&instance, config),
            Err(SchedulerError::UnknownTransferPolicy(_))
        ));
    }

    #[test]
    fn test_invalid_instance_rejected() {
        let mut instance = chain();
        instance.transfer_times.pop();
        assert!(matches!(
            TransferScheduler::new(&instance, SchedulerConfig::default()),
            Err(SchedulerError::InvalidInstance(_))
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let instance = Instance::new(
            vec![0, 1, 1, 0],
            vec![vec![1], vec![2], vec![1, 3], vec![]],
            vec![vec![0]; 4],
            vec![1],
            None,
        );
        assert!(matches!(
            TransferScheduler::new(&instance, SchedulerConfig::default()),
            Err(SchedulerError::CircularDependency)
        ));
    }

    #[test]
    fn test_large_transfer_time_keeps_timeline_small() {
        // The sink never supplies job 1, so only the horizon grows
        let mut instance = chain();
        instance.transfer_times[2][1] = 400_000_000;
        let mut scheduler = TransferScheduler::new(&instance, SchedulerConfig::default()).unwrap();
        assert!(scheduler.horizon() > 1_200_000_000);
        assert!(scheduler.state().capacity.len() <= instance.total_duration() as usize);

        let solution = scheduler.schedule().into_solution();
        assert_eq!(solution.job_finishing_time, Some(vec![0, 4, 5]));
    }

    #[test]
    fn test_default_horizon() {
        let mut instance = chain();
        assert_eq!(default_horizon(&instance), 3 + 3 + 1);
        instance.transfer_times[0][1] = 2;
        assert_eq!(default_horizon(&instance), 3 + 3 * 3 + 1);
    }
}
