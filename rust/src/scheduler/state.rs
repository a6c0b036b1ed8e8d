//! Mutable simulation state, stored as arrays indexed by job.

use rustc_hash::FxHashSet;

use crate::models::{Instance, Time, TransferRecord, Units};

use super::capacity::CapacityTimeline;

/// Lifecycle of a job within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Unscheduled,
    /// Committed and not yet finished before the current time.
    Active,
    Completed,
}

/// All state owned by the scheduler for the duration of one run.
#[derive(Clone, Debug)]
pub struct ScheduleState {
    /// Current simulation time
    pub current_time: Time,
    /// Finishing time per job (None until scheduled)
    pub finishing_time: Vec<Option<Time>>,
    pub status: Vec<JobStatus>,
    /// Jobs currently running
    pub active: FxHashSet<usize>,
    /// Units physically held by each job: stocks[job][resource]
    pub stocks: Vec<Vec<Units>>,
    /// Remaining capacity timeline
    pub capacity: CapacityTimeline,
    /// Every transfer committed so far, in order
    pub transfers: Vec<TransferRecord>,
    scheduled_count: usize,
}

impl ScheduleState {
    /// Initial state: the dummy start job is completed at time 0 and holds all resources.
    pub fn new(instance: &Instance, timeline_len: Time) -> Self {
        let n = instance.n_jobs;
        let mut finishing_time = vec![None; n];
        let mut status = vec![JobStatus::Unscheduled; n];
        let mut stocks = vec![vec![0; instance.n_resources]; n];

        finishing_time[0] = Some(0);
        status[0] = JobStatus::Completed;
        stocks[0] = instance.resource_availability.clone();

        Self {
            current_time: 0,
            finishing_time,
            status,
            active: FxHashSet::default(),
            stocks,
            capacity: CapacityTimeline::new(
                instance.resource_availability.clone(),
                timeline_len as usize,
            ),
            transfers: Vec::new(),
            scheduled_count: 1,
        }
    }

    #[inline]
    pub fn is_scheduled(&self, job: usize) -> bool {
        self.status[job] != JobStatus::Unscheduled
    }

    #[inline]
    pub fn is_completed(&self, job: usize) -> bool {
        self.status[job] == JobStatus::Completed
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled_count
    }

    pub fn all_scheduled(&self) -> bool {
        self.scheduled_count == self.status.len()
    }

    /// Jobs not yet scheduled, in index order.
    pub fn unscheduled(&self) -> Vec<usize> {
        (0..self.status.len())
            .filter(|&job| !self.is_scheduled(job))
            .collect()
    }

    /// Move units between job locations and log the transfer.
    pub fn apply_transfer(&mut self, record: TransferRecord) {
        let TransferRecord {
            from_job,
            to_job,
            resource,
            amount,
        } = record;
        debug_assert!(self.stocks[from_job][resource] >= amount);
        self.stocks[from_job][resource] -= amount;
        self.stocks[to_job][resource] += amount;
        self.transfers.push(record);
    }

    /// Commit `job` to start at the current time.
    pub fn commit(&mut self, job: usize, duration: Time, demand: &[Units]) {
        let start = self.current_time;
        self.finishing_time[job] = Some(start.saturating_add(duration));
        self.status[job] = JobStatus::Active;
        let _ = self.active.insert(job);
        self.capacity.reserve(demand, start, duration);
        self.scheduled_count += 1;
    }

    /// Mark active jobs finishing strictly before the current time as completed.
    ///
    /// Returns the newly completed jobs in index order.
    pub fn complete_finished(&mut self) -> Vec<usize> {
        let now = self.current_time;
        let mut finished: Vec<usize> = self
            .active
            .iter()
            .copied()
            .filter(|&job| self.finishing_time[job].is_some_and(|f| f < now))
            .collect();
        finished.sort_unstable();

        for &job in &finished {
            let _ = self.active.remove(&job);
            self.status[job] = JobStatus::Completed;
        }
        finished
    }

    /// Total units of each resource type across all job locations.
    pub fn stock_totals(&self) -> Vec<Units> {
        let n_resources = self.stocks.first().map_or(0, |s| s.len());
        let mut totals = vec![0; n_resources];
        for stock in &self.stocks {
            for (total, &units) in totals.iter_mut().zip(stock) {
                *total += units;
            }
        }
        totals
    }
}
