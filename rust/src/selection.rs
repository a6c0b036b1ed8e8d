//! Priority rules choosing the next job to start.
//!
//! Two rules are provided:
//! - `critical_path`: shortest remaining critical path first
//! - `downstream_workload`: largest own-plus-successor duration first
//!
//! Every rule breaks ties by the lowest job index so runs are deterministic.

use std::cmp::Reverse;

use crate::config::SelectionRule;
use crate::models::{Instance, Time};

/// A priority rule over the eligible set.
pub trait JobSelector {
    /// Short rule name used in logs and solution metadata.
    fn name(&self) -> &'static str;

    /// Pick one job from `eligible`, or `None` when it is empty.
    fn select(&self, eligible: &[usize]) -> Option<usize>;
}

/// Minimum critical path length first.
#[derive(Debug, Clone)]
pub struct ShortestCriticalPath {
    lengths: Vec<Time>,
}

impl ShortestCriticalPath {
    pub fn new(lengths: Vec<Time>) -> Self {
        Self { lengths }
    }
}

impl JobSelector for ShortestCriticalPath {
    fn name(&self) -> &'static str {
        SelectionRule::CriticalPath.as_str()
    }

    fn select(&self, eligible: &[usize]) -> Option<usize> {
        eligible
            .iter()
            .copied()
            .min_by_key(|&job| (self.lengths[job], job))
    }
}

/// Maximum `duration[j] + sum(duration[s])` over direct successors first.
#[derive(Debug, Clone)]
pub struct LargestDownstreamWorkload {
    workloads: Vec<u64>,
}

impl LargestDownstreamWorkload {
    pub fn new(instance: &Instance) -> Self {
        let workloads = (0..instance.n_jobs)
            .map(|job| {
                let successors: u64 = instance.successors[job]
                    .iter()
                    .map(|&s| instance.durations[s] as u64)
                    .sum();
                instance.durations[job] as u64 + successors
            })
            .collect();
        Self { workloads }
    }

    pub fn workload(&self, job: usize) -> u64 {
        self.workloads[job]
    }
}

impl JobSelector for LargestDownstreamWorkload {
    fn name(&self) -> &'static str {
        SelectionRule::DownstreamWorkload.as_str()
    }

    fn select(&self, eligible: &[usize]) -> Option<usize> {
        eligible
            .iter()
            .copied()
            .min_by_key(|&job| (Reverse(self.workloads[job]), job))
    }
}

/// Build the selector for a configured rule.
///
/// `critical_paths` is only consulted by the critical path rule.
pub fn build_selector(
    rule: SelectionRule,
    instance: &Instance,
    critical_paths: &[Time],
) -> Box<dyn JobSelector> {
    match rule {
        SelectionRule::CriticalPath => Box::new(ShortestCriticalPath::new(critical_paths.to_vec())),
        SelectionRule::DownstreamWorkload => Box::new(LargestDownstreamWorkload::new(instance)),
    }
}
