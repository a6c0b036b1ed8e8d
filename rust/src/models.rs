//! Core data types for the transfer scheduling system.

use pyo3::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

// Note: We use std HashMap here for PyO3 interface compatibility

/// Discrete simulation time.
pub type Time = u32;

/// Quantity of a single resource type.
pub type Units = u32;

/// Errors describing a malformed instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstanceError {
    #[error("Instance has no jobs")]
    Empty,
    #[error("{field} has length {actual}, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Job {job} references unknown job {target}")]
    JobOutOfRange { job: usize, target: usize },
    #[error("Successors and predecessors disagree on edge {from} -> {to}")]
    InconsistentEdges { from: usize, to: usize },
    #[error("Job 0 must not have predecessors")]
    StartHasPredecessors,
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("I/O error: {0}")]
    Io(String),
}

/// A project instance: jobs, precedence, demands, capacities and transfer times.
///
/// Job 0 is the dummy start job; the last job is normally the dummy sink.
#[pyclass]
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    #[pyo3(get)]
    pub n_jobs: usize,
    #[pyo3(get)]
    pub n_resources: usize,
    #[pyo3(get, set)]
    pub durations: Vec<Time>,
    #[pyo3(get, set)]
    pub successors: Vec<Vec<usize>>,
    #[pyo3(get, set)]
    pub predecessors: Vec<Vec<usize>>,
    #[pyo3(get, set)]
    pub required_resources: Vec<Vec<Units>>,
    #[pyo3(get, set)]
    pub resource_availability: Vec<Units>,
    #[pyo3(get, set)]
    pub transfer_times: Vec<Vec<Time>>,
}

impl Instance {
    /// Build an instance from successor lists, deriving predecessors.
    ///
    /// `transfer_times` defaults to an all-zero matrix when `None`.
    pub fn new(
        durations: Vec<Time>,
        successors: Vec<Vec<usize>>,
        required_resources: Vec<Vec<Units>>,
        resource_availability: Vec<Units>,
        transfer_times: Option<Vec<Vec<Time>>>,
    ) -> Self {
        let n_jobs = durations.len();
        let n_resources = resource_availability.len();

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n_jobs];
        for (job, succs) in successors.iter().enumerate() {
            for &s in succs {
                if let Some(preds) = predecessors.get_mut(s) {
                    preds.push(job);
                }
            }
        }

        let transfer_times = transfer_times.unwrap_or_else(|| vec![vec![0; n_jobs]; n_jobs]);

        Self {
            n_jobs,
            n_resources,
            durations,
            successors,
            predecessors,
            required_resources,
            resource_availability,
            transfer_times,
        }
    }

    /// Index of the sink job (the last job).
    #[inline]
    pub fn sink(&self) -> usize {
        self.n_jobs.saturating_sub(1)
    }

    /// Sum of all job durations.
    pub fn total_duration(&self) -> u64 {
        self.durations.iter().map(|&d| d as u64).sum()
    }

    /// Largest entry in the transfer-time matrix.
    pub fn max_transfer_time(&self) -> Time {
        self.transfer_times
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Check that every vector and matrix has the dimensions the header declares.
    pub fn validate(&self) -> Result<(), InstanceError> {
        let n = self.n_jobs;
        let r = self.n_resources;

        if n == 0 {
            return Err(InstanceError::Empty);
        }

        let check_len = |field: &'static str, actual: usize, expected: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(InstanceError::LengthMismatch {
                    field,
                    expected,
                    actual,
                })
            }
        };

        check_len("durations", self.durations.len(), n)?;
        check_len("successors", self.successors.len(), n)?;
        check_len("predecessors", self.predecessors.len(), n)?;
        check_len("required_resources", self.required_resources.len(), n)?;
        check_len("resource_availability", self.resource_availability.len(), r)?;
        check_len("transfer_times", self.transfer_times.len(), n)?;

        for req in &self.required_resources {
            check_len("required_resources row", req.len(), r)?;
        }
        for row in &self.transfer_times {
            check_len("transfer_times row", row.len(), n)?;
        }

        for (job, succs) in self.successors.iter().enumerate() {
            for &s in succs {
                if s >= n {
                    return Err(InstanceError::JobOutOfRange { job, target: s });
                }
                if !self.predecessors[s].contains(&job) {
                    return Err(InstanceError::InconsistentEdges { from: job, to: s });
                }
            }
        }
        for (job, preds) in self.predecessors.iter().enumerate() {
            for &p in preds {
                if p >= n {
                    return Err(InstanceError::JobOutOfRange { job, target: p });
                }
                if !self.successors[p].contains(&job) {
                    return Err(InstanceError::InconsistentEdges { from: p, to: job });
                }
            }
        }

        if !self.predecessors[0].is_empty() {
            return Err(InstanceError::StartHasPredecessors);
        }

        Ok(())
    }
}

#[pymethods]
impl Instance {
    #[new]
    #[pyo3(signature = (
        durations,
        successors,
        required_resources,
        resource_availability,
        transfer_times=None
    ))]
    fn py_new(
        durations: Vec<Time>,
        successors: Vec<Vec<usize>>,
        required_resources: Vec<Vec<Units>>,
        resource_availability: Vec<Units>,
        transfer_times: Option<Vec<Vec<Time>>>,
    ) -> Self {
        Self::new(
            durations,
            successors,
            required_resources,
            resource_availability,
            transfer_times,
        )
    }

    fn __repr__(&self) -> String {
        format!(
            "Instance(n_jobs={}, n_resources={}, availability={:?})",
            self.n_jobs, self.n_resources, self.resource_availability
        )
    }
}

/// A quantity of one resource type moved from one job's location to another's.
#[pyclass]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    #[pyo3(get)]
    pub from_job: usize,
    #[pyo3(get)]
    pub to_job: usize,
    #[pyo3(get)]
    pub resource: usize,
    #[pyo3(get)]
    pub amount: Units,
}

#[pymethods]
impl TransferRecord {
    #[new]
    pub fn new(from_job: usize, to_job: usize, resource: usize, amount: Units) -> Self {
        Self {
            from_job,
            to_job,
            resource,
            amount,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "TransferRecord({} -> {}, resource={}, amount={})",
            self.from_job, self.to_job, self.resource, self.amount
        )
    }
}

/// Result of a scheduling run.
///
/// `None` in the schedule fields means the run did not complete.
#[pyclass]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Solution {
    #[pyo3(get)]
    pub delay_indicator: Option<i64>,
    #[pyo3(get)]
    pub makespan: Option<Time>,
    #[pyo3(get)]
    pub job_finishing_time: Option<Vec<Time>>,
    /// Remaining capacity per time unit over `[0, makespan)`.
    #[pyo3(get)]
    pub resource_usage: Option<Vec<Vec<Units>>>,
    #[pyo3(get)]
    pub transfers: Vec<TransferRecord>,
    #[pyo3(get)]
    pub algorithm_metadata: HashMap<String, String>,
}

impl Solution {
    /// The failure sentinel: every schedule field undefined.
    pub fn undefined() -> Self {
        Self::default()
    }
}

#[pymethods]
impl Solution {
    /// True when the run produced a complete schedule.
    pub fn is_feasible(&self) -> bool {
        self.makespan.is_some()
    }

    fn __repr__(&self) -> String {
        format!(
            "Solution(makespan={:?}, delay_indicator={:?}, transfers={})",
            self.makespan,
            self.delay_indicator,
            self.transfers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Instance {
        Instance::new(
            vec![0, 3, 0],
            vec![vec![1], vec![2], vec![]],
            vec![vec![0], vec![2], vec![0]],
            vec![2],
            None,
        )
    }

    #[test]
    fn test_predecessors_derived() {
        let instance = chain();
        assert_eq!(instance.predecessors, vec![vec![], vec![0], vec![1]]);
        assert_eq!(instance.transfer_times, vec![vec![0; 3]; 3]);
        assert_eq!(instance.sink(), 2);
        assert_eq!(instance.total_duration(), 3);
        assert!(instance.validate().is_ok());
    }

    #[test]
    fn test_validate_dimension_mismatch() {
        let mut instance = chain();
        instance.required_resources[1] = vec![1, 1];
        assert!(matches!(
            instance.validate(),
            Err(InstanceError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_out_of_range_successor() {
        let mut instance = chain();
        instance.successors[1].push(7);
        assert_eq!(
            instance.validate(),
            Err(InstanceError::JobOutOfRange { job: 1, target: 7 })
        );
    }

    #[test]
    fn test_validate_start_with_predecessor() {
        let instance = Instance::new(
            vec![0, 1],
            vec![vec![1], vec![0]],
            vec![vec![0], vec![0]],
            vec![1],
            None,
        );
        assert_eq!(instance.validate(), Err(InstanceError::StartHasPredecessors));
    }

    #[test]
    fn test_undefined_solution() {
        let solution = Solution::undefined();
        assert!(!solution.is_feasible());
        assert!(solution.job_finishing_time.is_none());
        assert!(solution.resource_usage.is_none());
        assert!(solution.delay_indicator.is_none());
    }
}
