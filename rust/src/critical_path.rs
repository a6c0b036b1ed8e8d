//! Critical path lengths over the precedence graph.
//!
//! The longest duration-weighted path from each job to the sink is computed by a
//! single dynamic program in reverse topological order, linear in jobs plus
//! precedence edges.

use std::collections::VecDeque;

use crate::models::{Instance, Time};

/// Error types for critical path calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriticalPathError {
    CircularDependency,
}

impl std::fmt::Display for CriticalPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriticalPathError::CircularDependency => {
                write!(f, "Circular dependency detected in precedence graph")
            }
        }
    }
}

impl std::error::Error for CriticalPathError {}

/// Order jobs so every job comes before all of its successors (Kahn's algorithm).
pub fn topological_order(successors: &[Vec<usize>]) -> Result<Vec<usize>, CriticalPathError> {
    let n = successors.len();

    // In-degree = number of predecessors within the graph
    let mut in_degree = vec![0usize; n];
    for succs in successors {
        for &s in succs {
            if s < n {
                in_degree[s] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&job| in_degree[job] == 0).collect();
    let mut order: Vec<usize> = Vec::with_capacity(n);

    while let Some(job) = queue.pop_front() {
        order.push(job);
        for &s in &successors[job] {
            if s >= n {
                continue;
            }
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                queue.push_back(s);
            }
        }
    }

    if order.len() != n {
        return Err(CriticalPathError::CircularDependency);
    }

    Ok(order)
}

/// Longest path length from every job to the sink, inclusive of the job itself.
///
/// `CP[sink] = duration[sink]` and `CP[j] = duration[j] + max(CP[s])` over the
/// successors of `j`. A job without successors counts only its own duration.
/// Lengths saturate at `Time::MAX`.
pub fn critical_path_lengths(instance: &Instance) -> Result<Vec<Time>, CriticalPathError> {
    let order = topological_order(&instance.successors)?;
    let mut lengths: Vec<Time> = vec![0; instance.n_jobs];

    for &job in order.iter().rev() {
        let downstream = instance.successors[job]
            .iter()
            .filter(|&&s| s < instance.n_jobs)
            .map(|&s| lengths[s])
            .max()
            .unwrap_or(0);
        lengths[job] = instance.durations[job].saturating_add(downstream);
    }

    Ok(lengths)
}
