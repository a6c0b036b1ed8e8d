//! Packaging of a completed run into a [`Solution`].

use std::collections::HashMap;

use crate::models::{Instance, Solution, Time};

use super::state::ScheduleState;

/// Builds the result container from the final scheduler state.
pub struct SolutionBuilder<'a> {
    instance: &'a Instance,
    with_delay_indicator: bool,
    metadata: HashMap<String, String>,
}

impl<'a> SolutionBuilder<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            with_delay_indicator: false,
            metadata: HashMap::new(),
        }
    }

    /// Also compute the delay indicator.
    pub fn with_delay_indicator(mut self, enabled: bool) -> Self {
        self.with_delay_indicator = enabled;
        self
    }

    pub fn metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Build from a state in which every job has a finishing time.
    ///
    /// Returns the undefined solution if any job is still unscheduled.
    pub fn build(self, state: &ScheduleState) -> Solution {
        let finishing: Option<Vec<Time>> = state.finishing_time.iter().copied().collect();
        let Some(finishing) = finishing else {
            return Solution::undefined();
        };

        let makespan = finishing.iter().copied().max().unwrap_or(0);
        let delay_indicator = if self.with_delay_indicator {
            delay_indicator(self.instance, makespan)
        } else {
            None
        };

        let mut metadata = self.metadata;
        metadata.insert("transfers".to_string(), state.transfers.len().to_string());

        Solution {
            delay_indicator,
            makespan: Some(makespan),
            job_finishing_time: Some(finishing),
            resource_usage: Some(state.capacity.truncated(makespan)),
            transfers: state.transfers.clone(),
            algorithm_metadata: metadata,
        }
    }
}

/// Local duration bound minus makespan.
///
/// For every job except the dummy start, the bound is its own duration plus
/// the durations of its direct predecessors and successors. `None` when the
/// instance has no job besides the start.
pub fn delay_indicator(instance: &Instance, makespan: Time) -> Option<i64> {
    let neighbourhood = |job: usize| -> i64 {
        let preds: i64 = instance.predecessors[job]
            .iter()
            .map(|&p| instance.durations[p] as i64)
            .sum();
        let succs: i64 = instance.successors[job]
            .iter()
            .map(|&s| instance.durations[s] as i64)
            .sum();
        preds + succs + instance.durations[job] as i64
    };

    (1..instance.n_jobs)
        .map(neighbourhood)
        .max()
        .map(|bound| bound - makespan as i64)
}
