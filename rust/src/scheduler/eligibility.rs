//! Eligibility of unscheduled jobs at the current time.

use crate::models::Instance;

use super::state::ScheduleState;

/// Unscheduled jobs whose predecessors are all completed and whose demand fits
/// the remaining capacity at the current time, sorted by index.
pub fn eligible_jobs(instance: &Instance, state: &ScheduleState) -> Vec<usize> {
    let now = state.current_time;
    (0..instance.n_jobs)
        .filter(|&job| !state.is_scheduled(job))
        .filter(|&job| {
            instance.predecessors[job]
                .iter()
                .all(|&p| state.is_completed(p))
        })
        .filter(|&job| state.capacity.fits(&instance.required_resources[job], now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 -> {1, 2} -> 3
    fn instance() -> Instance {
        Instance::new(
            vec![0, 2, 3, 0],
            vec![vec![1, 2], vec![3], vec![3], vec![]],
            vec![vec![0], vec![2], vec![1], vec![0]],
            vec![2],
            None,
        )
    }

    #[test]
    fn test_successors_of_start_eligible_at_zero() {
        let inst = instance();
        let state = ScheduleState::new(&inst, 10);
        assert_eq!(eligible_jobs(&inst, &state), vec![1, 2]);
    }

    #[test]
    fn test_waits_for_all_predecessors() {
        let inst = instance();
        let mut state = ScheduleState::new(&inst, 10);
        state.current_time = 1;
        state.commit(1, 2, &inst.required_resources[1]);

        // 1 finishes at 3, still active at t = 3
        state.current_time = 3;
        let _ = state.complete_finished();
        assert!(!eligible_jobs(&inst, &state).contains(&3));

        state.current_time = 4;
        let _ = state.complete_finished();
        // 2 is still unscheduled, so 3 is not eligible yet
        assert_eq!(eligible_jobs(&inst, &state), vec![2]);
    }

    #[test]
    fn test_capacity_excludes_jobs() {
        let inst = instance();
        let mut state = ScheduleState::new(&inst, 10);
        state.current_time = 1;
        state.commit(1, 2, &inst.required_resources[1]);

        // Job 2 needs 1 unit, none left in [1, 3)
        assert!(eligible_jobs(&inst, &state).is_empty());
        state.current_time = 3;
        assert_eq!(eligible_jobs(&inst, &state), vec![2]);
    }
}
