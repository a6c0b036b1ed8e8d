//! Merging several single-project instances into one multi-project instance.
//!
//! Jobs of project `p` are shifted past the jobs of every earlier project and
//! sit between a shared start job (index 0) and a shared sink (the last
//! index). Each project's own start job follows the shared start and each
//! project's own sink precedes the shared sink. Projects with fewer resource
//! types are padded with zero requirements. Transfer times are all zero.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Instance, InstanceError, Time, Units};

/// Range from which a shared availability is drawn: `[low, high)` per resource type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AvailabilityBounds {
    /// `max(largest single requirement, smallest project availability)`
    pub low: Vec<Units>,
    /// Sum over projects of `availability - largest requirement`
    pub high: Vec<Units>,
}

impl AvailabilityBounds {
    /// Uniform draw per resource type; `low` where the range is empty.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Vec<Units> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(&low, &high)| {
                if high > low {
                    rng.random_range(low..high)
                } else {
                    low
                }
            })
            .collect()
    }
}

/// Number of resource types after padding.
fn merged_resources(projects: &[Instance]) -> usize {
    projects.iter().map(|p| p.n_resources).max().unwrap_or(0)
}

fn padded(row: &[Units], n_resources: usize) -> Vec<Units> {
    let mut row = row.to_vec();
    row.resize(n_resources, 0);
    row
}

fn validate_all(projects: &[Instance]) -> Result<(), InstanceError> {
    if projects.is_empty() {
        return Err(InstanceError::Empty);
    }
    projects.iter().try_for_each(Instance::validate)
}

/// Availability bounds over the padded resource types of `projects`.
pub fn availability_bounds(projects: &[Instance]) -> Result<AvailabilityBounds, InstanceError> {
    validate_all(projects)?;
    let n_resources = merged_resources(projects);

    let mut max_required = vec![0; n_resources];
    let mut min_available = vec![Units::MAX; n_resources];
    let mut slack = vec![0i64; n_resources];

    for project in projects {
        let available = padded(&project.resource_availability, n_resources);
        let mut project_max = vec![0; n_resources];
        for req in &project.required_resources {
            for (max, &units) in project_max.iter_mut().zip(&padded(req, n_resources)) {
                *max = (*max).max(units);
            }
        }
        for r in 0..n_resources {
            max_required[r] = max_required[r].max(project_max[r]);
            min_available[r] = min_available[r].min(available[r]);
            slack[r] += available[r] as i64 - project_max[r] as i64;
        }
    }

    let low = max_required
        .iter()
        .zip(&min_available)
        .map(|(&req, &avail)| req.max(avail))
        .collect();
    let high = slack
        .iter()
        .map(|&s| s.clamp(0, Units::MAX as i64) as Units)
        .collect();

    Ok(AvailabilityBounds { low, high })
}

/// Merge `projects` into one instance with the given shared availability.
pub fn merge_projects(
    projects: &[Instance],
    availability: Vec<Units>,
) -> Result<Instance, InstanceError> {
    validate_all(projects)?;
    let n_resources = merged_resources(projects);
    if availability.len() != n_resources {
        return Err(InstanceError::LengthMismatch {
            field: "resource_availability",
            expected: n_resources,
            actual: availability.len(),
        });
    }

    let n_jobs = projects.iter().map(|p| p.n_jobs).sum::<usize>() + 2;
    let sink = n_jobs - 1;

    let mut durations: Vec<Time> = Vec::with_capacity(n_jobs);
    let mut successors: Vec<Vec<usize>> = Vec::with_capacity(n_jobs);
    let mut required_resources: Vec<Vec<Units>> = Vec::with_capacity(n_jobs);

    durations.push(0);
    successors.push(Vec::with_capacity(projects.len()));
    required_resources.push(vec![0; n_resources]);

    let mut offset = 1;
    for project in projects {
        successors[0].push(offset);
        let local_sink = project.sink();
        for job in 0..project.n_jobs {
            durations.push(project.durations[job]);
            required_resources.push(padded(&project.required_resources[job], n_resources));

            let mut succs: Vec<usize> = project.successors[job].iter().map(|&s| s + offset).collect();
            if job == local_sink {
                succs.push(sink);
            }
            successors.push(succs);
        }
        offset += project.n_jobs;
    }

    durations.push(0);
    successors.push(Vec::new());
    required_resources.push(vec![0; n_resources]);

    let merged = Instance::new(durations, successors, required_resources, availability, None);
    merged.validate()?;
    Ok(merged)
}

/// Merge `projects`, drawing the shared availability from [`availability_bounds`].
pub fn merge_projects_seeded(projects: &[Instance], seed: u64) -> Result<Instance, InstanceError> {
    let bounds = availability_bounds(projects)?;
    let mut rng = StdRng::seed_from_u64(seed);
    merge_projects(projects, bounds.draw(&mut rng))
}
