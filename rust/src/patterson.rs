//! Reader for project instances in the Patterson text format.
//!
//! ```text
//! n_jobs n_resources
//! a_1 ... a_R
//! d r_1 ... r_R n_succ s_1 ... s_n      (one line per job)
//! ```
//!
//! Successors are 1-based in the file and 0-based in the resulting
//! [`Instance`]. Blank lines are ignored. Transfer times are all zero.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::models::{Instance, InstanceError, Time, Units};

/// Parse a Patterson-format instance from text.
pub fn parse_patterson(text: &str) -> Result<Instance, InstanceError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (header_line, header) = lines.next().ok_or(InstanceError::Parse {
        line: 1,
        message: "missing header".to_string(),
    })?;
    let header: Vec<usize> = parse_numbers(header_line, header)?;
    let (n_jobs, n_resources) = match header.as_slice() {
        [n_jobs, n_resources] => (*n_jobs, *n_resources),
        _ => {
            return Err(InstanceError::Parse {
                line: header_line,
                message: format!("expected 2 header values, found {}", header.len()),
            })
        }
    };
    if n_jobs == 0 {
        return Err(InstanceError::Empty);
    }

    let (avail_line, avail) = lines.next().ok_or(InstanceError::Parse {
        line: header_line + 1,
        message: "missing resource availability".to_string(),
    })?;
    let resource_availability: Vec<Units> = parse_numbers(avail_line, avail)?;
    if resource_availability.len() != n_resources {
        return Err(InstanceError::Parse {
            line: avail_line,
            message: format!(
                "expected {} availability values, found {}",
                n_resources,
                resource_availability.len()
            ),
        });
    }

    let mut durations: Vec<Time> = Vec::with_capacity(n_jobs);
    let mut required_resources: Vec<Vec<Units>> = Vec::with_capacity(n_jobs);
    let mut successors: Vec<Vec<usize>> = Vec::with_capacity(n_jobs);

    for (line_no, line) in lines {
        if durations.len() == n_jobs {
            return Err(InstanceError::Parse {
                line: line_no,
                message: format!("more than {} job lines", n_jobs),
            });
        }
        let values: Vec<usize> = parse_numbers(line_no, line)?;
        let short = || InstanceError::Parse {
            line: line_no,
            message: "job line is truncated".to_string(),
        };

        let (&duration, rest) = values.split_first().ok_or_else(short)?;
        if rest.len() < n_resources + 1 {
            return Err(short());
        }
        let (demand, rest) = rest.split_at(n_resources);
        let (&n_succ, succs) = rest.split_first().ok_or_else(short)?;
        if succs.len() != n_succ {
            return Err(InstanceError::Parse {
                line: line_no,
                message: format!("declares {} successors, lists {}", n_succ, succs.len()),
            });
        }

        let job = durations.len();
        let mut job_successors = Vec::with_capacity(n_succ);
        for &s in succs {
            if s == 0 || s > n_jobs {
                return Err(InstanceError::JobOutOfRange { job, target: s });
            }
            job_successors.push(s - 1);
        }

        durations.push(to_u32(line_no, duration)?);
        required_resources.push(
            demand
                .iter()
                .map(|&units| to_u32(line_no, units))
                .collect::<Result<_, _>>()?,
        );
        successors.push(job_successors);
    }

    if durations.len() != n_jobs {
        return Err(InstanceError::LengthMismatch {
            field: "job lines",
            expected: n_jobs,
            actual: durations.len(),
        });
    }

    let instance = Instance::new(
        durations,
        successors,
        required_resources,
        resource_availability,
        None,
    );
    instance.validate()?;
    Ok(instance)
}

/// Read and parse a Patterson-format file.
pub fn read_patterson<P: AsRef<Path>>(path: P) -> Result<Instance, InstanceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| InstanceError::Io(format!("{}: {}", path.display(), e)))?;
    parse_patterson(&text)
}

fn parse_numbers<T: FromStr>(line_no: usize, line: &str) -> Result<Vec<T>, InstanceError> {
    line.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| InstanceError::Parse {
                line: line_no,
                message: format!("invalid integer '{}'", token),
            })
        })
        .collect()
}

fn to_u32(line_no: usize, value: usize) -> Result<u32, InstanceError> {
    u32::try_from(value).map_err(|_| InstanceError::Parse {
        line: line_no,
        message: format!("value {} out of range", value),
    })
}
