//! Configuration types for the scheduling engine.

use pyo3::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Priority rule used to pick the next job among the eligible set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionRule {
    /// Minimum critical path length first.
    CriticalPath,
    /// Maximum own-plus-successor duration first.
    DownstreamWorkload,
}

impl SelectionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalPath => "critical_path",
            Self::DownstreamWorkload => "downstream_workload",
        }
    }
}

impl FromStr for SelectionRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical_path" => Ok(Self::CriticalPath),
            "downstream_workload" => Ok(Self::DownstreamWorkload),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule deciding which finished jobs supply resources to a starting job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferRule {
    /// Per resource type, closest sources (smallest transfer time) first.
    EarliestTransfer,
    /// Largest deficit first, sources with the smallest idle gap first.
    MinIdleGap,
}

impl TransferRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EarliestTransfer => "earliest_transfer",
            Self::MinIdleGap => "min_idle_gap",
        }
    }
}

impl FromStr for TransferRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earliest_transfer" => Ok(Self::EarliestTransfer),
            "min_idle_gap" => Ok(Self::MinIdleGap),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TransferRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for job selection, resource transfer and run limits.
#[pyclass]
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Job selection rule: "critical_path" or "downstream_workload"
    #[pyo3(get, set)]
    pub selection_rule: String,
    /// Transfer policy: "earliest_transfer" or "min_idle_gap"
    #[pyo3(get, set)]
    pub transfer_policy: String,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Time at which an unfinished run fails (None = derived from the instance)
    #[pyo3(get, set)]
    pub horizon: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            selection_rule: SelectionRule::CriticalPath.as_str().to_string(),
            transfer_policy: TransferRule::EarliestTransfer.as_str().to_string(),
            verbosity: 0,
            horizon: None,
        }
    }
}

impl SchedulerConfig {
    /// Build a config from typed rules.
    pub fn with_rules(selection: SelectionRule, transfer: TransferRule) -> Self {
        Self {
            selection_rule: selection.as_str().to_string(),
            transfer_policy: transfer.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn parsed_selection_rule(&self) -> Result<SelectionRule, String> {
        self.selection_rule.parse()
    }

    pub fn parsed_transfer_rule(&self) -> Result<TransferRule, String> {
        self.transfer_policy.parse()
    }
}

#[pymethods]
impl SchedulerConfig {
    #[new]
    #[pyo3(signature = (
        selection_rule=None,
        transfer_policy=None,
        verbosity=None,
        horizon=None
    ))]
    fn new(
        selection_rule: Option<String>,
        transfer_policy: Option<String>,
        verbosity: Option<u8>,
        horizon: Option<u32>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            selection_rule: selection_rule.unwrap_or(defaults.selection_rule),
            transfer_policy: transfer_policy.unwrap_or(defaults.transfer_policy),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            horizon,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulerConfig(selection_rule={:?}, transfer_policy={:?}, horizon={:?})",
            self.selection_rule, self.transfer_policy, self.horizon
        )
    }
}
