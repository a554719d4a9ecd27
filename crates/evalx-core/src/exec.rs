use crate::types::{Input, SuiteResult};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ExecRequest<'a> {
    pub program: &'a str,
    pub inputs: &'a [Input],
    pub entry_point: &'a str,
    pub expected: Option<&'a [JsonValue]>,
    pub atol: f64,
    pub ref_time: Option<&'a [f64]>,
    pub fast_check: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrustedOutput {
    pub outputs: Vec<JsonValue>,
    pub times: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecError {
    pub message: String,
}

impl ExecError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for ExecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExecError {}

/// Runs programs against input suites. Implementations must be callable from
/// many worker threads at once.
pub trait Executor: Send + Sync {
    /// Runs an untrusted candidate. Every outcome, including infrastructure
    /// faults, is reported as a status rather than an error.
    fn run(&self, request: &ExecRequest<'_>) -> SuiteResult;

    /// Runs a reference program and returns one output and one timing per input.
    fn trusted_exec(
        &self,
        program: &str,
        inputs: &[Input],
        entry_point: &str,
    ) -> Result<TrustedOutput, ExecError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeLimits {
    pub min_time_limit: f64,
    pub gt_time_limit_factor: f64,
    pub per_task_cap: Duration,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            min_time_limit: 1.0,
            gt_time_limit_factor: 4.0,
            per_task_cap: Duration::from_secs(60),
        }
    }
}

impl TimeLimits {
    /// Per-case limits in seconds, derived from the reference timings.
    pub fn case_limits(&self, ref_time: &[f64]) -> Vec<f64> {
        ref_time
            .iter()
            .map(|t| self.min_time_limit.max(self.gt_time_limit_factor * t))
            .collect()
    }

    /// Wall-clock budget for a whole suite run.
    pub fn suite_limit(&self, ref_time: Option<&[f64]>) -> Duration {
        let budget = match ref_time {
            Some(times) => {
                let total: f64 = self.case_limits(times).iter().sum();
                Duration::from_secs_f64(total.max(0.0)).min(self.per_task_cap)
            }
            None => self.per_task_cap,
        };
        budget + Duration::from_secs(1)
    }
}
