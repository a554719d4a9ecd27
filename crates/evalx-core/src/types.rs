use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// One argument tuple handed to the entry point.
pub type Input = Vec<JsonValue>;

pub type ProblemSet = BTreeMap<String, Problem>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Failed,
    Timeout,
    Error,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::Failed => "failed",
            Status::Timeout => "timeout",
            Status::Error => "error",
        }
    }
}

/// Outcome of one suite run, persisted as `[status, [bool, ...]]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuiteResult(pub Status, pub Vec<bool>);

impl SuiteResult {
    pub fn new(status: Status, details: Vec<bool>) -> Self {
        Self(status, details)
    }

    pub fn status(&self) -> Status {
        self.0
    }

    pub fn details(&self) -> &[bool] {
        &self.1
    }

    pub fn is_success(&self) -> bool {
        self.0 == Status::Success
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub task_id: String,
    pub prompt: String,
    pub canonical_solution: String,
    pub base_input: Vec<Input>,
    pub plus_input: Vec<Input>,
    pub entry_point: String,
    #[serde(default)]
    pub atol: f64,
}

impl Problem {
    pub fn reference_program(&self) -> String {
        format!("{}{}", self.prompt, self.canonical_solution)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Oracle {
    pub base: Vec<JsonValue>,
    pub base_time: Vec<f64>,
    pub plus: Vec<JsonValue>,
    pub plus_time: Vec<f64>,
}

pub type OracleMap = BTreeMap<String, Oracle>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleBody {
    Solution(String),
    Completion(String),
}

/// A candidate as read from the samples source, before dispatch numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub task_id: String,
    pub body: SampleBody,
    pub identifier: String,
}

impl Sample {
    pub fn program(&self, problem: &Problem) -> String {
        match &self.body {
            SampleBody::Solution(text) => text.clone(),
            SampleBody::Completion(text) => format!("{}{}", problem.prompt, text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub task_id: String,
    pub completion_id: usize,
    pub solution: String,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub completion_id: usize,
    pub task_id: String,
    pub identifier: String,
    pub base: SuiteResult,
    pub plus: Option<SuiteResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawTaskEval")]
pub struct TaskEval {
    pub nfiles: usize,
    pub base: Vec<SuiteResult>,
    pub plus: Vec<SuiteResult>,
}

// Older documents listed the evaluated files instead of counting them.
#[derive(Deserialize)]
struct RawTaskEval {
    nfiles: Option<usize>,
    #[serde(default)]
    files: Option<Vec<JsonValue>>,
    base: Vec<SuiteResult>,
    #[serde(default)]
    plus: Vec<SuiteResult>,
}

impl From<RawTaskEval> for TaskEval {
    fn from(raw: RawTaskEval) -> Self {
        let nfiles = raw
            .nfiles
            .or_else(|| raw.files.as_ref().map(Vec::len))
            .unwrap_or(raw.base.len());
        Self {
            nfiles,
            base: raw.base,
            plus: raw.plus,
        }
    }
}
