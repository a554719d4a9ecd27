#![allow(dead_code)]

use evalx_core::{
    EvalError, ExecError, ExecRequest, Executor, Input, Problem, ProblemLoader, ProblemSet,
    Status, SuiteResult, TrustedOutput,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Stand-in for the execution harness. Reference programs echo their inputs;
/// candidate behaviour is driven by markers in the program text:
/// `fails-base`, `fails-plus`, `sleep=<ms>;`, `panic`.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    pub trusted_calls: AtomicUsize,
    pub runs: AtomicUsize,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trusted_calls(&self) -> usize {
        self.trusted_calls.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

fn is_plus_suite(inputs: &[Input]) -> bool {
    inputs
        .iter()
        .any(|input| input.first() == Some(&json!("plus")))
}

fn sleep_marker(program: &str) -> Option<u64> {
    let start = program.find("sleep=")? + "sleep=".len();
    let end = program[start..].find(';')? + start;
    program[start..end].parse().ok()
}

impl Executor for ScriptedExecutor {
    fn run(&self, request: &ExecRequest<'_>) -> SuiteResult {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(ms) = sleep_marker(request.program) {
            thread::sleep(Duration::from_millis(ms));
        }
        if request.program.contains("panic") {
            panic!("candidate crashed the checker");
        }

        let echoed: Vec<Value> = request
            .inputs
            .iter()
            .map(|input| Value::Array(input.clone()))
            .collect();
        if request.expected != Some(echoed.as_slice()) {
            return SuiteResult::new(Status::Error, Vec::new());
        }

        let plus = is_plus_suite(request.inputs);
        let failing = (!plus && request.program.contains("fails-base"))
            || (plus && request.program.contains("fails-plus"));
        if failing {
            let details = if request.fast_check {
                vec![false]
            } else {
                vec![false; request.inputs.len()]
            };
            return SuiteResult::new(Status::Failed, details);
        }
        SuiteResult::new(Status::Success, vec![true; request.inputs.len()])
    }

    fn trusted_exec(
        &self,
        program: &str,
        inputs: &[Input],
        _entry_point: &str,
    ) -> Result<TrustedOutput, ExecError> {
        self.trusted_calls.fetch_add(1, Ordering::SeqCst);
        if program.contains("BROKEN") {
            return Err(ExecError::new("reference raised"));
        }
        if program.contains("SHORT") {
            return Ok(TrustedOutput {
                outputs: Vec::new(),
                times: Vec::new(),
            });
        }
        Ok(TrustedOutput {
            outputs: inputs
                .iter()
                .map(|input| Value::Array(input.clone()))
                .collect(),
            times: vec![0.25; inputs.len()],
        })
    }
}

pub fn problem(task_id: &str) -> Problem {
    Problem {
        task_id: task_id.to_string(),
        prompt: "def f(x):\n".to_string(),
        canonical_solution: "    return x\n".to_string(),
        base_input: vec![vec![json!(1)], vec![json!(2)]],
        plus_input: vec![vec![json!("plus"), json!(3)], vec![json!("plus"), json!(4.5)]],
        entry_point: "f".to_string(),
        atol: 0.0,
    }
}

pub fn problem_set(task_ids: &[&str]) -> ProblemSet {
    task_ids
        .iter()
        .map(|task_id| (task_id.to_string(), problem(task_id)))
        .collect()
}

pub struct FixedProblems {
    pub problems: ProblemSet,
    pub hash: String,
}

impl FixedProblems {
    pub fn new(task_ids: &[&str]) -> Self {
        Self {
            problems: problem_set(task_ids),
            hash: format!("fixture-{}", task_ids.join("-")),
        }
    }
}

impl ProblemLoader for FixedProblems {
    fn load(&self) -> Result<(ProblemSet, String), EvalError> {
        Ok((self.problems.clone(), self.hash.clone()))
    }
}

pub fn sample_line(task_id: &str, completion: &str) -> String {
    json!({ "task_id": task_id, "completion": completion }).to_string()
}
