use crate::error::EvalError;
use crate::exec::{Executor, TrustedOutput};
use crate::types::{Input, Oracle, OracleMap, Problem, ProblemSet};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

pub trait OracleCache {
    fn get(&self, key: &str) -> Result<Option<OracleMap>, EvalError>;
    fn put(&self, key: &str, oracles: &OracleMap) -> Result<(), EvalError>;
}

#[derive(Debug, Default)]
pub struct InMemoryOracleCache {
    entries: Mutex<HashMap<String, OracleMap>>,
}

impl InMemoryOracleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OracleCache for InMemoryOracleCache {
    fn get(&self, key: &str) -> Result<Option<OracleMap>, EvalError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| EvalError::oracle("oracle cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, oracles: &OracleMap) -> Result<(), EvalError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| EvalError::oracle("oracle cache lock poisoned"))?;
        entries.insert(key.to_string(), oracles.clone());
        Ok(())
    }
}

/// Returns the cached oracle for `hash`, computing and storing it on a miss.
pub fn get_groundtruth<E, C>(
    problems: &ProblemSet,
    hash: &str,
    executor: &E,
    cache: &C,
) -> Result<OracleMap, EvalError>
where
    E: Executor + ?Sized,
    C: OracleCache + ?Sized,
{
    if let Some(oracles) = cache.get(hash)? {
        info!(hash, tasks = oracles.len(), "loaded expected outputs from cache");
        return Ok(oracles);
    }

    info!(hash, tasks = problems.len(), "computing expected outputs");
    let started = Instant::now();
    let oracles = compute_oracles(problems, executor)?;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "expected outputs computed"
    );

    cache.put(hash, &oracles)?;
    Ok(oracles)
}

pub fn compute_oracles<E>(problems: &ProblemSet, executor: &E) -> Result<OracleMap, EvalError>
where
    E: Executor + ?Sized,
{
    let mut oracles = OracleMap::new();
    for (task_id, problem) in problems {
        let base = run_reference(problem, &problem.base_input, "base", executor)?;
        let plus = run_reference(problem, &problem.plus_input, "plus", executor)?;
        oracles.insert(
            task_id.clone(),
            Oracle {
                base: base.outputs,
                base_time: base.times,
                plus: plus.outputs,
                plus_time: plus.times,
            },
        );
    }
    Ok(oracles)
}

fn run_reference<E>(
    problem: &Problem,
    inputs: &[Input],
    suite: &str,
    executor: &E,
) -> Result<TrustedOutput, EvalError>
where
    E: Executor + ?Sized,
{
    let output = executor
        .trusted_exec(&problem.reference_program(), inputs, &problem.entry_point)
        .map_err(|err| {
            EvalError::oracle(format!(
                "canonical solution of {} failed on {suite} inputs: {err}",
                problem.task_id
            ))
        })?;
    if output.outputs.len() != inputs.len() || output.times.len() != inputs.len() {
        return Err(EvalError::oracle(format!(
            "canonical solution of {} returned {} outputs and {} timings for {} {suite} inputs",
            problem.task_id,
            output.outputs.len(),
            output.times.len(),
            inputs.len()
        )));
    }
    Ok(output)
}
