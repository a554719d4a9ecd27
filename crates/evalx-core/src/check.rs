use crate::exec::{ExecRequest, Executor};
use crate::types::{CheckResult, Oracle, Problem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    pub base_only: bool,
    pub fast_check: bool,
}

/// Checks one candidate against the base suite and, unless base-only, the plus suite.
pub fn check_correctness<E>(
    completion_id: usize,
    problem: &Problem,
    solution: &str,
    oracle: &Oracle,
    options: CheckOptions,
    identifier: &str,
    executor: &E,
) -> CheckResult
where
    E: Executor + ?Sized,
{
    let base = executor.run(&ExecRequest {
        program: solution,
        inputs: &problem.base_input,
        entry_point: &problem.entry_point,
        expected: Some(&oracle.base),
        atol: problem.atol,
        ref_time: Some(&oracle.base_time),
        fast_check: options.fast_check,
    });

    let plus = if options.base_only {
        None
    } else {
        Some(executor.run(&ExecRequest {
            program: solution,
            inputs: &problem.plus_input,
            entry_point: &problem.entry_point,
            expected: Some(&oracle.plus),
            atol: problem.atol,
            ref_time: Some(&oracle.plus_time),
            fast_check: options.fast_check,
        }))
    };

    CheckResult {
        completion_id,
        task_id: problem.task_id.clone(),
        identifier: identifier.to_string(),
        base,
        plus,
    }
}
