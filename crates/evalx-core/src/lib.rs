pub mod check;
pub mod dataset;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod exec;
pub mod exec_command;
pub mod failures;
pub mod oracle;
pub mod oracle_disk;
pub mod pass_at_k;
pub mod result_store;
pub mod types;

pub use check::{check_correctness, CheckOptions};
pub use dataset::{load_samples, DatasetKind, JsonlProblems, ProblemLoader};
pub use dispatch::{
    dispatch, plan_candidates, resolve_workers, DispatchOptions, Remaining, RemainingView,
    StallReport, Watchdog,
};
pub use error::{EvalError, EvalErrorKind};
pub use evaluate::{evaluate, EvaluateOptions, Evaluation, ResultSource};
pub use exec::{ExecError, ExecRequest, Executor, TimeLimits, TrustedOutput};
pub use exec_command::CommandExecutor;
pub use failures::{diff_files, diff_sets, failed_tasks, FailureDiff};
pub use oracle::{get_groundtruth, InMemoryOracleCache, OracleCache};
pub use oracle_disk::DiskOracleCache;
pub use pass_at_k::{estimate_pass_at_k, pass_at_k, PassAtK, DEFAULT_KS};
pub use result_store::{OnConflict, ResultDocument};
pub use types::{
    Candidate, CheckResult, Input, Oracle, OracleMap, Problem, ProblemSet, Sample, SampleBody,
    Status, SuiteResult, TaskEval,
};
