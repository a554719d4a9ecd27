use crate::check::{check_correctness, CheckOptions};
use crate::error::EvalError;
use crate::exec::Executor;
use crate::types::{
    Candidate, CheckResult, OracleMap, ProblemSet, Sample, Status, SuiteResult, TaskEval,
};
use rayon::ThreadPoolBuilder;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_secs(10);

pub fn resolve_workers(explicit: Option<usize>) -> Result<usize, EvalError> {
    match explicit {
        Some(0) => Err(EvalError::config("--parallel must be >= 1")),
        Some(workers) => Ok(workers),
        None => {
            let cores = thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            Ok((cores / 2).max(1))
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub workers: usize,
    pub check: CheckOptions,
    pub watchdog_interval: Duration,
    /// Receives a copy of every stall the watchdog logs.
    pub stall_reports: Option<Sender<StallReport>>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            check: CheckOptions::default(),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            stall_reports: None,
        }
    }
}

/// Identifiers of submitted checks that have not completed yet.
#[derive(Debug, Clone, Default)]
pub struct Remaining {
    ids: Arc<Mutex<BTreeSet<String>>>,
}

impl Remaining {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, identifier: &str) -> bool {
        lock(&self.ids).insert(identifier.to_string())
    }

    pub fn remove(&self, identifier: &str) -> bool {
        lock(&self.ids).remove(identifier)
    }

    pub fn view(&self) -> RemainingView {
        RemainingView {
            ids: Arc::clone(&self.ids),
        }
    }
}

/// Read-only handle on a [`Remaining`] set.
#[derive(Debug, Clone)]
pub struct RemainingView {
    ids: Arc<Mutex<BTreeSet<String>>>,
}

impl RemainingView {
    pub fn len(&self) -> usize {
        lock(&self.ids).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<String> {
        lock(&self.ids).iter().cloned().collect()
    }
}

fn lock(ids: &Mutex<BTreeSet<String>>) -> MutexGuard<'_, BTreeSet<String>> {
    // The set stays consistent even if a holder panicked mid-update.
    ids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallReport {
    pub outstanding: Vec<String>,
}

pub struct Watchdog {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn spawn(
        view: RemainingView,
        interval: Duration,
        reports: Option<Sender<StallReport>>,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::spawn(move || watch(view, interval, stop_rx, reports));
        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(
    view: RemainingView,
    interval: Duration,
    stop: Receiver<()>,
    reports: Option<Sender<StallReport>>,
) {
    let mut last_size = view.len();
    while last_size > 0 {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
        let outstanding = view.snapshot();
        if !outstanding.is_empty() && outstanding.len() == last_size {
            warn!(
                stalled_secs = interval.as_secs_f64(),
                remaining = outstanding.len(),
                identifiers = ?outstanding,
                "no check completed during the last interval"
            );
            if let Some(reports) = &reports {
                let _ = reports.send(StallReport {
                    outstanding: outstanding.clone(),
                });
            }
        }
        last_size = outstanding.len();
    }
}

/// Numbers samples per task in arrival order and validates the candidate set
/// against the problems before anything is dispatched.
pub fn plan_candidates<I>(problems: &ProblemSet, samples: I) -> Result<Vec<Candidate>, EvalError>
where
    I: IntoIterator<Item = Result<Sample, EvalError>>,
{
    let mut completion_ids: HashMap<String, usize> = HashMap::new();
    let mut identifiers = HashSet::new();
    let mut candidates = Vec::new();

    for sample in samples {
        let sample = sample?;
        let Some(problem) = problems.get(&sample.task_id) else {
            return Err(EvalError::config(format!(
                "sample {} refers to unknown task {}",
                sample.identifier, sample.task_id
            )));
        };
        let next_id = completion_ids.entry(sample.task_id.clone()).or_insert(0);
        let completion_id = *next_id;
        *next_id += 1;

        identifiers.insert(sample.identifier.clone());
        candidates.push(Candidate {
            task_id: sample.task_id.clone(),
            completion_id,
            solution: sample.program(problem),
            identifier: sample.identifier,
        });
    }

    if candidates.len() != identifiers.len() {
        return Err(EvalError::config(format!(
            "{} samples but only {} distinct identifiers",
            candidates.len(),
            identifiers.len()
        )));
    }
    if completion_ids.len() != problems.len() {
        let missing: Vec<&str> = problems
            .keys()
            .filter(|task_id| !completion_ids.contains_key(*task_id))
            .map(String::as_str)
            .collect();
        return Err(EvalError::config(format!(
            "missing samples for {} task(s): {}",
            missing.len(),
            missing.join(", ")
        )));
    }

    Ok(candidates)
}

/// Runs every candidate on a bounded pool and returns per-task results
/// ordered by completion index.
pub fn dispatch(
    problems: Arc<ProblemSet>,
    oracles: Arc<OracleMap>,
    candidates: Vec<Candidate>,
    executor: Arc<dyn Executor>,
    options: &DispatchOptions,
) -> Result<BTreeMap<String, TaskEval>, EvalError> {
    for candidate in &candidates {
        if !problems.contains_key(&candidate.task_id) {
            return Err(EvalError::config(format!(
                "candidate {} refers to unknown task {}",
                candidate.identifier, candidate.task_id
            )));
        }
        if !oracles.contains_key(&candidate.task_id) {
            return Err(EvalError::oracle(format!(
                "no expected outputs for {}",
                candidate.task_id
            )));
        }
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .build()
        .map_err(|err| EvalError::config(format!("build worker pool: {err}")))?;

    let total = candidates.len();
    let check_options = options.check;
    let remaining = Remaining::new();
    let (tx, rx) = mpsc::channel::<CheckResult>();

    info!(
        candidates = total,
        workers = options.workers.max(1),
        base_only = check_options.base_only,
        fast_check = check_options.fast_check,
        "dispatching checks"
    );

    for candidate in candidates {
        remaining.insert(&candidate.identifier);
        let problems = Arc::clone(&problems);
        let oracles = Arc::clone(&oracles);
        let executor = Arc::clone(&executor);
        let tx = tx.clone();
        pool.spawn(move || {
            let result = run_guarded(
                &candidate,
                &problems,
                &oracles,
                executor.as_ref(),
                check_options,
            );
            let _ = tx.send(result);
        });
    }
    drop(tx);

    let watchdog = Watchdog::spawn(
        remaining.view(),
        options.watchdog_interval,
        options.stall_reports.clone(),
    );

    let mut grouped: HashMap<String, Vec<CheckResult>> = HashMap::new();
    for done in 0..total {
        let result = rx.recv().map_err(|_| {
            EvalError::config(format!("worker pool stopped after {done} of {total} checks"))
        })?;
        remaining.remove(&result.identifier);
        debug!(
            task_id = %result.task_id,
            completion_id = result.completion_id,
            base = result.base.status().as_str(),
            plus = result.plus.as_ref().map(|plus| plus.status().as_str()),
            "check finished"
        );
        grouped
            .entry(result.task_id.clone())
            .or_default()
            .push(result);
    }
    watchdog.stop();

    let eval = aggregate(grouped, check_options.base_only);
    let counted: usize = eval.values().map(|task| task.nfiles).sum();
    if counted != total {
        return Err(EvalError::config(format!(
            "aggregated {counted} results for {total} submitted candidates"
        )));
    }
    info!(tasks = eval.len(), candidates = total, "all checks finished");
    Ok(eval)
}

fn run_guarded(
    candidate: &Candidate,
    problems: &ProblemSet,
    oracles: &OracleMap,
    executor: &dyn Executor,
    options: CheckOptions,
) -> CheckResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let problem = &problems[&candidate.task_id];
        let oracle = &oracles[&candidate.task_id];
        check_correctness(
            candidate.completion_id,
            problem,
            &candidate.solution,
            oracle,
            options,
            &candidate.identifier,
            executor,
        )
    }));

    outcome.unwrap_or_else(|_| {
        error!(identifier = %candidate.identifier, "check panicked");
        let errored = || SuiteResult::new(Status::Error, Vec::new());
        CheckResult {
            completion_id: candidate.completion_id,
            task_id: candidate.task_id.clone(),
            identifier: candidate.identifier.clone(),
            base: errored(),
            plus: (!options.base_only).then(errored),
        }
    })
}

/// Orders each task's results by completion index, never by arrival.
pub fn aggregate(
    grouped: HashMap<String, Vec<CheckResult>>,
    base_only: bool,
) -> BTreeMap<String, TaskEval> {
    grouped
        .into_iter()
        .map(|(task_id, mut results)| {
            results.sort_by_key(|result| result.completion_id);
            let base = results.iter().map(|result| result.base.clone()).collect();
            let plus = if base_only {
                Vec::new()
            } else {
                results
                    .iter()
                    .filter_map(|result| result.plus.clone())
                    .collect()
            };
            (
                task_id,
                TaskEval {
                    nfiles: results.len(),
                    base,
                    plus,
                },
            )
        })
        .collect()
}
