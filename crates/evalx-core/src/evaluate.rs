use crate::check::CheckOptions;
use crate::dataset::{load_samples, ProblemLoader};
use crate::dispatch::{dispatch, plan_candidates, DispatchOptions, DEFAULT_WATCHDOG_INTERVAL};
use crate::error::EvalError;
use crate::exec::Executor;
use crate::oracle::{get_groundtruth, OracleCache};
use crate::result_store::{self, OnConflict, ResultDocument};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct EvaluateOptions {
    pub samples: PathBuf,
    pub workers: usize,
    pub base_only: bool,
    pub fast_check: bool,
    pub on_conflict: OnConflict,
    pub watchdog_interval: Duration,
    pub sample_extension: String,
}

impl EvaluateOptions {
    pub fn new(samples: impl AsRef<Path>) -> Self {
        Self {
            samples: samples.as_ref().to_path_buf(),
            workers: 1,
            base_only: false,
            fast_check: true,
            on_conflict: OnConflict::Skip,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            sample_extension: "py".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Cached,
    Computed,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub path: PathBuf,
    pub source: ResultSource,
    pub backup: Option<PathBuf>,
    pub document: ResultDocument,
}

pub fn evaluate<L, C>(
    options: &EvaluateOptions,
    loader: &L,
    executor: Arc<dyn Executor>,
    cache: &C,
) -> Result<Evaluation, EvalError>
where
    L: ProblemLoader + ?Sized,
    C: OracleCache + ?Sized,
{
    let path = result_store::result_path(&options.samples)?;
    let exists = path.is_file();

    if exists {
        match options.on_conflict {
            OnConflict::Skip => {
                info!(path = %path.display(), "loading existing results");
                let document = result_store::load(&path)?;
                return Ok(Evaluation {
                    path,
                    source: ResultSource::Cached,
                    backup: None,
                    document,
                });
            }
            OnConflict::Fail => {
                return Err(EvalError::config(format!(
                    "{} already exists",
                    path.display()
                )));
            }
            OnConflict::BackupAndOverwrite => {}
        }
    }

    let (problems, hash) = loader.load()?;
    let oracles = get_groundtruth(&problems, &hash, executor.as_ref(), cache)?;

    info!(samples = %options.samples.display(), "reading samples");
    let samples = load_samples(&options.samples, &options.sample_extension)?;
    let candidates = plan_candidates(&problems, samples)?;

    let dispatch_options = DispatchOptions {
        workers: options.workers,
        check: CheckOptions {
            base_only: options.base_only,
            fast_check: options.fast_check,
        },
        watchdog_interval: options.watchdog_interval,
        stall_reports: None,
    };
    let eval = dispatch(
        Arc::new(problems),
        Arc::new(oracles),
        candidates,
        executor,
        &dispatch_options,
    )?;

    let document = ResultDocument {
        date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
        hash,
        eval,
    };

    let backup = if path.is_file() {
        let target = result_store::backup(&path)?;
        info!(from = %path.display(), to = %target.display(), "backed up previous results");
        Some(target)
    } else {
        None
    };
    result_store::save(&path, &document)?;
    info!(path = %path.display(), "results written");

    Ok(Evaluation {
        path,
        source: ResultSource::Computed,
        backup,
        document,
    })
}
