use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use evalx_core::failures::write_failed_cases;
use evalx_core::{
    diff_files, evaluate, pass_at_k, resolve_workers, result_store, CommandExecutor, DatasetKind,
    DiskOracleCache, EvaluateOptions, Evaluation, JsonlProblems, OnConflict, PassAtK,
    ResultSource, DEFAULT_KS,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "evalx")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, value_enum, default_value = "json", global = true)]
    format: OutputFormat,

    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    Evaluate(EvaluateArgs),
    FailedCases(FailedCasesArgs),
    DiffFailures(DiffFailuresArgs),
}

#[derive(Args)]
struct EvaluateArgs {
    #[arg(long)]
    dataset: String,

    #[arg(long)]
    samples: PathBuf,

    #[arg(long)]
    base_only: bool,

    #[arg(long)]
    parallel: Option<usize>,

    #[arg(long = "i-just-wanna-run", visible_alias = "force")]
    force: bool,

    #[arg(long, value_enum)]
    on_conflict: Option<ConflictPolicy>,

    /// Evaluate every input instead of stopping at the first failure.
    #[arg(long)]
    full: bool,

    #[arg(long, env = "EVALX_HUMANEVAL_PATH")]
    problems: Option<PathBuf>,

    #[arg(long, env = "EVALX_CACHE_DIR", default_value = ".evalx-cache")]
    cache_dir: PathBuf,

    #[arg(long, env = "EVALX_EXEC", default_value = "evalx-exec")]
    exec: PathBuf,

    #[arg(long = "exec-arg", allow_hyphen_values = true)]
    exec_args: Vec<String>,

    #[arg(long, default_value_t = 10)]
    watchdog_secs: u64,

    #[arg(long, default_value = "py")]
    sample_ext: String,
}

#[derive(Args)]
struct FailedCasesArgs {
    #[arg(long)]
    json: PathBuf,

    #[arg(long = "prefix")]
    prefix: String,
}

#[derive(Args)]
struct DiffFailuresArgs {
    #[arg(long)]
    file1: PathBuf,

    #[arg(long)]
    file2: PathBuf,

    #[arg(long = "prefix")]
    prefix: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Clone, Copy, ValueEnum)]
enum ConflictPolicy {
    Skip,
    #[value(alias = "backup")]
    BackupAndOverwrite,
    Fail,
}

impl From<ConflictPolicy> for OnConflict {
    fn from(policy: ConflictPolicy) -> Self {
        match policy {
            ConflictPolicy::Skip => OnConflict::Skip,
            ConflictPolicy::BackupAndOverwrite => OnConflict::BackupAndOverwrite,
            ConflictPolicy::Fail => OnConflict::Fail,
        }
    }
}

#[derive(Serialize)]
struct EvaluateSummary {
    dataset: String,
    result_path: String,
    source: ResultSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup: Option<String>,
    hash: String,
    tasks: usize,
    candidates: usize,
    pass_at_k: PassAtK,
}

#[derive(Serialize)]
struct FailedCasesSummary {
    output: String,
    failed: Vec<String>,
}

#[derive(Serialize)]
struct DiffSummary {
    f1_not_f2_path: String,
    f2_not_f1_path: String,
    f1_not_f2: Vec<String>,
    f2_not_f1: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("tool error: {err:#}");
            2
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Evaluate(args) => {
            let summary = run_evaluate(args)?;
            let text = format_pass_at_k(&summary);
            emit(&cli, &summary, &text)
        }
        Command::FailedCases(args) => {
            let document = result_store::load(&args.json)?;
            let output = write_failed_cases(&document, &args.prefix)?;
            let summary = FailedCasesSummary {
                output: output.to_string_lossy().to_string(),
                failed: evalx_core::failed_tasks(&document),
            };
            let text = format!("failed={} output={}", summary.failed.len(), summary.output);
            emit(&cli, &summary, &text)
        }
        Command::DiffFailures(args) => {
            let outputs = diff_files(&args.file1, &args.file2, &args.prefix)?;
            let summary = DiffSummary {
                f1_not_f2_path: outputs.left_only_path.to_string_lossy().to_string(),
                f2_not_f1_path: outputs.right_only_path.to_string_lossy().to_string(),
                f1_not_f2: outputs.diff.left_only.into_iter().collect(),
                f2_not_f1: outputs.diff.right_only.into_iter().collect(),
            };
            let text = format!(
                "f1_not_f2={} f2_not_f1={}",
                summary.f1_not_f2.len(),
                summary.f2_not_f1.len()
            );
            emit(&cli, &summary, &text)
        }
    }
}

fn run_evaluate(args: &EvaluateArgs) -> Result<EvaluateSummary> {
    let dataset: DatasetKind = args.dataset.parse()?;
    let workers = resolve_workers(args.parallel)?;
    let on_conflict = match (args.on_conflict, args.force) {
        (Some(policy), _) => policy.into(),
        (None, true) => OnConflict::BackupAndOverwrite,
        (None, false) => OnConflict::Skip,
    };

    let problems_path = args
        .problems
        .clone()
        .unwrap_or_else(|| args.cache_dir.join("HumanEvalPlus.jsonl"));
    let loader = JsonlProblems::new(&problems_path);
    let cache = DiskOracleCache::new(&args.cache_dir);
    let executor = Arc::new(CommandExecutor::new(&args.exec, args.exec_args.clone()));

    let options = EvaluateOptions {
        samples: args.samples.clone(),
        workers,
        base_only: args.base_only,
        fast_check: !args.full,
        on_conflict,
        watchdog_interval: Duration::from_secs(args.watchdog_secs.max(1)),
        sample_extension: args.sample_ext.clone(),
    };

    info!(
        dataset = dataset.as_str(),
        workers,
        on_conflict = on_conflict.as_str(),
        "starting evaluation"
    );
    let evaluation = evaluate(&options, &loader, executor, &cache)?;
    Ok(summarize(dataset, evaluation))
}

fn summarize(dataset: DatasetKind, evaluation: Evaluation) -> EvaluateSummary {
    let Evaluation {
        path,
        source,
        backup,
        document,
    } = evaluation;
    EvaluateSummary {
        dataset: dataset.as_str().to_string(),
        result_path: path.to_string_lossy().to_string(),
        source,
        backup: backup.map(|path| path.to_string_lossy().to_string()),
        hash: document.hash.clone(),
        tasks: document.eval.len(),
        candidates: document.eval.values().map(|task| task.nfiles).sum(),
        pass_at_k: pass_at_k(&document.eval, &DEFAULT_KS),
    }
}

fn format_pass_at_k(summary: &EvaluateSummary) -> String {
    let render = |scores: &std::collections::BTreeMap<String, f64>| {
        scores
            .iter()
            .map(|(k, v)| format!("{k}={v:.4}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    let mut lines = vec![format!("base: {}", render(&summary.pass_at_k.base))];
    if let Some(plus) = &summary.pass_at_k.plus {
        lines.push(format!("base+plus: {}", render(plus)));
    }
    lines.join("\n")
}

fn emit<T: Serialize>(cli: &Cli, summary: &T, text: &str) -> Result<()> {
    let payload = match cli.format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(summary).context("serialize summary json")?
        }
        OutputFormat::Text => text.to_string(),
    };
    if let Some(path) = &cli.output {
        return write_atomic(path, payload.as_bytes());
    }
    println!("{payload}");
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents).with_context(|| format!("write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("rename {}", path.display()))?;
    Ok(())
}
