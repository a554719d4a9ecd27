use crate::error::EvalError;
use crate::types::{Problem, ProblemSet, Sample, SampleBody};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    HumanEval,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::HumanEval => "humaneval",
        }
    }
}

impl FromStr for DatasetKind {
    type Err = EvalError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "humaneval" => Ok(DatasetKind::HumanEval),
            other => Err(EvalError::config(format!("unsupported dataset: {other}"))),
        }
    }
}

pub trait ProblemLoader {
    /// Returns the problems together with a content hash of the problem set.
    fn load(&self) -> Result<(ProblemSet, String), EvalError>;
}

/// Problems stored one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlProblems {
    path: PathBuf,
}

impl JsonlProblems {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProblemLoader for JsonlProblems {
    fn load(&self) -> Result<(ProblemSet, String), EvalError> {
        if !self.path.exists() {
            return Err(EvalError::config(format!(
                "problem file not found: {}",
                self.path.display()
            )));
        }
        let data = fs::read(&self.path).map_err(|err| EvalError::io(&self.path, err))?;
        let hash = sha256_hex(&data);
        let text = std::str::from_utf8(&data)
            .map_err(|err| EvalError::format(format!("{}: {err}", self.path.display())))?;
        let problems = parse_problems(text, &self.path)?;
        if problems.is_empty() {
            return Err(EvalError::config(format!(
                "no problems in {}",
                self.path.display()
            )));
        }
        Ok((problems, hash))
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn parse_problems(text: &str, path: &Path) -> Result<ProblemSet, EvalError> {
    let mut problems = ProblemSet::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let problem: Problem = serde_json::from_str(line).map_err(|err| {
            EvalError::format(format!("{}:{}: {err}", path.display(), idx + 1))
        })?;
        if problems.contains_key(&problem.task_id) {
            return Err(EvalError::config(format!(
                "duplicate task {} in {}",
                problem.task_id,
                path.display()
            )));
        }
        problems.insert(problem.task_id.clone(), problem);
    }
    Ok(problems)
}

#[derive(Deserialize)]
struct SampleLine {
    task_id: String,
    solution: Option<String>,
    completion: Option<String>,
}

pub type SampleIter = Box<dyn Iterator<Item = Result<Sample, EvalError>>>;

/// Streams samples from a `.jsonl` file or a directory of per-task folders.
pub fn load_samples(path: &Path, extension: &str) -> Result<SampleIter, EvalError> {
    if path.is_dir() {
        return Ok(Box::new(load_sample_dir(path, extension)?.into_iter().map(Ok)));
    }
    let file = fs::File::open(path).map_err(|err| EvalError::io(path, err))?;
    let display = path.display().to_string();
    let lines = BufReader::new(file).lines().enumerate();
    let samples = lines.filter_map(move |(idx, line)| {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                return Some(Err(EvalError::format(format!(
                    "{display}:{}: {err}",
                    idx + 1
                ))))
            }
        };
        if line.trim().is_empty() {
            return None;
        }
        Some(parse_sample_line(&line, idx).map_err(|message| {
            EvalError::format(format!("{display}:{}: {message}", idx + 1))
        }))
    });
    Ok(Box::new(samples))
}

fn parse_sample_line(line: &str, idx: usize) -> Result<Sample, String> {
    let raw: SampleLine = serde_json::from_str(line).map_err(|err| err.to_string())?;
    let body = match (raw.solution, raw.completion) {
        (Some(solution), _) => SampleBody::Solution(solution),
        (None, Some(completion)) => SampleBody::Completion(completion),
        (None, None) => return Err("sample has neither solution nor completion".to_string()),
    };
    Ok(Sample {
        identifier: format!("{}_{idx}", raw.task_id),
        task_id: raw.task_id,
        body,
    })
}

// Layout: <root>/<Task_Name>/<n>.<ext>; folder names use `_` where task ids use `/`.
fn load_sample_dir(root: &Path, extension: &str) -> Result<Vec<Sample>, EvalError> {
    let mut task_dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| EvalError::io(root, err))? {
        let entry = entry.map_err(|err| EvalError::io(root, err))?;
        let file_type = entry.file_type().map_err(|err| EvalError::io(root, err))?;
        if file_type.is_dir() {
            task_dirs.push(entry.path());
        }
    }
    task_dirs.sort();

    let mut samples = Vec::new();
    for task_dir in task_dirs {
        let Some(folder) = task_dir.file_name().map(|name| name.to_string_lossy()) else {
            continue;
        };
        let task_id = folder.replace('_', "/");

        let mut files = Vec::new();
        for entry in fs::read_dir(&task_dir).map_err(|err| EvalError::io(&task_dir, err))? {
            let path = entry.map_err(|err| EvalError::io(&task_dir, err))?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| sample_order(a).cmp(&sample_order(b)));

        for file in files {
            let solution = fs::read_to_string(&file).map_err(|err| EvalError::io(&file, err))?;
            samples.push(Sample {
                task_id: task_id.clone(),
                body: SampleBody::Solution(solution),
                identifier: file.to_string_lossy().to_string(),
            });
        }
    }
    Ok(samples)
}

// Numeric stems first in numeric order, then the rest by name.
fn sample_order(path: &Path) -> (u8, u64, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    match stem.parse::<u64>() {
        Ok(number) => (0, number, stem),
        Err(_) => (1, 0, stem),
    }
}
