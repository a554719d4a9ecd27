use crate::error::EvalError;
use crate::result_store::ResultDocument;
use crate::types::{Status, SuiteResult};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Tasks whose first candidate is `failed` on the base suite or, when
/// present, the plus suite. Timeouts and errors are not listed.
pub fn failed_tasks(document: &ResultDocument) -> Vec<String> {
    let is_failed = |result: &SuiteResult| result.status() == Status::Failed;
    document
        .eval
        .iter()
        .filter(|(_, task)| {
            let base_failed = task.base.first().is_some_and(is_failed);
            let plus_failed = task.plus.first().is_some_and(is_failed);
            base_failed || plus_failed
        })
        .map(|(task_id, _)| task_id.clone())
        .collect()
}

pub fn read_id_set(path: &Path) -> Result<BTreeSet<String>, EvalError> {
    let text = fs::read_to_string(path).map_err(|err| EvalError::io(path, err))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn write_id_list<'a, I>(path: &Path, ids: I) -> Result<(), EvalError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut file = fs::File::create(path).map_err(|err| EvalError::io(path, err))?;
    for id in ids {
        writeln!(file, "{id}").map_err(|err| EvalError::io(path, err))?;
    }
    file.flush().map_err(|err| EvalError::io(path, err))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureDiff {
    pub left_only: BTreeSet<String>,
    pub right_only: BTreeSet<String>,
}

pub fn diff_sets(left: &BTreeSet<String>, right: &BTreeSet<String>) -> FailureDiff {
    FailureDiff {
        left_only: left.difference(right).cloned().collect(),
        right_only: right.difference(left).cloned().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutputs {
    pub left_only_path: PathBuf,
    pub right_only_path: PathBuf,
    pub diff: FailureDiff,
}

/// Writes `<prefix>-f1-not-f2.txt` and `<prefix>-f2-not-f1.txt`.
pub fn diff_files(file1: &Path, file2: &Path, prefix: &str) -> Result<DiffOutputs, EvalError> {
    let left = read_id_set(file1)?;
    let right = read_id_set(file2)?;
    let diff = diff_sets(&left, &right);

    let left_only_path = PathBuf::from(format!("{prefix}-f1-not-f2.txt"));
    let right_only_path = PathBuf::from(format!("{prefix}-f2-not-f1.txt"));
    write_id_list(&left_only_path, &diff.left_only)?;
    write_id_list(&right_only_path, &diff.right_only)?;

    Ok(DiffOutputs {
        left_only_path,
        right_only_path,
        diff,
    })
}

/// Writes `<prefix>-failed-cases.txt` for a result document.
pub fn write_failed_cases(document: &ResultDocument, prefix: &str) -> Result<PathBuf, EvalError> {
    let path = PathBuf::from(format!("{prefix}-failed-cases.txt"));
    let failed = failed_tasks(document);
    write_id_list(&path, &failed)?;
    Ok(path)
}
