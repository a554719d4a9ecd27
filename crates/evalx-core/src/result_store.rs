use crate::error::EvalError;
use crate::types::TaskEval;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULT_FILE_NAME: &str = "eval_results.json";
const RESULT_SUFFIX: &str = "_eval_results.json";
const BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultDocument {
    pub date: String,
    pub hash: String,
    pub eval: BTreeMap<String, TaskEval>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    #[default]
    Skip,
    BackupAndOverwrite,
    Fail,
}

impl OnConflict {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnConflict::Skip => "skip",
            OnConflict::BackupAndOverwrite => "backup-and-overwrite",
            OnConflict::Fail => "fail",
        }
    }
}

/// `dir/` → `dir/eval_results.json`; `name.jsonl` → `name_eval_results.json`.
pub fn result_path(samples: &Path) -> Result<PathBuf, EvalError> {
    if samples.is_dir() {
        return Ok(samples.join(RESULT_FILE_NAME));
    }
    let text = samples.to_string_lossy();
    match text.strip_suffix(".jsonl") {
        Some(stem) => Ok(PathBuf::from(format!("{stem}{RESULT_SUFFIX}"))),
        None => Err(EvalError::config(format!(
            "samples must be a directory or a .jsonl file: {}",
            samples.display()
        ))),
    }
}

pub fn load(path: &Path) -> Result<ResultDocument, EvalError> {
    let text = fs::read_to_string(path).map_err(|err| EvalError::io(path, err))?;
    serde_json::from_str(&text)
        .map_err(|err| EvalError::format(format!("{}: {err}", path.display())))
}

/// Writes through a sibling temp file so readers never see a partial document.
pub fn save(path: &Path, document: &ResultDocument) -> Result<(), EvalError> {
    let payload = serde_json::to_vec(document)
        .map_err(|err| EvalError::format(format!("serialize results: {err}")))?;
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    fs::write(&tmp_path, payload).map_err(|err| EvalError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, path).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        EvalError::io(path, err)
    })
}

/// First free name among `path.bak`, `path.bak.bak`, ...
pub fn backup_path(path: &Path) -> PathBuf {
    let mut candidate = path.as_os_str().to_os_string();
    loop {
        candidate.push(BACKUP_SUFFIX);
        let next = PathBuf::from(&candidate);
        if !next.exists() {
            return next;
        }
    }
}

pub fn backup(path: &Path) -> Result<PathBuf, EvalError> {
    let target = backup_path(path);
    fs::rename(path, &target).map_err(|err| EvalError::io(path, err))?;
    Ok(target)
}
