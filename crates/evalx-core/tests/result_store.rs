use evalx_core::result_store::{backup, backup_path, load, save};
use evalx_core::{EvalErrorKind, ResultDocument, Status, SuiteResult, TaskEval};
use std::collections::BTreeMap;
use std::fs;

fn document() -> ResultDocument {
    let mut eval = BTreeMap::new();
    eval.insert(
        "HumanEval/0".to_string(),
        TaskEval {
            nfiles: 2,
            base: vec![
                SuiteResult::new(Status::Success, vec![true, true]),
                SuiteResult::new(Status::Timeout, vec![true]),
            ],
            plus: vec![
                SuiteResult::new(Status::Success, vec![true]),
                SuiteResult::new(Status::Failed, vec![false]),
            ],
        },
    );
    ResultDocument {
        date: "2024-01-02 03:04".to_string(),
        hash: "abc".to_string(),
        eval,
    }
}

#[test]
fn saved_document_reloads_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("eval_results.json");
    save(&path, &document()).expect("save");

    assert_eq!(load(&path).expect("load"), document());
    assert!(!dir.path().join("eval_results.json.tmp").exists());
}

#[test]
fn legacy_files_field_supplies_candidate_count() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("eval_results.json");
    fs::write(
        &path,
        r#"{"date":"d","hash":"h","eval":{"T/0":{
            "files":["a.py","b.py","c.py"],
            "base":[["success",[]],["failed",[false]],["success",[]]],
            "plus":[]}}}"#,
    )
    .expect("write");

    let doc = load(&path).expect("load");
    assert_eq!(doc.eval["T/0"].nfiles, 3);
    assert_eq!(doc.eval["T/0"].base[1].status(), Status::Failed);
    assert!(doc.eval["T/0"].plus.is_empty());
}

#[test]
fn malformed_document_is_a_format_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("eval_results.json");
    fs::write(&path, "{\"date\": 1}").expect("write");

    assert_eq!(load(&path).unwrap_err().kind, EvalErrorKind::Format);
}

#[test]
fn missing_document_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Io);
}

#[test]
fn backups_never_overwrite_earlier_backups() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("eval_results.json");

    fs::write(&path, "first").expect("write");
    let first = backup(&path).expect("backup");
    assert_eq!(first, dir.path().join("eval_results.json.bak"));
    assert!(!path.exists());

    fs::write(&path, "second").expect("write");
    assert_eq!(
        backup_path(&path),
        dir.path().join("eval_results.json.bak.bak")
    );
    let second = backup(&path).expect("backup");

    assert_eq!(fs::read_to_string(first).expect("read"), "first");
    assert_eq!(fs::read_to_string(second).expect("read"), "second");
}
