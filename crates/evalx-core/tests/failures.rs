use evalx_core::failures::{read_id_set, write_failed_cases};
use evalx_core::{diff_files, failed_tasks, ResultDocument, Status, SuiteResult, TaskEval};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn ids(path: &Path) -> Vec<String> {
    read_id_set(path).expect("read ids").into_iter().collect()
}

fn task(base: Status, plus: Option<Status>) -> TaskEval {
    TaskEval {
        nfiles: 1,
        base: vec![SuiteResult::new(base, Vec::new())],
        plus: plus
            .map(|status| vec![SuiteResult::new(status, Vec::new())])
            .unwrap_or_default(),
    }
}

fn document() -> ResultDocument {
    let mut eval = BTreeMap::new();
    eval.insert("T/0".to_string(), task(Status::Success, Some(Status::Success)));
    eval.insert("T/1".to_string(), task(Status::Failed, Some(Status::Success)));
    eval.insert("T/2".to_string(), task(Status::Success, Some(Status::Timeout)));
    eval.insert("T/3".to_string(), task(Status::Success, None));
    eval.insert("T/4".to_string(), task(Status::Error, None));
    eval.insert("T/5".to_string(), task(Status::Success, Some(Status::Failed)));
    eval.insert("T/6".to_string(), task(Status::Timeout, Some(Status::Failed)));
    ResultDocument {
        date: "d".to_string(),
        hash: "h".to_string(),
        eval,
    }
}

#[test]
fn failed_tasks_cover_base_and_plus_failures() {
    assert_eq!(failed_tasks(&document()), vec!["T/1", "T/5", "T/6"]);
}

#[test]
fn timeouts_and_errors_are_not_failed_cases() {
    let listed = failed_tasks(&document());
    assert!(!listed.contains(&"T/2".to_string()));
    assert!(!listed.contains(&"T/4".to_string()));
}

#[test]
fn failed_cases_file_lists_one_task_per_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prefix = dir.path().join("run").to_string_lossy().to_string();

    let path = write_failed_cases(&document(), &prefix).expect("write");
    assert_eq!(path, dir.path().join("run-failed-cases.txt"));
    assert_eq!(fs::read_to_string(path).expect("read"), "T/1\nT/5\nT/6\n");
}

#[test]
fn diff_writes_both_directions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let f1 = dir.path().join("f1.txt");
    let f2 = dir.path().join("f2.txt");
    fs::write(&f1, "a\nb\nc\n").expect("write f1");
    fs::write(&f2, "b\n\n  c  \nd\n").expect("write f2");
    let prefix = dir.path().join("cmp").to_string_lossy().to_string();

    let outputs = diff_files(&f1, &f2, &prefix).expect("diff");
    assert_eq!(outputs.left_only_path, dir.path().join("cmp-f1-not-f2.txt"));
    assert_eq!(outputs.right_only_path, dir.path().join("cmp-f2-not-f1.txt"));
    assert_eq!(ids(&outputs.left_only_path), vec!["a"]);
    assert_eq!(ids(&outputs.right_only_path), vec!["d"]);
}

#[test]
fn swapping_inputs_swaps_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let f1 = dir.path().join("f1.txt");
    let f2 = dir.path().join("f2.txt");
    fs::write(&f1, "a\nb\nc\n").expect("write f1");
    fs::write(&f2, "b\nc\nd\n").expect("write f2");

    let forward = diff_files(&f1, &f2, &dir.path().join("fw").to_string_lossy()).expect("diff");
    let reverse = diff_files(&f2, &f1, &dir.path().join("rv").to_string_lossy()).expect("diff");

    assert_eq!(forward.diff.left_only, reverse.diff.right_only);
    assert_eq!(forward.diff.right_only, reverse.diff.left_only);
}

#[test]
fn identical_sets_produce_empty_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let f1 = dir.path().join("f1.txt");
    fs::write(&f1, "x\ny\n").expect("write");

    let outputs = diff_files(&f1, &f1, &dir.path().join("same").to_string_lossy()).expect("diff");
    assert_eq!(fs::read_to_string(outputs.left_only_path).expect("read"), "");
    assert_eq!(fs::read_to_string(outputs.right_only_path).expect("read"), "");
}
