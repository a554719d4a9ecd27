use evalx_core::dataset::sha256_hex;
use evalx_core::{load_samples, EvalErrorKind, JsonlProblems, ProblemLoader, SampleBody};
use serde_json::json;
use std::fs;

fn problem_line(task_id: &str) -> String {
    json!({
        "task_id": task_id,
        "prompt": "def add(a, b):\n",
        "canonical_solution": "    return a + b\n",
        "base_input": [[1, 2], [3, 4]],
        "plus_input": [[1e9, 2.5]],
        "entry_point": "add",
        "atol": 1e-6
    })
    .to_string()
}

#[test]
fn problems_hash_is_sha256_of_file_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("problems.jsonl");
    let text = format!("{}\n{}\n", problem_line("HumanEval/0"), problem_line("HumanEval/1"));
    fs::write(&path, &text).expect("write");

    let (problems, hash) = JsonlProblems::new(&path).load().expect("load");
    assert_eq!(problems.len(), 2);
    assert_eq!(hash, sha256_hex(text.as_bytes()));
    assert_eq!(hash.len(), 64);

    let problem = &problems["HumanEval/1"];
    assert_eq!(problem.entry_point, "add");
    assert_eq!(problem.base_input.len(), 2);
    assert_eq!(problem.atol, 1e-6);
    assert_eq!(
        problem.reference_program(),
        "def add(a, b):\n    return a + b\n"
    );
}

#[test]
fn missing_problem_file_is_a_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = JsonlProblems::new(dir.path().join("absent.jsonl"))
        .load()
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Config);
}

#[test]
fn duplicate_problem_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("problems.jsonl");
    fs::write(
        &path,
        format!("{}\n{}\n", problem_line("HumanEval/0"), problem_line("HumanEval/0")),
    )
    .expect("write");

    let err = JsonlProblems::new(&path).load().unwrap_err();
    assert!(err.message.contains("HumanEval/0"));
}

#[test]
fn jsonl_samples_stream_in_file_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("samples.jsonl");
    fs::write(
        &path,
        [
            json!({"task_id": "HumanEval/0", "completion": "    return a + b\n"}).to_string(),
            String::new(),
            json!({"task_id": "HumanEval/0", "solution": "def add(a, b): return b + a\n"})
                .to_string(),
        ]
        .join("\n"),
    )
    .expect("write");

    let samples: Vec<_> = load_samples(&path, "py")
        .expect("open")
        .collect::<Result<_, _>>()
        .expect("parse");
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].identifier, "HumanEval/0_0");
    assert!(matches!(samples[0].body, SampleBody::Completion(_)));
    assert_eq!(samples[1].identifier, "HumanEval/0_2");
    assert!(matches!(samples[1].body, SampleBody::Solution(_)));
}

#[test]
fn malformed_sample_line_is_reported_with_position() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("samples.jsonl");
    fs::write(&path, "{\"task_id\": \"HumanEval/0\"}\n").expect("write");

    let err = load_samples(&path, "py")
        .expect("open")
        .next()
        .expect("one item")
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::Format);
    assert!(err.message.contains(":1:"));
}

#[test]
fn sample_directories_map_folder_names_to_task_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let task_dir = dir.path().join("HumanEval_3");
    fs::create_dir_all(&task_dir).expect("mkdir");
    for name in ["10.py", "2.py", "skip.txt"] {
        fs::write(task_dir.join(name), name).expect("write");
    }

    let samples: Vec<_> = load_samples(dir.path(), "py")
        .expect("open")
        .collect::<Result<_, _>>()
        .expect("read");
    assert_eq!(samples.len(), 2);
    assert!(samples.iter().all(|s| s.task_id == "HumanEval/3"));
    assert_eq!(samples[0].body, SampleBody::Solution("2.py".to_string()));
    assert_eq!(samples[1].body, SampleBody::Solution("10.py".to_string()));
    assert!(samples[0].identifier.ends_with("2.py"));
}
