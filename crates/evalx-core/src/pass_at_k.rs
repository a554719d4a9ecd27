use crate::types::TaskEval;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_KS: [usize; 3] = [1, 10, 100];

/// Unbiased estimate of `1 - C(n - c, k) / C(n, k)`, computed as a running
/// product to stay in range for large `n`.
pub fn estimate_pass_at_k(n: usize, c: usize, k: usize) -> f64 {
    if n.saturating_sub(c) < k {
        return 1.0;
    }
    1.0 - (1..=k).fold(1.0_f64, |acc, i| {
        acc * (n - c - k + i) as f64 / (n - k + i) as f64
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskCounts {
    pub n: usize,
    pub base_correct: usize,
    pub plus_correct: Option<usize>,
}

impl TaskCounts {
    pub fn from_eval(task: &TaskEval) -> Self {
        let base_correct = task.base.iter().filter(|r| r.is_success()).count();
        let plus_correct = if task.plus.is_empty() {
            None
        } else {
            Some(
                task.base
                    .iter()
                    .zip(&task.plus)
                    .filter(|(base, plus)| base.is_success() && plus.is_success())
                    .count(),
            )
        };
        Self {
            n: task.nfiles,
            base_correct,
            plus_correct,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PassAtK {
    pub base: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plus: Option<BTreeMap<String, f64>>,
}

/// Averages pass@k over tasks. A k is reported only when every task has at
/// least k candidates. The plus summary exists when any task carries plus
/// results; tasks without them count as having no plus successes.
pub fn pass_at_k(eval: &BTreeMap<String, TaskEval>, ks: &[usize]) -> PassAtK {
    let counts: Vec<TaskCounts> = eval.values().map(TaskCounts::from_eval).collect();

    let base_pairs: Vec<(usize, usize)> = counts.iter().map(|c| (c.n, c.base_correct)).collect();
    let base = summarize(&base_pairs, ks);

    let plus = if counts.iter().any(|c| c.plus_correct.is_some()) {
        let plus_pairs: Vec<(usize, usize)> = counts
            .iter()
            .map(|c| (c.n, c.plus_correct.unwrap_or(0)))
            .collect();
        Some(summarize(&plus_pairs, ks))
    } else {
        None
    };

    PassAtK { base, plus }
}

fn summarize(pairs: &[(usize, usize)], ks: &[usize]) -> BTreeMap<String, f64> {
    let mut summary = BTreeMap::new();
    if pairs.is_empty() {
        return summary;
    }
    for &k in ks {
        if pairs.iter().all(|(n, _)| *n >= k) {
            let mean = pairs
                .iter()
                .map(|(n, c)| estimate_pass_at_k(*n, *c, k))
                .sum::<f64>()
                / pairs.len() as f64;
            summary.insert(format!("pass@{k}"), mean);
        }
    }
    summary
}
