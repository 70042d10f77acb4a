// src/grading.rs
//
// Pure per-question grading. The submit handler resolves the question's
// answer key from the database and calls into here; persistence stays in the
// handler so each rule can be tested without a pool.

use std::collections::HashSet;

/// Outcome of grading one (question, submission) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub is_correct: bool,
    pub points_earned: i64,
}

impl Verdict {
    fn full(points: i64) -> Self {
        Verdict {
            is_correct: true,
            points_earned: points,
        }
    }

    fn zero() -> Self {
        Verdict {
            is_correct: false,
            points_earned: 0,
        }
    }
}

/// Grades a submission against a question's answer key.
///
/// `correct_ids` and `selected_ids` must be ordered by answer position;
/// true/false compares the first of each. An unknown question type grades
/// to zero.
pub fn evaluate(
    question_type: &str,
    points: i64,
    keywords: Option<&str>,
    correct_ids: &[i64],
    selected_ids: &[i64],
    text_answer: &str,
) -> Verdict {
    match question_type {
        "multiple_choice" => evaluate_multiple_choice(points, correct_ids, selected_ids),
        "true_false" => evaluate_true_false(points, correct_ids.first(), selected_ids.first()),
        "text" => evaluate_text(points, keywords, text_answer),
        _ => Verdict::zero(),
    }
}

/// Exact set equality: full points only when the selected set matches the
/// flagged-correct set, no partial credit.
fn evaluate_multiple_choice(points: i64, correct_ids: &[i64], selected_ids: &[i64]) -> Verdict {
    let correct: HashSet<i64> = correct_ids.iter().copied().collect();
    let selected: HashSet<i64> = selected_ids.iter().copied().collect();

    if correct == selected {
        Verdict::full(points)
    } else {
        Verdict::zero()
    }
}

/// Single match between the first correct answer and the first selected one.
/// Either side missing grades to zero.
fn evaluate_true_false(points: i64, correct_id: Option<&i64>, selected_id: Option<&i64>) -> Verdict {
    match (correct_id, selected_id) {
        (Some(correct), Some(selected)) if correct == selected => Verdict::full(points),
        _ => Verdict::zero(),
    }
}

/// Keyword matching with partial credit.
///
/// With keywords configured: `ratio = found / total` over case-insensitive
/// substring presence; `points_earned = floor(points * ratio)` and the answer
/// counts as correct from half the keywords up. Without keywords, any
/// non-blank answer earns full points.
fn evaluate_text(points: i64, keywords: Option<&str>, text_answer: &str) -> Verdict {
    let keywords = keywords.map(parse_keywords).unwrap_or_default();

    if keywords.is_empty() {
        return if text_answer.trim().is_empty() {
            Verdict::zero()
        } else {
            Verdict::full(points)
        };
    }

    let haystack = text_answer.to_lowercase();
    let found = keywords
        .iter()
        .filter(|kw| haystack.contains(kw.as_str()))
        .count();

    if found == 0 {
        return Verdict::zero();
    }

    let ratio = found as f64 / keywords.len() as f64;
    Verdict {
        is_correct: ratio >= 0.5,
        points_earned: (points as f64 * ratio).floor() as i64,
    }
}

/// Splits a comma-separated keyword list, trimmed and lowercased.
/// An effectively empty list ("", " , ") means no keywords are configured.
fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect()
}
