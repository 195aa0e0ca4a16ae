//! Scoring of a set of answers against a test.
//!
//! A score is the share of exactly matching answers scaled to 10 and rounded
//! to one decimal place. Keys are compared byte-for-byte: no trimming, no case
//! folding, and an unanswered question never matches.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::{Answers, Test};

/// Highest attainable score.
pub const MAX_SCORE: f64 = 10.0;

/// How a single question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// One question's outcome, in paper order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    /// 1-based position on the paper.
    pub number: usize,
    pub selected: Option<String>,
    pub correct_answer: String,
    pub outcome: Outcome,
}

/// Number of questions whose answer exactly equals the correct key.
pub fn count_correct(test: &Test, answers: &Answers) -> usize {
    test.questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count()
}

/// Score `answers` against `test`.
///
/// Returns `ConfigurationError::NoQuestions` for an empty test instead of
/// dividing by zero; sessions never reach this point with one.
pub fn try_score(test: &Test, answers: &Answers) -> Result<f64, ConfigurationError> {
    let total = test.questions.len();
    if total == 0 {
        return Err(ConfigurationError::NoQuestions {
            test_id: test.id.clone(),
        });
    }
    let correct = count_correct(test, answers);
    Ok(round_one_decimal(correct as f64 / total as f64 * MAX_SCORE))
}

/// Score a test that is known to have questions.
///
/// An empty test scores 0.0 and logs an error; callers validate first.
pub fn score(test: &Test, answers: &Answers) -> f64 {
    try_score(test, answers).unwrap_or_else(|e| {
        tracing::error!("scored an unvalidated test: {e}");
        0.0
    })
}

/// Per-question outcomes, in paper order.
pub fn grade_answers(test: &Test, answers: &Answers) -> Vec<QuestionOutcome> {
    test.questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let selected = answers.get(&q.id).cloned();
            let outcome = match &selected {
                None => Outcome::Unanswered,
                Some(key) if *key == q.correct_answer => Outcome::Correct,
                Some(_) => Outcome::Incorrect,
            };
            QuestionOutcome {
                question_id: q.id.clone(),
                number: i + 1,
                selected,
                correct_answer: q.correct_answer.clone(),
                outcome,
            }
        })
        .collect()
}

/// Round half away from zero to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
