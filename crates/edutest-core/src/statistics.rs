//! Class-level summary of submissions: average score and pass rate.

use serde::{Deserialize, Serialize};

use crate::model::Submission;
use crate::scoring::round_one_decimal;

/// Minimum score counted as a pass.
pub const DEFAULT_PASS_MARK: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    /// Number of submissions summarized.
    pub submissions: usize,
    /// Mean score, one decimal place. 0.0 when there are no submissions.
    pub average_score: f64,
    /// Fraction of submissions scoring at least the pass mark, in [0, 1].
    pub pass_rate: f64,
}

impl ClassSummary {
    pub fn from_submissions(submissions: &[Submission], pass_mark: f64) -> Self {
        if submissions.is_empty() {
            return Self {
                submissions: 0,
                average_score: 0.0,
                pass_rate: 0.0,
            };
        }

        let n = submissions.len() as f64;
        let total: f64 = submissions.iter().map(|s| s.score).sum();
        let passed = submissions.iter().filter(|s| s.score >= pass_mark).count();

        Self {
            submissions: submissions.len(),
            average_score: round_one_decimal(total / n),
            pass_rate: passed as f64 / n,
        }
    }

    /// Pass rate as a whole percentage.
    pub fn pass_percent(&self) -> u32 {
        (self.pass_rate * 100.0).round() as u32
    }
}
