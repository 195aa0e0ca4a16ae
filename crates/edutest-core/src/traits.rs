//! Interfaces of the external AI collaborators.
//!
//! Implemented by the `edutest-providers` crate. Both calls are single-shot:
//! no retry, no caching.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::model::{Answers, GeneratedTest, Question, TestRequest};

// ---------------------------------------------------------------------------
// Test generation
// ---------------------------------------------------------------------------

/// Produces exam content for a teacher's request.
#[async_trait]
pub trait TestGenerator: Send + Sync {
    /// Human-readable backend name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate a title and question list. The caller must still validate
    /// the payload through [`Test::from_generated`](crate::model::Test::from_generated).
    async fn generate_test(&self, request: &TestRequest) -> Result<GeneratedTest, ServiceError>;
}

// ---------------------------------------------------------------------------
// Narrative feedback
// ---------------------------------------------------------------------------

/// Writes narrative feedback for a scored attempt.
#[async_trait]
pub trait FeedbackRequester: Send + Sync {
    fn name(&self) -> &str;

    async fn request_feedback(&self, request: &FeedbackRequest) -> Result<String, ServiceError>;
}

/// What the feedback service is told about an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// Score out of 10.
    pub score: f64,
    pub answers: Answers,
    /// The test's questions, in paper order.
    pub questions: Vec<Question>,
}

impl FeedbackRequest {
    /// Questions answered wrongly or left blank, with the student's choice.
    pub fn missed(&self) -> impl Iterator<Item = (&Question, Option<&str>)> {
        self.questions.iter().filter_map(|q| {
            let selected = self.answers.get(&q.id).map(String::as_str);
            (selected != Some(q.correct_answer.as_str())).then_some((q, selected))
        })
    }
}
