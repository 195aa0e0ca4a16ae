//! Error types for the session core.
//!
//! `ServiceError` lives here rather than in `edutest-providers` so that the
//! controller can classify a collaborator failure without depending on any
//! particular HTTP backend.

use thiserror::Error;

/// A test or request that must not enter a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The test has no questions, so it cannot be started or scored.
    #[error("test '{test_id}' has no questions")]
    NoQuestions { test_id: String },

    /// The test duration must be a positive number of minutes.
    #[error("test '{test_id}' has a non-positive duration ({minutes} min)")]
    InvalidDuration { test_id: String, minutes: u32 },

    /// Grade levels are positive; generated tests target grades 6 through 9.
    #[error("grade {0} is not supported (expected 6..=9)")]
    UnsupportedGrade(u32),

    /// Two questions share an id; answers are keyed by question id.
    #[error("test '{test_id}' repeats question id '{question_id}'")]
    DuplicateQuestionId { test_id: String, question_id: String },

    /// A question has no answer options.
    #[error("question '{question_id}' has no options")]
    NoOptions { question_id: String },

    /// An answer option is present but has empty text.
    #[error("question '{question_id}' option '{key}' is empty")]
    EmptyOption { question_id: String, key: String },

    /// The correct answer key does not name one of the question's options.
    #[error("question '{question_id}' correct answer '{key}' is not one of its options")]
    CorrectAnswerNotAnOption { question_id: String, key: String },
}

/// Failures of an external AI collaborator (test generation or feedback).
///
/// These are always recoverable: they surface as "generation failed" or
/// "feedback unavailable" and never end a session.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid or missing API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The response parsed but carried no usable text.
    #[error("service returned an empty response")]
    EmptyResponse,
}

impl ServiceError {
    /// Returns `true` if repeating the same request cannot succeed.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ServiceError::AuthenticationFailed(_) | ServiceError::ModelNotFound(_)
        )
    }
}

/// An answer the controller refused to record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Answers are only accepted while the session is in progress.
    #[error("session is not in progress")]
    NotInProgress,

    /// No question with this id exists on the test.
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),

    /// The question exists but has no option with this key.
    #[error("question '{question_id}' has no option '{key}'")]
    UnknownOption { question_id: String, key: String },
}
