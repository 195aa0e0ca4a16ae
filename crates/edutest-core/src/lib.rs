//! edutest-core: Test model, timed sessions, and scoring.
//!
//! This crate defines the data model for tests, questions and submissions,
//! the countdown that bounds a test session, the scoring algorithm, and the
//! controller that ties a session's lifecycle together.

pub mod controller;
pub mod error;
pub mod model;
pub mod parser;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod store;
pub mod timer;
pub mod traits;

pub use controller::{SessionController, SubmitTrigger};
pub use error::{ConfigurationError, ServiceError, SessionError};
pub use model::{Answers, Difficulty, Question, Student, Submission, Test, TestRequest};
pub use session::{Session, SessionSnapshot, SessionState};
pub use store::{FeedbackStatus, SubmissionStore};
