//! edutest-providers: AI collaborators for test generation and feedback.
//!
//! Implements the `TestGenerator` and `FeedbackRequester` traits for Google
//! Gemini and OpenAI-compatible chat APIs, plus a mock for tests and offline
//! use.

pub mod config;
pub mod error;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod prompt;

pub use config::{
    create_feedback_requester, create_generator, load_config, load_config_from, EdutestConfig,
    ProviderConfig,
};
