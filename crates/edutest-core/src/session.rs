//! The in-progress state of one student attempting one test.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{Answers, Test};
use crate::timer::{Countdown, TimerEvent};

/// Lifecycle of a session. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NotStarted => write!(f, "not started"),
            SessionState::InProgress => write!(f, "in progress"),
            SessionState::Submitted => write!(f, "submitted"),
        }
    }
}

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub test_id: String,
    pub state: SessionState,
    pub remaining_secs: u64,
    pub answers: Answers,
    pub answered: usize,
    pub total_questions: usize,
}

/// An attempt at a test. Owned by the test-taking flow and mutated only
/// through [`SessionController`](crate::controller::SessionController).
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    test: Arc<Test>,
    answers: Answers,
    remaining_secs: u64,
    state: SessionState,
    countdown: Option<Countdown>,
    submission_id: Option<Uuid>,
}

impl Session {
    pub fn new(test: Arc<Test>) -> Self {
        Self {
            id: Uuid::new_v4(),
            remaining_secs: test.duration_secs(),
            test,
            answers: Answers::new(),
            state: SessionState::NotStarted,
            countdown: None,
            submission_id: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test(&self) -> &Arc<Test> {
        &self.test
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == SessionState::InProgress
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    /// The submission this session produced, once submitted.
    pub fn submission_id(&self) -> Option<Uuid> {
        self.submission_id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            test_id: self.test.id.clone(),
            state: self.state,
            remaining_secs: self.remaining_secs,
            answers: self.answers.clone(),
            answered: self.answers.len(),
            total_questions: self.test.questions.len(),
        }
    }

    /// Wait for the next countdown event.
    ///
    /// Returns `None` when no countdown is running (not started, submitted,
    /// or already expired). The event is not applied; hand it to
    /// [`SessionController::handle_timer_event`](crate::controller::SessionController::handle_timer_event).
    pub async fn next_timer_event(&mut self) -> Option<TimerEvent> {
        match self.countdown.as_mut() {
            Some(countdown) => countdown.next_event().await,
            None => None,
        }
    }

    /// Enter `InProgress` with a fresh answer sheet and a full countdown.
    pub(crate) fn begin(&mut self) {
        if let Some(mut previous) = self.countdown.take() {
            previous.cancel();
        }
        self.answers.clear();
        self.remaining_secs = self.test.duration_secs();
        self.countdown = Some(Countdown::start(self.remaining_secs));
        self.state = SessionState::InProgress;
    }

    pub(crate) fn set_answer(&mut self, question_id: &str, key: &str) {
        self.answers.insert(question_id.to_string(), key.to_string());
    }

    pub(crate) fn apply_tick(&mut self, remaining_secs: u64) {
        self.remaining_secs = remaining_secs;
    }

    /// Stop the countdown and enter `Submitted`.
    pub(crate) fn finish(&mut self, submission_id: Uuid) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
        }
        self.state = SessionState::Submitted;
        self.submission_id = Some(submission_id);
    }

    #[cfg(test)]
    pub(crate) fn has_live_countdown(&self) -> bool {
        self.countdown.as_ref().is_some_and(Countdown::is_active)
    }
}

/// Format seconds as `mm:ss` for a countdown display.
pub fn format_remaining(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
