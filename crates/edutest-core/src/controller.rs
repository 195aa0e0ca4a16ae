//! Test-taking lifecycle: start → answer → submit/expire → result.
//!
//! The controller holds no per-session state. Each action takes the
//! [`Session`] it applies to; the session owns its answers and countdown.
//! Submission is idempotent: whichever of the manual submit and the
//! countdown's expiry arrives first scores the attempt, and the other is a
//! no-op. Feedback is requested on a spawned task after the submission has
//! already been published to the store.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{ConfigurationError, SessionError};
use crate::model::{Student, Submission, Test};
use crate::scoring;
use crate::session::Session;
use crate::store::SubmissionStore;
use crate::timer::TimerEvent;
use crate::traits::{FeedbackRequest, FeedbackRequester};

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The student handed the paper in.
    Manual,
    /// The countdown reached zero.
    Expired,
}

impl fmt::Display for SubmitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTrigger::Manual => write!(f, "manual"),
            SubmitTrigger::Expired => write!(f, "expired"),
        }
    }
}

/// Drives sessions for one student and records their submissions.
///
/// All actions that start a countdown or request feedback spawn tokio
/// tasks and must run inside a tokio runtime.
pub struct SessionController {
    store: SubmissionStore,
    feedback: Arc<dyn FeedbackRequester>,
    student: Student,
}

impl SessionController {
    pub fn new(
        store: SubmissionStore,
        feedback: Arc<dyn FeedbackRequester>,
        student: Student,
    ) -> Self {
        Self {
            store,
            feedback,
            student,
        }
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    pub fn student(&self) -> &Student {
        &self.student
    }

    /// Start a new session on `test`.
    ///
    /// Rejects a test without questions or with a zero duration; such a
    /// test never enters `InProgress`. Any result still on screen is
    /// dismissed.
    pub fn start(&self, test: Arc<Test>) -> Result<Session, ConfigurationError> {
        test.validate()?;
        self.store.dismiss_current();

        let mut session = Session::new(test);
        session.begin();
        tracing::info!(
            session = %session.id(),
            test = %session.test().id,
            student = %self.student.id,
            remaining_secs = session.remaining_secs(),
            "session started"
        );
        Ok(session)
    }

    /// Record (or overwrite) the answer to one question.
    pub fn record_answer(
        &self,
        session: &mut Session,
        question_id: &str,
        key: &str,
    ) -> Result<(), SessionError> {
        if !session.is_in_progress() {
            return Err(SessionError::NotInProgress);
        }
        let question = session
            .test()
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        if !question.has_option(key) {
            return Err(SessionError::UnknownOption {
                question_id: question_id.to_string(),
                key: key.to_string(),
            });
        }

        session.set_answer(question_id, key);
        tracing::debug!(session = %session.id(), question_id, key, "answer recorded");
        Ok(())
    }

    /// Hand the session in.
    ///
    /// The first call stops the countdown, scores the answers, appends the
    /// submission to the store and spawns the feedback request. Later calls
    /// (a double click, or expiry racing a manual submit) return `None` and
    /// change nothing.
    pub fn submit(&self, session: &mut Session, trigger: SubmitTrigger) -> Option<Submission> {
        if !session.is_in_progress() {
            tracing::debug!(
                session = %session.id(),
                state = %session.state(),
                %trigger,
                "submit ignored"
            );
            return None;
        }

        let test = Arc::clone(session.test());
        let answers = session.answers().clone();
        let score = scoring::score(&test, &answers);

        let submission = Submission {
            id: Uuid::new_v4(),
            test_id: test.id.clone(),
            student_id: self.student.id.clone(),
            student_name: self.student.name.clone(),
            answers,
            score,
            completed_at: Utc::now(),
            feedback: None,
        };

        session.finish(submission.id);
        self.store.append(submission.clone());
        tracing::info!(
            session = %session.id(),
            submission = %submission.id,
            score,
            %trigger,
            "session submitted"
        );

        self.spawn_feedback(&submission, &test);
        Some(submission)
    }

    /// Apply a countdown event to the session.
    ///
    /// A tick updates the remaining time; expiry submits. Events that arrive
    /// after the session was submitted are ignored.
    pub fn handle_timer_event(
        &self,
        session: &mut Session,
        event: TimerEvent,
    ) -> Option<Submission> {
        if !session.is_in_progress() {
            tracing::trace!(session = %session.id(), ?event, "stale timer event");
            return None;
        }
        match event {
            TimerEvent::Tick { remaining_secs } => {
                session.apply_tick(remaining_secs);
                None
            }
            TimerEvent::Expired => {
                session.apply_tick(0);
                self.submit(session, SubmitTrigger::Expired)
            }
        }
    }

    /// Run the countdown until it expires.
    ///
    /// Returns the submission produced by expiry, or `None` if the session
    /// was not in progress.
    pub async fn run_until_expiry(&self, session: &mut Session) -> Option<Submission> {
        while let Some(event) = session.next_timer_event().await {
            if let Some(submission) = self.handle_timer_event(session, event) {
                return Some(submission);
            }
        }
        None
    }

    fn spawn_feedback(&self, submission: &Submission, test: &Test) {
        let request = FeedbackRequest {
            score: submission.score,
            answers: submission.answers.clone(),
            questions: test.questions.clone(),
        };
        let requester = Arc::clone(&self.feedback);
        let store = self.store.clone();
        let id = submission.id;

        tokio::spawn(async move {
            match requester.request_feedback(&request).await {
                Ok(text) => {
                    if store.attach_feedback(id, text) {
                        tracing::info!(submission = %id, "feedback attached");
                    } else {
                        tracing::debug!(submission = %id, "feedback arrived for a dismissed result");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        submission = %id,
                        provider = requester.name(),
                        "feedback unavailable: {e}"
                    );
                    store.mark_feedback_unavailable(id);
                }
            }
        });
    }
}
