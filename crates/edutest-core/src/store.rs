//! Append-only collection of submissions.
//!
//! The controller is the only writer. The presentation layer reads
//! snapshots and subscribes to changes of the currently displayed result.
//! Feedback is merged by submission id and only into the current result.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::model::Submission;
use crate::statistics::ClassSummary;

/// Feedback state of a submission, as the result view should render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum FeedbackStatus {
    /// Requested, not yet arrived.
    Pending,
    Ready(String),
    /// The request failed; feedback will stay absent.
    Unavailable,
}

/// The result currently on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub submission: Submission,
    pub feedback: FeedbackStatus,
}

#[derive(Debug, Default)]
struct Inner {
    submissions: Vec<Submission>,
    unavailable: HashSet<Uuid>,
    current: Option<Uuid>,
}

impl Inner {
    fn status_of(&self, submission: &Submission) -> FeedbackStatus {
        match &submission.feedback {
            Some(text) => FeedbackStatus::Ready(text.clone()),
            None if self.unavailable.contains(&submission.id) => FeedbackStatus::Unavailable,
            None => FeedbackStatus::Pending,
        }
    }

    fn current_view(&self) -> Option<ResultView> {
        let id = self.current?;
        let submission = self.submissions.iter().find(|s| s.id == id)?;
        Some(ResultView {
            feedback: self.status_of(submission),
            submission: submission.clone(),
        })
    }
}

/// Shared handle to the submission collection. Clones refer to the same store.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    inner: Arc<Mutex<Inner>>,
    current_tx: Arc<watch::Sender<Option<ResultView>>>,
}

impl Default for SubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionStore {
    pub fn new() -> Self {
        let (current_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            current_tx: Arc::new(current_tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.current_tx.send_replace(inner.current_view());
    }

    /// Append a new submission and make it the current result.
    pub(crate) fn append(&self, submission: Submission) {
        let mut inner = self.lock();
        inner.current = Some(submission.id);
        inner.submissions.push(submission);
        self.publish(&inner);
    }

    /// Merge feedback text into submission `id`.
    ///
    /// Applies only while `id` is the current result and its feedback is
    /// still absent. Returns whether the text was stored.
    pub fn attach_feedback(&self, id: Uuid, text: String) -> bool {
        let mut inner = self.lock();
        if inner.current != Some(id) {
            return false;
        }
        let Some(submission) = inner.submissions.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        if submission.feedback.is_some() {
            return false;
        }
        submission.feedback = Some(text);
        self.publish(&inner);
        true
    }

    /// Record that feedback for `id` will never arrive.
    ///
    /// Recorded whether or not `id` is the current result; subscribers are
    /// only notified when it is.
    pub fn mark_feedback_unavailable(&self, id: Uuid) -> bool {
        let mut inner = self.lock();
        let Some(has_feedback) = inner
            .submissions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.feedback.is_some())
        else {
            return false;
        };
        if has_feedback || !inner.unavailable.insert(id) {
            return false;
        }
        if inner.current == Some(id) {
            self.publish(&inner);
        }
        true
    }

    /// The user left the result view; late feedback is discarded.
    pub fn dismiss_current(&self) {
        let mut inner = self.lock();
        if inner.current.take().is_some() {
            self.publish(&inner);
        }
    }

    pub fn current(&self) -> Option<ResultView> {
        self.lock().current_view()
    }

    /// Watch the current result. The receiver sees every change, including
    /// feedback arriving or failing.
    pub fn subscribe(&self) -> watch::Receiver<Option<ResultView>> {
        self.current_tx.subscribe()
    }

    pub fn get(&self, id: Uuid) -> Option<Submission> {
        self.lock().submissions.iter().find(|s| s.id == id).cloned()
    }

    pub fn feedback_status(&self, id: Uuid) -> Option<FeedbackStatus> {
        let inner = self.lock();
        let submission = inner.submissions.iter().find(|s| s.id == id)?;
        Some(inner.status_of(submission))
    }

    /// All submissions, oldest first.
    pub fn all(&self) -> Vec<Submission> {
        self.lock().submissions.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self, pass_mark: f64) -> ClassSummary {
        ClassSummary::from_submissions(&self.lock().submissions, pass_mark)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answers;
    use chrono::Utc;

    fn submission(score: f64) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            test_id: "test-1".into(),
            student_id: "s1".into(),
            student_name: "Student".into(),
            answers: Answers::new(),
            score,
            completed_at: Utc::now(),
            feedback: None,
        }
    }

    #[test]
    fn feedback_is_set_once() {
        let store = SubmissionStore::new();
        let s = submission(7.5);
        let id = s.id;
        store.append(s);
        assert_eq!(store.feedback_status(id), Some(FeedbackStatus::Pending));

        assert!(store.attach_feedback(id, "Good work".into()));
        assert!(!store.attach_feedback(id, "Overwrite".into()));
        assert_eq!(
            store.feedback_status(id),
            Some(FeedbackStatus::Ready("Good work".into()))
        );
        assert!(!store.mark_feedback_unavailable(id));
    }

    #[test]
    fn feedback_only_reaches_current_result() {
        let store = SubmissionStore::new();
        let first = submission(5.0);
        let first_id = first.id;
        store.append(first);
        let second = submission(6.0);
        let second_id = second.id;
        store.append(second);

        assert!(!store.attach_feedback(first_id, "late".into()));
        assert!(store.get(first_id).unwrap().feedback.is_none());
        assert_eq!(store.current().unwrap().submission.id, second_id);

        store.dismiss_current();
        assert!(store.current().is_none());
        assert!(!store.attach_feedback(second_id, "late".into()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn unavailable_feedback() {
        let store = SubmissionStore::new();
        let s = submission(2.0);
        let id = s.id;
        store.append(s);
        assert!(store.mark_feedback_unavailable(id));
        assert_eq!(store.feedback_status(id), Some(FeedbackStatus::Unavailable));
        assert_eq!(
            store.current().unwrap().feedback,
            FeedbackStatus::Unavailable
        );
    }

    #[test]
    fn unavailable_after_dismissal_is_recorded_quietly() {
        let store = SubmissionStore::new();
        let s = submission(3.0);
        let id = s.id;
        store.append(s);
        store.dismiss_current();

        let mut rx = store.subscribe();
        rx.borrow_and_update();
        assert!(store.mark_feedback_unavailable(id));
        assert_eq!(store.feedback_status(id), Some(FeedbackStatus::Unavailable));
        assert!(!rx.has_changed().unwrap());
        assert!(!store.mark_feedback_unavailable(Uuid::new_v4()));
    }

    #[test]
    fn subscribers_see_changes() {
        let store = SubmissionStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().is_none());

        let s = submission(9.0);
        let id = s.id;
        store.append(s);
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().as_ref().unwrap().feedback,
            FeedbackStatus::Pending
        );

        store.attach_feedback(id, "Excellent".into());
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            rx.borrow_and_update().as_ref().unwrap().feedback,
            FeedbackStatus::Ready("Excellent".into())
        );
    }

    #[test]
    fn summary_over_all_submissions() {
        let store = SubmissionStore::new();
        store.append(submission(4.0));
        store.append(submission(8.0));
        let summary = store.summary(5.0);
        assert_eq!(summary.submissions, 2);
        assert_eq!(summary.average_score, 6.0);
        assert_eq!(summary.pass_rate, 0.5);
    }
}
