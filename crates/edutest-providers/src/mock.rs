//! Offline provider for tests and demos.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use edutest_core::model::{Difficulty, GeneratedTest, Question, TestRequest};
use edutest_core::traits::{FeedbackRequest, FeedbackRequester, TestGenerator};
use edutest_core::ServiceError;

/// Default feedback text returned by [`MockProvider`].
pub const DEFAULT_FEEDBACK: &str =
    "Good effort. Review the question types you missed and practise a few each day.";

/// A provider that answers from memory without network calls.
///
/// Generation returns a fixed payload (a short sample paper unless one is
/// configured); feedback returns fixed text or fails on demand.
pub struct MockProvider {
    payload: GeneratedTest,
    feedback: String,
    fail: bool,
    delay: Option<Duration>,
    generate_calls: AtomicU32,
    feedback_calls: AtomicU32,
    last_feedback_request: Mutex<Option<FeedbackRequest>>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            payload: sample_payload(),
            feedback: DEFAULT_FEEDBACK.to_string(),
            fail: false,
            delay: None,
            generate_calls: AtomicU32::new(0),
            feedback_calls: AtomicU32::new(0),
            last_feedback_request: Mutex::new(None),
        }
    }

    pub fn with_payload(mut self, payload: GeneratedTest) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_feedback(mut self, text: &str) -> Self {
        self.feedback = text.to_string();
        self
    }

    /// Make every call fail with a network error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Wait this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn generate_calls(&self) -> u32 {
        self.generate_calls.load(Ordering::Relaxed)
    }

    pub fn feedback_calls(&self) -> u32 {
        self.feedback_calls.load(Ordering::Relaxed)
    }

    pub fn last_feedback_request(&self) -> Option<FeedbackRequest> {
        self.last_feedback_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn respond(&self) -> Result<(), ServiceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ServiceError::Network("mock provider configured to fail".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TestGenerator for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_test(&self, _request: &TestRequest) -> Result<GeneratedTest, ServiceError> {
        self.generate_calls.fetch_add(1, Ordering::Relaxed);
        self.respond().await?;
        Ok(self.payload.clone())
    }
}

#[async_trait]
impl FeedbackRequester for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn request_feedback(&self, request: &FeedbackRequest) -> Result<String, ServiceError> {
        self.feedback_calls.fetch_add(1, Ordering::Relaxed);
        *self
            .last_feedback_request
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        self.respond().await?;
        Ok(self.feedback.clone())
    }
}

fn options(a: &str, b: &str, c: &str, d: &str) -> BTreeMap<String, String> {
    [("A", a), ("B", b), ("C", c), ("D", d)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A four-question paper on "My New School".
pub fn sample_payload() -> GeneratedTest {
    let passage = "Mai goes to Kim Lien School. She has Maths and English on Monday. \
                   At break time she plays football with her new friends.";
    GeneratedTest {
        title: "Unit 1: My New School".to_string(),
        questions: vec![
            Question {
                id: "q1".into(),
                kind: "Pronunciation".into(),
                difficulty: Difficulty::Recognition,
                content: "Choose the word whose underlined part is pronounced differently."
                    .into(),
                passage: None,
                options: options("school", "chair", "teacher", "lunch"),
                correct_answer: "A".into(),
                explanation: Some("'ch' in school is /k/; the others are /tʃ/.".into()),
            },
            Question {
                id: "q2".into(),
                kind: "Vocabulary & Grammar".into(),
                difficulty: Difficulty::Comprehension,
                content: "We ___ English on Mondays and Fridays.".into(),
                passage: None,
                options: options("has", "have", "having", "to have"),
                correct_answer: "B".into(),
                explanation: Some("Present simple with 'we' takes the base form.".into()),
            },
            Question {
                id: "q3".into(),
                kind: "Reading comprehension".into(),
                difficulty: Difficulty::Recognition,
                content: "What does Mai have on Monday?".into(),
                passage: Some(passage.into()),
                options: options("Science", "Music", "Maths and English", "History"),
                correct_answer: "C".into(),
                explanation: Some("The passage says Maths and English on Monday.".into()),
            },
            Question {
                id: "q4".into(),
                kind: "Reading comprehension".into(),
                difficulty: Difficulty::Application,
                content: "What can we infer about Mai?".into(),
                passage: Some(passage.into()),
                options: options(
                    "She dislikes sport",
                    "She is new at the school",
                    "She walks to school",
                    "She teaches Maths",
                ),
                correct_answer: "B".into(),
                explanation: Some("She plays with her 'new friends'.".into()),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutest_core::model::{Answers, Test};

    #[tokio::test]
    async fn sample_payload_builds_a_valid_test() {
        let mock = MockProvider::new();
        let request = TestRequest::default();
        let payload = mock.generate_test(&request).await.unwrap();
        let test = Test::from_generated(&request, payload).unwrap();
        assert_eq!(test.questions.len(), 4);
        assert_eq!(test.title, "Unit 1: My New School");
        assert_eq!(mock.generate_calls(), 1);
    }

    #[tokio::test]
    async fn records_feedback_requests() {
        let mock = MockProvider::new().with_feedback("Well done.");
        let request = FeedbackRequest {
            score: 10.0,
            answers: Answers::new(),
            questions: sample_payload().questions,
        };
        assert_eq!(mock.request_feedback(&request).await.unwrap(), "Well done.");
        assert_eq!(mock.feedback_calls(), 1);
        assert_eq!(mock.last_feedback_request().unwrap().questions.len(), 4);
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let mock = MockProvider::new().failing();
        let err = mock
            .generate_test(&TestRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Network(_)));
        assert!(!err.is_permanent());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_holds_the_reply() {
        let mock = MockProvider::new().with_delay(Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        mock.generate_test(&TestRequest::default()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
