//! Core data model types for edutest.
//!
//! Tests, questions and submissions as they travel between the generation
//! service, the session controller and the presentation layer. The JSON shape
//! uses camelCase field names (`correctAnswer`, `createdAt`, ...), which is also
//! the shape the generation service is asked to produce.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigurationError;

/// Selected option key per question id. At most one answer per question.
pub type Answers = BTreeMap<String, String>;

/// Option keys a question is expected to use, in display order.
pub const OPTION_KEYS: [&str; 4] = ["A", "B", "C", "D"];

/// Grades a generated test may target (lower secondary).
pub const SUPPORTED_GRADES: std::ops::RangeInclusive<u32> = 6..=9;

/// Cognitive tier of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Difficulty {
    Recognition,
    Comprehension,
    Application,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Recognition => write!(f, "recognition"),
            Difficulty::Comprehension => write!(f, "comprehension"),
            Difficulty::Application => write!(f, "application"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Generated content labels tiers in Vietnamese as often as in English.
        match s.trim().to_lowercase().as_str() {
            "recognition" | "nhận biết" => Ok(Difficulty::Recognition),
            "comprehension" | "thông hiểu" => Ok(Difficulty::Comprehension),
            "application" | "vận dụng" => Ok(Difficulty::Application),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Difficulty> for String {
    fn from(value: Difficulty) -> Self {
        value.to_string()
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within its test.
    pub id: String,
    /// Free-form category tag ("Pronunciation", "Reading", ...), used for grouping.
    #[serde(rename = "type", default)]
    pub kind: String,
    pub difficulty: Difficulty,
    /// The question text.
    pub content: String,
    /// Reading passage shared by several questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    /// Option key → option text.
    pub options: BTreeMap<String, String>,
    /// Key of the correct option.
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Check the construction-time invariants of a question.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.options.is_empty() {
            return Err(ConfigurationError::NoOptions {
                question_id: self.id.clone(),
            });
        }
        if let Some((key, _)) = self.options.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(ConfigurationError::EmptyOption {
                question_id: self.id.clone(),
                key: key.clone(),
            });
        }
        if !self.options.contains_key(&self.correct_answer) {
            return Err(ConfigurationError::CorrectAnswerNotAnOption {
                question_id: self.id.clone(),
                key: self.correct_answer.clone(),
            });
        }
        Ok(())
    }

    /// Whether `key` names one of this question's options.
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }
}

/// An ordered set of questions with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: String,
    pub title: String,
    /// Target grade level.
    pub grade: u32,
    pub topic: String,
    /// Time allowed, in minutes.
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    /// Questions in paper order.
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    /// Class or group the test is assigned to.
    #[serde(default)]
    pub assigned_class: String,
}

impl Test {
    /// Build a test from the generation service's payload.
    ///
    /// Rejects an empty question list and any question that breaks its
    /// invariants. A blank title falls back to one derived from the request.
    pub fn from_generated(
        request: &TestRequest,
        payload: GeneratedTest,
    ) -> Result<Self, ConfigurationError> {
        request.validate()?;

        let title = if payload.title.trim().is_empty() {
            format!(
                "English Test – Grade {} – {}",
                request.grade, request.topic
            )
        } else {
            payload.title
        };

        let test = Test {
            id: Uuid::new_v4().to_string(),
            title,
            grade: request.grade,
            topic: request.topic.clone(),
            duration_minutes: request.duration_minutes,
            questions: payload.questions,
            created_at: Utc::now(),
            assigned_class: request.assigned_class.clone(),
        };
        test.validate()?;
        Ok(test)
    }

    /// Check that this test can be taken: positive grade and duration, at
    /// least one question, unique question ids, and every question well-formed.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.grade == 0 {
            return Err(ConfigurationError::UnsupportedGrade(self.grade));
        }
        if self.duration_minutes == 0 {
            return Err(ConfigurationError::InvalidDuration {
                test_id: self.id.clone(),
                minutes: self.duration_minutes,
            });
        }
        if self.questions.is_empty() {
            return Err(ConfigurationError::NoQuestions {
                test_id: self.id.clone(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.questions.iter().find(|q| !seen.insert(q.id.as_str())) {
            return Err(ConfigurationError::DuplicateQuestionId {
                test_id: self.id.clone(),
                question_id: dup.id.clone(),
            });
        }
        self.questions.iter().try_for_each(Question::validate)
    }

    /// Countdown length for a session on this test.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// The generation service's payload: a title and its questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// The teacher's parameters for generating a test.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub grade: u32,
    pub topic: String,
    /// Free-form difficulty level passed to the generator ("Standard", "Advanced", ...).
    pub level: String,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub assigned_class: String,
}

impl TestRequest {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !SUPPORTED_GRADES.contains(&self.grade) {
            return Err(ConfigurationError::UnsupportedGrade(self.grade));
        }
        if self.duration_minutes == 0 {
            return Err(ConfigurationError::InvalidDuration {
                test_id: String::new(),
                minutes: 0,
            });
        }
        Ok(())
    }
}

impl Default for TestRequest {
    fn default() -> Self {
        Self {
            grade: 6,
            topic: "My New School".to_string(),
            level: "Standard".to_string(),
            duration_minutes: 45,
            assigned_class: "6A1".to_string(),
        }
    }
}

/// Who is taking a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous", "Anonymous student")
    }
}

/// The record of one completed attempt at a test.
///
/// Everything except `feedback` is fixed when the submission is created;
/// feedback goes from absent to present at most once, through the
/// [`SubmissionStore`](crate::store::SubmissionStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub test_id: String,
    pub student_id: String,
    pub student_name: String,
    pub answers: Answers,
    /// Score out of 10, rounded to one decimal place.
    pub score: f64,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A four-option question whose correct key is `correct`.
    pub fn question(id: &str, correct: &str) -> Question {
        Question {
            id: id.into(),
            kind: "Vocabulary & Grammar".into(),
            difficulty: Difficulty::Recognition,
            content: format!("Question {id}"),
            passage: None,
            options: OPTION_KEYS
                .iter()
                .map(|k| (k.to_string(), format!("option {k}")))
                .collect(),
            correct_answer: correct.into(),
            explanation: Some("Because.".into()),
        }
    }

    /// A test whose question `i` has id `q{i+1}` and correct key `keys[i]`.
    pub fn test_with_keys(keys: &[&str], duration_minutes: u32) -> Test {
        Test {
            id: "test-1".into(),
            title: "Unit 1: My New School".into(),
            grade: 6,
            topic: "My New School".into(),
            duration_minutes,
            questions: keys
                .iter()
                .enumerate()
                .map(|(i, k)| question(&format!("q{}", i + 1), k))
                .collect(),
            created_at: Utc::now(),
            assigned_class: "6A1".into(),
        }
    }

    pub fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn difficulty_display_and_parse() {
        assert_eq!(Difficulty::Recognition.to_string(), "recognition");
        assert_eq!(
            "Comprehension".parse::<Difficulty>().unwrap(),
            Difficulty::Comprehension
        );
        assert_eq!(
            "Nhận biết".parse::<Difficulty>().unwrap(),
            Difficulty::Recognition
        );
        assert_eq!(
            " Vận dụng ".parse::<Difficulty>().unwrap(),
            Difficulty::Application
        );
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn question_requires_correct_answer_among_options() {
        let mut q = question("q1", "A");
        assert!(q.validate().is_ok());

        q.correct_answer = "E".into();
        assert_eq!(
            q.validate(),
            Err(ConfigurationError::CorrectAnswerNotAnOption {
                question_id: "q1".into(),
                key: "E".into()
            })
        );
    }

    #[test]
    fn question_rejects_blank_option_text() {
        let mut q = question("q1", "A");
        q.options.insert("C".into(), "  ".into());
        assert!(matches!(
            q.validate(),
            Err(ConfigurationError::EmptyOption { key, .. }) if key == "C"
        ));

        q.options.clear();
        assert!(matches!(
            q.validate(),
            Err(ConfigurationError::NoOptions { .. })
        ));
    }

    #[test]
    fn test_validation() {
        assert!(test_with_keys(&["A", "B"], 15).validate().is_ok());
        assert!(matches!(
            test_with_keys(&[], 15).validate(),
            Err(ConfigurationError::NoQuestions { .. })
        ));
        assert!(matches!(
            test_with_keys(&["A"], 0).validate(),
            Err(ConfigurationError::InvalidDuration { minutes: 0, .. })
        ));

        let mut ungraded = test_with_keys(&["A"], 15);
        ungraded.grade = 0;
        assert_eq!(
            ungraded.validate(),
            Err(ConfigurationError::UnsupportedGrade(0))
        );
    }

    #[test]
    fn test_rejects_repeated_question_ids() {
        let mut test = test_with_keys(&["A", "B", "C"], 15);
        test.questions[2].id = "q1".into();
        assert_eq!(
            test.validate(),
            Err(ConfigurationError::DuplicateQuestionId {
                test_id: "test-1".into(),
                question_id: "q1".into(),
            })
        );
    }

    #[test]
    fn duration_in_seconds() {
        assert_eq!(test_with_keys(&["A"], 15).duration_secs(), 900);
        assert_eq!(test_with_keys(&["A"], 45).duration_secs(), 2700);
    }

    #[test]
    fn from_generated_rejects_empty_payload() {
        let payload = GeneratedTest {
            title: "Empty".into(),
            questions: vec![],
        };
        let err = Test::from_generated(&TestRequest::default(), payload).unwrap_err();
        assert!(matches!(err, ConfigurationError::NoQuestions { .. }));
    }

    #[test]
    fn from_generated_fills_metadata() {
        let request = TestRequest {
            grade: 8,
            topic: "Festivals".into(),
            duration_minutes: 15,
            ..Default::default()
        };
        let payload = GeneratedTest {
            title: "   ".into(),
            questions: vec![question("q1", "B")],
        };
        let test = Test::from_generated(&request, payload).unwrap();
        assert_eq!(test.grade, 8);
        assert_eq!(test.duration_minutes, 15);
        assert_eq!(test.assigned_class, "6A1");
        assert!(test.title.contains("Grade 8"));
        assert!(test.title.contains("Festivals"));
        assert!(Uuid::parse_str(&test.id).is_ok());
    }

    #[test]
    fn test_request_grade_range() {
        let mut request = TestRequest::default();
        assert!(request.validate().is_ok());
        request.grade = 10;
        assert_eq!(
            request.validate(),
            Err(ConfigurationError::UnsupportedGrade(10))
        );
    }

    #[test]
    fn question_json_shape() {
        let json = r#"{
            "id": "q1",
            "type": "Pronunciation",
            "difficulty": "Thông hiểu",
            "content": "Choose the word whose underlined part is pronounced differently.",
            "options": {"A": "school", "B": "chair", "C": "teacher", "D": "lunch"},
            "correctAnswer": "A",
            "explanation": "/k/ versus /tʃ/"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.kind, "Pronunciation");
        assert_eq!(q.difficulty, Difficulty::Comprehension);
        assert_eq!(q.correct_answer, "A");
        assert!(q.passage.is_none());

        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["difficulty"], "comprehension");
        assert_eq!(value["correctAnswer"], "A");
        assert!(value.get("passage").is_none());
    }
}
