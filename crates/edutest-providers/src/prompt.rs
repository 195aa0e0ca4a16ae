//! Prompt text sent to the AI services.

use std::fmt::Write;

use edutest_core::model::TestRequest;
use edutest_core::traits::FeedbackRequest;

/// System instruction shared by both calls.
pub const SYSTEM_PROMPT: &str = "You are an experienced lower-secondary school English teacher \
who writes competency-based assessments. Be accurate, age-appropriate and concise.";

/// Sections of a generated paper and their question counts, in paper order.
pub const SECTIONS: [(&str, u32); 8] = [
    ("Pronunciation", 5),
    ("Stress", 5),
    ("Vocabulary & Grammar", 15),
    ("Error identification", 5),
    ("Synonyms & Antonyms", 4),
    ("Communication", 3),
    ("Cloze reading", 5),
    ("Reading comprehension", 8),
];

/// Total questions asked for by [`test_generation_prompt`].
pub fn total_questions() -> u32 {
    SECTIONS.iter().map(|(_, n)| n).sum()
}

/// Prompt asking for a complete multiple-choice paper as JSON.
pub fn test_generation_prompt(request: &TestRequest) -> String {
    let mut prompt = format!(
        "Write an English test for grade {grade} on the topic \"{topic}\" (level: {level}).\n\
         The paper has {total} multiple-choice questions in these sections:\n",
        grade = request.grade,
        topic = request.topic,
        level = request.level,
        total = total_questions(),
    );
    for (i, (section, count)) in SECTIONS.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {section}: {count} questions", i + 1);
    }
    prompt.push_str(
        "\nEvery question must have:\n\
         - a unique \"id\" and its section name as \"type\"\n\
         - \"content\", the question text\n\
         - \"options\" with exactly the keys A, B, C and D, none empty\n\
         - \"correctAnswer\", one of A, B, C or D\n\
         - \"difficulty\": recognition, comprehension or application\n\
         - a short \"explanation\"\n\
         For cloze and reading questions put the shared text in \"passage\" on each \
         question that uses it.\n\
         Reply with a JSON object {\"title\": string, \"questions\": [...]} and nothing else.",
    );
    prompt
}

/// Prompt asking for roughly 100 words of feedback on an attempt.
pub fn feedback_prompt(request: &FeedbackRequest) -> String {
    let mut prompt = format!(
        "A student scored {:.1}/10 on a {}-question English test.\n",
        request.score,
        request.questions.len()
    );

    let missed: Vec<_> = request.missed().collect();
    if missed.is_empty() {
        prompt.push_str("Every question was answered correctly.\n");
    } else {
        prompt.push_str("Questions answered wrongly or left blank:\n");
        for (question, selected) in missed {
            let _ = writeln!(
                prompt,
                "- [{}] {} (chose {}, correct {})",
                question.kind,
                question.content,
                selected.unwrap_or("nothing"),
                question.correct_answer
            );
        }
    }

    prompt.push_str(
        "\nIn about 100 words, assess the student's competence and suggest a study plan \
         that targets the weak question types.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use edutest_core::model::{Answers, Difficulty, Question};
    use std::collections::BTreeMap;

    fn question(id: &str, kind: &str, correct: &str) -> Question {
        Question {
            id: id.into(),
            kind: kind.into(),
            difficulty: Difficulty::Recognition,
            content: format!("content of {id}"),
            passage: None,
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|k| (k.to_string(), format!("opt {k}")))
                .collect::<BTreeMap<_, _>>(),
            correct_answer: correct.into(),
            explanation: None,
        }
    }

    #[test]
    fn sections_add_up_to_fifty() {
        assert_eq!(total_questions(), 50);
    }

    #[test]
    fn generation_prompt_mentions_request() {
        let request = TestRequest {
            grade: 9,
            topic: "Natural disasters".into(),
            ..Default::default()
        };
        let prompt = test_generation_prompt(&request);
        assert!(prompt.contains("grade 9"));
        assert!(prompt.contains("\"Natural disasters\""));
        assert!(prompt.contains("8. Reading comprehension: 8 questions"));
        assert!(prompt.contains("correctAnswer"));
    }

    #[test]
    fn feedback_prompt_lists_missed_questions() {
        let mut answers = Answers::new();
        answers.insert("q1".into(), "A".into());
        answers.insert("q2".into(), "C".into());
        let request = FeedbackRequest {
            score: 3.3,
            answers,
            questions: vec![
                question("q1", "Stress", "A"),
                question("q2", "Communication", "B"),
                question("q3", "Reading comprehension", "D"),
            ],
        };
        let prompt = feedback_prompt(&request);
        assert!(prompt.contains("3.3/10"));
        assert!(prompt.contains("[Communication] content of q2 (chose C, correct B)"));
        assert!(prompt.contains("(chose nothing, correct D)"));
        assert!(!prompt.contains("content of q1"));
    }
}
