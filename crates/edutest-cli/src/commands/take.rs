//! The `edutest take` command: an interactive timed session on stdin.
//!
//! Each input line is either `<question-id> <option>` (e.g. `q3 B`), `time`,
//! or `submit`. End of input also submits. When the countdown reaches zero
//! the paper is submitted with whatever has been answered.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use edutest_core::controller::{SessionController, SubmitTrigger};
use edutest_core::model::{Student, Submission, Test};
use edutest_core::scoring::{grade_answers, Outcome};
use edutest_core::session::{format_remaining, Session};
use edutest_core::store::{FeedbackStatus, SubmissionStore};
use edutest_core::timer::TimerEvent;
use edutest_providers::{create_feedback_requester, load_config_from};

use super::preview::render_paper;

/// Remaining time is announced on these ticks.
const ANNOUNCE_EVERY_SECS: u64 = 300;
const FINAL_WARNING_SECS: u64 = 60;

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Answer { question_id: &'a str, key: &'a str },
    Submit,
    Time,
    Blank,
    Unknown,
}

fn parse_input(line: &str) -> Input<'_> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (None, _, _) => Input::Blank,
        (Some(cmd), None, _) if cmd.eq_ignore_ascii_case("submit") => Input::Submit,
        (Some(cmd), None, _) if cmd.eq_ignore_ascii_case("time") => Input::Time,
        (Some(question_id), Some(key), None) => Input::Answer { question_id, key },
        _ => Input::Unknown,
    }
}

/// Derive a student id from a display name: "Nguyen An" -> "nguyen-an".
fn student_id_from_name(name: &str) -> String {
    let id = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if id.is_empty() {
        Student::anonymous().id
    } else {
        id
    }
}

pub async fn execute(
    test_path: PathBuf,
    student_name: String,
    student_id: Option<String>,
    feedback_timeout_secs: u64,
    provider: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let test = Arc::new(edutest_core::parser::parse_test(&test_path)?);
    let feedback = create_feedback_requester(&config, provider.as_deref())?;

    let student_id = student_id.unwrap_or_else(|| student_id_from_name(&student_name));
    let student = Student::new(student_id, student_name);
    let store = SubmissionStore::new();
    let controller = SessionController::new(store.clone(), feedback, student);

    let mut session = controller
        .start(Arc::clone(&test))
        .context("cannot start this test")?;

    print!("{}", render_paper(&test, false));
    println!(
        "\nYou have {}. Answer with `<question-id> <option>`, e.g. `{} A`. \
         Type `time` for the remaining time and `submit` to hand in.",
        format_remaining(session.remaining_secs()),
        test.questions[0].id
    );

    let submission = run_session(&controller, &mut session).await?;
    report(&test, &submission, &store, feedback_timeout_secs, config.pass_mark).await;
    Ok(())
}

async fn run_session(controller: &SessionController, session: &mut Session) -> Result<Submission> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = session.next_timer_event() => {
                let Some(event) = event else {
                    // Countdown gone while still in progress; hand in what we have
                    return controller
                        .submit(session, SubmitTrigger::Expired)
                        .context("session was already submitted");
                };
                if let TimerEvent::Tick { remaining_secs } = event {
                    if remaining_secs == FINAL_WARNING_SECS
                        || (remaining_secs > 0 && remaining_secs % ANNOUNCE_EVERY_SECS == 0)
                    {
                        println!("  {} remaining", format_remaining(remaining_secs));
                    }
                }
                if let Some(submission) = controller.handle_timer_event(session, event) {
                    println!("\nTime is up! Your paper has been submitted.");
                    return Ok(submission);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    return controller
                        .submit(session, SubmitTrigger::Manual)
                        .context("session was already submitted");
                };
                match parse_input(&line) {
                    Input::Answer { question_id, key } => {
                        match controller.record_answer(session, question_id, key) {
                            Ok(()) => {
                                let snapshot = session.snapshot();
                                println!(
                                    "  {question_id}: {key} ({}/{} answered)",
                                    snapshot.answered, snapshot.total_questions
                                );
                            }
                            Err(e) => println!("  Not recorded: {e}"),
                        }
                    }
                    Input::Submit => {
                        return controller
                            .submit(session, SubmitTrigger::Manual)
                            .context("session was already submitted");
                    }
                    Input::Time => {
                        println!("  {} remaining", format_remaining(session.remaining_secs()));
                    }
                    Input::Blank => {}
                    Input::Unknown => {
                        println!("  Expected `<question-id> <option>`, `time` or `submit`.");
                    }
                }
            }
        }
    }
}

async fn report(
    test: &Test,
    submission: &Submission,
    store: &SubmissionStore,
    feedback_timeout_secs: u64,
    pass_mark: f64,
) {
    println!(
        "\n{} scored {:.1}/10 on \"{}\"",
        submission.student_name, submission.score, test.title
    );
    println!("{}", review_table(test, submission));

    let mut rx = store.subscribe();
    let settled = tokio::time::timeout(
        Duration::from_secs(feedback_timeout_secs),
        rx.wait_for(|view| {
            view.as_ref()
                .map_or(true, |v| v.feedback != FeedbackStatus::Pending)
        }),
    )
    .await
    .is_ok();
    if !settled {
        tracing::debug!(submission = %submission.id, "stopped waiting for feedback");
    }

    match store.feedback_status(submission.id) {
        Some(FeedbackStatus::Ready(text)) => println!("\nFeedback:\n{text}"),
        Some(FeedbackStatus::Unavailable) => println!("\nFeedback unavailable."),
        Some(FeedbackStatus::Pending) | None => println!("\nFeedback pending."),
    }

    let summary = store.summary(pass_mark);
    println!(
        "\nClass summary: {} submission(s), average {:.1}, pass rate {}% (pass mark {:.1})",
        summary.submissions,
        summary.average_score,
        summary.pass_percent(),
        pass_mark
    );
}

fn review_table(test: &Test, submission: &Submission) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Section", "Your answer", "Correct", "Result"]);

    for outcome in grade_answers(test, &submission.answers) {
        let kind = test
            .question(&outcome.question_id)
            .map(|q| q.kind.as_str())
            .unwrap_or("-");
        let result = match outcome.outcome {
            Outcome::Correct => "correct",
            Outcome::Incorrect => "wrong",
            Outcome::Unanswered => "blank",
        };
        table.add_row(vec![
            Cell::new(outcome.number),
            Cell::new(&outcome.question_id),
            Cell::new(kind),
            Cell::new(outcome.selected.as_deref().unwrap_or("-")),
            Cell::new(&outcome.correct_answer),
            Cell::new(result),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_input_lines() {
        assert_eq!(
            parse_input("q3 B"),
            Input::Answer {
                question_id: "q3",
                key: "B"
            }
        );
        assert_eq!(parse_input("  SUBMIT "), Input::Submit);
        assert_eq!(parse_input("time"), Input::Time);
        assert_eq!(parse_input("   "), Input::Blank);
        assert_eq!(parse_input("q3 B C"), Input::Unknown);
        assert_eq!(parse_input("hello"), Input::Unknown);
    }

    #[test]
    fn student_ids() {
        assert_eq!(student_id_from_name("Nguyen  An"), "nguyen-an");
        assert_eq!(student_id_from_name(" "), "anonymous");
    }
}
