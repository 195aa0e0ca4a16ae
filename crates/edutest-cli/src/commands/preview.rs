//! The `edutest preview` command, and paper rendering shared with `take`.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use edutest_core::model::{Difficulty, Test};

pub fn execute(test_path: PathBuf, show_answers: bool) -> Result<()> {
    let test = edutest_core::parser::parse_test(&test_path)?;
    print!("{}", render_paper(&test, show_answers));
    Ok(())
}

/// Render the test as a numbered paper. Shared passages are printed once,
/// before the first question that uses them.
pub fn render_paper(test: &Test, show_answers: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", test.title);
    let _ = writeln!(
        out,
        "Grade {} | Class {} | {} | Time: {} minutes",
        test.grade,
        if test.assigned_class.is_empty() {
            "-"
        } else {
            &test.assigned_class
        },
        test.topic,
        test.duration_minutes
    );

    let mut last_passage: Option<&str> = None;
    for (i, q) in test.questions.iter().enumerate() {
        let passage = q.passage.as_deref().filter(|p| !p.trim().is_empty());
        if passage.is_some() && passage != last_passage {
            let _ = writeln!(out, "\n  Read the text:\n  {}", passage.unwrap_or_default());
        }
        last_passage = passage;

        let _ = writeln!(out, "\n{}. [{}] ({}) {}", i + 1, q.id, q.kind, q.content);
        for (key, text) in &q.options {
            let _ = writeln!(out, "   {key}. {text}");
        }
        if show_answers {
            let _ = write!(out, "   Answer: {}", q.correct_answer);
            match q.explanation.as_deref().filter(|e| !e.trim().is_empty()) {
                Some(explanation) => {
                    let _ = writeln!(out, " ({explanation})");
                }
                None => out.push('\n'),
            }
        }
    }
    out
}

/// Table of question counts per section and difficulty.
pub fn overview_table(test: &Test) -> Table {
    let mut sections: Vec<(&str, [usize; 3])> = Vec::new();
    for q in &test.questions {
        let idx = match sections.iter().position(|(kind, _)| *kind == q.kind) {
            Some(idx) => idx,
            None => {
                sections.push((q.kind.as_str(), [0; 3]));
                sections.len() - 1
            }
        };
        sections[idx].1[difficulty_column(q.difficulty)] += 1;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Section",
        "Recognition",
        "Comprehension",
        "Application",
        "Total",
    ]);
    let mut totals = [0usize; 3];
    for (kind, counts) in &sections {
        for (total, n) in totals.iter_mut().zip(counts) {
            *total += n;
        }
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(counts[0]),
            Cell::new(counts[1]),
            Cell::new(counts[2]),
            Cell::new(counts.iter().sum::<usize>()),
        ]);
    }
    table.add_row(vec![
        Cell::new("All"),
        Cell::new(totals[0]),
        Cell::new(totals[1]),
        Cell::new(totals[2]),
        Cell::new(test.questions.len()),
    ]);
    table
}

fn difficulty_column(difficulty: Difficulty) -> usize {
    match difficulty {
        Difficulty::Recognition => 0,
        Difficulty::Comprehension => 1,
        Difficulty::Application => 2,
    }
}

/// Count of questions per difficulty, for one-line summaries.
pub fn difficulty_mix(test: &Test) -> BTreeMap<String, usize> {
    let mut mix = BTreeMap::new();
    for q in &test.questions {
        *mix.entry(q.difficulty.to_string()).or_insert(0) += 1;
    }
    mix
}
