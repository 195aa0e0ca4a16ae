//! The `edutest validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(test_path: PathBuf) -> Result<()> {
    let test = edutest_core::parser::parse_test(&test_path)?;

    println!(
        "Test: {} (grade {}, {} questions, {} min)",
        test.title,
        test.grade,
        test.questions.len(),
        test.duration_minutes
    );

    let warnings = edutest_core::parser::validate_test(&test);
    for w in &warnings {
        let prefix = w
            .question_id
            .as_ref()
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Test valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
