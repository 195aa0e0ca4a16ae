//! The `edutest generate` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use edutest_core::model::{Test, TestRequest};
use edutest_core::parser;
use edutest_providers::{create_generator, load_config_from};

use super::preview::{difficulty_mix, overview_table};

pub async fn execute(
    request: TestRequest,
    output: PathBuf,
    provider: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    // Reject bad parameters before spending an API call
    request.validate()?;

    let config = load_config_from(config_path.as_deref())?;
    let generator = create_generator(&config, provider.as_deref())?;

    eprintln!(
        "Generating grade {} test on \"{}\" with {}...",
        request.grade,
        request.topic,
        generator.name()
    );
    let start = Instant::now();

    let payload = generator
        .generate_test(&request)
        .await
        .context("test generation failed")?;
    let test = Test::from_generated(&request, payload)
        .context("generated test is not usable")?;

    tracing::info!(
        test = %test.id,
        questions = test.questions.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "test generated"
    );

    parser::write_test(&test, &output)?;

    println!("{}", test.title);
    println!("{}", overview_table(&test));
    let mix: Vec<String> = difficulty_mix(&test)
        .iter()
        .map(|(level, n)| format!("{level} {n}"))
        .collect();
    println!("Difficulty mix: {}", mix.join(", "));

    for w in parser::validate_test(&test) {
        let id = w.question_id.unwrap_or_default();
        eprintln!("  [{id}] WARNING: {}", w.message);
    }

    println!("Saved to {}", output.display());
    Ok(())
}
