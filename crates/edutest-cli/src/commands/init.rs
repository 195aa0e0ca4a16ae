//! The `edutest init` command.

use std::path::Path;

use anyhow::Result;

use edutest_core::model::{Test, TestRequest};
use edutest_core::parser::write_test;
use edutest_providers::mock::sample_payload;

const SAMPLE_TEST_PATH: &str = "sample-test.json";

pub fn execute() -> Result<()> {
    if Path::new("edutest.toml").exists() {
        println!("edutest.toml already exists, skipping.");
    } else {
        std::fs::write("edutest.toml", SAMPLE_CONFIG)?;
        println!("Created edutest.toml");
    }

    let sample = Path::new(SAMPLE_TEST_PATH);
    if sample.exists() {
        println!("{SAMPLE_TEST_PATH} already exists, skipping.");
    } else {
        let request = TestRequest {
            duration_minutes: 15,
            ..TestRequest::default()
        };
        let test = Test::from_generated(&request, sample_payload())?;
        write_test(&test, sample)?;
        println!("Created {SAMPLE_TEST_PATH}");
    }

    println!("\nNext steps:");
    println!("  1. Edit edutest.toml with your API keys");
    println!("  2. Run: edutest preview --test {SAMPLE_TEST_PATH}");
    println!("  3. Run: edutest take --test {SAMPLE_TEST_PATH} --student \"Nguyen An\"");
    println!("  4. Run: edutest generate --grade 7 --topic \"Hobbies\" --output hobbies.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# edutest configuration

default_provider = "gemini"
default_model = "gemini-2.5-flash"
# feedback_model = "gemini-2.5-flash-lite"
request_timeout_secs = 120
pass_mark = 5.0

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.offline]
type = "mock"
"#;
