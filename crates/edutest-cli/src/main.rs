//! edutest CLI: generate, preview and take timed English tests.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "edutest", version, about = "AI-assisted English test generation and timed sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a test with the configured AI provider
    Generate {
        /// Grade level (6-9)
        #[arg(long, default_value = "6")]
        grade: u32,

        /// Unit topic
        #[arg(long, default_value = "My New School")]
        topic: String,

        /// Difficulty level passed to the generator
        #[arg(long, default_value = "Standard")]
        level: String,

        /// Time limit in minutes
        #[arg(long, default_value = "45")]
        duration: u32,

        /// Class the test is assigned to
        #[arg(long, default_value = "6A1")]
        class: String,

        /// Where to write the test JSON
        #[arg(long, default_value = "test.json")]
        output: PathBuf,

        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check a test file for errors and warnings
    Validate {
        /// Path to the test JSON
        #[arg(long)]
        test: PathBuf,
    },

    /// Print a test as a paper
    Preview {
        /// Path to the test JSON
        #[arg(long)]
        test: PathBuf,

        /// Include the answer key and explanations
        #[arg(long)]
        answers: bool,
    },

    /// Take a timed test on the terminal
    Take {
        /// Path to the test JSON
        #[arg(long)]
        test: PathBuf,

        /// Student name
        #[arg(long, default_value = "Anonymous student")]
        student: String,

        /// Student id (default: derived from the name)
        #[arg(long)]
        student_id: Option<String>,

        /// Seconds to wait for feedback after submitting
        #[arg(long, default_value = "30")]
        feedback_timeout: u64,

        /// Provider name from the config (default: default_provider)
        #[arg(long)]
        provider: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and a sample test
    Init,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("warn,edutest_core=info,edutest_providers=info,edutest_cli=info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            grade,
            topic,
            level,
            duration,
            class,
            output,
            provider,
            config,
        } => {
            let request = edutest_core::TestRequest {
                grade,
                topic,
                level,
                duration_minutes: duration,
                assigned_class: class,
            };
            commands::generate::execute(request, output, provider, config).await
        }
        Commands::Validate { test } => commands::validate::execute(test),
        Commands::Preview { test, answers } => commands::preview::execute(test, answers),
        Commands::Take {
            test,
            student,
            student_id,
            feedback_timeout,
            provider,
            config,
        } => {
            commands::take::execute(test, student, student_id, feedback_timeout, provider, config)
                .await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
