//! consultant-pipeline CLI
//!
//! Runs the full transformation pipeline on a transcript file and writes the
//! analysis, BPMN diagram and recommendations to an output directory.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use consultant_pipeline::config::{DEFAULT_MODEL, DEFAULT_RECOMMENDATION_MODEL};
use consultant_pipeline::{run_full_transformation, Event, FnEventHandler, RunOptions, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "consultant-pipeline")]
#[command(version, about = "Transcript to process analysis, BPMN and recommendations", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full transformation on a transcript
    Run {
        /// Transcript file (plain text)
        transcript_path: PathBuf,

        /// Directory for generated files
        #[arg(default_value = "outputs/generated")]
        output_dir: PathBuf,

        /// Industry, budget or priorities passed to the recommendation step
        #[arg(long)]
        business_context: Option<String>,

        /// Keep running later steps after a failure
        #[arg(long)]
        continue_on_error: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(clap::Args)]
struct SettingsArgs {
    /// API key for the generation service
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model for analysis and BPMN generation
    #[arg(long, env = "CONSULTANT_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Model for recommendations
    #[arg(long, env = "CONSULTANT_RECOMMENDATION_MODEL", default_value = DEFAULT_RECOMMENDATION_MODEL)]
    recommendation_model: String,

    /// Directory holding <skill>/SKILL.md and <skill>/domain-knowledge/
    #[arg(long, env = "CONSULTANT_SKILLS_DIR", default_value = "skills")]
    skills_dir: PathBuf,

    /// Service base URL
    #[arg(long, env = "ANTHROPIC_BASE_URL")]
    base_url: Option<String>,

    /// Attempts per generation call, counting the first
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,
}

impl SettingsArgs {
    fn into_settings(self) -> Result<Settings> {
        let Some(api_key) = self.api_key.filter(|k| !k.trim().is_empty()) else {
            bail!("ANTHROPIC_API_KEY not found in environment (set it or pass --api-key)");
        };
        let mut settings = Settings::new(api_key);
        settings.model = self.model;
        settings.recommendation_model = self.recommendation_model;
        settings.skills_dir = self.skills_dir;
        if let Some(url) = self.base_url {
            settings.base_url = url;
        }
        settings.max_attempts = self.max_attempts;
        settings.request_timeout_secs = self.timeout;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            transcript_path,
            output_dir,
            business_context,
            continue_on_error,
            settings,
        } => {
            let settings = settings.into_settings()?;
            let backend = settings.backend().context("failed to build HTTP client")?;

            let progress = FnEventHandler(|event: Event| match event {
                Event::UnitStart { name, index, total } => {
                    println!("[{}/{}] {}", index + 1, total, name)
                }
                Event::UnitEnd { name, ok: false } => println!("      {} failed", name),
                Event::UnitEnd { .. } => {}
                Event::CallRetry { attempt, delay_ms, reason, .. } => {
                    println!("      attempt {} failed ({}), retrying in {}ms", attempt, reason, delay_ms)
                }
            });
            let options = RunOptions {
                business_context,
                stop_on_error: !continue_on_error,
                event_handler: Some(Arc::new(progress)),
            };

            println!("Input:  {}", transcript_path.display());
            println!("Output: {}", output_dir.display());

            let result = run_full_transformation(&transcript_path, &output_dir, &settings, backend, options)
                .await
                .with_context(|| format!("transformation of {} failed", transcript_path.display()))?;

            println!("Total cost: ${:.6}", result.total_cost());
            if result.success {
                println!("Outputs saved to {}", output_dir.display());
            } else {
                eprintln!("Pipeline finished with {} error(s):", result.errors.len());
                for error in &result.errors {
                    eprintln!("  - {}", error);
                }
            }
            Ok(result.success)
        }
    }
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("consultant_pipeline=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("consultant_pipeline=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "consultant-pipeline",
            "run",
            "interview.txt",
            "--business-context",
            "Retail",
            "--continue-on-error",
            "--api-key",
            "k",
        ])
        .unwrap();
        let Commands::Run {
            transcript_path,
            output_dir,
            business_context,
            continue_on_error,
            settings,
        } = cli.command;
        assert_eq!(transcript_path, PathBuf::from("interview.txt"));
        assert_eq!(output_dir, PathBuf::from("outputs/generated"));
        assert_eq!(business_context.as_deref(), Some("Retail"));
        assert!(continue_on_error);

        let settings = settings.into_settings().unwrap();
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
