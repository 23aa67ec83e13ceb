//! Sandboxed LLM tool-calling agent CLI.
//!
//! Hands the prompt to the model and lets it drive the four sandboxed tools
//! against `--root` until it answers or the round budget runs out. The final
//! answer goes to stdout; everything else (tool traffic, diagnostics) goes
//! to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use sandrun::exit_codes;
use sandrun::io::config::load_config;
use sandrun::io::model::GeminiModel;
use sandrun::io::sandbox::WorkingRoot;
use sandrun::looping::{LoopStop, run_loop};
use sandrun::registry::ToolRegistry;

#[derive(Parser)]
#[command(name = "sandrun", version, about = "Sandboxed LLM tool-calling agent")]
struct Cli {
    /// The prompt to hand to the model. Quote it if it contains spaces.
    prompt: String,

    /// Directory the agent is confined to.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Optional TOML config path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print tool traffic and token counts to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    sandrun::logging::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    let root = WorkingRoot::new(&cli.root)?;
    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;

    let registry = ToolRegistry::new(root, config.read_limit_chars, config.script_policy());
    let model = GeminiModel::new(api_key, config.model.clone());

    let verbose = cli.verbose;
    let outcome = run_loop(&model, &registry, &cli.prompt, config.max_rounds, |record| {
        if verbose {
            eprintln!("[round {}] {}:\n{}", record.round, record.tool, record.result);
        }
    })?;

    if verbose {
        eprintln!("Prompt tokens: {}", outcome.usage.prompt);
        eprintln!("Response tokens: {}", outcome.usage.response);
    }

    match outcome.stop {
        LoopStop::Finished(text) => {
            println!("{text}");
            Ok(exit_codes::OK)
        }
        LoopStop::BudgetExhausted { rounds } => {
            eprintln!("No final answer after {rounds} rounds.");
            Ok(exit_codes::BUDGET_EXHAUSTED)
        }
        LoopStop::ProtocolViolation { round } => {
            eprintln!("Model reply at round {round} carried neither an answer nor a tool call.");
            Ok(exit_codes::PROTOCOL_VIOLATION)
        }
    }
}
