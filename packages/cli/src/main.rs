mod commands;
mod config;
mod host;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    analyze, apply, check_schema, init, render, AnalyzeArgs, ApplyArgs, CheckSchemaArgs, InitArgs,
    RenderArgs,
};
use config::Config;
use tracing_subscriber::EnvFilter;

/// Stencil CLI - block document templates rendered from JSON data
#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Stencil project
    Init(InitArgs),

    /// Render a template to HTML or a render tree
    Render(RenderArgs),

    /// Report expressions, schema coverage and example validity
    Analyze(AnalyzeArgs),

    /// Check a schema change against the template and save it
    CheckSchema(CheckSchemaArgs),

    /// Apply a list of editor mutations to a template
    Apply(ApplyArgs),
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd)?;
    init_tracing(&config);

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Render(args) => render(args, &config, &cwd).await,
        Command::Analyze(args) => analyze(args, &cwd),
        Command::CheckSchema(args) => check_schema(args, &cwd).await,
        Command::Apply(args) => apply(args, &config, &cwd).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
