use super::{load_data, load_template, resolve};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use serde_json::Map;
use std::fs;
use std::path::PathBuf;
use stencil_renderer::{render_template, RenderOverrides};
use tracing::info;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template JSON file
    pub template: PathBuf,

    /// JSON file with the data to render
    #[arg(short, long, conflicts_with = "example")]
    pub data: Option<PathBuf>,

    /// Render against a stored data example
    #[arg(short, long)]
    pub example: Option<String>,

    /// JSON file with preview overrides
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Pretty print HTML
    #[arg(long)]
    pub pretty: bool,

    /// Emit a complete page document
    #[arg(long)]
    pub full_page: bool,

    /// Output format (html, json)
    #[arg(short, long, default_value = "html")]
    pub format: String,
}

pub async fn render(args: RenderArgs, config: &Config, cwd: &str) -> Result<()> {
    let template_path = resolve(cwd, &args.template);
    let template = load_template(&template_path)?;

    let data = match (&args.data, &args.example) {
        (Some(path), _) => load_data(&resolve(cwd, path))?,
        (None, Some(id)) => template
            .data_example(id)
            .map(|example| example.data.clone())
            .ok_or_else(|| anyhow!("Data example not found: {}", id))?,
        (None, None) => template
            .data_examples
            .first()
            .map(|example| example.data.clone())
            .unwrap_or_else(Map::new),
    };

    let overrides: RenderOverrides = match &args.overrides {
        Some(path) => serde_json::from_value(super::load_json(&resolve(cwd, path))?)?,
        None => RenderOverrides::default(),
    };

    let evaluator = config.evaluator();
    let options = config.render_options(args.pretty, args.full_page);
    let output = render_template(&template, &data, &overrides, evaluator.as_ref(), &options).await;

    for diagnostic in &output.diagnostics {
        eprintln!(
            "{} {} [{}] {}",
            "⚠".yellow(),
            diagnostic.block_id.bright_white(),
            diagnostic.expression,
            diagnostic.message
        );
    }

    let rendered = match args.format.as_str() {
        "html" => output.html.clone(),
        "json" => output.to_json()?,
        other => return Err(anyhow!("Invalid format: {}. Use: html or json", other)),
    };

    match &args.out {
        Some(path) => {
            let path = resolve(cwd, path);
            fs::write(&path, rendered)?;
            info!(path = %path.display(), diagnostics = output.diagnostics.len(), "Rendered template");
            eprintln!("{} Wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
