use super::{load_json, load_template, resolve};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use stencil_editor::{Mutation, TemplateStore};
use stencil_renderer::{PreviewScheduler, PreviewUpdate};
use std::sync::Arc;
use tracing::{info, warn};

/// Upper bound on waiting for the final preview pass
const PREVIEW_WAIT: Duration = Duration::from_secs(30);

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Template JSON file
    pub template: PathBuf,

    /// JSON file holding an array of mutations
    pub mutations: PathBuf,

    /// Write the edited template here instead of over the input
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Also write the live preview HTML of the result
    #[arg(long)]
    pub preview: Option<PathBuf>,

    /// Stored data example used by the preview (defaults to the first one)
    #[arg(short, long)]
    pub example: Option<String>,

    /// Pretty print the preview HTML
    #[arg(long)]
    pub pretty: bool,

    /// Emit the preview as a complete page document
    #[arg(long)]
    pub full_page: bool,
}

pub async fn apply(args: ApplyArgs, config: &Config, cwd: &str) -> Result<()> {
    let template_path = resolve(cwd, &args.template);
    let template = load_template(&template_path)?;
    let mutations: Vec<Mutation> = serde_json::from_value(load_json(&resolve(cwd, &args.mutations))?)
        .context("Mutations file must hold an array of mutations")?;

    let data = match &args.example {
        Some(id) => template
            .data_example(id)
            .map(|example| example.data.clone())
            .ok_or_else(|| anyhow!("Data example not found: {}", id))?,
        None => template
            .data_examples
            .first()
            .map(|example| example.data.clone())
            .unwrap_or_default(),
    };

    let mut store = TemplateStore::with_history_limit(template, config.history_limit);
    let scheduler = args.preview.as_ref().map(|_| {
        let scheduler = PreviewScheduler::new(
            config.evaluator(),
            config.preview_options(args.pretty, args.full_page),
        );
        scheduler.set_data(data);
        scheduler.attach(&mut store);
        scheduler
    });

    println!("{} {} mutation(s)", "✏️ Applying".bright_blue().bold(), mutations.len());
    let mut rejected = 0;
    for (index, mutation) in mutations.into_iter().enumerate() {
        let name = mutation.name();
        match store.try_apply(mutation) {
            Ok(()) => println!("  {} #{} {}", "✓".green(), index, name),
            Err(e) => {
                rejected += 1;
                warn!(index, mutation = name, error = %e, "Mutation rejected");
                println!("  {} #{} {}: {}", "✗".red(), index, name, e);
            }
        }
    }

    let out_path = args
        .out
        .as_ref()
        .map(|path| resolve(cwd, path))
        .unwrap_or_else(|| template_path.clone());
    fs::write(&out_path, store.template().to_json_pretty()?)?;
    info!(path = %out_path.display(), version = store.version(), "Wrote template");
    println!("{} Saved {}", "✓".green(), out_path.display());

    if let (Some(scheduler), Some(preview)) = (&scheduler, &args.preview) {
        let update = wait_for_latest(scheduler).await?;
        let preview_path = resolve(cwd, preview);
        fs::write(&preview_path, &update.output.html)?;
        println!(
            "{} Preview {} (generation {}, {} diagnostic(s))",
            "✓".green(),
            preview_path.display(),
            update.generation,
            update.output.diagnostics.len()
        );
    }

    if rejected > 0 {
        println!("{} {} mutation(s) rejected", "⚠".yellow(), rejected);
    }
    Ok(())
}

/// Wait until the preview publishes the newest generation
async fn wait_for_latest(scheduler: &PreviewScheduler) -> Result<Arc<PreviewUpdate>> {
    let target = scheduler.generation();
    let mut updates = scheduler.subscribe();

    let wait = async {
        loop {
            if let Some(update) = updates.borrow_and_update().clone() {
                if update.generation >= target {
                    return Ok::<_, anyhow::Error>(update);
                }
            }
            updates
                .changed()
                .await
                .map_err(|_| anyhow!("Preview worker stopped"))?;
        }
    };

    tokio::time::timeout(PREVIEW_WAIT, wait)
        .await
        .map_err(|_| anyhow!("Timed out waiting for the preview"))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_model::Template;

    #[tokio::test]
    async fn test_apply_writes_template_and_preview() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().to_string_lossy().to_string();

        let mut template = Template::new("t", "Before");
        template
            .add_data_example(stencil_model::DataExample::new(
                "e1",
                "One",
                json!({ "who": "Ada" }).as_object().cloned().unwrap(),
            ))
            .unwrap();
        fs::write(dir.path().join("template.json"), template.to_json_pretty().unwrap()).unwrap();

        let mutations = json!([
            { "RenameTemplate": { "name": "After" } },
            { "RemoveBlock": { "block_id": "missing" } }
        ]);
        fs::write(dir.path().join("edits.json"), mutations.to_string()).unwrap();

        let args = ApplyArgs {
            template: PathBuf::from("template.json"),
            mutations: PathBuf::from("edits.json"),
            out: None,
            preview: Some(PathBuf::from("preview.html")),
            example: None,
            pretty: false,
            full_page: true,
        };
        let config = Config {
            debounce_ms: 10,
            ..Config::default()
        };
        apply(args, &config, &cwd).await.unwrap();

        let saved = load_template(&dir.path().join("template.json")).unwrap();
        assert_eq!(saved.name, "After");

        let html = fs::read_to_string(dir.path().join("preview.html")).unwrap();
        assert!(html.contains("<title>After</title>"));
    }
}
