use super::{load_template, resolve, Format};
use crate::host::FileHost;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use stencil_schema::{parse_schema, CompatibilityReport, ContractEditor};
use tracing::info;

#[derive(Args, Debug)]
pub struct CheckSchemaArgs {
    /// Template JSON file
    pub template: PathBuf,

    /// JSON Schema file to install
    pub schema: PathBuf,

    /// Save even when examples break or used paths disappear
    #[arg(long)]
    pub force: bool,

    /// Migrate failing examples before saving
    #[arg(long)]
    pub migrate: bool,

    /// Only report, never save
    #[arg(long)]
    pub dry_run: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn check_schema(args: CheckSchemaArgs, cwd: &str) -> Result<()> {
    let format = Format::parse(&args.format)?;
    let template_path = resolve(cwd, &args.template);
    let template = load_template(&template_path)?;

    let schema_path = resolve(cwd, &args.schema);
    let schema_json = std::fs::read_to_string(&schema_path)
        .map_err(|e| anyhow!("Cannot read schema {}: {}", schema_path.display(), e))?;
    let schema = parse_schema(&schema_json)?;

    let host = FileHost::new(&template_path, template.clone());
    let mut editor = ContractEditor::for_template(host, &template);

    let mut report = editor.check(&schema);
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_report(&report),
    }
    if args.dry_run {
        return Ok(());
    }

    if args.migrate && !report.migrations.migrations.is_empty() {
        let applied = editor.apply_migrations(&report.migrations).await?;
        info!(applied, "Migrated data examples");
        if format == Format::Text {
            println!("   {} Applied {} migration(s)", "✓".green(), applied);
        }
        report = editor.check(&schema);
    }

    let outcome = editor.save_schema(schema, args.force).await?;
    if outcome.success {
        let saved = editor.host().template().await;
        info!(examples = saved.data_examples.len(), "Template updated");
        if format == Format::Text {
            println!("{} Schema saved to {}", "✓".green(), editor.host().path().display());
            for warning in &outcome.warnings {
                println!("   {} {}", "⚠".yellow(), warning);
            }
        }
        return Ok(());
    }

    if format == Format::Text && report.compatible {
        // the host refused on its own terms
        for warning in &outcome.warnings {
            println!("   {} {}", "⚠".yellow(), warning);
        }
    }
    Err(anyhow!(
        "Schema update refused ({} warning(s)); rerun with --force or --migrate",
        outcome.warnings.len()
    ))
}

fn print_report(report: &CompatibilityReport) {
    if report.compatible {
        println!("{} Schema is compatible", "✓".green());
    } else {
        println!("{} Schema is not compatible", "✗".red());
    }

    for issue in &report.removed_paths {
        println!("   {} {}", "⚠".yellow(), issue.message);
    }
    for issue in &report.example_issues {
        println!("   {} Example '{}':", "✗".red(), issue.example_name);
        for error in &issue.errors {
            println!("      {}", error);
        }
    }

    if !report.migrations.migrations.is_empty() {
        println!("Proposed migrations:");
        for migration in &report.migrations.migrations {
            println!("   {} [{}] {}", "→".cyan(), migration.example_id, migration);
        }
    }
    for issue in &report.migrations.unresolved {
        println!(
            "   {} [{}] {}: {}",
            "?".yellow(),
            issue.example_id,
            issue.path,
            issue.message
        );
    }
}
