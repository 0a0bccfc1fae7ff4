use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use stencil_editor::TemplateStore;
use stencil_model::rich_text::{doc, expression_node, heading, paragraph, text_node};
use stencil_model::{Block, DataExample, Template};

pub const STARTER_TEMPLATE_NAME: &str = "template.json";

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Also write a starter template
    #[arg(short, long)]
    pub template: bool,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Stencil project...".bright_blue().bold());

    let config = Config::default();
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    if args.template {
        let template_path = PathBuf::from(cwd).join(STARTER_TEMPLATE_NAME);
        if template_path.exists() && !args.force {
            println!("  {} {} already exists, skipped", "⚠️".yellow(), STARTER_TEMPLATE_NAME);
        } else {
            let template = starter_template(&config)?;
            fs::write(&template_path, template.to_json_pretty()?)?;
            println!("  {} Created {}", "✓".green(), STARTER_TEMPLATE_NAME);
        }
    }

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}", STARTER_TEMPLATE_NAME);
    println!("  2. Run: stencil render {} --example sample", STARTER_TEMPLATE_NAME);

    Ok(())
}

/// Greeting, line items and a sample data example, built through the store
fn starter_template(config: &Config) -> Result<Template> {
    let mut store = TemplateStore::with_history_limit(Template::new("starter", "Starter"), config.history_limit);

    let greeting = Block::text(
        "greeting",
        doc(vec![
            heading(1, vec![text_node("Invoice")]),
            paragraph(vec![text_node("Dear "), expression_node("customer.name")]),
        ]),
    );
    let lines = Block::repeat(
        "lines",
        "items",
        "item",
        vec![Block::text(
            "line",
            doc(vec![paragraph(vec![
                expression_node("item.description"),
                text_node(": "),
                expression_node("item.price.toFixed(2)"),
            ])]),
        )],
    );

    for block in [greeting, lines] {
        store.try_apply(stencil_editor::Mutation::InsertBlock {
            parent_id: None,
            index: None,
            block,
        })?;
    }

    let mut template = (*store.template()).clone();
    let data = json!({
        "customer": { "name": "Ada Lovelace" },
        "items": [
            { "description": "Analytical engine", "price": 1200 },
            { "description": "Punch cards", "price": 35.5 }
        ]
    });
    if let serde_json::Value::Object(map) = data {
        template.add_data_example(DataExample::new("sample", "Sample", map))?;
    }
    Ok(template)
}
