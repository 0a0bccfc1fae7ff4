use super::{load_template, resolve, Format};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use stencil_model::{SchemaIssue, Template};
use stencil_schema::{
    analyze_schema_impact, extract_bound_expressions, extract_expressions,
    get_expression_coverage, validate_data, ExpressionCoverage, ValidationError,
};

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Template JSON file
    pub template: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleReport {
    pub id: String,
    pub name: String,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub template_id: String,
    pub expressions: Vec<String>,
    /// Data paths after loop aliases are resolved
    pub paths: Vec<String>,
    pub coverage: Option<ExpressionCoverage>,
    pub issues: Vec<SchemaIssue>,
    pub examples: Vec<ExampleReport>,
}

impl Analysis {
    pub fn of(template: &Template) -> Self {
        let expressions = extract_expressions(&template.blocks);
        let paths = extract_bound_expressions(&template.blocks);

        let (coverage, issues, examples) = match &template.schema {
            Some(schema) => (
                Some(get_expression_coverage(schema, &paths)),
                analyze_schema_impact(schema, &paths),
                template
                    .data_examples
                    .iter()
                    .map(|example| ExampleReport {
                        id: example.id.clone(),
                        name: example.name.clone(),
                        errors: validate_data(schema, &Value::Object(example.data.clone())),
                    })
                    .collect(),
            ),
            None => (None, Vec::new(), Vec::new()),
        };

        Self {
            template_id: template.id.clone(),
            expressions: expressions.into_iter().collect(),
            paths: paths.into_iter().collect(),
            coverage,
            issues,
            examples,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.examples.iter().all(|example| example.errors.is_empty())
    }
}

pub fn analyze(args: AnalyzeArgs, cwd: &str) -> Result<()> {
    let format = Format::parse(&args.format)?;
    let template = load_template(&resolve(cwd, &args.template))?;
    let analysis = Analysis::of(&template);

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        Format::Text => print_text(&template, &analysis),
    }
    Ok(())
}

fn print_text(template: &Template, analysis: &Analysis) {
    println!("🔍 {} {}", "Analyzing".green().bold(), template.name.bright_white());
    println!();

    println!("Expressions ({}):", analysis.expressions.len());
    for expression in &analysis.expressions {
        println!("   {}", expression);
    }
    println!();

    let Some(coverage) = &analysis.coverage else {
        println!("   {} No schema defined", "ℹ".blue());
        return;
    };

    let percent = format!("{}%", coverage.coverage);
    println!(
        "Schema coverage: {} ({}/{})",
        if coverage.missing.is_empty() { percent.green() } else { percent.yellow() },
        coverage.valid,
        coverage.total
    );
    for issue in &analysis.issues {
        println!("   {} {}", "⚠".yellow(), issue.message);
    }
    println!();

    println!("Examples ({}):", analysis.examples.len());
    for example in &analysis.examples {
        if example.errors.is_empty() {
            println!("   {} {}", "✓".green(), example.name);
        } else {
            println!("   {} {}", "✗".red(), example.name);
            for error in &example.errors {
                println!("      {}", error);
            }
        }
    }
}
