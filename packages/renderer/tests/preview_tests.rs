use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stencil_editor::TemplateStore;
use stencil_model::rich_text::{doc, expression_node, paragraph};
use stencil_model::{Block, Template};
use stencil_renderer::{
    DirectEvaluator, EvalResult, Evaluator, PreviewOptions, PreviewScheduler, RenderOptions,
};

/// Takes 100ms per expression and counts calls
#[derive(Default)]
struct Slow {
    calls: AtomicUsize,
}

#[async_trait]
impl Evaluator for Slow {
    async fn evaluate(&self, expression: &str, context: &Value) -> EvalResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        DirectEvaluator::new().evaluate_now(expression, context)
    }
}

fn template(label: &str) -> Arc<Template> {
    let mut template = Template::new("preview", label);
    template.blocks.push(Block::text(
        "name",
        doc(vec![paragraph(vec![expression_node("name")])]),
    ));
    Arc::new(template)
}

fn options() -> PreviewOptions {
    PreviewOptions {
        debounce: Duration::from_millis(50),
        render: RenderOptions::default(),
    }
}

fn data(name: &str) -> serde_json::Map<String, Value> {
    json!({ "name": name }).as_object().cloned().unwrap()
}

async fn sleep_until(start: tokio::time::Instant, millis: u64) {
    tokio::time::sleep_until(start + Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn test_superseded_pass_never_publishes() {
    let evaluator = Arc::new(Slow::default());
    let scheduler = PreviewScheduler::new(evaluator.clone(), options());
    let start = tokio::time::Instant::now();

    scheduler.set_data(data("first"));
    scheduler.notify_template(template("v1"));

    // First pass starts at t=50 and would finish at t=150
    sleep_until(start, 80).await;
    scheduler.set_data(data("second"));
    let latest = scheduler.generation();

    // First pass finished at t=150 but was already superseded
    sleep_until(start, 160).await;
    assert!(scheduler.current().is_none());
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);

    // Second pass starts at t=130 and finishes at t=230
    sleep_until(start, 300).await;
    let update = scheduler.current().expect("second pass published");
    assert_eq!(update.generation, latest);
    assert_eq!(update.output.nodes[0].text_content(), "second");
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_rapid_changes_coalesce_into_one_pass() {
    let evaluator = Arc::new(Slow::default());
    let scheduler = PreviewScheduler::new(evaluator.clone(), options());
    let start = tokio::time::Instant::now();

    scheduler.set_data(data("x"));
    for (i, label) in ["a", "b", "c", "d"].iter().enumerate() {
        sleep_until(start, i as u64 * 20).await;
        scheduler.notify_template(template(label));
    }

    sleep_until(start, 500).await;
    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 1);

    let update = scheduler.current().expect("published");
    assert_eq!(update.generation, 5);
    assert_eq!(update.output.nodes[0].text_content(), "x");
}

#[tokio::test(start_paused = true)]
async fn test_attached_store_changes_trigger_renders() {
    let scheduler = PreviewScheduler::new(Arc::new(DirectEvaluator::new()), options());
    let mut updates = scheduler.subscribe();
    scheduler.set_data(data("Ada"));

    let mut store = TemplateStore::new((*template("doc")).clone());
    scheduler.attach(&mut store);

    updates.changed().await.unwrap();
    let first = updates.borrow_and_update().clone().unwrap();
    assert_eq!(first.output.nodes.len(), 1);

    assert!(store.add_block(
        stencil_model::BlockKind::Container,
        None,
        None
    )
    .is_some());

    updates.changed().await.unwrap();
    let second = updates.borrow_and_update().clone().unwrap();
    assert!(second.generation > first.generation);
    assert_eq!(second.output.nodes.len(), 2);
}
