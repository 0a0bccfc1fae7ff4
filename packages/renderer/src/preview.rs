//! # Preview Scheduler
//!
//! Debounces tree and data changes into render passes and publishes the
//! latest output on a `watch` channel.
//!
//! ```text
//! store listener / set_data ──► generation += 1 ──► mpsc ──► worker
//!                                                            │ debounce
//!                                                            ▼
//!                                           spawn pass(snapshot, generation)
//!                                                            │
//!                         generation still current? ──yes──► watch::Sender
//!                                    │ no
//!                                    ▼
//!                                 discarded
//! ```
//!
//! Each pass captures an immutable `(Arc<Template>, data)` snapshot, so later
//! edits never affect a pass already in flight. Evaluations are not
//! cancelled; a superseded pass simply never publishes.

use crate::evaluator::Evaluator;
use crate::render::{render_template, RenderOptions, RenderOutput, RenderOverrides};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stencil_editor::{SubscriptionId, TemplateStore};
use stencil_model::Template;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub debounce: Duration,
    pub render: RenderOptions,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            render: RenderOptions::default(),
        }
    }
}

/// Output of one published render pass
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewUpdate {
    pub generation: u64,
    pub template_id: String,
    pub output: RenderOutput,
}

type Published = Option<Arc<PreviewUpdate>>;

#[derive(Debug)]
enum Change {
    Template(Arc<Template>),
    Data(Arc<Map<String, Value>>),
    Overrides(Arc<RenderOverrides>),
}

/// Cheap, clonable sender side of a [`PreviewScheduler`]
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    generation: Arc<AtomicU64>,
    changes: mpsc::UnboundedSender<Change>,
}

impl PreviewHandle {
    fn send(&self, change: Change) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if self.changes.send(change).is_err() {
            debug!(generation, "Preview worker has stopped; change dropped");
        }
        generation
    }

    /// Schedule a render of `template`; returns the new generation
    pub fn notify_template(&self, template: Arc<Template>) -> u64 {
        self.send(Change::Template(template))
    }

    pub fn set_data(&self, data: Map<String, Value>) -> u64 {
        self.send(Change::Data(Arc::new(data)))
    }

    pub fn set_overrides(&self, overrides: RenderOverrides) -> u64 {
        self.send(Change::Overrides(Arc::new(overrides)))
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Debounced, generation-checked live preview. Must be created inside a
/// tokio runtime.
#[derive(Debug)]
pub struct PreviewScheduler {
    handle: PreviewHandle,
    updates: watch::Receiver<Published>,
    worker: JoinHandle<()>,
}

impl PreviewScheduler {
    pub fn new(evaluator: Arc<dyn Evaluator>, options: PreviewOptions) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (changes, receiver) = mpsc::unbounded_channel();
        let (publisher, updates) = watch::channel(None);

        let worker = tokio::spawn(run_worker(
            receiver,
            Arc::clone(&generation),
            evaluator,
            options,
            Arc::new(publisher),
        ));

        Self {
            handle: PreviewHandle {
                generation,
                changes,
            },
            updates,
            worker,
        }
    }

    pub fn handle(&self) -> PreviewHandle {
        self.handle.clone()
    }

    /// Render on every committed store change, starting with the current
    /// template
    pub fn attach(&self, store: &mut TemplateStore) -> SubscriptionId {
        let handle = self.handle();
        handle.notify_template(store.template());
        store.subscribe(move |event| {
            handle.notify_template(Arc::clone(&event.template));
        })
    }

    pub fn notify_template(&self, template: Arc<Template>) -> u64 {
        self.handle.notify_template(template)
    }

    pub fn set_data(&self, data: Map<String, Value>) -> u64 {
        self.handle.set_data(data)
    }

    pub fn set_overrides(&self, overrides: RenderOverrides) -> u64 {
        self.handle.set_overrides(overrides)
    }

    pub fn generation(&self) -> u64 {
        self.handle.generation()
    }

    /// Latest published output
    pub fn current(&self) -> Option<Arc<PreviewUpdate>> {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.updates.clone()
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[derive(Default)]
struct Snapshot {
    template: Option<Arc<Template>>,
    data: Arc<Map<String, Value>>,
    overrides: Arc<RenderOverrides>,
}

impl Snapshot {
    fn apply(&mut self, change: Change) {
        match change {
            Change::Template(template) => self.template = Some(template),
            Change::Data(data) => self.data = data,
            Change::Overrides(overrides) => self.overrides = overrides,
        }
    }
}

async fn run_worker(
    mut changes: mpsc::UnboundedReceiver<Change>,
    generation: Arc<AtomicU64>,
    evaluator: Arc<dyn Evaluator>,
    options: PreviewOptions,
    publisher: Arc<watch::Sender<Published>>,
) {
    let mut snapshot = Snapshot::default();

    while let Some(change) = changes.recv().await {
        snapshot.apply(change);

        // Quiet period: restart the wait on every further change
        loop {
            match tokio::time::timeout(options.debounce, changes.recv()).await {
                Ok(Some(change)) => snapshot.apply(change),
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let Some(template) = snapshot.template.clone() else {
            continue;
        };
        let pass = generation.load(Ordering::SeqCst);
        debug!(generation = pass, template_id = %template.id, "Starting preview pass");

        tokio::spawn(render_pass(
            pass,
            template,
            Arc::clone(&snapshot.data),
            Arc::clone(&snapshot.overrides),
            Arc::clone(&generation),
            Arc::clone(&evaluator),
            options.render,
            Arc::clone(&publisher),
        ));
    }
}

#[allow(clippy::too_many_arguments)]
async fn render_pass(
    pass: u64,
    template: Arc<Template>,
    data: Arc<Map<String, Value>>,
    overrides: Arc<RenderOverrides>,
    generation: Arc<AtomicU64>,
    evaluator: Arc<dyn Evaluator>,
    options: RenderOptions,
    publisher: Arc<watch::Sender<Published>>,
) {
    let output = render_template(&template, &data, &overrides, evaluator.as_ref(), &options).await;

    let published = publisher.send_if_modified(|current| {
        let newer_published = current.as_ref().is_some_and(|update| update.generation > pass);
        if generation.load(Ordering::SeqCst) != pass || newer_published {
            return false;
        }
        *current = Some(Arc::new(PreviewUpdate {
            generation: pass,
            template_id: template.id.clone(),
            output,
        }));
        true
    });

    if published {
        info!(generation = pass, "Published preview");
    } else {
        debug!(generation = pass, "Discarded superseded preview pass");
    }
}
