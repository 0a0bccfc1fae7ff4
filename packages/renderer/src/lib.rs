//! # Stencil Renderer
//!
//! Turns a template plus a data context into rendered output.
//!
//! ## Pipeline
//!
//! ```text
//! Template + data ──► render ──► RenderNode tree ──► HTML
//!                       │
//!                       └─ Evaluator port (direct | sandboxed)
//!
//! TemplateStore ──► PreviewScheduler (debounce, generation) ──► watch channel
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use serde_json::json;
//! use stencil_model::rich_text::{doc, expression_node, paragraph, text_node};
//! use stencil_model::{Block, Template};
//! use stencil_renderer::{render_template, DirectEvaluator, RenderOptions, RenderOverrides};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut template = Template::new("greeting", "Greeting");
//! template.blocks.push(Block::text(
//!     "hello",
//!     doc(vec![paragraph(vec![text_node("Hello, "), expression_node("name")])]),
//! ));
//!
//! let data = json!({ "name": "Ada" }).as_object().cloned().unwrap();
//! let output = render_template(
//!     &template,
//!     &data,
//!     &RenderOverrides::default(),
//!     &DirectEvaluator::new(),
//!     &RenderOptions::default(),
//! )
//! .await;
//!
//! assert_eq!(output.nodes[0].text_content(), "Hello, Ada");
//! assert!(output.diagnostics.is_empty());
//! # });
//! ```

pub mod direct;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod html;
pub mod node;
pub mod preview;
pub mod render;
pub mod sandbox;
pub mod styles;

pub use direct::DirectEvaluator;
pub use error::{EvalError, EvalResult, RenderError, RenderResult};
pub use evaluator::Evaluator;
pub use expr::{display_value, is_truthy};
pub use html::HtmlOptions;
pub use node::{RenderDiagnostic, RenderNode};
pub use preview::{PreviewHandle, PreviewOptions, PreviewScheduler, PreviewUpdate};
pub use render::{
    render, render_example, render_template, ConditionOverride, RenderOptions, RenderOutput,
    RenderOverrides,
};
pub use sandbox::{SandboxOptions, SandboxedEvaluator};
