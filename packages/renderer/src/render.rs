//! # Template Renderer
//!
//! Walks the block tree against a data context and produces a
//! [`RenderNode`] tree, its HTML serialization and a list of evaluation
//! diagnostics.
//!
//! ```text
//! render(blocks, data)
//!   └─ render_blocks ──► render_block per sibling ──┐
//!        (join_all when concurrent)                 │
//!                                                   ▼
//!          text: evaluate atoms ─► substitute ─► <div><p>…</p></div>
//!          conditional: evaluate ─► children or nothing
//!          loop: evaluate ─► children × items (alias bindings)
//!          columns / table / container: children per slot
//! ```
//!
//! Sibling blocks, loop iterations and the expression atoms of one text block
//! may be evaluated concurrently. Fragments are always concatenated in source
//! order, so concurrent and sequential passes produce identical output.
//!
//! A failed evaluation never aborts the pass: it becomes an inline
//! [`RenderNode::Error`] marker plus a [`RenderDiagnostic`].

use crate::error::{EvalError, RenderError, RenderResult};
use crate::evaluator::Evaluator;
use crate::expr::{display_value, is_truthy};
use crate::html::{full_page, to_html, HtmlOptions};
use crate::node::{RenderDiagnostic, RenderNode};
use crate::styles::{cascade, inheritable, to_css};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use stencil_model::{
    rich_text, Block, BorderStyle, ColumnsBlock, ConditionalBlock, ContainerBlock, LoopBlock,
    Styles, TableBlock, Template, TextBlock,
};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub pretty: bool,
    /// Wrap the output in a printable page document
    pub full_page: bool,
    /// Evaluate siblings concurrently
    pub concurrent: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            full_page: false,
            concurrent: true,
        }
    }
}

/// Preview override for a conditional block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOverride {
    Show,
    Hide,
    /// Evaluate the condition against the data
    #[default]
    Data,
}

/// Per-block preview overrides, keyed by block id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOverrides {
    #[serde(default)]
    pub conditions: BTreeMap<String, ConditionOverride>,
    /// Forced item count for loop blocks
    #[serde(default)]
    pub loop_counts: BTreeMap<String, usize>,
}

impl RenderOverrides {
    pub fn with_condition(mut self, block_id: impl Into<String>, value: ConditionOverride) -> Self {
        self.conditions.insert(block_id.into(), value);
        self
    }

    pub fn with_loop_count(mut self, block_id: impl Into<String>, count: usize) -> Self {
        self.loop_counts.insert(block_id.into(), count);
        self
    }

    fn condition(&self, block_id: &str) -> ConditionOverride {
        self.conditions.get(block_id).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOutput {
    pub nodes: Vec<RenderNode>,
    pub html: String,
    pub diagnostics: Vec<RenderDiagnostic>,
}

impl RenderOutput {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Render a block list against `data`
#[instrument(skip_all, fields(blocks = blocks.len(), concurrent = options.concurrent))]
pub async fn render(
    blocks: &[Block],
    data: &Map<String, Value>,
    overrides: &RenderOverrides,
    evaluator: &dyn Evaluator,
    document_styles: &Styles,
    options: &RenderOptions,
) -> RenderOutput {
    let renderer = Renderer {
        evaluator,
        overrides,
        concurrent: options.concurrent,
    };
    let scope = Scope {
        context: Value::Object(data.clone()),
        inherited: inheritable(document_styles),
    };

    let fragment = renderer.render_blocks(blocks, &scope).await;
    let html = to_html(&fragment.nodes, &html_options(options));

    info!(
        nodes = fragment.nodes.len(),
        diagnostics = fragment.diagnostics.len(),
        "Render pass complete"
    );

    RenderOutput {
        nodes: fragment.nodes,
        html,
        diagnostics: fragment.diagnostics,
    }
}

/// Render a whole template, honouring its document styles and page settings
#[instrument(skip_all, fields(template_id = %template.id))]
pub async fn render_template(
    template: &Template,
    data: &Map<String, Value>,
    overrides: &RenderOverrides,
    evaluator: &dyn Evaluator,
    options: &RenderOptions,
) -> RenderOutput {
    let mut output = render(
        &template.blocks,
        data,
        overrides,
        evaluator,
        &template.document_styles,
        options,
    )
    .await;

    if options.full_page {
        output.html = full_page(
            &template.name,
            &output.nodes,
            &template.page_settings,
            &template.document_styles,
            &html_options(options),
        );
    }
    output
}

/// Render a template against one of its stored data examples
pub async fn render_example(
    template: &Template,
    example_id: &str,
    overrides: &RenderOverrides,
    evaluator: &dyn Evaluator,
    options: &RenderOptions,
) -> RenderResult<RenderOutput> {
    let example = template
        .data_example(example_id)
        .ok_or_else(|| RenderError::ExampleNotFound(example_id.to_string()))?;
    Ok(render_template(template, &example.data, overrides, evaluator, options).await)
}

fn html_options(options: &RenderOptions) -> HtmlOptions {
    HtmlOptions {
        pretty: options.pretty,
        ..HtmlOptions::default()
    }
}

// ---- tree walk --------------------------------------------------------------

/// Evaluation context plus the styles children inherit
#[derive(Debug, Clone)]
struct Scope {
    context: Value,
    inherited: Styles,
}

impl Scope {
    fn child(&self, inherited: Styles) -> Scope {
        Scope {
            context: self.context.clone(),
            inherited,
        }
    }

    fn bind(&self, bindings: &[(&str, Value)]) -> Scope {
        let mut context = self.context.clone();
        if let Value::Object(map) = &mut context {
            for (name, value) in bindings {
                map.insert((*name).to_string(), value.clone());
            }
        }
        Scope {
            context,
            inherited: self.inherited.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Fragment {
    nodes: Vec<RenderNode>,
    diagnostics: Vec<RenderDiagnostic>,
}

impl Fragment {
    fn node(node: RenderNode) -> Self {
        Self {
            nodes: vec![node],
            diagnostics: Vec::new(),
        }
    }

    fn concat(fragments: Vec<Fragment>) -> Self {
        let mut out = Fragment::default();
        for fragment in fragments {
            out.nodes.extend(fragment.nodes);
            out.diagnostics.extend(fragment.diagnostics);
        }
        out
    }

    /// Wrap this fragment's nodes in `element`
    fn wrap(self, element: RenderNode) -> Self {
        Self {
            nodes: vec![element.with_children(self.nodes)],
            diagnostics: self.diagnostics,
        }
    }

    fn failure(&mut self, block_id: &str, expression: &str, error: &EvalError) -> RenderNode {
        let message = error.to_string();
        debug!(block_id, expression, %message, "Expression failed");
        self.diagnostics.push(RenderDiagnostic {
            block_id: block_id.to_string(),
            expression: expression.to_string(),
            message: message.clone(),
        });
        RenderNode::error(message, block_id, expression)
    }
}

fn block_element(tag: &str, block_id: &str, kind: &str, styles: &Styles) -> RenderNode {
    RenderNode::element(tag)
        .with_attr("data-block-id", block_id)
        .with_attr("data-block-type", kind)
        .with_styles(to_css(styles))
}

struct Renderer<'a> {
    evaluator: &'a dyn Evaluator,
    overrides: &'a RenderOverrides,
    concurrent: bool,
}

impl<'a> Renderer<'a> {
    /// Run `futures` concurrently or one after another, keeping their order
    async fn gather<F, T>(&self, futures: Vec<F>) -> Vec<T>
    where
        F: std::future::Future<Output = T>,
    {
        if self.concurrent {
            join_all(futures).await
        } else {
            let mut out = Vec::with_capacity(futures.len());
            for future in futures {
                out.push(future.await);
            }
            out
        }
    }

    fn render_blocks<'s>(&'s self, blocks: &'s [Block], scope: &'s Scope) -> BoxFuture<'s, Fragment> {
        async move {
            let futures: Vec<_> = blocks
                .iter()
                .map(|block| self.render_block(block, scope))
                .collect();
            Fragment::concat(self.gather(futures).await)
        }
        .boxed()
    }

    fn render_block<'s>(&'s self, block: &'s Block, scope: &'s Scope) -> BoxFuture<'s, Fragment> {
        async move {
            match block {
                Block::Text(text) => self.render_text(text, scope).await,
                Block::Container(container) => self.render_container("div", "container", container, scope).await,
                Block::PageHeader(header) => self.render_container("header", "pageheader", header, scope).await,
                Block::PageFooter(footer) => self.render_container("footer", "pagefooter", footer, scope).await,
                Block::Conditional(conditional) => self.render_conditional(conditional, scope).await,
                Block::Loop(repeat) => self.render_loop(repeat, scope).await,
                Block::Columns(columns) => self.render_columns(columns, scope).await,
                Block::Table(table) => self.render_table(table, scope).await,
                Block::PageBreak(page_break) => {
                    let (styles, _) = cascade(&scope.inherited, &page_break.styles);
                    Fragment::node(
                        block_element("div", &page_break.id, "pagebreak", &styles)
                            .with_attr("class", "stencil-page-break")
                            .with_style("break-after", "page")
                            .with_style("page-break-after", "always"),
                    )
                }
                Block::Unknown => {
                    warn!("Skipping block of unknown type during render");
                    Fragment::default()
                }
            }
        }
        .boxed()
    }

    async fn render_text(&self, text: &TextBlock, scope: &Scope) -> Fragment {
        let (styles, _) = cascade(&scope.inherited, &text.styles);

        let atoms = rich_text::expression_atoms(&text.content);
        let futures: Vec<_> = atoms
            .iter()
            .map(|atom| self.evaluator.evaluate(atom, &scope.context))
            .collect();
        let mut results = self.gather(futures).await.into_iter();

        let mut fragment = Fragment::default();
        let children = rich_nodes(&text.content, &text.id, &mut results, &mut fragment);
        fragment.nodes = vec![block_element("div", &text.id, "text", &styles).with_children(children)];
        fragment
    }

    async fn render_container(
        &self,
        tag: &str,
        kind: &str,
        container: &ContainerBlock,
        scope: &Scope,
    ) -> Fragment {
        let (styles, passed_on) = cascade(&scope.inherited, &container.styles);
        let child_scope = scope.child(passed_on);
        self.render_blocks(&container.children, &child_scope)
            .await
            .wrap(block_element(tag, &container.id, kind, &styles))
    }

    async fn render_conditional(&self, conditional: &ConditionalBlock, scope: &Scope) -> Fragment {
        let (styles, passed_on) = cascade(&scope.inherited, &conditional.styles);
        let element = block_element("div", &conditional.id, "conditional", &styles);

        let visible = match self.overrides.condition(&conditional.id) {
            ConditionOverride::Show => true,
            ConditionOverride::Hide => false,
            ConditionOverride::Data if conditional.condition.is_empty() => false,
            ConditionOverride::Data => {
                let raw = &conditional.condition.raw;
                match self.evaluator.evaluate(raw, &scope.context).await {
                    Ok(value) => is_truthy(&value) != conditional.inverse,
                    Err(error) => {
                        let mut fragment = Fragment::default();
                        let marker = fragment.failure(&conditional.id, raw, &error);
                        fragment.nodes.push(element.with_child(marker));
                        return fragment;
                    }
                }
            }
        };

        if !visible {
            return Fragment::default();
        }
        let child_scope = scope.child(passed_on);
        self.render_blocks(&conditional.children, &child_scope)
            .await
            .wrap(element)
    }

    async fn render_loop(&self, repeat: &LoopBlock, scope: &Scope) -> Fragment {
        let (styles, passed_on) = cascade(&scope.inherited, &repeat.styles);
        let element = block_element("div", &repeat.id, "loop", &styles);
        if repeat.expression.is_empty() {
            return Fragment::node(element);
        }

        let raw = &repeat.expression.raw;
        let evaluated = self.evaluator.evaluate(raw, &scope.context).await;
        let items = match evaluated {
            Ok(Value::Array(items)) => items,
            Ok(other) => {
                let error = EvalError::Type(format!(
                    "Loop expression must evaluate to an array, found {}",
                    display_kind(&other)
                ));
                return self.loop_failure(element, &repeat.id, raw, &error);
            }
            Err(error) => return self.loop_failure(element, &repeat.id, raw, &error),
        };

        if items.is_empty() {
            return Fragment::node(element);
        }
        let count = self
            .overrides
            .loop_counts
            .get(&repeat.id)
            .copied()
            .unwrap_or(items.len());

        let base = scope.child(passed_on);
        let iterations: Vec<Scope> = (0..count)
            .map(|i| {
                let mut bindings = vec![(repeat.item_alias.as_str(), items[i % items.len()].clone())];
                if let Some(index_alias) = &repeat.index_alias {
                    bindings.push((index_alias.as_str(), Value::from(i)));
                }
                base.bind(&bindings)
            })
            .collect();

        let futures: Vec<_> = iterations
            .iter()
            .map(|iteration| self.render_blocks(&repeat.children, iteration))
            .collect();
        Fragment::concat(self.gather(futures).await).wrap(element)
    }

    fn loop_failure(&self, element: RenderNode, block_id: &str, raw: &str, error: &EvalError) -> Fragment {
        let mut fragment = Fragment::default();
        let marker = fragment.failure(block_id, raw, error);
        fragment.nodes.push(element.with_child(marker));
        fragment
    }

    async fn render_columns(&self, columns: &ColumnsBlock, scope: &Scope) -> Fragment {
        let (styles, passed_on) = cascade(&scope.inherited, &columns.styles);
        let element = block_element("div", &columns.id, "columns", &styles)
            .with_style("display", "flex")
            .with_style("gap", format!("{}px", columns.gap));

        let child_scope = scope.child(passed_on);
        let futures: Vec<_> = columns
            .columns
            .iter()
            .map(|column| self.render_blocks(&column.children, &child_scope))
            .collect();
        let rendered: Vec<Fragment> = self.gather(futures).await;

        let wrapped = columns
            .columns
            .iter()
            .zip(rendered)
            .map(|(column, fragment)| {
                fragment.wrap(
                    RenderNode::element("div")
                        .with_attr("data-column-id", &column.id)
                        .with_style("flex", column.size.to_string())
                        .with_style("min-width", "0"),
                )
            })
            .collect();
        Fragment::concat(wrapped).wrap(element)
    }

    async fn render_table(&self, table: &TableBlock, scope: &Scope) -> Fragment {
        let (styles, passed_on) = cascade(&scope.inherited, &table.styles);
        let element = block_element("table", &table.id, "table", &styles)
            .with_style("border-collapse", "collapse")
            .with_style("width", "100%");
        let child_scope = scope.child(passed_on);

        // (row, col) positions covered by an earlier cell's span
        let mut covered: HashSet<(usize, usize)> = HashSet::new();
        let mut placed = Vec::new();
        for (r, row) in table.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if covered.contains(&(r, c)) {
                    continue;
                }
                let row_span = cell.row_span.max(1);
                let col_span = cell.col_span.max(1);
                for dr in 0..row_span {
                    for dc in 0..col_span {
                        if dr > 0 || dc > 0 {
                            covered.insert((r + dr, c + dc));
                        }
                    }
                }
                placed.push((r, cell));
            }
        }

        let futures: Vec<_> = placed
            .iter()
            .map(|(_, cell)| self.render_blocks(&cell.children, &child_scope))
            .collect();
        let rendered: Vec<Fragment> = self.gather(futures).await;

        let mut rows: Vec<Fragment> = table
            .rows
            .iter()
            .map(|row| Fragment::node(RenderNode::element("tr").with_attr("data-row-id", &row.id)))
            .collect();

        for ((r, cell), fragment) in placed.into_iter().zip(rendered) {
            let tag = if table.rows[r].is_header { "th" } else { "td" };
            let mut td = RenderNode::element(tag)
                .with_attr("data-cell-id", &cell.id)
                .with_styles(to_css(&cell.styles));
            if cell.row_span > 1 {
                td = td.with_attr("rowspan", cell.row_span.to_string());
            }
            if cell.col_span > 1 {
                td = td.with_attr("colspan", cell.col_span.to_string());
            }
            for (property, value) in border_styles(table.border_style) {
                td = td.with_style(property, value);
            }

            let Fragment { nodes, diagnostics } = fragment.wrap(td);
            let row = &mut rows[r];
            if let Some(tr) = row.nodes.pop() {
                row.nodes.push(tr.with_children(nodes));
            }
            row.diagnostics.extend(diagnostics);
        }

        Fragment::concat(rows)
            .wrap(RenderNode::element("tbody"))
            .wrap(element)
    }
}

fn border_styles(style: BorderStyle) -> Vec<(&'static str, &'static str)> {
    const LINE: &str = "1px solid #d0d0d0";
    match style {
        BorderStyle::All => vec![("border", LINE)],
        BorderStyle::Horizontal => vec![("border-bottom", LINE), ("border-top", LINE)],
        BorderStyle::Vertical => vec![("border-left", LINE), ("border-right", LINE)],
        BorderStyle::None => vec![("border", "none")],
    }
}

fn display_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---- rich text --------------------------------------------------------------

/// Convert rich-text content, substituting evaluated atoms in document order
fn rich_nodes(
    node: &Value,
    block_id: &str,
    results: &mut dyn Iterator<Item = Result<Value, EvalError>>,
    fragment: &mut Fragment,
) -> Vec<RenderNode> {
    match node {
        Value::Object(_) => {}
        Value::String(s) => return vec![RenderNode::text(s.as_str())],
        Value::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(rich_nodes(item, block_id, results, fragment));
            }
            return out;
        }
        _ => return Vec::new(),
    }

    match rich_text::node_type(node).unwrap_or_default() {
        "paragraph" => rich_element("p", node, block_id, results, fragment),
        "heading" => {
            let level = node
                .get("attrs")
                .and_then(|attrs| attrs.get("level"))
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6);
            rich_element(&format!("h{}", level), node, block_id, results, fragment)
        }
        "bulletList" => rich_element("ul", node, block_id, results, fragment),
        "orderedList" => rich_element("ol", node, block_id, results, fragment),
        "listItem" => rich_element("li", node, block_id, results, fragment),
        "hardBreak" => vec![RenderNode::element("br")],
        "text" => {
            let content = node.get("text").and_then(Value::as_str).unwrap_or_default();
            vec![apply_marks(RenderNode::text(content), node)]
        }
        rich_text::EXPRESSION_NODE => {
            let raw = rich_text::expression_of(node).unwrap_or_default();
            let rendered = match results.next() {
                Some(Ok(value)) => RenderNode::text(display_value(&value)),
                Some(Err(error)) => fragment.failure(block_id, raw, &error),
                None => RenderNode::text(""),
            };
            vec![apply_marks(rendered, node)]
        }
        _ => rich_children(node, block_id, results, fragment),
    }
}

fn rich_element(
    tag: &str,
    node: &Value,
    block_id: &str,
    results: &mut dyn Iterator<Item = Result<Value, EvalError>>,
    fragment: &mut Fragment,
) -> Vec<RenderNode> {
    let children = rich_children(node, block_id, results, fragment);
    vec![RenderNode::element(tag).with_children(children)]
}

fn rich_children(
    node: &Value,
    block_id: &str,
    results: &mut dyn Iterator<Item = Result<Value, EvalError>>,
    fragment: &mut Fragment,
) -> Vec<RenderNode> {
    let mut out = Vec::new();
    for child in rich_text::children(node) {
        out.extend(rich_nodes(child, block_id, results, fragment));
    }
    out
}

fn apply_marks(mut node: RenderNode, source: &Value) -> RenderNode {
    let Some(marks) = source.get("marks").and_then(Value::as_array) else {
        return node;
    };
    for mark in marks {
        node = match rich_text::node_type(mark).unwrap_or_default() {
            "bold" | "strong" => RenderNode::element("strong").with_child(node),
            "italic" | "em" => RenderNode::element("em").with_child(node),
            "underline" => RenderNode::element("u").with_child(node),
            "strike" => RenderNode::element("s").with_child(node),
            "code" => RenderNode::element("code").with_child(node),
            "link" => {
                let href = mark
                    .get("attrs")
                    .and_then(|attrs| attrs.get("href"))
                    .and_then(Value::as_str)
                    .unwrap_or("#");
                RenderNode::element("a").with_attr("href", href).with_child(node)
            }
            _ => node,
        };
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direct::DirectEvaluator;
    use serde_json::json;
    use stencil_model::rich_text::{doc, expression_node, heading, marked_text, paragraph, text_node};

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn run(blocks: &[Block], data: &Map<String, Value>, overrides: &RenderOverrides) -> RenderOutput {
        render(
            blocks,
            data,
            overrides,
            &DirectEvaluator::new(),
            &Styles::new(),
            &RenderOptions::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_text_substitution_and_marks() {
        let block = Block::text(
            "t1",
            doc(vec![
                heading(2, vec![text_node("Invoice")]),
                paragraph(vec![
                    marked_text("Dear ", &["bold"]),
                    expression_node("customer.name"),
                ]),
            ]),
        );

        let output = run(&[block], &data(json!({ "customer": { "name": "Ada" } })), &RenderOverrides::default()).await;

        assert!(output.diagnostics.is_empty());
        assert_eq!(
            output.html,
            "<div data-block-id=\"t1\" data-block-type=\"text\"><h2>Invoice</h2><p><strong>Dear </strong>Ada</p></div>"
        );
    }

    #[tokio::test]
    async fn test_failed_atom_is_localized() {
        let block = Block::text(
            "t1",
            doc(vec![paragraph(vec![
                expression_node("missing.value"),
                text_node(" / "),
                expression_node("total"),
            ])]),
        );

        let output = run(&[block], &data(json!({ "total": 5 })), &RenderOverrides::default()).await;

        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].block_id, "t1");
        assert_eq!(output.diagnostics[0].expression, "missing.value");
        assert_eq!(output.nodes[0].text_content(), " / 5");
        assert!(output.html.contains("class=\"stencil-error\""));
    }

    #[tokio::test]
    async fn test_conditional_inverse_and_overrides() {
        let mut hidden = Block::conditional("c1", "customer.vip", vec![Block::container("inner", vec![])]);
        if let Block::Conditional(c) = &mut hidden {
            c.inverse = true;
        }
        let blocks = vec![hidden];
        let data = data(json!({ "customer": { "vip": true } }));

        let output = run(&blocks, &data, &RenderOverrides::default()).await;
        assert!(output.nodes.is_empty());

        let overrides = RenderOverrides::default().with_condition("c1", ConditionOverride::Show);
        let output = run(&blocks, &data, &overrides).await;
        assert!(output.nodes[0].find_block("inner").is_some());
    }

    #[tokio::test]
    async fn test_loop_binds_aliases_and_forced_count_wraps() {
        let mut repeat = Block::repeat(
            "l1",
            "items",
            "item",
            vec![Block::text("row", doc(vec![paragraph(vec![
                expression_node("i"),
                text_node(":"),
                expression_node("item.name"),
            ])]))],
        );
        if let Block::Loop(l) = &mut repeat {
            l.index_alias = Some("i".to_string());
        }
        let blocks = vec![repeat];
        let data = data(json!({ "items": [{ "name": "a" }, { "name": "b" }] }));

        let output = run(&blocks, &data, &RenderOverrides::default()).await;
        assert_eq!(output.nodes[0].text_content(), "0:a1:b");

        let overrides = RenderOverrides::default().with_loop_count("l1", 3);
        let output = run(&blocks, &data, &overrides).await;
        assert_eq!(output.nodes[0].text_content(), "0:a1:b2:a");
    }

    #[tokio::test]
    async fn test_loop_over_non_array_is_an_error() {
        let blocks = vec![Block::repeat("l1", "count", "item", vec![])];
        let output = run(&blocks, &data(json!({ "count": 3 })), &RenderOverrides::default()).await;

        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("found number"));
    }

    #[tokio::test]
    async fn test_empty_loop_source_renders_nothing_even_when_forced() {
        let blocks = vec![Block::repeat("l1", "items", "item", vec![Block::container("x", vec![])])];
        let overrides = RenderOverrides::default().with_loop_count("l1", 4);
        let output = run(&blocks, &data(json!({ "items": [] })), &overrides).await;

        assert!(output.nodes[0].children().is_empty());
        assert!(output.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_document_styles_inherit_and_block_wins() {
        let mut block = Block::text("t1", doc(vec![]));
        if let Block::Text(t) = &mut block {
            t.styles.insert("color".into(), json!("red"));
        }
        let document: Styles = serde_json::from_value(json!({ "color": "#333", "fontSize": 11, "padding": 4 })).unwrap();

        let output = render(
            &[block],
            &Map::new(),
            &RenderOverrides::default(),
            &DirectEvaluator::new(),
            &document,
            &RenderOptions::default(),
        )
        .await;

        let node = &output.nodes[0];
        assert_eq!(node.style("color"), Some("red"));
        assert_eq!(node.style("font-size"), Some("11px"));
        assert_eq!(node.style("padding"), None);
    }

    #[tokio::test]
    async fn test_unknown_blocks_are_skipped() {
        let output = run(&[Block::Unknown, Block::container("c", vec![])], &Map::new(), &RenderOverrides::default()).await;
        assert_eq!(output.nodes.len(), 1);
    }
}
