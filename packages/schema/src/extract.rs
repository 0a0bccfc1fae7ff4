//! Expression path extraction from a block tree

use crate::paths::root_segment;
use std::collections::BTreeSet;
use stencil_model::{rich_text, scan_paths, Block};
use tracing::warn;

/// Raw expression strings a block carries itself (not its children)
pub fn block_expressions(block: &Block) -> Vec<String> {
    match block {
        Block::Conditional(b) => vec![b.condition.raw.clone()],
        Block::Loop(b) => vec![b.expression.raw.clone()],
        Block::Text(b) => rich_text::expression_atoms(&b.content),
        _ => Vec::new(),
    }
}

/// Every path-like substring referenced by expressions anywhere in `blocks`
pub fn extract_expressions(blocks: &[Block]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for block in blocks {
        collect(block, &mut paths);
    }
    paths
}

fn collect(block: &Block, paths: &mut BTreeSet<String>) {
    if matches!(block, Block::Unknown) {
        warn!("Skipping unknown block during expression extraction");
        return;
    }

    for raw in block_expressions(block) {
        paths.extend(scan_paths(&raw));
    }
    for slot in block.slots() {
        for child in slot.children {
            collect(child, paths);
        }
    }
}

/// Loop variable visible to nested blocks
struct Binding {
    alias: String,
    /// Data path the alias stands for; `None` for index aliases and loops
    /// over non-path expressions
    base: Option<String>,
}

/// Like [`extract_expressions`], but resolves loop aliases.
///
/// Inside `loop(order.items as item, i)`, `item.price` becomes
/// `order.items[].price` and paths rooted at `i` are dropped, so the result
/// can be compared against schema paths.
pub fn extract_bound_expressions(blocks: &[Block]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    let mut scope = Vec::new();
    for block in blocks {
        collect_bound(block, &mut scope, &mut paths);
    }
    paths
}

fn collect_bound(block: &Block, scope: &mut Vec<Binding>, paths: &mut BTreeSet<String>) {
    if matches!(block, Block::Unknown) {
        warn!("Skipping unknown block during expression extraction");
        return;
    }

    let own: Vec<String> = block_expressions(block)
        .iter()
        .flat_map(|raw| scan_paths(raw))
        .filter_map(|path| bind(&path, scope))
        .collect();

    let mut pushed = 0;
    if let Block::Loop(repeat) = block {
        if !repeat.item_alias.is_empty() {
            scope.push(Binding {
                alias: repeat.item_alias.clone(),
                base: own.first().map(|base| format!("{}[]", base)),
            });
            pushed += 1;
        }
        if let Some(index_alias) = repeat.index_alias.as_ref().filter(|a| !a.is_empty()) {
            scope.push(Binding {
                alias: index_alias.clone(),
                base: None,
            });
            pushed += 1;
        }
    }
    paths.extend(own);

    for slot in block.slots() {
        for child in slot.children {
            collect_bound(child, scope, paths);
        }
    }

    scope.truncate(scope.len() - pushed);
}

fn bind(path: &str, scope: &[Binding]) -> Option<String> {
    let root = root_segment(path);
    match scope.iter().rev().find(|binding| binding.alias == root) {
        Some(binding) => binding
            .base
            .as_ref()
            .map(|base| format!("{}{}", base, &path[root.len()..])),
        None => Some(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_model::rich_text::{doc, expression_node, paragraph, text_node};
    use stencil_model::{IdGenerator, TableBlock};

    fn text(id: &str, expressions: &[&str]) -> Block {
        let mut content = vec![text_node("Value: ")];
        content.extend(expressions.iter().map(|raw| expression_node(raw)));
        Block::text(id, doc(vec![paragraph(content)]))
    }

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_extracts_from_every_block_kind() {
        let mut ids = IdGenerator::new("t");
        let mut table = TableBlock::with_grid("tbl", 1, 1, &mut ids);
        table.rows[0].cells[0].children.push(text("cell", &["invoice.total"]));

        let blocks = vec![
            Block::conditional(
                "c",
                "customer.vip && !flags.hidden",
                vec![text("t1", &["customer.name"])],
            ),
            Block::repeat("l", "items", "item", vec![text("t2", &["item.price"])]),
            Block::Table(table),
        ];

        assert_eq!(
            extract_expressions(&blocks),
            set(&[
                "customer.vip",
                "flags.hidden",
                "customer.name",
                "items",
                "item.price",
                "invoice.total",
            ])
        );
    }

    #[test]
    fn test_literals_keywords_and_functions_excluded() {
        let blocks = vec![text("t", &["formatDate(order.date, 'long') ?? null", "true"])];
        assert_eq!(extract_expressions(&blocks), set(&["order.date"]));
    }

    #[test]
    fn test_unknown_blocks_skipped() {
        let blocks = vec![Block::Unknown, text("t", &["a.b"])];
        assert_eq!(extract_expressions(&blocks), set(&["a.b"]));
    }

    #[test]
    fn test_bound_paths_resolve_loop_aliases() {
        let inner = Block::repeat(
            "lines",
            "item.lines",
            "line",
            vec![text("t", &["line.amount", "item.sku", "currency"])],
        );
        let mut outer = Block::repeat("items", "order.items", "item", vec![inner]);
        if let Block::Loop(repeat) = &mut outer {
            repeat.index_alias = Some("i".to_string());
            repeat.children.push(text("n", &["i", "item.name"]));
        }

        assert_eq!(
            extract_bound_expressions(&[outer]),
            set(&[
                "order.items",
                "order.items[].lines",
                "order.items[].lines[].amount",
                "order.items[].sku",
                "order.items[].name",
                "currency",
            ])
        );
    }
}
