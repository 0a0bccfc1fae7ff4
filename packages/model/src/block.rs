//! Block tree types
//!
//! `Block` is a closed sum type keyed by the JSON `type` discriminant.
//! Unrecognized discriminants decode into [`Block::Unknown`] so a template
//! written by a newer host still loads; traversals log and skip it.

use crate::id::IdGenerator;
use crate::rich_text;
use crate::styles::Styles;
use crate::table::TableBlock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub type BlockId = String;

/// Block type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Container,
    Conditional,
    Loop,
    Columns,
    Table,
    PageBreak,
    PageHeader,
    PageFooter,
}

impl BlockKind {
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Text,
        BlockKind::Container,
        BlockKind::Conditional,
        BlockKind::Loop,
        BlockKind::Columns,
        BlockKind::Table,
        BlockKind::PageBreak,
        BlockKind::PageHeader,
        BlockKind::PageFooter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Container => "container",
            BlockKind::Conditional => "conditional",
            BlockKind::Loop => "loop",
            BlockKind::Columns => "columns",
            BlockKind::Table => "table",
            BlockKind::PageBreak => "pagebreak",
            BlockKind::PageHeader => "pageheader",
            BlockKind::PageFooter => "pagefooter",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown block type: {}", s))
    }
}

/// Raw expression text, evaluated by the host-provided evaluator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub raw: String,
}

impl Expression {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_gap() -> f64 {
    16.0
}

fn default_column_size() -> f64 {
    1.0
}

fn default_item_alias() -> String {
    "item".to_string()
}

/// Rich text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    /// ProseMirror-style document; opaque apart from expression atoms
    #[serde(default = "rich_text::empty_document")]
    pub content: Value,
}

/// Plain child container (also used for page header and footer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default)]
    pub children: Vec<Block>,
}

/// Renders its children only when the condition holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default)]
    pub condition: Expression,
    /// Render when the condition is falsy instead
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
    #[serde(default)]
    pub children: Vec<Block>,
}

/// Repeats its children once per array item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default)]
    pub expression: Expression,
    #[serde(default = "default_item_alias")]
    pub item_alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_alias: Option<String>,
    #[serde(default)]
    pub children: Vec<Block>,
}

/// One column of a `columns` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    /// Flex grow factor
    #[serde(default = "default_column_size")]
    pub size: f64,
    #[serde(default)]
    pub children: Vec<Block>,
}

impl Column {
    pub fn new(ids: &mut IdGenerator) -> Self {
        Self {
            id: ids.new_id(),
            size: default_column_size(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default)]
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageBreakBlock {
    pub id: BlockId,
    #[serde(default, skip_serializing_if = "Styles::is_empty")]
    pub styles: Styles,
}

/// Document block (tagged union)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Text(TextBlock),
    Container(ContainerBlock),
    Conditional(ConditionalBlock),
    Loop(LoopBlock),
    Columns(ColumnsBlock),
    Table(TableBlock),
    PageBreak(PageBreakBlock),
    PageHeader(ContainerBlock),
    PageFooter(ContainerBlock),

    /// Any discriminant this version does not know
    #[serde(other)]
    Unknown,
}

impl Block {
    /// Create a block of `kind` with its default payload
    pub fn new(kind: BlockKind, ids: &mut IdGenerator) -> Self {
        let id = ids.new_id();
        match kind {
            BlockKind::Text => Block::Text(TextBlock {
                id,
                styles: Styles::new(),
                content: rich_text::empty_document(),
            }),
            BlockKind::Container => Block::Container(ContainerBlock::empty(id)),
            BlockKind::Conditional => Block::Conditional(ConditionalBlock {
                id,
                styles: Styles::new(),
                condition: Expression::default(),
                inverse: false,
                children: Vec::new(),
            }),
            BlockKind::Loop => Block::Loop(LoopBlock {
                id,
                styles: Styles::new(),
                expression: Expression::default(),
                item_alias: default_item_alias(),
                index_alias: None,
                children: Vec::new(),
            }),
            BlockKind::Columns => Block::Columns(ColumnsBlock {
                id,
                styles: Styles::new(),
                gap: default_gap(),
                columns: vec![Column::new(ids), Column::new(ids)],
            }),
            BlockKind::Table => Block::Table(TableBlock::with_grid(id, 2, 2, ids)),
            BlockKind::PageBreak => Block::PageBreak(PageBreakBlock {
                id,
                styles: Styles::new(),
            }),
            BlockKind::PageHeader => Block::PageHeader(ContainerBlock::empty(id)),
            BlockKind::PageFooter => Block::PageFooter(ContainerBlock::empty(id)),
        }
    }

    /// Text block holding `content`
    pub fn text(id: impl Into<String>, content: Value) -> Self {
        Block::Text(TextBlock {
            id: id.into(),
            styles: Styles::new(),
            content,
        })
    }

    pub fn container(id: impl Into<String>, children: Vec<Block>) -> Self {
        Block::Container(ContainerBlock {
            id: id.into(),
            styles: Styles::new(),
            children,
        })
    }

    pub fn conditional(id: impl Into<String>, condition: &str, children: Vec<Block>) -> Self {
        Block::Conditional(ConditionalBlock {
            id: id.into(),
            styles: Styles::new(),
            condition: Expression::new(condition),
            inverse: false,
            children,
        })
    }

    pub fn repeat(
        id: impl Into<String>,
        expression: &str,
        item_alias: &str,
        children: Vec<Block>,
    ) -> Self {
        Block::Loop(LoopBlock {
            id: id.into(),
            styles: Styles::new(),
            expression: Expression::new(expression),
            item_alias: item_alias.to_string(),
            index_alias: None,
            children,
        })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Block::Text(b) => Some(&b.id),
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => Some(&b.id),
            Block::Conditional(b) => Some(&b.id),
            Block::Loop(b) => Some(&b.id),
            Block::Columns(b) => Some(&b.id),
            Block::Table(b) => Some(&b.id),
            Block::PageBreak(b) => Some(&b.id),
            Block::Unknown => None,
        }
    }

    pub fn kind(&self) -> Option<BlockKind> {
        match self {
            Block::Text(_) => Some(BlockKind::Text),
            Block::Container(_) => Some(BlockKind::Container),
            Block::Conditional(_) => Some(BlockKind::Conditional),
            Block::Loop(_) => Some(BlockKind::Loop),
            Block::Columns(_) => Some(BlockKind::Columns),
            Block::Table(_) => Some(BlockKind::Table),
            Block::PageBreak(_) => Some(BlockKind::PageBreak),
            Block::PageHeader(_) => Some(BlockKind::PageHeader),
            Block::PageFooter(_) => Some(BlockKind::PageFooter),
            Block::Unknown => None,
        }
    }

    pub fn styles(&self) -> Option<&Styles> {
        match self {
            Block::Text(b) => Some(&b.styles),
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => Some(&b.styles),
            Block::Conditional(b) => Some(&b.styles),
            Block::Loop(b) => Some(&b.styles),
            Block::Columns(b) => Some(&b.styles),
            Block::Table(b) => Some(&b.styles),
            Block::PageBreak(b) => Some(&b.styles),
            Block::Unknown => None,
        }
    }

    /// Direct children for blocks with a single child list
    pub fn children(&self) -> Option<&Vec<Block>> {
        match self {
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => Some(&b.children),
            Block::Conditional(b) => Some(&b.children),
            Block::Loop(b) => Some(&b.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => {
                Some(&mut b.children)
            }
            Block::Conditional(b) => Some(&mut b.children),
            Block::Loop(b) => Some(&mut b.children),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&TableBlock> {
        match self {
            Block::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut TableBlock> {
        match self {
            Block::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_columns_mut(&mut self) -> Option<&mut ColumnsBlock> {
        match self {
            Block::Columns(columns) => Some(columns),
            _ => None,
        }
    }
}

impl ContainerBlock {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            styles: Styles::new(),
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_conditional_block() {
        let json = r#"{
            "type": "conditional",
            "id": "c1",
            "condition": { "raw": "customer.vip" },
            "inverse": true,
            "children": [{ "type": "pagebreak", "id": "p1" }]
        }"#;

        let block: Block = serde_json::from_str(json).unwrap();

        match &block {
            Block::Conditional(b) => {
                assert_eq!(b.condition.raw, "customer.vip");
                assert!(b.inverse);
                assert_eq!(b.children.len(), 1);
            }
            _ => panic!("Expected ConditionalBlock"),
        }
        assert_eq!(block.kind(), Some(BlockKind::Conditional));
    }

    #[test]
    fn test_parse_loop_block_defaults() {
        let json = r#"{ "type": "loop", "id": "l1", "expression": { "raw": "items" } }"#;

        let block: Block = serde_json::from_str(json).unwrap();
        match block {
            Block::Loop(b) => {
                assert_eq!(b.item_alias, "item");
                assert_eq!(b.index_alias, None);
                assert!(b.children.is_empty());
            }
            _ => panic!("Expected LoopBlock"),
        }
    }

    #[test]
    fn test_unknown_type_decodes_to_unknown() {
        let block: Block = serde_json::from_str(r#"{ "type": "barcode", "id": "b1" }"#).unwrap();
        assert_eq!(block, Block::Unknown);
        assert_eq!(block.id(), None);
    }

    #[test]
    fn test_discriminants_match_kind_names() {
        let mut ids = IdGenerator::new("t");
        for kind in BlockKind::ALL {
            let block = Block::new(kind, &mut ids);
            let value = serde_json::to_value(&block).unwrap();
            assert_eq!(value["type"], json!(kind.as_str()));
            assert_eq!(block.kind(), Some(kind));
            assert_eq!(kind.as_str().parse::<BlockKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_default_columns_have_two_columns() {
        let mut ids = IdGenerator::new("t");
        match Block::new(BlockKind::Columns, &mut ids) {
            Block::Columns(b) => {
                assert_eq!(b.columns.len(), 2);
                assert_ne!(b.columns[0].id, b.columns[1].id);
            }
            _ => panic!("Expected ColumnsBlock"),
        }
    }
}
