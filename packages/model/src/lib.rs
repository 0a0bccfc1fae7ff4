//! # Stencil Model
//!
//! Data model shared by every Stencil package: the block tree, templates,
//! data examples, table merge records and the JSON contract they serialize to.
//!
//! ## Tree shape
//!
//! ```text
//! Template
//!  └─ blocks: [Block]            (root slot)
//!      ├─ container / pageheader / pagefooter / conditional / loop
//!      │    └─ children: [Block] (slot id = block id)
//!      ├─ columns
//!      │    └─ columns[i].children (slot id = column id)
//!      └─ table
//!           └─ rows[r].cells[c].children (slot id = cell id)
//! ```
//!
//! Every child collection is a *slot* addressed by an id. Block, column, row
//! and cell ids share one namespace and are unique within a template.
//!
//! ## Usage
//!
//! ```rust
//! use stencil_model::{Block, BlockKind, IdGenerator, Template};
//!
//! let mut template = Template::new("invoice", "Invoice");
//! let mut ids = IdGenerator::for_template(&template);
//! template.blocks.push(Block::new(BlockKind::Container, &mut ids));
//!
//! let json = template.to_json().unwrap();
//! let back = Template::from_json(&json).unwrap();
//! assert_eq!(template, back);
//! ```

pub mod block;
pub mod error;
pub mod expression;
pub mod id;
pub mod issue;
pub mod rich_text;
pub mod styles;
pub mod table;
pub mod template;
pub mod tree;

pub use block::{
    Block, BlockId, BlockKind, Column, ColumnsBlock, ConditionalBlock, ContainerBlock, Expression,
    LoopBlock, PageBreakBlock, TextBlock,
};
pub use error::{ModelError, ModelResult};
pub use expression::{scan_paths, tokenize, Token, BUILTINS};
pub use id::IdGenerator;
pub use issue::{IssueKind, SchemaIssue};
pub use styles::{merge_styles, Styles};
pub use table::{BorderStyle, CellMerge, Selection, TableBlock, TableCell, TableRow};
pub use template::{DataExample, Margins, Orientation, PageFormat, PageSettings, Template};
pub use tree::{collect_ids, walk, Location, Slot, SlotKind, SlotMut};
