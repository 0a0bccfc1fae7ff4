//! Slot addressing and tree traversal
//!
//! A slot is a child list addressed by an id: the root list (`None`), a
//! block's `children` (the block id), a column (the column id) or a table
//! cell (the cell id).

use crate::block::{Block, BlockKind};
use crate::error::{ModelError, ModelResult};
use crate::template::Template;
use tracing::warn;

/// What kind of collection a slot is; drives capability checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Root,
    Block(BlockKind),
    Column,
    Cell,
}

#[derive(Debug, Clone, Copy)]
pub struct Slot<'a> {
    pub id: Option<&'a str>,
    pub kind: SlotKind,
    pub children: &'a [Block],
}

#[derive(Debug)]
pub struct SlotMut<'a> {
    pub id: Option<&'a str>,
    pub kind: SlotKind,
    pub children: &'a mut Vec<Block>,
}

/// Where a block sits: parent slot id (root when `None`) and index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub parent: Option<String>,
    pub index: usize,
}

impl Block {
    /// Child slots owned directly by this block
    pub fn slots(&self) -> Vec<Slot<'_>> {
        match self {
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => {
                let kind = self.kind().unwrap_or(BlockKind::Container);
                vec![Slot {
                    id: Some(&b.id),
                    kind: SlotKind::Block(kind),
                    children: &b.children,
                }]
            }
            Block::Conditional(b) => vec![Slot {
                id: Some(&b.id),
                kind: SlotKind::Block(BlockKind::Conditional),
                children: &b.children,
            }],
            Block::Loop(b) => vec![Slot {
                id: Some(&b.id),
                kind: SlotKind::Block(BlockKind::Loop),
                children: &b.children,
            }],
            Block::Columns(b) => b
                .columns
                .iter()
                .map(|column| Slot {
                    id: Some(&column.id),
                    kind: SlotKind::Column,
                    children: &column.children,
                })
                .collect(),
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .map(|cell| Slot {
                    id: Some(&cell.id),
                    kind: SlotKind::Cell,
                    children: &cell.children,
                })
                .collect(),
            Block::Text(_) | Block::PageBreak(_) | Block::Unknown => Vec::new(),
        }
    }

    pub fn slots_mut(&mut self) -> Vec<SlotMut<'_>> {
        let kind = self.kind();
        match self {
            Block::Container(b) | Block::PageHeader(b) | Block::PageFooter(b) => vec![SlotMut {
                id: Some(&b.id),
                kind: SlotKind::Block(kind.unwrap_or(BlockKind::Container)),
                children: &mut b.children,
            }],
            Block::Conditional(b) => vec![SlotMut {
                id: Some(&b.id),
                kind: SlotKind::Block(BlockKind::Conditional),
                children: &mut b.children,
            }],
            Block::Loop(b) => vec![SlotMut {
                id: Some(&b.id),
                kind: SlotKind::Block(BlockKind::Loop),
                children: &mut b.children,
            }],
            Block::Columns(b) => b
                .columns
                .iter_mut()
                .map(|column| SlotMut {
                    id: Some(&column.id),
                    kind: SlotKind::Column,
                    children: &mut column.children,
                })
                .collect(),
            Block::Table(t) => t
                .rows
                .iter_mut()
                .flat_map(|row| row.cells.iter_mut())
                .map(|cell| SlotMut {
                    id: Some(&cell.id),
                    kind: SlotKind::Cell,
                    children: &mut cell.children,
                })
                .collect(),
            Block::Text(_) | Block::PageBreak(_) | Block::Unknown => Vec::new(),
        }
    }
}

/// Depth-first pre-order visit of every block, with its depth
pub fn walk<'a>(blocks: &'a [Block], visit: &mut dyn FnMut(&'a Block, usize)) {
    walk_at(blocks, 0, visit);
}

fn walk_at<'a>(blocks: &'a [Block], depth: usize, visit: &mut dyn FnMut(&'a Block, usize)) {
    for block in blocks {
        visit(block, depth);
        for slot in block.slots() {
            walk_at(slot.children, depth + 1, visit);
        }
    }
}

/// Every block, column, row and cell id under `blocks`, including their own
pub fn collect_ids(blocks: &[Block]) -> Vec<String> {
    let mut ids = Vec::new();
    walk(blocks, &mut |block, _| {
        if let Some(id) = block.id() {
            ids.push(id.to_string());
        }
        match block {
            Block::Columns(b) => ids.extend(b.columns.iter().map(|c| c.id.clone())),
            Block::Table(t) => {
                for row in &t.rows {
                    ids.push(row.id.clone());
                    ids.extend(row.cells.iter().map(|c| c.id.clone()));
                }
            }
            _ => {}
        }
    });
    ids
}

fn find_block_in<'a>(blocks: &'a [Block], id: &str) -> Option<&'a Block> {
    for block in blocks {
        if block.id() == Some(id) {
            return Some(block);
        }
        for slot in block.slots() {
            if let Some(found) = find_block_in(slot.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_block_in_mut<'a>(blocks: &'a mut [Block], id: &str) -> Option<&'a mut Block> {
    for block in blocks.iter_mut() {
        let matches = block.id() == Some(id);
        if matches {
            return Some(block);
        }
        for slot in block.slots_mut() {
            if let Some(found) = find_block_in_mut(slot.children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_slot_in<'a>(blocks: &'a [Block], slot_id: &str) -> Option<Slot<'a>> {
    for block in blocks {
        for slot in block.slots() {
            if slot.id == Some(slot_id) {
                return Some(slot);
            }
            if let Some(found) = find_slot_in(slot.children, slot_id) {
                return Some(found);
            }
        }
    }
    None
}

fn find_slot_in_mut<'a>(blocks: &'a mut [Block], slot_id: &str) -> Option<SlotMut<'a>> {
    for block in blocks.iter_mut() {
        for slot in block.slots_mut() {
            if slot.id == Some(slot_id) {
                return Some(slot);
            }
            if let Some(found) = find_slot_in_mut(slot.children, slot_id) {
                return Some(found);
            }
        }
    }
    None
}

fn slot_owner_in<'a>(blocks: &'a [Block], slot_id: &str) -> Option<&'a Block> {
    for block in blocks {
        for slot in block.slots() {
            if slot.id == Some(slot_id) {
                return Some(block);
            }
            if let Some(owner) = slot_owner_in(slot.children, slot_id) {
                return Some(owner);
            }
        }
    }
    None
}

fn locate_in(blocks: &[Block], parent: Option<&str>, id: &str) -> Option<Location> {
    for (index, block) in blocks.iter().enumerate() {
        if block.id() == Some(id) {
            return Some(Location {
                parent: parent.map(str::to_string),
                index,
            });
        }
        for slot in block.slots() {
            if let Some(location) = locate_in(slot.children, slot.id, id) {
                return Some(location);
            }
        }
    }
    None
}

impl Template {
    pub fn find_block(&self, id: &str) -> Option<&Block> {
        find_block_in(&self.blocks, id)
    }

    pub fn find_block_mut(&mut self, id: &str) -> Option<&mut Block> {
        find_block_in_mut(&mut self.blocks, id)
    }

    /// Parent slot and index of a block
    pub fn locate(&self, id: &str) -> Option<Location> {
        locate_in(&self.blocks, None, id)
    }

    /// Slot by id; `None` addresses the root list
    pub fn find_slot(&self, slot_id: Option<&str>) -> Option<Slot<'_>> {
        match slot_id {
            None => Some(Slot {
                id: None,
                kind: SlotKind::Root,
                children: &self.blocks,
            }),
            Some(id) => find_slot_in(&self.blocks, id),
        }
    }

    pub fn find_slot_mut(&mut self, slot_id: Option<&str>) -> Option<SlotMut<'_>> {
        match slot_id {
            None => Some(SlotMut {
                id: None,
                kind: SlotKind::Root,
                children: &mut self.blocks,
            }),
            Some(id) => find_slot_in_mut(&mut self.blocks, id),
        }
    }

    pub fn slot_kind(&self, slot_id: Option<&str>) -> Option<SlotKind> {
        self.find_slot(slot_id).map(|slot| slot.kind)
    }

    /// Block owning a slot (the columns/table block for column and cell slots)
    pub fn slot_owner(&self, slot_id: &str) -> Option<&Block> {
        slot_owner_in(&self.blocks, slot_id)
    }

    /// Ids of every block enclosing `slot_id`, nearest first
    pub fn slot_ancestors(&self, slot_id: Option<&str>) -> Vec<String> {
        let mut ancestors = Vec::new();
        let mut current = slot_id.map(str::to_string);

        while let Some(slot) = current {
            let owner = match self.slot_owner(&slot).and_then(Block::id) {
                Some(owner) => owner.to_string(),
                None => break,
            };
            if ancestors.contains(&owner) {
                warn!(block_id = %owner, "Cycle detected while walking ancestors");
                break;
            }
            current = self.locate(&owner).and_then(|location| location.parent);
            ancestors.push(owner);
        }

        ancestors
    }

    /// Every block, column, row and cell id in the tree
    pub fn collect_ids(&self) -> Vec<String> {
        collect_ids(&self.blocks)
    }

    /// Detach a block (and its subtree) from the tree
    pub fn take_block(&mut self, id: &str) -> Option<(Block, Location)> {
        let location = self.locate(id)?;
        let slot = self.find_slot_mut(location.parent.as_deref())?;
        let block = slot.children.remove(location.index);
        Some((block, location))
    }

    /// Insert into a slot at `index` (clamped; appends when `None`).
    /// Returns the index actually used.
    pub fn insert_block(
        &mut self,
        slot_id: Option<&str>,
        index: Option<usize>,
        block: Block,
    ) -> ModelResult<usize> {
        let slot = self
            .find_slot_mut(slot_id)
            .ok_or_else(|| ModelError::SlotNotFound(slot_id.unwrap_or("root").to_string()))?;
        let len = slot.children.len();
        let index = index.map_or(len, |i| i.min(len));
        slot.children.insert(index, block);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdGenerator;
    use crate::table::TableBlock;

    fn sample() -> Template {
        let mut ids = IdGenerator::new("sample");
        let mut template = Template::new("sample", "Sample");
        let table = TableBlock::with_grid("table", 2, 2, &mut ids);
        let cell_id = table.rows[1].cells[1].id.clone();
        let mut table = Block::Table(table);
        if let Some(t) = table.as_table_mut() {
            t.rows[1].cells[1]
                .children
                .push(Block::text("in-cell", crate::rich_text::empty_document()));
        }
        template.blocks = vec![
            Block::container(
                "outer",
                vec![Block::container("inner", vec![Block::text("leaf", crate::rich_text::empty_document())])],
            ),
            table,
        ];
        assert!(template.find_slot(Some(&cell_id)).is_some());
        template
    }

    #[test]
    fn test_find_and_locate() {
        let template = sample();

        assert!(template.find_block("leaf").is_some());
        assert_eq!(
            template.locate("leaf"),
            Some(Location {
                parent: Some("inner".to_string()),
                index: 0
            })
        );
        assert_eq!(
            template.locate("outer"),
            Some(Location {
                parent: None,
                index: 0
            })
        );
        assert!(template.locate("missing").is_none());
    }

    #[test]
    fn test_cell_slot_owned_by_table() {
        let template = sample();
        let location = template.locate("in-cell").unwrap();
        let cell = location.parent.unwrap();

        assert_eq!(template.slot_kind(Some(&cell)), Some(SlotKind::Cell));
        assert_eq!(template.slot_owner(&cell).and_then(Block::id), Some("table"));
    }

    #[test]
    fn test_slot_ancestors_nearest_first() {
        let template = sample();
        assert_eq!(
            template.slot_ancestors(Some("inner")),
            vec!["inner".to_string(), "outer".to_string()]
        );
        assert!(template.slot_ancestors(None).is_empty());
    }

    #[test]
    fn test_take_and_insert() {
        let mut template = sample();

        let (block, location) = template.take_block("leaf").unwrap();
        assert_eq!(location.index, 0);
        assert!(template.find_block("leaf").is_none());

        let index = template.insert_block(None, Some(99), block).unwrap();
        assert_eq!(index, 2);
        assert_eq!(template.blocks[2].id(), Some("leaf"));

        let missing = template.insert_block(Some("nope"), None, Block::container("x", vec![]));
        assert!(matches!(missing, Err(ModelError::SlotNotFound(_))));
    }

    #[test]
    fn test_collect_ids_includes_rows_and_cells() {
        let template = sample();
        let ids = template.collect_ids();

        assert!(ids.contains(&"table".to_string()));
        assert!(ids.contains(&"in-cell".to_string()));
        // 2 rows + 4 cells + table + in-cell + outer + inner + leaf
        assert_eq!(ids.len(), 11);
    }
}
