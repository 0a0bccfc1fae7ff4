//! Which block types a slot accepts

use stencil_model::{BlockKind, SlotKind};

const HEADER_FOOTER: &[BlockKind] = &[BlockKind::PageHeader, BlockKind::PageFooter];

const NO_PAGE_FLOW: &[BlockKind] = &[
    BlockKind::PageHeader,
    BlockKind::PageFooter,
    BlockKind::PageBreak,
];

const CELL: &[BlockKind] = &[
    BlockKind::PageHeader,
    BlockKind::PageFooter,
    BlockKind::PageBreak,
    BlockKind::Table,
    BlockKind::Columns,
];

/// Child types a slot rejects
pub fn rejected_children(slot: SlotKind) -> &'static [BlockKind] {
    match slot {
        SlotKind::Root => &[],
        SlotKind::Block(BlockKind::PageHeader) | SlotKind::Block(BlockKind::PageFooter) => {
            NO_PAGE_FLOW
        }
        SlotKind::Block(_) => HEADER_FOOTER,
        SlotKind::Column => NO_PAGE_FLOW,
        SlotKind::Cell => CELL,
    }
}

pub fn accepts(slot: SlotKind, child: BlockKind) -> bool {
    !rejected_children(slot).contains(&child)
}
