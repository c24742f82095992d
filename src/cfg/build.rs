//! Block graph construction.
//!
//! One forward pass over a function's control-flow-relevant instruction
//! events: every label opens a block, every merge annotation attaches to
//! the open block, every terminator closes it. Straight-line instructions
//! are never inspected — they only extend the open block's index range,
//! which the emitter later hands back to the caller's instruction handler.

use std::collections::HashMap;

use crate::cfg::block::{Block, BlockId, BranchType, Function, InstRange, Merge, Terminator, ValueId};
use crate::entity::PrimaryMap;
use crate::error::{Error, Result};

/// One decoded instruction event, as seen by the graph builder.
///
/// The decoder walks the function body once and reports only what control
/// flow needs; everything else is [`CfgInst::Other`] and lands in the
/// current block's range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfgInst {
    /// A function parameter declaration.
    Param(ValueId),
    /// A label opening a new block.
    Label(BlockId),
    /// A merge annotation for the currently open block.
    Merge(Merge),
    /// The terminator closing the currently open block.
    Terminator(Terminator),
    /// Any straight-line instruction.
    Other,
}

/// A block mid-construction: everything known before its terminator.
struct OpenBlock {
    id: BlockId,
    merge: Option<Merge>,
    /// Index of the first instruction after the label.
    start: usize,
}

/// Build a function's block graph from its instruction events.
///
/// The first label becomes the entry block. Fails if any block is left
/// without a terminator, if a label id repeats, or if a merge or
/// terminator appears outside a block.
pub fn build_function(insts: impl IntoIterator<Item = CfgInst>) -> Result<Function> {
    let mut params = Vec::new();
    let mut blocks: HashMap<BlockId, Block> = HashMap::new();
    let mut entry = None;
    let mut open: Option<OpenBlock> = None;

    for (index, inst) in insts.into_iter().enumerate() {
        match inst {
            CfgInst::Param(value) => params.push(value),

            CfgInst::Label(id) => {
                if let Some(prev) = &open {
                    return Err(Error::MissingTerminator { block: prev.id });
                }
                if blocks.contains_key(&id) {
                    return Err(Error::DuplicateLabel { block: id });
                }
                if entry.is_none() {
                    entry = Some(id);
                }
                open = Some(OpenBlock {
                    id,
                    merge: None,
                    start: index + 1,
                });
            }

            CfgInst::Merge(merge) => {
                let block = open
                    .as_mut()
                    .ok_or(Error::InstructionOutsideBlock { index })?;
                if block.merge.is_some() {
                    return Err(Error::DuplicateMerge { block: block.id });
                }
                block.merge = Some(merge);
            }

            CfgInst::Terminator(terminator) => {
                let block = open
                    .take()
                    .ok_or(Error::InstructionOutsideBlock { index })?;
                blocks.insert(
                    block.id,
                    Block {
                        id: block.id,
                        range: InstRange::new(block.start, index),
                        merge: block.merge,
                        terminator,
                        branch_type: BranchType::None,
                        switch_case: None,
                        loop_claimed: false,
                    },
                );
            }

            CfgInst::Other => {}
        }
    }

    if let Some(block) = open {
        return Err(Error::MissingTerminator { block: block.id });
    }
    let entry = entry.ok_or(Error::EmptyFunction)?;

    Ok(Function {
        params,
        entry,
        blocks,
        body: Vec::new(),
        cases: PrimaryMap::new(),
    })
}
