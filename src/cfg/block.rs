//! Data model for the block graph and the structured control-flow tree.
//!
//! A [`Function`] owns its blocks (keyed by wire-level label id) and a
//! per-function [`Case`] arena; the [`CfNode`] tree references both by id,
//! so the tree is acyclic by construction and no block is ever owned by
//! more than one tree position.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::define_entity;
use crate::entity::PrimaryMap;
use crate::error::{Error, Result};

/// Label id of a basic block, as assigned by the source bytecode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Result id of a value operand (condition, selector, return value).
/// Opaque to this crate; the emitter hands it back to the caller's
/// resolver.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ValueId(pub u32);

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

define_entity!(CaseId);

/// Half-open index range into the external decoder's instruction stream.
///
/// Covers everything between a block's label and its terminator, including
/// any merge annotation — the per-block handler is expected to skip merges,
/// the same way the decoder's own handler does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstRange {
    pub start: usize,
    pub end: usize,
}

impl InstRange {
    pub fn new(start: usize, end: usize) -> Self {
        InstRange { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

bitflags! {
    /// Selection control hints from a selection merge instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct SelectionControl: u32 {
        const FLATTEN = 0x1;
        const DONT_FLATTEN = 0x2;
    }
}

bitflags! {
    /// Loop control hints from a loop merge instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct LoopControl: u32 {
        const UNROLL = 0x1;
        const DONT_UNROLL = 0x2;
    }
}

/// Merge annotation attached to a block ahead of its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Merge {
    /// Declares where a conditional or switch reconverges.
    Selection {
        merge: BlockId,
        control: SelectionControl,
    },
    /// Declares a loop's break target and its continue construct.
    Loop {
        merge: BlockId,
        cont: BlockId,
        control: LoopControl,
    },
}

/// The final instruction of a block; determines its successors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminator {
    Branch {
        target: BlockId,
    },
    BranchConditional {
        cond: ValueId,
        then_target: BlockId,
        else_target: BlockId,
    },
    Switch {
        selector: ValueId,
        default: BlockId,
        /// `(literal, target)` pairs in instruction order.
        targets: Vec<(u32, BlockId)>,
    },
    Return,
    ReturnValue(ValueId),
    Discard,
    Unreachable,
}

/// How a block's outgoing edge relates to the enclosing constructs.
/// Computed lazily during the structurizing walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BranchType {
    /// Ordinary continuation — the walk physically visits the target next.
    #[default]
    None,
    SwitchBreak,
    SwitchFallthrough,
    LoopBreak,
    LoopContinue,
    Return,
    Discard,
}

/// One basic block of the unstructured graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    /// The block's straight-line instruction range, owned by the external
    /// decoder and never copied.
    pub range: InstRange,
    pub merge: Option<Merge>,
    pub terminator: Terminator,
    /// Filled in by the structurizer.
    pub branch_type: BranchType,
    /// The case this block starts, if any. Set once.
    pub switch_case: Option<CaseId>,
    /// Whether a `Loop` node already claimed this block as its header.
    /// The loop-body walk re-enters the header; this marker keeps the
    /// second arrival on the plain-block path instead of recursing forever.
    pub loop_claimed: bool,
}

/// One switch case: a start block, the structured body reachable from it,
/// and the selector literals that pick it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub start: BlockId,
    pub body: Vec<CfNode>,
    /// Empty with `is_default` set means the case is default-only.
    pub values: Vec<u32>,
    pub is_default: bool,
    /// At most one case this one falls through into.
    pub fallthrough: Option<CaseId>,
    /// Transient marker used only while reordering.
    pub visited: bool,
}

/// A node of the structured control-flow tree. Sequences are in execution
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CfNode {
    /// Emit one block's straight-line instructions, then its branch action.
    Block(BlockId),
    /// Two-armed conditional. An arm with a non-`None` branch type has an
    /// empty body and emits that short-circuit action instead.
    If {
        cond: ValueId,
        control: SelectionControl,
        then_type: BranchType,
        else_type: BranchType,
        then_body: Vec<CfNode>,
        else_body: Vec<CfNode>,
    },
    /// Structured loop. `cont_body` is the continue construct; it runs at
    /// the end of an iteration in the source model.
    Loop {
        control: LoopControl,
        body: Vec<CfNode>,
        cont_body: Vec<CfNode>,
    },
    /// Switch with cases already placed in valid fallthrough order.
    Switch {
        selector: ValueId,
        cases: Vec<CaseId>,
    },
}

/// A function: parameters, entry block, the block graph, and (after
/// structurization) the structured body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub params: Vec<ValueId>,
    pub entry: BlockId,
    pub blocks: HashMap<BlockId, Block>,
    /// Structured body, filled by [`crate::cfg::structurize`].
    pub body: Vec<CfNode>,
    /// Arena of all switch cases in this function.
    pub cases: PrimaryMap<CaseId, Case>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> Result<&Block> {
        self.blocks.get(&id).ok_or(Error::UnknownBlock { block: id })
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        self.blocks
            .get_mut(&id)
            .ok_or(Error::UnknownBlock { block: id })
    }
}
