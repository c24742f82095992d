//! Error type for CFG construction, structurization, and emission.
//!
//! Every variant is fatal: the walk aborts and no structured tree is
//! produced. A caller whose builder saw calls before an emission error
//! must discard whatever was built.

use thiserror::Error;

use crate::cfg::BlockId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A label (or the end of the stream) arrived while a block was still
    /// open — the block never received a terminator.
    #[error("block {block} has no terminator")]
    MissingTerminator { block: BlockId },

    /// The same label id opened two blocks.
    #[error("duplicate label {block}")]
    DuplicateLabel { block: BlockId },

    /// A block carried more than one merge annotation.
    #[error("block {block} has more than one merge instruction")]
    DuplicateMerge { block: BlockId },

    /// A merge or terminator instruction appeared with no open block.
    #[error("instruction at index {index} is outside any block")]
    InstructionOutsideBlock { index: usize },

    /// The instruction stream contained no label at all.
    #[error("function body contains no blocks")]
    EmptyFunction,

    /// A branch referenced a block id with no corresponding label.
    #[error("unknown block {block}")]
    UnknownBlock { block: BlockId },

    /// A conditional or switch required a selection merge annotation that
    /// the block does not carry.
    #[error("block {block} needs a selection merge for its terminator")]
    MissingSelectionMerge { block: BlockId },

    /// A terminator this translation cannot lower (bare `Unreachable`).
    #[error("unsupported terminator in block {block}")]
    UnsupportedTerminator { block: BlockId },

    /// A case branched into a second, different case — the fallthrough
    /// relation must have out-degree at most one.
    #[error("case at {case_start} already falls through to a different case")]
    AmbiguousFallthrough { case_start: BlockId },

    /// The fallthrough relation formed a cycle. The source format's own
    /// rules forbid this; hitting it is an invariant violation upstream.
    #[error("switch cases form a fallthrough cycle (at case {case_start})")]
    FallthroughCycle { case_start: BlockId },

    /// A branch led back into a block the walk already placed, outside the
    /// recognized loop-header path.
    #[error("block {block} reached twice during structurization")]
    BlockRevisited { block: BlockId },

    /// A fallthrough edge was classified with no enclosing switch case.
    #[error("fallthrough into block {block} outside any switch")]
    FallthroughOutsideSwitch { block: BlockId },

    /// The tree asked for a switch break where no switch fall variable is
    /// live. Indicates a malformed tree, not malformed input.
    #[error("switch break emitted outside any switch")]
    BreakOutsideSwitch,
}
