//! Block graph construction, structurization, and emission.

pub mod block;
pub mod build;
pub mod emit;
pub mod structurize;

pub use block::{
    Block, BlockId, BranchType, Case, CaseId, CfNode, Function, InstRange, LoopControl, Merge,
    SelectionControl, Terminator, ValueId,
};
pub use build::{build_function, CfgInst};
pub use emit::{emit_function, CfBuilder};
pub use structurize::structurize;
