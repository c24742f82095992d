//! Structured control flow reconstruction for SPIR-V-style shader bytecode.
//!
//! Shader IR functions arrive as an unstructured block graph: basic blocks
//! carrying merge annotations and ending in branch instructions. This crate
//! rebuilds the nested if/loop/switch tree those annotations describe and
//! replays it into a target representation, in three stages:
//!
//! - **Build** ([`cfg::build_function`]): one forward pass over the
//!   control-flow-relevant instruction events of a function, producing a
//!   [`cfg::Block`] per label with its merge and terminator attached.
//! - **Structurize** ([`cfg::structurize`]): recursive-descent walk of the
//!   block graph that classifies every outgoing edge (break, continue,
//!   fallthrough, ...) and assembles an ordered [`cfg::CfNode`] tree,
//!   including switch cases placed in valid fallthrough order.
//! - **Emit** ([`cfg::emit_function`]): walk of the finished tree that
//!   drives a caller-supplied [`cfg::CfBuilder`] — a cursor-style builder
//!   for the target IR — delegating each block's straight-line instruction
//!   range back to the caller.
//!
//! Instruction decoding, value/type resolution, and non-control lowering
//! are the caller's concern; this crate never interprets instruction words.
//! All malformed-input conditions are fatal [`Error`]s — a half-structured
//! tree cannot be safely code-generated, so no tree is published on error.

pub mod cfg;
pub mod entity;
pub mod error;

pub use cfg::{
    build_function, emit_function, structurize, Block, BlockId, BranchType, Case, CaseId,
    CfBuilder, CfNode, CfgInst, Function, InstRange, LoopControl, Merge, SelectionControl,
    Terminator, ValueId,
};
pub use error::{Error, Result};
