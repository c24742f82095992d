//! Structured tree emission.
//!
//! Replays a structurized [`Function`] into a target representation through
//! the [`CfBuilder`] trait — a cursor-style builder the caller implements
//! for their IR. Per-block instruction lowering stays with the caller: the
//! emitter only reproduces control flow and hands every block's instruction
//! range back through [`CfBuilder::handle_block`].
//!
//! Two constructs need scaffolding the source model doesn't have:
//!
//! - Switch cases become a chain of `if (cond || fall)` guards sharing a
//!   `fall` boolean, which is how case fallthrough survives in a
//!   representation without native switches.
//! - A loop's continue construct runs at the *end* of an iteration in the
//!   source model but is hoisted to the *top* of the structured loop, behind
//!   a did-first-iteration guard.

use crate::cfg::block::{
    BlockId, BranchType, CfNode, Function, InstRange, LoopControl, SelectionControl, Terminator,
    ValueId,
};
use crate::error::{Error, Result};

/// Target-side construction interface driven by the emitter.
///
/// Models a cursor-based IR builder: `push_*` opens a construct and moves
/// the insertion point inside it, `pop_*` closes it and moves the point
/// after it. `Value` and `BoolVar` are the target's runtime-value and
/// local-variable handles; both stay opaque to the emitter.
pub trait CfBuilder {
    type Value: Copy;
    type BoolVar: Copy;

    /// Lower one block's straight-line instruction range.
    fn handle_block(&mut self, block: BlockId, range: InstRange) -> Result<()>;

    /// Resolve an operand id to a runtime value at the current cursor.
    fn value(&mut self, id: ValueId) -> Result<Self::Value>;

    /// Store a value into the function's return slot, ahead of the return
    /// jump.
    fn store_return(&mut self, value: ValueId) -> Result<()>;

    /// Create a boolean local, initialized before the current cursor.
    fn declare_bool(&mut self, name: &str, init: bool) -> Self::BoolVar;
    fn store_bool(&mut self, var: Self::BoolVar, value: bool);
    fn load_bool(&mut self, var: Self::BoolVar) -> Self::Value;

    fn const_bool(&mut self, value: bool) -> Self::Value;
    /// `value == literal` as a boolean value.
    fn eq_const(&mut self, value: Self::Value, literal: u32) -> Self::Value;
    fn or(&mut self, a: Self::Value, b: Self::Value) -> Self::Value;
    fn not(&mut self, a: Self::Value) -> Self::Value;

    fn push_if(&mut self, cond: Self::Value, control: SelectionControl);
    fn push_else(&mut self);
    fn pop_if(&mut self);
    fn push_loop(&mut self, control: LoopControl);
    fn pop_loop(&mut self);

    fn emit_break(&mut self);
    fn emit_continue(&mut self);
    fn emit_return(&mut self);
    fn emit_discard(&mut self);
}

/// Emit a structurized function into the target via `builder`.
pub fn emit_function<B: CfBuilder>(func: &Function, builder: &mut B) -> Result<()> {
    let mut has_break = false;
    emit_cf_list(func, &func.body, None, &mut has_break, builder)
}

/// Emit one node list. `fall_var` is the nearest enclosing switch's fall
/// variable; `has_break_out` reports a switch break somewhere in this list
/// to the caller, which must then guard whatever follows.
fn emit_cf_list<B: CfBuilder>(
    func: &Function,
    nodes: &[CfNode],
    fall_var: Option<B::BoolVar>,
    has_break_out: &mut bool,
    builder: &mut B,
) -> Result<()> {
    // `if (fall)` guards opened after a nested switch break; everything
    // later in this list nests inside them.
    let mut open_guards = 0usize;

    for node in nodes {
        match node {
            CfNode::Block(id) => {
                let block = func.block(*id)?;
                builder.handle_block(*id, block.range)?;
                if let Terminator::ReturnValue(value) = block.terminator {
                    builder.store_return(value)?;
                }
                emit_branch(block.branch_type, fall_var, has_break_out, builder)?;
            }

            CfNode::If {
                cond,
                control,
                then_type,
                else_type,
                then_body,
                else_body,
            } => {
                let cond = builder.value(*cond)?;
                let mut sw_break = false;

                builder.push_if(cond, *control);
                if *then_type == BranchType::None {
                    emit_cf_list(func, then_body, fall_var, &mut sw_break, builder)?;
                } else {
                    emit_branch(*then_type, fall_var, &mut sw_break, builder)?;
                }
                builder.push_else();
                if *else_type == BranchType::None {
                    emit_cf_list(func, else_body, fall_var, &mut sw_break, builder)?;
                } else {
                    emit_branch(*else_type, fall_var, &mut sw_break, builder)?;
                }
                builder.pop_if();

                if sw_break {
                    // An arm stored into the fall variable; the rest of
                    // this scope only runs when the switch wasn't broken.
                    *has_break_out = true;
                    let fall = fall_var.ok_or(Error::BreakOutsideSwitch)?;
                    let guard = builder.load_bool(fall);
                    builder.push_if(guard, SelectionControl::empty());
                    open_guards += 1;
                }
            }

            CfNode::Loop {
                control,
                body,
                cont_body,
            } => {
                // A switch break never crosses a loop boundary, so the
                // body emits without a fall variable.
                let mut ignored = false;
                if cont_body.is_empty() {
                    builder.push_loop(*control);
                    emit_cf_list(func, body, None, &mut ignored, builder)?;
                    builder.pop_loop();
                } else {
                    let do_cont = builder.declare_bool("cont", false);
                    builder.push_loop(*control);
                    let guard = builder.load_bool(do_cont);
                    builder.push_if(guard, SelectionControl::empty());
                    emit_cf_list(func, cont_body, None, &mut ignored, builder)?;
                    builder.pop_if();
                    builder.store_bool(do_cont, true);
                    emit_cf_list(func, body, None, &mut ignored, builder)?;
                    builder.pop_loop();
                }
            }

            CfNode::Switch { selector, cases } => {
                let selector = builder.value(*selector)?;
                let fall = builder.declare_bool("fall", false);

                // One condition per non-default case, OR of its literal
                // comparisons; the default matches when nothing else does.
                let mut any = builder.const_bool(false);
                let mut conds: Vec<Option<B::Value>> = Vec::with_capacity(cases.len());
                for &case_id in cases {
                    let case = &func.cases[case_id];
                    if case.is_default {
                        conds.push(None);
                        continue;
                    }
                    let mut cond = builder.const_bool(false);
                    for &literal in &case.values {
                        let eq = builder.eq_const(selector, literal);
                        cond = builder.or(cond, eq);
                    }
                    any = builder.or(any, cond);
                    conds.push(Some(cond));
                }

                for (index, &case_id) in cases.iter().enumerate() {
                    let case = &func.cases[case_id];
                    let cond = match conds[index] {
                        Some(cond) => cond,
                        None => builder.not(any),
                    };
                    let fall_now = builder.load_bool(fall);
                    let enter = builder.or(cond, fall_now);

                    builder.push_if(enter, SelectionControl::empty());
                    builder.store_bool(fall, true);
                    // A break at the tail of the case body has nothing
                    // after it to guard.
                    let mut case_break = false;
                    emit_cf_list(func, &case.body, Some(fall), &mut case_break, builder)?;
                    builder.pop_if();
                }
            }
        }
    }

    for _ in 0..open_guards {
        builder.pop_if();
    }
    Ok(())
}

/// Emit the target-side action for a classified short-circuit edge.
fn emit_branch<B: CfBuilder>(
    branch_type: BranchType,
    fall_var: Option<B::BoolVar>,
    has_break_out: &mut bool,
    builder: &mut B,
) -> Result<()> {
    match branch_type {
        BranchType::None => {}
        BranchType::SwitchBreak => {
            let fall = fall_var.ok_or(Error::BreakOutsideSwitch)?;
            builder.store_bool(fall, false);
            *has_break_out = true;
        }
        // Execution falls into the next case's guard by itself.
        BranchType::SwitchFallthrough => {}
        BranchType::LoopBreak => builder.emit_break(),
        BranchType::LoopContinue => builder.emit_continue(),
        BranchType::Return => builder.emit_return(),
        BranchType::Discard => builder.emit_discard(),
    }
    Ok(())
}
