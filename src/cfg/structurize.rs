//! Structured control flow reconstruction.
//!
//! Walks the block graph with a cursor, classifying every outgoing edge
//! against the enclosing constructs' break/continue targets and recursing
//! into nested loop bodies, conditional arms, and switch cases. The result
//! is the function's ordered `CfNode` tree.
//!
//! The walk trusts the source format's merge annotations rather than
//! computing dominators: a loop exists exactly where a loop merge says it
//! does, and a conditional reconverges exactly at its selection merge.

use std::collections::HashSet;

use crate::cfg::block::{
    BlockId, BranchType, Case, CaseId, CfNode, Function, Merge, SelectionControl, Terminator,
};
use crate::error::{Error, Result};

/// Short-circuit targets of the constructs enclosing the cursor.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    /// The case whose body the walk is inside, if any.
    swcase: Option<CaseId>,
    /// The enclosing switch's merge block.
    switch_break: Option<BlockId>,
    /// The enclosing loop's merge block.
    loop_break: Option<BlockId>,
    /// The enclosing loop's continue block.
    loop_cont: Option<BlockId>,
}

/// Structurize a function: classify its edges and fill `func.body` with
/// the ordered control-flow tree.
///
/// Fatal on malformed input — a block revisited outside the loop-header
/// path, a missing merge annotation, a bare `Unreachable`, conflicting or
/// cyclic case fallthroughs. On error `func.body` stays empty, though
/// per-block classification markers written before the failure are not
/// rolled back.
pub fn structurize(func: &mut Function) -> Result<()> {
    let entry = func.entry;
    let mut walker = Walker {
        func,
        placed: HashSet::new(),
    };
    let body = walker.walk(entry, Scope::default(), None)?;
    func.body = body;
    Ok(())
}

struct Walker<'f> {
    func: &'f mut Function,
    /// Every block already placed as a `CfNode::Block`. A second placement
    /// means the graph re-enters a finished construct; bail out instead of
    /// walking forever.
    placed: HashSet<BlockId>,
}

impl Walker<'_> {
    /// Walk everything reachable from `start` up to (but not including)
    /// `end`, given the enclosing short-circuit targets.
    fn walk(&mut self, start: BlockId, scope: Scope, end: Option<BlockId>) -> Result<Vec<CfNode>> {
        let mut list = Vec::new();
        let mut cursor = start;

        while Some(cursor) != end {
            // A loop header not yet claimed starts a Loop node. The body
            // walk below re-enters this same block; `loop_claimed` routes
            // that second arrival to the plain-block path.
            let block = self.func.block(cursor)?;
            if let (Some(Merge::Loop { merge, cont, control }), false) =
                (block.merge, block.loop_claimed)
            {
                self.func.block_mut(cursor)?.loop_claimed = true;

                // A switch break cannot cross the loop boundary, so the
                // body walk drops it; the enclosing case is kept because
                // the loop's merge block may start another case.
                let body_scope = Scope {
                    swcase: scope.swcase,
                    switch_break: None,
                    loop_break: Some(merge),
                    loop_cont: Some(cont),
                };
                let body = self.walk(cursor, body_scope, None)?;
                let cont_body = self.walk(cont, Scope::default(), Some(cursor))?;

                list.push(CfNode::Loop {
                    control,
                    body,
                    cont_body,
                });
                cursor = merge;
                continue;
            }

            self.place(cursor)?;
            list.push(CfNode::Block(cursor));

            let terminator = self.func.block(cursor)?.terminator.clone();
            match terminator {
                Terminator::Branch { target } => {
                    let branch_type = self.classify(target, scope)?;
                    if branch_type != BranchType::None {
                        self.func.block_mut(cursor)?.branch_type = branch_type;
                        return Ok(list);
                    }
                    cursor = target;
                }

                Terminator::Return | Terminator::ReturnValue(_) => {
                    self.func.block_mut(cursor)?.branch_type = BranchType::Return;
                    return Ok(list);
                }

                Terminator::Discard => {
                    self.func.block_mut(cursor)?.branch_type = BranchType::Discard;
                    return Ok(list);
                }

                Terminator::Unreachable => {
                    return Err(Error::UnsupportedTerminator { block: cursor });
                }

                Terminator::BranchConditional {
                    cond,
                    then_target,
                    else_target,
                } => {
                    let then_type = self.classify(then_target, scope)?;
                    let else_type = self.classify(else_target, scope)?;
                    let control = match self.func.block(cursor)?.merge {
                        Some(Merge::Selection { control, .. }) => control,
                        _ => SelectionControl::empty(),
                    };

                    if then_type == BranchType::None && else_type == BranchType::None {
                        // Neither side short-circuits: a full conditional
                        // reconverging at the selection merge.
                        let Some(Merge::Selection { merge, .. }) = self.func.block(cursor)?.merge
                        else {
                            return Err(Error::MissingSelectionMerge { block: cursor });
                        };
                        let then_body = self.walk(then_target, scope, Some(merge))?;
                        let else_body = self.walk(else_target, scope, Some(merge))?;
                        list.push(CfNode::If {
                            cond,
                            control,
                            then_type,
                            else_type,
                            then_body,
                            else_body,
                        });
                        cursor = merge;
                    } else if then_type != BranchType::None && else_type != BranchType::None {
                        // Both sides short-circuit; nothing follows here.
                        list.push(CfNode::If {
                            cond,
                            control,
                            then_type,
                            else_type,
                            then_body: Vec::new(),
                            else_body: Vec::new(),
                        });
                        return Ok(list);
                    } else {
                        // Exactly one side short-circuits: a guarded early
                        // exit. The walk carries on through the other side
                        // as if it were what comes after the conditional.
                        list.push(CfNode::If {
                            cond,
                            control,
                            then_type,
                            else_type,
                            then_body: Vec::new(),
                            else_body: Vec::new(),
                        });
                        cursor = if then_type == BranchType::None {
                            then_target
                        } else {
                            else_target
                        };
                    }
                }

                Terminator::Switch {
                    selector,
                    default,
                    targets,
                } => {
                    let Some(Merge::Selection { merge: break_block, .. }) =
                        self.func.block(cursor)?.merge
                    else {
                        return Err(Error::MissingSelectionMerge { block: cursor });
                    };

                    // Group targets into cases first; a target equal to the
                    // break block is a dead break-only case and is dropped,
                    // not turned into an empty case.
                    let mut case_ids = Vec::new();
                    self.add_case(&mut case_ids, break_block, default, None, true)?;
                    for &(value, target) in &targets {
                        self.add_case(&mut case_ids, break_block, target, Some(value), false)?;
                    }

                    // Walk each distinct case once, in discovery order.
                    // Fallthrough edges discovered here attach to the case
                    // being walked.
                    for &case_id in &case_ids {
                        let case_start = self.func.cases[case_id].start;
                        let case_scope = Scope {
                            swcase: Some(case_id),
                            switch_break: Some(break_block),
                            loop_break: scope.loop_break,
                            loop_cont: scope.loop_cont,
                        };
                        let body = self.walk(case_start, case_scope, None)?;
                        self.func.cases[case_id].body = body;
                    }

                    let cases = self.order_cases(&case_ids)?;
                    list.push(CfNode::Switch { selector, cases });
                    cursor = break_block;
                }
            }
        }

        Ok(list)
    }

    /// Classify an outgoing edge against the enclosing constructs.
    ///
    /// A target that starts a case is a fallthrough and gets recorded on
    /// the current case; otherwise the target is matched against the
    /// break/continue blocks, innermost construct first.
    fn classify(&mut self, target: BlockId, scope: Scope) -> Result<BranchType> {
        if let Some(target_case) = self.func.block(target)?.switch_case {
            let Some(current) = scope.swcase else {
                return Err(Error::FallthroughOutsideSwitch { block: target });
            };
            let case = &mut self.func.cases[current];
            match case.fallthrough {
                Some(existing) if existing != target_case => {
                    return Err(Error::AmbiguousFallthrough {
                        case_start: case.start,
                    });
                }
                _ => case.fallthrough = Some(target_case),
            }
            return Ok(BranchType::SwitchFallthrough);
        }

        if Some(target) == scope.switch_break {
            Ok(BranchType::SwitchBreak)
        } else if Some(target) == scope.loop_break {
            Ok(BranchType::LoopBreak)
        } else if Some(target) == scope.loop_cont {
            Ok(BranchType::LoopContinue)
        } else {
            Ok(BranchType::None)
        }
    }

    /// Record a switch target, creating or extending the case that owns
    /// its start block. Targets sharing a block share one case; whichever
    /// case was created first wins, which also decides duplicate literals
    /// (implementation-defined upstream).
    fn add_case(
        &mut self,
        case_ids: &mut Vec<CaseId>,
        break_block: BlockId,
        target: BlockId,
        value: Option<u32>,
        is_default: bool,
    ) -> Result<()> {
        if target == break_block {
            return Ok(());
        }

        let case_id = match self.func.block(target)?.switch_case {
            Some(existing) => {
                // A start block claimed by a different switch means the
                // graph re-enters a finished construct.
                if !case_ids.contains(&existing) {
                    return Err(Error::BlockRevisited { block: target });
                }
                existing
            }
            None => {
                let case_id = self.func.cases.push(Case {
                    start: target,
                    body: Vec::new(),
                    values: Vec::new(),
                    is_default: false,
                    fallthrough: None,
                    visited: false,
                });
                self.func.block_mut(target)?.switch_case = Some(case_id);
                case_ids.push(case_id);
                case_id
            }
        };

        let case = &mut self.func.cases[case_id];
        if is_default {
            case.is_default = true;
        } else if let Some(value) = value {
            case.values.push(value);
        }
        Ok(())
    }

    /// Depth-first pass putting a switch's cases into fallthrough order:
    /// every case with a fallthrough target ends up immediately before
    /// that target. Driven in discovery order so unconstrained cases keep
    /// a deterministic relative order.
    fn order_cases(&mut self, discovered: &[CaseId]) -> Result<Vec<CaseId>> {
        let mut ordered = discovered.to_vec();
        for &case_id in discovered {
            self.order_case(case_id, &mut ordered)?;
        }
        Ok(ordered)
    }

    fn order_case(&mut self, case_id: CaseId, list: &mut Vec<CaseId>) -> Result<()> {
        if self.func.cases[case_id].visited {
            return Ok(());
        }
        self.func.cases[case_id].visited = true;

        if let Some(position) = list.iter().position(|&c| c == case_id) {
            list.remove(position);
        }

        match self.func.cases[case_id].fallthrough {
            Some(fallthrough) => {
                self.order_case(fallthrough, list)?;
                // The target was reinserted by the recursive call unless
                // the relation loops back through a case currently
                // detached — that is a cycle.
                let position = list.iter().position(|&c| c == fallthrough).ok_or(
                    Error::FallthroughCycle {
                        case_start: self.func.cases[case_id].start,
                    },
                )?;
                list.insert(position, case_id);
            }
            None => list.insert(0, case_id),
        }
        Ok(())
    }

    /// Mark a block as placed in the tree; placing it twice is fatal.
    fn place(&mut self, block: BlockId) -> Result<()> {
        if !self.placed.insert(block) {
            return Err(Error::BlockRevisited { block });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::block::{LoopControl, ValueId};
    use crate::cfg::build::{build_function, CfgInst};

    fn b(n: u32) -> BlockId {
        BlockId(n)
    }

    fn v(n: u32) -> ValueId {
        ValueId(n)
    }

    fn label(n: u32) -> CfgInst {
        CfgInst::Label(b(n))
    }

    fn sel_merge(m: u32) -> CfgInst {
        CfgInst::Merge(Merge::Selection {
            merge: b(m),
            control: SelectionControl::empty(),
        })
    }

    fn loop_merge(m: u32, c: u32) -> CfgInst {
        CfgInst::Merge(Merge::Loop {
            merge: b(m),
            cont: b(c),
            control: LoopControl::empty(),
        })
    }

    fn goto(t: u32) -> CfgInst {
        CfgInst::Terminator(Terminator::Branch { target: b(t) })
    }

    fn cond_goto(c: u32, t: u32, e: u32) -> CfgInst {
        CfgInst::Terminator(Terminator::BranchConditional {
            cond: v(c),
            then_target: b(t),
            else_target: b(e),
        })
    }

    fn switch(sel: u32, default: u32, targets: &[(u32, u32)]) -> CfgInst {
        CfgInst::Terminator(Terminator::Switch {
            selector: v(sel),
            default: b(default),
            targets: targets.iter().map(|&(val, t)| (val, b(t))).collect(),
        })
    }

    fn ret() -> CfgInst {
        CfgInst::Terminator(Terminator::Return)
    }

    fn structurized(insts: Vec<CfgInst>) -> Function {
        let mut func = build_function(insts).unwrap();
        structurize(&mut func).unwrap();
        func
    }

    /// All block ids referenced by `CfNode::Block` positions, in tree
    /// order, across the whole function.
    fn placed_blocks(func: &Function) -> Vec<BlockId> {
        fn collect(func: &Function, nodes: &[CfNode], out: &mut Vec<BlockId>) {
            for node in nodes {
                match node {
                    CfNode::Block(id) => out.push(*id),
                    CfNode::If {
                        then_body,
                        else_body,
                        ..
                    } => {
                        collect(func, then_body, out);
                        collect(func, else_body, out);
                    }
                    CfNode::Loop {
                        body, cont_body, ..
                    } => {
                        collect(func, body, out);
                        collect(func, cont_body, out);
                    }
                    CfNode::Switch { cases, .. } => {
                        for &case in cases {
                            collect(func, &func.cases[case].body, out);
                        }
                    }
                }
            }
        }
        let mut out = Vec::new();
        collect(func, &func.body, &mut out);
        out
    }

    #[test]
    fn straight_line_chain() {
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            goto(3),
            label(3),
            ret(),
        ]);
        assert_eq!(
            func.body,
            vec![
                CfNode::Block(b(1)),
                CfNode::Block(b(2)),
                CfNode::Block(b(3)),
            ]
        );
        assert_eq!(func.blocks[&b(3)].branch_type, BranchType::Return);
    }

    // Spec scenario: both arms of a conditional walk to the same selection
    // merge, producing one If with two bodies and no recorded branch type.
    #[test]
    fn diamond_conditional() {
        let func = structurized(vec![
            label(1),
            sel_merge(4),
            cond_goto(9, 2, 3),
            label(2),
            goto(4),
            label(3),
            goto(4),
            label(4),
            ret(),
        ]);

        assert_eq!(func.body.len(), 3);
        assert_eq!(func.body[0], CfNode::Block(b(1)));
        let CfNode::If {
            then_type,
            else_type,
            then_body,
            else_body,
            ..
        } = &func.body[1]
        else {
            panic!("expected If, got {:?}", func.body[1]);
        };
        assert_eq!(*then_type, BranchType::None);
        assert_eq!(*else_type, BranchType::None);
        assert_eq!(then_body, &vec![CfNode::Block(b(2))]);
        assert_eq!(else_body, &vec![CfNode::Block(b(3))]);
        assert_eq!(func.body[2], CfNode::Block(b(4)));
    }

    #[test]
    fn one_armed_conditional_has_empty_else() {
        // then walks to the merge; else goes straight there.
        let func = structurized(vec![
            label(1),
            sel_merge(3),
            cond_goto(9, 2, 3),
            label(2),
            goto(3),
            label(3),
            ret(),
        ]);

        let CfNode::If {
            then_body,
            else_body,
            ..
        } = &func.body[1]
        else {
            panic!("expected If");
        };
        assert_eq!(then_body, &vec![CfNode::Block(b(2))]);
        assert!(else_body.is_empty());
    }

    // Spec scenario: loop whose back edge targets the continue block which
    // is the header itself — empty continue construct.
    #[test]
    fn loop_with_empty_continue_construct() {
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(5, 2),
            cond_goto(9, 3, 5),
            label(3),
            goto(2),
            label(5),
            ret(),
        ]);

        assert_eq!(func.body.len(), 3);
        let CfNode::Loop {
            body, cont_body, ..
        } = &func.body[1]
        else {
            panic!("expected Loop, got {:?}", func.body[1]);
        };
        assert!(cont_body.is_empty());

        // Header's conditional: else side breaks, then side walks on.
        let CfNode::If {
            then_type,
            else_type,
            ..
        } = &body[1]
        else {
            panic!("expected If in loop body");
        };
        assert_eq!(*then_type, BranchType::None);
        assert_eq!(*else_type, BranchType::LoopBreak);
        // The back edge to the header classified as a continue.
        assert_eq!(func.blocks[&b(3)].branch_type, BranchType::LoopContinue);
        assert_eq!(func.body[2], CfNode::Block(b(5)));
    }

    #[test]
    fn loop_with_separate_continue_block() {
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(6, 4),
            cond_goto(9, 3, 6),
            label(3),
            goto(4),
            label(4),
            goto(2),
            label(6),
            ret(),
        ]);

        let CfNode::Loop {
            body, cont_body, ..
        } = &func.body[1]
        else {
            panic!("expected Loop");
        };
        // Body ends at the edge into the continue block.
        assert_eq!(func.blocks[&b(3)].branch_type, BranchType::LoopContinue);
        assert_eq!(body.last(), Some(&CfNode::Block(b(3))));
        // Continue construct holds the continue block, walked up to the
        // header.
        assert_eq!(cont_body, &vec![CfNode::Block(b(4))]);
        assert_eq!(func.blocks[&b(4)].branch_type, BranchType::None);
    }

    // Spec scenario: then targets the loop's continue block, else is an
    // ordinary block — a guarded continue, with the walk resuming on the
    // else side.
    #[test]
    fn guarded_continue() {
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(6, 5),
            cond_goto(9, 3, 6),
            label(3),
            cond_goto(8, 5, 4),
            label(4),
            goto(5),
            label(5),
            goto(2),
            label(6),
            ret(),
        ]);

        let CfNode::Loop { body, .. } = &func.body[1] else {
            panic!("expected Loop");
        };
        // body: [Block 2, If(break guard), Block 3, If(continue guard), Block 4]
        let CfNode::If {
            then_type,
            else_type,
            then_body,
            else_body,
            ..
        } = &body[3]
        else {
            panic!("expected guarded continue If, got {body:?}");
        };
        assert_eq!(*then_type, BranchType::LoopContinue);
        assert_eq!(*else_type, BranchType::None);
        assert!(then_body.is_empty());
        assert!(else_body.is_empty());
        assert_eq!(body[4], CfNode::Block(b(4)));
        assert_eq!(func.blocks[&b(4)].branch_type, BranchType::LoopContinue);
    }

    #[test]
    fn both_arms_short_circuit() {
        // Inside a loop: then breaks, else continues. Nothing follows.
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(6, 2),
            cond_goto(9, 3, 6),
            label(3),
            cond_goto(8, 6, 2),
            label(6),
            ret(),
        ]);

        let CfNode::Loop { body, .. } = &func.body[1] else {
            panic!("expected Loop");
        };
        let CfNode::If {
            then_type,
            else_type,
            then_body,
            else_body,
            ..
        } = body.last().unwrap()
        else {
            panic!("expected trailing If");
        };
        assert_eq!(*then_type, BranchType::LoopBreak);
        assert_eq!(*else_type, BranchType::LoopContinue);
        assert!(then_body.is_empty() && else_body.is_empty());
    }

    // Spec scenario: cases {1,2}→A, 3→B, default breaks; A falls through
    // to B, and reordering places A immediately before B.
    #[test]
    fn switch_fallthrough_ordering() {
        let func = structurized(vec![
            label(1),
            sel_merge(5),
            switch(9, 5, &[(1, 2), (2, 2), (3, 3)]),
            label(2),
            goto(3),
            label(3),
            goto(5),
            label(5),
            ret(),
        ]);

        let CfNode::Switch { cases, .. } = &func.body[1] else {
            panic!("expected Switch, got {:?}", func.body[1]);
        };
        assert_eq!(cases.len(), 2);

        let case_a = &func.cases[cases[0]];
        let case_b = &func.cases[cases[1]];
        assert_eq!(case_a.start, b(2));
        assert_eq!(case_a.values, vec![1, 2]);
        assert_eq!(case_a.fallthrough, Some(cases[1]));
        assert_eq!(case_b.start, b(3));
        assert_eq!(case_b.values, vec![3]);
        assert!(case_b.fallthrough.is_none());

        assert_eq!(func.blocks[&b(2)].branch_type, BranchType::SwitchFallthrough);
        assert_eq!(func.blocks[&b(3)].branch_type, BranchType::SwitchBreak);
    }

    #[test]
    fn switch_default_case_and_break_only_case() {
        // default shares block 3; case 7 jumps straight to the merge and
        // is dropped entirely rather than kept as an empty case.
        let func = structurized(vec![
            label(1),
            sel_merge(5),
            switch(9, 3, &[(1, 2), (7, 5)]),
            label(2),
            goto(5),
            label(3),
            goto(5),
            label(5),
            ret(),
        ]);

        let CfNode::Switch { cases, .. } = &func.body[1] else {
            panic!("expected Switch");
        };
        assert_eq!(cases.len(), 2);
        let default = &func.cases[cases.iter().copied().find(|&c| func.cases[c].is_default).unwrap()];
        assert_eq!(default.start, b(3));
        assert!(default.values.is_empty());
        assert!(cases.iter().all(|&c| func.cases[c].start != b(5)));
    }

    #[test]
    fn switch_fallthrough_chain_reorders() {
        // Discovery order C(3), B(2), A(1); fallthroughs A→B→C. The DFS
        // must emit A, B, C.
        let func = structurized(vec![
            label(1),
            sel_merge(9),
            switch(10, 9, &[(3, 4), (2, 3), (1, 2)]),
            label(4),
            goto(9),
            label(3),
            goto(4),
            label(2),
            goto(3),
            label(9),
            ret(),
        ]);

        let CfNode::Switch { cases, .. } = &func.body[1] else {
            panic!("expected Switch");
        };
        let starts: Vec<BlockId> = cases.iter().map(|&c| func.cases[c].start).collect();
        assert_eq!(starts, vec![b(2), b(3), b(4)]);

        // Every case with a fallthrough sits immediately before its target.
        for (i, &case) in cases.iter().enumerate() {
            if let Some(fallthrough) = func.cases[case].fallthrough {
                assert_eq!(cases[i + 1], fallthrough);
            }
        }
    }

    #[test]
    fn switch_inside_loop_keeps_loop_context() {
        // A case body breaks the enclosing loop directly.
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(8, 2),
            cond_goto(9, 3, 8),
            label(3),
            sel_merge(6),
            switch(10, 6, &[(1, 4)]),
            label(4),
            goto(8),
            label(6),
            goto(2),
            label(8),
            ret(),
        ]);

        assert_eq!(func.blocks[&b(4)].branch_type, BranchType::LoopBreak);
        assert_eq!(func.blocks[&b(6)].branch_type, BranchType::LoopContinue);
    }

    #[test]
    fn nested_loops_claim_separately() {
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(9, 2),
            cond_goto(11, 3, 9),
            label(3),
            loop_merge(6, 3),
            cond_goto(12, 4, 6),
            label(4),
            goto(3),
            label(6),
            goto(2),
            label(9),
            ret(),
        ]);

        let CfNode::Loop { body: outer, .. } = &func.body[1] else {
            panic!("expected outer Loop");
        };
        assert!(
            outer.iter().any(|n| matches!(n, CfNode::Loop { .. })),
            "expected nested Loop in {outer:?}"
        );
        // Inner back edge continues the inner loop, outer back edge the
        // outer one.
        assert_eq!(func.blocks[&b(4)].branch_type, BranchType::LoopContinue);
        assert_eq!(func.blocks[&b(6)].branch_type, BranchType::LoopContinue);
    }

    #[test]
    fn reachability_round_trip() {
        // Every reachable block is placed exactly once (dead break-only
        // cases aside, of which this graph has none).
        let insts = vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(8, 5),
            cond_goto(9, 3, 8),
            label(3),
            sel_merge(4),
            cond_goto(10, 6, 7),
            label(6),
            goto(4),
            label(7),
            goto(4),
            label(4),
            goto(5),
            label(5),
            goto(2),
            label(8),
            ret(),
        ];
        let func = structurized(insts);

        let mut placed = placed_blocks(&func);
        placed.sort();
        let mut all: Vec<BlockId> = func.blocks.keys().copied().collect();
        all.sort();
        assert_eq!(placed, all);
    }

    #[test]
    fn unreachable_terminator_is_fatal() {
        let mut func = build_function(vec![
            label(1),
            CfgInst::Terminator(Terminator::Unreachable),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::UnsupportedTerminator { block } if block == b(1)));
    }

    #[test]
    fn branch_to_unknown_block_is_fatal() {
        let mut func = build_function(vec![label(1), goto(99)]).unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::UnknownBlock { block } if block == b(99)));
    }

    #[test]
    fn branch_into_case_from_outside_switch_is_fatal() {
        // The merge block jumps back into a case start after the switch
        // is finished; there is no case left to attach a fallthrough to.
        let mut func = build_function(vec![
            label(1),
            sel_merge(5),
            switch(9, 5, &[(1, 2)]),
            label(2),
            goto(5),
            label(5),
            goto(2),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::FallthroughOutsideSwitch { block } if block == b(2)));
    }

    #[test]
    fn conditional_without_merge_is_fatal() {
        let mut func = build_function(vec![
            label(1),
            cond_goto(9, 2, 3),
            label(2),
            goto(4),
            label(3),
            goto(4),
            label(4),
            ret(),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::MissingSelectionMerge { block } if block == b(1)));
    }

    #[test]
    fn guarded_exit_needs_no_merge() {
        // One arm breaks the loop; no selection merge required.
        let mut func = build_function(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(5, 2),
            cond_goto(9, 3, 5),
            label(3),
            cond_goto(8, 5, 4),
            label(4),
            goto(2),
            label(5),
            ret(),
        ])
        .unwrap();
        structurize(&mut func).unwrap();
    }

    #[test]
    fn revisited_block_is_fatal() {
        // Block 3 is reached from both arms without any merge framing one
        // of them as a construct — the second arrival must not spin.
        let mut func = build_function(vec![
            label(1),
            sel_merge(5),
            cond_goto(9, 2, 3),
            label(2),
            goto(3),
            label(3),
            goto(5),
            label(5),
            ret(),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::BlockRevisited { block } if block == b(3)));
    }

    #[test]
    fn ambiguous_fallthrough_is_fatal() {
        // Case at 2 branches into two different case starts.
        let mut func = build_function(vec![
            label(1),
            sel_merge(6),
            switch(9, 6, &[(1, 2), (2, 3), (3, 4)]),
            label(2),
            cond_goto(8, 3, 4),
            label(3),
            goto(6),
            label(4),
            goto(6),
            label(6),
            ret(),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(err, Error::AmbiguousFallthrough { case_start } if case_start == b(2)));
    }

    #[test]
    fn fallthrough_cycle_is_fatal() {
        // Two cases falling through into each other.
        let mut func = build_function(vec![
            label(1),
            sel_merge(6),
            switch(9, 6, &[(1, 2), (2, 3)]),
            label(2),
            goto(3),
            label(3),
            goto(2),
            label(6),
            ret(),
        ])
        .unwrap();
        let err = structurize(&mut func).unwrap_err();
        assert!(matches!(
            err,
            Error::FallthroughCycle { .. } | Error::BlockRevisited { .. }
        ));
    }

    #[test]
    fn branch_types_target_active_constructs() {
        // Branch-type soundness: the classified targets are exactly the
        // enclosing constructs' break/continue blocks.
        let func = structurized(vec![
            label(1),
            goto(2),
            label(2),
            loop_merge(7, 2),
            cond_goto(9, 3, 7),
            label(3),
            sel_merge(5),
            switch(10, 5, &[(1, 4)]),
            label(4),
            goto(5),
            label(5),
            goto(2),
            label(7),
            ret(),
        ]);

        // 4's Goto targets 5, the switch's merge block.
        assert_eq!(func.blocks[&b(4)].branch_type, BranchType::SwitchBreak);
        if let Terminator::Branch { target } = func.blocks[&b(4)].terminator {
            assert_eq!(target, b(5));
        }
        // 5's Goto targets 2, the loop's continue (= header) block.
        assert_eq!(func.blocks[&b(5)].branch_type, BranchType::LoopContinue);
    }
}
