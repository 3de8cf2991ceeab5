//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::DominatorTree;
use crate::arena::SecondarySet;
use crate::ir::{block_walk, equivalent_node, walk, Graph, Mode, Node, NodeKind, Resources};
use crate::pass::{GraphAnalysisManager, GraphTransformPass, PreservedAnalyses};
use crate::utility::SaHashMap;
use smallvec::SmallVec;
use std::borrow::Cow;

/// Removes `Bad` control-flow predecessors and empty blocks.
///
/// A block is empty if it contains only φ and `Jmp` nodes. Blocks can only
/// be removed if they are not needed for the semantics of φ nodes: when a
/// block merges control flow of an if-then-else, removing *both* empty arms
/// would cost the φ its last spot to place a copy in, so at least one arm
/// stays. Labeled blocks are never removed, even when the label could be
/// moved.
///
/// Degenerate switches get rewritten along the way: a switch with only the
/// default projection left, or with a constant selector, becomes an
/// unconditional jump. Since that can turn a non-empty block into an empty
/// one, the pass re-collects and re-simplifies to a fixpoint before the
/// block rewriting runs.
///
/// φs of a removed block are either killed (no use of them can be dominated
/// once the block is gone) or, when the removed block immediately dominates
/// its successor, rebuilt inside the successor with a self-referencing slot
/// for every edge the merge did not previously cover.
///
/// Returns whether the graph was changed, so callers know which derived
/// information (dominators, mostly) they still get to trust.
pub fn optimize_cf(graph: &mut Graph) -> bool {
    assert!(
        !graph.is_building(),
        "cannot optimize control flow while the graph is still being built"
    );
    assert!(
        graph.is_pinned(),
        "control flow optimization needs a pinned graph"
    );

    // the removable flags and the φ/proj lists are per-node scratch state
    graph.reserve_resources(Resources::BLOCK_MARK | Resources::NODE_LINK);

    let mut changed = false;

    // switch simplification can expose new empty blocks, so we loop. the
    // collect result of the final (quiet) round is still accurate and feeds
    // the block optimizer below.
    let collected = loop {
        let collected = collect(graph);
        let mut round_changed = false;

        for &cond in collected.switch_conds.iter() {
            round_changed |= handle_switch_cond(graph, &collected, cond);
        }

        if !round_changed {
            break collected;
        }

        changed = true;
    };

    let doms = DominatorTree::compute(graph);
    let mut ctx = OptimizeCtx {
        collected,
        doms,
        changed: false,
        phis_moved: false,
    };

    block_walk(graph, &mut ctx, optimize_blocks, remove_simple_blocks);
    changed |= ctx.changed;

    // the end node itself gets one peephole look
    let end = graph.end();
    let new_end = equivalent_node(graph, end);

    if new_end != end {
        graph.exchange(end, new_end);
        graph.set_end(new_end);
        changed = true;
    }

    graph.remove_bads_and_doublets();
    graph.release_resources(Resources::BLOCK_MARK | Resources::NODE_LINK);

    if ctx.phis_moved {
        changed |= prune_dead_phi_keepalives(graph);
    }

    changed
}

/// [`optimize_cf`] as a [`GraphTransformPass`].
pub struct OptimizeCfPass {
    name: Cow<'static, str>,
}

/// Creates a pass handle for [`optimize_cf`], with "optimize_cf" as the
/// name if none is given.
pub fn optimize_cf_pass(name: Option<&str>) -> OptimizeCfPass {
    OptimizeCfPass {
        name: name.map_or(Cow::Borrowed("optimize_cf"), |n| Cow::Owned(n.to_owned())),
    }
}

impl GraphTransformPass for OptimizeCfPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, graph: &mut Graph, _: &GraphAnalysisManager) -> PreservedAnalyses {
        if optimize_cf(graph) {
            PreservedAnalyses::none()
        } else {
            PreservedAnalyses::all()
        }
    }
}

// the collect result: which blocks are (still) removable, the φs of every
// block, the projections hanging off every multi-output node, and the
// switch-Conds that want simplifying
struct Collected {
    // blocks that contain user-visible computation or carry a label.
    // "removable" is the complement, so a freshly seen block starts out
    // removable and only ever gets demoted.
    kept: SecondarySet<Node>,
    phis: SaHashMap<Node, SmallVec<[Node; 4]>>,
    projs: SaHashMap<Node, SmallVec<[Node; 2]>>,
    switch_conds: Vec<Node>,
}

impl Collected {
    fn is_removable(&self, block: Node) -> bool {
        !self.kept.contains(block)
    }

    fn mark_non_removable(&mut self, block: Node) {
        self.kept.insert(block);
    }

    fn phis_of(&self, block: Node) -> &[Node] {
        self.phis.get(&block).map_or(&[], |list| list.as_slice())
    }
}

struct OptimizeCtx {
    collected: Collected,
    doms: DominatorTree,
    changed: bool,
    phis_moved: bool,
}

/// Collects all φ nodes into per-block lists, all `Proj`s into per-producer
/// lists, and all switch-Conds. Marks every block "non-removable" that
/// contains a node other than φ and `Jmp` (and `Proj`), or that carries a
/// label.
fn collect(graph: &Graph) -> Collected {
    let mut collected = Collected {
        kept: SecondarySet::with_capacity(graph.node_count()),
        phis: SaHashMap::default(),
        projs: SaHashMap::default(),
        switch_conds: Vec::default(),
    };

    // nothing anchors the entry block the way a start node would, so pin
    // it explicitly; folding it away would strand its successor
    collected.mark_non_removable(graph.entry());

    walk(graph, &mut collected, |_, _, _| {}, collect_node);

    collected
}

fn collect_node(graph: &Graph, node: Node, collected: &mut Collected) {
    match graph.kind(node) {
        NodeKind::Phi => {
            // collect φs so their ins can be compacted along with the
            // block's ins
            let block = graph.block_of(node).expect("φ must be in a block");

            collected.phis.entry(block).or_default().push(node);
        }
        NodeKind::Block => {
            if graph.has_label(node) {
                collected.mark_non_removable(node);
            }
        }
        NodeKind::Jmp | NodeKind::Bad => {}
        NodeKind::Proj { .. } => {
            let block = graph.block_of(node).expect("projection must be in a block");
            let producer = graph.input(node, 0);

            collected.projs.entry(producer).or_default().push(node);
            collected.mark_non_removable(block);
        }
        _ => {
            let block = graph.block_of(node).expect("node must be in a block");

            collected.mark_non_removable(block);

            if graph.is_cond(node) && graph.mode(graph.cond_selector(node)) != Mode::Bool {
                collected.switch_conds.push(node);
            }
        }
    }
}

/// Optimizes a switch-Cond down to an unconditional jump where only one
/// outcome is possible: either the default projection is the only one left,
/// or the selector is a compile-time constant.
fn handle_switch_cond(graph: &mut Graph, collected: &Collected, cond: Node) -> bool {
    let projs = collected.projs.get(&cond).map_or(&[][..], |list| list.as_slice());
    let block = graph.block_of(cond).expect("cond must be in a block");

    match *projs {
        // exactly one projection left on the Cond: must be the default
        [proj] => {
            assert_eq!(
                graph.proj_case(proj),
                graph.cond_default(cond),
                "the sole remaining projection of a switch must be the default"
            );

            let jmp = graph.new_jmp(block);

            graph.exchange(proj, jmp);
            graph.set_inputs(cond, &[]);

            true
        }
        // one case plus the default, and the selector is known: take the
        // matching case, or the default when neither matches
        [proj1, proj2] => {
            let value = match graph.value_of(graph.cond_selector(cond)) {
                Some(value) => value,
                None => return false,
            };

            let taken = if graph.proj_case(proj1) == value {
                proj1
            } else if graph.proj_case(proj2) == value {
                proj2
            } else if graph.cond_default(cond) == graph.proj_case(proj1) {
                proj1
            } else {
                debug_assert_eq!(graph.cond_default(cond), graph.proj_case(proj2));

                proj2
            };

            let dead = if taken == proj1 { proj2 } else { proj1 };
            let jmp = graph.new_jmp(block);
            let bad = graph.new_bad(Mode::Control);

            graph.exchange(taken, jmp);
            graph.exchange(dead, bad);
            graph.set_inputs(cond, &[]);

            true
        }
        _ => false,
    }
}

/// Returns true if `pred` is a predecessor block of `block`.
fn is_pred_of(graph: &Graph, pred: Node, block: Node) -> bool {
    (0..graph.arity(block)).any(|i| graph.cfgpred_block(block, i) == Some(pred))
}

/// Tests whether the predecessor at `pos` of `block` can be optimized away,
/// and returns the number of input slots it will occupy afterwards (1 if it
/// stays or is `Bad`, its own arity if it folds).
///
/// The test is rather tricky. Consider a block `b` merging the control flow
/// of an if-then-else:
///
/// ```text
///     if-block
///      /    \
///  then-b  else-b
///      \    /
///        b
/// ```
///
/// If there is a φ in `b`, we may not remove the then-block *and* the
/// else-block, even if both are empty: destroying the φ requires a copy
/// before the merge, and one of the arms has to stay around to hold it. To
/// judge position `pos`, predecessors before `pos` are regarded as already
/// decided (their removable flag reflects the decision) and predecessors
/// after it as unresolved.
fn test_whether_dispensable(
    graph: &Graph,
    collected: &mut Collected,
    block: Node,
    pos: usize,
) -> usize {
    let pred = graph.cfgpred(block, pos);

    if graph.is_bad(pred) {
        return 1;
    }

    let predb = graph
        .block_of(pred)
        .expect("control predecessor must be in a block");

    if !collected.is_removable(predb) {
        return 1;
    }

    // can't remove self-loops, and an unknown jump can't be rerouted
    if predb == block || graph.is_unknown_jump(pred) {
        collected.mark_non_removable(predb);

        return 1;
    }

    if !collected.phis_of(block).is_empty() {
        // there are φ nodes: block's pred blocks and predb's pred blocks
        // must be pairwise disjoint. siblings before `pos` were already
        // judged and carry their decision in the removable flag, siblings
        // after it are still unresolved and count as empty until decided.
        let n_cfgpreds = graph.arity(block);

        for i in (0..n_cfgpreds).filter(|&i| i != pos) {
            let other = graph.cfgpred(block, i);

            if graph.is_bad(other) {
                continue;
            }

            let otherb = graph
                .block_of(other)
                .expect("control predecessor must be in a block");

            if collected.is_removable(otherb) && !graph.block_visited(otherb) {
                // an empty sibling that may fold too: it must not share a
                // parent with predb, or the merge loses its copy spot
                for j in 0..graph.arity(otherb) {
                    if let Some(grandparent) = graph.cfgpred_block(otherb, j) {
                        if is_pred_of(graph, grandparent, predb) {
                            collected.mark_non_removable(predb);

                            return 1;
                        }
                    }
                }
            } else if is_pred_of(graph, otherb, predb) {
                collected.mark_non_removable(predb);

                return 1;
            }
        }
    }

    // we will not dispense blocks the walk already adapted
    if graph.block_visited(predb) {
        return 1;
    }

    // dispensable: its predecessors take its place
    graph.arity(predb)
}

fn install_phi_inputs(graph: &mut Graph, phi: Node, inputs: &[Node]) {
    if let [single] = *inputs {
        if single == phi {
            // a φ merging nothing but itself carries no value at all
            let bad = graph.new_bad(graph.mode(phi));

            graph.exchange(phi, bad);
        } else {
            graph.exchange(phi, single);
        }
    } else {
        graph.set_inputs(phi, inputs);
    }
}

/// Removes the empty predecessors of one block.
///
/// φ nodes are adapted first, then the block itself, since the φ rewrite
/// still needs the block's old inputs. For each predecessor `p` of `block`
/// there are three cases: `p` is `Bad` (keep a `Bad` slot), `p` is empty
/// (its predecessors take its place), or `p` contains useful code (keep it
/// as is). A φ input along an empty predecessor either dissolves with it
/// (the input is a φ *of the removed block*) or is replicated along each
/// new edge.
///
/// There is also a special case for a removed block that immediately
/// dominates `block`: its φs may still have uses elsewhere, so they are
/// moved into `block` and rebuilt with a self-referencing slot for every
/// edge they did not previously cover — turning a merge in front of a loop
/// into a merge inside the loop header:
///
/// ```text
///  then_b  else_b                 then_b  else_b
///     \     /                        \     |
///     pred_b            ==>           \    |
///       |   ___                        \   |  ___
///       |  |   |                        \  | |   |
///     loop_b   |                        loop_b   |
///       |  |___|                         |  |___|
/// ```
fn optimize_blocks(graph: &mut Graph, block: Node, ctx: &mut OptimizeCtx) {
    let n_cfgpreds = graph.arity(block);

    // count the predecessors this block has once its empty preds fold into
    // it; every slot walk below must agree with this number
    let mut max_preds = 0;

    for pos in 0..n_cfgpreds {
        max_preds += test_whether_dispensable(graph, &mut ctx.collected, block, pos);
    }

    let mut new_in: Vec<Node> = Vec::with_capacity(max_preds);

    // -- fix the φ nodes of the current block --
    let phis: SmallVec<[Node; 4]> = SmallVec::from_slice(ctx.collected.phis_of(block));

    for phi in phis {
        debug_assert!(graph.is_phi(phi));

        let mode = graph.mode(phi);

        new_in.clear();

        for i in 0..n_cfgpreds {
            match graph.cfgpred_block(block, i) {
                // case φ-1: maintain Bads, somebody else is responsible
                // for removing them
                None => {
                    let bad = graph.new_bad(mode);

                    new_in.push(bad);
                }
                // case φ-2: an empty block that is going away
                Some(pred) if ctx.collected.is_removable(pred) && !graph.block_visited(pred) => {
                    let phi_pred = graph.input(phi, i);

                    for j in 0..graph.arity(pred) {
                        let pred_pred = graph.input(pred, j);

                        if graph.is_bad(pred_pred) {
                            let bad = graph.new_bad(mode);

                            new_in.push(bad);
                        } else if graph.block_of(phi_pred) == Some(pred) {
                            // case φ-2a: the merged value lives in the dying
                            // block and dissolves along with it
                            assert!(
                                graph.is_phi(phi_pred),
                                "an empty block can only contain φs"
                            );

                            new_in.push(graph.input(phi_pred, j));
                        } else {
                            // case φ-2b: replicate the value along each
                            // new edge
                            new_in.push(phi_pred);
                        }
                    }
                }
                // case φ-3: an ordinary predecessor that stays
                Some(_) => new_in.push(graph.input(phi, i)),
            }
        }

        assert_eq!(
            new_in.len(),
            max_preds,
            "φ slot count disagrees with the dispensability count"
        );

        // collapsing to a single input always rewires users; otherwise an
        // identical vector means nothing was dispensable here
        if new_in.len() == 1 || new_in.as_slice() != graph.inputs(phi) {
            install_phi_inputs(graph, phi, &new_in);
            ctx.changed = true;
        }
    }

    // -- rescue the φs of predecessors that are about to vanish --
    // this only happens on the merge between a loop backedge and a single
    // loop entry, and only matters when the vanishing block is the direct
    // dominator of `block`; otherwise no use of those φs can be dominated
    // once the block is gone
    for k in 0..n_cfgpreds {
        let pred = graph.cfgpred(block, k);

        if graph.is_bad(pred) {
            continue;
        }

        let predb = graph
            .block_of(pred)
            .expect("control predecessor must be in a block");

        if !ctx.collected.is_removable(predb) || graph.block_visited(predb) {
            continue;
        }

        let pred_phis: SmallVec<[Node; 4]> = SmallVec::from_slice(ctx.collected.phis_of(predb));

        for phi in pred_phis {
            debug_assert!(graph.is_phi(phi));

            let mode = graph.mode(phi);

            if ctx.doms.idom(block) != Some(predb) {
                // predb is not the dominator: there can't be uses of its
                // φs anymore, kill them
                let bad = graph.new_bad(mode);

                graph.exchange(phi, bad);
                ctx.changed = true;

                continue;
            }

            // predb is the direct dominator of `block`: there might still
            // be uses of the φ in later blocks, so move it in here
            graph.set_block_of(phi, block);
            ctx.collected.phis.entry(block).or_default().push(phi);
            ctx.phis_moved = true;

            new_in.clear();

            for i in 0..n_cfgpreds {
                if i == k {
                    // the φ's old position: splice its inputs one-for-one
                    for j in 0..graph.arity(phi) {
                        new_in.push(graph.input(phi, j));
                    }

                    continue;
                }

                // on every other edge the only consistent value is the φ
                // itself: those edges enter from outside the removed block
                // and precede its first execution
                match graph.cfgpred_block(block, i) {
                    None => {
                        let bad = graph.new_bad(mode);

                        new_in.push(bad);
                    }
                    Some(other) if ctx.collected.is_removable(other) && !graph.block_visited(other) => {
                        for j in 0..graph.arity(other) {
                            if graph.is_bad(graph.input(other, j)) {
                                let bad = graph.new_bad(mode);

                                new_in.push(bad);
                            } else {
                                new_in.push(phi);
                            }
                        }
                    }
                    Some(_) => new_in.push(phi),
                }
            }

            assert_eq!(
                new_in.len(),
                max_preds,
                "φ rescue slot count disagrees with the dispensability count"
            );

            install_phi_inputs(graph, phi, &new_in);
            ctx.changed = true;
        }
    }

    // -- fix the block itself --
    new_in.clear();

    for i in 0..n_cfgpreds {
        let pred = graph.cfgpred(block, i);

        // case 1: Bad predecessor, the slot stays Bad
        if graph.is_bad(pred) {
            let bad = graph.new_bad(Mode::Control);

            new_in.push(bad);

            continue;
        }

        let predb = graph
            .block_of(pred)
            .expect("control predecessor must be in a block");

        if ctx.collected.is_removable(predb) && !graph.block_visited(predb) {
            // case 2: an empty block, its predecessors take its place
            for j in 0..graph.arity(predb) {
                let predpred = graph.input(predb, j);

                if graph.is_bad(predpred) {
                    let bad = graph.new_bad(Mode::Control);

                    new_in.push(bad);
                } else {
                    new_in.push(predpred);
                }
            }

            // detach block and jump, they might be kept alive
            let bad_jmp = graph.new_bad(Mode::Control);

            graph.exchange(pred, bad_jmp);

            let bad_block = graph.new_bad(Mode::Block);

            graph.exchange(predb, bad_block);
        } else {
            // case 3: a useful block, keep it
            new_in.push(pred);
        }
    }

    assert_eq!(
        new_in.len(),
        max_preds,
        "block slot count disagrees with the dispensability count"
    );

    // every dispensed or Bad predecessor shows up as a differing slot, so
    // an identical vector means this block kept all its predecessors
    if new_in.as_slice() != graph.inputs(block) {
        graph.set_inputs(block, &new_in);
        ctx.changed = true;
    }
}

/// Runs the block peephole over every walked block. This removes blocks
/// with only a single `Jmp` predecessor.
fn remove_simple_blocks(graph: &mut Graph, block: Node, ctx: &mut OptimizeCtx) {
    let new_block = equivalent_node(graph, block);

    if new_block != block {
        graph.exchange(block, new_block);
        ctx.changed = true;
    }
}

/// Moving φs around can leave dead φs on the keep-alive list, and some
/// later phases cannot cope with those. Keep only the ones with a user
/// other than themselves and the end node; returns whether any were
/// dropped.
fn prune_dead_phi_keepalives(graph: &mut Graph) -> bool {
    let end = graph.end();
    let keepalives: SmallVec<[Node; 8]> = SmallVec::from_slice(graph.end_keepalives());
    let kept: SmallVec<[Node; 8]> = keepalives
        .iter()
        .copied()
        .filter(|&ka| {
            !graph.is_phi(ka)
                || graph
                    .uses(ka)
                    .iter()
                    .any(|&user| user != ka && user != end)
        })
        .collect();

    if kept.len() == keepalives.len() {
        return false;
    }

    graph.set_end_keepalives(&kept);

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::verify_graph_panic;

    // entry:
    //   %c = const.bool
    //   cond %c -> (proj_t, proj_f)
    fn two_way(graph: &mut Graph) -> (Node, Node) {
        let entry = graph.entry();
        let c = graph.new_const(entry, Mode::Bool, 0);
        let cond = graph.new_cond(entry, c, 0);
        let proj_t = graph.new_proj(cond, Mode::Control, 1);
        let proj_f = graph.new_proj(cond, Mode::Control, 0);

        (proj_t, proj_f)
    }

    fn finish_with_return(graph: &mut Graph, block: Node, values: &[Node]) -> Node {
        let ret = graph.new_return(block, values);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);

        ret
    }

    #[test]
    fn s1_empty_diamond_without_phi() {
        let mut graph = Graph::new();
        let (proj_t, proj_f) = two_way(&mut graph);

        //
        // entry ---> then_b ---> merge,  entry ---> else_b ---> merge
        //
        let then_b = graph.new_block();
        let else_b = graph.new_block();
        let merge = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);

        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(merge, &[j1, j2]);
        finish_with_return(&mut graph, merge, &[]);
        graph.finish_building();

        assert!(optimize_cf(&mut graph));

        // both arms are gone, merge hangs off the branch directly
        assert_eq!(graph.inputs(merge), &[proj_t, proj_f]);
        assert!(graph.uses(then_b).is_empty());
        assert!(graph.uses(else_b).is_empty());
        verify_graph_panic(&graph);

        // and a second run finds nothing left to do
        assert!(!optimize_cf(&mut graph));
        assert_eq!(graph.inputs(merge), &[proj_t, proj_f]);
        verify_graph_panic(&graph);
    }

    #[test]
    fn s2_empty_diamond_with_phi_keeps_one_arm() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v1 = graph.new_const(entry, Mode::Int32, 1);
        let v2 = graph.new_const(entry, Mode::Int32, 2);
        let (proj_t, proj_f) = two_way(&mut graph);

        let then_b = graph.new_block();
        let else_b = graph.new_block();
        let merge = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);

        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(merge, &[j1, j2]);

        let phi = graph.new_phi(merge, Mode::Int32, &[v1, v2]);

        finish_with_return(&mut graph, merge, &[phi]);
        graph.finish_building();

        assert!(optimize_cf(&mut graph));

        // the else-arm folded; the then-arm survives as the φ's copy spot
        assert_eq!(graph.inputs(merge), &[j1, proj_f]);
        assert_eq!(graph.inputs(phi), &[v1, v2]);
        assert!(graph.uses(else_b).is_empty());
        assert_eq!(graph.block_of(j1), Some(then_b));
        verify_graph_panic(&graph);

        // stable from here on, and the quiet run reports it
        assert!(!optimize_cf(&mut graph));
        assert_eq!(graph.inputs(merge), &[j1, proj_f]);
        assert_eq!(graph.inputs(phi), &[v1, v2]);
        verify_graph_panic(&graph);
    }

    #[test]
    fn arms_with_disjoint_parents_both_fold() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v1 = graph.new_const(entry, Mode::Int32, 1);
        let v2 = graph.new_const(entry, Mode::Int32, 2);
        let (proj_t, proj_f) = two_way(&mut graph);

        //
        // entry -> left -> left_pad -> merge
        // entry -> right -> right_pad -> merge
        //
        // left/right are labeled (and thereby pinned), so the pads come
        // from *different* grandparents and can both fold away.
        //
        let left = graph.new_block();
        let right = graph.new_block();

        graph.set_inputs(left, &[proj_t]);
        graph.set_inputs(right, &[proj_f]);
        graph.set_label(left, "left");
        graph.set_label(right, "right");

        let left_pad = graph.new_block();
        let right_pad = graph.new_block();
        let jl = graph.new_jmp(left);
        let jr = graph.new_jmp(right);

        graph.set_inputs(left_pad, &[jl]);
        graph.set_inputs(right_pad, &[jr]);

        let merge = graph.new_block();
        let jl2 = graph.new_jmp(left_pad);
        let jr2 = graph.new_jmp(right_pad);

        graph.set_inputs(merge, &[jl2, jr2]);

        let phi = graph.new_phi(merge, Mode::Int32, &[v1, v2]);

        finish_with_return(&mut graph, merge, &[phi]);
        graph.finish_building();

        optimize_cf(&mut graph);

        assert_eq!(graph.inputs(merge), &[jl, jr]);
        assert_eq!(graph.inputs(phi), &[v1, v2]);
        assert!(graph.uses(left_pad).is_empty());
        assert!(graph.uses(right_pad).is_empty());
        verify_graph_panic(&graph);
    }

    #[test]
    fn labeled_empty_block_survives() {
        let mut graph = Graph::new();
        let (proj_t, proj_f) = two_way(&mut graph);

        let then_b = graph.new_block();
        let else_b = graph.new_block();
        let merge = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);
        graph.set_label(then_b, "interesting");

        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(merge, &[j1, j2]);
        finish_with_return(&mut graph, merge, &[]);
        graph.finish_building();

        optimize_cf(&mut graph);

        // the labeled arm stays, the other one folds
        assert_eq!(graph.inputs(merge), &[j1, proj_f]);
        assert_eq!(graph.block_of(j1), Some(then_b));
        assert!(graph.uses(else_b).is_empty());
        verify_graph_panic(&graph);
    }

    #[test]
    fn s3_switch_with_only_default_becomes_jmp() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let sel = graph.new_const(entry, Mode::Int32, 0);
        let cond = graph.new_cond(entry, sel, 5);
        let proj_default = graph.new_proj(cond, Mode::Control, 5);
        let target = graph.new_block();

        graph.set_inputs(target, &[proj_default]);

        let ret = finish_with_return(&mut graph, target, &[]);

        graph.finish_building();
        optimize_cf(&mut graph);

        // the branch went away entirely: the default projection became a
        // jump, which made `target` a jump-target-only block, which then
        // merged back into the entry block
        assert!(graph.uses(proj_default).is_empty());
        assert_eq!(graph.block_of(ret), Some(entry));
        assert!(graph.uses(cond).is_empty());
        verify_graph_panic(&graph);
    }

    #[test]
    fn s4_constant_selector_picks_matching_case() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let sel = graph.new_const(entry, Mode::Int32, 7);
        let cond = graph.new_cond(entry, sel, 0);
        let proj_case = graph.new_proj(cond, Mode::Control, 7);
        let proj_default = graph.new_proj(cond, Mode::Control, 0);

        let case_block = graph.new_block();
        let default_block = graph.new_block();

        graph.set_inputs(case_block, &[proj_case]);
        graph.set_inputs(default_block, &[proj_default]);

        let ret_case = graph.new_return(case_block, &[]);
        let ret_default = graph.new_return(default_block, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret_case, ret_default]);
        graph.finish_building();

        optimize_cf(&mut graph);

        // case 7 is taken: its block merged into entry, the default's
        // control input collapsed to Bad
        assert_eq!(graph.block_of(ret_case), Some(entry));
        assert!(graph.is_bad(graph.input(default_block, 0)));
        assert!(graph.uses(cond).is_empty());
        verify_graph_panic(&graph);
    }

    #[test]
    fn s4_constant_selector_falls_back_to_default() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let sel = graph.new_const(entry, Mode::Int32, 3);
        let cond = graph.new_cond(entry, sel, 0);
        let proj_case = graph.new_proj(cond, Mode::Control, 7);
        let proj_default = graph.new_proj(cond, Mode::Control, 0);

        let case_block = graph.new_block();
        let default_block = graph.new_block();

        graph.set_inputs(case_block, &[proj_case]);
        graph.set_inputs(default_block, &[proj_default]);

        let ret_case = graph.new_return(case_block, &[]);
        let ret_default = graph.new_return(default_block, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret_case, ret_default]);
        graph.finish_building();

        optimize_cf(&mut graph);

        // 3 matches no case, so the default is taken
        assert_eq!(graph.block_of(ret_default), Some(entry));
        assert!(graph.is_bad(graph.input(case_block, 0)));
        verify_graph_panic(&graph);
    }

    #[test]
    fn s5_loop_entry_phi_hoisted_into_header() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v1 = graph.new_const(entry, Mode::Int32, 1);
        let v2 = graph.new_const(entry, Mode::Int32, 2);
        let c2 = graph.new_const(entry, Mode::Bool, 1);
        let (proj_t, proj_f) = two_way(&mut graph);

        //
        // entry -> then_b -> pred_b -> header <-+
        // entry -> else_b -> pred_b             |
        //                    header -> header --+   (backedge)
        //                    header -> exit
        //
        // pred_b merges v1/v2 in a φ and contains nothing else, so it
        // folds into the loop header it immediately dominates.
        //
        let then_b = graph.new_block();
        let else_b = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);
        graph.set_label(then_b, "then");
        graph.set_label(else_b, "else");

        let pred_b = graph.new_block();
        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(pred_b, &[j1, j2]);

        let phi = graph.new_phi(pred_b, Mode::Int32, &[v1, v2]);
        let header = graph.new_block();
        let entry_jmp = graph.new_jmp(pred_b);
        let loop_cond = graph.new_cond(header, c2, 0);
        let proj_loop = graph.new_proj(loop_cond, Mode::Control, 1);
        let proj_exit = graph.new_proj(loop_cond, Mode::Control, 0);

        graph.set_inputs(header, &[entry_jmp, proj_loop]);

        let exit = graph.new_block();

        graph.set_inputs(exit, &[proj_exit]);
        finish_with_return(&mut graph, exit, &[phi]);
        graph.finish_building();

        optimize_cf(&mut graph);

        // pred_b is gone; its φ moved into the header and grew a
        // self-referencing slot for the backedge
        assert!(graph.uses(pred_b).is_empty());
        assert_eq!(graph.inputs(header), &[j1, j2, proj_loop]);
        assert_eq!(graph.block_of(phi), Some(header));
        assert_eq!(graph.inputs(phi), &[v1, v2, phi]);
        verify_graph_panic(&graph);
    }

    #[test]
    fn moved_phi_without_users_is_pruned_from_keepalives() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v1 = graph.new_const(entry, Mode::Int32, 1);
        let v2 = graph.new_const(entry, Mode::Int32, 2);
        let c2 = graph.new_const(entry, Mode::Bool, 1);
        let (proj_t, proj_f) = two_way(&mut graph);

        // same shape as the hoist test, but nothing ever reads the φ; it
        // is only held live by a keep-alive edge
        let then_b = graph.new_block();
        let else_b = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);
        graph.set_label(then_b, "then");
        graph.set_label(else_b, "else");

        let pred_b = graph.new_block();
        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(pred_b, &[j1, j2]);

        let phi = graph.new_phi(pred_b, Mode::Int32, &[v1, v2]);

        graph.add_keepalive(phi);

        let header = graph.new_block();
        let entry_jmp = graph.new_jmp(pred_b);
        let loop_cond = graph.new_cond(header, c2, 0);
        let proj_loop = graph.new_proj(loop_cond, Mode::Control, 1);
        let proj_exit = graph.new_proj(loop_cond, Mode::Control, 0);

        graph.set_inputs(header, &[entry_jmp, proj_loop]);

        let exit = graph.new_block();

        graph.set_inputs(exit, &[proj_exit]);
        finish_with_return(&mut graph, exit, &[]);
        graph.finish_building();

        optimize_cf(&mut graph);

        // the φ was hoisted but has no real user left, so the keep-alive
        // edge to it is dropped
        assert!(!graph.end_keepalives().contains(&phi));
        verify_graph_panic(&graph);
    }

    #[test]
    fn pass_handle_has_a_name() {
        use crate::pass::{GraphAnalysisManager, GraphPassManager};

        assert_eq!(optimize_cf_pass(None).name(), "optimize_cf");
        assert_eq!(optimize_cf_pass(Some("cfopt")).name(), "cfopt");

        let mut graph = Graph::new();
        let (proj_t, proj_f) = two_way(&mut graph);
        let then_b = graph.new_block();
        let else_b = graph.new_block();
        let merge = graph.new_block();

        graph.set_inputs(then_b, &[proj_t]);
        graph.set_inputs(else_b, &[proj_f]);

        let j1 = graph.new_jmp(then_b);
        let j2 = graph.new_jmp(else_b);

        graph.set_inputs(merge, &[j1, j2]);
        finish_with_return(&mut graph, merge, &[]);
        graph.finish_building();

        let mut am = GraphAnalysisManager::new();
        let mut pm = GraphPassManager::new();

        pm.add_pass(optimize_cf_pass(None));
        pm.run(&mut graph, &mut am);

        assert_eq!(graph.inputs(merge), &[proj_t, proj_f]);
        verify_graph_panic(&graph);

        // running again over the already-optimal graph changes nothing, so
        // the pass reports every analysis as preserved
        let mut pass = optimize_cf_pass(None);
        let preserved = pass.run(&mut graph, &am);

        assert!(preserved.preserves_all());
        assert_eq!(graph.inputs(merge), &[proj_t, proj_f]);
    }

    #[test]
    #[should_panic(expected = "still being built")]
    fn refuses_building_graphs() {
        std::panic::set_hook(Box::new(|_| {}));

        let mut graph = Graph::new();

        optimize_cf(&mut graph);
    }

    #[test]
    #[should_panic(expected = "pinned graph")]
    fn refuses_floating_graphs() {
        std::panic::set_hook(Box::new(|_| {}));

        let mut graph = Graph::new();

        graph.finish_building();
        graph.set_pinned(false);
        optimize_cf(&mut graph);
    }
}
