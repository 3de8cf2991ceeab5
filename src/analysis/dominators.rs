//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::SecondaryMap;
use crate::ir::{Graph, Node};
use crate::pass::{GraphAnalysisManager, GraphAnalysisPass};
use crate::utility::{Packable, SaHashMap, SaHashSet};
use smallvec::SmallVec;

type EdgeMap = SaHashMap<Node, SmallVec<[Node; 4]>>;

/// Models the dominator tree for the blocks of a [`Graph`]. This analysis
/// also gives a postorder for the reachable blocks (as this is required for
/// calculating dominators, and is useful information for other passes to
/// have as well).
///
/// # Implementation
/// The algorithm used is described in "A Simple, Fast Dominance Algorithm"
/// by Cooper et. al.
///
/// Control-flow successors are not stored in the graph, so they are derived
/// first: every block reachable backwards from the end block (or held live
/// through a keep-alive) contributes one successor edge per non-`Bad`
/// control predecessor. Blocks that are linked into the graph but not
/// forward-reachable from the entry block are simply absent from the tree,
/// [`Self::idom`] returns `None` for them.
#[derive(Clone)]
pub struct DominatorTree {
    // maps B -> idom(B). the root maps to the reserved key so we can tell
    // "root" apart from "not reachable" (absent).
    tree: SecondaryMap<Node, Node>,
    // a valid postorder of the forward-reachable blocks, entry last.
    postorder: Vec<Node>,
}

impl DominatorTree {
    /// Computes dominance information for a graph.
    pub fn compute(graph: &Graph) -> Self {
        let preds = gather_cfg(graph);
        let succs = invert(&preds);
        let po = compute_postorder(graph.entry(), &succs);
        let idoms = compute_idoms(&po, &preds);

        Self {
            tree: idoms,
            postorder: po,
        }
    }

    /// Gets the immediate dominator of `block`, if one exists. Neither the
    /// entry block nor a block that is not forward-reachable from it has
    /// one.
    pub fn idom(&self, block: Node) -> Option<Node> {
        self.tree
            .get(block)
            .copied()
            .filter(|idom| !idom.is_reserved_null())
    }

    /// Checks if a block is reachable from the entry block.
    pub fn is_reachable(&self, block: Node) -> bool {
        self.tree.contains(block)
    }

    /// Checks if `possible_dominator` dominates `block`.
    ///
    /// This follows the dominance property directly, it returns true if
    /// `block` and `possible_dominator` are the same block.
    /// [`Self::strictly_dominates`] does not.
    pub fn dominates(&self, block: Node, possible_dominator: Node) -> bool {
        (block == possible_dominator) || self.strictly_dominates(block, possible_dominator)
    }

    /// Checks if `possible_dominator` strictly dominates `block`, i.e.
    /// dominates it without being it.
    pub fn strictly_dominates(&self, block: Node, possible_dominator: Node) -> bool {
        let mut curr = block;

        while let Some(idom) = self.idom(curr) {
            if idom == possible_dominator {
                return true;
            }

            curr = idom;
        }

        false
    }

    /// Returns the root (entry) block of the tree.
    pub fn root(&self) -> Node {
        self.postorder
            .last()
            .copied()
            .expect("should have a root node")
    }

    /// Returns the forward-reachable blocks in a valid postorder.
    pub fn postorder(&self) -> &[Node] {
        &self.postorder
    }

    /// Returns an iterator over the reachable blocks in reverse postorder.
    pub fn reverse_postorder(&self) -> impl Iterator<Item = Node> + '_ {
        self.postorder.iter().copied().rev()
    }
}

/// Wrapper analysis that generates a [`DominatorTree`].
pub struct DominatorTreeAnalysis;

impl GraphAnalysisPass for DominatorTreeAnalysis {
    type Result = DominatorTree;

    fn run(&mut self, graph: &Graph, _: &GraphAnalysisManager) -> Self::Result {
        DominatorTree::compute(graph)
    }
}

// every block reachable backwards from the end block (plus keep-alive
// blocks, plus the entry), mapped to its non-Bad predecessor blocks
fn gather_cfg(graph: &Graph) -> EdgeMap {
    let mut preds = EdgeMap::default();
    let mut stack: SmallVec<[Node; 16]> = SmallVec::new();

    stack.push(graph.end_block());
    stack.push(graph.entry());

    for &ka in graph.end_keepalives() {
        if graph.is_block(ka) {
            stack.push(ka);
        } else if let Some(block) = graph.block_of(ka) {
            stack.push(block);
        }
    }

    while let Some(block) = stack.pop() {
        if preds.contains_key(&block) {
            continue;
        }

        let mut ps = SmallVec::new();

        for i in 0..graph.arity(block) {
            if let Some(pred) = graph.cfgpred_block(block, i) {
                ps.push(pred);
                stack.push(pred);
            }
        }

        preds.insert(block, ps);
    }

    preds
}

fn invert(preds: &EdgeMap) -> EdgeMap {
    let mut succs = EdgeMap::default();

    for (&block, ps) in preds.iter() {
        succs.entry(block).or_default();

        for &pred in ps {
            succs.entry(pred).or_default().push(block);
        }
    }

    succs
}

fn compute_postorder(entry: Node, succs: &EdgeMap) -> Vec<Node> {
    let mut po = Vec::new();
    let mut seen = SaHashSet::default();

    compute_po_recursive(entry, succs, &mut seen, &mut po);

    po
}

fn compute_po_recursive(
    block: Node,
    succs: &EdgeMap,
    seen: &mut SaHashSet<Node>,
    order: &mut Vec<Node>,
) {
    // we need to mark it as seen **before** going to any successors, just in
    // case there's any recursive blocks or recursive chains of blocks
    seen.insert(block);

    if let Some(targets) = succs.get(&block) {
        for &target in targets {
            if !seen.contains(&target) {
                compute_po_recursive(target, succs, seen, order);
            }
        }
    }

    order.push(block);
}

fn intersect(
    po_numbers: &SecondaryMap<Node, usize>,
    idoms: &SecondaryMap<Node, Node>,
    bb1: Node,
    bb2: Node,
) -> Node {
    let mut f1 = bb1;
    let mut f2 = bb2;

    while f1 != f2 {
        let f2v = po_numbers[f2];

        while po_numbers[f1] < f2v {
            f1 = idoms[f1];
        }

        let f1v = po_numbers[f1];

        while po_numbers[f2] < f1v {
            f2 = idoms[f2];
        }
    }

    f1
}

//
// this implements the dominator algorithm described in "A Simple, Fast
// Dominance Algorithm" by Cooper et. al. See the paper:
// http://www.hipersoft.rice.edu/grads/publications/dom14.pdf.
//
fn compute_idoms(po: &[Node], preds: &EdgeMap) -> SecondaryMap<Node, Node> {
    debug_assert!(!po.is_empty());

    // map block -> postorder number.
    // this is just mapping block -> index of block in `po`
    let po_numbers = {
        let mut map = SecondaryMap::default();

        for (i, bb) in po.iter().copied().enumerate() {
            map.insert(bb, i);
        }

        map
    };

    let root = po.last().copied().unwrap();
    let mut idoms = SecondaryMap::default();
    let mut changed = true;

    // for the purposes of the algorithm, the entry node is its own idom
    idoms.insert(root, root);

    while changed {
        changed = false;

        // root has no predecessors, so we need to make sure we skip the
        // root node.
        for block in po.iter().rev().copied().skip(1) {
            debug_assert_ne!(block, root);

            let idom = {
                // start by getting every processed predecessor. there will
                // always be at least one when we're iterating in reverse
                // postorder, since the root node was processed at the
                // beginning of the algorithm
                let processed: SmallVec<[Node; 16]> = preds[&block]
                    .iter()
                    .copied()
                    .filter(|p| idoms.contains(*p))
                    .collect();

                // our initial idom is the first in this set of processed
                // preds. order is irrelevant but we have to have one
                let mut iter = processed.into_iter();
                let mut idom = iter.next().expect(
                    "every block should have at least one processed predecessor when in reverse postorder",
                );

                // for the rest of our processed preds, perform the
                // "intersect" with `idom`
                for pred in iter {
                    idom = intersect(&po_numbers, &idoms, pred, idom);
                }

                idom
            };

            if idoms.insert(block, idom) != Some(idom) {
                changed = true;
            }
        }
    }

    // remove the root -> root idom relationship, mark a
    // sentinel we can look for instead.
    idoms.insert(root, Node::reserved_null());

    idoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Mode;

    // entry:
    //   %c = const.bool
    //   cond %c, then, otherwise
    //
    // then:
    //   jmp merge
    //
    // otherwise:
    //   jmp merge
    //
    // merge:
    //   return
    fn diamond() -> (Graph, Node, Node, Node, Node) {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let c = graph.new_const(entry, Mode::Bool, 0);
        let cond = graph.new_cond(entry, c, 0);
        let proj_t = graph.new_proj(cond, Mode::Control, 1);
        let proj_f = graph.new_proj(cond, Mode::Control, 0);

        let then = graph.new_block();
        let otherwise = graph.new_block();
        let merge = graph.new_block();

        graph.set_inputs(then, &[proj_t]);
        graph.set_inputs(otherwise, &[proj_f]);

        let j1 = graph.new_jmp(then);
        let j2 = graph.new_jmp(otherwise);

        graph.set_inputs(merge, &[j1, j2]);

        let ret = graph.new_return(merge, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);
        graph.finish_building();

        (graph, then, otherwise, merge, entry)
    }

    #[test]
    fn diamond_idoms() {
        let (graph, then, otherwise, merge, entry) = diamond();
        let domtree = DominatorTree::compute(&graph);

        assert_eq!(domtree.idom(entry), None);
        assert_eq!(domtree.idom(then), Some(entry));
        assert_eq!(domtree.idom(otherwise), Some(entry));
        assert_eq!(domtree.idom(merge), Some(entry));
        assert_eq!(domtree.idom(graph.end_block()), Some(merge));

        assert!(domtree.dominates(merge, entry));
        assert!(domtree.dominates(merge, merge));
        assert!(!domtree.strictly_dominates(merge, merge));
        assert!(!domtree.dominates(merge, then));
        assert_eq!(domtree.root(), entry);
    }

    #[test]
    fn loop_header_dominates_body() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let c = graph.new_const(entry, Mode::Bool, 1);

        //
        // entry:
        //   jmp header
        //
        // header:
        //   cond %c, body, exit
        //
        // body:
        //   jmp header
        //
        // exit:
        //   return
        //
        let header = graph.new_block();
        let body = graph.new_block();
        let exit = graph.new_block();
        let entry_jmp = graph.new_jmp(entry);
        let cond = graph.new_cond(header, c, 0);
        let proj_body = graph.new_proj(cond, Mode::Control, 1);
        let proj_exit = graph.new_proj(cond, Mode::Control, 0);
        let back = graph.new_jmp(body);

        graph.set_inputs(header, &[entry_jmp, back]);
        graph.set_inputs(body, &[proj_body]);
        graph.set_inputs(exit, &[proj_exit]);

        let ret = graph.new_return(exit, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);
        graph.finish_building();

        let domtree = DominatorTree::compute(&graph);

        assert_eq!(domtree.idom(header), Some(entry));
        assert_eq!(domtree.idom(body), Some(header));
        assert_eq!(domtree.idom(exit), Some(header));
        assert!(domtree.strictly_dominates(body, header));
        assert!(domtree.strictly_dominates(exit, entry));
    }

    #[test]
    fn unreachable_block_is_absent() {
        let (mut graph, _, _, merge, _) = diamond();

        // linked into merge but nothing jumps to it
        let orphan = graph.new_block();
        let orphan_jmp = graph.new_jmp(orphan);
        let j = graph.input(merge, 0);

        graph.set_inputs(merge, &[j, orphan_jmp]);

        let domtree = DominatorTree::compute(&graph);

        assert!(!domtree.is_reachable(orphan));
        assert_eq!(domtree.idom(orphan), None);
        assert!(domtree.is_reachable(merge));
    }
}
