//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::SecondarySet;
use crate::ir::{Graph, Node};
use smallvec::SmallVec;

/// Walks every node reachable from the end node, depth-first.
///
/// Reachability follows both input edges and owning-block edges, so blocks
/// are reached through the nodes they own and predecessor blocks are reached
/// through the control edges that point at them. `pre` runs before a node's
/// operands are descended into, `post` runs after.
///
/// The graph must not be mutated by the visitors; passes that rewrite the
/// graph do it after collecting what they need, or use
/// [`block_walk`] which is built for in-flight rewiring.
pub fn walk<C, Pre, Post>(graph: &Graph, ctx: &mut C, mut pre: Pre, mut post: Post)
where
    Pre: FnMut(&Graph, Node, &mut C),
    Post: FnMut(&Graph, Node, &mut C),
{
    let mut seen = SecondarySet::with_capacity(graph.node_count());

    walk_from(graph, graph.end(), &mut seen, ctx, &mut pre, &mut post);
}

fn walk_from<C, Pre, Post>(
    graph: &Graph,
    node: Node,
    seen: &mut SecondarySet<Node>,
    ctx: &mut C,
    pre: &mut Pre,
    post: &mut Post,
) where
    Pre: FnMut(&Graph, Node, &mut C),
    Post: FnMut(&Graph, Node, &mut C),
{
    if !seen.insert(node) {
        return;
    }

    pre(graph, node, ctx);

    if let Some(block) = graph.block_of(node) {
        walk_from(graph, block, seen, ctx, pre, post);
    }

    for i in 0..graph.arity(node) {
        walk_from(graph, graph.input(node, i), seen, ctx, pre, post);
    }

    post(graph, node, ctx);
}

/// Walks every block reachable backwards from the end block (and from the
/// blocks of keep-alive nodes), depth-first over control predecessors.
///
/// `pre` runs when a block is first entered, *before* its predecessors are
/// descended into, and the predecessor list is re-read afterwards — so a
/// `pre` visitor that rewires the block's predecessors steers the rest of
/// the walk. This is exactly what control-flow optimizations want: a block
/// they just bypassed is never entered at all. `post` runs once the
/// predecessor subtrees are done.
///
/// Visited marks are kept on the graph itself and can be queried mid-walk
/// with [`Graph::block_visited`].
pub fn block_walk<C, Pre, Post>(graph: &mut Graph, ctx: &mut C, mut pre: Pre, mut post: Post)
where
    Pre: FnMut(&mut Graph, Node, &mut C),
    Post: FnMut(&mut Graph, Node, &mut C),
{
    graph.begin_block_walk();

    let end_block = graph.end_block();

    block_walk_from(graph, end_block, ctx, &mut pre, &mut post);

    // keep-alives can hold otherwise unreachable blocks (endless loops) live
    let keepalives: SmallVec<[Node; 8]> = SmallVec::from_slice(graph.end_keepalives());

    for ka in keepalives {
        let root = if graph.is_block(ka) {
            Some(ka)
        } else {
            graph.block_of(ka)
        };

        if let Some(root) = root {
            block_walk_from(graph, root, ctx, &mut pre, &mut post);
        }
    }
}

fn block_walk_from<C, Pre, Post>(
    graph: &mut Graph,
    block: Node,
    ctx: &mut C,
    pre: &mut Pre,
    post: &mut Post,
) where
    Pre: FnMut(&mut Graph, Node, &mut C),
    Post: FnMut(&mut Graph, Node, &mut C),
{
    if graph.block_visited(block) {
        return;
    }

    graph.mark_block_visited(block);
    pre(graph, block, ctx);

    // `pre` may have rewritten the predecessor list, so re-read it
    // every step
    let mut i = 0;

    while i < graph.arity(block) {
        if let Some(pred) = graph.cfgpred_block(block, i) {
            block_walk_from(graph, pred, ctx, pre, post);
        }

        i += 1;
    }

    post(graph, block, ctx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Mode;

    #[test]
    fn walk_reaches_everything_once() {
        let mut graph = Graph::new();
        let entry = graph.entry();

        //
        // entry:
        //   %0 = const 1
        //   return %0
        //
        let v = graph.new_const(entry, Mode::Int32, 1);
        let ret = graph.new_return(entry, &[v]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);

        let mut seen = Vec::new();

        walk(
            &graph,
            &mut seen,
            |_, _, _| {},
            |_, n, seen: &mut Vec<Node>| seen.push(n),
        );

        assert!(seen.contains(&graph.end()));
        assert!(seen.contains(&end_block));
        assert!(seen.contains(&ret));
        assert!(seen.contains(&v));
        assert!(seen.contains(&entry));
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn block_walk_visits_preds_after_block() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let mid = graph.new_block();
        let jmp = graph.new_jmp(entry);

        graph.set_inputs(mid, &[jmp]);

        let ret = graph.new_return(mid, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);

        let mut pre_order = Vec::new();

        block_walk(
            &mut graph,
            &mut pre_order,
            |_, b, order: &mut Vec<Node>| order.push(b),
            |_, _, _| {},
        );

        assert_eq!(pre_order, vec![end_block, mid, entry]);
        assert!(graph.block_visited(entry));
        assert!(graph.block_visited(mid));
    }

    #[test]
    fn block_walk_follows_keepalive_blocks() {
        let mut graph = Graph::new();
        let entry = graph.entry();

        // a self-loop held live only by a keep-alive edge
        let looping = graph.new_block();
        let entry_jmp = graph.new_jmp(entry);
        let back = graph.new_jmp(looping);

        graph.set_inputs(looping, &[entry_jmp, back]);
        graph.add_keepalive(looping);

        let mut pre_order = Vec::new();

        block_walk(
            &mut graph,
            &mut pre_order,
            |_, b, order: &mut Vec<Node>| order.push(b),
            |_, _, _| {},
        );

        assert!(pre_order.contains(&looping));
        assert!(pre_order.contains(&entry));
    }
}
