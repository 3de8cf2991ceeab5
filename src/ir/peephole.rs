//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Graph, Node, NodeKind};

/// Computes a node that is locally equivalent to `node`, or `node` itself if
/// no such node exists.
///
/// This is the single-node peephole used by the control-flow optimizer.
/// The caller decides what to do with the result, usually
/// [`Graph::exchange`]-ing the two when they differ.
///
/// The rewrites here are deliberately tiny:
///
/// - a block whose only control predecessor is a `Jmp` is equivalent to the
///   block that jump comes from (straight-line control flow)
/// - a φ whose inputs, ignoring itself and `Bad`s, are all one value is
///   equivalent to that value
pub fn equivalent_node(graph: &Graph, node: Node) -> Node {
    match graph.kind(node) {
        NodeKind::Block => equivalent_block(graph, node),
        NodeKind::Phi => equivalent_phi(graph, node),
        _ => node,
    }
}

fn equivalent_block(graph: &Graph, block: Node) -> Node {
    if graph.arity(block) != 1 {
        return block;
    }

    let pred = graph.input(block, 0);

    if !graph.is_jmp(pred) {
        return block;
    }

    let predb = match graph.block_of(pred) {
        Some(b) => b,
        None => return block,
    };

    // never merge away self-loops, the entry and end blocks, or
    // labeled blocks
    if predb == block
        || block == graph.entry()
        || block == graph.end_block()
        || graph.has_label(block)
    {
        return block;
    }

    // a φ still pinned here means this block is a merge point we must keep
    let has_phi = graph
        .uses(block)
        .iter()
        .any(|&user| graph.is_phi(user) && graph.block_of(user) == Some(block));

    if has_phi {
        return block;
    }

    predb
}

fn equivalent_phi(graph: &Graph, phi: Node) -> Node {
    let mut value = None;

    for &input in graph.inputs(phi) {
        if input == phi || graph.is_bad(input) {
            continue;
        }

        match value {
            None => value = Some(input),
            Some(v) if v == input => {}
            Some(_) => return phi,
        }
    }

    value.unwrap_or(phi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Mode;

    #[test]
    fn jmp_only_block_merges_into_pred() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let mid = graph.new_block();
        let jmp = graph.new_jmp(entry);

        graph.set_inputs(mid, &[jmp]);

        assert_eq!(equivalent_node(&graph, mid), entry);
    }

    #[test]
    fn labeled_block_stays() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let mid = graph.new_block();
        let jmp = graph.new_jmp(entry);

        graph.set_inputs(mid, &[jmp]);
        graph.set_label(mid, "join");

        assert_eq!(equivalent_node(&graph, mid), mid);
    }

    #[test]
    fn block_with_phi_stays() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 1);
        let mid = graph.new_block();
        let jmp = graph.new_jmp(entry);

        graph.set_inputs(mid, &[jmp]);
        graph.new_phi(mid, Mode::Int32, &[v]);

        assert_eq!(equivalent_node(&graph, mid), mid);
    }

    #[test]
    fn self_loop_stays() {
        let mut graph = Graph::new();
        let looping = graph.new_block();
        let back = graph.new_jmp(looping);

        graph.set_inputs(looping, &[back]);

        assert_eq!(equivalent_node(&graph, looping), looping);
    }

    #[test]
    fn trivial_phi_collapses() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 9);
        let bad = graph.new_bad(Mode::Int32);
        let merge = graph.new_block();
        let j1 = graph.new_jmp(entry);
        let j2 = graph.new_jmp(entry);
        let j3 = graph.new_jmp(entry);

        graph.set_inputs(merge, &[j1, j2, j3]);

        let phi = graph.new_phi(merge, Mode::Int32, &[v, bad, v]);

        assert_eq!(equivalent_node(&graph, phi), v);
    }

    #[test]
    fn merging_phi_stays() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v1 = graph.new_const(entry, Mode::Int32, 1);
        let v2 = graph.new_const(entry, Mode::Int32, 2);
        let merge = graph.new_block();
        let j1 = graph.new_jmp(entry);
        let j2 = graph.new_jmp(entry);

        graph.set_inputs(merge, &[j1, j2]);

        let phi = graph.new_phi(merge, Mode::Int32, &[v1, v2]);

        assert_eq!(equivalent_node(&graph, phi), phi);
    }
}
