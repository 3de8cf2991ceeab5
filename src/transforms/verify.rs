//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{print_graph, DominatorTree};
use crate::arena::ArenaKey;
use crate::ir::{walk, Graph, Mode, Node, NodeKind};
use crate::pass::{GraphAnalysisManager, GraphTransformPass, PreservedAnalyses};

/// An IR validity verification pass.
///
/// This scans the entire graph, and will do nothing if the graph is valid.
/// If the graph isn't valid, it will abort with an error.
pub struct VerifyGraphPass;

impl GraphTransformPass for VerifyGraphPass {
    fn name(&self) -> &str {
        "verify"
    }

    fn run(&mut self, graph: &mut Graph, _: &GraphAnalysisManager) -> PreservedAnalyses {
        verify_graph_panic(graph);

        PreservedAnalyses::all()
    }
}

/// Verifies that a graph is structurally valid.
///
/// Checked, for every node reachable from the end node:
///
/// 1. every φ has exactly as many inputs as its block has control
///    predecessors
/// 2. every non-block node is owned by a live block
/// 3. every block input is a control-mode value
/// 4. every non-`Bad` input of a φ has the φ's own mode
/// 5. every live `Cond` still has at least two live projections (a
///    simplified one would have been exchanged for a `Jmp`)
/// 6. the dominator tree is derivable and rooted at the entry block
///
/// On failure this returns one message per violation.
pub fn verify_graph(graph: &Graph) -> Result<(), Vec<String>> {
    let mut verifier = Verifier {
        graph,
        errors: Vec::default(),
    };

    walk(
        graph,
        &mut verifier,
        |_, _, _| {},
        |_, node, verifier: &mut Verifier<'_>| verifier.check(node),
    );

    let domtree = DominatorTree::compute(graph);

    if domtree.root() != graph.entry() {
        verifier
            .errors
            .push("dominator tree is not rooted at the entry block".to_string());
    }

    if verifier.errors.is_empty() {
        Ok(())
    } else {
        Err(verifier.errors)
    }
}

/// This is [`verify_graph`], except that it dumps the graph, writes out any
/// errors, and then panics on failure.
pub fn verify_graph_panic(graph: &Graph) {
    if let Err(errors) = verify_graph(graph) {
        println!();
        print_graph(graph);
        println!();

        for error in errors {
            println!("{error}");
        }

        panic!("graph failed verification");
    }
}

struct Verifier<'g> {
    graph: &'g Graph,
    errors: Vec<String>,
}

impl Verifier<'_> {
    fn check(&mut self, node: Node) {
        let graph = self.graph;

        match graph.kind(node) {
            NodeKind::Block => self.check_block(node),
            NodeKind::Phi => self.check_phi(node),
            NodeKind::Cond { .. } => self.check_cond(node),
            NodeKind::Bad => {}
            _ => self.check_owned(node),
        }
    }

    fn check_block(&mut self, block: Node) {
        for (i, &pred) in self.graph.inputs(block).iter().enumerate() {
            if self.graph.mode(pred) != Mode::Control {
                self.errors.push(format!(
                    "predecessor {i} of block %{} is not a control value",
                    block.index()
                ));
            }
        }
    }

    fn check_phi(&mut self, phi: Node) {
        self.check_owned(phi);

        let graph = self.graph;

        if let Some(block) = graph.block_of(phi) {
            if graph.arity(phi) != graph.arity(block) {
                self.errors.push(format!(
                    "φ %{} has {} inputs but its block %{} has {} predecessors",
                    phi.index(),
                    graph.arity(phi),
                    block.index(),
                    graph.arity(block)
                ));
            }
        }

        for &input in graph.inputs(phi) {
            if !graph.is_bad(input) && graph.mode(input) != graph.mode(phi) {
                self.errors.push(format!(
                    "φ %{} merges %{} of a different mode",
                    phi.index(),
                    input.index()
                ));
            }
        }
    }

    fn check_cond(&mut self, cond: Node) {
        self.check_owned(cond);

        let graph = self.graph;
        let live_projs = graph
            .uses(cond)
            .iter()
            .filter(|&&user| graph.is_proj(user))
            .count();

        if live_projs < 2 {
            self.errors.push(format!(
                "cond %{} has {live_projs} live projection(s), it should have been \
                 simplified to a jump",
                cond.index()
            ));
        }
    }

    fn check_owned(&mut self, node: Node) {
        match self.graph.block_of(node) {
            Some(block) if self.graph.is_block(block) => {}
            Some(block) => self.errors.push(format!(
                "node %{} is owned by %{}, which is not a block",
                node.index(),
                block.index()
            )),
            None => self.errors.push(format!(
                "node %{} is not owned by any block",
                node.index()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_graph_passes() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 3);
        let ret = graph.new_return(entry, &[v]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);
        graph.finish_building();

        assert!(verify_graph(&graph).is_ok());
    }

    #[test]
    fn phi_arity_mismatch_is_reported() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 3);
        let merge = graph.new_block();
        let j1 = graph.new_jmp(entry);

        graph.set_inputs(merge, &[j1]);

        let phi = graph.new_phi(merge, Mode::Int32, &[v]);

        // invalidate the φ by widening the block under it
        let j2 = graph.new_jmp(entry);

        graph.set_inputs(merge, &[j1, j2]);

        let ret = graph.new_return(merge, &[phi]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);

        let errors = verify_graph(&graph).unwrap_err();

        assert!(errors.iter().any(|e| e.contains("predecessors")));
    }

    #[test]
    fn lone_projection_is_reported() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let sel = graph.new_const(entry, Mode::Int32, 0);
        let cond = graph.new_cond(entry, sel, 3);
        let proj = graph.new_proj(cond, Mode::Control, 3);
        let target = graph.new_block();

        graph.set_inputs(target, &[proj]);

        let ret = graph.new_return(target, &[]);
        let end_block = graph.end_block();

        graph.set_inputs(end_block, &[ret]);

        let errors = verify_graph(&graph).unwrap_err();

        assert!(errors.iter().any(|e| e.contains("live projection")));
    }
}
