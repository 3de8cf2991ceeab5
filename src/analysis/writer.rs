//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaKey;
use crate::ir::{walk, Graph, Mode, Node, NodeKind};
use crate::utility::SaHashMap;
use std::fmt::Write;

/// Renders a graph into a human-readable block listing.
///
/// Only nodes that are live (reachable from the end node) are printed,
/// grouped under the block that owns them. This is the format the printer
/// pass and the verifier's failure dump use; it has no textual reader and
/// makes no stability promises.
pub fn stringify_graph(graph: &Graph) -> String {
    let mut live = Vec::new();

    walk(
        graph,
        &mut live,
        |_, _, _| {},
        |_, node, live: &mut Vec<Node>| live.push(node),
    );

    // group the live nodes under their blocks, keeping discovery order
    // for the blocks themselves
    let mut blocks = Vec::new();
    let mut contents: SaHashMap<Node, Vec<Node>> = SaHashMap::default();

    for &node in live.iter().rev() {
        if graph.is_block(node) {
            blocks.push(node);
        } else if let Some(block) = graph.block_of(node) {
            contents.entry(block).or_default().push(node);
        }
    }

    let mut out = String::new();

    for block in blocks {
        write_block_header(&mut out, graph, block);

        if let Some(nodes) = contents.get(&block) {
            for &node in nodes {
                write_node(&mut out, graph, node);
            }
        }
    }

    out
}

/// [`stringify_graph`], written to stdout.
pub fn print_graph(graph: &Graph) {
    print!("{}", stringify_graph(graph));
}

fn write_block_header(out: &mut String, graph: &Graph, block: Node) {
    let _ = write!(out, "b{}", block.index());

    if let Some(label) = graph.label(block) {
        let _ = write!(out, " \"{label}\"");
    }

    if block == graph.entry() {
        let _ = write!(out, " (entry)");
    }

    let _ = write!(out, ":");

    if graph.arity(block) > 0 {
        let _ = write!(out, " preds");

        for &pred in graph.inputs(block) {
            let _ = write!(out, " %{}", pred.index());
        }
    }

    let _ = writeln!(out);
}

fn write_node(out: &mut String, graph: &Graph, node: Node) {
    let _ = write!(out, "  %{} = {}", node.index(), kind_name(graph.kind(node)));

    match graph.kind(node) {
        NodeKind::Const { value } => {
            let _ = write!(out, " {value}");
        }
        NodeKind::Cond { default } => {
            let _ = write!(out, " default={default}");
        }
        NodeKind::Proj { case } => {
            let _ = write!(out, " case={case}");
        }
        _ => {}
    }

    let _ = write!(out, ".{}", mode_name(graph.mode(node)));

    for &input in graph.inputs(node) {
        let _ = write!(out, " %{}", input.index());
    }

    let _ = writeln!(out);
}

fn kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Block => "block",
        NodeKind::Jmp => "jmp",
        NodeKind::IJmp => "ijmp",
        NodeKind::Cond { .. } => "cond",
        NodeKind::Proj { .. } => "proj",
        NodeKind::Phi => "phi",
        NodeKind::Const { .. } => "const",
        NodeKind::Return => "return",
        NodeKind::End => "end",
        NodeKind::Bad => "bad",
    }
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Block => "bb",
        Mode::Control => "ctrl",
        Mode::Tuple => "tuple",
        Mode::Memory => "mem",
        Mode::Bool => "bool",
        Mode::Int32 => "i32",
        Mode::Int64 => "i64",
    }
}
