//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, ArenaMap, SecondaryMap};
use crate::ir::{Mode, Node, NodeData, NodeKind};
use crate::utility::{PackedOption, SaHashMap, SaHashSet};
use bitflags::bitflags;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};

bitflags! {
    /// Scratch resources on a graph that a pass can reserve for itself.
    ///
    /// Per-node scratch state (the block mark bit, the per-node link slot
    /// that passes thread their worklists through) is exclusive: two passes
    /// using it at the same time would silently corrupt each other. A pass
    /// reserves what it needs up front and releases it when done, and the
    /// reservation asserts if another pass still holds the resource.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Resources: u8 {
        /// The one-bit per-block mark.
        const BLOCK_MARK = 0b01;
        /// The per-node scratch association (link lists of φs and `Proj`s).
        const NODE_LINK = 0b10;
    }
}

/// Uniquely identifies a [`Graph`] for the lifetime of the process.
///
/// Analysis managers key their cached results by this, so results computed
/// for one graph are never handed out for another.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub struct GraphIdentity(u64);

impl GraphIdentity {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A function body as a pinned graph of [`Node`]s.
///
/// The graph owns every node, the reverse-use edges between them, and the
/// small amount of per-graph state the optimizer needs (resource
/// reservations, the block-visited epoch used by
/// [`block_walk`](crate::ir::block_walk)).
///
/// Control flow is part of the graph: a [`NodeKind::Block`] node's inputs
/// are its control predecessors, and every non-block node is owned by the
/// block it executes in. A graph always has an entry block, an end block,
/// and an [`NodeKind::End`] node whose inputs are keep-alive edges.
///
/// ```
/// # use garnet::ir::*;
/// let mut graph = Graph::new();
/// let entry = graph.entry();
///
/// // entry:
/// //   return
/// let ret = graph.new_return(entry, &[]);
/// let end_block = graph.end_block();
/// graph.set_inputs(end_block, &[ret]);
/// graph.finish_building();
/// ```
pub struct Graph {
    identity: GraphIdentity,
    nodes: ArenaMap<Node, NodeData>,
    // one entry per edge: a node that references x twice appears twice
    // in uses[x]. ownership (the owning-block slot) counts as an edge too.
    uses: SecondaryMap<Node, SmallVec<[Node; 4]>>,
    labels: SaHashMap<Node, String>,
    entry: Node,
    end_block: Node,
    end: Node,
    reserved: Resources,
    building: bool,
    pinned: bool,
    block_epoch: u64,
    block_visit_marks: SecondaryMap<Node, u64>,
}

impl Graph {
    /// Creates a graph in the building phase, containing an entry block, an
    /// end block and the end node.
    pub fn new() -> Self {
        let mut graph = Self {
            identity: GraphIdentity::next(),
            nodes: ArenaMap::new(),
            uses: SecondaryMap::new(),
            labels: SaHashMap::default(),
            entry: Node::new(0),
            end_block: Node::new(0),
            end: Node::new(0),
            reserved: Resources::empty(),
            building: true,
            pinned: true,
            block_epoch: 0,
            block_visit_marks: SecondaryMap::new(),
        };

        graph.entry = graph.create(NodeData::new(NodeKind::Block, Mode::Block, None));
        graph.end_block = graph.create(NodeData::new(NodeKind::Block, Mode::Block, None));
        graph.end = graph.create(NodeData::new(
            NodeKind::End,
            Mode::Control,
            Some(graph.end_block),
        ));

        graph
    }

    /// The process-unique identity of this graph.
    pub fn identity(&self) -> GraphIdentity {
        self.identity
    }

    /// The entry block. It has no control predecessors.
    pub fn entry(&self) -> Node {
        self.entry
    }

    /// The block that `Return`s flow into.
    pub fn end_block(&self) -> Node {
        self.end_block
    }

    /// The end node. Its inputs are the keep-alive edges.
    pub fn end(&self) -> Node {
        self.end
    }

    /// Re-points the graph at a different end node.
    ///
    /// This only happens when a peephole found the old end node to be
    /// equivalent to something else; the caller is expected to have
    /// `exchange`d the two already.
    pub fn set_end(&mut self, end: Node) {
        debug_assert!(matches!(self.kind(end), NodeKind::End));

        self.end = end;
        self.end_block = self.block_of(end).expect("end node must have a block");
    }

    /// The number of nodes ever created in this graph, dead ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over every node ever created in this graph, dead
    /// ones included.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.nodes.keys()
    }

    /// Reads a node's payload.
    pub fn data(&self, node: Node) -> &NodeData {
        &self.nodes[node]
    }

    /// A node's kind tag.
    pub fn kind(&self, node: Node) -> NodeKind {
        self.nodes[node].kind
    }

    /// A node's mode.
    pub fn mode(&self, node: Node) -> Mode {
        self.nodes[node].mode
    }

    /// The number of inputs a node has. For blocks this is the number of
    /// control predecessors.
    pub fn arity(&self, node: Node) -> usize {
        self.nodes[node].inputs.len()
    }

    /// A node's `i`-th input.
    pub fn input(&self, node: Node, i: usize) -> Node {
        self.nodes[node].inputs[i]
    }

    /// All of a node's inputs, in order.
    pub fn inputs(&self, node: Node) -> &[Node] {
        &self.nodes[node].inputs
    }

    /// The block a node executes in. Block and `Bad` nodes have none.
    pub fn block_of(&self, node: Node) -> Option<Node> {
        self.nodes[node].block.expand()
    }

    /// Every node that references `node`, one entry per referencing edge
    /// (input slots and owning-block slots both count).
    pub fn uses(&self, node: Node) -> &[Node] {
        self.uses.get(node).map_or(&[], |list| list.as_slice())
    }

    /// Checks if a node is a basic block.
    pub fn is_block(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Block)
    }

    /// Checks if a node is a φ.
    pub fn is_phi(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Phi)
    }

    /// Checks if a node is an unconditional jump.
    pub fn is_jmp(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Jmp)
    }

    /// Checks if a node is a projection.
    pub fn is_proj(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Proj { .. })
    }

    /// Checks if a node is a conditional branch.
    pub fn is_cond(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Cond { .. })
    }

    /// Checks if a node is the `Bad` sentinel.
    pub fn is_bad(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Bad)
    }

    /// Checks if a node is a constant.
    pub fn is_const(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Const { .. })
    }

    /// Checks if a node is a return.
    pub fn is_return(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::Return)
    }

    /// Checks if a node is a control transfer whose targets the optimizer
    /// cannot see (an indirect jump).
    pub fn is_unknown_jump(&self, node: Node) -> bool {
        matches!(self.kind(node), NodeKind::IJmp)
    }

    /// A block's `i`-th control predecessor (the jump/projection node, not
    /// the block it lives in).
    pub fn cfgpred(&self, block: Node, i: usize) -> Node {
        debug_assert!(self.is_block(block));

        self.input(block, i)
    }

    /// The block that a block's `i`-th control predecessor lives in, or
    /// `None` if that predecessor is `Bad`.
    pub fn cfgpred_block(&self, block: Node, i: usize) -> Option<Node> {
        self.block_of(self.cfgpred(block, i))
    }

    /// Attaches a label to a block. Labeled blocks are never removed by
    /// control-flow optimizations.
    pub fn set_label(&mut self, block: Node, label: impl Into<String>) {
        debug_assert!(self.is_block(block));

        self.labels.insert(block, label.into());
    }

    /// Reads a block's label, if it has one.
    pub fn label(&self, block: Node) -> Option<&str> {
        self.labels.get(&block).map(|s| s.as_str())
    }

    /// Checks whether a block carries a label.
    pub fn has_label(&self, block: Node) -> bool {
        self.labels.contains_key(&block)
    }

    /// A `Cond`'s selector value.
    pub fn cond_selector(&self, cond: Node) -> Node {
        debug_assert!(self.is_cond(cond));

        self.input(cond, 0)
    }

    /// A `Cond`'s default case number.
    pub fn cond_default(&self, cond: Node) -> i64 {
        match self.kind(cond) {
            NodeKind::Cond { default } => default,
            _ => unreachable!("node is not a Cond"),
        }
    }

    /// A `Proj`'s case number.
    pub fn proj_case(&self, proj: Node) -> i64 {
        match self.kind(proj) {
            NodeKind::Proj { case } => case,
            _ => unreachable!("node is not a Proj"),
        }
    }

    /// Evaluates a node to a compile-time constant, if it is one.
    pub fn value_of(&self, node: Node) -> Option<i64> {
        match self.kind(node) {
            NodeKind::Const { value } => Some(value),
            _ => None,
        }
    }

    /// Creates a new block with no control predecessors.
    pub fn new_block(&mut self) -> Node {
        self.create(NodeData::new(NodeKind::Block, Mode::Block, None))
    }

    /// Creates a fresh `Bad` sentinel of the given mode.
    pub fn new_bad(&mut self, mode: Mode) -> Node {
        self.create(NodeData::new(NodeKind::Bad, mode, None))
    }

    /// Creates an unconditional jump out of `block`.
    pub fn new_jmp(&mut self, block: Node) -> Node {
        debug_assert!(self.is_block(block));

        self.create(NodeData::new(NodeKind::Jmp, Mode::Control, Some(block)))
    }

    /// Creates an indirect jump out of `block` through the address `addr`.
    pub fn new_ijmp(&mut self, block: Node, addr: Node) -> Node {
        debug_assert!(self.is_block(block));

        let node = self.create(NodeData::new(NodeKind::IJmp, Mode::Control, Some(block)));

        self.set_inputs(node, &[addr]);

        node
    }

    /// Creates a conditional branch in `block` over `selector`, with
    /// `default` as the default case number. The outgoing edges are the
    /// control [`Self::new_proj`]s created against it.
    pub fn new_cond(&mut self, block: Node, selector: Node, default: i64) -> Node {
        debug_assert!(self.is_block(block));

        let node = self.create(NodeData::new(
            NodeKind::Cond { default },
            Mode::Tuple,
            Some(block),
        ));

        self.set_inputs(node, &[selector]);

        node
    }

    /// Creates a projection extracting output `case` of `pred`. The
    /// projection lives in `pred`'s block.
    pub fn new_proj(&mut self, pred: Node, mode: Mode, case: i64) -> Node {
        let block = self
            .block_of(pred)
            .expect("projection of a node with no block");
        let node = self.create(NodeData::new(NodeKind::Proj { case }, mode, Some(block)));

        self.set_inputs(node, &[pred]);

        node
    }

    /// Creates a φ in `block`. `inputs` must line up with `block`'s control
    /// predecessors.
    pub fn new_phi(&mut self, block: Node, mode: Mode, inputs: &[Node]) -> Node {
        debug_assert!(self.is_block(block));
        debug_assert_eq!(inputs.len(), self.arity(block));

        let node = self.create(NodeData::new(NodeKind::Phi, mode, Some(block)));

        self.set_inputs(node, inputs);

        node
    }

    /// Creates an integer constant in `block`.
    pub fn new_const(&mut self, block: Node, mode: Mode, value: i64) -> Node {
        debug_assert!(self.is_block(block));

        self.create(NodeData::new(NodeKind::Const { value }, mode, Some(block)))
    }

    /// Creates a return in `block`. To make it reachable, add it to the end
    /// block's control predecessors.
    pub fn new_return(&mut self, block: Node, inputs: &[Node]) -> Node {
        debug_assert!(self.is_block(block));

        let node = self.create(NodeData::new(NodeKind::Return, Mode::Control, Some(block)));

        self.set_inputs(node, inputs);

        node
    }

    /// Replaces a node's input vector wholesale, keeping reverse-use edges
    /// in sync.
    pub fn set_inputs(&mut self, node: Node, inputs: &[Node]) {
        let old = std::mem::take(&mut self.nodes[node].inputs);

        for o in old {
            self.remove_use(o, node);
        }

        for &i in inputs {
            self.add_use(i, node);
        }

        self.nodes[node].inputs = SmallVec::from_slice(inputs);
    }

    /// Moves a node into a different owning block.
    pub fn set_block_of(&mut self, node: Node, block: Node) {
        debug_assert!(self.is_block(block));

        if let Some(old) = self.nodes[node].block.expand() {
            self.remove_use(old, node);
        }

        self.nodes[node].block = block.into();
        self.add_use(block, node);
    }

    /// Redirects every use of `old` (input slots and owning-block slots
    /// alike) to `new`, and detaches `old` from its own operands.
    ///
    /// `old` stays in the arena but nothing references it afterwards; it is
    /// garbage that the walkers will simply never reach again.
    pub fn exchange(&mut self, old: Node, new: Node) {
        assert_ne!(old, new, "cannot exchange a node with itself");

        let users = match self.uses.get_mut(old) {
            Some(list) => std::mem::take(list),
            None => SmallVec::default(),
        };

        // every entry accounts for exactly one referencing slot, so
        // rewriting the first match per entry rewrites them all
        for user in users {
            let data = &mut self.nodes[user];

            if let Some(slot) = data.inputs.iter_mut().find(|slot| **slot == old) {
                *slot = new;
            } else if data.block.contains(old) {
                data.block = new.into();
            } else {
                unreachable!("use edge recorded with no matching slot");
            }

            self.add_use(new, user);
        }

        let old_inputs = std::mem::take(&mut self.nodes[old].inputs);

        for input in old_inputs {
            self.remove_use(input, old);
        }

        if let Some(block) = self.nodes[old].block.expand() {
            self.nodes[old].block = PackedOption::none();
            self.remove_use(block, old);
        }
    }

    /// The keep-alive edges of the end node.
    pub fn end_keepalives(&self) -> &[Node] {
        self.inputs(self.end)
    }

    /// Replaces the keep-alive list of the end node.
    pub fn set_end_keepalives(&mut self, keepalives: &[Node]) {
        let end = self.end;

        self.set_inputs(end, keepalives);
    }

    /// Appends one keep-alive edge to the end node.
    pub fn add_keepalive(&mut self, node: Node) {
        let end = self.end;

        self.add_use(node, end);
        self.nodes[end].inputs.push(node);
    }

    /// Drops `Bad` and duplicate entries from the end node's keep-alive
    /// list.
    pub fn remove_bads_and_doublets(&mut self) {
        let end = self.end;
        let mut seen = SaHashSet::default();
        let keepalives: SmallVec<[Node; 8]> = self
            .inputs(end)
            .iter()
            .copied()
            .filter(|&ka| !self.is_bad(ka) && seen.insert(ka))
            .collect();

        if keepalives.len() != self.arity(end) {
            self.set_inputs(end, &keepalives);
        }
    }

    /// Reserves scratch resources for the running pass. Asserts if any of
    /// them are already held.
    pub fn reserve_resources(&mut self, resources: Resources) {
        assert!(
            (self.reserved & resources).is_empty(),
            "scratch resources are already reserved by another pass"
        );

        self.reserved |= resources;
    }

    /// Releases scratch resources reserved earlier. Asserts if they were
    /// not actually held.
    pub fn release_resources(&mut self, resources: Resources) {
        assert!(
            self.reserved.contains(resources),
            "releasing scratch resources that were never reserved"
        );

        self.reserved.remove(resources);
    }

    /// Checks whether the graph is still in the building phase.
    pub fn is_building(&self) -> bool {
        self.building
    }

    /// Leaves the building phase. Optimizations refuse to run on graphs
    /// that are still being built.
    pub fn finish_building(&mut self) {
        self.building = false;
    }

    /// Checks whether node placement is semantically fixed. Control-flow
    /// optimizations require this.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Marks the graph's nodes as floating or pinned.
    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// Checks whether a block was visited by the current
    /// [`block_walk`](crate::ir::block_walk).
    pub fn block_visited(&self, block: Node) -> bool {
        self.block_epoch > 0
            && self.block_visit_marks.get(block).copied() == Some(self.block_epoch)
    }

    pub(crate) fn begin_block_walk(&mut self) {
        self.block_epoch += 1;
    }

    pub(crate) fn mark_block_visited(&mut self, block: Node) {
        let epoch = self.block_epoch;

        self.block_visit_marks.insert(block, epoch);
    }

    fn create(&mut self, data: NodeData) -> Node {
        let block = data.block.expand();
        let node = self.nodes.insert(data);

        self.uses.insert(node, SmallVec::default());

        if let Some(b) = block {
            self.add_use(b, node);
        }

        node
    }

    fn add_use(&mut self, of: Node, user: Node) {
        match self.uses.get_mut(of) {
            Some(list) => list.push(user),
            None => {
                let mut list = SmallVec::default();

                list.push(user);
                self.uses.insert(of, list);
            }
        }
    }

    fn remove_use(&mut self, of: Node, user: Node) {
        let list = self.uses.get_mut(of).expect("node has no use list");
        let position = list
            .iter()
            .position(|&u| u == user)
            .expect("use edge was never recorded");

        list.swap_remove(position);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_graph_shape() {
        let graph = Graph::new();

        assert!(graph.is_block(graph.entry()));
        assert!(graph.is_block(graph.end_block()));
        assert!(matches!(graph.kind(graph.end()), NodeKind::End));
        assert_eq!(graph.block_of(graph.end()), Some(graph.end_block()));
        assert_eq!(graph.arity(graph.entry()), 0);
        assert!(graph.is_building());
        assert!(graph.is_pinned());
    }

    #[test]
    fn uses_track_inputs_and_blocks() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let bb = graph.new_block();
        let jmp = graph.new_jmp(entry);

        graph.set_inputs(bb, &[jmp]);

        // jmp is used by bb (control edge), and owned by entry
        assert_eq!(graph.uses(jmp), &[bb]);
        assert!(graph.uses(entry).contains(&jmp));

        graph.set_inputs(bb, &[]);
        assert!(graph.uses(jmp).is_empty());
    }

    #[test]
    fn duplicate_edges_are_counted_per_edge() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 3);
        let bb = graph.new_block();
        let j1 = graph.new_jmp(entry);
        let j2 = graph.new_jmp(entry);

        graph.set_inputs(bb, &[j1, j2]);

        let phi = graph.new_phi(bb, Mode::Int32, &[v, v]);

        assert_eq!(graph.uses(v), &[phi, phi]);

        let w = graph.new_const(entry, Mode::Int32, 4);

        graph.exchange(v, w);

        assert_eq!(graph.inputs(phi), &[w, w]);
        assert!(graph.uses(v).is_empty());
        assert_eq!(graph.uses(w), &[phi, phi]);
    }

    #[test]
    fn exchange_redirects_ownership() {
        let mut graph = Graph::new();
        let b1 = graph.new_block();
        let b2 = graph.new_block();
        let jmp = graph.new_jmp(b1);

        graph.exchange(b1, b2);

        assert_eq!(graph.block_of(jmp), Some(b2));
        assert!(graph.uses(b1).is_empty());
    }

    #[test]
    fn keepalive_cleanup() {
        let mut graph = Graph::new();
        let entry = graph.entry();
        let v = graph.new_const(entry, Mode::Int32, 1);
        let bad = graph.new_bad(Mode::Control);

        graph.add_keepalive(v);
        graph.add_keepalive(bad);
        graph.add_keepalive(v);

        graph.remove_bads_and_doublets();

        assert_eq!(graph.end_keepalives(), &[v]);
        assert_eq!(graph.uses(v), &[graph.end()]);
    }

    #[test]
    #[should_panic(expected = "already reserved")]
    fn double_reservation_asserts() {
        std::panic::set_hook(Box::new(|_| {}));

        let mut graph = Graph::new();

        graph.reserve_resources(Resources::BLOCK_MARK);
        graph.reserve_resources(Resources::BLOCK_MARK | Resources::NODE_LINK);
    }
}
