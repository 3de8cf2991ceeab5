//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::dense_arena_key;
use crate::utility::PackedOption;
use smallvec::SmallVec;
use static_assertions::assert_eq_size;

#[cfg(feature = "enable-serde")]
use serde::{Deserialize, Serialize};

dense_arena_key! {
    /// A reference to a single node in a [`Graph`](crate::ir::Graph).
    ///
    /// Everything in the IR is a node: basic blocks, φs, jumps, constants,
    /// even the `Bad` sentinel. A `Node` is completely useless without the
    /// graph it came from, it's just a key into a giant table. The graph
    /// holds all the information that actually makes it useful.
    pub struct Node;
}

assert_eq_size!(Node, u32);
assert_eq_size!(PackedOption<Node>, u32);

/// The mode (type) of a node's value.
///
/// Control flow and data flow live in the same graph, so modes cover both:
/// `Control` is the mode of a control-flow edge's producer (a `Jmp` or a
/// control `Proj`), `Block` is the mode of block nodes themselves, and the
/// rest are ordinary value modes.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum Mode {
    /// The mode of a block node.
    Block,
    /// The mode of a control-flow value, i.e. something a block can have as
    /// a control predecessor.
    Control,
    /// The mode of a multi-output node whose pieces are extracted
    /// with `Proj`s.
    Tuple,
    /// The mode of a memory state value.
    Memory,
    /// A boolean value. A `Cond` with a `Bool` selector is a two-way branch,
    /// anything else is a switch.
    Bool,
    /// A 32-bit integer value.
    Int32,
    /// A 64-bit integer value.
    Int64,
}

impl Mode {
    /// Checks whether this is one of the integer value modes.
    pub fn is_int(self) -> bool {
        matches!(self, Mode::Int32 | Mode::Int64)
    }

    /// Checks whether this mode denotes a data value rather than control
    /// flow or graph structure.
    pub fn is_value(self) -> bool {
        !matches!(self, Mode::Block | Mode::Control | Mode::Tuple)
    }
}

/// What a node *is*: the opcode-like tag that decides how its inputs are
/// interpreted.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(Serialize, Deserialize))]
pub enum NodeKind {
    /// A basic block. Inputs are the control predecessors (`Jmp`s, control
    /// `Proj`s or `Bad`s). The nodes *inside* the block are the ones whose
    /// owning block points at it.
    Block,
    /// An unconditional jump to the one block that uses it as an input.
    Jmp,
    /// An indirect jump through a computed address. Input 0 is the address.
    /// Its targets are unknown to the optimizer.
    IJmp,
    /// A conditional branch. Input 0 is the selector; the outgoing edges are
    /// the control `Proj`s that use it. A `Bool` selector makes this a
    /// two-way branch, any other selector mode makes it a switch.
    Cond {
        /// The case number designated as the default case.
        default: i64,
    },
    /// A projection, extracting one output of a multi-output node.
    /// Input 0 is the producer.
    Proj {
        /// For `Proj`s of a `Cond`, the case number this projection
        /// is taken for.
        case: i64,
    },
    /// An SSA value merge. Input `i` is the value if control entered the
    /// owning block through the block's predecessor `i`.
    Phi,
    /// An integer (or boolean) constant.
    Const {
        /// The constant's value, boolean constants use 0 and 1.
        value: i64,
    },
    /// A return from the function; a control predecessor of the end block.
    Return,
    /// The end node. Its inputs are keep-alive edges holding otherwise
    /// unused nodes (loops with no exit, mostly) live.
    End,
    /// The sentinel for a definitionally dead value or control edge.
    Bad,
}

/// The payload of a single node: its kind, mode, owning block and ordered
/// input vector.
///
/// Block nodes and `Bad` nodes have no owning block. Everything else has
/// one, and for pinned graphs it is semantically meaningful.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub(in crate::ir) kind: NodeKind,
    pub(in crate::ir) mode: Mode,
    pub(in crate::ir) block: PackedOption<Node>,
    pub(in crate::ir) inputs: SmallVec<[Node; 2]>,
}

impl NodeData {
    pub(in crate::ir) fn new(kind: NodeKind, mode: Mode, block: Option<Node>) -> Self {
        Self {
            kind,
            mode,
            block: block.into(),
            inputs: SmallVec::default(),
        }
    }

    /// The node's kind tag.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The node's mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The node's ordered inputs.
    pub fn inputs(&self) -> &[Node] {
        &self.inputs
    }

    /// The node's owning block, if it has one.
    pub fn block(&self) -> Option<Node> {
        self.block.expand()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_predicates() {
        assert!(Mode::Int32.is_int());
        assert!(Mode::Int64.is_int());
        assert!(!Mode::Bool.is_int());

        assert!(Mode::Bool.is_value());
        assert!(Mode::Memory.is_value());
        assert!(!Mode::Control.is_value());
        assert!(!Mode::Block.is_value());
        assert!(!Mode::Tuple.is_value());
    }
}
