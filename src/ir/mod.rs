//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The IR itself: a pinned graph of nodes in the sea-of-nodes style.
//!
//! Everything is a [`Node`]: blocks, φs, jumps, constants, the `Bad`
//! sentinel. A block's inputs are its control predecessors, a φ's inputs
//! line up one-to-one with its block's inputs, and every non-block node is
//! owned by the block it executes in. [`Graph`] owns the nodes, the
//! reverse-use edges between them, and the builders that create new ones.

mod graph;
mod node;
mod peephole;
mod walk;

pub use graph::*;
pub use node::*;
pub use peephole::*;
pub use walk::*;
