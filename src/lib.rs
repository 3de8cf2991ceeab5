//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

#![allow(dead_code)]
#![deny(
    unreachable_pub,
    missing_docs,
    missing_abi,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]

//! # Garnet
//!
//! APIs for building and optimizing GIR, a pinned graph-based SSA IR in the
//! sea-of-nodes style. Control flow is explicit in the graph: blocks are
//! nodes whose inputs are their control predecessors, and φs are nodes whose
//! inputs line up one-to-one with the inputs of their owning block.
//!
//! The main entry points are [`ir::Graph`] for constructing graphs and the
//! passes in [`transforms`], most notably [`transforms::optimize_cf`].

pub mod analysis;
pub mod arena;
pub mod ir;
pub mod pass;
pub mod transforms;
pub mod utility;
