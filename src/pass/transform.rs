//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::Graph;
use crate::pass::{GraphAnalysisManager, PreservedAnalyses};

/// Models a pass that possibly performs a transformation over a graph.
///
/// While the pass may not actually modify the IR, it has the ability to, and
/// needs to declare what it changed (if anything) through
/// [`PreservedAnalyses`].
pub trait GraphTransformPass {
    /// The pass's name, used by pipelines and diagnostics.
    fn name(&self) -> &str;

    /// Performs the transformation over a given graph.
    ///
    /// This function is expected to act as-if it was pure, i.e. calling the
    /// same pass multiple times on the same IR should produce equivalent IR
    /// each time and should return the same preserved analyses each time.
    fn run(&mut self, graph: &mut Graph, am: &GraphAnalysisManager) -> PreservedAnalyses;
}
