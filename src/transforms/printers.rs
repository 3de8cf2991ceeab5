//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::stringify_graph;
use crate::ir::Graph;
use crate::pass::{GraphAnalysisManager, GraphTransformPass, PreservedAnalyses};
use std::io;

/// This is a pass that writes out a textual representation of a graph to a
/// given stream.
pub struct GraphWriterPass {
    out: Box<dyn io::Write>,
}

impl GraphWriterPass {
    /// Shorthand for a writer that prints to [`std::io::stdout`].
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    /// Shorthand for a writer that prints to [`std::io::stderr`].
    pub fn stderr() -> Self {
        Self::with_writer(io::stderr())
    }

    /// Creates an instance of the pass with a given writer.
    ///
    /// This writer will be where the graph is printed out when the pass
    /// is run over the IR.
    pub fn with_writer<T: io::Write + 'static>(writer: T) -> Self {
        Self {
            out: Box::new(writer),
        }
    }
}

impl GraphTransformPass for GraphWriterPass {
    fn name(&self) -> &str {
        "print"
    }

    fn run(&mut self, graph: &mut Graph, _: &GraphAnalysisManager) -> PreservedAnalyses {
        self.out
            .write_all(stringify_graph(graph).as_bytes())
            .expect("unable to write graph to writer");

        PreservedAnalyses::all()
    }
}
