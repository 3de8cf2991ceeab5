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
use crate::pass::{GraphAnalysisManager, GraphTransformPass, PreservedAnalyses};

/// Manages running a set of passes over a graph.
///
/// An important note is that this is effectively a transform pass itself,
/// it's a pass that simply runs other passes. Analyses are invalidated
/// between passes according to what each pass reported it preserved.
#[derive(Default)]
pub struct GraphPassManager {
    passes: Vec<Box<dyn GraphTransformPass>>,
}

impl GraphPassManager {
    /// Creates a new, empty, pass manager.
    pub fn new() -> Self {
        Self {
            passes: Vec::default(),
        }
    }

    /// Adds a transformation pass to the pass manager. This pass's order is
    /// defined relative to other calls to [`Self::add_pass`].
    pub fn add_pass<T: GraphTransformPass + 'static>(&mut self, pass: T) {
        self.passes.push(Box::new(pass));
    }

    /// The names of the registered passes, in execution order.
    pub fn pass_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.passes.iter().map(|pass| pass.name())
    }

    /// Runs every registered pass over `graph` in order.
    pub fn run(&mut self, graph: &mut Graph, am: &mut GraphAnalysisManager) -> PreservedAnalyses {
        let mut preserved = PreservedAnalyses::all();

        for pass in self.passes.iter_mut() {
            am.initialize(graph);

            let other = pass.run(graph, am);

            am.invalidate(graph, &other);
            preserved = preserved.intersect(other);
        }

        preserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RenamingPass {
        name: &'static str,
    }

    impl GraphTransformPass for RenamingPass {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&mut self, graph: &mut Graph, _: &GraphAnalysisManager) -> PreservedAnalyses {
            let entry = graph.entry();

            graph.set_label(entry, self.name);

            PreservedAnalyses::all()
        }
    }

    #[test]
    fn passes_run_in_order() {
        let mut graph = Graph::new();
        let mut am = GraphAnalysisManager::new();
        let mut pm = GraphPassManager::new();

        pm.add_pass(RenamingPass { name: "first" });
        pm.add_pass(RenamingPass { name: "second" });

        let names: Vec<&str> = pm.pass_names().collect();

        assert_eq!(names, vec!["first", "second"]);

        let preserved = pm.run(&mut graph, &mut am);

        assert!(preserved.preserves_all());
        assert_eq!(graph.label(graph.entry()), Some("second"));
    }
}
