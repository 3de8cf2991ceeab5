//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Graph, GraphIdentity};
use crate::utility::SaHashMap;
use smallvec::{smallvec, SmallVec};
use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell};

struct All;

/// Models the set of analyses that a given transformation pass preserves.
///
/// This is not a contract that is checked, it is expected that the transform
/// knows what analyses it can preserve. If it reports incorrectly, this can
/// lead to mis-compilations or panics inside the compiler.
#[derive(Debug)]
pub struct PreservedAnalyses {
    // sorted so we can binary_search for `contains`
    preserved: SmallVec<[TypeId; 2]>,
}

impl PreservedAnalyses {
    /// Returns a [`PreservedAnalyses`] that marks every analysis as
    /// preserved.
    pub fn all() -> Self {
        Self {
            preserved: smallvec![TypeId::of::<All>()],
        }
    }

    /// Returns a [`PreservedAnalyses`] that marks every analysis as
    /// invalidated.
    pub fn none() -> Self {
        Self {
            preserved: smallvec![],
        }
    }

    /// Checks if *all* analyses are preserved by a given transformation. If
    /// this is true, the transformation effectively reports to have not
    /// changed *anything* in the IR.
    ///
    /// This cannot be obtained in any way except [`Self::all`].
    pub fn preserves_all(&self) -> bool {
        self.preserved.len() == 1 && self.preserved[0] == TypeId::of::<All>()
    }

    /// Reports that an analysis is preserved by the current transformation.
    pub fn preserve<T: Any>(&mut self) {
        self.insert(TypeId::of::<T>())
    }

    /// Gets the intersection of two sets of preserved analyses, returning
    /// the analyses that are preserved both by `self` and by `other`.
    pub fn intersect(self, other: PreservedAnalyses) -> PreservedAnalyses {
        if self.preserves_all() {
            return other;
        }

        if other.preserves_all() {
            return self;
        }

        let mut new = PreservedAnalyses::none();
        let intersection = self.preserved.into_iter().filter(|id| other.contains(*id));

        for id in intersection {
            new.insert(id)
        }

        new
    }

    /// Checks if an analysis is preserved. If all are preserved or an
    /// analysis with an equivalent [`TypeId`] has been preserved with
    /// [`Self::preserve`], this returns `true`.
    pub fn is_preserved(&self, id: TypeId) -> bool {
        self.preserves_all() || self.contains(id)
    }

    fn contains(&self, id: TypeId) -> bool {
        self.preserved.binary_search(&id).is_ok()
    }

    fn insert(&mut self, id: TypeId) {
        if let Err(pos) = self.preserved.binary_search(&id) {
            self.preserved.insert(pos, id);
        }
    }
}

/// An analysis that runs over a whole graph.
pub trait GraphAnalysisPass: Any {
    /// The result type of a given analysis.
    type Result: Any;

    /// Performs the analysis and returns a computed result. This should not
    /// be an impure operation, running the analysis twice on the same input
    /// should produce the same result.
    fn run(&mut self, graph: &Graph, am: &GraphAnalysisManager) -> Self::Result;
}

trait ErasedAnalysisPass {
    fn run_boxed(&mut self, graph: &Graph, am: &GraphAnalysisManager) -> Box<dyn Any>;
}

struct AnalysisWrapper<T> {
    inner: T,
}

impl<T: GraphAnalysisPass> ErasedAnalysisPass for AnalysisWrapper<T> {
    fn run_boxed(&mut self, graph: &Graph, am: &GraphAnalysisManager) -> Box<dyn Any> {
        Box::new(self.inner.run(graph, am))
    }
}

type MaybeResult = RefCell<Option<Box<dyn Any>>>;

/// A lazy analysis manager for graphs.
///
/// Analysis passes are registered through [`Self::add_analysis`], and can
/// then be requested through [`Self::get`]. When a pass wants the result of
/// an analysis, [`Self::get`] either returns the cached result, or if the
/// analysis is "invalid" it computes the result, caches it, and returns it.
///
/// When a transform pass completes, it returns the set of analyses it
/// preserved ([`PreservedAnalyses`]); handing that to [`Self::invalidate`]
/// marks everything not preserved as invalid. Results are keyed by graph
/// identity, so one manager can serve multiple graphs.
#[derive(Default)]
pub struct GraphAnalysisManager {
    passes: SaHashMap<TypeId, RefCell<Box<dyn ErasedAnalysisPass>>>,
    results: SaHashMap<(GraphIdentity, TypeId), MaybeResult>,
}

impl GraphAnalysisManager {
    /// Creates a manager with no analyses registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an analysis pass with the manager. The pass is not run
    /// until it is later requested through [`Self::get`].
    pub fn add_analysis<T: GraphAnalysisPass>(&mut self, pass: T) {
        self.passes
            .insert(TypeId::of::<T>(), RefCell::new(Box::new(AnalysisWrapper { inner: pass })));
    }

    /// Sets up result slots for a graph. Must be called (once per graph)
    /// before [`Self::get`] is used for that graph;
    /// [`GraphPassManager`](crate::pass::GraphPassManager) does this
    /// automatically.
    pub fn initialize(&mut self, graph: &Graph) {
        let identity = graph.identity();
        let ids: SmallVec<[TypeId; 8]> = self.passes.keys().copied().collect();

        for id in ids {
            self.results
                .entry((identity, id))
                .or_insert_with(|| RefCell::new(None));
        }
    }

    /// Invalidates all the analyses for `graph` that were not explicitly
    /// preserved by `preserved`.
    ///
    /// This does not trigger any passes to be re-run, it merely marks them
    /// as invalid which will cause a re-run if they are later requested
    /// through [`Self::get`].
    pub fn invalidate(&mut self, graph: &Graph, preserved: &PreservedAnalyses) {
        let identity = graph.identity();

        for (&(graph_id, pass_id), slot) in self.results.iter_mut() {
            if graph_id == identity && !preserved.is_preserved(pass_id) {
                slot.get_mut().take();
            }
        }
    }

    /// Lazily gets the result of an analysis. If the analysis has been
    /// invalidated, the result is re-computed, cached, and then returned.
    pub fn get<T: GraphAnalysisPass>(&self, graph: &Graph) -> Ref<'_, T::Result> {
        let id = TypeId::of::<T>();
        let slot = self
            .results
            .get(&(graph.identity(), id))
            .expect("`initialize` was not called for this graph");

        if slot.borrow().is_none() {
            let pass = self
                .passes
                .get(&id)
                .expect("trying to get analysis that hasn't been registered");
            let result = pass.borrow_mut().run_boxed(graph, self);

            slot.borrow_mut().replace(result);
        }

        Ref::map(slot.borrow(), |inner: &Option<Box<dyn Any>>| {
            // we know that unwrapping `inner` is safe, the slot was filled
            // above. we then downcast the `dyn Any` into `T::Result`
            inner.as_ref().unwrap().downcast_ref().unwrap()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct CountingAnalysis {
        runs: Rc<RefCell<usize>>,
    }

    impl GraphAnalysisPass for CountingAnalysis {
        type Result = usize;

        fn run(&mut self, _: &Graph, _: &GraphAnalysisManager) -> usize {
            *self.runs.borrow_mut() += 1;

            *self.runs.borrow()
        }
    }

    #[test]
    fn results_are_cached_until_invalidated() {
        let runs = Rc::new(RefCell::new(0));
        let graph = Graph::new();
        let mut am = GraphAnalysisManager::new();

        am.add_analysis(CountingAnalysis { runs: Rc::clone(&runs) });
        am.initialize(&graph);

        assert_eq!(*am.get::<CountingAnalysis>(&graph), 1);
        assert_eq!(*am.get::<CountingAnalysis>(&graph), 1);

        am.invalidate(&graph, &PreservedAnalyses::all());
        assert_eq!(*am.get::<CountingAnalysis>(&graph), 1);

        am.invalidate(&graph, &PreservedAnalyses::none());
        assert_eq!(*am.get::<CountingAnalysis>(&graph), 2);
    }

    #[test]
    fn preservation_set_behaves() {
        let mut preserved = PreservedAnalyses::none();

        assert!(!preserved.is_preserved(TypeId::of::<CountingAnalysis>()));

        preserved.preserve::<CountingAnalysis>();

        assert!(preserved.is_preserved(TypeId::of::<CountingAnalysis>()));
        assert!(PreservedAnalyses::all().is_preserved(TypeId::of::<CountingAnalysis>()));

        let both = PreservedAnalyses::all().intersect(preserved);

        assert!(both.is_preserved(TypeId::of::<CountingAnalysis>()));
        assert!(!both.preserves_all());
    }
}
