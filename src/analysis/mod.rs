//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Different analyses that can be performed over graphs.
//!
//! These are usually requested through a
//! [`GraphAnalysisManager`](crate::pass::GraphAnalysisManager) so that
//! passes share cached results, but every analysis can also be computed
//! directly when a pass needs a fresh result mid-flight.

mod dominators;
mod writer;

pub use dominators::*;
pub use writer::*;
