//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The pass infrastructure: transform and analysis pass traits, the lazy
//! analysis manager, and the pass manager that strings transforms together.
//!
//! Transform passes mutate a graph and report which analyses they kept
//! intact; analysis passes compute derived information (dominators, mostly)
//! that the manager caches until a transform invalidates it.

mod analysis;
mod manager;
mod transform;

pub use analysis::*;
pub use manager::*;
pub use transform::*;
