// Copyright contributors to the unimod project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Seymour decomposition of binary matroids given by explicit matrices:
//! series-parallel reduction, nested-minor-sequence construction,
//! (co)graphicness along the sequence, k-separations and the driver that
//! assembles the decomposition tree.

pub mod deadline;
pub mod driver;
pub mod error;
pub mod nested;
pub mod node;
pub mod r10;
pub mod separation;
pub mod seq_graphic;
pub mod series_parallel;

pub use deadline::Deadline;
pub use driver::{decompose, DecompositionParams, DecompositionStats};
pub use error::RecognitionError;
pub use node::{DecompositionTree, NodeId, NodeType};
pub use separation::{Separation, SeparationType};
