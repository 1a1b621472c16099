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

//! Graphs, graph realizations of binary matrices, and the Camion signing
//! machinery that lifts binary realizations to networks.

pub mod camion;
pub mod dot;
pub mod edgelist;
pub mod graph;
pub mod realize;

pub use camion::{camion_signed_check, orient_network};
pub use graph::Graph;
pub use realize::{realize_small, Realization};
