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

//! Recognition of totally unimodular, network, regular and (equi)modular
//! matrices, built on the Seymour decomposition of the underlying binary
//! matroid.

pub mod ctu;
pub mod determinant;
pub mod equimodular;
pub mod network;
pub mod tu;

pub use ctu::{complement, test_complement_tu, CtuResult};
pub use determinant::{brute_force_violator, submatrix_determinant};
pub use equimodular::{
    test_equimodular, test_k_modular, test_strongly_equimodular, test_strongly_k_modular,
    test_strongly_unimodular, test_unimodular, EquimodularResult,
};
pub use network::{test_conetwork, test_network, NetworkResult};
pub use tu::{extract_violator, test_regular_binary, test_tu, RegularResult, TuResult};
