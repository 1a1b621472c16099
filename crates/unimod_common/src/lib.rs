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

//! Shared infrastructure of the unimod workspace: the sparse row-major matrix
//! kernel, the packed dense binary matrix, element tags, submatrix
//! descriptors, hash tables, the bipartite shortest-path search, and the
//! matrix file formats.

pub mod bipartite;
pub mod dense;
pub mod element;
pub mod error;
pub mod hashing;
pub mod io;
pub mod matrix;
pub mod random;
pub mod submatrix;

pub use element::Element;
pub use error::MatrixError;
pub use matrix::{DoubleMatrix, IntMatrix, MatrixValue, SparseMatrix, TernaryMatrix};
pub use submatrix::Submatrix;
