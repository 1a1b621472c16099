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

use serde::{Deserialize, Serialize};

/// Order-preserving references to rows and columns of a parent matrix.
/// Used both as the argument of slicing and as a violator certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submatrix {
    pub rows: Vec<usize>,
    pub columns: Vec<usize>,
}

impl Submatrix {
    pub fn new(rows: Vec<usize>, columns: Vec<usize>) -> Self {
        Self { rows, columns }
    }

    /// The full row and column range of an `num_rows` x `num_columns` matrix.
    pub fn full(num_rows: usize, num_columns: usize) -> Self {
        Self {
            rows: (0..num_rows).collect(),
            columns: (0..num_columns).collect(),
        }
    }

    pub fn is_square(&self) -> bool {
        self.rows.len() == self.columns.len()
    }

    /// Rewrites the indices through the given maps into a parent matrix.
    pub fn into_parent(self, row_map: &[usize], column_map: &[usize]) -> Self {
        Self {
            rows: self.rows.into_iter().map(|row| row_map[row]).collect(),
            columns: self.columns.into_iter().map(|column| column_map[column]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_covers_all_lines() {
        let submatrix = Submatrix::full(2, 3);
        assert_eq!(submatrix.rows, vec![0, 1]);
        assert_eq!(submatrix.columns, vec![0, 1, 2]);
        assert!(!submatrix.is_square());
    }

    #[test]
    fn into_parent_rewrites_indices() {
        let submatrix = Submatrix::new(vec![0, 2], vec![1]);
        let mapped = submatrix.into_parent(&[5, 6, 7], &[3, 4]);
        assert_eq!(mapped.rows, vec![5, 7]);
        assert_eq!(mapped.columns, vec![4]);
    }
}
