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

use crate::matrix::TernaryMatrix;

/// Packed bit matrix used by the nested-minor-sequence engine, where
/// intermediate density is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseBinaryMatrix {
    num_rows: usize,
    num_columns: usize,
    stride: usize,
    words: Vec<u64>,
}

impl DenseBinaryMatrix {
    pub fn zero(num_rows: usize, num_columns: usize) -> Self {
        let stride = num_columns.div_ceil(64).max(1);
        Self {
            num_rows,
            num_columns,
            stride,
            words: vec![0; num_rows * stride],
        }
    }

    pub fn from_sparse(matrix: &TernaryMatrix) -> Self {
        let mut dense = Self::zero(matrix.num_rows(), matrix.num_columns());
        for row in 0..matrix.num_rows() {
            for (column, _) in matrix.row_entries(row) {
                dense.set(row, column, true);
            }
        }
        dense
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn get(&self, row: usize, column: usize) -> bool {
        let (word, bit) = self.index(row, column);
        (self.words[word] >> bit) & 1 == 1
    }

    pub fn set(&mut self, row: usize, column: usize, value: bool) {
        let (word, bit) = self.index(row, column);
        if value {
            self.words[word] |= 1 << bit;
        } else {
            self.words[word] &= !(1 << bit);
        }
    }

    pub fn flip(&mut self, row: usize, column: usize) {
        let (word, bit) = self.index(row, column);
        self.words[word] ^= 1 << bit;
    }

    /// Pivot over GF(2): flips the cross product of the rows with a one in
    /// the pivot column and the columns with a one in the pivot row. The
    /// pivot row and column themselves stay untouched.
    pub fn pivot(&mut self, pivot_row: usize, pivot_column: usize) {
        debug_assert!(self.get(pivot_row, pivot_column));
        let rows: Vec<usize> = (0..self.num_rows)
            .filter(|&row| row != pivot_row && self.get(row, pivot_column))
            .collect();
        let columns: Vec<usize> = (0..self.num_columns)
            .filter(|&column| column != pivot_column && self.get(pivot_row, column))
            .collect();
        for &row in &rows {
            for &column in &columns {
                self.flip(row, column);
            }
        }
    }

    fn index(&self, row: usize, column: usize) -> (usize, usize) {
        debug_assert!(row < self.num_rows && column < self.num_columns);
        (row * self.stride + column / 64, column % 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_flip() {
        let mut dense = DenseBinaryMatrix::zero(3, 130);
        assert!(!dense.get(2, 129));
        dense.set(2, 129, true);
        assert!(dense.get(2, 129));
        dense.flip(2, 129);
        assert!(!dense.get(2, 129));
        dense.flip(0, 64);
        assert!(dense.get(0, 64));
        assert!(!dense.get(0, 63));
    }

    #[test]
    fn pivot_flips_cross_product_only() {
        // 1 1 0
        // 1 1 1
        // 0 1 1
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 1, 1, 1, 0, 1, 1]);
        let mut dense = DenseBinaryMatrix::from_sparse(&matrix);
        dense.pivot(1, 1);
        // Rows 0 and 2 have ones in column 1; columns 0 and 2 have ones in
        // row 1. Their four crossings flip.
        assert!(!dense.get(0, 0));
        assert!(dense.get(0, 2));
        assert!(dense.get(2, 0));
        assert!(!dense.get(2, 2));
        // Base row and column are untouched.
        assert!(dense.get(1, 0) && dense.get(1, 1) && dense.get(1, 2));
        assert!(dense.get(0, 1) && dense.get(2, 1));
    }
}
