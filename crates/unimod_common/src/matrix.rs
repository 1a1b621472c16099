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

use std::fmt;

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::MatrixError;
use crate::submatrix::Submatrix;

/// Entry type of a [`SparseMatrix`]. The kernel is generic; only the
/// arithmetic that distinguishes exact from floating entries lives here.
pub trait MatrixValue: Copy + PartialEq + fmt::Display {
    const ZERO: Self;

    fn is_zero(self) -> bool;

    /// Sign of the entry as a ternary value.
    fn sign(self) -> i8;

    /// Whether the entry is within `tolerance` of the integer `level`.
    /// Exact for integer entry types; `tolerance` only matters for doubles.
    fn is_near(self, level: i8, tolerance: f64) -> bool;
}

impl MatrixValue for i8 {
    const ZERO: Self = 0;

    fn is_zero(self) -> bool {
        self == 0
    }

    fn sign(self) -> i8 {
        self.signum()
    }

    fn is_near(self, level: i8, _tolerance: f64) -> bool {
        self == level
    }
}

impl MatrixValue for i64 {
    const ZERO: Self = 0;

    fn is_zero(self) -> bool {
        self == 0
    }

    fn sign(self) -> i8 {
        self.signum() as i8
    }

    fn is_near(self, level: i8, _tolerance: f64) -> bool {
        self == level as i64
    }
}

impl MatrixValue for f64 {
    const ZERO: Self = 0.0;

    fn is_zero(self) -> bool {
        self == 0.0
    }

    fn sign(self) -> i8 {
        if self > 0.0 {
            1
        } else if self < 0.0 {
            -1
        } else {
            0
        }
    }

    fn is_near(self, level: i8, tolerance: f64) -> bool {
        (self - level as f64).abs() <= tolerance
    }
}

/// Row-major compressed sparse matrix. Entries inside a row are ordered by
/// ascending column and no structural zero is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix<T> {
    num_rows: usize,
    num_columns: usize,
    row_pointers: Vec<usize>,
    entry_columns: Vec<usize>,
    entry_values: Vec<T>,
}

/// Matrix with entries in {-1, 0, +1} (or {0, 1} when interpreted binary).
pub type TernaryMatrix = SparseMatrix<i8>;
/// Matrix with 64-bit integer entries, used by the equimodularity reduction.
pub type IntMatrix = SparseMatrix<i64>;
/// Matrix with double entries, used by the tolerance-based fallback paths.
pub type DoubleMatrix = SparseMatrix<f64>;

impl<T: MatrixValue> SparseMatrix<T> {
    /// An empty matrix of the given shape.
    pub fn zero(num_rows: usize, num_columns: usize) -> Self {
        Self {
            num_rows,
            num_columns,
            row_pointers: vec![0; num_rows + 1],
            entry_columns: Vec::new(),
            entry_values: Vec::new(),
        }
    }

    /// Builds a matrix from a row-major dense slice, dropping zeros.
    pub fn from_dense(num_rows: usize, num_columns: usize, values: &[T]) -> Self {
        assert_eq!(values.len(), num_rows * num_columns);
        let mut matrix = Self::zero(num_rows, num_columns);
        for row in 0..num_rows {
            for column in 0..num_columns {
                let value = values[row * num_columns + column];
                if !value.is_zero() {
                    matrix.entry_columns.push(column);
                    matrix.entry_values.push(value);
                }
            }
            matrix.row_pointers[row + 1] = matrix.entry_columns.len();
        }
        matrix
    }

    /// Builds a matrix from (row, column, value) triplets. The triplets need
    /// not be sorted; duplicates and explicit zeros are rejected.
    pub fn from_triplets(
        num_rows: usize,
        num_columns: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, MatrixError> {
        let mut sorted: Vec<(usize, usize, T)> = Vec::with_capacity(triplets.len());
        for &(row, column, value) in triplets {
            if row >= num_rows || column >= num_columns {
                return Err(MatrixError::invalid(format!(
                    "entry ({},{}) outside of {}x{} matrix",
                    row + 1,
                    column + 1,
                    num_rows,
                    num_columns
                )));
            }
            if value.is_zero() {
                return Err(MatrixError::invalid(format!(
                    "explicit zero entry at ({},{})",
                    row + 1,
                    column + 1
                )));
            }
            sorted.push((row, column, value));
        }
        sorted.sort_by_key(|&(row, column, _)| (row, column));
        for window in sorted.windows(2) {
            if window[0].0 == window[1].0 && window[0].1 == window[1].1 {
                return Err(MatrixError::invalid(format!(
                    "duplicate entry at ({},{})",
                    window[0].0 + 1,
                    window[0].1 + 1
                )));
            }
        }

        let mut matrix = Self::zero(num_rows, num_columns);
        let mut index = 0;
        for row in 0..num_rows {
            while index < sorted.len() && sorted[index].0 == row {
                matrix.entry_columns.push(sorted[index].1);
                matrix.entry_values.push(sorted[index].2);
                index += 1;
            }
            matrix.row_pointers[row + 1] = matrix.entry_columns.len();
        }
        Ok(matrix)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn num_nonzeros(&self) -> usize {
        self.entry_columns.len()
    }

    /// Column indices of the nonzeros of `row`, ascending.
    pub fn row_columns(&self, row: usize) -> &[usize] {
        &self.entry_columns[self.row_pointers[row]..self.row_pointers[row + 1]]
    }

    /// Values of the nonzeros of `row`, parallel to [`Self::row_columns`].
    pub fn row_values(&self, row: usize) -> &[T] {
        &self.entry_values[self.row_pointers[row]..self.row_pointers[row + 1]]
    }

    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        self.row_columns(row)
            .iter()
            .copied()
            .zip(self.row_values(row).iter().copied())
    }

    /// Binary search for the entry at `(row, column)`; `None` means a
    /// structural zero.
    pub fn find_entry(&self, row: usize, column: usize) -> Option<usize> {
        let start = self.row_pointers[row];
        let slice = self.row_columns(row);
        slice.binary_search(&column).ok().map(|pos| start + pos)
    }

    pub fn get(&self, row: usize, column: usize) -> T {
        match self.find_entry(row, column) {
            Some(entry) => self.entry_values[entry],
            None => T::ZERO,
        }
    }

    /// Sorts the nonzeros of each row by ascending column. Idempotent.
    pub fn sort_rows(&mut self) {
        for row in 0..self.num_rows {
            let range = self.row_pointers[row]..self.row_pointers[row + 1];
            let mut pairs: Vec<(usize, T)> = self.entry_columns[range.clone()]
                .iter()
                .copied()
                .zip(self.entry_values[range.clone()].iter().copied())
                .collect();
            pairs.sort_by_key(|&(column, _)| column);
            for (offset, (column, value)) in pairs.into_iter().enumerate() {
                self.entry_columns[range.start + offset] = column;
                self.entry_values[range.start + offset] = value;
            }
        }
    }

    /// Linear-time transpose via counting sort on columns.
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0usize; self.num_columns + 1];
        for &column in &self.entry_columns {
            counts[column + 1] += 1;
        }
        for column in 0..self.num_columns {
            counts[column + 1] += counts[column];
        }
        let row_pointers = counts.clone();
        let mut entry_columns = vec![0usize; self.num_nonzeros()];
        let mut entry_values = vec![T::ZERO; self.num_nonzeros()];
        for row in 0..self.num_rows {
            for (column, value) in self.row_entries(row) {
                let slot = counts[column];
                counts[column] += 1;
                entry_columns[slot] = row;
                entry_values[slot] = value;
            }
        }
        Self {
            num_rows: self.num_columns,
            num_columns: self.num_rows,
            row_pointers,
            entry_columns,
            entry_values,
        }
    }

    /// Applies old-to-new index maps: entry `(r, c)` of `self` becomes entry
    /// `(row_map[r], column_map[c])` of the result.
    pub fn permute(&self, row_map: &[usize], column_map: &[usize]) -> Result<Self, MatrixError> {
        if row_map.len() != self.num_rows || column_map.len() != self.num_columns {
            return Err(MatrixError::invalid("permutation length mismatch"));
        }
        let mut old_row_of = vec![usize::MAX; self.num_rows];
        for (old, &new) in row_map.iter().enumerate() {
            if new >= self.num_rows || old_row_of[new] != usize::MAX {
                return Err(MatrixError::invalid("row map is not a permutation"));
            }
            old_row_of[new] = old;
        }
        let mut seen_column = vec![false; self.num_columns];
        for &new in column_map {
            if new >= self.num_columns || seen_column[new] {
                return Err(MatrixError::invalid("column map is not a permutation"));
            }
            seen_column[new] = true;
        }

        let mut result = Self::zero(self.num_rows, self.num_columns);
        for new_row in 0..self.num_rows {
            let old_row = old_row_of[new_row];
            let mut pairs: Vec<(usize, T)> = self
                .row_entries(old_row)
                .map(|(column, value)| (column_map[column], value))
                .collect();
            pairs.sort_by_key(|&(column, _)| column);
            for (column, value) in pairs {
                result.entry_columns.push(column);
                result.entry_values.push(value);
            }
            result.row_pointers[new_row + 1] = result.entry_columns.len();
        }
        Ok(result)
    }

    /// Extracts the submatrix given by the descriptor's row and column lists.
    /// Lists may be in any order; the result uses the listed order.
    pub fn slice(&self, submatrix: &Submatrix) -> Result<Self, MatrixError> {
        let mut column_position = vec![usize::MAX; self.num_columns];
        for (position, &column) in submatrix.columns.iter().enumerate() {
            if column >= self.num_columns {
                return Err(MatrixError::invalid(format!(
                    "submatrix column c{} outside matrix",
                    column + 1
                )));
            }
            column_position[column] = position;
        }
        let mut result = Self::zero(submatrix.rows.len(), submatrix.columns.len());
        for (new_row, &row) in submatrix.rows.iter().enumerate() {
            if row >= self.num_rows {
                return Err(MatrixError::invalid(format!(
                    "submatrix row r{} outside matrix",
                    row + 1
                )));
            }
            let mut pairs: Vec<(usize, T)> = self
                .row_entries(row)
                .filter_map(|(column, value)| {
                    let position = column_position[column];
                    (position != usize::MAX).then_some((position, value))
                })
                .collect();
            pairs.sort_by_key(|&(column, _)| column);
            for (column, value) in pairs {
                result.entry_columns.push(column);
                result.entry_values.push(value);
            }
            result.row_pointers[new_row + 1] = result.entry_columns.len();
        }
        Ok(result)
    }

    /// Replaces every entry within `tolerance` of a nonzero level by 1;
    /// entries within tolerance of zero are dropped.
    pub fn support_with(&self, tolerance: f64) -> TernaryMatrix {
        self.map_levels(tolerance, |_| 1)
    }

    pub fn support(&self) -> TernaryMatrix {
        self.support_with(0.0)
    }

    /// Replaces every entry by its sign.
    pub fn signed_support_with(&self, tolerance: f64) -> TernaryMatrix {
        self.map_levels(tolerance, |value| value.sign())
    }

    pub fn signed_support(&self) -> TernaryMatrix {
        self.signed_support_with(0.0)
    }

    fn map_levels(&self, tolerance: f64, f: impl Fn(T) -> i8) -> TernaryMatrix {
        let mut result = TernaryMatrix::zero(self.num_rows, self.num_columns);
        for row in 0..self.num_rows {
            for (column, value) in self.row_entries(row) {
                if !value.is_near(0, tolerance) {
                    result.entry_columns.push(column);
                    result.entry_values.push(f(value));
                }
            }
            result.row_pointers[row + 1] = result.entry_columns.len();
        }
        result
    }

    /// Whether every entry is within `tolerance` of {0, 1}. On failure the
    /// offending position is returned.
    pub fn is_binary_with(&self, tolerance: f64) -> Result<(), (usize, usize)> {
        self.check_levels(tolerance, &[0, 1])
    }

    pub fn is_binary(&self) -> Result<(), (usize, usize)> {
        self.is_binary_with(0.0)
    }

    /// Whether every entry is within `tolerance` of {-1, 0, 1}.
    pub fn is_ternary_with(&self, tolerance: f64) -> Result<(), (usize, usize)> {
        self.check_levels(tolerance, &[-1, 0, 1])
    }

    pub fn is_ternary(&self) -> Result<(), (usize, usize)> {
        self.is_ternary_with(0.0)
    }

    fn check_levels(&self, tolerance: f64, levels: &[i8]) -> Result<(), (usize, usize)> {
        for row in 0..self.num_rows {
            for (column, value) in self.row_entries(row) {
                if !levels.iter().any(|&level| value.is_near(level, tolerance)) {
                    return Err((row, column));
                }
            }
        }
        Ok(())
    }

    /// Verifies the structural invariants; returns a diagnostic on failure.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.row_pointers.len() != self.num_rows + 1 {
            return Err(format!(
                "row pointer array has length {} instead of {}",
                self.row_pointers.len(),
                self.num_rows + 1
            ));
        }
        if self.row_pointers[0] != 0 || self.row_pointers[self.num_rows] != self.num_nonzeros() {
            return Err("row pointers do not span the nonzero range".to_string());
        }
        for row in 0..self.num_rows {
            if self.row_pointers[row] > self.row_pointers[row + 1] {
                return Err(format!("row pointer of r{} decreases", row + 1));
            }
            let columns = self.row_columns(row);
            for index in 0..columns.len() {
                if columns[index] >= self.num_columns {
                    return Err(format!(
                        "entry in r{} has column {} beyond the matrix",
                        row + 1,
                        columns[index] + 1
                    ));
                }
                if index > 0 && columns[index - 1] >= columns[index] {
                    return Err(format!("entries of r{} are not strictly ascending", row + 1));
                }
            }
            for value in self.row_values(row) {
                if value.is_zero() {
                    return Err(format!("stored zero in r{}", row + 1));
                }
            }
        }
        Ok(())
    }

    /// Row-major dense expansion.
    pub fn to_dense(&self) -> Vec<T> {
        let mut dense = vec![T::ZERO; self.num_rows * self.num_columns];
        for row in 0..self.num_rows {
            for (column, value) in self.row_entries(row) {
                dense[row * self.num_columns + column] = value;
            }
        }
        dense
    }
}

impl TernaryMatrix {
    /// Interop with the sparse ecosystem.
    pub fn to_csr(&self) -> CsMat<i8> {
        let mut triplets = TriMat::new((self.num_rows, self.num_columns));
        for row in 0..self.num_rows {
            for (column, value) in self.row_entries(row) {
                triplets.add_triplet(row, column, value);
            }
        }
        triplets.to_csr()
    }

    /// Pivot over GF(2). Requires a nonzero pivot entry. For `r != row`,
    /// `c != column` with both `M(row, c)` and `M(r, column)` nonzero, the
    /// entry `(r, c)` is flipped; the pivot row and column stay unchanged.
    pub fn binary_pivot(&self, row: usize, column: usize) -> Result<Self, MatrixError> {
        if self.get(row, column).is_zero() {
            return Err(MatrixError::invalid(format!(
                "pivot entry ({},{}) is zero",
                row + 1,
                column + 1
            )));
        }
        let mut pivot_row_columns = vec![false; self.num_columns];
        for (c, _) in self.row_entries(row) {
            pivot_row_columns[c] = true;
        }

        let mut dense_row = vec![0i8; self.num_columns];
        let mut result = Self::zero(self.num_rows, self.num_columns);
        for r in 0..self.num_rows {
            if r == row || self.get(r, column).is_zero() {
                for (c, value) in self.row_entries(r) {
                    result.entry_columns.push(c);
                    result.entry_values.push(value);
                }
            } else {
                for (c, value) in self.row_entries(r) {
                    dense_row[c] = value;
                }
                for c in 0..self.num_columns {
                    if c != column && pivot_row_columns[c] {
                        dense_row[c] = 1 - dense_row[c];
                    }
                    if dense_row[c] != 0 {
                        result.entry_columns.push(c);
                        result.entry_values.push(dense_row[c]);
                        dense_row[c] = 0;
                    }
                }
            }
            result.row_pointers[r + 1] = result.entry_columns.len();
        }
        Ok(result)
    }

    /// Pivot over GF(3) folded into {-1, 0, +1}. Requires the pivot entry in
    /// {-1, +1}. Only meaningful when the caller has validated that every
    /// fold lands in {-1, 0, +1}.
    pub fn ternary_pivot(&self, row: usize, column: usize) -> Result<Self, MatrixError> {
        let pivot_value = self.get(row, column);
        if pivot_value != 1 && pivot_value != -1 {
            return Err(MatrixError::invalid(format!(
                "pivot entry ({},{}) is not in {{-1,+1}}",
                row + 1,
                column + 1
            )));
        }
        let mut pivot_row_dense = vec![0i8; self.num_columns];
        for (c, value) in self.row_entries(row) {
            pivot_row_dense[c] = value;
        }

        let mut dense_row = vec![0i8; self.num_columns];
        let mut result = Self::zero(self.num_rows, self.num_columns);
        for r in 0..self.num_rows {
            let row_entry = self.get(r, column);
            if r == row || row_entry == 0 {
                for (c, value) in self.row_entries(r) {
                    result.entry_columns.push(c);
                    result.entry_values.push(value);
                }
            } else {
                for (c, value) in self.row_entries(r) {
                    dense_row[c] = value;
                }
                for c in 0..self.num_columns {
                    if c != column && pivot_row_dense[c] != 0 {
                        let raw =
                            dense_row[c] as i32 - (row_entry as i32 * pivot_row_dense[c] as i32) / pivot_value as i32;
                        let mut folded = raw % 3;
                        if folded > 1 {
                            folded -= 3;
                        } else if folded < -1 {
                            folded += 3;
                        }
                        dense_row[c] = folded as i8;
                    }
                    if dense_row[c] != 0 {
                        result.entry_columns.push(c);
                        result.entry_values.push(dense_row[c]);
                        dense_row[c] = 0;
                    }
                }
            }
            result.row_pointers[r + 1] = result.entry_columns.len();
        }
        Ok(result)
    }
}

impl<T: MatrixValue> fmt::Display for SparseMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.num_rows, self.num_columns)?;
        for row in 0..self.num_rows {
            let mut entries = self.row_entries(row).peekable();
            for column in 0..self.num_columns {
                if column > 0 {
                    write!(f, " ")?;
                }
                match entries.peek() {
                    Some(&(c, value)) if c == column => {
                        write!(f, "{value}")?;
                        entries.next();
                    }
                    _ => write!(f, "0")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel3() -> TernaryMatrix {
        TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1])
    }

    #[test]
    fn transpose_is_an_involution() {
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 0, -1, 0, 0, 1, 1, 0, 1, -1, 0, 1]);
        assert_eq!(matrix.transpose().transpose(), matrix);
        assert!(matrix.transpose().check_consistency().is_ok());
    }

    #[test]
    fn find_entry_distinguishes_structural_zeros() {
        let matrix = wheel3();
        assert!(matrix.find_entry(0, 0).is_some());
        assert!(matrix.find_entry(0, 2).is_none());
        assert_eq!(matrix.get(2, 1), 1);
        assert_eq!(matrix.get(1, 0), 0);
    }

    #[test]
    fn permute_commutes_with_support() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, -1, 0, 1]);
        let row_map = [2, 0, 1];
        let column_map = [1, 2, 0];
        let lhs = matrix.permute(&row_map, &column_map).unwrap().support();
        let rhs = matrix.support().permute(&row_map, &column_map).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn slice_matches_entrywise_extraction() {
        let matrix = TernaryMatrix::from_dense(4, 4, &[1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 0, 0, 0, 0, 1, 1]);
        let submatrix = Submatrix::new(vec![3, 1], vec![0, 3, 2]);
        let sliced = matrix.slice(&submatrix).unwrap();
        for (new_row, &row) in submatrix.rows.iter().enumerate() {
            for (new_column, &column) in submatrix.columns.iter().enumerate() {
                assert_eq!(sliced.get(new_row, new_column), matrix.get(row, column));
            }
        }
        assert!(sliced.check_consistency().is_ok());
    }

    #[test]
    fn binary_pivot_is_involutive() {
        let matrix = wheel3();
        let pivoted = matrix.binary_pivot(1, 1).unwrap();
        assert_eq!(pivoted.binary_pivot(1, 1).unwrap(), matrix);
        // Pivot row and column are preserved.
        assert_eq!(pivoted.row_columns(1), matrix.row_columns(1));
    }

    #[test]
    fn ternary_pivot_folds_into_range() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 1, 1, -1]);
        let pivoted = matrix.ternary_pivot(0, 0).unwrap();
        assert_eq!(pivoted.to_dense(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn ternary_pivot_without_folds_is_involutive() {
        let matrix = TernaryMatrix::from_dense(3, 2, &[1, 0, -1, 1, 1, -1]);
        let pivoted = matrix.ternary_pivot(0, 0).unwrap();
        assert_eq!(pivoted, matrix);
        assert_eq!(pivoted.ternary_pivot(0, 0).unwrap(), matrix);
    }

    #[test]
    fn ternary_pivot_rejects_zero_pivot() {
        let matrix = wheel3();
        assert!(matrix.ternary_pivot(0, 2).is_err());
    }

    #[test]
    fn triplets_reject_duplicates_and_zeros() {
        assert!(TernaryMatrix::from_triplets(2, 2, &[(0, 0, 1), (0, 0, 1)]).is_err());
        assert!(TernaryMatrix::from_triplets(2, 2, &[(1, 1, 0)]).is_err());
        let matrix = TernaryMatrix::from_triplets(2, 2, &[(1, 1, -1), (0, 0, 1)]).unwrap();
        assert!(matrix.check_consistency().is_ok());
        assert_eq!(matrix.get(1, 1), -1);
    }

    #[test]
    fn binary_and_ternary_checks() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, -1, 0, 1]);
        assert_eq!(matrix.is_binary(), Err((0, 1)));
        assert!(matrix.is_ternary().is_ok());
        let double = DoubleMatrix::from_dense(1, 2, &[1.0000001, -0.9999999]);
        assert!(double.is_ternary_with(1.0e-3).is_ok());
        assert!(double.is_ternary_with(1.0e-9).is_err());
    }

    #[test]
    fn csr_interop_preserves_entries() {
        let matrix = wheel3();
        let csr = matrix.to_csr();
        assert_eq!(csr.rows(), 3);
        assert_eq!(csr.cols(), 3);
        assert_eq!(csr.nnz(), matrix.num_nonzeros());
        assert_eq!(csr.get(2, 2), Some(&1));
        assert_eq!(csr.get(0, 2), None);
    }
}
