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

//! Brute-force subdeterminant checking: every square submatrix is
//! enumerated through 64-bit subset masks and its determinant computed
//! exactly by fraction-free elimination. A double LU fallback exists for
//! matrices with non-integer entries.

use nalgebra::DMatrix;
use unimod_common::{DoubleMatrix, MatrixValue, SparseMatrix, Submatrix};

use unimod_decomp::RecognitionError;

/// Exact determinant of a small square integer matrix by the fraction-free
/// Bareiss elimination; overflow is reported instead of wrapping.
pub fn bareiss_determinant(dense: &[i64], order: usize) -> Result<i64, RecognitionError> {
    assert_eq!(dense.len(), order * order);
    if order == 0 {
        return Ok(1);
    }
    let mut work: Vec<i64> = dense.to_vec();
    let mut sign = 1i64;
    let mut previous_pivot = 1i64;
    for step in 0..order - 1 {
        // Pivot selection with row swaps.
        if work[step * order + step] == 0 {
            let Some(swap) = (step + 1..order).find(|&row| work[row * order + step] != 0) else {
                return Ok(0);
            };
            for column in 0..order {
                work.swap(step * order + column, swap * order + column);
            }
            sign = -sign;
        }
        let pivot = work[step * order + step];
        for row in step + 1..order {
            for column in step + 1..order {
                let a = work[row * order + column]
                    .checked_mul(pivot)
                    .ok_or(RecognitionError::Overflow)?;
                let b = work[row * order + step]
                    .checked_mul(work[step * order + column])
                    .ok_or(RecognitionError::Overflow)?;
                let numerator = a.checked_sub(b).ok_or(RecognitionError::Overflow)?;
                debug_assert_eq!(numerator % previous_pivot, 0);
                work[row * order + column] = numerator / previous_pivot;
            }
            work[row * order + step] = 0;
        }
        previous_pivot = pivot;
    }
    Ok(sign * work[(order - 1) * order + (order - 1)])
}

/// Determinant of a square submatrix.
pub fn submatrix_determinant<T: MatrixValue + Into<i64>>(
    matrix: &SparseMatrix<T>,
    submatrix: &Submatrix,
) -> Result<i64, RecognitionError> {
    assert!(submatrix.is_square());
    let order = submatrix.rows.len();
    let mut dense = vec![0i64; order * order];
    for (target_row, &row) in submatrix.rows.iter().enumerate() {
        for (target_column, &column) in submatrix.columns.iter().enumerate() {
            dense[target_row * order + target_column] = matrix.get(row, column).into();
        }
    }
    bareiss_determinant(&dense, order)
}

/// Checks all square submatrices; returns the first one (in ascending mask
/// order) whose determinant lies outside {-1, 0, +1}.
pub fn brute_force_violator<T: MatrixValue + Into<i64>>(
    matrix: &SparseMatrix<T>,
) -> Result<Option<Submatrix>, RecognitionError> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    if num_rows >= 64 || num_columns >= 64 {
        return Err(RecognitionError::structure(
            "matrix too large for subdeterminant enumeration",
        ));
    }
    for row_choice in 1u64..(1 << num_rows) {
        let row_cardinality = row_choice.count_ones();
        for column_choice in 1u64..(1 << num_columns) {
            if column_choice.count_ones() != row_cardinality {
                continue;
            }
            let submatrix = Submatrix::new(
                (0..num_rows).filter(|&row| row_choice & (1 << row) != 0).collect(),
                (0..num_columns)
                    .filter(|&column| column_choice & (1 << column) != 0)
                    .collect(),
            );
            let determinant = submatrix_determinant(matrix, &submatrix)?;
            if determinant.abs() > 1 {
                return Ok(Some(submatrix));
            }
        }
    }
    Ok(None)
}

/// Double-precision LU determinant for the tolerance-based fallback path.
pub fn double_determinant(matrix: &DoubleMatrix, submatrix: &Submatrix) -> f64 {
    assert!(submatrix.is_square());
    let order = submatrix.rows.len();
    if order == 0 {
        return 1.0;
    }
    let mut dense = Vec::with_capacity(order * order);
    for &row in &submatrix.rows {
        for &column in &submatrix.columns {
            dense.push(matrix.get(row, column));
        }
    }
    DMatrix::from_row_slice(order, order, &dense).lu().determinant()
}

#[cfg(test)]
mod tests {
    use super::*;
    use unimod_common::TernaryMatrix;

    #[test]
    fn bareiss_matches_known_determinants() {
        assert_eq!(bareiss_determinant(&[1, 1, 1, -1], 2).unwrap(), -2);
        assert_eq!(bareiss_determinant(&[1, 1, 0, 0, 1, 1, 1, 1, 1], 3).unwrap(), 1);
        assert_eq!(bareiss_determinant(&[1, 1, 0, 0, 1, 1, 1, 0, 1], 3).unwrap(), 2);
        assert_eq!(bareiss_determinant(&[0, 1, 1, 0], 2).unwrap(), -1);
        assert_eq!(bareiss_determinant(&[2, 0, 0, 3], 2).unwrap(), 6);
    }

    #[test]
    fn violator_search_finds_the_bad_block() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 1, 1, -1]);
        let violator = brute_force_violator(&matrix).unwrap().unwrap();
        assert_eq!(violator.rows, vec![0, 1]);
        assert_eq!(violator.columns, vec![0, 1]);

        let network = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
        assert!(brute_force_violator(&network).unwrap().is_none());
    }

    #[test]
    fn double_fallback_agrees_with_exact() {
        let matrix = DoubleMatrix::from_dense(2, 2, &[1.0, 1.0, 1.0, -1.0]);
        let determinant = double_determinant(&matrix, &Submatrix::full(2, 2));
        assert!((determinant - (-2.0)).abs() < 1.0e-9);
    }
}
