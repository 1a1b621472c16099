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

//! Equimodularity and (strong) unimodularity of integer matrices.
//!
//! A rank-r matrix is equimodular with determinant gcd k when every
//! nonsingular r x r submatrix has |det| = k. Writing M through a basis B
//! (rows R, columns C) as M = S * M_R and M_R = B * N, every maximal
//! determinant factors as det(S_rows) * det(M_R restricted), so M is
//! equimodular exactly when both cofactor matrices S (with identity on R)
//! and N (with identity on C) are totally unimodular and k = |det B|.
//! All arithmetic is overflow-checked.

use std::time::Duration;

use log::{debug, info};
use unimod_common::{IntMatrix, TernaryMatrix};
use unimod_decomp::RecognitionError;

use crate::determinant::bareiss_determinant;
use crate::tu::test_tu;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquimodularResult {
    pub equimodular: bool,
    /// Determinant gcd of the nonsingular maximal submatrices; 0 when not
    /// equimodular.
    pub k: i64,
}

/// Selects basis rows and pivot columns through an exact echelon form.
/// Echelon rows are gcd-normalized to keep the entries small.
fn select_basis(matrix: &IntMatrix) -> Result<(Vec<usize>, Vec<usize>), RecognitionError> {
    let num_columns = matrix.num_columns();
    let mut echelon: Vec<Vec<i64>> = Vec::new();
    let mut pivot_columns: Vec<usize> = Vec::new();
    let mut basis_rows: Vec<usize> = Vec::new();

    for row in 0..matrix.num_rows() {
        let mut candidate = vec![0i64; num_columns];
        for (column, value) in matrix.row_entries(row) {
            candidate[column] = value;
        }
        // Reduce against the echelon rows.
        for (position, &pivot_column) in pivot_columns.iter().enumerate() {
            let coefficient = candidate[pivot_column];
            if coefficient == 0 {
                continue;
            }
            let pivot_value = echelon[position][pivot_column];
            for column in 0..num_columns {
                let a = candidate[column]
                    .checked_mul(pivot_value)
                    .ok_or(RecognitionError::Overflow)?;
                let b = echelon[position][column]
                    .checked_mul(coefficient)
                    .ok_or(RecognitionError::Overflow)?;
                candidate[column] = a.checked_sub(b).ok_or(RecognitionError::Overflow)?;
            }
            normalize(&mut candidate);
        }
        if let Some(pivot_column) = candidate.iter().position(|&value| value != 0) {
            normalize(&mut candidate);
            echelon.push(candidate);
            pivot_columns.push(pivot_column);
            basis_rows.push(row);
        }
    }
    Ok((basis_rows, pivot_columns))
}

fn normalize(row: &mut [i64]) {
    let mut gcd: i64 = 0;
    for &value in row.iter() {
        gcd = gcd_i64(gcd, value.abs());
    }
    if gcd > 1 {
        for value in row.iter_mut() {
            *value /= gcd;
        }
    }
}

fn gcd_i64(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Solves `B x = b` exactly; `None` when the solution leaves {-1, 0, +1}.
fn solve_ternary(basis: &[i64], order: usize, b: &[i64]) -> Result<Option<Vec<i8>>, RecognitionError> {
    // Fraction-free elimination of the augmented system.
    let width = order + 1;
    let mut work = vec![0i64; order * width];
    for row in 0..order {
        work[row * width..row * width + order].copy_from_slice(&basis[row * order..(row + 1) * order]);
        work[row * width + order] = b[row];
    }
    for step in 0..order {
        if work[step * width + step] == 0 {
            let Some(swap) = (step + 1..order).find(|&row| work[row * width + step] != 0) else {
                return Err(RecognitionError::structure("basis is singular"));
            };
            for column in 0..width {
                work.swap(step * width + column, swap * width + column);
            }
        }
        let pivot = work[step * width + step];
        for row in step + 1..order {
            let coefficient = work[row * width + step];
            if coefficient == 0 {
                continue;
            }
            for column in step..width {
                let a = work[row * width + column]
                    .checked_mul(pivot)
                    .ok_or(RecognitionError::Overflow)?;
                let c = work[step * width + column]
                    .checked_mul(coefficient)
                    .ok_or(RecognitionError::Overflow)?;
                work[row * width + column] = a.checked_sub(c).ok_or(RecognitionError::Overflow)?;
            }
            let mut slice: Vec<i64> = work[row * width..(row + 1) * width].to_vec();
            normalize(&mut slice);
            work[row * width..(row + 1) * width].copy_from_slice(&slice);
        }
    }
    // Back substitution with divisibility checks.
    let mut solution = vec![0i64; order];
    for step in (0..order).rev() {
        let mut numerator = work[step * width + order];
        for column in step + 1..order {
            let product = work[step * width + column]
                .checked_mul(solution[column])
                .ok_or(RecognitionError::Overflow)?;
            numerator = numerator.checked_sub(product).ok_or(RecognitionError::Overflow)?;
        }
        let denominator = work[step * width + step];
        if numerator % denominator != 0 {
            return Ok(None);
        }
        let value = numerator / denominator;
        if value.abs() > 1 {
            return Ok(None);
        }
        solution[step] = value;
    }
    Ok(Some(solution.into_iter().map(|value| value as i8).collect()))
}

/// Tests whether all nonsingular maximal submatrices share the same
/// absolute determinant. With `required_k` the computed gcd must match.
pub fn test_equimodular(
    matrix: &IntMatrix,
    required_k: Option<i64>,
    time_limit: Option<Duration>,
) -> Result<EquimodularResult, RecognitionError> {
    info!(
        "testing a {}x{} integer matrix for equimodularity",
        matrix.num_rows(),
        matrix.num_columns()
    );
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    let (basis_rows, pivot_columns) = select_basis(matrix)?;
    let rank = basis_rows.len();
    if rank == 0 {
        // The zero matrix is trivially equimodular with k = 1.
        let k = 1;
        return Ok(EquimodularResult {
            equimodular: required_k.is_none_or(|required| required == k),
            k,
        });
    }

    // The basis determinant.
    let mut basis = vec![0i64; rank * rank];
    for (target_row, &row) in basis_rows.iter().enumerate() {
        for (target_column, &column) in pivot_columns.iter().enumerate() {
            basis[target_row * rank + target_column] = matrix.get(row, column);
        }
    }
    let k = bareiss_determinant(&basis, rank)?.abs();
    debug_assert!(k > 0);
    debug!("rank is {rank}, basis determinant is {k}");
    if let Some(required) = required_k {
        if required != k {
            return Ok(EquimodularResult { equimodular: false, k });
        }
    }

    // N = B^{-1} * M_R must be ternary and totally unimodular.
    let mut n_triplets: Vec<(usize, usize, i8)> = Vec::new();
    for column in 0..num_columns {
        let b: Vec<i64> = basis_rows.iter().map(|&row| matrix.get(row, column)).collect();
        let Some(solution) = solve_ternary(&basis, rank, &b)? else {
            return Ok(EquimodularResult { equimodular: false, k: 0 });
        };
        for (position, &value) in solution.iter().enumerate() {
            if value != 0 {
                n_triplets.push((position, column, value));
            }
        }
    }
    let n_matrix = TernaryMatrix::from_triplets(rank, num_columns, &n_triplets)?;
    if !test_tu(&n_matrix, false, time_limit, None)?.is_tu() {
        return Ok(EquimodularResult { equimodular: false, k: 0 });
    }

    // S: every row expressed over the basis rows; S has an identity on the
    // basis rows, must be ternary and totally unimodular.
    let mut transposed_basis = vec![0i64; rank * rank];
    for row in 0..rank {
        for column in 0..rank {
            transposed_basis[column * rank + row] = basis[row * rank + column];
        }
    }
    let mut s_triplets: Vec<(usize, usize, i8)> = Vec::new();
    for row in 0..num_rows {
        let b: Vec<i64> = pivot_columns.iter().map(|&column| matrix.get(row, column)).collect();
        let Some(solution) = solve_ternary(&transposed_basis, rank, &b)? else {
            return Ok(EquimodularResult { equimodular: false, k: 0 });
        };
        // The coefficients must reproduce the whole row, not only the
        // basis columns.
        for column in 0..num_columns {
            let mut combined: i64 = 0;
            for (position, &basis_row) in basis_rows.iter().enumerate() {
                let product = (solution[position] as i64)
                    .checked_mul(matrix.get(basis_row, column))
                    .ok_or(RecognitionError::Overflow)?;
                combined = combined.checked_add(product).ok_or(RecognitionError::Overflow)?;
            }
            if combined != matrix.get(row, column) {
                return Ok(EquimodularResult { equimodular: false, k: 0 });
            }
        }
        for (position, &value) in solution.iter().enumerate() {
            if value != 0 {
                s_triplets.push((row, position, value));
            }
        }
    }
    let s_matrix = TernaryMatrix::from_triplets(num_rows, rank, &s_triplets)?;
    if !test_tu(&s_matrix, false, time_limit, None)?.is_tu() {
        return Ok(EquimodularResult { equimodular: false, k: 0 });
    }

    Ok(EquimodularResult { equimodular: true, k })
}

/// Equimodular with determinant gcd one.
pub fn test_unimodular(matrix: &IntMatrix, time_limit: Option<Duration>) -> Result<bool, RecognitionError> {
    let result = test_equimodular(matrix, Some(1), time_limit)?;
    Ok(result.equimodular)
}

/// Equimodular for the matrix and its transpose.
pub fn test_strongly_equimodular(
    matrix: &IntMatrix,
    required_k: Option<i64>,
    time_limit: Option<Duration>,
) -> Result<EquimodularResult, RecognitionError> {
    let result = test_equimodular(matrix, required_k, time_limit)?;
    if !result.equimodular {
        return Ok(result);
    }
    let transpose = matrix.transpose();
    let transposed = test_equimodular(&transpose, Some(result.k), time_limit)?;
    Ok(EquimodularResult {
        equimodular: transposed.equimodular,
        k: if transposed.equimodular { result.k } else { 0 },
    })
}

pub fn test_strongly_unimodular(
    matrix: &IntMatrix,
    time_limit: Option<Duration>,
) -> Result<bool, RecognitionError> {
    let result = test_strongly_equimodular(matrix, Some(1), time_limit)?;
    Ok(result.equimodular)
}

/// Reports the determinant gcd when the matrix is equimodular for it.
pub fn test_k_modular(
    matrix: &IntMatrix,
    time_limit: Option<Duration>,
) -> Result<Option<i64>, RecognitionError> {
    let result = test_equimodular(matrix, None, time_limit)?;
    Ok(result.equimodular.then_some(result.k))
}

pub fn test_strongly_k_modular(
    matrix: &IntMatrix,
    time_limit: Option<Duration>,
) -> Result<Option<i64>, RecognitionError> {
    let result = test_strongly_equimodular(matrix, None, time_limit)?;
    Ok(result.equimodular.then_some(result.k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_unimodular() {
        let matrix = IntMatrix::from_dense(2, 2, &[1, 0, 0, 1]);
        assert!(test_unimodular(&matrix, None).unwrap());
        assert!(test_strongly_unimodular(&matrix, None).unwrap());
    }

    #[test]
    fn tu_matrix_is_unimodular() {
        let matrix = IntMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
        assert!(test_unimodular(&matrix, None).unwrap());
    }

    #[test]
    fn scaled_identity_is_two_modular() {
        let matrix = IntMatrix::from_dense(2, 2, &[2, 0, 0, 2]);
        let result = test_equimodular(&matrix, None, None).unwrap();
        assert!(result.equimodular);
        assert_eq!(result.k, 4);
        assert_eq!(test_k_modular(&matrix, None).unwrap(), Some(4));
        assert!(!test_unimodular(&matrix, None).unwrap());
    }

    #[test]
    fn mixed_column_determinants_are_not_equimodular() {
        // Bases on columns {0,1} and {0,2} have determinants 1 and 2.
        let matrix = IntMatrix::from_dense(2, 3, &[1, 0, 1, 0, 1, 2]);
        let result = test_equimodular(&matrix, None, None).unwrap();
        assert!(!result.equimodular);
    }

    #[test]
    fn mixed_row_determinants_are_not_equimodular() {
        // Bases on rows {0,2} and {1,2} have determinants -1 and -2.
        let matrix = IntMatrix::from_dense(3, 2, &[1, 1, 2, 2, 1, 0]);
        let result = test_equimodular(&matrix, None, None).unwrap();
        assert!(!result.equimodular);
    }

    #[test]
    fn duplicated_tu_rows_stay_unimodular() {
        let matrix = IntMatrix::from_dense(3, 2, &[1, 1, 1, 1, 1, 0]);
        assert!(test_unimodular(&matrix, None).unwrap());
    }

    #[test]
    fn required_k_mismatch_is_rejected() {
        let matrix = IntMatrix::from_dense(2, 2, &[2, 0, 0, 1]);
        let result = test_equimodular(&matrix, Some(1), None).unwrap();
        assert!(!result.equimodular);
        assert_eq!(result.k, 2);
    }
}
