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

//! Total unimodularity and binary regularity. A ternary matrix is totally
//! unimodular exactly when its signs pass the Camion check and its support
//! is regular over GF(2); the decomposition tree doubles as the positive
//! certificate, a submatrix with |det| >= 2 as the negative one.

use std::time::Duration;

use log::{debug, info};
use unimod_common::{Submatrix, TernaryMatrix};
use unimod_decomp::{decompose, DecompositionParams, DecompositionStats, DecompositionTree, RecognitionError};
use unimod_graph::camion_signed_check;

use crate::determinant::brute_force_violator;

/// Result of a total unimodularity test.
#[derive(Debug)]
pub enum TuResult {
    Yes {
        /// Present when certificates were requested.
        decomposition: Option<DecompositionTree>,
    },
    No {
        /// A square submatrix whose determinant has absolute value >= 2.
        violator: Submatrix,
    },
}

impl TuResult {
    pub fn is_tu(&self) -> bool {
        matches!(self, Self::Yes { .. })
    }
}

/// Result of a binary regularity test.
#[derive(Debug)]
pub struct RegularResult {
    pub regular: bool,
    pub decomposition: Option<DecompositionTree>,
}

/// Tests an explicit ternary matrix for total unimodularity.
pub fn test_tu(
    matrix: &TernaryMatrix,
    certificates: bool,
    time_limit: Option<Duration>,
    stats: Option<&mut DecompositionStats>,
) -> Result<TuResult, RecognitionError> {
    if let Err((row, column)) = matrix.is_ternary() {
        return Err(RecognitionError::Matrix(unimod_common::MatrixError::invalid(format!(
            "entry at ({},{}) is not in {{-1,0,+1}}",
            row + 1,
            column + 1
        ))));
    }
    info!(
        "testing a {}x{} matrix for total unimodularity",
        matrix.num_rows(),
        matrix.num_columns()
    );

    // Sign consistency first: a failing chordless cycle is itself a
    // violator with determinant +-2.
    if let Err(violator) = camion_signed_check(matrix) {
        debug!("camion check fails; returning the cycle submatrix");
        return Ok(TuResult::No { violator });
    }

    let params = DecompositionParams {
        stop_when_irregular: true,
        time_limit,
        ..DecompositionParams::default()
    };
    let tree = decompose(&matrix.support(), false, &params, stats)?;
    match tree.root_node().regularity {
        Some(true) => Ok(TuResult::Yes {
            decomposition: certificates.then_some(tree),
        }),
        _ => {
            let violator = extract_violator(matrix, time_limit)?;
            Ok(TuResult::No { violator })
        }
    }
}

/// Tests a binary matrix for regularity over GF(2).
pub fn test_regular_binary(
    matrix: &TernaryMatrix,
    certificates: bool,
    time_limit: Option<Duration>,
    stats: Option<&mut DecompositionStats>,
) -> Result<RegularResult, RecognitionError> {
    if let Err((row, column)) = matrix.is_binary() {
        return Err(RecognitionError::Matrix(unimod_common::MatrixError::invalid(format!(
            "entry at ({},{}) is not in {{0,1}}",
            row + 1,
            column + 1
        ))));
    }
    let params = DecompositionParams {
        stop_when_irregular: !certificates,
        time_limit,
        ..DecompositionParams::default()
    };
    let tree = decompose(matrix, false, &params, stats)?;
    let regular = tree.root_node().regularity == Some(true);
    Ok(RegularResult {
        regular,
        decomposition: certificates.then_some(tree),
    })
}

/// Quiet oracle used by the violator extraction.
fn is_tu_quiet(matrix: &TernaryMatrix, time_limit: Option<Duration>) -> Result<bool, RecognitionError> {
    if camion_signed_check(matrix).is_err() {
        return Ok(false);
    }
    let params = DecompositionParams {
        stop_when_irregular: true,
        time_limit,
        ..DecompositionParams::default()
    };
    let tree = decompose(&matrix.support(), false, &params, None)?;
    Ok(tree.root_node().regularity == Some(true))
}

/// Extracts a violating submatrix from a matrix known not to be totally
/// unimodular. Small matrices use the exact enumerator; larger ones shrink
/// greedily with re-testing until the violation is minimal, which by
/// Camion's theorem on minimal violations leaves a square submatrix with
/// |det| = 2.
pub fn extract_violator(
    matrix: &TernaryMatrix,
    time_limit: Option<Duration>,
) -> Result<Submatrix, RecognitionError> {
    if matrix.num_rows() <= 8 && matrix.num_columns() <= 8 {
        return brute_force_violator(matrix)?
            .ok_or_else(|| RecognitionError::inconsistent("matrix is totally unimodular after all"));
    }

    let mut rows: Vec<usize> = (0..matrix.num_rows()).collect();
    let mut columns: Vec<usize> = (0..matrix.num_columns()).collect();
    loop {
        let mut changed = false;
        let mut index = 0;
        while index < rows.len() {
            let mut candidate_rows = rows.clone();
            candidate_rows.remove(index);
            let candidate = matrix.slice(&Submatrix::new(candidate_rows.clone(), columns.clone()))?;
            if !is_tu_quiet(&candidate, time_limit)? {
                rows = candidate_rows;
                changed = true;
            } else {
                index += 1;
            }
        }
        let mut index = 0;
        while index < columns.len() {
            let mut candidate_columns = columns.clone();
            candidate_columns.remove(index);
            let candidate = matrix.slice(&Submatrix::new(rows.clone(), candidate_columns.clone()))?;
            if !is_tu_quiet(&candidate, time_limit)? {
                columns = candidate_columns;
                changed = true;
            } else {
                index += 1;
            }
        }
        if !changed {
            break;
        }
    }
    debug!(
        "greedy shrinking leaves a {}x{} violator",
        rows.len(),
        columns.len()
    );
    Ok(Submatrix::new(rows, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinant::submatrix_determinant;

    fn tu(matrix: &TernaryMatrix) -> TuResult {
        test_tu(matrix, true, None, None).unwrap()
    }

    #[test]
    fn single_entry_is_tu() {
        let result = tu(&TernaryMatrix::from_dense(1, 1, &[1]));
        assert!(result.is_tu());
        let TuResult::Yes { decomposition } = result else { unreachable!() };
        assert!(decomposition.is_some());
    }

    #[test]
    fn two_by_two_with_determinant_two_is_not_tu() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 1, 1, -1]);
        let TuResult::No { violator } = tu(&matrix) else {
            panic!("matrix has determinant -2");
        };
        let determinant = submatrix_determinant(&matrix, &violator).unwrap();
        assert!(determinant.abs() >= 2);
    }

    #[test]
    fn signed_wheel_is_tu() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
        assert!(tu(&matrix).is_tu());
    }

    #[test]
    fn fano_lift_is_not_tu() {
        // Any +-1 lift of the Fano matrix is rejected; either by signs or
        // by irregularity of the support.
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1]);
        let TuResult::No { violator } = tu(&matrix) else {
            panic!("the Fano matroid is not regular");
        };
        let determinant = submatrix_determinant(&matrix, &violator).unwrap();
        assert!(determinant.abs() >= 2);
    }

    #[test]
    fn r10_signing_is_tu() {
        // The standard TU signing of R10.
        let matrix = TernaryMatrix::from_dense(
            5,
            5,
            &[
                1, -1, 0, 0, -1, //
                -1, 1, -1, 0, 0, //
                0, -1, 1, -1, 0, //
                0, 0, -1, 1, -1, //
                -1, 0, 0, -1, 1,
            ],
        );
        assert!(tu(&matrix).is_tu());
    }

    #[test]
    fn non_ternary_input_is_rejected() {
        let matrix = TernaryMatrix::from_dense(1, 1, &[2]);
        assert!(test_tu(&matrix, false, None, None).is_err());
    }

    #[test]
    fn binary_regularity_of_wheel() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let result = test_regular_binary(&matrix, true, None, None).unwrap();
        assert!(result.regular);
        assert!(result.decomposition.is_some());
    }
}
