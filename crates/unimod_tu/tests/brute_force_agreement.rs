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

//! The recognition pipeline must agree with exhaustive subdeterminant
//! enumeration on every small matrix.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unimod_common::TernaryMatrix;
use unimod_tu::{brute_force_violator, submatrix_determinant, test_tu, TuResult};

fn random_ternary(rng: &mut StdRng, num_rows: usize, num_columns: usize) -> TernaryMatrix {
    let dense: Vec<i8> = (0..num_rows * num_columns)
        .map(|_| match rng.random_range(0..4) {
            0 => -1,
            1 | 2 => 0,
            _ => 1,
        })
        .collect();
    TernaryMatrix::from_dense(num_rows, num_columns, &dense)
}

fn check_agreement(matrix: &TernaryMatrix) {
    let expected = brute_force_violator(matrix).unwrap().is_none();
    let result = test_tu(matrix, false, None, None).unwrap();
    assert_eq!(
        result.is_tu(),
        expected,
        "disagreement on matrix\n{matrix}"
    );
    if let TuResult::No { violator } = result {
        let determinant = submatrix_determinant(matrix, &violator).unwrap();
        assert!(
            determinant.abs() >= 2,
            "violator of matrix\n{matrix}\nhas determinant {determinant}"
        );
    }
}

#[test]
fn agreement_on_seeded_random_matrices_up_to_four() {
    let mut rng = StdRng::seed_from_u64(20260801);
    for _ in 0..120 {
        let num_rows = rng.random_range(1..=4);
        let num_columns = rng.random_range(1..=4);
        check_agreement(&random_ternary(&mut rng, num_rows, num_columns));
    }
}

#[test]
fn agreement_on_seeded_random_five_by_five() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..40 {
        check_agreement(&random_ternary(&mut rng, 5, 5));
    }
}

#[test]
fn agreement_on_dense_sign_patterns() {
    // All sign patterns of the dense 3x3 support.
    for mask in 0u32..(1 << 9) {
        let dense: Vec<i8> = (0..9)
            .map(|bit| if mask & (1 << bit) != 0 { -1 } else { 1 })
            .collect();
        check_agreement(&TernaryMatrix::from_dense(3, 3, &dense));
    }
}

#[test]
fn total_unimodularity_is_invariant_under_permutations() {
    use itertools::Itertools;
    let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
    for rows in (0..3usize).permutations(3) {
        for columns in (0..3usize).permutations(3) {
            let permuted = matrix.permute(&rows, &columns).unwrap();
            assert!(test_tu(&permuted, false, None, None).unwrap().is_tu());
        }
    }
}

#[test]
fn four_by_four_minimal_violator_is_the_whole_matrix() {
    // Every proper submatrix is totally unimodular but the determinant is
    // -2: the violator must be the full matrix.
    let matrix = TernaryMatrix::from_dense(
        4,
        4,
        &[
            1, 1, 0, 0, //
            0, 1, 1, 0, //
            0, 0, 1, 1, //
            1, 0, 0, -1,
        ],
    );
    assert_eq!(
        submatrix_determinant(&matrix, &unimod_common::Submatrix::full(4, 4)).unwrap(),
        -2
    );
    let TuResult::No { violator } = test_tu(&matrix, false, None, None).unwrap() else {
        panic!("determinant -2 is not totally unimodular");
    };
    let determinant = submatrix_determinant(&matrix, &violator).unwrap();
    assert!(determinant.abs() >= 2);
    assert_eq!(violator.rows.len(), 4);
    assert_eq!(violator.columns.len(), 4);
}
