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

use itertools::Itertools;
use sha2::{Digest, Sha256};
use unimod_common::TernaryMatrix;

fn fingerprint(matrix: &TernaryMatrix) -> String {
    let mut hasher = Sha256::new();
    let dense: Vec<u8> = matrix.to_dense().iter().map(|&v| (v + 1) as u8).collect();
    hasher.update([matrix.num_rows() as u8, matrix.num_columns() as u8]);
    hasher.update(&dense);
    format!("{:x}", hasher.finalize())
}

#[test]
fn support_commutes_with_every_permutation() {
    let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, 1, -1, 0, 1]);
    for row_map in (0..3usize).permutations(3) {
        for column_map in (0..3usize).permutations(3) {
            let lhs = matrix.permute(&row_map, &column_map).unwrap().support();
            let rhs = matrix.support().permute(&row_map, &column_map).unwrap();
            assert_eq!(lhs, rhs);
        }
    }
}

#[test]
fn fingerprints_are_stable_across_derivations() {
    let matrix = TernaryMatrix::from_dense(
        5,
        5,
        &[
            1, 1, 0, 0, 1, //
            1, 1, 1, 0, 0, //
            0, 1, 1, 1, 0, //
            0, 0, 1, 1, 1, //
            1, 0, 0, 1, 1,
        ],
    );
    assert_eq!(fingerprint(&matrix), fingerprint(&matrix.transpose().transpose()));
    let identity: Vec<usize> = (0..5).collect();
    assert_eq!(
        fingerprint(&matrix),
        fingerprint(&matrix.permute(&identity, &identity).unwrap())
    );
    // The circulant is symmetric only up to reversal, not under transpose.
    assert_ne!(fingerprint(&matrix), fingerprint(&matrix.transpose().binary_pivot(0, 0).unwrap()));
}
