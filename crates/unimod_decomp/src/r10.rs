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

//! Recognition of the matroid R10 by pattern matching a 5x5 support against
//! its two standard representations, up to row and column permutations.
//! Sign flips are irrelevant because only the support is compared.

use unimod_common::TernaryMatrix;

/// Circulant representation: every line has three nonzeros.
const R10_CIRCULANT: [[i8; 5]; 5] = [
    [1, 1, 0, 0, 1],
    [1, 1, 1, 0, 0],
    [0, 1, 1, 1, 0],
    [0, 0, 1, 1, 1],
    [1, 0, 0, 1, 1],
];

/// The other standard representation: one full row and column.
const R10_FULL_LINE: [[i8; 5]; 5] = [
    [1, 1, 1, 1, 1],
    [1, 1, 1, 0, 0],
    [1, 0, 1, 1, 0],
    [1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1],
];

/// Whether the support of the matrix is one of the two standard R10
/// representations up to row/column permutation.
pub fn is_r10(matrix: &TernaryMatrix) -> bool {
    if matrix.num_rows() != 5 || matrix.num_columns() != 5 {
        return false;
    }
    let support: Vec<[bool; 5]> = (0..5)
        .map(|row| {
            let mut bits = [false; 5];
            for (column, _) in matrix.row_entries(row) {
                bits[column] = true;
            }
            bits
        })
        .collect();
    matches_pattern(&support, &R10_CIRCULANT) || matches_pattern(&support, &R10_FULL_LINE)
}

fn matches_pattern(support: &[[bool; 5]], pattern: &[[i8; 5]; 5]) -> bool {
    // Quick pruning on sorted row and column sums.
    let mut row_sums: Vec<usize> = support.iter().map(|row| row.iter().filter(|&&b| b).count()).collect();
    let mut pattern_row_sums: Vec<usize> = pattern
        .iter()
        .map(|row| row.iter().filter(|&&v| v != 0).count())
        .collect();
    row_sums.sort_unstable();
    pattern_row_sums.sort_unstable();
    if row_sums != pattern_row_sums {
        return false;
    }

    // Backtracking over the row assignment; the column permutation is then
    // forced to be a bijection between equal incidence columns.
    let mut assignment = [usize::MAX; 5];
    let mut used = [false; 5];
    try_rows(support, pattern, &mut assignment, &mut used, 0)
}

fn try_rows(
    support: &[[bool; 5]],
    pattern: &[[i8; 5]; 5],
    assignment: &mut [usize; 5],
    used: &mut [bool; 5],
    row: usize,
) -> bool {
    if row == 5 {
        return columns_match(support, pattern, assignment);
    }
    let count = support[row].iter().filter(|&&b| b).count();
    for target in 0..5 {
        if used[target] {
            continue;
        }
        if pattern[target].iter().filter(|&&v| v != 0).count() != count {
            continue;
        }
        assignment[row] = target;
        used[target] = true;
        if try_rows(support, pattern, assignment, used, row + 1) {
            return true;
        }
        used[target] = false;
    }
    false
}

fn columns_match(support: &[[bool; 5]], pattern: &[[i8; 5]; 5], assignment: &[usize; 5]) -> bool {
    // Column signature of the candidate, written in pattern row order.
    let mut pattern_columns_used = [false; 5];
    for column in 0..5 {
        let mut signature = [false; 5];
        for row in 0..5 {
            signature[assignment[row]] = support[row][column];
        }
        let mut found = false;
        for pattern_column in 0..5 {
            if pattern_columns_used[pattern_column] {
                continue;
            }
            if (0..5).all(|row| (pattern[row][pattern_column] != 0) == signature[row]) {
                pattern_columns_used[pattern_column] = true;
                found = true;
                break;
            }
        }
        if !found {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pattern(pattern: &[[i8; 5]; 5]) -> TernaryMatrix {
        let dense: Vec<i8> = pattern.iter().flatten().copied().collect();
        TernaryMatrix::from_dense(5, 5, &dense)
    }

    #[test]
    fn standard_representations_match() {
        assert!(is_r10(&from_pattern(&R10_CIRCULANT)));
        assert!(is_r10(&from_pattern(&R10_FULL_LINE)));
    }

    #[test]
    fn permutations_and_signs_match() {
        let matrix = from_pattern(&R10_CIRCULANT);
        let permuted = matrix.permute(&[4, 2, 0, 1, 3], &[1, 3, 0, 4, 2]).unwrap();
        assert!(is_r10(&permuted));
        // Sign flips leave the support untouched.
        let signed: Vec<i8> = permuted
            .to_dense()
            .iter()
            .enumerate()
            .map(|(index, &value)| if index % 3 == 0 { -value } else { value })
            .collect();
        assert!(is_r10(&TernaryMatrix::from_dense(5, 5, &signed)));
    }

    #[test]
    fn other_matrices_do_not_match() {
        // Wrong size.
        assert!(!is_r10(&TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1])));
        // Right size and row sums, but two identical rows: R10 is simple,
        // so no assignment can work.
        let dense: Vec<i8> = [
            [1, 1, 1, 0, 0],
            [1, 1, 1, 0, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 1, 1, 1],
            [1, 0, 0, 1, 1],
        ]
        .iter()
        .flatten()
        .copied()
        .collect();
        assert!(!is_r10(&TernaryMatrix::from_dense(5, 5, &dense)));
    }
}
