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

//! Shortest-path search in the bipartite graph of a matrix whose vertices
//! are the rows and columns and whose edges are the nonzeros.

use crate::element::{self, Element};
use crate::matrix::TernaryMatrix;

/// Result of a successful [`shortest_path`] search.
#[derive(Debug, Clone)]
pub struct BipartitePath {
    pub source: Element,
    pub target: Element,
    /// Predecessor of each row on the BFS forest (invalid if unreached).
    pub rows_predecessor: Vec<Element>,
    /// Predecessor of each column on the BFS forest (invalid if unreached).
    pub columns_predecessor: Vec<Element>,
    /// Signed sum of the matrix entries along the discovered path.
    pub sum: i64,
}

impl BipartitePath {
    /// The path from target back to source, as elements.
    pub fn trace(&self) -> Vec<Element> {
        let mut path = vec![self.target];
        let mut current = self.target;
        while current != self.source {
            current = if current.is_row() {
                self.rows_predecessor[current.row()]
            } else {
                self.columns_predecessor[current.column()]
            };
            path.push(current);
        }
        path
    }
}

/// Searches for a shortest path from any line of group `g` to any line of a
/// group `> g`, for ascending `g >= 1`. Lines with a negative group are
/// disabled, lines with group 0 are interior. Enumeration is by ascending
/// index with rows before columns, so repeated runs on identical inputs
/// yield identical paths.
pub fn shortest_path(
    matrix: &TernaryMatrix,
    transpose: &TernaryMatrix,
    rows_group: &[i32],
    columns_group: &[i32],
) -> Option<BipartitePath> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    debug_assert_eq!(rows_group.len(), num_rows);
    debug_assert_eq!(columns_group.len(), num_columns);

    let mut rows_predecessor = vec![element::INVALID; num_rows];
    let mut columns_predecessor = vec![element::INVALID; num_columns];
    let mut rows_predecessor_value = vec![0i8; num_rows];
    let mut columns_predecessor_value = vec![0i8; num_columns];

    let mut path_target = element::INVALID;
    let mut connected = false;

    let mut source_group = 1;
    while !connected {
        // status: -1 disabled, 0 unknown, 1 queued or processed
        let mut rows_status = vec![0i8; num_rows];
        let mut columns_status = vec![0i8; num_columns];
        let mut queue: Vec<Element> = Vec::with_capacity(num_rows + num_columns);

        for row in 0..num_rows {
            if rows_group[row] == source_group {
                queue.push(Element::from_row(row));
                rows_status[row] = 1;
                rows_predecessor[row] = element::INVALID;
            } else if rows_group[row] < 0 {
                rows_status[row] = -1;
            }
        }
        for column in 0..num_columns {
            if columns_group[column] == source_group {
                queue.push(Element::from_column(column));
                columns_status[column] = 1;
                columns_predecessor[column] = element::INVALID;
            } else if columns_group[column] < 0 {
                columns_status[column] = -1;
            }
        }

        if queue.is_empty() {
            return None;
        }

        let mut first = 0;
        while first < queue.len() {
            let current = queue[first];
            first += 1;

            if current.is_row() {
                let row = current.row();
                for (column, value) in matrix.row_entries(row) {
                    if columns_status[column] != 0 {
                        continue;
                    }
                    columns_predecessor[column] = current;
                    columns_predecessor_value[column] = value;
                    if columns_group[column] > source_group {
                        path_target = Element::from_column(column);
                        connected = true;
                        break;
                    }
                    columns_status[column] = 1;
                    queue.push(Element::from_column(column));
                }
            } else {
                let column = current.column();
                for (row, value) in transpose.row_entries(column) {
                    if rows_status[row] != 0 {
                        continue;
                    }
                    rows_predecessor[row] = current;
                    rows_predecessor_value[row] = value;
                    if rows_group[row] > source_group {
                        path_target = Element::from_row(row);
                        connected = true;
                        break;
                    }
                    rows_status[row] = 1;
                    queue.push(Element::from_row(row));
                }
            }
            if connected {
                break;
            }
        }
        source_group += 1;
    }

    // Walk backwards to find the source and the signed entry sum.
    let mut current = path_target;
    let mut sum: i64 = 0;
    loop {
        let (predecessor, value) = if current.is_row() {
            let row = current.row();
            (rows_predecessor[row], rows_predecessor_value[row])
        } else {
            let column = current.column();
            (columns_predecessor[column], columns_predecessor_value[column])
        };
        if !predecessor.is_valid() {
            break;
        }
        sum += value as i64;
        current = predecessor;
    }

    Some(BipartitePath {
        source: current,
        target: path_target,
        rows_predecessor,
        columns_predecessor,
        sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_shortest_path_between_groups() {
        // r1 - c1 - r2 - c2 chain:
        // 1  0
        // 1  1
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 0, 1, 1]);
        let transpose = matrix.transpose();
        let path = shortest_path(&matrix, &transpose, &[1, 0], &[0, 2]).unwrap();
        assert_eq!(path.source, Element::from_row(0));
        assert_eq!(path.target, Element::from_column(1));
        assert_eq!(path.sum, 3);
        assert_eq!(path.trace().len(), 4);
    }

    #[test]
    fn respects_disabled_lines() {
        // The only route runs through row 2, which is disabled.
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 0, 1, 1]);
        let transpose = matrix.transpose();
        assert!(shortest_path(&matrix, &transpose, &[1, -1], &[0, 2]).is_none());
    }

    #[test]
    fn signed_sum_accumulates_entry_signs() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[-1, 0, 1, -1]);
        let transpose = matrix.transpose();
        let path = shortest_path(&matrix, &transpose, &[1, 0], &[0, 2]).unwrap();
        assert_eq!(path.sum, -1);
    }
}
