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

//! Camion signing: deciding whether the signs of a ternary matrix are
//! consistent with total unimodularity of its support, and lifting a binary
//! graph realization to a network by orienting its arcs.
//!
//! A chordless cycle submatrix (two nonzeros per row and column, no further
//! nonzeros) has determinant 0 or ±2, and the determinant vanishes exactly
//! when the entry sum is divisible by four. The check therefore walks the
//! bipartite graph of the matrix row by row and verifies the mod-4 condition
//! on a spanning set of chordless cycles; any failure yields the cycle
//! submatrix as a violator.

use log::{debug, trace};
use unimod_common::{Element, Submatrix, TernaryMatrix};

use crate::realize::Realization;

#[derive(Debug, Clone)]
struct BfsState {
    predecessor: Element,
    last_support: usize,
    sum: i64,
}

/// Checks whether the matrix is Camion-signed: every chordless cycle of its
/// bipartite graph has entry sum divisible by four. On failure the violating
/// cycle submatrix (with determinant ±2) is returned.
pub fn camion_signed_check(matrix: &TernaryMatrix) -> Result<(), Submatrix> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    let transpose = matrix.transpose();

    for row in 1..num_rows {
        let support = matrix.row_columns(row);
        if support.len() < 2 {
            continue;
        }
        let mut is_support = vec![false; num_columns];
        for &column in support {
            is_support[column] = true;
        }

        // BFS over the bipartite graph of the preceding rows. For every
        // vertex we track the last support column on its tree path and the
        // entry sum accumulated since then; closing through the current row
        // at the next support column yields a chordless cycle.
        let mut column_state: Vec<Option<BfsState>> = vec![None; num_columns];
        let mut row_state: Vec<Option<BfsState>> = vec![None; row];

        for &start in support {
            if column_state[start].is_some() {
                continue;
            }
            column_state[start] = Some(BfsState {
                predecessor: Element(0),
                last_support: start,
                sum: 0,
            });
            let mut queue: Vec<Element> = vec![Element::from_column(start)];
            let mut first = 0;
            while first < queue.len() {
                let current = queue[first];
                first += 1;
                if current.is_column() {
                    let column = current.column();
                    let state = column_state[column].clone().expect("queued columns have state");
                    for (r, value) in transpose.row_entries(column) {
                        if r >= row || row_state[r].is_some() {
                            continue;
                        }
                        row_state[r] = Some(BfsState {
                            predecessor: current,
                            last_support: state.last_support,
                            sum: state.sum + value as i64,
                        });
                        queue.push(Element::from_row(r));
                    }
                } else {
                    let r = current.row();
                    let state = row_state[r].clone().expect("queued rows have state");
                    for (column, value) in matrix.row_entries(r) {
                        if column_state[column].is_some() {
                            continue;
                        }
                        if is_support[column] {
                            let cycle_sum = state.sum
                                + value as i64
                                + matrix.get(row, state.last_support) as i64
                                + matrix.get(row, column) as i64;
                            if cycle_sum.rem_euclid(4) != 0 {
                                debug!(
                                    "camion check fails closing r{} between c{} and c{}",
                                    row + 1,
                                    state.last_support + 1,
                                    column + 1
                                );
                                return Err(violating_cycle(
                                    row,
                                    column,
                                    state.last_support,
                                    current,
                                    &row_state,
                                    &column_state,
                                ));
                            }
                            column_state[column] = Some(BfsState {
                                predecessor: current,
                                last_support: column,
                                sum: 0,
                            });
                        } else {
                            column_state[column] = Some(BfsState {
                                predecessor: current,
                                last_support: state.last_support,
                                sum: state.sum + value as i64,
                            });
                        }
                        queue.push(Element::from_column(column));
                    }
                }
            }
        }
    }
    trace!("matrix of size {num_rows}x{num_columns} is camion-signed");
    Ok(())
}

/// Collects the cycle submatrix closing through `row` between the support
/// columns `last_support` and `column`, tracing predecessors from the row
/// `reached_from`.
fn violating_cycle(
    row: usize,
    column: usize,
    last_support: usize,
    reached_from: Element,
    row_state: &[Option<BfsState>],
    column_state: &[Option<BfsState>],
) -> Submatrix {
    let mut rows = vec![row];
    let mut columns = vec![column];
    let mut current = reached_from;
    loop {
        if current.is_row() {
            let r = current.row();
            rows.push(r);
            current = row_state[r].as_ref().expect("path rows have state").predecessor;
        } else {
            let c = current.column();
            columns.push(c);
            if c == last_support {
                break;
            }
            current = column_state[c].as_ref().expect("path columns have state").predecessor;
        }
    }
    Submatrix::new(rows, columns)
}

/// Given a ternary matrix whose support is realized by `realization`,
/// decides whether the arcs of the graph can be oriented so that the signed
/// fundamental matrix equals the input, and returns the per-edge reversal
/// flags (indexed by edge id). On failure a chordless cycle submatrix with
/// determinant ±2 is returned.
pub fn orient_network(matrix: &TernaryMatrix, realization: &Realization) -> Result<Vec<bool>, Submatrix> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    let structure = realization.forest_structure();

    // Parity b(r, c) of each nonzero: +1 requires the sign variables of the
    // row and the column to agree. With all sign variables at +1 the
    // realized entry of row r in column c is +1 on the u-side of the
    // coforest edge and -1 on the v-side, so b = entry * side.
    let mut parity = vec![vec![0i8; num_columns]; num_rows];
    for column in 0..num_columns {
        for (row, u_side) in realization.fundamental_cycle(&structure, column) {
            let entry = matrix.get(row, column);
            debug_assert!(entry != 0, "support must match the realization");
            parity[row][column] = if u_side { entry } else { -entry };
        }
    }

    // Two-coloring of the bipartite constraint graph.
    let mut row_sign = vec![0i8; num_rows];
    let mut column_sign = vec![0i8; num_columns];
    let mut row_predecessor = vec![Element(0); num_rows];
    let mut column_predecessor = vec![Element(0); num_columns];

    for start in 0..num_rows {
        if row_sign[start] != 0 || matrix.row_columns(start).is_empty() {
            continue;
        }
        row_sign[start] = 1;
        let mut queue = vec![Element::from_row(start)];
        let mut first = 0;
        while first < queue.len() {
            let current = queue[first];
            first += 1;
            if current.is_row() {
                let row = current.row();
                for (column, _) in matrix.row_entries(row) {
                    if parity[row][column] == 0 {
                        continue;
                    }
                    let required = row_sign[row] * parity[row][column];
                    if column_sign[column] == 0 {
                        column_sign[column] = required;
                        column_predecessor[column] = current;
                        queue.push(Element::from_column(column));
                    } else if column_sign[column] != required {
                        return Err(orientation_conflict(
                            matrix,
                            &parity,
                            row,
                            column,
                            &row_predecessor,
                            &column_predecessor,
                        ));
                    }
                }
            } else {
                let column = current.column();
                for row in 0..num_rows {
                    if parity[row][column] == 0 {
                        continue;
                    }
                    let required = column_sign[column] * parity[row][column];
                    if row_sign[row] == 0 {
                        row_sign[row] = required;
                        row_predecessor[row] = current;
                        queue.push(Element::from_row(row));
                    } else if row_sign[row] != required {
                        return Err(orientation_conflict(
                            matrix,
                            &parity,
                            row,
                            column,
                            &row_predecessor,
                            &column_predecessor,
                        ));
                    }
                }
            }
        }
    }

    // Translate the sign variables into arc reversal flags. Sign +1 orients
    // a forest edge from parent to child and keeps a coforest edge's stored
    // direction.
    let mut reversed = vec![false; realization.graph.edge_capacity()];
    for row in 0..num_rows {
        let edge = realization.forest_edges[row];
        let u = realization.graph.edge_u(edge);
        let v = realization.graph.edge_v(edge);
        let child = if structure.parent_edge[v] == edge { v } else { u };
        let parent = if child == v { u } else { v };
        let desired_head = if row_sign[row] >= 0 { child } else { parent };
        reversed[edge] = desired_head != v;
    }
    for column in 0..num_columns {
        let edge = realization.coforest_edges[column];
        reversed[edge] = column_sign[column] < 0;
    }
    Ok(reversed)
}

/// Builds the conflict cycle from the coloring BFS and shrinks it along
/// chords until it is chordless and still sign-violating.
fn orientation_conflict(
    matrix: &TernaryMatrix,
    parity: &[Vec<i8>],
    row: usize,
    column: usize,
    row_predecessor: &[Element],
    column_predecessor: &[Element],
) -> Submatrix {
    let trace_to_root = |from: Element| -> Vec<Element> {
        let mut path = vec![from];
        let mut current = from;
        loop {
            current = if current.is_row() {
                row_predecessor[current.row()]
            } else {
                column_predecessor[current.column()]
            };
            if !current.is_valid() {
                break;
            }
            path.push(current);
        }
        path
    };
    let mut row_path = trace_to_root(Element::from_row(row));
    let mut column_path = trace_to_root(Element::from_column(column));

    // Drop the shared tail down to the meeting vertex.
    while row_path.len() >= 2
        && column_path.len() >= 2
        && row_path[row_path.len() - 1] == column_path[column_path.len() - 1]
        && row_path[row_path.len() - 2] == column_path[column_path.len() - 2]
    {
        row_path.pop();
        column_path.pop();
    }
    debug_assert_eq!(row_path.last(), column_path.last());
    column_path.pop();
    column_path.reverse();

    // Alternating vertex sequence: row ... meet ... column, closed by the
    // conflicting entry.
    let mut cycle = row_path;
    cycle.extend(column_path);

    let cycle = shrink_to_violating_cycle(matrix, parity, cycle);

    let mut rows = Vec::new();
    let mut columns = Vec::new();
    for element in cycle {
        if element.is_row() {
            rows.push(element.row());
        } else {
            columns.push(element.column());
        }
    }
    Submatrix::new(rows, columns)
}

/// Repeatedly splits the cycle along chords, keeping the side whose parity
/// product is -1. Terminates with a chordless cycle whose submatrix has
/// determinant ±2.
fn shrink_to_violating_cycle(
    matrix: &TernaryMatrix,
    parity: &[Vec<i8>],
    mut cycle: Vec<Element>,
) -> Vec<Element> {
    let entry_parity = |a: Element, b: Element| -> i8 {
        let (row, column) = if a.is_row() {
            (a.row(), b.column())
        } else {
            (b.row(), a.column())
        };
        if matrix.get(row, column) == 0 {
            0
        } else {
            parity[row][column]
        }
    };
    let product = |vertices: &[Element]| -> i8 {
        let mut product = 1i8;
        for index in 0..vertices.len() {
            let next = (index + 1) % vertices.len();
            product *= entry_parity(vertices[index], vertices[next]);
        }
        product
    };
    debug_assert_eq!(product(&cycle), -1);

    'outer: loop {
        let length = cycle.len();
        for i in 0..length {
            for j in (i + 2)..length {
                if i == 0 && j == length - 1 {
                    continue; // adjacent around the wrap
                }
                if cycle[i].is_row() == cycle[j].is_row() {
                    continue;
                }
                if entry_parity(cycle[i], cycle[j]) == 0 {
                    continue;
                }
                // Chord found: exactly one of the two sub-cycles keeps the
                // violating parity.
                let inner: Vec<Element> = cycle[i..=j].to_vec();
                let mut outer: Vec<Element> = cycle[j..].to_vec();
                outer.extend_from_slice(&cycle[..=i]);
                cycle = if product(&inner) == -1 { inner } else { outer };
                continue 'outer;
            }
        }
        return cycle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn triangle_realization() -> Realization {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        let r0 = graph.add_edge(a, b);
        let r1 = graph.add_edge(b, c);
        let c0 = graph.add_edge(a, c);
        Realization {
            graph,
            forest_edges: vec![r0, r1],
            coforest_edges: vec![c0],
        }
    }

    /// Recomputes the signed fundamental matrix of an oriented realization.
    fn signed_fundamental(
        realization: &Realization,
        reversed: &[bool],
        num_rows: usize,
        num_columns: usize,
    ) -> TernaryMatrix {
        let structure = realization.forest_structure();
        let mut triplets = Vec::new();
        for column in 0..num_columns {
            let cotree_edge = realization.coforest_edges[column];
            for (row, u_side) in realization.fundamental_cycle(&structure, column) {
                // Walking the cycle along the coforest arc, the tree path on
                // the u-side runs parent-to-child. The entry is +1 when the
                // oriented tree arc agrees with the walking direction.
                let edge = realization.forest_edges[row];
                let u = realization.graph.edge_u(edge);
                let v = realization.graph.edge_v(edge);
                let child = if structure.parent_edge[v] == edge { v } else { u };
                let oriented_head = if reversed[edge] { u } else { v };
                let mut entry: i8 = if (oriented_head == child) == u_side { 1 } else { -1 };
                if reversed[cotree_edge] {
                    entry = -entry;
                }
                triplets.push((row, column, entry));
            }
        }
        TernaryMatrix::from_triplets(num_rows, num_columns, &triplets).unwrap()
    }

    #[test]
    fn camion_accepts_network_signs() {
        let matrix = TernaryMatrix::from_dense(2, 1, &[-1, -1]);
        assert!(camion_signed_check(&matrix).is_ok());
        let wheel = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
        assert!(camion_signed_check(&wheel).is_ok());
    }

    #[test]
    fn camion_rejects_all_ones_triangle_cycle() {
        // The 3x3 cycle matrix with all ones has determinant 2.
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 0, 1]);
        let violator = camion_signed_check(&matrix).unwrap_err();
        assert_eq!(violator.rows.len(), violator.columns.len());
        assert!(violator.rows.len() >= 2);
    }

    #[test]
    fn camion_rejects_two_by_two_with_determinant_two() {
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 1, 1, -1]);
        let violator = camion_signed_check(&matrix).unwrap_err();
        assert_eq!(violator.rows.len(), 2);
        assert_eq!(violator.columns.len(), 2);
    }

    #[test]
    fn camion_accepts_triangular_matrices() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 0, 0, 0, 1]);
        assert!(camion_signed_check(&matrix).is_ok());
    }

    #[test]
    fn orient_triangle_consistent() {
        let realization = triangle_realization();
        let matrix = TernaryMatrix::from_dense(2, 1, &[-1, -1]);
        let reversed = orient_network(&matrix, &realization).unwrap();
        assert_eq!(signed_fundamental(&realization, &reversed, 2, 1), matrix);
    }

    #[test]
    fn orient_triangle_with_sign_flip() {
        let realization = triangle_realization();
        let matrix = TernaryMatrix::from_dense(2, 1, &[1, -1]);
        let reversed = orient_network(&matrix, &realization).unwrap();
        assert_eq!(signed_fundamental(&realization, &reversed, 2, 1), matrix);
    }

    #[test]
    fn orient_detects_sign_conflicts() {
        // Two parallel coforest edges closing the same path with
        // incompatible signs: the resulting 2x2 has determinant ±2.
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        let r0 = graph.add_edge(a, b);
        let r1 = graph.add_edge(b, c);
        let c0 = graph.add_edge(a, c);
        let c1 = graph.add_edge(a, c);
        let realization = Realization {
            graph,
            forest_edges: vec![r0, r1],
            coforest_edges: vec![c0, c1],
        };
        let matrix = TernaryMatrix::from_dense(2, 2, &[1, 1, 1, -1]);
        let violator = orient_network(&matrix, &realization).unwrap_err();
        assert_eq!(violator.rows.len(), 2);
        assert_eq!(violator.columns.len(), 2);
    }
}
