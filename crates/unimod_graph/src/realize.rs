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

//! Graph realizations of binary matrices and the direct realization search
//! for small matrices.

use log::trace;
use unimod_common::TernaryMatrix;

use crate::graph::{Graph, NONE};

/// A graph together with a spanning forest such that the rows of a matrix
/// are the forest edges, the columns are the coforest edges, and each
/// column's support is the fundamental cycle of its coforest edge.
#[derive(Debug, Clone)]
pub struct Realization {
    pub graph: Graph,
    /// Forest edge of each row.
    pub forest_edges: Vec<usize>,
    /// Coforest edge of each column.
    pub coforest_edges: Vec<usize>,
}

/// Rooted view of the spanning forest of a realization.
pub struct ForestStructure {
    pub parent_node: Vec<usize>,
    pub parent_edge: Vec<usize>,
    pub depth: Vec<usize>,
}

impl Realization {
    /// Roots every forest component and records parents and depths.
    pub fn forest_structure(&self) -> ForestStructure {
        let capacity = self.graph.node_capacity();
        let mut parent_node = vec![NONE; capacity];
        let mut parent_edge = vec![NONE; capacity];
        let mut depth = vec![0usize; capacity];
        let mut visited = vec![false; capacity];

        let mut is_forest_edge = vec![false; self.graph.edge_capacity()];
        for &edge in &self.forest_edges {
            is_forest_edge[edge] = true;
        }

        let mut roots: Vec<usize> = self.graph.nodes().collect();
        roots.sort_unstable();
        for root in roots {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut queue = vec![root];
            let mut first = 0;
            while first < queue.len() {
                let node = queue[first];
                first += 1;
                for arc in self.graph.incident_arcs(node) {
                    let edge = arc / 2;
                    if !is_forest_edge[edge] {
                        continue;
                    }
                    let other = self.graph.arc_target(arc);
                    if !visited[other] {
                        visited[other] = true;
                        parent_node[other] = node;
                        parent_edge[other] = edge;
                        depth[other] = depth[node] + 1;
                        queue.push(other);
                    }
                }
            }
        }
        ForestStructure {
            parent_node,
            parent_edge,
            depth,
        }
    }

    /// Tree edges on the fundamental cycle of the coforest edge of `column`,
    /// as matrix rows, together with a flag telling whether the row lies on
    /// the side of the edge's `u` endpoint.
    pub fn fundamental_cycle(&self, structure: &ForestStructure, column: usize) -> Vec<(usize, bool)> {
        let edge = self.coforest_edges[column];
        let mut row_of_edge = vec![usize::MAX; self.graph.edge_capacity()];
        for (row, &forest_edge) in self.forest_edges.iter().enumerate() {
            row_of_edge[forest_edge] = row;
        }

        let mut u = self.graph.edge_u(edge);
        let mut v = self.graph.edge_v(edge);
        let mut u_side = Vec::new();
        let mut v_side = Vec::new();
        while u != v {
            if structure.depth[u] >= structure.depth[v] {
                u_side.push((row_of_edge[structure.parent_edge[u]], true));
                u = structure.parent_node[u];
            } else {
                v_side.push((row_of_edge[structure.parent_edge[v]], false));
                v = structure.parent_node[v];
            }
        }
        u_side.extend(v_side);
        u_side
    }

    /// The binary fundamental matrix realized by this graph and forest.
    pub fn fundamental_matrix(&self, num_rows: usize, num_columns: usize) -> TernaryMatrix {
        let structure = self.forest_structure();
        let mut triplets = Vec::new();
        for column in 0..num_columns {
            for (row, _) in self.fundamental_cycle(&structure, column) {
                triplets.push((row, column, 1i8));
            }
        }
        TernaryMatrix::from_triplets(num_rows, num_columns, &triplets)
            .expect("fundamental cycles have no duplicate rows")
    }
}

/// Direct realization search for a binary matrix with at most three rows or
/// at most three columns. Returns the realization or `None` when the matrix
/// is not graphic. Duplicate and zero lines are stripped first, so the
/// backtracking runs on at most seven distinct rows.
pub fn realize_small(matrix: &TernaryMatrix) -> Option<Realization> {
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    debug_assert!(num_rows <= 3 || num_columns <= 3);

    // Deduplicate rows by support and drop zero rows.
    let mut kept_rows: Vec<usize> = Vec::new();
    let mut row_duplicate_of = vec![usize::MAX; num_rows];
    for row in 0..num_rows {
        if matrix.row_columns(row).is_empty() {
            continue;
        }
        let mut found = false;
        for &kept in &kept_rows {
            if matrix.row_columns(kept) == matrix.row_columns(row) {
                row_duplicate_of[row] = kept;
                found = true;
                break;
            }
        }
        if !found {
            kept_rows.push(row);
        }
    }

    // Deduplicate columns by support (restricted to the kept rows) and drop
    // zero columns.
    let transpose = matrix.transpose();
    let support_of_column = |column: usize| -> Vec<usize> {
        let mut support: Vec<usize> = transpose
            .row_columns(column)
            .iter()
            .copied()
            .filter(|&row| row_duplicate_of[row] == usize::MAX && !matrix.row_columns(row).is_empty())
            .collect();
        support.sort_unstable();
        support
    };
    let mut kept_columns: Vec<usize> = Vec::new();
    let mut kept_column_supports: Vec<Vec<usize>> = Vec::new();
    let mut column_duplicate_of = vec![usize::MAX; num_columns];
    for column in 0..num_columns {
        let support = support_of_column(column);
        if support.is_empty() {
            continue;
        }
        let mut found = false;
        for (index, existing) in kept_column_supports.iter().enumerate() {
            if *existing == support {
                column_duplicate_of[column] = kept_columns[index];
                found = true;
                break;
            }
        }
        if !found {
            kept_columns.push(column);
            kept_column_supports.push(support);
        }
    }

    let t = kept_rows.len();
    assert!(t <= 10, "direct realization is limited to small matrices");
    let mut position_of_row = vec![usize::MAX; num_rows];
    for (position, &row) in kept_rows.iter().enumerate() {
        position_of_row[row] = position;
    }
    let column_supports: Vec<Vec<usize>> = kept_column_supports
        .iter()
        .map(|support| support.iter().map(|&row| position_of_row[row]).collect())
        .collect();

    trace!(
        "direct realization of a {}x{} matrix reduced to {} rows and {} columns",
        num_rows,
        num_columns,
        t,
        kept_columns.len()
    );

    // Backtracking over forests on the deduplicated rows.
    let mut placements: Vec<(usize, usize)> = Vec::with_capacity(t);
    if !place_edges(t, &column_supports, &mut placements, 0) {
        return None;
    }

    // Build the graph from the found forest.
    let num_forest_nodes = placements
        .iter()
        .map(|&(u, v)| u.max(v) + 1)
        .max()
        .unwrap_or(1);
    let mut graph = Graph::with_capacity(num_forest_nodes + 2, num_rows + num_columns + 2);
    let node_ids: Vec<usize> = (0..num_forest_nodes).map(|_| graph.add_node()).collect();

    let mut forest_edges = vec![usize::MAX; num_rows];
    for (position, &(u, v)) in placements.iter().enumerate() {
        forest_edges[kept_rows[position]] = graph.add_edge(node_ids[u], node_ids[v]);
    }

    // Duplicate rows subdivide the representative's edge.
    for row in 0..num_rows {
        let original = row_duplicate_of[row];
        if original != usize::MAX {
            let edge = forest_edges[original];
            let x = graph.edge_u(edge);
            let y = graph.edge_v(edge);
            graph.delete_edge(edge);
            let middle = graph.add_node();
            let reused = graph.add_edge(x, middle);
            debug_assert_eq!(reused, edge);
            forest_edges[original] = reused;
            forest_edges[row] = graph.add_edge(middle, y);
        }
    }
    // Zero rows become bridges hanging off a fresh node.
    for row in 0..num_rows {
        if forest_edges[row] == usize::MAX {
            let anchor = node_ids.first().copied().unwrap_or_else(|| graph.add_node());
            let leaf = graph.add_node();
            forest_edges[row] = graph.add_edge(anchor, leaf);
        }
    }

    // Coforest edges close the column paths. After the subdivisions above a
    // column's path consists of the full original support, duplicates
    // included.
    let mut coforest_edges = vec![usize::MAX; num_columns];
    for &column in &kept_columns {
        let rows: Vec<usize> = transpose.row_columns(column).to_vec();
        let (a, b) = path_endpoints(&graph, &forest_edges, &rows);
        coforest_edges[column] = graph.add_edge(a, b);
    }
    for column in 0..num_columns {
        let original = column_duplicate_of[column];
        if original != usize::MAX {
            let edge = coforest_edges[original];
            coforest_edges[column] = graph.add_edge(graph.edge_u(edge), graph.edge_v(edge));
        }
    }
    // Zero columns become loops.
    for column in 0..num_columns {
        if coforest_edges[column] == usize::MAX {
            let anchor = graph.nodes().next().expect("graph has a node");
            coforest_edges[column] = graph.add_edge(anchor, anchor);
        }
    }

    let realization = Realization {
        graph,
        forest_edges,
        coforest_edges,
    };
    debug_assert_eq!(
        realization.fundamental_matrix(num_rows, num_columns),
        matrix.support()
    );
    Some(realization)
}

/// Recursive placement of forest edges; node ids are dense from 0. Columns
/// whose support is fully placed must already form a path.
fn place_edges(
    t: usize,
    column_supports: &[Vec<usize>],
    placements: &mut Vec<(usize, usize)>,
    num_nodes: usize,
) -> bool {
    if placements.len() == t {
        return true;
    }
    let mut candidates: Vec<(usize, usize, usize)> = Vec::new();
    // Two fresh nodes.
    candidates.push((num_nodes, num_nodes + 1, num_nodes + 2));
    // One existing endpoint and one fresh node.
    for node in 0..num_nodes {
        candidates.push((node, num_nodes, num_nodes + 1));
    }
    // Two existing endpoints in different components.
    for u in 0..num_nodes {
        for v in (u + 1)..num_nodes {
            if !same_component(placements, u, v) {
                candidates.push((u, v, num_nodes));
            }
        }
    }

    for (u, v, next_num_nodes) in candidates {
        placements.push((u, v));
        if columns_still_consistent(column_supports, placements) {
            if place_edges(t, column_supports, placements, next_num_nodes) {
                return true;
            }
        }
        placements.pop();
    }
    false
}

fn same_component(placements: &[(usize, usize)], u: usize, v: usize) -> bool {
    let size = placements.iter().map(|&(a, b)| a.max(b) + 1).max().unwrap_or(0);
    if u >= size || v >= size {
        return false;
    }
    let mut representative: Vec<usize> = (0..size).collect();
    fn find(representative: &mut Vec<usize>, x: usize) -> usize {
        let mut root = x;
        while representative[root] != root {
            root = representative[root];
        }
        representative[x] = root;
        root
    }
    for &(a, b) in placements {
        let ra = find(&mut representative, a);
        let rb = find(&mut representative, b);
        representative[ra] = rb;
    }
    find(&mut representative, u) == find(&mut representative, v)
}

fn columns_still_consistent(column_supports: &[Vec<usize>], placements: &[(usize, usize)]) -> bool {
    let placed = placements.len();
    for support in column_supports {
        if support.iter().any(|&row| row >= placed) {
            continue;
        }
        if !edges_form_path(support, placements) {
            return false;
        }
    }
    true
}

fn edges_form_path(support: &[usize], placements: &[(usize, usize)]) -> bool {
    if support.len() <= 1 {
        return true;
    }
    let mut degree: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    for &row in support {
        let (u, v) = placements[row];
        *degree.entry(u).or_insert(0) += 1;
        *degree.entry(v).or_insert(0) += 1;
    }
    let leaves = degree.values().filter(|&&d| d == 1).count();
    if leaves != 2 || degree.values().any(|&d| d > 2) {
        return false;
    }
    // Degree conditions plus connectivity; check connectivity by walking.
    let mut visited: std::collections::HashSet<usize> = std::collections::HashSet::new();
    let mut stack = vec![support[0]];
    visited.insert(support[0]);
    while let Some(row) = stack.pop() {
        let (u, v) = placements[row];
        for &other in support {
            if !visited.contains(&other) {
                let (x, y) = placements[other];
                if x == u || x == v || y == u || y == v {
                    visited.insert(other);
                    stack.push(other);
                }
            }
        }
    }
    visited.len() == support.len()
}

fn path_endpoints(graph: &Graph, forest_edges: &[usize], rows: &[usize]) -> (usize, usize) {
    if rows.len() == 1 {
        let edge = forest_edges[rows[0]];
        return (graph.edge_u(edge), graph.edge_v(edge));
    }
    let mut degree: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    for &row in rows {
        let edge = forest_edges[row];
        *degree.entry(graph.edge_u(edge)).or_insert(0) += 1;
        *degree.entry(graph.edge_v(edge)).or_insert(0) += 1;
    }
    let mut endpoints = degree
        .iter()
        .filter(|&(_, &d)| d == 1)
        .map(|(&node, _)| node);
    let a = endpoints.next().expect("path has two endpoints");
    let b = endpoints.next().expect("path has two endpoints");
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_w3_is_graphic() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let realization = realize_small(&matrix).unwrap();
        assert_eq!(realization.fundamental_matrix(3, 3), matrix);
        assert_eq!(realization.graph.num_edges(), 6);
        assert_eq!(realization.graph.num_nodes(), 4);
    }

    #[test]
    fn fano_is_not_graphic() {
        // F7: columns {1,2}, {1,3}, {2,3}, {1,2,3} cannot all be paths.
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1]);
        assert!(realize_small(&matrix).is_none());
    }

    #[test]
    fn duplicate_and_zero_lines_are_reattached() {
        // Row 2 duplicates row 0, row 3 is zero, column 3 duplicates
        // column 0 and column 4 is zero.
        let matrix = TernaryMatrix::from_dense(
            4,
            5,
            &[
                1, 1, 0, 1, 0, //
                0, 1, 1, 0, 0, //
                1, 1, 0, 1, 0, //
                0, 0, 0, 0, 0,
            ],
        );
        let realization = realize_small(&matrix).unwrap();
        assert_eq!(realization.fundamental_matrix(4, 5), matrix.support());
    }

    #[test]
    fn single_entry_matrix_is_graphic() {
        let matrix = TernaryMatrix::from_dense(1, 1, &[1]);
        let realization = realize_small(&matrix).unwrap();
        assert_eq!(realization.fundamental_matrix(1, 1), matrix);
    }

    #[test]
    fn two_rows_are_always_graphic() {
        let matrix = TernaryMatrix::from_dense(2, 4, &[1, 0, 1, 1, 0, 1, 1, 1]);
        assert!(realize_small(&matrix).is_some());
    }
}
