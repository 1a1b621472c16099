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

//! Graphicness along a sequence of nested 3-connected minors: the wheel
//! minor seeds a wheel graph, and every growth step is mirrored by one of
//! five local graph surgeries. Since 3-connected graphic matroids have a
//! unique realization, a failing surgery proves non-graphicness of the
//! minor reached.

use log::{debug, trace};
use unimod_common::hashing::{hash_coefficients, project_signed_hash};
use unimod_common::{element, Element, TernaryMatrix};

use unimod_graph::graph::{Graph, NONE};
use unimod_graph::realize::Realization;

use crate::deadline::Deadline;
use crate::error::RecognitionError;

/// Result of testing a sequence: the index of the last minor that is still
/// graphic and, when the whole sequence is graphic, the realization with
/// forest edges per sequence row and coforest edges per sequence column.
#[derive(Debug)]
pub struct SequenceGraphicness {
    pub last_graphic_minor: usize,
    pub realization: Option<Realization>,
}

/// Tests the nested minor sequence for graphicness. `matrix` must display
/// the sequence as consecutive top-left submatrices; for cographicness the
/// caller passes the transpose and swapped sequence arrays.
pub fn sequence_graphicness(
    matrix: &TernaryMatrix,
    transpose: &TernaryMatrix,
    sequence_num_rows: &[usize],
    sequence_num_columns: &[usize],
    deadline: &Deadline,
) -> Result<SequenceGraphicness, RecognitionError> {
    let length = sequence_num_rows.len();
    debug!(
        "testing a sequence of {} nested minors for graphicness",
        length
    );
    assert_eq!(sequence_num_rows[0], sequence_num_columns[0]);

    let mut graph = Graph::with_capacity(matrix.num_rows() + 2, matrix.num_rows() + matrix.num_columns());
    let mut row_edges = vec![NONE; matrix.num_rows()];
    let mut column_edges = vec![NONE; matrix.num_columns()];
    let coefficients = hash_coefficients(matrix.num_rows().max(matrix.num_columns()));
    let mut row_hashes = vec![0i64; matrix.num_rows()];
    let mut column_hashes = vec![0i64; matrix.num_columns()];

    create_wheel(
        &mut graph,
        matrix,
        transpose,
        sequence_num_rows[0],
        &mut row_edges,
        &mut column_edges,
    );
    update_hash_values(
        matrix,
        &mut row_hashes,
        &mut column_hashes,
        &coefficients,
        0,
        sequence_num_rows[0],
        sequence_num_columns[0],
    );

    let mut last_graphic_minor = 0;
    for extension in 1..length {
        deadline.check()?;
        let base_rows = sequence_num_rows[extension - 1];
        let base_columns = sequence_num_columns[extension - 1];
        let new_rows = sequence_num_rows[extension] - base_rows;
        let new_columns = sequence_num_columns[extension] - base_columns;
        trace!(
            "extension {} adds {} rows and {} columns",
            extension,
            new_rows,
            new_columns
        );

        let is_graphic = match (new_rows, new_columns) {
            (1, 1) => {
                let row_parallel = find_parallel(matrix, base_rows, base_rows, base_columns, &row_hashes, &coefficients);
                let column_parallel =
                    find_parallel(transpose, base_columns, base_columns, base_rows, &column_hashes, &coefficients)
                        .transpose();
                add_one_row_one_column(
                    &mut graph,
                    &mut row_edges,
                    &mut column_edges,
                    base_rows,
                    base_columns,
                    row_parallel,
                    column_parallel,
                )
            }
            (2, 1) => {
                let row1_parallel =
                    find_parallel(matrix, base_rows, base_rows, base_columns, &row_hashes, &coefficients);
                let row2_parallel =
                    find_parallel(matrix, base_rows + 1, base_rows, base_columns, &row_hashes, &coefficients);
                add_two_rows_one_column(
                    &mut graph,
                    &mut row_edges,
                    &mut column_edges,
                    base_rows,
                    base_columns,
                    row1_parallel,
                    row2_parallel,
                )
            }
            (1, 2) => {
                let column1_parallel =
                    find_parallel(transpose, base_columns, base_columns, base_rows, &column_hashes, &coefficients)
                        .transpose();
                let column2_parallel = find_parallel(
                    transpose,
                    base_columns + 1,
                    base_columns,
                    base_rows,
                    &column_hashes,
                    &coefficients,
                )
                .transpose();
                add_one_row_two_columns(
                    &mut graph,
                    &mut row_edges,
                    &mut column_edges,
                    base_rows,
                    base_columns,
                    column1_parallel,
                    column2_parallel,
                )
            }
            (0, 1) => {
                let nonzero_rows: Vec<usize> = transpose
                    .row_columns(base_columns)
                    .iter()
                    .copied()
                    .take_while(|&row| row < base_rows)
                    .collect();
                add_one_column(&mut graph, &row_edges, &mut column_edges, base_columns, &nonzero_rows)
            }
            (1, 0) => {
                let nonzero_columns: Vec<usize> = matrix
                    .row_columns(base_rows)
                    .iter()
                    .copied()
                    .take_while(|&column| column < base_columns)
                    .collect();
                add_one_row(
                    &mut graph,
                    &mut row_edges,
                    &column_edges,
                    base_rows,
                    &nonzero_columns,
                )
            }
            _ => {
                return Err(RecognitionError::inconsistent(format!(
                    "sequence step adds {new_rows} rows and {new_columns} columns"
                )))
            }
        };

        if !is_graphic {
            debug!("sequence stops being graphic at minor {extension}");
            return Ok(SequenceGraphicness {
                last_graphic_minor,
                realization: None,
            });
        }
        last_graphic_minor = extension;

        update_hash_values(
            matrix,
            &mut row_hashes,
            &mut column_hashes,
            &coefficients,
            base_rows,
            sequence_num_rows[extension],
            base_columns,
        );
        update_hash_values(
            transpose,
            &mut column_hashes,
            &mut row_hashes,
            &coefficients,
            base_columns,
            sequence_num_columns[extension],
            sequence_num_rows[extension],
        );
    }

    Ok(SequenceGraphicness {
        last_graphic_minor,
        realization: Some(Realization {
            graph,
            forest_edges: row_edges,
            coforest_edges: column_edges,
        }),
    })
}

/// Builds the wheel graph of the first minor. The wheel square is a cycle
/// matrix, possibly with one row and one column holding three nonzeros; the
/// walk below follows the rim and assigns rim and spoke edges accordingly.
fn create_wheel(
    graph: &mut Graph,
    matrix: &TernaryMatrix,
    transpose: &TernaryMatrix,
    wheel_size: usize,
    row_edges: &mut [usize],
    column_edges: &mut [usize],
) {
    let wheel_columns = |row: usize| -> Vec<usize> {
        matrix
            .row_columns(row)
            .iter()
            .copied()
            .take_while(|&column| column < wheel_size)
            .collect()
    };
    let wheel_rows = |column: usize| -> Vec<usize> {
        transpose
            .row_columns(column)
            .iter()
            .copied()
            .take_while(|&row| row < wheel_size)
            .collect()
    };

    let mut row_with_three = NONE;
    for row in 0..wheel_size {
        let count = wheel_columns(row).len();
        debug_assert!(count == 2 || count == 3);
        if count == 3 {
            debug_assert_eq!(row_with_three, NONE);
            row_with_three = row;
        }
    }
    let mut column_with_three = NONE;
    for column in 0..wheel_size {
        let count = wheel_rows(column).len();
        debug_assert!(count == 2 || count == 3);
        if count == 3 {
            debug_assert_eq!(column_with_three, NONE);
            column_with_three = column;
        }
    }
    debug_assert_eq!(row_with_three == NONE, column_with_three == NONE);

    let center_node = graph.add_node();
    let first_rim_node = graph.add_node();
    let mut last_rim_node = first_rim_node;

    let mut last_row = 0usize;
    let mut last_column = wheel_columns(0)[0];
    loop {
        // Next column in the rim walk.
        let candidates = wheel_columns(last_row);
        let next_column = *candidates
            .iter()
            .find(|&&column| column != last_column && (last_row != row_with_three || column != column_with_three))
            .expect("wheel rows have a next column");
        // Next row.
        let candidates = wheel_rows(next_column);
        let next_row = *candidates
            .iter()
            .find(|&&row| row != last_row && (next_column != column_with_three || row != row_with_three))
            .expect("wheel columns have a next row");

        let next_rim_node = if next_row == 0 { first_rim_node } else { graph.add_node() };
        let rim_edge = graph.add_edge(last_rim_node, next_rim_node);
        let spoke_edge = graph.add_edge(center_node, next_rim_node);

        if row_with_three != NONE && last_row != row_with_three && next_row != row_with_three {
            column_edges[last_column] = spoke_edge;
            row_edges[last_row] = rim_edge;
        } else {
            column_edges[last_column] = rim_edge;
            row_edges[last_row] = spoke_edge;
        }

        last_rim_node = next_rim_node;
        last_row = next_row;
        last_column = next_column;
        if next_row == 0 {
            break;
        }
    }
}

/// Finds the prefix element the given line is parallel to: the unique
/// crossing line for unit vectors, an equal earlier major otherwise, or the
/// invalid element.
fn find_parallel(
    matrix: &TernaryMatrix,
    major: usize,
    num_majors: usize,
    num_minors: usize,
    major_hashes: &[i64],
    coefficients: &[i64],
) -> Element {
    let restricted: Vec<usize> = matrix
        .row_columns(major)
        .iter()
        .copied()
        .take_while(|&minor| minor < num_minors)
        .collect();
    debug_assert!(!restricted.is_empty());
    if restricted.len() == 1 {
        return Element::from_column(restricted[0]);
    }
    let mut hash = 0i64;
    for &minor in &restricted {
        hash = project_signed_hash(hash + coefficients[minor]);
    }
    for candidate in 0..num_majors {
        if major_hashes[candidate] != hash {
            continue;
        }
        let candidate_restricted: Vec<usize> = matrix
            .row_columns(candidate)
            .iter()
            .copied()
            .take_while(|&minor| minor < num_minors)
            .collect();
        if candidate_restricted == restricted {
            return Element::from_row(candidate);
        }
    }
    element::INVALID
}

/// Incremental hash bookkeeping: the new majors contribute to both their own
/// hashes and the crossed minors' hashes, restricted to the given prefix.
fn update_hash_values(
    matrix: &TernaryMatrix,
    major_hashes: &mut [i64],
    minor_hashes: &mut [i64],
    coefficients: &[i64],
    major_first: usize,
    major_beyond: usize,
    minor_size: usize,
) {
    for major in major_first..major_beyond {
        for &minor in matrix.row_columns(major) {
            if minor >= minor_size {
                break;
            }
            major_hashes[major] = project_signed_hash(major_hashes[major] + coefficients[minor]);
            minor_hashes[minor] = project_signed_hash(minor_hashes[minor] + coefficients[major]);
        }
    }
}

fn element_edge(element: Element, row_edges: &[usize], column_edges: &[usize]) -> usize {
    if element.is_row() {
        row_edges[element.row()]
    } else {
        column_edges[element.column()]
    }
}

/// Common endpoint of two adjacent edges, together with the two remaining
/// endpoints.
fn edges_adjacent(graph: &Graph, e: usize, f: usize) -> Option<(usize, usize, usize)> {
    let e_nodes = [graph.edge_u(e), graph.edge_v(e)];
    let f_nodes = [graph.edge_u(f), graph.edge_v(f)];
    for i in 0..2 {
        for j in 0..2 {
            if e_nodes[i] == f_nodes[j] {
                return Some((e_nodes[i], e_nodes[1 - i], f_nodes[1 - j]));
            }
        }
    }
    None
}

/// The new column must close a path of forest edges; its edge connects the
/// two leaves of that path.
fn add_one_column(
    graph: &mut Graph,
    row_edges: &[usize],
    column_edges: &mut [usize],
    base_num_columns: usize,
    nonzero_rows: &[usize],
) -> bool {
    let mut degrees: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut leaves = 0isize;
    for &row in nonzero_rows {
        let edge = row_edges[row];
        for node in [graph.edge_u(edge), graph.edge_v(edge)] {
            let degree = degrees.entry(node).or_insert(0);
            *degree += 1;
            if *degree == 1 {
                leaves += 1;
            } else if *degree == 2 {
                leaves -= 1;
            }
        }
    }
    if leaves != 2 {
        return false;
    }
    let mut endpoints = degrees
        .iter()
        .filter(|&(_, &degree)| degree == 1)
        .map(|(&node, _)| node);
    let a = endpoints.next().expect("two leaves exist");
    let b = endpoints.next().expect("two leaves exist");
    column_edges[base_num_columns] = graph.add_edge(a, b);
    true
}

/// The new row subdivides the realization at a node through which all
/// fundamental cycles of its unit columns pass: either the column edges
/// form a star, or a candidate articulation node is split according to a
/// bipartition of the components around it.
fn add_one_row(
    graph: &mut Graph,
    row_edges: &mut [usize],
    column_edges: &[usize],
    base_num_rows: usize,
    nonzero_columns: &[usize],
) -> bool {
    // Star check.
    let mut star_node = NONE;
    let mut star = true;
    if nonzero_columns.len() >= 2 {
        let e0 = column_edges[nonzero_columns[0]];
        let e1 = column_edges[nonzero_columns[1]];
        match edges_adjacent(graph, e0, e1) {
            Some((common, _, _)) => {
                star_node = common;
                for &column in &nonzero_columns[2..] {
                    let edge = column_edges[column];
                    if graph.edge_u(edge) != star_node && graph.edge_v(edge) != star_node {
                        star = false;
                        break;
                    }
                }
                // The first two edges may share more than one candidate for
                // multi-edges; retry with the other common node.
                if !star {
                    let alternates = [graph.edge_u(e0), graph.edge_v(e0)];
                    for alternate in alternates {
                        if alternate == star_node {
                            continue;
                        }
                        if graph.edge_u(e1) != alternate && graph.edge_v(e1) != alternate {
                            continue;
                        }
                        if nonzero_columns[2..].iter().all(|&column| {
                            let edge = column_edges[column];
                            graph.edge_u(edge) == alternate || graph.edge_v(edge) == alternate
                        }) {
                            star_node = alternate;
                            star = true;
                            break;
                        }
                    }
                }
            }
            None => star = false,
        }
    }

    if star && star_node != NONE {
        let new_node = graph.add_node();
        row_edges[base_num_rows] = graph.add_edge(star_node, new_node);
        for &column in nonzero_columns {
            let edge = column_edges[column];
            let mut other = graph.edge_u(edge);
            if other == star_node {
                other = graph.edge_v(edge);
            }
            graph.delete_edge(edge);
            let reused = graph.add_edge(other, new_node);
            debug_assert_eq!(reused, edge);
        }
        return true;
    }

    // Articulation candidates of the graph without the 1-edges.
    let mut disabled = vec![false; graph.edge_capacity()];
    for &column in nonzero_columns {
        disabled[column_edges[column]] = true;
    }
    let mut candidate = articulation_points(graph, &disabled);
    let mut count_candidates = candidate.iter().filter(|&&c| c > 0).count();
    if count_candidates == 0 {
        return false;
    }

    // Each 1-column's fundamental cycle must pass through the candidate.
    let parents = tree_parents(graph, row_edges, base_num_rows);
    for (index, &column) in nonzero_columns.iter().enumerate() {
        let edge = column_edges[column];
        let mut stacks = [Vec::new(), Vec::new()];
        for (side, node) in [graph.edge_u(edge), graph.edge_v(edge)].into_iter().enumerate() {
            let mut current = node;
            while current != NONE {
                stacks[side].push(current);
                current = parents[current];
            }
        }
        while stacks[0].len() >= 2
            && stacks[1].len() >= 2
            && stacks[0][stacks[0].len() - 1] == stacks[1][stacks[1].len() - 1]
            && stacks[0][stacks[0].len() - 2] == stacks[1][stacks[1].len() - 2]
        {
            stacks[0].pop();
            stacks[1].pop();
        }
        if stacks[0].last() == stacks[1].last() {
            stacks[1].pop();
        }

        count_candidates = 0;
        for stack in &stacks {
            for &node in stack {
                if candidate[node] == index + 1 {
                    candidate[node] += 1;
                    count_candidates += 1;
                }
            }
        }
        if count_candidates == 0 {
            return false;
        }
    }

    if count_candidates > 2 {
        return false;
    }

    let split_nodes: Vec<usize> = (0..candidate.len())
        .filter(|&node| candidate[node] == nonzero_columns.len() + 1)
        .collect();
    for split_node in split_nodes {
        let components = node_components(graph, &disabled, split_node);
        let num_components = components.iter().filter(|&&c| c != NONE).map(|&c| c + 1).max().unwrap_or(0);
        if num_components < 2 {
            continue;
        }

        // Auxiliary graph on the components, one edge per 1-column whose
        // endpoints avoid the split node.
        let mut aux_adjacency = vec![Vec::new(); num_components];
        for &column in nonzero_columns {
            let edge = column_edges[column];
            let u = components[graph.edge_u(edge)];
            let v = components[graph.edge_v(edge)];
            if u != NONE && v != NONE {
                aux_adjacency[u].push(v);
                aux_adjacency[v].push(u);
            }
        }
        let Some(bipartition) = bipartition(&aux_adjacency) else {
            continue;
        };

        // Carry out the split.
        let sister = graph.add_node();
        let incident: Vec<usize> = graph.incident_edges(split_node).collect();
        for edge in incident {
            let mut other = graph.edge_u(edge);
            if other == split_node {
                other = graph.edge_v(edge);
            }
            let mut side = bipartition[components[other]];
            if disabled[edge] {
                side = 1 - side;
            }
            if side == 1 {
                graph.delete_edge(edge);
                let reused = graph.add_edge(other, sister);
                debug_assert_eq!(reused, edge);
            }
        }
        row_edges[base_num_rows] = graph.add_edge(split_node, sister);
        return true;
    }
    false
}

fn add_one_row_one_column(
    graph: &mut Graph,
    row_edges: &mut [usize],
    column_edges: &mut [usize],
    base_num_rows: usize,
    base_num_columns: usize,
    row_parallel: Element,
    column_parallel: Element,
) -> bool {
    debug_assert!(row_parallel.is_valid() && column_parallel.is_valid());
    let row_edge = element_edge(row_parallel, row_edges, column_edges);
    let column_edge = element_edge(column_parallel, row_edges, column_edges);
    let Some((common, row_other, column_other)) = edges_adjacent(graph, row_edge, column_edge) else {
        return false;
    };
    let row_split = graph.add_node();
    graph.delete_edge(row_edge);
    let reused = graph.add_edge(row_other, row_split);
    debug_assert_eq!(reused, row_edge);
    row_edges[base_num_rows] = graph.add_edge(row_split, common);
    column_edges[base_num_columns] = graph.add_edge(row_split, column_other);
    true
}

fn add_two_rows_one_column(
    graph: &mut Graph,
    row_edges: &mut [usize],
    column_edges: &mut [usize],
    base_num_rows: usize,
    base_num_columns: usize,
    row1_parallel: Element,
    row2_parallel: Element,
) -> bool {
    debug_assert!(row1_parallel.is_valid() && row2_parallel.is_valid());
    let row1_edge = element_edge(row1_parallel, row_edges, column_edges);
    let row2_edge = element_edge(row2_parallel, row_edges, column_edges);
    let Some((common, other1, other2)) = edges_adjacent(graph, row1_edge, row2_edge) else {
        return false;
    };

    let row1_split = graph.add_node();
    graph.delete_edge(row1_edge);
    let reused = graph.add_edge(other1, row1_split);
    debug_assert_eq!(reused, row1_edge);
    row_edges[base_num_rows] = graph.add_edge(row1_split, common);

    let row2_split = graph.add_node();
    graph.delete_edge(row2_edge);
    let reused = graph.add_edge(other2, row2_split);
    debug_assert_eq!(reused, row2_edge);
    row_edges[base_num_rows + 1] = graph.add_edge(row2_split, common);

    column_edges[base_num_columns] = graph.add_edge(row1_split, row2_split);
    true
}

fn add_one_row_two_columns(
    graph: &mut Graph,
    row_edges: &mut [usize],
    column_edges: &mut [usize],
    base_num_rows: usize,
    base_num_columns: usize,
    column1_parallel: Element,
    column2_parallel: Element,
) -> bool {
    debug_assert!(column1_parallel.is_valid() && column2_parallel.is_valid());
    let column1_edge = element_edge(column1_parallel, row_edges, column_edges);
    let column2_edge = element_edge(column2_parallel, row_edges, column_edges);
    let Some((common, other1, other2)) = edges_adjacent(graph, column1_edge, column2_edge) else {
        return false;
    };
    let new_node = graph.add_node();
    column_edges[base_num_columns] = graph.add_edge(other1, new_node);
    column_edges[base_num_columns + 1] = graph.add_edge(other2, new_node);
    row_edges[base_num_rows] = graph.add_edge(common, new_node);
    true
}

/// Articulation points of the graph restricted to the enabled edges,
/// reported as 1 in the returned per-node array.
fn articulation_points(graph: &Graph, disabled: &[bool]) -> Vec<usize> {
    let capacity = graph.node_capacity();
    let mut result = vec![0usize; capacity];
    let mut visited = vec![false; capacity];
    let mut discovery = vec![0usize; capacity];
    let mut time = 0usize;

    fn dfs(
        graph: &Graph,
        disabled: &[bool],
        node: usize,
        parent: usize,
        visited: &mut [bool],
        discovery: &mut [usize],
        time: &mut usize,
        result: &mut [usize],
    ) -> usize {
        visited[node] = true;
        *time += 1;
        discovery[node] = *time;
        let mut earliest = *time;
        let mut children = 0usize;
        for arc in graph.incident_arcs(node) {
            if disabled[arc / 2] {
                continue;
            }
            let next = graph.arc_target(arc);
            if !visited[next] {
                children += 1;
                let child_earliest = dfs(graph, disabled, next, node, visited, discovery, time, result);
                earliest = earliest.min(child_earliest);
                if parent != NONE && child_earliest >= discovery[node] {
                    result[node] = 1;
                }
            } else if next != parent {
                earliest = earliest.min(discovery[next]);
            }
        }
        if parent == NONE && children > 1 {
            result[node] = 1;
        }
        earliest
    }

    if let Some(root) = graph.nodes().next() {
        dfs(graph, disabled, root, NONE, &mut visited, &mut discovery, &mut time, &mut result);
    }
    result
}

/// Parent of each node in the forest of row edges, rooted at the first node.
fn tree_parents(graph: &Graph, row_edges: &[usize], num_rows: usize) -> Vec<usize> {
    let capacity = graph.node_capacity();
    let mut is_tree_edge = vec![false; graph.edge_capacity()];
    for &edge in row_edges.iter().take(num_rows) {
        is_tree_edge[edge] = true;
    }
    let mut parents = vec![NONE; capacity];
    let mut visited = vec![false; capacity];
    for root in graph.nodes() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            for arc in graph.incident_arcs(node) {
                if !is_tree_edge[arc / 2] {
                    continue;
                }
                let next = graph.arc_target(arc);
                if !visited[next] {
                    visited[next] = true;
                    parents[next] = node;
                    stack.push(next);
                }
            }
        }
    }
    parents
}

/// Connected components of the graph after removing `removed_node` and the
/// disabled edges; the removed node maps to `NONE`.
fn node_components(graph: &Graph, disabled: &[bool], removed_node: usize) -> Vec<usize> {
    let capacity = graph.node_capacity();
    let mut components = vec![NONE; capacity];
    let mut next_component = 0usize;
    for start in graph.nodes() {
        if start == removed_node || components[start] != NONE {
            continue;
        }
        components[start] = next_component;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for arc in graph.incident_arcs(node) {
                if disabled[arc / 2] {
                    continue;
                }
                let next = graph.arc_target(arc);
                if next != removed_node && components[next] == NONE {
                    components[next] = next_component;
                    stack.push(next);
                }
            }
        }
        next_component += 1;
    }
    components
}

/// Two-colors the adjacency lists; `None` when an odd cycle exists.
fn bipartition(adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut colors = vec![usize::MAX; adjacency.len()];
    for start in 0..adjacency.len() {
        if colors[start] != usize::MAX {
            continue;
        }
        colors[start] = 0;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &next in &adjacency[node] {
                if colors[next] == usize::MAX {
                    colors[next] = 1 - colors[node];
                    stack.push(next);
                } else if colors[next] == colors[node] {
                    return None;
                }
            }
        }
    }
    Some(colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_realization(
        matrix: &TernaryMatrix,
        result: &SequenceGraphicness,
        num_rows: usize,
        num_columns: usize,
    ) {
        let realization = result.realization.as_ref().expect("sequence is graphic");
        assert_eq!(
            realization.fundamental_matrix(num_rows, num_columns),
            matrix.support()
        );
    }

    #[test]
    fn wheel_alone_is_graphic() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 0, 1]);
        let transpose = matrix.transpose();
        let result =
            sequence_graphicness(&matrix, &transpose, &[3], &[3], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 0);
        check_realization(&matrix, &result, 3, 3);
    }

    #[test]
    fn wheel_with_three_entry_line_is_graphic() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let transpose = matrix.transpose();
        let result =
            sequence_graphicness(&matrix, &transpose, &[3], &[3], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 0);
        check_realization(&matrix, &result, 3, 3);
    }

    #[test]
    fn added_path_column_stays_graphic() {
        // W3 cycle matrix plus a column {r0, r1}: the corresponding spokes
        // share the hub, forming a path.
        let matrix = TernaryMatrix::from_dense(
            3,
            4,
            &[
                1, 1, 0, 1, //
                0, 1, 1, 1, //
                1, 0, 1, 0,
            ],
        );
        let transpose = matrix.transpose();
        let result =
            sequence_graphicness(&matrix, &transpose, &[3, 3], &[3, 4], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 1);
        check_realization(&matrix, &result, 3, 4);
    }

    #[test]
    fn fano_column_breaks_graphicness() {
        // The cycle matrix plus the all-ones column is the Fano matroid.
        let matrix = TernaryMatrix::from_dense(
            3,
            4,
            &[
                1, 1, 0, 1, //
                0, 1, 1, 1, //
                1, 0, 1, 1,
            ],
        );
        let transpose = matrix.transpose();
        let result =
            sequence_graphicness(&matrix, &transpose, &[3, 3], &[3, 4], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 0);
        assert!(result.realization.is_none());
    }

    #[test]
    fn fano_transpose_is_not_cographic_either() {
        let matrix = TernaryMatrix::from_dense(
            3,
            4,
            &[
                1, 1, 0, 1, //
                0, 1, 1, 1, //
                1, 0, 1, 1,
            ],
        );
        let transpose = matrix.transpose();
        // Cographicness: run on the transpose with swapped sequence sizes.
        let result =
            sequence_graphicness(&transpose, &matrix, &[3, 4], &[3, 3], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 0);
        assert!(result.realization.is_none());
    }

    #[test]
    fn row_and_column_step_splits_a_node() {
        // Extend the wheel by one row and one column that are unit/parallel
        // to adjacent lines: r3 is a unit row at c0, c4 is a unit column at
        // r0. The edges of c0 and r0 share a rim node, which gets split.
        let matrix = TernaryMatrix::from_dense(
            4,
            4,
            &[
                1, 1, 0, 1, //
                0, 1, 1, 0, //
                1, 0, 1, 0, //
                1, 0, 0, 1,
            ],
        );
        let transpose = matrix.transpose();
        let result =
            sequence_graphicness(&matrix, &transpose, &[3, 4], &[3, 4], &Deadline::unlimited()).unwrap();
        assert_eq!(result.last_graphic_minor, 1);
        check_realization(&matrix, &result, 4, 4);
    }
}
