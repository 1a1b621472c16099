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

//! Network and conetwork recognition: graphicness of the support through
//! the decomposition (stopping at the first non-graphic witness), assembly
//! of a single realization bottom-up through series-parallel expansions,
//! 1-sums and 2-sums, and Camion orientation of the result.

use std::time::Duration;

use log::{debug, info};
use unimod_common::{Element, Submatrix, TernaryMatrix};
use unimod_decomp::node::NodeType;
use unimod_decomp::series_parallel::SpOperation;
use unimod_decomp::{decompose, DecompositionParams, DecompositionStats, DecompositionTree, RecognitionError};
use unimod_graph::graph::{Graph, NONE};
use unimod_graph::realize::Realization;
use unimod_graph::orient_network;

/// Result of a network test.
#[derive(Debug)]
pub enum NetworkResult {
    Yes {
        realization: Realization,
        /// Arc reversal flags indexed by edge id.
        arcs_reversed: Vec<bool>,
    },
    No {
        /// Present when the signs, not the support, are at fault.
        violator: Option<Submatrix>,
    },
}

impl NetworkResult {
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Yes { .. })
    }
}

/// Tests whether the ternary matrix is a network matrix: its support is
/// graphic and the signs admit a consistent orientation.
pub fn test_network(
    matrix: &TernaryMatrix,
    time_limit: Option<Duration>,
    stats: Option<&mut DecompositionStats>,
) -> Result<NetworkResult, RecognitionError> {
    if let Err((row, column)) = matrix.is_ternary() {
        return Err(RecognitionError::Matrix(unimod_common::MatrixError::invalid(format!(
            "entry at ({},{}) is not in {{-1,0,+1}}",
            row + 1,
            column + 1
        ))));
    }
    info!(
        "testing a {}x{} matrix for being a network matrix",
        matrix.num_rows(),
        matrix.num_columns()
    );

    let params = DecompositionParams {
        stop_when_nongraphic: true,
        time_limit,
        ..DecompositionParams::default()
    };
    let tree = decompose(&matrix.support(), false, &params, stats)?;
    if tree.root_node().graphicness != Some(true) {
        debug!("support is not graphic");
        return Ok(NetworkResult::No { violator: None });
    }

    let realization = assemble_realization(&tree, tree.root)
        .ok_or_else(|| RecognitionError::inconsistent("graphic node without an assembled realization"))?;
    debug_assert_eq!(
        realization.fundamental_matrix(matrix.num_rows(), matrix.num_columns()),
        matrix.support()
    );
    match orient_network(matrix, &realization) {
        Ok(arcs_reversed) => Ok(NetworkResult::Yes {
            realization,
            arcs_reversed,
        }),
        Err(violator) => Ok(NetworkResult::No {
            violator: Some(violator),
        }),
    }
}

/// Conetwork test: the transpose is a network matrix.
pub fn test_conetwork(
    matrix: &TernaryMatrix,
    time_limit: Option<Duration>,
    stats: Option<&mut DecompositionStats>,
) -> Result<NetworkResult, RecognitionError> {
    let transpose = matrix.transpose();
    match test_network(&transpose, time_limit, stats)? {
        NetworkResult::Yes {
            realization,
            arcs_reversed,
        } => Ok(NetworkResult::Yes {
            realization,
            arcs_reversed,
        }),
        NetworkResult::No { violator } => Ok(NetworkResult::No {
            violator: violator.map(|submatrix| Submatrix::new(submatrix.columns.clone(), submatrix.rows)),
        }),
    }
}

/// Recursively assembles a realization of the node's matrix from the leaf
/// certificates: leaves contribute their graphs, series-parallel nodes
/// re-expand their reductions, 1-sums take disjoint unions and 2-sums glue
/// along the marker edges. Graphic matrices never produce 3-sums when the
/// driver stops on non-graphicness.
pub fn assemble_realization(tree: &DecompositionTree, node: usize) -> Option<Realization> {
    let entry = &tree.nodes[node];
    let num_rows = entry.matrix.num_rows();
    let num_columns = entry.matrix.num_columns();
    match &entry.node_type {
        NodeType::Graph | NodeType::Planar => entry.graph.as_ref().map(|certificate| certificate.realization.clone()),
        NodeType::SeriesParallel => {
            let base = if let Some(link) = entry.children.first() {
                let child = assemble_realization(tree, link.node)?;
                remap_realization(child, &link.rows_to_parent, &link.columns_to_parent, num_rows, num_columns)
            } else {
                // Fully reduced: start from a single node.
                let mut graph = Graph::with_capacity(2, num_rows + num_columns);
                graph.add_node();
                Realization {
                    graph,
                    forest_edges: vec![NONE; num_rows],
                    coforest_edges: vec![NONE; num_columns],
                }
            };
            Some(expand_series_parallel(base, &entry.sp_reductions))
        }
        NodeType::OneSum => {
            let mut graph = Graph::with_capacity(4, num_rows + num_columns);
            let mut forest_edges = vec![NONE; num_rows];
            let mut coforest_edges = vec![NONE; num_columns];
            for link in &entry.children {
                let child = assemble_realization(tree, link.node)?;
                let mut node_map = vec![NONE; child.graph.node_capacity()];
                for child_node in child.graph.nodes() {
                    node_map[child_node] = graph.add_node();
                }
                let mut edge_map = vec![NONE; child.graph.edge_capacity()];
                for edge in child.graph.edges() {
                    edge_map[edge] =
                        graph.add_edge(node_map[child.graph.edge_u(edge)], node_map[child.graph.edge_v(edge)]);
                }
                for (child_row, &edge) in child.forest_edges.iter().enumerate() {
                    forest_edges[link.rows_to_parent[child_row]] = edge_map[edge];
                }
                for (child_column, &edge) in child.coforest_edges.iter().enumerate() {
                    coforest_edges[link.columns_to_parent[child_column]] = edge_map[edge];
                }
            }
            Some(Realization {
                graph,
                forest_edges,
                coforest_edges,
            })
        }
        NodeType::TwoSum => {
            let first_link = &entry.children[0];
            let second_link = &entry.children[1];
            let first = assemble_realization(tree, first_link.node)?;
            let second = assemble_realization(tree, second_link.node)?;

            // Marker lines: the first child carries the marker row, the
            // second the marker column.
            let first_marker_row = first_link
                .rows_to_parent
                .iter()
                .position(|&parent| parent == usize::MAX)?;
            let second_marker_column = second_link
                .columns_to_parent
                .iter()
                .position(|&parent| parent == usize::MAX)?;
            let marker_edge_first = first.forest_edges[first_marker_row];
            let marker_edge_second = second.coforest_edges[second_marker_column];

            let mut graph = Graph::with_capacity(4, num_rows + num_columns);
            let mut forest_edges = vec![NONE; num_rows];
            let mut coforest_edges = vec![NONE; num_columns];

            // Copy the first child's graph.
            let mut first_node_map = vec![NONE; first.graph.node_capacity()];
            for child_node in first.graph.nodes() {
                first_node_map[child_node] = graph.add_node();
            }
            let mut first_edge_map = vec![NONE; first.graph.edge_capacity()];
            for edge in first.graph.edges() {
                if edge == marker_edge_first {
                    continue;
                }
                first_edge_map[edge] =
                    graph.add_edge(first_node_map[first.graph.edge_u(edge)], first_node_map[first.graph.edge_v(edge)]);
            }

            // Copy the second child's graph, identifying the endpoints of
            // its marker edge with those of the first child's marker edge.
            let mut second_node_map = vec![NONE; second.graph.node_capacity()];
            second_node_map[second.graph.edge_u(marker_edge_second)] =
                first_node_map[first.graph.edge_u(marker_edge_first)];
            second_node_map[second.graph.edge_v(marker_edge_second)] =
                first_node_map[first.graph.edge_v(marker_edge_first)];
            for child_node in second.graph.nodes() {
                if second_node_map[child_node] == NONE {
                    second_node_map[child_node] = graph.add_node();
                }
            }
            let mut second_edge_map = vec![NONE; second.graph.edge_capacity()];
            for edge in second.graph.edges() {
                if edge == marker_edge_second {
                    continue;
                }
                second_edge_map[edge] = graph.add_edge(
                    second_node_map[second.graph.edge_u(edge)],
                    second_node_map[second.graph.edge_v(edge)],
                );
            }

            for (child_row, &edge) in first.forest_edges.iter().enumerate() {
                let parent = first_link.rows_to_parent[child_row];
                if parent != usize::MAX {
                    forest_edges[parent] = first_edge_map[edge];
                }
            }
            for (child_column, &edge) in first.coforest_edges.iter().enumerate() {
                let parent = first_link.columns_to_parent[child_column];
                if parent != usize::MAX {
                    coforest_edges[parent] = first_edge_map[edge];
                }
            }
            for (child_row, &edge) in second.forest_edges.iter().enumerate() {
                let parent = second_link.rows_to_parent[child_row];
                if parent != usize::MAX {
                    forest_edges[parent] = second_edge_map[edge];
                }
            }
            for (child_column, &edge) in second.coforest_edges.iter().enumerate() {
                let parent = second_link.columns_to_parent[child_column];
                if parent != usize::MAX {
                    coforest_edges[parent] = second_edge_map[edge];
                }
            }

            Some(Realization {
                graph,
                forest_edges,
                coforest_edges,
            })
        }
        _ => None,
    }
}

fn remap_realization(
    child: Realization,
    rows_to_parent: &[usize],
    columns_to_parent: &[usize],
    num_rows: usize,
    num_columns: usize,
) -> Realization {
    let mut forest_edges = vec![NONE; num_rows];
    let mut coforest_edges = vec![NONE; num_columns];
    for (child_row, &edge) in child.forest_edges.iter().enumerate() {
        forest_edges[rows_to_parent[child_row]] = edge;
    }
    for (child_column, &edge) in child.coforest_edges.iter().enumerate() {
        coforest_edges[columns_to_parent[child_column]] = edge;
    }
    Realization {
        graph: child.graph,
        forest_edges,
        coforest_edges,
    }
}

/// Replays recorded series-parallel reductions in reverse, growing the
/// realization: zero rows become bridges, zero columns loops, unit rows
/// subdivide their column's edge, unit columns double their row's edge,
/// and copies subdivide or parallel their mates.
fn expand_series_parallel(mut realization: Realization, reductions: &[SpOperation]) -> Realization {
    for operation in reductions.iter().rev() {
        let element = operation.element;
        let mate = operation.mate;
        let graph = &mut realization.graph;
        match (element.is_row(), mate) {
            (true, mate) if !mate.is_valid() => {
                // Zero row: a fresh bridge.
                let anchor = graph.nodes().next().expect("graph has a node");
                let leaf = graph.add_node();
                realization.forest_edges[element.row()] = graph.add_edge(anchor, leaf);
            }
            (false, mate) if !mate.is_valid() => {
                // Zero column: a loop.
                let anchor = graph.nodes().next().expect("graph has a node");
                realization.coforest_edges[element.column()] = graph.add_edge(anchor, anchor);
            }
            (true, mate) if mate.is_column() => {
                // Unit row: subdivide the column's edge.
                let edge = realization.coforest_edges[mate.column()];
                let u = graph.edge_u(edge);
                let v = graph.edge_v(edge);
                graph.delete_edge(edge);
                let middle = graph.add_node();
                let reused = graph.add_edge(u, middle);
                debug_assert_eq!(reused, edge);
                realization.coforest_edges[mate.column()] = reused;
                realization.forest_edges[element.row()] = graph.add_edge(middle, v);
            }
            (true, mate) => {
                // Copy of a row: subdivide the mate's tree edge.
                let edge = realization.forest_edges[mate.row()];
                let u = graph.edge_u(edge);
                let v = graph.edge_v(edge);
                graph.delete_edge(edge);
                let middle = graph.add_node();
                let reused = graph.add_edge(u, middle);
                debug_assert_eq!(reused, edge);
                realization.forest_edges[mate.row()] = reused;
                realization.forest_edges[element.row()] = graph.add_edge(middle, v);
            }
            (false, mate) if mate.is_row() => {
                // Unit column: parallel to the row's tree edge.
                let edge = realization.forest_edges[mate.row()];
                realization.coforest_edges[element.column()] =
                    graph.add_edge(graph.edge_u(edge), graph.edge_v(edge));
            }
            (false, mate) => {
                // Copy of a column: parallel to the mate's edge.
                let edge = realization.coforest_edges[mate.column()];
                realization.coforest_edges[element.column()] =
                    graph.add_edge(graph.edge_u(edge), graph.edge_v(edge));
            }
        }
    }
    realization
}

/// Edge-to-element labels of a realization, for the graph writers.
pub fn edge_elements(realization: &Realization) -> Vec<Element> {
    let mut elements = vec![Element(0); realization.graph.edge_capacity()];
    for (row, &edge) in realization.forest_edges.iter().enumerate() {
        if edge != NONE {
            elements[edge] = Element::from_row(row);
        }
    }
    for (column, &edge) in realization.coforest_edges.iter().enumerate() {
        if edge != NONE {
            elements[edge] = Element::from_column(column);
        }
    }
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_wheel_is_a_network_matrix() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]);
        let result = test_network(&matrix, None, None).unwrap();
        assert!(result.is_network());
    }

    #[test]
    fn all_ones_wheel_agrees_with_subdeterminants() {
        // The all-ones W3 has every subdeterminant in {-1,0,+1}, so it must
        // be recognized as a network matrix with some orientation.
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let expected = crate::determinant::brute_force_violator(&matrix).unwrap().is_none();
        let result = test_network(&matrix, None, None).unwrap();
        assert_eq!(result.is_network(), expected);
        assert!(expected);
    }

    #[test]
    fn fano_support_is_not_a_network_matrix() {
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1]);
        let result = test_network(&matrix, None, None).unwrap();
        assert!(!result.is_network());
    }

    #[test]
    fn series_parallel_expansion_realizes_the_original() {
        // Wheel plus duplicate row and unit column: the assembled
        // realization must reproduce the full support.
        let matrix = TernaryMatrix::from_dense(
            4,
            4,
            &[
                1, 1, 0, 0, //
                0, 1, 1, 0, //
                1, 1, 1, 0, //
                1, 1, 1, 1,
            ],
        );
        let result = test_network(&matrix, None, None).unwrap();
        let NetworkResult::Yes { realization, .. } = result else {
            panic!("support is graphic and all-positive signs are consistent here");
        };
        assert_eq!(realization.fundamental_matrix(4, 4), matrix.support());
    }

    #[test]
    fn two_sum_gluing_realizes_the_original() {
        let mut dense = vec![0i8; 36];
        let wheel = [[1, 1, 0], [0, 1, 1], [1, 1, 1]];
        for row in 0..3 {
            for column in 0..3 {
                dense[row * 6 + column] = wheel[row][column];
                dense[(row + 3) * 6 + column + 3] = wheel[row][column];
            }
        }
        for row in 3..6 {
            dense[row * 6] = 1;
        }
        let matrix = TernaryMatrix::from_dense(6, 6, &dense);
        let tree = decompose(
            &matrix.support(),
            false,
            &DecompositionParams::default(),
            None,
        )
        .unwrap();
        assert_eq!(tree.root_node().graphicness, Some(true));
        let realization = assemble_realization(&tree, tree.root).unwrap();
        assert_eq!(realization.fundamental_matrix(6, 6), matrix.support());
    }

    #[test]
    fn conetwork_of_transposed_network() {
        let matrix = TernaryMatrix::from_dense(3, 3, &[1, -1, 0, 0, 1, -1, 1, -1, 1]).transpose();
        let result = test_conetwork(&matrix, None, None).unwrap();
        assert!(result.is_network());
    }
}
