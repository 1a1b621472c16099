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

//! The decomposition driver: a FIFO queue of per-node tasks, each running
//! the first applicable phase, with short-circuit flags that drain the
//! queue once a decisive witness is known.

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info};
use serde::Serialize;
use unimod_common::{Submatrix, TernaryMatrix};
use unimod_graph::graph::NONE;
use unimod_graph::realize::{realize_small, Realization};

use crate::deadline::Deadline;
use crate::error::RecognitionError;
use crate::nested::{extend_nested_minor_sequence, NestedOutcome};
use crate::node::{ChildLink, DecompositionTree, GraphCertificate, NodeId, NodeType};
use crate::r10::is_r10;
use crate::separation::{
    seymour_three_sum_compose, seymour_three_sum_decompose_first, seymour_three_sum_decompose_second,
    seymour_three_sum_epsilon, two_sum_compose, Separation, SeparationType, FIRST, MASK_CHILD, SECOND,
};
use crate::seq_graphic::sequence_graphicness;
use crate::series_parallel::{find_series_parallel, SpResidue};

#[derive(Debug, Clone, Default)]
pub struct DecompositionParams {
    /// Drain the queue as soon as one node is known irregular.
    pub stop_when_irregular: bool,
    /// Drain the queue as soon as one node is known non-graphic.
    pub stop_when_nongraphic: bool,
    /// Drain the queue as soon as one node is known non-cographic.
    pub stop_when_noncographic: bool,
    /// Wall-clock budget of the whole call.
    pub time_limit: Option<Duration>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DecompositionStats {
    pub total_count: usize,
    pub one_separation_count: usize,
    pub direct_graphic_count: usize,
    pub r10_count: usize,
    pub series_parallel_count: usize,
    pub nested_count: usize,
    pub sequence_graphic_count: usize,
    pub three_separation_count: usize,
    pub total_seconds: f64,
}

#[derive(Default)]
struct Flags {
    found_irregularity: bool,
    found_nongraphicness: bool,
    found_noncographicness: bool,
}

/// Runs the complete decomposition of the given matrix (interpreted over
/// GF(2) through its support; signs are carried along for certificates).
pub fn decompose(
    matrix: &TernaryMatrix,
    is_ternary: bool,
    params: &DecompositionParams,
    mut stats: Option<&mut DecompositionStats>,
) -> Result<DecompositionTree, RecognitionError> {
    let deadline = Deadline::new(params.time_limit);
    info!(
        "decomposing a {}x{} matrix with {} nonzeros",
        matrix.num_rows(),
        matrix.num_columns(),
        matrix.num_nonzeros()
    );
    let mut tree = DecompositionTree::new(matrix.clone(), is_ternary);
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(tree.root);
    let mut flags = Flags::default();

    while let Some(node_id) = queue.pop_front() {
        deadline.check()?;
        if (params.stop_when_irregular && flags.found_irregularity)
            || (params.stop_when_nongraphic && flags.found_nongraphicness)
            || (params.stop_when_noncographic && flags.found_noncographicness)
        {
            debug!("dropping task for node {node_id} after a decisive witness");
            continue;
        }
        if let Some(stats) = stats.as_deref_mut() {
            stats.total_count += 1;
        }
        run_task(&mut tree, node_id, &mut queue, &mut flags, &deadline, stats.as_deref_mut())?;
    }

    tree.set_attributes();
    if let Some(stats) = stats {
        stats.total_seconds += deadline.elapsed().as_secs_f64();
    }
    Ok(tree)
}

fn run_task(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
    deadline: &Deadline,
    mut stats: Option<&mut DecompositionStats>,
) -> Result<(), RecognitionError> {
    let node = &tree.nodes[node_id];
    let num_rows = node.matrix.num_rows();
    let num_columns = node.matrix.num_columns();
    let small = num_rows <= 3 || num_columns <= 3;

    if !node.tested_one_separation {
        if let Some(stats) = stats.as_deref_mut() {
            stats.one_separation_count += 1;
        }
        task_one_separation(tree, node_id, queue);
    } else if node.graphicness.is_none() && small {
        if let Some(stats) = stats.as_deref_mut() {
            stats.direct_graphic_count += 1;
        }
        task_direct_graphic(tree, node_id, queue, flags, false);
    } else if node.cographicness.is_none() && small {
        if let Some(stats) = stats.as_deref_mut() {
            stats.direct_graphic_count += 1;
        }
        task_direct_graphic(tree, node_id, queue, flags, true);
    } else if !node.tested_r10 {
        if let Some(stats) = stats.as_deref_mut() {
            stats.r10_count += 1;
        }
        task_r10(tree, node_id, queue);
    } else if !node.tested_series_parallel {
        if let Some(stats) = stats.as_deref_mut() {
            stats.series_parallel_count += 1;
        }
        task_series_parallel(tree, node_id, queue, flags, deadline)?;
    } else if node.nested.is_none() {
        if let Some(stats) = stats.as_deref_mut() {
            stats.nested_count += 1;
        }
        task_nested(tree, node_id, queue, flags, deadline)?;
    } else if node.graphicness.is_none() {
        if let Some(stats) = stats.as_deref_mut() {
            stats.sequence_graphic_count += 1;
        }
        task_sequence_graphic(tree, node_id, queue, flags, deadline, false)?;
    } else if node.cographicness.is_none() {
        if let Some(stats) = stats.as_deref_mut() {
            stats.sequence_graphic_count += 1;
        }
        task_sequence_graphic(tree, node_id, queue, flags, deadline, true)?;
    } else {
        if let Some(stats) = stats.as_deref_mut() {
            stats.three_separation_count += 1;
        }
        task_three_separation(tree, node_id, queue, flags)?;
    }
    Ok(())
}

/// Phase 1: connected components of the bipartite graph.
fn task_one_separation(tree: &mut DecompositionTree, node_id: NodeId, queue: &mut VecDeque<NodeId>) {
    let matrix = &tree.nodes[node_id].matrix;
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();

    // Union-find over rows and columns.
    let mut representative: Vec<usize> = (0..num_rows + num_columns).collect();
    fn find(representative: &mut [usize], x: usize) -> usize {
        let mut root = x;
        while representative[root] != root {
            root = representative[root];
        }
        representative[x] = root;
        root
    }
    for row in 0..num_rows {
        for (column, _) in matrix.row_entries(row) {
            let a = find(&mut representative, row);
            let b = find(&mut representative, num_rows + column);
            representative[a] = b;
        }
    }

    let mut component_of_root: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    let mut component_rows: Vec<Vec<usize>> = Vec::new();
    let mut component_columns: Vec<Vec<usize>> = Vec::new();
    for row in 0..num_rows {
        let root = find(&mut representative, row);
        let component = *component_of_root.entry(root).or_insert_with(|| {
            component_rows.push(Vec::new());
            component_columns.push(Vec::new());
            component_rows.len() - 1
        });
        component_rows[component].push(row);
    }
    for column in 0..num_columns {
        let root = find(&mut representative, num_rows + column);
        let component = *component_of_root.entry(root).or_insert_with(|| {
            component_rows.push(Vec::new());
            component_columns.push(Vec::new());
            component_rows.len() - 1
        });
        component_columns[component].push(column);
    }

    if component_rows.len() <= 1 {
        tree.nodes[node_id].tested_one_separation = true;
        queue.push_back(node_id);
        return;
    }

    debug!(
        "node {node_id} splits into {} connected components",
        component_rows.len()
    );
    let is_ternary = tree.nodes[node_id].is_ternary;
    let matrix = tree.nodes[node_id].matrix.clone();
    tree.nodes[node_id].node_type = NodeType::OneSum;
    for (rows, columns) in component_rows.into_iter().zip(component_columns) {
        let submatrix = Submatrix::new(rows.clone(), columns.clone());
        let child_matrix = matrix.slice(&submatrix).expect("component indices are valid");
        let child = tree.add_node(child_matrix, is_ternary);
        tree.nodes[node_id].children.push(ChildLink {
            node: child,
            rows_to_parent: rows,
            columns_to_parent: columns,
        });
        queue.push_back(child);
    }
}

/// Phases 2 and 3: direct realization search for small matrices.
fn task_direct_graphic(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
    cographic: bool,
) {
    let matrix = if cographic {
        tree.transpose_of(node_id)
    } else {
        tree.nodes[node_id].matrix.clone()
    };
    match realize_small(&matrix) {
        Some(realization) => {
            let node = &mut tree.nodes[node_id];
            let certificate = GraphCertificate {
                realization,
                arcs_reversed: None,
            };
            if cographic {
                node.cographicness = Some(true);
                node.cograph = Some(certificate);
                node.node_type = NodeType::Cograph;
            } else {
                node.graphicness = Some(true);
                node.graph = Some(certificate);
                node.node_type = NodeType::Graph;
            }
            debug!(
                "node {node_id} is {} by the direct test",
                if cographic { "cographic" } else { "graphic" }
            );
        }
        None => {
            let node = &mut tree.nodes[node_id];
            if cographic {
                node.cographicness = Some(false);
                flags.found_noncographicness = true;
            } else {
                node.graphicness = Some(false);
                flags.found_nongraphicness = true;
            }
            queue.push_back(node_id);
        }
    }
}

/// Phase 4: R10 pattern matching.
fn task_r10(tree: &mut DecompositionTree, node_id: NodeId, queue: &mut VecDeque<NodeId>) {
    if is_r10(&tree.nodes[node_id].matrix) {
        debug!("node {node_id} is R10");
        let node = &mut tree.nodes[node_id];
        node.node_type = NodeType::R10;
        node.graphicness = Some(false);
        node.cographicness = Some(false);
    } else {
        tree.nodes[node_id].tested_r10 = true;
        queue.push_back(node_id);
    }
}

/// Phase 5: series-parallel reduction.
fn task_series_parallel(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
    deadline: &Deadline,
) -> Result<(), RecognitionError> {
    let matrix = tree.nodes[node_id].matrix.clone();
    let result = find_series_parallel(&matrix, deadline)?;

    if matches!(result.residue, SpResidue::Empty) {
        debug!("node {node_id} reduces completely");
        let node = &mut tree.nodes[node_id];
        node.sp_reductions = result.operations;
        node.node_type = NodeType::SeriesParallel;
        return Ok(());
    }

    if result.operations.is_empty() {
        // Irreducible already; keep the residue on this node.
        let node = &mut tree.nodes[node_id];
        node.tested_series_parallel = true;
        match result.residue {
            SpResidue::Wheel(wheel) => {
                node.wheel = Some(wheel);
                queue.push_back(node_id);
            }
            SpResidue::TwoSeparation {
                first_rows,
                first_columns,
            } => {
                apply_two_separation(tree, node_id, &first_rows, &first_columns, queue, flags)?;
            }
            SpResidue::Empty => unreachable!("handled above"),
        }
        return Ok(());
    }

    // Partial reduction: one child carries the reduced submatrix.
    debug!(
        "node {node_id} reduces by {} operations to a {}x{} residue",
        result.operations.len(),
        result.reduced.rows.len(),
        result.reduced.columns.len()
    );
    let is_ternary = tree.nodes[node_id].is_ternary;
    let child_matrix = matrix.slice(&result.reduced)?;
    let child = tree.add_node(child_matrix, is_ternary);
    let node = &mut tree.nodes[node_id];
    node.sp_reductions = result.operations;
    node.node_type = NodeType::SeriesParallel;
    node.children.push(ChildLink {
        node: child,
        rows_to_parent: result.reduced.rows,
        columns_to_parent: result.reduced.columns,
    });
    queue.push_back(child);
    Ok(())
}

/// Phase 6: grow the nested minor sequence.
fn task_nested(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
    deadline: &Deadline,
) -> Result<(), RecognitionError> {
    let matrix = tree.nodes[node_id].matrix.clone();
    let wheel = tree.nodes[node_id]
        .wheel
        .clone()
        .expect("series-parallel phase stored a wheel");
    match extend_nested_minor_sequence(&matrix, &wheel, deadline)? {
        NestedOutcome::Sequence(sequence) => {
            tree.nodes[node_id].nested = Some(sequence);
            queue.push_back(node_id);
        }
        NestedOutcome::TwoSeparation {
            first_rows,
            first_columns,
        } => {
            apply_two_separation(tree, node_id, &first_rows, &first_columns, queue, flags)?;
        }
    }
    Ok(())
}

/// Phases 7 and 8: graphicness along the sequence.
fn task_sequence_graphic(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
    deadline: &Deadline,
    cographic: bool,
) -> Result<(), RecognitionError> {
    let nested = tree.nodes[node_id].nested.as_ref().expect("sequence was constructed");
    let result = if cographic {
        sequence_graphicness(
            &nested.transpose,
            &nested.matrix,
            &nested.sequence_num_columns,
            &nested.sequence_num_rows,
            deadline,
        )?
    } else {
        sequence_graphicness(
            &nested.matrix,
            &nested.transpose,
            &nested.sequence_num_rows,
            &nested.sequence_num_columns,
            deadline,
        )?
    };

    match result.realization {
        Some(realization) => {
            let nested = tree.nodes[node_id].nested.as_ref().expect("sequence exists");
            let (line_originals, other_originals) = if cographic {
                (nested.columns_original.clone(), nested.rows_original.clone())
            } else {
                (nested.rows_original.clone(), nested.columns_original.clone())
            };
            let num_rows = tree.nodes[node_id].matrix.num_rows();
            let num_columns = tree.nodes[node_id].matrix.num_columns();
            // Remap sequence lines to node lines; pivots may have swapped
            // rows and columns, but the labelled edges of the node rows
            // still form a spanning forest.
            let (forest_len, coforest_len) = if cographic {
                (num_columns, num_rows)
            } else {
                (num_rows, num_columns)
            };
            let mut forest = vec![NONE; forest_len];
            let mut coforest = vec![NONE; coforest_len];
            for (index, &edge) in realization.forest_edges.iter().enumerate() {
                let element = line_originals[index];
                if (element.is_row() && !cographic) || (element.is_column() && cographic) {
                    forest[if cographic { element.column() } else { element.row() }] = edge;
                } else {
                    coforest[if cographic { element.row() } else { element.column() }] = edge;
                }
            }
            for (index, &edge) in realization.coforest_edges.iter().enumerate() {
                let element = other_originals[index];
                if (element.is_row() && !cographic) || (element.is_column() && cographic) {
                    forest[if cographic { element.column() } else { element.row() }] = edge;
                } else {
                    coforest[if cographic { element.row() } else { element.column() }] = edge;
                }
            }
            let certificate = GraphCertificate {
                realization: Realization {
                    graph: realization.graph,
                    forest_edges: forest,
                    coforest_edges: coforest,
                },
                arcs_reversed: None,
            };
            let node = &mut tree.nodes[node_id];
            if cographic {
                debug_assert_eq!(
                    certificate.realization.fundamental_matrix(num_columns, num_rows),
                    node.matrix.transpose().support()
                );
                node.cographicness = Some(true);
                node.cograph = Some(certificate);
                node.node_type = NodeType::Cograph;
            } else {
                debug_assert_eq!(
                    certificate.realization.fundamental_matrix(num_rows, num_columns),
                    node.matrix.support()
                );
                node.graphicness = Some(true);
                node.graph = Some(certificate);
                node.node_type = NodeType::Graph;
            }
            debug!(
                "node {node_id} is {} along the whole sequence",
                if cographic { "cographic" } else { "graphic" }
            );
        }
        None => {
            let node = &mut tree.nodes[node_id];
            if cographic {
                node.last_cographic_minor = Some(result.last_graphic_minor);
                node.cographicness = Some(false);
                flags.found_noncographicness = true;
            } else {
                node.last_graphic_minor = Some(result.last_graphic_minor);
                node.graphicness = Some(false);
                flags.found_nongraphicness = true;
            }
            queue.push_back(node_id);
        }
    }
    Ok(())
}

/// Phase 9: 3-separation search along the sequence prefixes.
fn task_three_separation(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
) -> Result<(), RecognitionError> {
    let matrix = tree.nodes[node_id].matrix.clone();
    let transpose = tree.transpose_of(node_id);
    let is_ternary = tree.nodes[node_id].is_ternary;
    let num_rows = matrix.num_rows();
    let num_columns = matrix.num_columns();
    let nested = tree.nodes[node_id].nested.clone().expect("sequence exists");
    let total_lines = num_rows + num_columns;

    for prefix in 0..nested.len().saturating_sub(1) {
        let prefix_rows = nested.sequence_num_rows[prefix];
        let prefix_columns = nested.sequence_num_columns[prefix];
        let part_one_size = prefix_rows + prefix_columns;
        if part_one_size < 4 || total_lines - part_one_size < 4 {
            continue;
        }

        let mut first_rows = vec![false; num_rows];
        let mut first_columns = vec![false; num_columns];
        for &element in nested.rows_original.iter().take(prefix_rows) {
            if element.is_row() {
                first_rows[element.row()] = true;
            } else {
                first_columns[element.column()] = true;
            }
        }
        for &element in nested.columns_original.iter().take(prefix_columns) {
            if element.is_row() {
                first_rows[element.row()] = true;
            } else {
                first_columns[element.column()] = true;
            }
        }

        let mut separation = Separation::from_parts(&first_rows, &first_columns);
        match separation.find_binary_representatives(&matrix, &transpose, is_ternary) {
            Err(violator) => {
                mark_irregular(tree, node_id, Some(violator), flags);
                return Ok(());
            }
            Ok(()) => {}
        }

        match separation.separation_type {
            Some(SeparationType::ThreeDistributedRanks) => {
                debug!("node {node_id} splits as a 3-sum at sequence prefix {prefix}");
                return split_seymour(tree, node_id, &matrix, separation, None, queue);
            }
            Some(SeparationType::ThreeConcentratedRank) => {
                // Redistribute the concentrated rank by one binary pivot
                // inside the rank-2 block.
                let Some((pivot_row, pivot_column)) = find_block_entry(&matrix, &separation) else {
                    continue;
                };
                let pivoted = matrix.binary_pivot(pivot_row, pivot_column)?;
                let mut pivoted_separation = separation.clone();
                pivoted_separation.rows_flags[pivot_row] = separation.columns_flags[pivot_column] & MASK_CHILD;
                pivoted_separation.columns_flags[pivot_column] = separation.rows_flags[pivot_row] & MASK_CHILD;
                let pivoted_transpose = pivoted.transpose();
                match pivoted_separation.find_binary_representatives(&pivoted, &pivoted_transpose, is_ternary) {
                    Err(violator) => {
                        mark_irregular(tree, node_id, Some(violator), flags);
                        return Ok(());
                    }
                    Ok(()) => {}
                }
                if pivoted_separation.separation_type == Some(SeparationType::ThreeDistributedRanks) {
                    debug!(
                        "node {node_id} splits as a pivoted 3-sum at sequence prefix {prefix}"
                    );
                    return split_seymour(
                        tree,
                        node_id,
                        &pivoted,
                        pivoted_separation,
                        Some((pivot_row, pivot_column)),
                        queue,
                    );
                }
            }
            _ => {}
        }
    }

    debug!("node {node_id} admits no 3-separation along the sequence: irregular");
    mark_irregular(tree, node_id, None, flags);
    Ok(())
}

fn mark_irregular(tree: &mut DecompositionTree, node_id: NodeId, violator: Option<Submatrix>, flags: &mut Flags) {
    let node = &mut tree.nodes[node_id];
    node.node_type = NodeType::Irregular;
    node.violator = violator;
    flags.found_irregularity = true;
}

/// A nonzero inside the bottom-left block of the separation.
fn find_block_entry(matrix: &TernaryMatrix, separation: &Separation) -> Option<(usize, usize)> {
    for row in 0..matrix.num_rows() {
        if separation.rows_flags[row] & MASK_CHILD != SECOND {
            continue;
        }
        for (column, _) in matrix.row_entries(row) {
            if separation.columns_flags[column] & MASK_CHILD == FIRST {
                return Some((row, column));
            }
        }
    }
    None
}

/// Splits a node along a validated 2-separation.
fn apply_two_separation(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    first_rows: &[bool],
    first_columns: &[bool],
    queue: &mut VecDeque<NodeId>,
    flags: &mut Flags,
) -> Result<(), RecognitionError> {
    let matrix = tree.nodes[node_id].matrix.clone();
    let transpose = tree.transpose_of(node_id);
    let is_ternary = tree.nodes[node_id].is_ternary;

    let mut separation = Separation::from_parts(first_rows, first_columns);
    if let Err(violator) = separation.find_binary_representatives(&matrix, &transpose, is_ternary) {
        mark_irregular(tree, node_id, Some(violator), flags);
        return Ok(());
    }
    if separation.separation_type != Some(SeparationType::Two) {
        return Err(RecognitionError::inconsistent(
            "detected 2-separation has unexpected ranks",
        ));
    }

    let first = crate::separation::two_sum_decompose_first(&matrix, &separation)?;
    let second = crate::separation::two_sum_decompose_second(&matrix, &separation)?;
    debug!(
        "node {node_id} splits as a 2-sum into {}x{} and {}x{}",
        first.matrix.num_rows(),
        first.matrix.num_columns(),
        second.matrix.num_rows(),
        second.matrix.num_columns()
    );
    tree.nodes[node_id].node_type = NodeType::TwoSum;
    for component in [first, second] {
        let child = tree.add_node(component.matrix, is_ternary);
        tree.nodes[node_id].children.push(ChildLink {
            node: child,
            rows_to_parent: component.rows_to_parent,
            columns_to_parent: component.columns_to_parent,
        });
        queue.push_back(child);
    }
    verify_two_sum_recomposition(tree, node_id)?;
    Ok(())
}

/// Internal check: recomposing the two freshly created children through the
/// 2-sum must reproduce the split matrix up to the documented line order.
fn verify_two_sum_recomposition(tree: &DecompositionTree, node_id: NodeId) -> Result<(), RecognitionError> {
    let node = &tree.nodes[node_id];
    let first_link = &node.children[0];
    let second_link = &node.children[1];
    let first = &tree.nodes[first_link.node].matrix;
    let second = &tree.nodes[second_link.node].matrix;
    let first_marker_row = first_link
        .rows_to_parent
        .iter()
        .position(|&parent| parent == usize::MAX)
        .ok_or_else(|| RecognitionError::inconsistent("2-sum child misses its marker row"))?;
    let second_marker_column = second_link
        .columns_to_parent
        .iter()
        .position(|&parent| parent == usize::MAX)
        .ok_or_else(|| RecognitionError::inconsistent("2-sum child misses its marker column"))?;
    let characteristic = if node.is_ternary { 3 } else { 2 };
    let composed = two_sum_compose(
        first,
        second,
        Some(first_marker_row),
        None,
        None,
        Some(second_marker_column),
        characteristic,
    )?;

    let rows: Vec<usize> = first_link
        .rows_to_parent
        .iter()
        .chain(second_link.rows_to_parent.iter())
        .copied()
        .filter(|&parent| parent != usize::MAX)
        .collect();
    let columns: Vec<usize> = first_link
        .columns_to_parent
        .iter()
        .chain(second_link.columns_to_parent.iter())
        .copied()
        .filter(|&parent| parent != usize::MAX)
        .collect();
    let expected = node.matrix.slice(&Submatrix::new(rows, columns))?;
    let agrees = if node.is_ternary {
        composed == expected
    } else {
        composed.support() == expected.support()
    };
    if agrees {
        Ok(())
    } else {
        Err(RecognitionError::inconsistent(
            "recomposed 2-sum differs from the split matrix",
        ))
    }
}

/// Splits a node along a distributed-rank 3-separation as a Seymour 3-sum.
fn split_seymour(
    tree: &mut DecompositionTree,
    node_id: NodeId,
    matrix: &TernaryMatrix,
    separation: Separation,
    pivoted: Option<(usize, usize)>,
    queue: &mut VecDeque<NodeId>,
) -> Result<(), RecognitionError> {
    let transpose = matrix.transpose();
    let epsilon = seymour_three_sum_epsilon(matrix, &transpose, &separation)?;
    let first = seymour_three_sum_decompose_first(matrix, &separation, epsilon)?;
    let second = seymour_three_sum_decompose_second(matrix, &separation, epsilon)?;
    let is_ternary = tree.nodes[node_id].is_ternary;
    tree.nodes[node_id].node_type = NodeType::ThreeSum { epsilon, pivoted };
    for component in [first, second] {
        let child = tree.add_node(component.matrix, is_ternary);
        tree.nodes[node_id].children.push(ChildLink {
            node: child,
            rows_to_parent: component.rows_to_parent,
            columns_to_parent: component.columns_to_parent,
        });
        queue.push_back(child);
    }
    verify_three_sum_recomposition(tree, node_id)?;
    Ok(())
}

/// Internal check: recomposing the children of a 3-sum (after undoing a
/// recorded redistribution pivot) must reproduce the split matrix up to the
/// documented line order.
fn verify_three_sum_recomposition(tree: &DecompositionTree, node_id: NodeId) -> Result<(), RecognitionError> {
    let node = &tree.nodes[node_id];
    let NodeType::ThreeSum { pivoted, .. } = &node.node_type else {
        return Err(RecognitionError::inconsistent("node is not a 3-sum"));
    };
    let first_link = &node.children[0];
    let second_link = &node.children[1];
    let first = &tree.nodes[first_link.node].matrix;
    let second = &tree.nodes[second_link.node].matrix;

    let marker_row = |link: &ChildLink| -> Result<usize, RecognitionError> {
        link.rows_to_parent
            .iter()
            .position(|&parent| parent == usize::MAX)
            .ok_or_else(|| RecognitionError::inconsistent("3-sum child misses its marker row"))
    };
    let marker_columns = |link: &ChildLink| -> Result<[usize; 2], RecognitionError> {
        let markers: Vec<usize> = link
            .columns_to_parent
            .iter()
            .enumerate()
            .filter(|&(_, &parent)| parent == usize::MAX)
            .map(|(position, _)| position)
            .collect();
        markers
            .as_slice()
            .try_into()
            .map_err(|_| RecognitionError::inconsistent("3-sum child misses its marker columns"))
    };
    let characteristic = if node.is_ternary { 3 } else { 2 };
    let composed = seymour_three_sum_compose(
        first,
        second,
        marker_row(first_link)?,
        marker_columns(first_link)?,
        marker_row(second_link)?,
        marker_columns(second_link)?,
        characteristic,
    )?;

    let rows: Vec<usize> = first_link
        .rows_to_parent
        .iter()
        .chain(second_link.rows_to_parent.iter())
        .copied()
        .filter(|&parent| parent != usize::MAX)
        .collect();
    let columns: Vec<usize> = first_link
        .columns_to_parent
        .iter()
        .chain(second_link.columns_to_parent.iter())
        .copied()
        .filter(|&parent| parent != usize::MAX)
        .collect();
    let parent_matrix = match pivoted {
        Some((pivot_row, pivot_column)) => node.matrix.binary_pivot(*pivot_row, *pivot_column)?,
        None => node.matrix.clone(),
    };
    let expected = parent_matrix.slice(&Submatrix::new(rows, columns))?;
    let agrees = if node.is_ternary {
        composed == expected
    } else {
        composed.support() == expected.support()
    };
    if agrees {
        Ok(())
    } else {
        Err(RecognitionError::inconsistent(
            "recomposed 3-sum differs from the split matrix",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel3() -> TernaryMatrix {
        TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1])
    }

    fn decompose_plain(matrix: &TernaryMatrix) -> DecompositionTree {
        decompose(matrix, false, &DecompositionParams::default(), None).unwrap()
    }

    #[test]
    fn single_entry_is_a_graphic_leaf() {
        let tree = decompose_plain(&TernaryMatrix::from_dense(1, 1, &[1]));
        assert_eq!(tree.root_node().node_type, NodeType::Graph);
        assert_eq!(tree.root_node().regularity, Some(true));
        assert!(tree.root_node().graph.is_some());
    }

    #[test]
    fn wheel_is_a_graphic_leaf() {
        let tree = decompose_plain(&wheel3());
        assert_eq!(tree.root_node().node_type, NodeType::Graph);
        assert_eq!(tree.root_node().regularity, Some(true));
    }

    #[test]
    fn long_cycle_matrix_goes_through_the_sequence() {
        // The 4x4 cycle matrix: too large for the direct test, graphic via
        // the nested minor sequence.
        let matrix = TernaryMatrix::from_dense(
            4,
            4,
            &[
                1, 1, 0, 0, //
                0, 1, 1, 0, //
                0, 0, 1, 1, //
                1, 0, 0, 1,
            ],
        );
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().node_type, NodeType::Graph);
        assert_eq!(tree.root_node().regularity, Some(true));
        assert_eq!(tree.root_node().graphicness, Some(true));
    }

    #[test]
    fn fano_is_irregular() {
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1]);
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().regularity, Some(false));
        assert_eq!(tree.root_node().graphicness, Some(false));
        assert_eq!(tree.root_node().cographicness, Some(false));
    }

    #[test]
    fn fano_dual_is_irregular() {
        let matrix = TernaryMatrix::from_dense(3, 4, &[1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 1]).transpose();
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().regularity, Some(false));
    }

    #[test]
    fn r10_is_a_leaf() {
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
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().node_type, NodeType::R10);
        assert_eq!(tree.root_node().regularity, Some(true));
        assert_eq!(tree.root_node().graphicness, Some(false));
    }

    #[test]
    fn disconnected_matrix_is_a_one_sum() {
        let mut dense = vec![0i8; 36];
        let wheel = wheel3();
        for row in 0..3 {
            for column in 0..3 {
                dense[row * 6 + column] = wheel.get(row, column);
                dense[(row + 3) * 6 + column + 3] = wheel.get(row, column);
            }
        }
        let matrix = TernaryMatrix::from_dense(6, 6, &dense);
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().node_type, NodeType::OneSum);
        assert_eq!(tree.root_node().children.len(), 2);
        assert_eq!(tree.root_node().regularity, Some(true));
        assert_eq!(tree.root_node().graphicness, Some(true));
    }

    #[test]
    fn glued_wheels_become_a_two_sum() {
        let mut dense = vec![0i8; 36];
        let wheel = wheel3();
        for row in 0..3 {
            for column in 0..3 {
                dense[row * 6 + column] = wheel.get(row, column);
                dense[(row + 3) * 6 + column + 3] = wheel.get(row, column);
            }
        }
        for row in 3..6 {
            dense[row * 6] = 1;
        }
        let matrix = TernaryMatrix::from_dense(6, 6, &dense);
        let tree = decompose_plain(&matrix);
        // Somewhere in the tree a 2-sum must appear, and everything is
        // regular and graphic.
        assert!(tree
            .nodes
            .iter()
            .any(|node| node.node_type == NodeType::TwoSum));
        assert_eq!(tree.root_node().regularity, Some(true));
        assert_eq!(tree.root_node().graphicness, Some(true));
    }

    #[test]
    fn series_parallel_additions_reduce_to_a_leaf() {
        // Wheel plus duplicate row and unit column.
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
        let tree = decompose_plain(&matrix);
        assert_eq!(tree.root_node().node_type, NodeType::SeriesParallel);
        assert_eq!(tree.root_node().children.len(), 1);
        let child = tree.root_node().children[0].node;
        assert_eq!(tree.nodes[child].node_type, NodeType::Graph);
        assert_eq!(tree.root_node().regularity, Some(true));
    }

    #[test]
    fn zero_matrix_reduces_completely() {
        let tree = decompose_plain(&TernaryMatrix::zero(2, 3));
        // Every zero line is its own connected component.
        assert_eq!(tree.root_node().node_type, NodeType::OneSum);
        assert_eq!(tree.root_node().regularity, Some(true));
    }

    #[test]
    fn stop_when_irregular_short_circuits() {
        // F7 next to a large disconnected block: after the irregularity is
        // found, remaining tasks are dropped and attributes stay open.
        let mut dense = vec![0i8; 8 * 9];
        let fano = [
            [1, 1, 0, 1],
            [1, 0, 1, 1],
            [0, 1, 1, 1],
        ];
        for (row, fano_row) in fano.iter().enumerate() {
            for (column, &value) in fano_row.iter().enumerate() {
                dense[row * 9 + column] = value;
            }
        }
        let cycle = [
            [1, 1, 0, 0, 0],
            [0, 1, 1, 0, 0],
            [0, 0, 1, 1, 0],
            [0, 0, 0, 1, 1],
            [1, 0, 0, 0, 1],
        ];
        for (row, cycle_row) in cycle.iter().enumerate() {
            for (column, &value) in cycle_row.iter().enumerate() {
                dense[(row + 3) * 9 + column + 4] = value;
            }
        }
        let matrix = TernaryMatrix::from_dense(8, 9, &dense);
        let params = DecompositionParams {
            stop_when_irregular: true,
            ..DecompositionParams::default()
        };
        let tree = decompose(&matrix, false, &params, None).unwrap();
        assert_eq!(tree.root_node().regularity, Some(false));
        assert!(tree.nodes.iter().any(|node| node.node_type == NodeType::Irregular));
    }

    #[test]
    fn wheel_permutations_stay_graphic() {
        use itertools::Itertools;
        let matrix = wheel3();
        for rows in (0..3usize).permutations(3) {
            for columns in (0..3usize).permutations(3) {
                let permuted = matrix.permute(&rows, &columns).unwrap();
                let tree = decompose_plain(&permuted);
                assert_eq!(tree.root_node().regularity, Some(true));
                assert_eq!(tree.root_node().graphicness, Some(true));
            }
        }
    }

    #[test]
    fn random_pivots_preserve_regularity() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;
        let matrix = TernaryMatrix::from_dense(
            4,
            4,
            &[
                1, 1, 0, 0, //
                0, 1, 1, 0, //
                0, 0, 1, 1, //
                1, 0, 0, 1,
            ],
        );
        let mut rng = StdRng::seed_from_u64(5);
        let pivoted = unimod_common::random::random_binary_pivots(&matrix, 3, &mut rng).unwrap();
        let tree = decompose_plain(&pivoted);
        assert_eq!(tree.root_node().regularity, Some(true));
    }

    #[test]
    fn stats_count_the_phases() {
        let mut stats = DecompositionStats::default();
        let _ = decompose(&wheel3(), false, &DecompositionParams::default(), Some(&mut stats)).unwrap();
        assert!(stats.total_count >= 2);
        assert!(stats.one_separation_count >= 1);
        assert!(stats.direct_graphic_count >= 1);
    }

    #[test]
    fn time_limit_is_honored() {
        let params = DecompositionParams {
            time_limit: Some(Duration::from_nanos(0)),
            ..DecompositionParams::default()
        };
        std::thread::sleep(Duration::from_millis(1));
        let result = decompose(&wheel3(), false, &params, None);
        assert_eq!(result.unwrap_err(), RecognitionError::Timeout);
    }
}
