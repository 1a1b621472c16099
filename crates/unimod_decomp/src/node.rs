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

//! The decomposition tree: an arena of nodes owned by the top-level call,
//! with children referenced by index and row/column maps into the parent.

use unimod_common::{Submatrix, TernaryMatrix};
use unimod_graph::realize::Realization;

use crate::nested::NestedMinorSequence;
use crate::series_parallel::SpOperation;

pub type NodeId = usize;

/// Verdict of a completed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    Unknown,
    Irregular,
    OneSum,
    TwoSum,
    /// A Seymour 3-sum; a concentrated-rank separation was redistributed by
    /// the recorded binary pivot first.
    ThreeSum {
        epsilon: i8,
        pivoted: Option<(usize, usize)>,
    },
    /// Fully reduced leaf, or an inner node with the reduced child.
    SeriesParallel,
    Graph,
    Cograph,
    Planar,
    R10,
}

/// Link from a parent to a child: for every child line the corresponding
/// parent line, with `usize::MAX` for marker lines introduced by a sum.
#[derive(Debug, Clone)]
pub struct ChildLink {
    pub node: NodeId,
    pub rows_to_parent: Vec<usize>,
    pub columns_to_parent: Vec<usize>,
}

/// Graph certificate of a leaf: the realization indexed by node lines
/// (forest edges by row, coforest edges by column for the graphic case;
/// swapped for the cographic case).
#[derive(Debug, Clone)]
pub struct GraphCertificate {
    pub realization: Realization,
    /// Arc reversal flags for the network case, filled in by the facade.
    pub arcs_reversed: Option<Vec<bool>>,
}

#[derive(Debug)]
pub struct DecompositionNode {
    pub matrix: TernaryMatrix,
    pub transpose: Option<TernaryMatrix>,
    pub is_ternary: bool,
    pub node_type: NodeType,
    pub regularity: Option<bool>,
    pub graphicness: Option<bool>,
    pub cographicness: Option<bool>,
    pub children: Vec<ChildLink>,
    /// Reductions recorded when this node reduced (partially) by
    /// series-parallel operations.
    pub sp_reductions: Vec<SpOperation>,
    /// W3 (or larger wheel) submatrix surviving the reduction.
    pub wheel: Option<Submatrix>,
    pub nested: Option<NestedMinorSequence>,
    pub graph: Option<GraphCertificate>,
    pub cograph: Option<GraphCertificate>,
    pub violator: Option<Submatrix>,
    pub tested_one_separation: bool,
    pub tested_r10: bool,
    pub tested_series_parallel: bool,
    pub last_graphic_minor: Option<usize>,
    pub last_cographic_minor: Option<usize>,
}

impl DecompositionNode {
    pub fn new(matrix: TernaryMatrix, is_ternary: bool) -> Self {
        Self {
            matrix,
            transpose: None,
            is_ternary,
            node_type: NodeType::Unknown,
            regularity: None,
            graphicness: None,
            cographicness: None,
            children: Vec::new(),
            sp_reductions: Vec::new(),
            wheel: None,
            nested: None,
            graph: None,
            cograph: None,
            violator: None,
            tested_one_separation: false,
            tested_r10: false,
            tested_series_parallel: false,
            last_graphic_minor: None,
            last_cographic_minor: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The whole tree, owned by the recognition call.
#[derive(Debug)]
pub struct DecompositionTree {
    pub nodes: Vec<DecompositionNode>,
    pub root: NodeId,
}

impl DecompositionTree {
    pub fn new(root_matrix: TernaryMatrix, is_ternary: bool) -> Self {
        Self {
            nodes: vec![DecompositionNode::new(root_matrix, is_ternary)],
            root: 0,
        }
    }

    pub fn add_node(&mut self, matrix: TernaryMatrix, is_ternary: bool) -> NodeId {
        self.nodes.push(DecompositionNode::new(matrix, is_ternary));
        self.nodes.len() - 1
    }

    pub fn root_node(&self) -> &DecompositionNode {
        &self.nodes[self.root]
    }

    /// Lazily computed transpose of a node's matrix.
    pub fn transpose_of(&mut self, node: NodeId) -> TernaryMatrix {
        if self.nodes[node].transpose.is_none() {
            self.nodes[node].transpose = Some(self.nodes[node].matrix.transpose());
        }
        self.nodes[node].transpose.clone().expect("just computed")
    }

    /// Derives regularity, graphicness and cographicness bottom-up. Leaves
    /// keep `None` when processing stopped early.
    pub fn set_attributes(&mut self) {
        self.set_attributes_recursive(self.root);
    }

    fn set_attributes_recursive(&mut self, node: NodeId) {
        let children: Vec<NodeId> = self.nodes[node].children.iter().map(|link| link.node).collect();
        for &child in &children {
            self.set_attributes_recursive(child);
        }

        let entry = &self.nodes[node];
        let (regularity, graphicness, cographicness) = match entry.node_type {
            NodeType::Unknown => (None, entry.graphicness, entry.cographicness),
            NodeType::Irregular => (Some(false), entry.graphicness, entry.cographicness),
            NodeType::Graph => (Some(true), Some(true), entry.cographicness),
            NodeType::Cograph => (Some(true), entry.graphicness, Some(true)),
            NodeType::Planar => (Some(true), Some(true), Some(true)),
            NodeType::R10 => (Some(true), Some(false), Some(false)),
            NodeType::SeriesParallel if children.is_empty() => (Some(true), Some(true), Some(true)),
            NodeType::SeriesParallel | NodeType::OneSum | NodeType::TwoSum => {
                // These sums preserve all three properties.
                (
                    combine(children.iter().map(|&child| self.nodes[child].regularity)),
                    combine(children.iter().map(|&child| self.nodes[child].graphicness)),
                    combine(children.iter().map(|&child| self.nodes[child].cographicness)),
                )
            }
            NodeType::ThreeSum { .. } => {
                // Regularity is preserved; (co)graphicness is not derivable
                // from the children.
                (
                    combine(children.iter().map(|&child| self.nodes[child].regularity)),
                    self.nodes[node].graphicness,
                    self.nodes[node].cographicness,
                )
            }
        };
        let entry = &mut self.nodes[node];
        entry.regularity = regularity;
        entry.graphicness = graphicness;
        entry.cographicness = cographicness;
    }
}

fn combine(values: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    let mut result = Some(true);
    for value in values {
        match value {
            Some(true) => {}
            Some(false) => return Some(false),
            None => result = None,
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_propagate_through_sums() {
        let wheel = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let mut tree = DecompositionTree::new(wheel.clone(), false);
        let left = tree.add_node(wheel.clone(), false);
        let right = tree.add_node(wheel, false);
        tree.nodes[left].node_type = NodeType::Graph;
        tree.nodes[right].node_type = NodeType::Irregular;
        tree.nodes[0].node_type = NodeType::TwoSum;
        tree.nodes[0].children = vec![
            ChildLink {
                node: left,
                rows_to_parent: vec![0, 1, 2],
                columns_to_parent: vec![0, 1, 2],
            },
            ChildLink {
                node: right,
                rows_to_parent: vec![0, 1, 2],
                columns_to_parent: vec![0, 1, 2],
            },
        ];
        tree.set_attributes();
        assert_eq!(tree.root_node().regularity, Some(false));
        assert_eq!(tree.nodes[left].regularity, Some(true));
        assert_eq!(tree.nodes[left].graphicness, Some(true));
    }

    #[test]
    fn unknown_children_leave_attributes_open() {
        let wheel = TernaryMatrix::from_dense(3, 3, &[1, 1, 0, 0, 1, 1, 1, 1, 1]);
        let mut tree = DecompositionTree::new(wheel.clone(), false);
        let child = tree.add_node(wheel, false);
        tree.nodes[0].node_type = NodeType::OneSum;
        tree.nodes[0].children = vec![ChildLink {
            node: child,
            rows_to_parent: vec![0, 1, 2],
            columns_to_parent: vec![0, 1, 2],
        }];
        tree.set_attributes();
        assert_eq!(tree.root_node().regularity, None);
    }
}
