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

//! DOT output for graph certificates: forest edges are drawn solid and
//! coforest edges dashed; oriented graphs become digraphs with the arc
//! directions given by the reversal flags.

use std::io::Write;

use unimod_common::Element;

use crate::graph::Graph;
use crate::realize::Realization;

pub fn write_dot(
    graph: &Graph,
    edge_elements: &[Element],
    forest: &[usize],
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    let mut is_forest = vec![false; graph.edge_capacity()];
    for &edge in forest {
        is_forest[edge] = true;
    }
    writeln!(writer, "graph G {{")?;
    let mut edges = graph.edges();
    edges.sort_unstable();
    for edge in edges {
        let style = if is_forest[edge] { "solid" } else { "dashed" };
        let label = edge_elements
            .get(edge)
            .filter(|element| element.is_valid())
            .map(|element| element.to_string())
            .unwrap_or_else(|| format!("e{edge}"));
        writeln!(
            writer,
            "  v{} -- v{} [label=\"{}\",style={}];",
            graph.edge_u(edge),
            graph.edge_v(edge),
            label,
            style
        )?;
    }
    writeln!(writer, "}}")
}

/// DOT output of an oriented realization; reversed arcs point from `v` to
/// `u`.
pub fn write_dot_digraph(
    realization: &Realization,
    reversed: &[bool],
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    let graph = &realization.graph;
    let mut element_of = vec![Element(0); graph.edge_capacity()];
    for (row, &edge) in realization.forest_edges.iter().enumerate() {
        element_of[edge] = Element::from_row(row);
    }
    for (column, &edge) in realization.coforest_edges.iter().enumerate() {
        element_of[edge] = Element::from_column(column);
    }
    let mut is_forest = vec![false; graph.edge_capacity()];
    for &edge in &realization.forest_edges {
        is_forest[edge] = true;
    }

    writeln!(writer, "digraph G {{")?;
    let mut edges = graph.edges();
    edges.sort_unstable();
    for edge in edges {
        let (tail, head) = if reversed.get(edge).copied().unwrap_or(false) {
            (graph.edge_v(edge), graph.edge_u(edge))
        } else {
            (graph.edge_u(edge), graph.edge_v(edge))
        };
        let style = if is_forest[edge] { "solid" } else { "dashed" };
        writeln!(
            writer,
            "  v{} -> v{} [label=\"{}\",style={}];",
            tail, head, element_of[edge], style
        )?;
    }
    writeln!(writer, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_output_marks_forest_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let r = graph.add_edge(a, b);
        let c = graph.add_edge(a, b);
        let elements = {
            let mut elements = vec![Element(0); graph.edge_capacity()];
            elements[r] = Element::from_row(0);
            elements[c] = Element::from_column(0);
            elements
        };
        let mut output = Vec::new();
        write_dot(&graph, &elements, &[r], &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("graph G {"));
        assert!(text.contains("label=\"r1\",style=solid"));
        assert!(text.contains("label=\"c1\",style=dashed"));
    }
}
