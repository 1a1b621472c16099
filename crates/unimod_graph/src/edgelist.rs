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

//! Reader and writer for the edge-list format: one `u v tag` line per edge,
//! where `u` and `v` are arbitrary string node names and the tag encodes the
//! matrix line of the edge (`r<k>` for rows, `c<k>` for columns, bare
//! integers with sign, anything else for a fresh unnamed edge).

use std::io::{BufRead, Write};

use regex::Regex;
use unimod_common::hashing::KeyedHashTable;
use unimod_common::{Element, MatrixError};

use crate::graph::Graph;

pub struct EdgeList {
    pub graph: Graph,
    /// Matrix element of each edge (invalid for unnamed edges).
    pub edge_elements: Vec<Element>,
    /// Node names in node-id order.
    pub node_labels: Vec<(usize, String)>,
}

/// Parses an edge list. Node names are interned through the keyed-bytes
/// table; unknown tags are tolerated and yield edges without elements.
pub fn read_edge_list(reader: &mut dyn BufRead) -> Result<EdgeList, MatrixError> {
    let tag_pattern = Regex::new(r"^([rc])([0-9]+)$").expect("pattern is valid");
    let mut graph = Graph::new();
    let mut names = KeyedHashTable::new(64);
    let mut node_labels = Vec::new();
    let mut edge_elements = Vec::new();

    let mut intern = |graph: &mut Graph, labels: &mut Vec<(usize, String)>, name: &str| -> usize {
        match names.get(name.as_bytes()) {
            Some(node) => node,
            None => {
                let node = graph.add_node();
                names.insert(name.as_bytes(), node);
                labels.push((node, name.to_string()));
                node
            }
        }
    };

    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .map_err(|error| MatrixError::invalid(format!("cannot read edge list: {error}")))?;
        if bytes == 0 {
            break;
        }
        let content = match line.find('#') {
            Some(position) => &line[..position],
            None => line.as_str(),
        };
        let mut tokens = content.split_whitespace();
        let Some(u_name) = tokens.next() else {
            continue;
        };
        let v_name = tokens
            .next()
            .ok_or_else(|| MatrixError::invalid(format!("edge line '{line}' misses the second node")))?;
        let tag = tokens.next();

        let u = intern(&mut graph, &mut node_labels, u_name);
        let v = intern(&mut graph, &mut node_labels, v_name);
        let edge = graph.add_edge(u, v);
        if edge_elements.len() <= edge {
            edge_elements.resize(edge + 1, Element(0));
        }
        edge_elements[edge] = match tag {
            Some(tag) => {
                if let Some(captures) = tag_pattern.captures(tag) {
                    let index: usize = captures[2]
                        .parse()
                        .map_err(|_| MatrixError::invalid(format!("bad edge tag '{tag}'")))?;
                    if index == 0 {
                        return Err(MatrixError::invalid(format!("edge tag '{tag}' is not 1-based")));
                    }
                    if &captures[1] == "r" {
                        Element::from_row(index - 1)
                    } else {
                        Element::from_column(index - 1)
                    }
                } else if let Ok(value) = tag.parse::<i64>() {
                    // Bare integer: positive means column, negative means row.
                    if value > 0 {
                        Element::from_column(value as usize - 1)
                    } else if value < 0 {
                        Element::from_row((-value) as usize - 1)
                    } else {
                        Element(0)
                    }
                } else {
                    Element(0)
                }
            }
            None => Element(0),
        };
    }

    Ok(EdgeList {
        graph,
        edge_elements,
        node_labels,
    })
}

/// Writes the edges as `u v tag` lines, rows tagged `r<k>` and columns
/// `c<k>`.
pub fn write_edge_list(
    graph: &Graph,
    edge_elements: &[Element],
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    let mut edges = graph.edges();
    edges.sort_unstable();
    for edge in edges {
        let u = graph.edge_u(edge);
        let v = graph.edge_v(edge);
        let element = edge_elements.get(edge).copied().unwrap_or(Element(0));
        if element.is_valid() {
            writeln!(writer, "v{u} v{v} {element}")?;
        } else {
            writeln!(writer, "v{u} v{v} e{edge}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_interns_nodes() {
        let input = "a b r1\nb c c2\nc a 3\na c -4\nc b weird\n";
        let edge_list = read_edge_list(&mut input.as_bytes()).unwrap();
        assert_eq!(edge_list.graph.num_nodes(), 3);
        assert_eq!(edge_list.graph.num_edges(), 5);
        let elements: Vec<Element> = edge_list.edge_elements.clone();
        assert!(elements.contains(&Element::from_row(0)));
        assert!(elements.contains(&Element::from_column(1)));
        assert!(elements.contains(&Element::from_column(2)));
        assert!(elements.contains(&Element::from_row(3)));
        assert!(elements.contains(&Element(0)));
    }

    #[test]
    fn round_trip_preserves_elements() {
        let input = "a b r1\nb c c1\nc a r2\n";
        let edge_list = read_edge_list(&mut input.as_bytes()).unwrap();
        let mut output = Vec::new();
        write_edge_list(&edge_list.graph, &edge_list.edge_elements, &mut output).unwrap();
        let reread = read_edge_list(&mut output.as_slice()).unwrap();
        let mut a: Vec<Element> = edge_list.edge_elements.iter().copied().filter(|e| e.is_valid()).collect();
        let mut b: Vec<Element> = reread.edge_elements.iter().copied().filter(|e| e.is_valid()).collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_endpoint_is_an_error() {
        assert!(read_edge_list(&mut "lonely\n".as_bytes()).is_err());
    }
}
