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

//! Undirected multigraph stored as a doubly-linked node list and per-node
//! incidence lists of half-arcs. An edge `e` owns the two half-arcs `2e`
//! and `2e+1`, so the twin of an arc is found by XOR with 1. Free slots
//! form LIFO free lists; deleting an edge and adding one immediately after
//! reuses the same edge id, which the graph surgery in the sequence tester
//! relies on.

pub const NONE: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct NodeData {
    prev: usize,
    next: usize,
    first_out: usize,
}

#[derive(Debug, Clone, Copy)]
struct ArcData {
    /// Head of the arc; the tail is the head of the twin.
    target: usize,
    prev: usize,
    next: usize,
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<NodeData>,
    arcs: Vec<ArcData>,
    first_node: usize,
    free_node: usize,
    free_edge: usize,
    num_nodes: usize,
    num_edges: usize,
}

impl Graph {
    pub fn with_capacity(mem_nodes: usize, mem_edges: usize) -> Self {
        let mem_nodes = mem_nodes.max(1);
        let mem_edges = mem_edges.max(1);
        let mut graph = Self {
            nodes: vec![
                NodeData {
                    prev: NONE,
                    next: NONE,
                    first_out: NONE
                };
                mem_nodes
            ],
            arcs: vec![
                ArcData {
                    target: NONE,
                    prev: NONE,
                    next: NONE
                };
                2 * mem_edges
            ],
            first_node: NONE,
            free_node: 0,
            free_edge: 0,
            num_nodes: 0,
            num_edges: 0,
        };
        for node in 0..mem_nodes {
            graph.nodes[node].next = if node + 1 < mem_nodes { node + 1 } else { NONE };
        }
        for edge in 0..mem_edges {
            graph.arcs[2 * edge].next = if edge + 1 < mem_edges { edge + 1 } else { NONE };
        }
        graph
    }

    pub fn new() -> Self {
        Self::with_capacity(8, 8)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Upper bound on node ids ever handed out (for sizing per-node arrays).
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Upper bound on edge ids ever handed out (for sizing per-edge arrays).
    pub fn edge_capacity(&self) -> usize {
        self.arcs.len() / 2
    }

    pub fn add_node(&mut self) -> usize {
        if self.free_node == NONE {
            let old = self.nodes.len();
            let grown = 2 * old;
            self.nodes.resize(
                grown,
                NodeData {
                    prev: NONE,
                    next: NONE,
                    first_out: NONE,
                },
            );
            for node in old..grown {
                self.nodes[node].next = if node + 1 < grown { node + 1 } else { NONE };
            }
            self.free_node = old;
        }
        let node = self.free_node;
        self.free_node = self.nodes[node].next;
        self.num_nodes += 1;
        self.nodes[node].first_out = NONE;
        self.nodes[node].prev = NONE;
        self.nodes[node].next = self.first_node;
        if self.first_node != NONE {
            self.nodes[self.first_node].prev = node;
        }
        self.first_node = node;
        node
    }

    pub fn add_edge(&mut self, u: usize, v: usize) -> usize {
        if self.free_edge == NONE {
            let old = self.arcs.len() / 2;
            let grown = 2 * old;
            self.arcs.resize(
                2 * grown,
                ArcData {
                    target: NONE,
                    prev: NONE,
                    next: NONE,
                },
            );
            for edge in old..grown {
                self.arcs[2 * edge].next = if edge + 1 < grown { edge + 1 } else { NONE };
            }
            self.free_edge = old;
        }
        let edge = self.free_edge;
        self.free_edge = self.arcs[2 * edge].next;
        self.num_edges += 1;

        let arc = 2 * edge;
        self.arcs[arc].target = v;
        self.link_arc(u, arc);
        let twin = arc + 1;
        self.arcs[twin].target = u;
        self.link_arc(v, twin);
        edge
    }

    fn link_arc(&mut self, source: usize, arc: usize) {
        let first = self.nodes[source].first_out;
        self.arcs[arc].prev = NONE;
        self.arcs[arc].next = first;
        if first != NONE {
            self.arcs[first].prev = arc;
        }
        self.nodes[source].first_out = arc;
    }

    fn unlink_arc(&mut self, source: usize, arc: usize) {
        let prev = self.arcs[arc].prev;
        let next = self.arcs[arc].next;
        if prev != NONE {
            self.arcs[prev].next = next;
        } else {
            self.nodes[source].first_out = next;
        }
        if next != NONE {
            self.arcs[next].prev = prev;
        }
    }

    pub fn delete_edge(&mut self, edge: usize) {
        let arc = 2 * edge;
        let u = self.arcs[arc + 1].target;
        let v = self.arcs[arc].target;
        self.unlink_arc(u, arc);
        self.unlink_arc(v, arc + 1);
        self.arcs[arc].next = self.free_edge;
        self.free_edge = edge;
        self.num_edges -= 1;
    }

    pub fn delete_node(&mut self, node: usize) {
        while self.nodes[node].first_out != NONE {
            let edge = self.nodes[node].first_out / 2;
            self.delete_edge(edge);
        }
        let prev = self.nodes[node].prev;
        let next = self.nodes[node].next;
        if prev != NONE {
            self.nodes[prev].next = next;
        } else {
            self.first_node = next;
        }
        if next != NONE {
            self.nodes[next].prev = prev;
        }
        self.nodes[node].next = self.free_node;
        self.free_node = node;
        self.num_nodes -= 1;
    }

    /// One endpoint of `edge` (the tail of its even arc).
    pub fn edge_u(&self, edge: usize) -> usize {
        self.arcs[2 * edge + 1].target
    }

    /// The other endpoint of `edge` (the head of its even arc).
    pub fn edge_v(&self, edge: usize) -> usize {
        self.arcs[2 * edge].target
    }

    /// The endpoint of `edge` that is not `node`; for loops returns `node`.
    pub fn edge_other(&self, edge: usize, node: usize) -> usize {
        let u = self.edge_u(edge);
        if u == node { self.edge_v(edge) } else { u }
    }

    /// Live nodes in list order (most recently added first).
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        NodeIter {
            graph: self,
            current: self.first_node,
        }
    }

    /// Arcs leaving `node`; the arc's edge is `arc / 2`, its head is
    /// [`Self::arc_target`].
    pub fn incident_arcs(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        ArcIter {
            graph: self,
            current: self.nodes[node].first_out,
        }
    }

    /// Edges incident to `node` (loops appear twice).
    pub fn incident_edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.incident_arcs(node).map(|arc| arc / 2)
    }

    pub fn arc_target(&self, arc: usize) -> usize {
        self.arcs[arc].target
    }

    /// All live edges (each once, including loops).
    pub fn edges(&self) -> Vec<usize> {
        let mut result = Vec::with_capacity(self.num_edges);
        for node in self.nodes() {
            for arc in self.incident_arcs(node) {
                if arc % 2 == 0 {
                    result.push(arc / 2);
                }
            }
        }
        result
    }

    pub fn degree(&self, node: usize) -> usize {
        self.incident_arcs(node).count()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

struct NodeIter<'a> {
    graph: &'a Graph,
    current: usize,
}

impl Iterator for NodeIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current == NONE {
            return None;
        }
        let node = self.current;
        self.current = self.graph.nodes[node].next;
        Some(node)
    }
}

struct ArcIter<'a> {
    graph: &'a Graph,
    current: usize,
}

impl Iterator for ArcIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current == NONE {
            return None;
        }
        let arc = self.current;
        self.current = self.graph.arcs[arc].next;
        Some(arc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_delete_edges() {
        let mut graph = Graph::with_capacity(4, 4);
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        let ab = graph.add_edge(a, b);
        let bc = graph.add_edge(b, c);
        assert_eq!(graph.num_nodes(), 3);
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.edge_u(ab), a);
        assert_eq!(graph.edge_v(ab), b);
        assert_eq!(graph.degree(b), 2);

        graph.delete_edge(ab);
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.degree(b), 1);
        assert_eq!(graph.edges(), vec![bc]);
    }

    #[test]
    fn deleted_edge_id_is_reused_first() {
        let mut graph = Graph::with_capacity(4, 4);
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        let ab = graph.add_edge(a, b);
        let _bc = graph.add_edge(b, c);
        graph.delete_edge(ab);
        let ac = graph.add_edge(a, c);
        assert_eq!(ac, ab);
        assert_eq!(graph.edge_u(ac), a);
        assert_eq!(graph.edge_v(ac), c);
    }

    #[test]
    fn delete_node_removes_incident_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let b = graph.add_node();
        let c = graph.add_node();
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, c);
        graph.delete_node(a);
        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.num_edges(), 1);
    }

    #[test]
    fn loops_are_counted_once_in_edges() {
        let mut graph = Graph::new();
        let a = graph.add_node();
        let aa = graph.add_edge(a, a);
        assert_eq!(graph.edges(), vec![aa]);
        assert_eq!(graph.edge_other(aa, a), a);
        assert_eq!(graph.degree(a), 2);
    }

    #[test]
    fn growth_beyond_capacity() {
        let mut graph = Graph::with_capacity(1, 1);
        let nodes: Vec<usize> = (0..10).map(|_| graph.add_node()).collect();
        for window in nodes.windows(2) {
            graph.add_edge(window[0], window[1]);
        }
        assert_eq!(graph.num_nodes(), 10);
        assert_eq!(graph.num_edges(), 9);
    }
}
