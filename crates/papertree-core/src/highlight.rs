//! Hover-driven emphasis of the one-hop neighbourhood of a node.

use std::collections::HashSet;

use crate::graph::NodeId;
use crate::layout::Connection;

/// What kind of node is hovered. Decides which edges count as related.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Goal,
    Query,
    Paper,
}

impl NodeRole {
    pub fn of(node: &NodeId) -> Self {
        match node {
            NodeId::Goal => Self::Goal,
            NodeId::Query(_) => Self::Query,
            NodeId::Paper(_) => Self::Paper,
        }
    }
}

/// Nodes and edges to emphasize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub nodes: HashSet<NodeId>,
    pub edges: HashSet<String>,
}

impl Highlight {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn has_node(&self, node: &NodeId) -> bool {
        self.nodes.contains(node)
    }

    pub fn has_edge(&self, edge_id: &str) -> bool {
        self.edges.contains(edge_id)
    }
}

/// Compute the emphasis sets for `hovered` among `connections`.
///
/// A goal pulls in its outgoing edges, a paper its incoming edges, and a query
/// both. The hovered node itself is always included.
pub fn highlight(hovered: Option<&NodeId>, role: NodeRole, connections: &[Connection]) -> Highlight {
    let Some(hovered) = hovered else {
        return Highlight::default();
    };

    let (outgoing, incoming) = match role {
        NodeRole::Goal => (true, false),
        NodeRole::Query => (true, true),
        NodeRole::Paper => (false, true),
    };

    let mut related = Highlight::default();
    related.nodes.insert(hovered.clone());

    for connection in connections {
        if outgoing && &connection.source == hovered {
            related.edges.insert(connection.id.clone());
            related.nodes.insert(connection.target.clone());
        }
        if incoming && &connection.target == hovered {
            related.edges.insert(connection.id.clone());
            related.nodes.insert(connection.source.clone());
        }
    }

    related
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::graph::GraphStateBuilder;
    use crate::graph::tests::{papers, queries};
    use crate::layout::{Rect, connect};

    fn connections() -> Vec<Connection> {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1", "q2", "q3"]));
        builder.apply(&papers("q1", &["a1"]));
        builder.apply(&papers("q2", &["a1", "a2"]));
        let snap = builder.apply(&papers("q3", &["a3"]));
        let mut rects = HashMap::new();
        rects.insert(NodeId::Goal, Rect::new(0.0, 0.0, 1.0, 1.0));
        for (i, node) in snap.query_nodes.iter().enumerate() {
            rects.insert(node.node_id(), Rect::new(i as f64 * 10.0, 10.0, 1.0, 1.0));
        }
        for (i, paper) in snap.dedup_index.iter().enumerate() {
            rects.insert(
                NodeId::Paper(paper.arxiv_id.clone()),
                Rect::new(i as f64 * 10.0, 20.0, 1.0, 1.0),
            );
        }
        connect(&snap, &rects)
    }

    fn set<const N: usize>(nodes: [NodeId; N]) -> HashSet<NodeId> {
        nodes.into_iter().collect()
    }

    fn paper(id: &str) -> NodeId {
        NodeId::Paper(id.into())
    }

    #[test]
    fn no_hover_is_empty() {
        let hl = highlight(None, NodeRole::Query, &connections());
        assert!(hl.is_empty());
    }

    #[test]
    fn goal_reaches_its_queries() {
        let hl = highlight(Some(&NodeId::Goal), NodeRole::Goal, &connections());
        assert_eq!(
            hl.nodes,
            set([NodeId::Goal, NodeId::Query(0), NodeId::Query(1), NodeId::Query(2)])
        );
        assert_eq!(hl.edges.len(), 3);
        assert!(hl.has_edge("goal->query-1"));
    }

    #[test]
    fn query_reaches_goal_and_its_papers() {
        let hl = highlight(Some(&NodeId::Query(1)), NodeRole::Query, &connections());
        assert_eq!(
            hl.nodes,
            set([NodeId::Goal, NodeId::Query(1), paper("a1"), paper("a2")])
        );
        let mut edges: Vec<_> = hl.edges.iter().map(String::as_str).collect();
        edges.sort_unstable();
        assert_eq!(
            edges,
            ["goal->query-1", "query-1->paper-a1", "query-1->paper-a2"]
        );
    }

    #[test]
    fn shared_paper_reaches_every_citing_query() {
        let connections = connections();
        let hl = highlight(Some(&paper("a1")), NodeRole::Paper, &connections);
        let expected: HashSet<NodeId> = connections
            .iter()
            .filter(|c| c.target == paper("a1"))
            .map(|c| c.source.clone())
            .chain([paper("a1")])
            .collect();
        assert_eq!(hl.nodes, expected);
        assert_eq!(hl.nodes, set([paper("a1"), NodeId::Query(0), NodeId::Query(1)]));
        assert!(!hl.has_node(&NodeId::Goal));
    }

    #[test]
    fn unrendered_node_still_highlights_itself() {
        let hl = highlight(Some(&paper("zzz")), NodeRole::Paper, &connections());
        assert_eq!(hl.nodes, set([paper("zzz")]));
        assert!(hl.edges.is_empty());
    }
}
