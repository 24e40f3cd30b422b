//! Folding stream events into versioned, immutable graph snapshots.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::event::{Paper, PapersEvent, QueriesEvent, StreamEvent};

/// Search state of a single query node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    Pending,
    Searching,
    Done,
    Error,
}

impl QueryStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Searching => "searching",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// Logical identity of a node in the research tree.
///
/// Paper nodes are keyed by arXiv id, so one paper returned by several queries
/// is a single node with several incoming edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Goal,
    Query(usize),
    Paper(String),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goal => write!(f, "goal"),
            Self::Query(slot) => write!(f, "query-{slot}"),
            Self::Paper(arxiv_id) => write!(f, "paper-{arxiv_id}"),
        }
    }
}

/// One generated sub-query and the papers it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    /// Slot index within [`GraphSnapshot::query_nodes`].
    pub id: usize,
    pub query: String,
    pub description: String,
    pub papers: Vec<Arc<Paper>>,
    pub status: QueryStatus,
    pub error: Option<String>,
    /// Set once any papers event has been merged into this node.
    pub received: bool,
}

impl QueryNode {
    fn new(id: usize, query: String, description: String) -> Self {
        Self {
            id,
            query,
            description,
            papers: Vec::new(),
            status: QueryStatus::Pending,
            error: None,
            received: false,
        }
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::Query(self.id)
    }

    pub fn paper_count(&self) -> usize {
        self.papers.len()
    }
}

/// arXiv id → first-seen paper, iterable in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupIndex {
    by_id: HashMap<String, Arc<Paper>>,
    order: Vec<String>,
}

impl DedupIndex {
    /// Insert unless the id is already known. Returns whether it was new.
    pub fn insert_first(&mut self, paper: &Arc<Paper>) -> bool {
        if self.by_id.contains_key(&paper.arxiv_id) {
            return false;
        }
        self.order.push(paper.arxiv_id.clone());
        self.by_id.insert(paper.arxiv_id.clone(), Arc::clone(paper));
        true
    }

    pub fn get(&self, arxiv_id: &str) -> Option<&Arc<Paper>> {
        self.by_id.get(arxiv_id)
    }

    pub fn contains(&self, arxiv_id: &str) -> bool {
        self.by_id.contains_key(arxiv_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Paper>> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

/// The whole graph at one point in time. Never mutated once published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub version: u64,
    pub original_query: Option<String>,
    pub research_goal: String,
    pub query_nodes: Vec<QueryNode>,
    pub dedup_index: DedupIndex,
    pub total_papers_referenced: usize,
    pub total_unique_papers: usize,
    pub average_unique_papers_per_query: f64,
}

impl GraphSnapshot {
    pub fn query(&self, slot: usize) -> Option<&QueryNode> {
        self.query_nodes.get(slot)
    }

    pub fn paper(&self, arxiv_id: &str) -> Option<&Arc<Paper>> {
        self.dedup_index.get(arxiv_id)
    }

    pub fn is_empty(&self) -> bool {
        self.research_goal.is_empty() && self.query_nodes.is_empty()
    }

    /// Query nodes whose paper list contains the given paper.
    pub fn queries_citing<'a>(&'a self, arxiv_id: &'a str) -> impl Iterator<Item = &'a QueryNode> {
        self.query_nodes
            .iter()
            .filter(move |node| node.papers.iter().any(|p| p.arxiv_id == arxiv_id))
    }

    fn recompute_totals(&mut self) {
        self.total_papers_referenced = self.query_nodes.iter().map(|n| n.papers.len()).sum();
        self.total_unique_papers = self.dedup_index.len();
        let received = self.query_nodes.iter().filter(|n| n.received).count();
        self.average_unique_papers_per_query = if received == 0 {
            0.0
        } else {
            self.total_unique_papers as f64 / received as f64
        };
    }
}

/// Folds events into a sequence of snapshots, each a new `Arc`.
#[derive(Debug, Default)]
pub struct GraphStateBuilder {
    current: Arc<GraphSnapshot>,
}

impl GraphStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently built snapshot.
    pub fn current(&self) -> &Arc<GraphSnapshot> {
        &self.current
    }

    /// Start a new search: an empty graph at the next version.
    pub fn reset(&mut self) -> Arc<GraphSnapshot> {
        let next = GraphSnapshot {
            version: self.current.version + 1,
            ..GraphSnapshot::default()
        };
        self.current = Arc::new(next);
        Arc::clone(&self.current)
    }

    /// Merge one event and return the resulting snapshot.
    pub fn apply(&mut self, event: &StreamEvent) -> Arc<GraphSnapshot> {
        let mut next = GraphSnapshot::clone(&self.current);
        next.version += 1;

        match event {
            StreamEvent::Queries(queries) => apply_queries(&mut next, queries),
            StreamEvent::Papers(papers) => apply_papers(&mut next, papers),
        }
        next.recompute_totals();

        log::debug!(
            "graph v{}: {} queries, {} referenced, {} unique",
            next.version,
            next.query_nodes.len(),
            next.total_papers_referenced,
            next.total_unique_papers
        );

        self.current = Arc::new(next);
        Arc::clone(&self.current)
    }
}

fn apply_queries(graph: &mut GraphSnapshot, event: &QueriesEvent) {
    graph.research_goal = event.research_goal.clone();
    if event.original_query.is_some() {
        graph.original_query = event.original_query.clone();
    }
    graph.query_nodes = event
        .queries
        .iter()
        .enumerate()
        .map(|(slot, plan)| QueryNode::new(slot, plan.query.clone(), plan.description.clone()))
        .collect();
}

fn apply_papers(graph: &mut GraphSnapshot, event: &PapersEvent) {
    // Exact text match: the backend echoes the announced query verbatim.
    let slot = match graph.query_nodes.iter().position(|n| n.query == event.query) {
        Some(slot) => slot,
        None => {
            let slot = graph.query_nodes.len();
            log::debug!("papers for unannounced query {:?}, adding slot {slot}", event.query);
            graph.query_nodes.push(QueryNode::new(
                slot,
                event.query.clone(),
                event.description.clone(),
            ));
            slot
        }
    };

    let papers: Vec<Arc<Paper>> = event.papers.iter().cloned().map(Arc::new).collect();
    for paper in &papers {
        graph.dedup_index.insert_first(paper);
    }

    let node = &mut graph.query_nodes[slot];
    node.description = event.description.clone();
    node.papers = papers;
    node.received = true;
    node.error = event.error.clone();
    node.status = if event.error.is_some() {
        QueryStatus::Error
    } else {
        QueryStatus::Done
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::event::QueryPlan;

    pub(crate) fn paper(arxiv_id: &str, score: Option<f64>) -> Paper {
        Paper {
            arxiv_id: arxiv_id.to_string(),
            title: format!("Paper {arxiv_id}"),
            authors: vec!["Ada Lovelace".into()],
            published_date: "2024-03-01".into(),
            categories: ["cs.LG".to_string()].into_iter().collect(),
            relevance_score: score,
            relevance_explanation: None,
            abstract_text: String::new(),
            url: format!("https://arxiv.org/abs/{arxiv_id}"),
        }
    }

    pub(crate) fn queries(goal: &str, queries: &[&str]) -> StreamEvent {
        StreamEvent::Queries(QueriesEvent {
            original_query: None,
            research_goal: goal.to_string(),
            queries: queries
                .iter()
                .map(|q| QueryPlan {
                    query: q.to_string(),
                    description: format!("about {q}"),
                })
                .collect(),
        })
    }

    pub(crate) fn papers(query: &str, ids: &[&str]) -> StreamEvent {
        StreamEvent::Papers(PapersEvent {
            query: query.to_string(),
            description: format!("about {query}"),
            papers: ids.iter().map(|id| paper(id, Some(0.5))).collect(),
            error: None,
        })
    }

    fn ids(node: &QueryNode) -> Vec<&str> {
        node.papers.iter().map(|p| p.arxiv_id.as_str()).collect()
    }

    #[test]
    fn scenario_two_queries_shared_paper() {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1", "q2"]));
        builder.apply(&papers("q1", &["a1"]));
        let snap = builder.apply(&papers("q2", &["a1", "a2"]));

        assert_eq!(snap.research_goal, "G");
        assert_eq!(snap.total_unique_papers, 2);
        assert_eq!(snap.total_papers_referenced, 3);
        assert_eq!(ids(&snap.query_nodes[0]), ["a1"]);
        assert_eq!(ids(&snap.query_nodes[1]), ["a1", "a2"]);
        assert!((snap.average_unique_papers_per_query - 1.0).abs() < f64::EPSILON);
        assert!(snap.query_nodes.iter().all(|n| n.status == QueryStatus::Done));
    }

    #[test]
    fn queries_event_creates_pending_nodes_in_order() {
        let mut builder = GraphStateBuilder::new();
        let snap = builder.apply(&queries("G", &["b", "a", "c"]));
        let texts: Vec<_> = snap.query_nodes.iter().map(|n| n.query.as_str()).collect();
        assert_eq!(texts, ["b", "a", "c"]);
        assert!(snap.query_nodes.iter().all(|n| n.status == QueryStatus::Pending));
        assert_eq!(snap.query_nodes[2].id, 2);
        assert_eq!(snap.average_unique_papers_per_query, 0.0);
    }

    #[test]
    fn first_write_wins_in_dedup_index() {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1", "q2"]));
        builder.apply(&StreamEvent::Papers(PapersEvent {
            query: "q1".into(),
            description: String::new(),
            papers: vec![paper("a1", Some(0.2))],
            error: None,
        }));
        let snap = builder.apply(&StreamEvent::Papers(PapersEvent {
            query: "q2".into(),
            description: String::new(),
            papers: vec![paper("a1", Some(0.9))],
            error: None,
        }));
        assert_eq!(snap.paper("a1").unwrap().relevance_score, Some(0.2));
        // The node keeps what its own event carried.
        assert_eq!(snap.query_nodes[1].papers[0].relevance_score, Some(0.9));
    }

    #[test]
    fn repeated_papers_event_replaces_node_content() {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1"]));
        builder.apply(&papers("q1", &["a1", "a2"]));
        let snap = builder.apply(&papers("q1", &["a3"]));
        assert_eq!(ids(&snap.query_nodes[0]), ["a3"]);
        assert_eq!(snap.total_papers_referenced, 1);
        assert_eq!(snap.total_unique_papers, 3);
    }

    #[test]
    fn unannounced_query_is_appended() {
        let mut builder = GraphStateBuilder::new();
        let snap = builder.apply(&papers("orphan", &["x"]));
        assert_eq!(snap.query_nodes.len(), 1);
        assert_eq!(snap.query_nodes[0].query, "orphan");
        assert_eq!(snap.query_nodes[0].status, QueryStatus::Done);

        builder.apply(&queries("G", &["q1"]));
        let snap = builder.apply(&papers("late", &[]));
        assert_eq!(snap.query_nodes.len(), 2);
        assert_eq!(snap.query_nodes[1].id, 1);
    }

    #[test]
    fn error_flag_marks_node_and_still_merges() {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1"]));
        let snap = builder.apply(&StreamEvent::Papers(PapersEvent {
            query: "q1".into(),
            description: "d".into(),
            papers: vec![paper("a1", None)],
            error: Some("arXiv timeout".into()),
        }));
        let node = &snap.query_nodes[0];
        assert_eq!(node.status, QueryStatus::Error);
        assert_eq!(node.error.as_deref(), Some("arXiv timeout"));
        assert_eq!(snap.total_unique_papers, 1);
    }

    #[test]
    fn published_snapshots_are_never_mutated() {
        let mut builder = GraphStateBuilder::new();
        let first = builder.apply(&queries("G", &["q1"]));
        let second = builder.apply(&papers("q1", &["a1"]));
        assert!(first.query_nodes[0].papers.is_empty());
        assert_eq!(first.version + 1, second.version);
        assert_eq!(second.query_nodes[0].papers.len(), 1);
    }

    #[test]
    fn totals_hold_for_any_arrival_order() {
        let events = [
            papers("q2", &["a1", "a2"]),
            queries("G", &["q1", "q2", "q3"]),
            papers("q3", &["a2", "a3", "a3"]),
            papers("q1", &["a4"]),
            papers("q2", &["a5"]),
        ];
        let mut builder = GraphStateBuilder::new();
        let mut seen = std::collections::HashSet::new();
        for event in &events {
            if let StreamEvent::Papers(p) = event {
                seen.extend(p.papers.iter().map(|p| p.arxiv_id.clone()));
            }
            let snap = builder.apply(event);
            let referenced: usize = snap.query_nodes.iter().map(|n| n.papers.len()).sum();
            assert_eq!(snap.total_papers_referenced, referenced);
            assert_eq!(snap.total_unique_papers, seen.len());
            assert_eq!(snap.dedup_index.len(), seen.len());
        }
    }

    #[test]
    fn reset_starts_empty_at_next_version() {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&queries("G", &["q1"]));
        let before = builder.current().version;
        let snap = builder.reset();
        assert!(snap.is_empty());
        assert_eq!(snap.version, before + 1);
    }
}
