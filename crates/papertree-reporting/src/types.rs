use std::fmt;
use std::str::FromStr;

use papertree_core::{GraphSnapshot, Paper, QueryNode};
use serde::Serialize;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Markdown => "Markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(format!("unknown export format {other:?} (expected json or markdown)")),
        }
    }
}

/// A snapshot in the backend's non-streaming tree-response shape.
#[derive(Debug, Serialize)]
pub struct TreeReport<'a> {
    pub original_query: &'a str,
    pub research_goal: &'a str,
    pub query_nodes: Vec<ReportNode<'a>>,
    pub total_papers: usize,
    pub total_unique_papers: usize,
}

#[derive(Debug, Serialize)]
pub struct ReportNode<'a> {
    pub query: &'a str,
    pub description: &'a str,
    pub papers: Vec<&'a Paper>,
    pub paper_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> TreeReport<'a> {
    pub fn from_snapshot(snapshot: &'a GraphSnapshot) -> Self {
        Self {
            original_query: snapshot.original_query.as_deref().unwrap_or_default(),
            research_goal: &snapshot.research_goal,
            query_nodes: snapshot.query_nodes.iter().map(ReportNode::from_node).collect(),
            total_papers: snapshot.total_papers_referenced,
            total_unique_papers: snapshot.total_unique_papers,
        }
    }
}

impl<'a> ReportNode<'a> {
    fn from_node(node: &'a QueryNode) -> Self {
        Self {
            query: &node.query,
            description: &node.description,
            papers: node.papers.iter().map(|p| p.as_ref()).collect(),
            paper_count: node.paper_count(),
            error: node.error.as_deref(),
        }
    }
}
