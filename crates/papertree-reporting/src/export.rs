use std::fmt::Write;

use papertree_core::filter::ranked_papers;
use papertree_core::{GraphSnapshot, Paper, QueryStatus, RelevanceTier};

use crate::types::{ExportFormat, TreeReport};

/// Render `snapshot` in the requested format.
pub fn export(snapshot: &GraphSnapshot, format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => export_json(snapshot),
        ExportFormat::Markdown => Ok(export_markdown(snapshot)),
    }
}

/// Pretty-printed JSON in the tree-response shape.
pub fn export_json(snapshot: &GraphSnapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&TreeReport::from_snapshot(snapshot))
}

/// Markdown summary: one section per query, papers ranked by relevance.
pub fn export_markdown(snapshot: &GraphSnapshot) -> String {
    let mut out = String::new();

    let goal = if snapshot.research_goal.is_empty() {
        "(no research goal yet)"
    } else {
        snapshot.research_goal.as_str()
    };
    let _ = writeln!(out, "# Research tree: {}\n", escape_inline(goal));
    if let Some(query) = &snapshot.original_query {
        let _ = writeln!(out, "**Query:** {}\n", escape_inline(query));
    }
    let _ = writeln!(
        out,
        "**Papers:** {} unique, {} referenced across {} queries\n",
        snapshot.total_unique_papers,
        snapshot.total_papers_referenced,
        snapshot.query_nodes.len()
    );

    for node in &snapshot.query_nodes {
        let _ = writeln!(out, "## {}. {}\n", node.id + 1, escape_inline(&node.query));
        if !node.description.is_empty() {
            let _ = writeln!(out, "{}\n", escape_inline(&node.description));
        }
        match node.status {
            QueryStatus::Error => {
                let reason = node.error.as_deref().unwrap_or("unknown error");
                let _ = writeln!(out, "> Search failed: {}\n", escape_inline(reason));
            }
            QueryStatus::Pending | QueryStatus::Searching => {
                let _ = writeln!(out, "_Results pending._\n");
                continue;
            }
            QueryStatus::Done => {}
        }

        if node.papers.is_empty() {
            let _ = writeln!(out, "_No papers found._\n");
            continue;
        }

        out.push_str("| # | Title | Relevance | Published | arXiv |\n");
        out.push_str("|---|-------|-----------|-----------|-------|\n");
        for (i, paper) in ranked_papers(node).iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                i + 1,
                escape_cell(&paper.title),
                score_cell(paper),
                paper.published_on().map(|d| d.to_string()).unwrap_or_default(),
                arxiv_cell(paper),
            );
        }
        out.push('\n');
    }

    out
}

fn score_cell(paper: &Paper) -> String {
    match paper.relevance_score {
        Some(score) => format!(
            "{:.2} ({})",
            score,
            RelevanceTier::of(Some(score)).label()
        ),
        None => "-".to_string(),
    }
}

fn arxiv_cell(paper: &Paper) -> String {
    if paper.url.is_empty() {
        escape_cell(&paper.arxiv_id)
    } else {
        format!("[{}]({})", escape_cell(&paper.arxiv_id), paper.url)
    }
}

fn escape_inline(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn escape_cell(s: &str) -> String {
    escape_inline(s).replace('|', "\\|")
}
