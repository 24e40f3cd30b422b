use owo_colors::{OwoColorize, Style};

use papertree_core::filter::category_counts;
use papertree_core::{GraphSnapshot, Paper, PaperFilter, QueryNode, QueryStatus, RelevanceTier};

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn tier_style(tier: RelevanceTier) -> Style {
    match tier {
        RelevanceTier::High => Style::new().green().bold(),
        RelevanceTier::Medium => Style::new().yellow(),
        RelevanceTier::Low => Style::new().dimmed(),
        RelevanceTier::Unscored => Style::new().dimmed(),
    }
}

/// One line announcing a query whose results arrived.
pub fn query_line(node: &QueryNode, color: bool) -> String {
    match node.status {
        QueryStatus::Error => format!(
            "{} {} ({})",
            paint("✗", Style::new().red().bold(), color),
            node.query,
            node.error.as_deref().unwrap_or("search failed")
        ),
        _ => format!(
            "{} {} ({} papers)",
            paint("✓", Style::new().green().bold(), color),
            node.query,
            node.paper_count()
        ),
    }
}

fn paper_line(paper: &Paper, color: bool) -> String {
    let tier = RelevanceTier::of(paper.relevance_score);
    let score = match paper.relevance_score {
        Some(s) => format!("{s:.2}"),
        None => "  - ".to_string(),
    };
    let date = paper
        .published_on()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    format!(
        "  {} {:<8} {} {}",
        paint(&score, tier_style(tier), color),
        paint(tier.label(), tier_style(tier), color),
        paper.title,
        paint(&format!("[{}, {}]", paper.arxiv_id, date), Style::new().dimmed(), color)
    )
}

/// Print the research goal, per-query counts and the filtered paper list.
pub fn print_summary(snapshot: &GraphSnapshot, filter: &PaperFilter, color: bool) {
    if snapshot.is_empty() {
        println!("No research tree was produced.");
        return;
    }

    println!();
    println!(
        "{} {}",
        paint("Research goal:", Style::new().bold(), color),
        snapshot.research_goal
    );
    println!();

    for node in &snapshot.query_nodes {
        let status = match node.status {
            QueryStatus::Done => paint("done", Style::new().green(), color),
            QueryStatus::Error => paint("error", Style::new().red(), color),
            QueryStatus::Pending | QueryStatus::Searching => {
                paint(node.status.label(), Style::new().dimmed(), color)
            }
        };
        println!(
            "  {:>2}. {} {} {}",
            node.id + 1,
            node.query,
            paint(&format!("({} papers)", node.paper_count()), Style::new().dimmed(), color),
            status
        );
    }

    println!();
    println!(
        "{} {} unique, {} referenced, {:.1} per query",
        paint("Papers:", Style::new().bold(), color),
        snapshot.total_unique_papers,
        snapshot.total_papers_referenced,
        snapshot.average_unique_papers_per_query
    );

    let counts = category_counts(snapshot);
    if !counts.is_empty() {
        let mut top: Vec<_> = counts.into_iter().collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let list: Vec<String> = top
            .iter()
            .take(8)
            .map(|(category, n)| format!("{category} ({n})"))
            .collect();
        println!(
            "{} {}",
            paint("Categories:", Style::new().bold(), color),
            list.join(", ")
        );
    }

    let papers = filter.apply(snapshot);
    println!();
    if filter.is_unrestricted() {
        println!("{}", paint("Papers by relevance:", Style::new().bold(), color));
    } else {
        println!(
            "{} {} of {} match the filters",
            paint("Papers by relevance:", Style::new().bold(), color),
            papers.len(),
            snapshot.total_unique_papers
        );
    }
    for paper in &papers {
        println!("{}", paper_line(paper, color));
    }
}
