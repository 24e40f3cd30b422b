use std::collections::HashMap;

use papertree_core::{GraphSnapshot, NodeId, Rect};

/// Horizontal space between columns, in cells.
const COLUMN_GAP: f64 = 6.0;

/// Placement of the tree on the canvas: goal, queries and papers in three
/// columns, left to right. Coordinates are in cells with y growing downward.
///
/// Papers that do not fit vertically get no rectangle, which also hides their
/// connections.
#[derive(Debug, Clone, Default)]
pub struct TreeLayout {
    pub width: f64,
    pub height: f64,
    pub rects: HashMap<NodeId, Rect>,
    /// Every node in cursor order: goal, queries, then unique papers.
    pub order: Vec<NodeId>,
    pub paper_offset: usize,
    pub paper_capacity: usize,
}

impl TreeLayout {
    pub fn compute(snapshot: &GraphSnapshot, width: u16, height: u16, paper_offset: usize) -> Self {
        let width = f64::from(width);
        let height = f64::from(height.max(1));
        let mut layout = Self {
            width,
            height,
            paper_capacity: height as usize,
            ..Self::default()
        };
        if snapshot.is_empty() {
            return layout;
        }

        let goal_w = (width * 0.2).max(8.0);
        let query_x = goal_w + COLUMN_GAP;
        let query_w = (width * 0.3).max(8.0);
        let paper_x = query_x + query_w + COLUMN_GAP;
        let paper_w = (width - paper_x).max(8.0);

        layout.order.push(NodeId::Goal);
        layout
            .rects
            .insert(NodeId::Goal, Rect::new(0.0, height / 2.0 - 0.5, goal_w, 1.0));

        let slots = slot_centers(snapshot.query_nodes.len(), height);
        for (node, center) in snapshot.query_nodes.iter().zip(slots) {
            let id = node.node_id();
            layout
                .rects
                .insert(id.clone(), Rect::new(query_x, center - 0.5, query_w, 1.0));
            layout.order.push(id);
        }

        let total = snapshot.dedup_index.len();
        let offset = paper_offset.min(total.saturating_sub(1));
        let visible = total.saturating_sub(offset).min(layout.paper_capacity);
        let slots = slot_centers(visible, height);
        for (i, paper) in snapshot.dedup_index.iter().enumerate() {
            let id = NodeId::Paper(paper.arxiv_id.clone());
            if i >= offset && i - offset < visible {
                let center = slots[i - offset];
                layout
                    .rects
                    .insert(id.clone(), Rect::new(paper_x, center - 0.5, paper_w, 1.0));
            }
            layout.order.push(id);
        }
        layout.paper_offset = offset;
        layout
    }

    pub fn index_of(&self, node: &NodeId) -> Option<usize> {
        self.order.iter().position(|n| n == node)
    }

    /// Index of the first paper in [`Self::order`].
    pub fn first_paper_index(&self) -> usize {
        self.order
            .iter()
            .position(|n| matches!(n, NodeId::Paper(_)))
            .unwrap_or(self.order.len())
    }

    /// Paper window offset that keeps the node at `cursor` on screen.
    pub fn offset_for_cursor(&self, cursor: usize) -> usize {
        let first = self.first_paper_index();
        if cursor < first {
            return self.paper_offset;
        }
        let paper = cursor - first;
        if paper < self.paper_offset {
            paper
        } else if paper >= self.paper_offset + self.paper_capacity {
            paper + 1 - self.paper_capacity
        } else {
            self.paper_offset
        }
    }
}

/// Vertical centers for `n` evenly spaced rows.
fn slot_centers(n: usize, height: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let slot = height / n as f64;
    (0..n).map(|i| slot * i as f64 + slot / 2.0).collect()
}

#[cfg(test)]
mod tests {
    use papertree_core::{
        GraphStateBuilder, Paper, PapersEvent, QueriesEvent, QueryPlan, StreamEvent,
    };

    use super::*;

    fn paper(id: &str) -> Paper {
        Paper {
            arxiv_id: id.into(),
            title: id.into(),
            authors: vec![],
            published_date: String::new(),
            categories: Default::default(),
            relevance_score: None,
            relevance_explanation: None,
            abstract_text: String::new(),
            url: String::new(),
        }
    }

    fn snapshot(papers: usize) -> std::sync::Arc<GraphSnapshot> {
        let mut builder = GraphStateBuilder::new();
        builder.apply(&StreamEvent::Queries(QueriesEvent {
            original_query: None,
            research_goal: "G".into(),
            queries: vec![QueryPlan {
                query: "q1".into(),
                description: String::new(),
            }],
        }));
        builder.apply(&StreamEvent::Papers(PapersEvent {
            query: "q1".into(),
            description: String::new(),
            papers: (0..papers).map(|i| paper(&format!("p{i}"))).collect(),
            error: None,
        }))
    }

    #[test]
    fn every_node_gets_a_rect_when_it_fits() {
        let layout = TreeLayout::compute(&snapshot(3), 100, 20, 0);
        assert_eq!(layout.order.len(), 5);
        assert_eq!(layout.rects.len(), 5);
        assert_eq!(layout.first_paper_index(), 2);

        let goal = layout.rects[&NodeId::Goal];
        let query = layout.rects[&NodeId::Query(0)];
        let paper = layout.rects[&NodeId::Paper("p0".into())];
        assert!(goal.x < query.x && query.x < paper.x);
        assert!((query.center().y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn overflowing_papers_are_windowed() {
        let layout = TreeLayout::compute(&snapshot(8), 100, 4, 3);
        assert_eq!(layout.paper_capacity, 4);
        assert_eq!(layout.order.len(), 10);
        assert!(!layout.rects.contains_key(&NodeId::Paper("p2".into())));
        assert!(layout.rects.contains_key(&NodeId::Paper("p3".into())));
        assert!(layout.rects.contains_key(&NodeId::Paper("p6".into())));
        assert!(!layout.rects.contains_key(&NodeId::Paper("p7".into())));

        // Cursor on p7 scrolls the window down by one.
        assert_eq!(layout.offset_for_cursor(2 + 7), 4);
        // Cursor on p1 scrolls it up.
        assert_eq!(layout.offset_for_cursor(2 + 1), 1);
        assert_eq!(layout.offset_for_cursor(0), 3);
    }

    #[test]
    fn empty_snapshot_has_no_nodes() {
        let layout = TreeLayout::compute(&GraphSnapshot::default(), 80, 20, 0);
        assert!(layout.order.is_empty());
        assert!(layout.rects.is_empty());
    }
}
