//! Connection geometry between rendered nodes.
//!
//! The renderer owns node placement; this module only needs a way to ask
//! where a node currently sits on screen. Each structural edge becomes a
//! cubic Bézier from center to center whose control points are pulled along
//! the dominant axis, so the same snapshot and rectangles always give the
//! same curves.

use std::collections::{HashMap, HashSet};

use crate::graph::{GraphSnapshot, NodeId};

/// Fraction of the dominant delta used to offset each control point.
pub const CONTROL_FRACTION: f64 = 0.33;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned screen rectangle; `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Where a node is drawn right now, if it has been drawn at all.
pub trait RectProvider {
    fn rect(&self, node: &NodeId) -> Option<Rect>;
}

impl RectProvider for HashMap<NodeId, Rect> {
    fn rect(&self, node: &NodeId) -> Option<Rect> {
        self.get(node).copied()
    }
}

impl<F> RectProvider for F
where
    F: Fn(&NodeId) -> Option<Rect>,
{
    fn rect(&self, node: &NodeId) -> Option<Rect> {
        self(node)
    }
}

/// A drawable edge between two rendered nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub id: String,
    pub source: NodeId,
    pub target: NodeId,
    pub start: Point,
    pub end: Point,
    pub control_points: [Point; 2],
}

impl Connection {
    pub fn edge_id(source: &NodeId, target: &NodeId) -> String {
        format!("{source}->{target}")
    }

    /// Point on the cubic curve at parameter `t` in [0, 1].
    pub fn point_at(&self, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let [c1, c2] = self.control_points;
        let (a, b, c, d) = (u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t);
        Point::new(
            a * self.start.x + b * c1.x + c * c2.x + d * self.end.x,
            a * self.start.y + b * c1.y + c * c2.y + d * self.end.y,
        )
    }

    /// The curve sampled as `segments + 1` points, endpoints included.
    pub fn polyline(&self, segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f64 / segments as f64))
            .collect()
    }
}

/// Control points for an edge from `start` to `end`.
pub fn control_points(start: Point, end: Point) -> [Point; 2] {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dy.abs() >= dx.abs() {
        let offset = CONTROL_FRACTION * dy;
        [
            Point::new(start.x, start.y + offset),
            Point::new(end.x, end.y - offset),
        ]
    } else {
        let offset = CONTROL_FRACTION * dx;
        [
            Point::new(start.x + offset, start.y),
            Point::new(end.x - offset, end.y),
        ]
    }
}

/// Build every connection whose two endpoints currently have a rectangle.
///
/// Goal → query edges come first in slot order, then query → paper edges in
/// each node's paper order.
pub fn connect(snapshot: &GraphSnapshot, rects: &impl RectProvider) -> Vec<Connection> {
    let mut connections = Vec::new();
    let mut emitted = HashSet::new();

    let goal = NodeId::Goal;
    let goal_rect = rects.rect(&goal);

    for node in &snapshot.query_nodes {
        let query_id = node.node_id();
        let Some(query_rect) = rects.rect(&query_id) else {
            continue;
        };

        if let Some(goal_rect) = goal_rect {
            push_edge(&mut connections, &mut emitted, &goal, goal_rect, &query_id, query_rect);
        }

        for paper in &node.papers {
            let paper_id = NodeId::Paper(paper.arxiv_id.clone());
            if let Some(paper_rect) = rects.rect(&paper_id) {
                push_edge(&mut connections, &mut emitted, &query_id, query_rect, &paper_id, paper_rect);
            }
        }
    }

    connections
}

fn push_edge(
    connections: &mut Vec<Connection>,
    emitted: &mut HashSet<String>,
    source: &NodeId,
    source_rect: Rect,
    target: &NodeId,
    target_rect: Rect,
) {
    let id = Connection::edge_id(source, target);
    if !emitted.insert(id.clone()) {
        return;
    }
    let start = source_rect.center();
    let end = target_rect.center();
    connections.push(Connection {
        id,
        source: source.clone(),
        target: target.clone(),
        start,
        end,
        control_points: control_points(start, end),
    });
}
