//! The research engine: one owned graph, published to subscribers.
//!
//! All mutation goes through `&mut self` on a single task. Readers on other
//! tasks can hold a [`SnapshotReader`]; they only ever see whole snapshots
//! because publishing swaps one `Arc` for another.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

use crate::client::{ResearchClient, SearchRequest, StreamOutcome};
use crate::decoder::{DecodeError, Decoded};
use crate::event::StreamEvent;
use crate::graph::{GraphSnapshot, GraphStateBuilder, NodeId};
use crate::highlight::{Highlight, NodeRole, highlight};
use crate::layout::{Connection, RectProvider, connect};
use crate::progress::{ProgressState, ProgressTracker};
use crate::CoreError;

type SnapshotCallback = Box<dyn Fn(&Arc<GraphSnapshot>) + Send + Sync>;
type ProgressCallback = Box<dyn Fn(&ProgressState) + Send + Sync>;

/// Handle returned by the subscribe methods, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Lock-free view of the last published snapshot.
#[derive(Clone)]
pub struct SnapshotReader {
    current: Arc<ArcSwap<GraphSnapshot>>,
}

impl SnapshotReader {
    pub fn load(&self) -> Arc<GraphSnapshot> {
        self.current.load_full()
    }
}

pub struct ResearchEngine {
    builder: GraphStateBuilder,
    tracker: ProgressTracker,
    current: Arc<ArcSwap<GraphSnapshot>>,
    snapshot_subscribers: Vec<(SubscriptionId, SnapshotCallback)>,
    progress_subscribers: Vec<(SubscriptionId, ProgressCallback)>,
    next_subscription: u64,
    /// Result of the last layout pass, used for highlighting.
    connections: Vec<Connection>,
    decode_errors: Vec<DecodeError>,
}

impl Default for ResearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchEngine {
    pub fn new() -> Self {
        let builder = GraphStateBuilder::new();
        let current = Arc::new(ArcSwap::new(Arc::clone(builder.current())));
        Self {
            builder,
            tracker: ProgressTracker::new(),
            current,
            snapshot_subscribers: Vec::new(),
            progress_subscribers: Vec::new(),
            next_subscription: 0,
            connections: Vec::new(),
            decode_errors: Vec::new(),
        }
    }

    /// Call `on_snapshot` with every snapshot published from now on.
    pub fn subscribe(
        &mut self,
        on_snapshot: impl Fn(&Arc<GraphSnapshot>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.snapshot_subscribers.push((id, Box::new(on_snapshot)));
        id
    }

    /// Call `on_progress` with every progress state published from now on.
    pub fn subscribe_progress(
        &mut self,
        on_progress: impl Fn(&ProgressState) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id();
        self.progress_subscribers.push((id, Box::new(on_progress)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.snapshot_subscribers.len() + self.progress_subscribers.len();
        self.snapshot_subscribers.retain(|(sid, _)| *sid != id);
        self.progress_subscribers.retain(|(sid, _)| *sid != id);
        before != self.snapshot_subscribers.len() + self.progress_subscribers.len()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            current: Arc::clone(&self.current),
        }
    }

    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.current.load_full()
    }

    pub fn progress(&self) -> &ProgressState {
        self.tracker.state()
    }

    /// Decode errors reported during the current search.
    pub fn decode_errors(&self) -> &[DecodeError] {
        &self.decode_errors
    }

    /// Start a new search: empty graph, progress in the generating phase.
    pub fn begin_search(&mut self) {
        self.connections.clear();
        self.decode_errors.clear();
        let snapshot = self.builder.reset();
        self.publish_snapshot(snapshot);
        self.tracker.begin_search();
        self.publish_progress();
    }

    /// Fold one event into the graph and progress, publishing both.
    pub fn apply(&mut self, event: &StreamEvent) {
        let snapshot = self.builder.apply(event);
        self.publish_snapshot(snapshot);
        self.tracker.apply(event);
        self.publish_progress();
    }

    /// Apply a decoded record, or note why it could not be decoded.
    pub fn handle(&mut self, item: Decoded) {
        match item {
            Ok(event) => self.apply(&event),
            Err(err) => self.decode_errors.push(err),
        }
    }

    /// Recompute connections against the renderer's current rectangles.
    ///
    /// Run after every snapshot change and every layout change.
    pub fn connections(&mut self, rects: &impl RectProvider) -> &[Connection] {
        self.connections = connect(&self.snapshot(), rects);
        &self.connections
    }

    pub fn last_connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Emphasis for the hovered node, its role taken from its id.
    pub fn compute_highlight(&self, hovered: Option<&NodeId>) -> Highlight {
        match hovered {
            Some(node) => highlight(Some(node), NodeRole::of(node), &self.connections),
            None => Highlight::default(),
        }
    }

    pub fn highlight_as(&self, hovered: Option<&NodeId>, role: NodeRole) -> Highlight {
        highlight(hovered, role, &self.connections)
    }

    /// Begin a search and stream it to completion through this engine.
    ///
    /// On failure or cancellation the last published snapshot stays in place.
    pub async fn run(
        &mut self,
        client: &ResearchClient,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, CoreError> {
        self.begin_search();
        client.search(request, cancel, |item| self.handle(item)).await
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId(self.next_subscription)
    }

    fn publish_snapshot(&self, snapshot: Arc<GraphSnapshot>) {
        self.current.store(Arc::clone(&snapshot));
        for (_, subscriber) in &self.snapshot_subscribers {
            subscriber(&snapshot);
        }
    }

    fn publish_progress(&self) {
        let state = self.tracker.state();
        for (_, subscriber) in &self.progress_subscribers {
            subscriber(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::graph::tests::{papers, queries};
    use crate::layout::Rect;
    use crate::progress::SearchPhase;

    #[test]
    fn subscribers_see_every_partial_snapshot() {
        let versions = Arc::new(Mutex::new(Vec::new()));
        let phases = Arc::new(Mutex::new(Vec::new()));

        let mut engine = ResearchEngine::new();
        let sink = Arc::clone(&versions);
        engine.subscribe(move |snap| sink.lock().unwrap().push(snap.total_unique_papers));
        let sink = Arc::clone(&phases);
        engine.subscribe_progress(move |state| sink.lock().unwrap().push(state.phase));

        engine.begin_search();
        engine.apply(&queries("G", &["q1", "q2"]));
        engine.apply(&papers("q1", &["a1"]));
        engine.apply(&papers("q2", &["a1", "a2"]));

        assert_eq!(*versions.lock().unwrap(), [0, 0, 1, 2]);
        assert_eq!(
            *phases.lock().unwrap(),
            [
                SearchPhase::Generating,
                SearchPhase::Searching,
                SearchPhase::Searching,
                SearchPhase::Done
            ]
        );
    }

    #[test]
    fn unsubscribed_callbacks_stop() {
        let calls = Arc::new(Mutex::new(0));
        let mut engine = ResearchEngine::new();
        let sink = Arc::clone(&calls);
        let id = engine.subscribe(move |_| *sink.lock().unwrap() += 1);
        engine.apply(&queries("G", &["q1"]));
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.apply(&papers("q1", &[]));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn reader_sees_whole_snapshots_only() {
        let mut engine = ResearchEngine::new();
        let reader = engine.reader();
        engine.apply(&queries("G", &["q1"]));
        let held = reader.load();
        engine.apply(&papers("q1", &["a1"]));

        assert!(held.query_nodes[0].papers.is_empty());
        assert_eq!(reader.load().total_unique_papers, 1);
        assert_eq!(reader.load().version, engine.snapshot().version);
    }

    #[test]
    fn decode_errors_are_kept_and_stream_continues() {
        let mut engine = ResearchEngine::new();
        engine.begin_search();
        engine.handle(Ok(queries("G", &["q1"])));
        engine.handle(Err(DecodeError {
            record: 2,
            reason: "expected value".into(),
            preview: "{oops".into(),
        }));
        engine.handle(Ok(papers("q1", &["a1"])));
        assert_eq!(engine.decode_errors().len(), 1);
        assert_eq!(engine.snapshot().total_unique_papers, 1);
        assert_eq!(engine.progress().phase, SearchPhase::Done);
    }

    #[test]
    fn highlight_uses_last_layout_pass() {
        let mut engine = ResearchEngine::new();
        engine.apply(&queries("G", &["q1"]));
        engine.apply(&papers("q1", &["a1"]));

        let paper = NodeId::Paper("a1".into());
        assert_eq!(engine.compute_highlight(Some(&paper)).edges.len(), 0);

        let rects = HashMap::from([
            (NodeId::Goal, Rect::new(0.0, 0.0, 4.0, 2.0)),
            (NodeId::Query(0), Rect::new(0.0, 10.0, 4.0, 2.0)),
            (paper.clone(), Rect::new(0.0, 20.0, 4.0, 2.0)),
        ]);
        assert_eq!(engine.connections(&rects).len(), 2);

        let hl = engine.compute_highlight(Some(&paper));
        assert!(hl.has_node(&NodeId::Query(0)));
        assert!(hl.has_edge("query-0->paper-a1"));
        assert!(engine.compute_highlight(None).is_empty());
        assert_eq!(
            engine.highlight_as(Some(&NodeId::Query(0)), NodeRole::Query).edges.len(),
            2
        );
    }

    #[test]
    fn new_search_clears_graph_and_layout() {
        let mut engine = ResearchEngine::new();
        engine.apply(&queries("G", &["q1"]));
        let rects = HashMap::from([
            (NodeId::Goal, Rect::new(0.0, 0.0, 1.0, 1.0)),
            (NodeId::Query(0), Rect::new(0.0, 5.0, 1.0, 1.0)),
        ]);
        engine.connections(&rects);
        assert_eq!(engine.last_connections().len(), 1);

        engine.begin_search();
        assert!(engine.snapshot().is_empty());
        assert!(engine.last_connections().is_empty());
        assert_eq!(engine.progress().phase, SearchPhase::Generating);
    }
}
