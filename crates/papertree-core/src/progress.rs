use crate::event::StreamEvent;
use crate::graph::QueryStatus;

/// Coarse phase of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Generating,
    Searching,
    Done,
}

impl SearchPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Generating => "Generating queries...",
            Self::Searching => "Searching...",
            Self::Done => "Done",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Generating | Self::Searching)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryProgress {
    pub query: String,
    pub status: QueryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub phase: SearchPhase,
    pub current: usize,
    pub total: usize,
    pub per_query_status: Vec<QueryProgress>,
}

impl ProgressState {
    /// Completed fraction in [0, 1]; 0 while nothing is announced.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64
        }
    }
}

/// Derives [`ProgressState`] from the same events the graph builder sees.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// A new search was issued; queries are being generated.
    pub fn begin_search(&mut self) -> &ProgressState {
        self.state = ProgressState {
            phase: SearchPhase::Generating,
            ..ProgressState::default()
        };
        &self.state
    }

    pub fn apply(&mut self, event: &StreamEvent) -> &ProgressState {
        match event {
            StreamEvent::Queries(queries) => {
                self.state.phase = SearchPhase::Searching;
                self.state.current = 0;
                self.state.total = queries.queries.len();
                self.state.per_query_status = queries
                    .queries
                    .iter()
                    .map(|plan| QueryProgress {
                        query: plan.query.clone(),
                        status: QueryStatus::Pending,
                    })
                    .collect();
            }
            StreamEvent::Papers(papers) => {
                let status = if papers.error.is_some() {
                    QueryStatus::Error
                } else {
                    QueryStatus::Done
                };
                let state = &mut self.state;
                match state
                    .per_query_status
                    .iter_mut()
                    .find(|entry| entry.query == papers.query)
                {
                    Some(entry) => {
                        // A repeat for a finished query refreshes its status only.
                        if !entry.status.is_terminal() {
                            state.current += 1;
                        }
                        entry.status = status;
                    }
                    None => {
                        state.per_query_status.push(QueryProgress {
                            query: papers.query.clone(),
                            status,
                        });
                        state.total += 1;
                        state.current += 1;
                    }
                }
            }
        }

        if self.state.phase == SearchPhase::Searching
            && self.state.total > 0
            && self.state.current == self.state.total
        {
            self.state.phase = SearchPhase::Done;
        }
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::PapersEvent;
    use crate::graph::tests::{papers, queries};

    #[test]
    fn new_search_resets_to_generating() {
        let mut tracker = ProgressTracker::new();
        tracker.apply(&queries("G", &["q1"]));
        let state = tracker.begin_search();
        assert_eq!(state.phase, SearchPhase::Generating);
        assert_eq!((state.current, state.total), (0, 0));
        assert!(state.per_query_status.is_empty());
    }

    #[test]
    fn walks_through_to_done() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_search();
        let state = tracker.apply(&queries("G", &["q1", "q2"])).clone();
        assert_eq!(state.phase, SearchPhase::Searching);
        assert_eq!((state.current, state.total), (0, 2));

        tracker.apply(&papers("q1", &["a1"]));
        assert_eq!(tracker.state().current, 1);
        assert_eq!(tracker.state().phase, SearchPhase::Searching);

        let state = tracker.apply(&papers("q2", &["a1", "a2"]));
        assert_eq!(state.phase, SearchPhase::Done);
        assert_eq!(state.per_query_status[1].status, QueryStatus::Done);
    }

    #[test]
    fn error_counts_as_completed() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_search();
        tracker.apply(&queries("G", &["q1"]));
        let state = tracker.apply(&StreamEvent::Papers(PapersEvent {
            query: "q1".into(),
            description: String::new(),
            papers: vec![],
            error: Some("boom".into()),
        }));
        assert_eq!(state.per_query_status[0].status, QueryStatus::Error);
        assert_eq!(state.current, 1);
        assert_eq!(state.phase, SearchPhase::Done);
    }

    #[test]
    fn every_queries_event_resets_counts() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_search();
        tracker.apply(&queries("G", &["q1", "q2"]));
        tracker.apply(&papers("q1", &[]));
        let state = tracker.apply(&queries("G2", &["x", "y", "z"]));
        assert_eq!((state.current, state.total), (0, 3));
        assert_eq!(state.phase, SearchPhase::Searching);
    }

    #[test]
    fn duplicates_and_orphans_keep_current_within_total() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_search();
        tracker.apply(&queries("G", &["q1", "q2"]));
        tracker.apply(&papers("q1", &[]));
        tracker.apply(&papers("q1", &[]));
        assert_eq!(tracker.state().current, 1);

        let state = tracker.apply(&papers("extra", &[]));
        assert_eq!((state.current, state.total), (2, 3));
        assert!(state.current <= state.total);
        assert_eq!(state.phase, SearchPhase::Searching);
    }

    #[test]
    fn papers_before_queries_do_not_finish_the_search() {
        let mut tracker = ProgressTracker::new();
        tracker.begin_search();
        let state = tracker.apply(&papers("early", &[]));
        assert_eq!(state.phase, SearchPhase::Generating);
        assert_eq!((state.current, state.total), (1, 1));
    }
}
