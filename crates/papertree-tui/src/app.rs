use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use papertree_core::{GraphSnapshot, Highlight, NodeId, ResearchEngine, StreamOutcome};
use papertree_reporting::ExportFormat;

use crate::action::Action;
use crate::model::tree::TreeLayout;
use crate::theme::Theme;
use crate::tui_event::BackendEvent;

/// Rows taken by header, prompt, borders and footer around the tree canvas.
const CHROME_ROWS: u16 = 5;

/// Which screen is currently displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Tree,
    /// Detail view of the paper with this arXiv id.
    Paper(String),
}

/// A search the main loop should launch.
#[derive(Debug, Clone)]
pub struct SearchLaunch {
    pub query: String,
    pub generation: u64,
    pub cancel: CancellationToken,
}

/// Main application state.
pub struct App {
    pub screen: Screen,
    pub engine: ResearchEngine,
    pub layout: TreeLayout,
    pub highlight: Highlight,
    /// Index into `layout.order`.
    pub cursor: usize,
    pub input: String,
    pub editing: bool,
    /// Last submitted query, reused by retry.
    pub last_query: Option<String>,
    pub generation: u64,
    pub searching: bool,
    pub cancel: Option<CancellationToken>,
    pending_launch: Option<SearchLaunch>,
    pub status_message: Option<String>,
    pub tick: usize,
    pub theme: Theme,
    pub should_quit: bool,
    pub show_help: bool,
    pub detail_scroll: u16,
    pub canvas_size: (u16, u16),
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(initial_query: Option<String>) -> Self {
        let mut app = Self {
            screen: Screen::Tree,
            engine: ResearchEngine::new(),
            layout: TreeLayout::default(),
            highlight: Highlight::default(),
            cursor: 0,
            input: String::new(),
            editing: true,
            last_query: None,
            generation: 0,
            searching: false,
            cancel: None,
            pending_launch: None,
            status_message: None,
            tick: 0,
            theme: Theme::dark(),
            should_quit: false,
            show_help: false,
            detail_scroll: 0,
            canvas_size: (78, 19),
            export_dir: PathBuf::from("."),
        };
        if let Some(query) = initial_query.filter(|q| !q.trim().is_empty()) {
            app.input = query;
            app.submit_input();
        }
        app
    }

    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.engine.snapshot()
    }

    pub fn hovered(&self) -> Option<&NodeId> {
        self.layout.order.get(self.cursor)
    }

    /// Hand the next search to launch to the caller, if one was requested.
    pub fn take_launch(&mut self) -> Option<SearchLaunch> {
        self.pending_launch.take()
    }

    /// Start a new search, superseding any running one.
    fn start_search(&mut self, query: String) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.generation += 1;
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        self.searching = true;
        self.status_message = None;
        self.screen = Screen::Tree;
        self.cursor = 0;
        self.last_query = Some(query.clone());

        self.engine.begin_search();
        self.relayout();

        log::info!("starting search {} for {query:?}", self.generation);
        self.pending_launch = Some(SearchLaunch {
            query,
            generation: self.generation,
            cancel,
        });
    }

    fn submit_input(&mut self) {
        let query = self.input.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.editing = false;
        self.start_search(query);
    }

    fn cancel_search(&mut self) {
        if let Some(cancel) = &self.cancel {
            if self.searching {
                cancel.cancel();
                self.status_message = Some("Cancelling...".to_string());
            }
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            self.status_message = Some("Nothing to export yet".to_string());
            return;
        }
        let name = format!(
            "papertree-{}.{}",
            chrono::Local::now().format("%Y%m%d-%H%M%S"),
            format.extension()
        );
        let path = self.export_dir.join(name);
        let written = papertree_reporting::export(&snapshot, format)
            .map_err(|e| e.to_string())
            .and_then(|content| std::fs::write(&path, content).map_err(|e| e.to_string()));
        self.status_message = Some(match written {
            Ok(()) => format!("Exported {} to {}", format, path.display()),
            Err(err) => format!("Export failed: {err}"),
        });
    }

    /// Recompute node placement, connections and the hover highlight.
    ///
    /// Runs after every snapshot change, resize and cursor move.
    pub fn relayout(&mut self) {
        let hovered = self.hovered().cloned();
        let snapshot = self.snapshot();
        let (w, h) = self.canvas_size;

        let mut layout = TreeLayout::compute(&snapshot, w, h, self.layout.paper_offset);
        if let Some(index) = hovered.as_ref().and_then(|node| layout.index_of(node)) {
            self.cursor = index;
        }
        self.cursor = self.cursor.min(layout.order.len().saturating_sub(1));

        let offset = layout.offset_for_cursor(self.cursor);
        if offset != layout.paper_offset {
            layout = TreeLayout::compute(&snapshot, w, h, offset);
        }

        self.engine.connections(&layout.rects);
        self.layout = layout;
        self.highlight = self.engine.compute_highlight(self.hovered());
    }

    fn move_cursor(&mut self, to: usize) {
        self.cursor = to.min(self.layout.order.len().saturating_sub(1));
        self.relayout();
    }

    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        // When help overlay is shown, only allow a few actions through
        if self.show_help {
            match action {
                Action::Quit => {
                    self.should_quit = true;
                    return true;
                }
                Action::ToggleHelp | Action::NavigateBack => {
                    self.show_help = false;
                }
                Action::Tick => {
                    self.tick = self.tick.wrapping_add(1);
                }
                Action::Resize(w, h) => self.resize(w, h),
                _ => {} // swallow everything else
            }
            return false;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            Action::ToggleHelp => {
                self.show_help = true;
            }
            Action::EditQuery => {
                self.editing = true;
                if self.input.is_empty() {
                    if let Some(last) = &self.last_query {
                        self.input = last.clone();
                    }
                }
            }
            Action::InputChar(c) => self.input.push(c),
            Action::InputBackspace => {
                self.input.pop();
            }
            Action::InputSubmit => self.submit_input(),
            Action::InputCancel => {
                // Nothing to go back to before the first search
                if self.last_query.is_some() {
                    self.editing = false;
                }
            }
            Action::Retry => {
                if let Some(query) = self.last_query.clone() {
                    self.start_search(query);
                }
            }
            Action::CancelSearch => self.cancel_search(),
            Action::Export(format) => self.export(format),
            Action::NavigateBack => match &self.screen {
                Screen::Paper(_) => self.screen = Screen::Tree,
                Screen::Tree => self.cancel_search(),
            },
            Action::DrillIn => {
                if self.screen == Screen::Tree {
                    if let Some(NodeId::Paper(id)) = self.hovered().cloned() {
                        self.screen = Screen::Paper(id);
                        self.detail_scroll = 0;
                    }
                }
            }
            Action::MoveDown => match &self.screen {
                Screen::Tree => self.move_cursor(self.cursor + 1),
                Screen::Paper(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
            },
            Action::MoveUp => match &self.screen {
                Screen::Tree => self.move_cursor(self.cursor.saturating_sub(1)),
                Screen::Paper(_) => {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
            },
            Action::PageDown => {
                let page = self.layout.paper_capacity.max(1);
                match &self.screen {
                    Screen::Tree => self.move_cursor(self.cursor + page),
                    Screen::Paper(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_add(page as u16);
                    }
                }
            }
            Action::PageUp => {
                let page = self.layout.paper_capacity.max(1);
                match &self.screen {
                    Screen::Tree => self.move_cursor(self.cursor.saturating_sub(page)),
                    Screen::Paper(_) => {
                        self.detail_scroll = self.detail_scroll.saturating_sub(page as u16);
                    }
                }
            }
            Action::GoTop => match &self.screen {
                Screen::Tree => self.move_cursor(0),
                Screen::Paper(_) => self.detail_scroll = 0,
            },
            Action::GoBottom => match &self.screen {
                Screen::Tree => self.move_cursor(usize::MAX),
                Screen::Paper(_) => {
                    self.detail_scroll = u16::MAX; // clamped by Paragraph rendering
                }
            },
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
            }
            Action::Resize(w, h) => self.resize(w, h),
            Action::None => {}
        }
        false
    }

    fn resize(&mut self, w: u16, h: u16) {
        self.canvas_size = (w.saturating_sub(2), h.saturating_sub(CHROME_ROWS));
        self.relayout();
    }

    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        if event.generation() != self.generation {
            log::debug!("dropping event from superseded search {}", event.generation());
            return;
        }
        match event {
            BackendEvent::Record { .. }
                if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) =>
            {
                log::debug!("dropping record queued before cancellation");
            }
            BackendEvent::Record { item, .. } => {
                self.engine.handle(item);
                self.relayout();
            }
            BackendEvent::Finished { result, .. } => {
                self.searching = false;
                self.cancel = None;
                let decode_errors = self.engine.decode_errors().len();
                self.status_message = match result {
                    Ok(StreamOutcome::Completed { .. }) if decode_errors > 0 => Some(format!(
                        "Done; {decode_errors} record(s) could not be decoded"
                    )),
                    Ok(StreamOutcome::Completed { .. }) => None,
                    Ok(StreamOutcome::Cancelled) => {
                        Some("Search cancelled; showing partial results".to_string())
                    }
                    Err(err) => Some(format!("Search failed: {err}")),
                };
            }
        }
    }

    /// Render the current screen.
    pub fn view(&self, f: &mut ratatui::Frame) {
        match &self.screen {
            Screen::Tree => crate::view::tree::render(f, self),
            Screen::Paper(id) => crate::view::detail::render(f, self, id),
        }

        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}

#[cfg(test)]
mod tests {
    use papertree_core::{
        DecodeError, Paper, PapersEvent, QueriesEvent, QueryPlan, SearchPhase, StreamEvent,
    };

    use super::*;

    fn queries(goal: &str, queries: &[&str]) -> StreamEvent {
        StreamEvent::Queries(QueriesEvent {
            original_query: None,
            research_goal: goal.into(),
            queries: queries
                .iter()
                .map(|q| QueryPlan {
                    query: q.to_string(),
                    description: String::new(),
                })
                .collect(),
        })
    }

    fn papers(query: &str, ids: &[&str]) -> StreamEvent {
        StreamEvent::Papers(PapersEvent {
            query: query.into(),
            description: String::new(),
            papers: ids
                .iter()
                .map(|id| Paper {
                    arxiv_id: id.to_string(),
                    title: format!("Title {id}"),
                    authors: vec![],
                    published_date: String::new(),
                    categories: Default::default(),
                    relevance_score: Some(0.9),
                    relevance_explanation: None,
                    abstract_text: String::new(),
                    url: String::new(),
                })
                .collect(),
            error: None,
        })
    }

    fn record(app: &App, event: StreamEvent) -> BackendEvent {
        BackendEvent::Record {
            generation: app.generation,
            item: Ok(event),
        }
    }

    fn searching_app() -> App {
        let mut app = App::new(Some("protein folding".into()));
        app.update(Action::Resize(120, 30));
        app
    }

    #[test]
    fn initial_query_launches_search() {
        let mut app = searching_app();
        let launch = app.take_launch().unwrap();
        assert_eq!(launch.query, "protein folding");
        assert_eq!(launch.generation, 1);
        assert!(app.searching);
        assert!(!app.editing);
        assert!(app.take_launch().is_none());
        assert_eq!(app.engine.progress().phase, SearchPhase::Generating);
    }

    #[test]
    fn without_query_prompt_is_open() {
        let mut app = App::new(None);
        assert!(app.editing);
        for c in "gnn".chars() {
            app.update(Action::InputChar(c));
        }
        app.update(Action::InputBackspace);
        app.update(Action::InputSubmit);
        assert_eq!(app.take_launch().map(|l| l.query), Some("gn".to_string()));
    }

    #[test]
    fn records_grow_tree_and_layout() {
        let mut app = searching_app();
        let event = record(&app, queries("G", &["q1", "q2"]));
        app.handle_backend_event(event);
        let event = record(&app, papers("q1", &["a1"]));
        app.handle_backend_event(event);
        let event = record(&app, papers("q2", &["a1", "a2"]));
        app.handle_backend_event(event);

        assert_eq!(app.layout.order.len(), 5);
        assert_eq!(app.engine.last_connections().len(), 5);
        assert_eq!(app.engine.progress().phase, SearchPhase::Done);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut app = searching_app();
        let old = record(&app, queries("old goal", &["q1"]));
        app.update(Action::Retry);
        assert_eq!(app.generation, 2);

        app.handle_backend_event(old);
        assert!(app.snapshot().is_empty());

        app.handle_backend_event(BackendEvent::Finished {
            generation: 1,
            result: Ok(StreamOutcome::Completed { records: 1 }),
        });
        assert!(app.searching);
    }

    #[test]
    fn records_queued_before_cancel_are_dropped() {
        let mut app = searching_app();
        let _launch = app.take_launch().unwrap();
        let version = app.snapshot().version;
        let phase = app.engine.progress().phase;

        app.update(Action::CancelSearch);
        let event = record(&app, queries("G", &["q1"]));
        app.handle_backend_event(event);
        assert_eq!(app.snapshot().version, version);
        assert!(app.snapshot().research_goal.is_empty());
        assert_eq!(app.engine.progress().phase, phase);

        app.handle_backend_event(BackendEvent::Finished {
            generation: app.generation,
            result: Ok(StreamOutcome::Cancelled),
        });
        assert!(!app.searching);
        assert!(app.cancel.is_none());
        assert_eq!(
            app.status_message.as_deref(),
            Some("Search cancelled; showing partial results")
        );
    }

    #[test]
    fn retry_cancels_previous_search() {
        let mut app = searching_app();
        let first = app.take_launch().unwrap();
        app.update(Action::Retry);
        assert!(first.cancel.is_cancelled());
        assert!(!app.take_launch().unwrap().cancel.is_cancelled());
    }

    #[test]
    fn cursor_hover_highlights_neighbours() {
        let mut app = searching_app();
        let event = record(&app, queries("G", &["q1", "q2"]));
        app.handle_backend_event(event);
        let event = record(&app, papers("q1", &["a1"]));
        app.handle_backend_event(event);
        let event = record(&app, papers("q2", &["a1"]));
        app.handle_backend_event(event);

        app.update(Action::GoBottom);
        assert_eq!(app.hovered(), Some(&NodeId::Paper("a1".into())));
        assert!(app.highlight.has_node(&NodeId::Query(0)));
        assert!(app.highlight.has_node(&NodeId::Query(1)));
        assert!(app.highlight.has_edge("query-1->paper-a1"));

        app.update(Action::DrillIn);
        assert_eq!(app.screen, Screen::Paper("a1".into()));
        app.update(Action::NavigateBack);
        assert_eq!(app.screen, Screen::Tree);
    }

    #[test]
    fn cursor_follows_node_as_tree_grows() {
        let mut app = searching_app();
        let event = record(&app, queries("G", &["q1", "q2"]));
        app.handle_backend_event(event);
        app.update(Action::MoveDown);
        app.update(Action::MoveDown);
        assert_eq!(app.hovered(), Some(&NodeId::Query(1)));

        let event = record(&app, papers("q2", &["a1", "a2"]));
        app.handle_backend_event(event);
        assert_eq!(app.hovered(), Some(&NodeId::Query(1)));
        assert_eq!(app.highlight.edges.len(), 3);
    }

    #[test]
    fn finish_reports_failures_and_decode_errors() {
        let mut app = searching_app();
        let generation = app.generation;
        app.handle_backend_event(BackendEvent::Record {
            generation,
            item: Err(DecodeError {
                record: 1,
                reason: "expected value".into(),
                preview: "nope".into(),
            }),
        });
        app.handle_backend_event(BackendEvent::Finished {
            generation,
            result: Ok(StreamOutcome::Completed { records: 1 }),
        });
        assert!(!app.searching);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Done; 1 record(s) could not be decoded")
        );

        app.update(Action::Retry);
        let generation = app.generation;
        app.handle_backend_event(BackendEvent::Finished {
            generation,
            result: Err("server returned 503: overloaded".into()),
        });
        assert_eq!(
            app.status_message.as_deref(),
            Some("Search failed: server returned 503: overloaded")
        );
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = searching_app();
        app.export_dir = dir.path().to_path_buf();
        let event = record(&app, queries("G", &["q1"]));
        app.handle_backend_event(event);

        app.update(Action::Export(ExportFormat::Json));
        let written: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(written.len(), 1);
        assert!(app.status_message.unwrap().starts_with("Exported JSON"));
    }
}
