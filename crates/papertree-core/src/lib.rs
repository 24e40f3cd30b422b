use std::time::Duration;

use thiserror::Error;

pub mod client;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod event;
pub mod filter;
pub mod graph;
pub mod highlight;
pub mod layout;
pub mod progress;

// Re-export for convenience
pub use client::{ResearchClient, SearchRequest, StreamOutcome};
pub use config::{ConfigError, ConfigFile};
pub use decoder::{DecodeError, Decoded, StreamDecoder};
pub use engine::ResearchEngine;
pub use event::{Paper, PapersEvent, QueriesEvent, QueryPlan, StreamEvent};
pub use filter::{PaperFilter, RelevanceTier};
pub use graph::{GraphSnapshot, GraphStateBuilder, NodeId, QueryNode, QueryStatus};
pub use highlight::{Highlight, NodeRole, highlight};
pub use layout::{Connection, Point, Rect, RectProvider};
pub use progress::{ProgressState, ProgressTracker, SearchPhase};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream stalled: no data for {}s", .0.as_secs())]
    Stalled(Duration),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Environment variables read by [`Config::apply_env`].
pub const ENV_API_URL: &str = "PAPERTREE_API_URL";
pub const ENV_MAX_RESULTS: &str = "PAPERTREE_MAX_RESULTS";
pub const ENV_MAX_QUERIES: &str = "PAPERTREE_MAX_QUERIES";
pub const ENV_IDLE_TIMEOUT: &str = "PAPERTREE_IDLE_TIMEOUT";

/// Configuration for the research-tree source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub max_results_per_query: u32,
    pub max_queries: u32,
    /// Longest gap between chunks before the stream counts as stalled.
    pub idle_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            max_results_per_query: 5,
            max_queries: 5,
            idle_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(value) = lookup(ENV_MAX_RESULTS) {
            self.max_results_per_query = parse_number(ENV_MAX_RESULTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_QUERIES) {
            self.max_queries = parse_number(ENV_MAX_QUERIES, &value)?;
        }
        if let Some(value) = lookup(ENV_IDLE_TIMEOUT) {
            self.idle_timeout_secs = parse_number(ENV_IDLE_TIMEOUT, &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "api_url",
                reason: "must not be empty".into(),
            });
        }
        if self.max_results_per_query == 0 {
            return Err(ConfigError::Invalid {
                key: "max_results_per_query",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_queries == 0 {
            return Err(ConfigError::Invalid {
                key: "max_queries",
                reason: "must be at least 1".into(),
            });
        }
        if self.idle_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "idle_timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request body for a search using this configuration's limits.
    pub fn search_request(&self, natural_language_query: impl Into<String>) -> SearchRequest {
        SearchRequest {
            natural_language_query: natural_language_query.into(),
            max_results_per_query: self.max_results_per_query,
            max_queries: self.max_queries,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("{value:?} is not a number"),
    })
}
