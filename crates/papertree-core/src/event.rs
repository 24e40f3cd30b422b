//! Wire payloads carried by the research-tree event stream.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One decoded record from the stream, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Queries(QueriesEvent),
    Papers(PapersEvent),
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Queries(_) => "queries",
            Self::Papers(_) => "papers",
        }
    }
}

/// The research plan: goal plus the sub-queries the backend is about to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriesEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    pub research_goal: String,
    pub queries: Vec<QueryPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub query: String,
    #[serde(default)]
    pub description: String,
}

/// Results for one sub-query. `error` is set when the backend search failed;
/// `papers` is then usually empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PapersEvent {
    pub query: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub papers: Vec<Paper>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A paper as sent by the backend. `arxiv_id` is the identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default, deserialize_with = "clamped_score")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_explanation: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: String,
    #[serde(default)]
    pub url: String,
}

impl Paper {
    /// Publication day, parsed from the `YYYY-MM-DD` prefix of `published_date`.
    pub fn published_on(&self) -> Option<NaiveDate> {
        let day = self.published_date.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

/// Scores outside [0, 1] are clamped rather than rejected.
fn clamped_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let score = Option::<f64>::deserialize(deserializer)?;
    Ok(score.map(|s| s.clamp(0.0, 1.0)))
}
