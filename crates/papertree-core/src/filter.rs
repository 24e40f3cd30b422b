//! Relevance tiers and result filtering over a snapshot's unique papers.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::event::Paper;
use crate::graph::{GraphSnapshot, QueryNode};

/// Coarse relevance bucket used for coloring and labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelevanceTier {
    Unscored,
    Low,
    Medium,
    High,
}

impl RelevanceTier {
    pub fn of(score: Option<f64>) -> Self {
        match score {
            None => Self::Unscored,
            Some(s) if s >= 0.95 => Self::High,
            Some(s) if s >= 0.85 => Self::Medium,
            Some(_) => Self::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unscored => "unscored",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Which papers to keep. The default keeps everything.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperFilter {
    pub min_score: f64,
    pub max_score: f64,
    /// A paper passes when it carries at least one of these; empty means any.
    pub categories: BTreeSet<String>,
    pub published_after: Option<NaiveDate>,
    pub published_before: Option<NaiveDate>,
}

impl Default for PaperFilter {
    fn default() -> Self {
        Self {
            min_score: 0.0,
            max_score: 1.0,
            categories: BTreeSet::new(),
            published_after: None,
            published_before: None,
        }
    }
}

impl PaperFilter {
    pub fn is_unrestricted(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, paper: &Paper) -> bool {
        // Unscored papers only survive an unrestricted score range.
        let score_ok = match paper.relevance_score {
            Some(score) => score >= self.min_score && score <= self.max_score,
            None => self.min_score <= 0.0 && self.max_score >= 1.0,
        };
        if !score_ok {
            return false;
        }

        if !self.categories.is_empty()
            && paper.categories.intersection(&self.categories).next().is_none()
        {
            return false;
        }

        if self.published_after.is_some() || self.published_before.is_some() {
            let Some(day) = paper.published_on() else {
                return false;
            };
            if self.published_after.is_some_and(|after| day < after) {
                return false;
            }
            if self.published_before.is_some_and(|before| day > before) {
                return false;
            }
        }
        true
    }

    /// Unique papers of the snapshot that pass, highest relevance first.
    pub fn apply(&self, snapshot: &GraphSnapshot) -> Vec<Arc<Paper>> {
        let mut kept: Vec<Arc<Paper>> = snapshot
            .dedup_index
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        kept.sort_by(|a, b| by_relevance(a, b));
        kept
    }
}

/// Descending by score; unscored papers sort last, ties keep their order.
pub fn by_relevance(a: &Paper, b: &Paper) -> Ordering {
    match (a.relevance_score, b.relevance_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// A node's papers ordered by relevance.
pub fn ranked_papers(node: &QueryNode) -> Vec<Arc<Paper>> {
    let mut papers = node.papers.clone();
    papers.sort_by(|a, b| by_relevance(a, b));
    papers
}

/// Every category seen across the unique papers, with how many carry it.
pub fn category_counts(snapshot: &GraphSnapshot) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for paper in snapshot.dedup_index.iter() {
        for category in &paper.categories {
            *counts.entry(category.clone()).or_insert(0) += 1;
        }
    }
    counts
}
