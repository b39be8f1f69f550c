//! Pull request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle state of a pull request. `Merged` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl std::fmt::Display for PrStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Merged => write!(f, "MERGED"),
        }
    }
}

/// A pull request as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
    /// Set once, when the pull request is merged.
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Create a new open pull request with a fresh id.
    pub fn open(title: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            author_id: author_id.into(),
            status: PrStatus::Open,
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }
}

/// A pull request with its current reviewers in assignment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSnapshot {
    pub pull_request: PullRequest,
    pub reviewers: Vec<String>,
}

/// Review queue entry: a pull request the user is assigned to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct ReviewSummary {
    pub pr_id: String,
    pub title: String,
    pub author_id: String,
    pub status: PrStatus,
}

impl From<&PullRequest> for ReviewSummary {
    fn from(pr: &PullRequest) -> Self {
        Self {
            pr_id: pr.id.clone(),
            title: pr.title.clone(),
            author_id: pr.author_id.clone(),
            status: pr.status,
        }
    }
}
