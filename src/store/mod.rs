//! Directory store abstraction.
//!
//! The dispenser never talks to a database directly. It opens one
//! [`StoreTx`] per operation through a [`DirectoryStore`], performs point
//! reads and writes on it, and commits. Dropping a transaction without
//! committing discards every write made through it.
//!
//! Writes that protect an invariant are conditional: they report whether
//! they took effect instead of trusting an earlier read, so two concurrent
//! operations cannot both pass the same check.

#[cfg(test)]
mod conformance;
mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbError;
use crate::models::{PullRequest, ReviewSummary, Team, User};

/// Factory for per-operation transactions.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError>;
}

/// A single atomic unit of work against the directory.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_team_by_name(&mut self, name: &str) -> Result<Option<Team>, DbError>;

    async fn get_team(&mut self, team_id: &str) -> Result<Option<Team>, DbError>;

    /// Insert a team unless its name is taken. Returns `false` on conflict.
    async fn insert_team(&mut self, team: &Team) -> Result<bool, DbError>;

    /// Insert a user, or overwrite username, team and activity of an
    /// existing user with the same id.
    async fn upsert_user(&mut self, user: &User) -> Result<(), DbError>;

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, DbError>;

    /// Members of a team ordered by username, then id.
    async fn team_members(&mut self, team_id: &str) -> Result<Vec<User>, DbError>;

    /// Ids of active members of a team other than `exclude_user_id`,
    /// ordered by id.
    async fn active_members_except(
        &mut self,
        team_id: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<String>, DbError>;

    /// Set the activity flag. Returns `false` if the user does not exist.
    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<bool, DbError>;

    async fn find_open_pr(
        &mut self,
        author_id: &str,
        title: &str,
    ) -> Result<Option<PullRequest>, DbError>;

    /// Insert a pull request unless an open one with the same author and
    /// title exists. Returns `false` on conflict.
    async fn insert_pr(&mut self, pr: &PullRequest) -> Result<bool, DbError>;

    async fn get_pr(&mut self, pr_id: &str) -> Result<Option<PullRequest>, DbError>;

    /// Move an open pull request to merged. Returns `false` if it was not
    /// open (missing or already merged).
    async fn mark_merged(&mut self, pr_id: &str, merged_at: DateTime<Utc>)
        -> Result<bool, DbError>;

    /// Reviewer ids of a pull request in assignment order.
    async fn reviewers(&mut self, pr_id: &str) -> Result<Vec<String>, DbError>;

    /// Link a reviewer to a pull request. Returns `false` if the link
    /// already exists.
    async fn insert_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError>;

    /// Remove a reviewer link. Returns `false` if there was none.
    async fn delete_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError>;

    /// Pull requests the user is assigned to review.
    async fn reviews_for_user(&mut self, user_id: &str) -> Result<Vec<ReviewSummary>, DbError>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), DbError>;
}
