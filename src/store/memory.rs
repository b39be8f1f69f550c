//! In-memory implementation of [`DirectoryStore`].
//!
//! All state is held in memory and lost on restart. Transactions are
//! serialized: each holds the directory lock for its whole lifetime and
//! works on a private copy that replaces the shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{DirectoryStore, StoreTx};
use crate::db::DbError;
use crate::models::{PrStatus, PullRequest, ReviewSummary, Team, User};

#[derive(Debug, Clone, Default)]
struct Directory {
    teams: BTreeMap<String, Team>,
    users: BTreeMap<String, User>,
    pull_requests: BTreeMap<String, PullRequest>,
    /// (pr_id, user_id) links in assignment order.
    assignments: Vec<(String, String)>,
}

impl Directory {
    fn is_assigned(&self, pr_id: &str, user_id: &str) -> bool {
        self.assignments
            .iter()
            .any(|(p, u)| p == pr_id && u == user_id)
    }
}

/// In-memory directory store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<Directory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<Directory>,
    working: Directory,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_team_by_name(&mut self, name: &str) -> Result<Option<Team>, DbError> {
        Ok(self
            .working
            .teams
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn get_team(&mut self, team_id: &str) -> Result<Option<Team>, DbError> {
        Ok(self.working.teams.get(team_id).cloned())
    }

    async fn insert_team(&mut self, team: &Team) -> Result<bool, DbError> {
        let taken = self.working.teams.contains_key(&team.id)
            || self.working.teams.values().any(|t| t.name == team.name);
        if taken {
            return Ok(false);
        }
        self.working.teams.insert(team.id.clone(), team.clone());
        Ok(true)
    }

    async fn upsert_user(&mut self, user: &User) -> Result<(), DbError> {
        if !self.working.teams.contains_key(&user.team_id) {
            return Err(DbError::Corrupt(format!(
                "user {} references unknown team {}",
                user.id, user.team_id
            )));
        }
        self.working.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, DbError> {
        Ok(self.working.users.get(user_id).cloned())
    }

    async fn team_members(&mut self, team_id: &str) -> Result<Vec<User>, DbError> {
        let mut members: Vec<User> = self
            .working
            .users
            .values()
            .filter(|u| u.team_id == team_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
        Ok(members)
    }

    async fn active_members_except(
        &mut self,
        team_id: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<String>, DbError> {
        // BTreeMap iteration is already ordered by id
        Ok(self
            .working
            .users
            .values()
            .filter(|u| u.team_id == team_id && u.is_active && u.id != exclude_user_id)
            .map(|u| u.id.clone())
            .collect())
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<bool, DbError> {
        match self.working.users.get_mut(user_id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_open_pr(
        &mut self,
        author_id: &str,
        title: &str,
    ) -> Result<Option<PullRequest>, DbError> {
        Ok(self
            .working
            .pull_requests
            .values()
            .find(|pr| pr.author_id == author_id && pr.title == title && !pr.is_merged())
            .cloned())
    }

    async fn insert_pr(&mut self, pr: &PullRequest) -> Result<bool, DbError> {
        if !self.working.users.contains_key(&pr.author_id) {
            return Err(DbError::Corrupt(format!(
                "pull request {} references unknown author {}",
                pr.id, pr.author_id
            )));
        }
        if self.working.pull_requests.contains_key(&pr.id) {
            return Ok(false);
        }
        if pr.status == PrStatus::Open
            && self.find_open_pr(&pr.author_id, &pr.title).await?.is_some()
        {
            return Ok(false);
        }
        self.working.pull_requests.insert(pr.id.clone(), pr.clone());
        Ok(true)
    }

    async fn get_pr(&mut self, pr_id: &str) -> Result<Option<PullRequest>, DbError> {
        Ok(self.working.pull_requests.get(pr_id).cloned())
    }

    async fn mark_merged(
        &mut self,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        match self.working.pull_requests.get_mut(pr_id) {
            Some(pr) if pr.status == PrStatus::Open => {
                pr.status = PrStatus::Merged;
                pr.merged_at = Some(merged_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn reviewers(&mut self, pr_id: &str) -> Result<Vec<String>, DbError> {
        Ok(self
            .working
            .assignments
            .iter()
            .filter(|(p, _)| p == pr_id)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn insert_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError> {
        if self.working.is_assigned(pr_id, user_id) {
            return Ok(false);
        }
        self.working
            .assignments
            .push((pr_id.to_string(), user_id.to_string()));
        Ok(true)
    }

    async fn delete_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError> {
        let before = self.working.assignments.len();
        self.working
            .assignments
            .retain(|(p, u)| !(p == pr_id && u == user_id));
        Ok(self.working.assignments.len() < before)
    }

    async fn reviews_for_user(&mut self, user_id: &str) -> Result<Vec<ReviewSummary>, DbError> {
        let working = &self.working;
        Ok(working
            .assignments
            .iter()
            .filter(|(_, u)| u == user_id)
            .filter_map(|(p, _)| working.pull_requests.get(p))
            .map(ReviewSummary::from)
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[tokio::test]
    async fn test_team_name_conflict() {
        conformance::team_name_conflict(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_user_upsert_overwrites() {
        conformance::user_upsert_overwrites(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_active_members_filter() {
        conformance::active_members_filter(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_open_pr_conflict() {
        conformance::open_pr_conflict(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_assignment_links() {
        conformance::assignment_links(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_merge_compare_and_set() {
        conformance::merge_compare_and_set(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        conformance::uncommitted_writes_are_discarded(&InMemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let store = InMemoryStore::new();
        let first = store.begin().await.unwrap();

        // A second transaction cannot start while the first is alive.
        let pending = tokio::time::timeout(std::time::Duration::from_millis(50), store.begin()).await;
        assert!(pending.is_err());

        drop(first);
        assert!(store.begin().await.is_ok());
    }
}
