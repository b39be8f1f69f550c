//! Entry point for all dispenser operations.
//!
//! [`Dispenser`] owns its collaborators: the directory store, the reviewer
//! shuffle and the engine configuration. Each operation opens one store
//! transaction, runs the registry, selector or lifecycle logic on it and
//! commits, all within the configured request deadline. When an operation
//! fails or times out the transaction is dropped and nothing it wrote is
//! kept.

use std::future::Future;
use std::sync::Arc;

use super::lifecycle::{self, Reassignment};
use super::registry::{self, RegisteredTeam};
use super::review_queue;
use super::selector::ReviewerShuffle;
use crate::config::DispenserConfig;
use crate::error::AppError;
use crate::models::{
    NewMember, PullRequestSnapshot, ReviewSummary, Team, TeamWithMembers, UserWithTeam,
};
use crate::store::DirectoryStore;

pub struct Dispenser {
    store: Arc<dyn DirectoryStore>,
    shuffle: ReviewerShuffle,
    config: DispenserConfig,
}

impl Dispenser {
    pub fn new(store: Arc<dyn DirectoryStore>, config: DispenserConfig) -> Self {
        Self {
            store,
            shuffle: ReviewerShuffle::random(),
            config,
        }
    }

    /// Replace the reviewer shuffle, e.g. with a seeded one.
    pub fn with_shuffle(mut self, shuffle: ReviewerShuffle) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Run one operation under the request deadline.
    async fn run<T, F>(&self, operation: &'static str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                if err.is_retryable() {
                    log::error!("{} failed: {}", operation, err);
                } else {
                    log::debug!("{} rejected: {}", operation, err);
                }
                Err(err)
            }
            Err(_) => {
                log::warn!(
                    "{} exceeded deadline of {:?}",
                    operation,
                    self.config.request_timeout
                );
                Err(AppError::timeout(operation))
            }
        }
    }

    pub async fn create_team(&self, name: &str) -> Result<Team, AppError> {
        self.run("create_team", async {
            let mut tx = self.store.begin().await?;
            let team = registry::create_team(tx.as_mut(), name).await?;
            tx.commit().await?;
            Ok::<_, AppError>(team)
        })
        .await
    }

    pub async fn register_members(
        &self,
        team_id: &str,
        members: Vec<NewMember>,
    ) -> Result<Vec<NewMember>, AppError> {
        self.run("register_members", async {
            let mut tx = self.store.begin().await?;
            let members = registry::register_members(tx.as_mut(), team_id, members).await?;
            tx.commit().await?;
            Ok::<_, AppError>(members)
        })
        .await
    }

    /// Create a team and its members atomically.
    pub async fn add_team(
        &self,
        name: &str,
        members: Vec<NewMember>,
    ) -> Result<RegisteredTeam, AppError> {
        self.run("add_team", async {
            let mut tx = self.store.begin().await?;
            let registered = registry::add_team(tx.as_mut(), name, members).await?;
            tx.commit().await?;
            Ok::<_, AppError>(registered)
        })
        .await
    }

    pub async fn get_team(&self, name: &str) -> Result<TeamWithMembers, AppError> {
        self.run("get_team", async {
            let mut tx = self.store.begin().await?;
            let team = registry::get_team(tx.as_mut(), name).await?;
            tx.commit().await?;
            Ok::<_, AppError>(team)
        })
        .await
    }

    pub async fn set_user_active(
        &self,
        user_id: &str,
        is_active: bool,
    ) -> Result<UserWithTeam, AppError> {
        self.run("set_user_active", async {
            let mut tx = self.store.begin().await?;
            let user = registry::set_user_active(tx.as_mut(), user_id, is_active).await?;
            tx.commit().await?;
            Ok::<_, AppError>(user)
        })
        .await
    }

    pub async fn create_pr(
        &self,
        title: &str,
        author_id: &str,
    ) -> Result<PullRequestSnapshot, AppError> {
        self.run("create_pr", async {
            let mut tx = self.store.begin().await?;
            let created = lifecycle::create_pr(tx.as_mut(), &self.shuffle, title, author_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(created)
        })
        .await
    }

    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<Reassignment, AppError> {
        let policy = self.config.reassign_activity;
        self.run("reassign_reviewer", async {
            let mut tx = self.store.begin().await?;
            let result =
                lifecycle::reassign_reviewer(tx.as_mut(), policy, pr_id, old_reviewer_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(result)
        })
        .await
    }

    pub async fn merge_pr(&self, pr_id: &str) -> Result<PullRequestSnapshot, AppError> {
        self.run("merge_pr", async {
            let mut tx = self.store.begin().await?;
            let merged = lifecycle::merge_pr(tx.as_mut(), pr_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(merged)
        })
        .await
    }

    pub async fn list_reviews_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ReviewSummary>, AppError> {
        self.run("list_reviews_for_user", async {
            let mut tx = self.store.begin().await?;
            let reviews = review_queue::list_reviews_for_user(tx.as_mut(), user_id).await?;
            tx.commit().await?;
            Ok::<_, AppError>(reviews)
        })
        .await
    }
}
