//! SQLite implementation of [`DirectoryStore`].
//!
//! Each store transaction is an immediate SQLx transaction on the shared
//! pool, so writers queue on the busy timeout; it is rolled back when
//! dropped uncommitted. Conditional writes rely on the
//! schema's unique constraints (`teams.name`, the open-PR partial index,
//! the assignment primary key) together with `ON CONFLICT DO NOTHING`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};

use super::{DirectoryStore, StoreTx};
use crate::db::pool::DbPool;
use crate::db::DbError;
use crate::models::{PullRequest, ReviewSummary, Team, User};

/// Directory store backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl DirectoryStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, DbError> {
        // Take the write lock now. A deferred transaction that reads and then
        // writes fails at once with SQLITE_BUSY once another writer commits.
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Box::new(SqliteTx { tx }))
    }
}

struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn find_team_by_name(&mut self, name: &str) -> Result<Option<Team>, DbError> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(team)
    }

    async fn get_team(&mut self, team_id: &str) -> Result<Option<Team>, DbError> {
        let team = sqlx::query_as::<_, Team>("SELECT id, name FROM teams WHERE id = ?")
            .bind(team_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(team)
    }

    async fn insert_team(&mut self, team: &Team) -> Result<bool, DbError> {
        let result = sqlx::query("INSERT INTO teams (id, name) VALUES (?, ?) ON CONFLICT DO NOTHING")
            .bind(&team.id)
            .bind(&team.name)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_user(&mut self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, team_id, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                username = excluded.username,
                team_id = excluded.team_id,
                is_active = excluded.is_active
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.team_id)
        .bind(user.is_active)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn get_user(&mut self, user_id: &str) -> Result<Option<User>, DbError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, team_id, is_active FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn team_members(&mut self, team_id: &str) -> Result<Vec<User>, DbError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, team_id, is_active
            FROM users
            WHERE team_id = ?
            ORDER BY username, id
            "#,
        )
        .bind(team_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(users)
    }

    async fn active_members_except(
        &mut self,
        team_id: &str,
        exclude_user_id: &str,
    ) -> Result<Vec<String>, DbError> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id
            FROM users
            WHERE team_id = ? AND is_active = 1 AND id != ?
            ORDER BY id
            "#,
        )
        .bind(team_id)
        .bind(exclude_user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<bool, DbError> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_open_pr(
        &mut self,
        author_id: &str,
        title: &str,
    ) -> Result<Option<PullRequest>, DbError> {
        let pr = sqlx::query_as::<_, PullRequest>(
            r#"
            SELECT id, title, author_id, status, merged_at
            FROM pull_requests
            WHERE author_id = ? AND title = ? AND status = 'OPEN'
            "#,
        )
        .bind(author_id)
        .bind(title)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(pr)
    }

    async fn insert_pr(&mut self, pr: &PullRequest) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO pull_requests (id, title, author_id, status, merged_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&pr.id)
        .bind(&pr.title)
        .bind(&pr.author_id)
        .bind(pr.status)
        .bind(pr.merged_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get_pr(&mut self, pr_id: &str) -> Result<Option<PullRequest>, DbError> {
        let pr = sqlx::query_as::<_, PullRequest>(
            "SELECT id, title, author_id, status, merged_at FROM pull_requests WHERE id = ?",
        )
        .bind(pr_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(pr)
    }

    async fn mark_merged(
        &mut self,
        pr_id: &str,
        merged_at: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE pull_requests SET status = 'MERGED', merged_at = ? WHERE id = ? AND status = 'OPEN'",
        )
        .bind(merged_at)
        .bind(pr_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reviewers(&mut self, pr_id: &str) -> Result<Vec<String>, DbError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM review_assignments WHERE pr_id = ? ORDER BY rowid",
        )
        .bind(pr_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn insert_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query(
            "INSERT INTO review_assignments (pr_id, user_id) VALUES (?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(pr_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_assignment(&mut self, pr_id: &str, user_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM review_assignments WHERE pr_id = ? AND user_id = ?")
            .bind(pr_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn reviews_for_user(&mut self, user_id: &str) -> Result<Vec<ReviewSummary>, DbError> {
        let reviews = sqlx::query_as::<_, ReviewSummary>(
            r#"
            SELECT pr.id AS pr_id, pr.title, pr.author_id, pr.status
            FROM review_assignments ra
            JOIN pull_requests pr ON pr.id = ra.pr_id
            WHERE ra.user_id = ?
            ORDER BY ra.rowid
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(reviews)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::initialize(&dir.path().join("test.db"))
            .await
            .unwrap();
        (dir, SqliteStore::new(pool))
    }

    #[tokio::test]
    async fn test_team_name_conflict() {
        let (_dir, store) = setup_store().await;
        conformance::team_name_conflict(&store).await;
    }

    #[tokio::test]
    async fn test_user_upsert_overwrites() {
        let (_dir, store) = setup_store().await;
        conformance::user_upsert_overwrites(&store).await;
    }

    #[tokio::test]
    async fn test_active_members_filter() {
        let (_dir, store) = setup_store().await;
        conformance::active_members_filter(&store).await;
    }

    #[tokio::test]
    async fn test_open_pr_conflict() {
        let (_dir, store) = setup_store().await;
        conformance::open_pr_conflict(&store).await;
    }

    #[tokio::test]
    async fn test_assignment_links() {
        let (_dir, store) = setup_store().await;
        conformance::assignment_links(&store).await;
    }

    #[tokio::test]
    async fn test_merge_compare_and_set() {
        let (_dir, store) = setup_store().await;
        conformance::merge_compare_and_set(&store).await;
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let (_dir, store) = setup_store().await;
        conformance::uncommitted_writes_are_discarded(&store).await;
    }
}
