//! Review queue: the pull requests a user is assigned to review.

use crate::error::AppError;
use crate::models::ReviewSummary;
use crate::store::StoreTx;

/// Every pull request the user currently holds an assignment on, open or
/// merged. Order is stable within one response only.
pub async fn list_reviews_for_user(
    tx: &mut dyn StoreTx,
    user_id: &str,
) -> Result<Vec<ReviewSummary>, AppError> {
    if tx.get_user(user_id).await?.is_none() {
        return Err(AppError::user_not_found(user_id));
    }
    Ok(tx.reviews_for_user(user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMember, PrStatus, PullRequest};
    use crate::services::registry;
    use crate::store::{DirectoryStore, InMemoryStore};

    #[tokio::test]
    async fn test_lists_open_and_merged_reviews() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        registry::add_team(
            tx.as_mut(),
            "core",
            vec![
                NewMember::new("a", "alice", true),
                NewMember::new("b", "bob", true),
            ],
        )
        .await
        .unwrap();

        let open = PullRequest::open("Open one", "a");
        let merged = PullRequest::open("Merged one", "a");
        for pr in [&open, &merged] {
            tx.insert_pr(pr).await.unwrap();
            tx.insert_assignment(&pr.id, "b").await.unwrap();
        }
        tx.mark_merged(&merged.id, chrono::Utc::now()).await.unwrap();

        let reviews = list_reviews_for_user(tx.as_mut(), "b").await.unwrap();
        assert_eq!(reviews.len(), 2);
        let status_of = |id: &str| reviews.iter().find(|r| r.pr_id == id).map(|r| r.status);
        assert_eq!(status_of(&open.id), Some(PrStatus::Open));
        assert_eq!(status_of(&merged.id), Some(PrStatus::Merged));
        assert!(reviews.iter().all(|r| r.author_id == "a"));

        assert!(list_reviews_for_user(tx.as_mut(), "a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = list_reviews_for_user(tx.as_mut(), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserNotFound { .. }));
    }
}
