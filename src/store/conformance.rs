//! Behaviour every [`DirectoryStore`] implementation must share.
//!
//! Each check is run by the test modules of both backends.

use chrono::Utc;

use super::DirectoryStore;
use crate::models::{PullRequest, Team, User};

fn user(id: &str, team_id: &str, is_active: bool) -> User {
    User {
        id: id.to_string(),
        username: format!("{}-name", id),
        team_id: team_id.to_string(),
        is_active,
    }
}

/// Team `t1` ("core") with active members a, b, c and inactive d.
pub async fn seed_team(store: &dyn DirectoryStore) {
    let mut tx = store.begin().await.unwrap();
    let team = Team {
        id: "t1".to_string(),
        name: "core".to_string(),
    };
    assert!(tx.insert_team(&team).await.unwrap());
    for (id, active) in [("a", true), ("b", true), ("c", true), ("d", false)] {
        tx.upsert_user(&user(id, "t1", active)).await.unwrap();
    }
    tx.commit().await.unwrap();
}

pub async fn team_name_conflict(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    let clash = Team {
        id: "t2".to_string(),
        name: "core".to_string(),
    };
    assert!(!tx.insert_team(&clash).await.unwrap());
    assert!(tx.get_team("t2").await.unwrap().is_none());
    assert_eq!(
        tx.find_team_by_name("core").await.unwrap().map(|t| t.id),
        Some("t1".to_string())
    );
}

pub async fn user_upsert_overwrites(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    let other = Team {
        id: "t2".to_string(),
        name: "platform".to_string(),
    };
    assert!(tx.insert_team(&other).await.unwrap());

    let mut moved = user("a", "t2", false);
    moved.username = "alice".to_string();
    tx.upsert_user(&moved).await.unwrap();

    assert_eq!(tx.get_user("a").await.unwrap(), Some(moved));
    let core: Vec<String> = tx
        .team_members("t1")
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(core, vec!["b", "c", "d"]);
}

pub async fn active_members_filter(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    assert_eq!(
        tx.active_members_except("t1", "a").await.unwrap(),
        vec!["b", "c"]
    );

    assert!(tx.set_user_active("b", false).await.unwrap());
    assert!(!tx.set_user_active("nobody", true).await.unwrap());
    assert_eq!(tx.active_members_except("t1", "a").await.unwrap(), vec!["c"]);
}

pub async fn open_pr_conflict(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    let first = PullRequest::open("Fix bug", "a");
    assert!(tx.insert_pr(&first).await.unwrap());
    assert!(!tx.insert_pr(&PullRequest::open("Fix bug", "a")).await.unwrap());
    assert!(tx.insert_pr(&PullRequest::open("Fix bug", "b")).await.unwrap());

    // Once merged, the title is free again for the same author.
    assert!(tx.mark_merged(&first.id, Utc::now()).await.unwrap());
    assert!(tx.find_open_pr("a", "Fix bug").await.unwrap().is_none());
    assert!(tx.insert_pr(&PullRequest::open("Fix bug", "a")).await.unwrap());
}

pub async fn assignment_links(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    let pr = PullRequest::open("Fix bug", "a");
    tx.insert_pr(&pr).await.unwrap();

    assert!(tx.insert_assignment(&pr.id, "c").await.unwrap());
    assert!(tx.insert_assignment(&pr.id, "b").await.unwrap());
    assert!(!tx.insert_assignment(&pr.id, "c").await.unwrap());
    assert_eq!(tx.reviewers(&pr.id).await.unwrap(), vec!["c", "b"]);

    let queue = tx.reviews_for_user("b").await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].pr_id, pr.id);
    assert_eq!(queue[0].title, "Fix bug");

    assert!(tx.delete_assignment(&pr.id, "c").await.unwrap());
    assert!(!tx.delete_assignment(&pr.id, "c").await.unwrap());
    assert_eq!(tx.reviewers(&pr.id).await.unwrap(), vec!["b"]);
    assert!(tx.reviews_for_user("c").await.unwrap().is_empty());
}

pub async fn merge_compare_and_set(store: &dyn DirectoryStore) {
    seed_team(store).await;

    let mut tx = store.begin().await.unwrap();
    let pr = PullRequest::open("Fix bug", "a");
    tx.insert_pr(&pr).await.unwrap();

    let first_merge = Utc::now();
    assert!(tx.mark_merged(&pr.id, first_merge).await.unwrap());
    assert!(!tx.mark_merged(&pr.id, Utc::now()).await.unwrap());
    assert!(!tx.mark_merged("missing", Utc::now()).await.unwrap());

    let stored = tx.get_pr(&pr.id).await.unwrap().unwrap();
    assert!(stored.is_merged());
    assert_eq!(
        stored.merged_at.map(|t| t.timestamp_millis()),
        Some(first_merge.timestamp_millis())
    );
}

pub async fn uncommitted_writes_are_discarded(store: &dyn DirectoryStore) {
    seed_team(store).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.set_user_active("a", false).await.unwrap();
        tx.insert_pr(&PullRequest::open("Draft", "a")).await.unwrap();
        // dropped without commit
    }

    let mut tx = store.begin().await.unwrap();
    assert!(tx.get_user("a").await.unwrap().unwrap().is_active);
    assert!(tx.find_open_pr("a", "Draft").await.unwrap().is_none());
}
