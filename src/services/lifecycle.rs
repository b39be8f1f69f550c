//! Pull request lifecycle: creation with reviewer assignment, reviewer
//! reassignment, and merge.
//!
//! A pull request is `OPEN` until merged; `MERGED` is terminal. Assigned
//! reviewers are marked busy (`is_active = false`) on creation and freed on
//! merge. Reassignment only moves the assignment link unless the
//! [`ReassignActivityPolicy`] says otherwise.

use chrono::Utc;
use serde::Serialize;

use super::selector::{select_candidates, ReviewerShuffle};
use crate::config::ReassignActivityPolicy;
use crate::error::AppError;
use crate::models::{PullRequest, PullRequestSnapshot};
use crate::store::StoreTx;

/// Maximum number of reviewers assigned to a new pull request.
pub const MAX_REVIEWERS: usize = 2;

/// Result of a successful reassignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub snapshot: PullRequestSnapshot,
    pub replaced_by: String,
}

/// Open a pull request and assign up to [`MAX_REVIEWERS`] random active
/// teammates of the author.
pub async fn create_pr(
    tx: &mut dyn StoreTx,
    shuffle: &ReviewerShuffle,
    title: &str,
    author_id: &str,
) -> Result<PullRequestSnapshot, AppError> {
    if title.trim().is_empty() {
        return Err(AppError::bad_input_field("title is required", "title"));
    }

    let author = tx
        .get_user(author_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(author_id))?;

    if tx.find_open_pr(&author.id, title).await?.is_some() {
        return Err(AppError::pr_exists(title, &author.id));
    }

    let pr = PullRequest::open(title, &author.id);
    if !tx.insert_pr(&pr).await? {
        return Err(AppError::pr_exists(title, &author.id));
    }

    let mut reviewers = select_candidates(tx, &author.team_id, &author.id).await?;
    shuffle.shuffle(&mut reviewers);
    reviewers.truncate(MAX_REVIEWERS);

    for reviewer_id in &reviewers {
        if !tx.insert_assignment(&pr.id, reviewer_id).await? {
            return Err(AppError::storage_with_op(
                format!("reviewer {} already linked to new pull request {}", reviewer_id, pr.id),
                "create_pr",
            ));
        }
        tx.set_user_active(reviewer_id, false).await?;
    }

    log::info!(
        "Created pull request {} by {} with reviewers {:?}",
        pr.id,
        author.id,
        reviewers
    );

    Ok(PullRequestSnapshot {
        pull_request: pr,
        reviewers,
    })
}

/// Replace `old_reviewer_id` on an open pull request with the first
/// eligible active teammate of the old reviewer.
///
/// Candidates already reviewing the pull request, and its author, are
/// skipped. The link insert is conditional, so a candidate taken
/// concurrently is passed over rather than assigned twice.
pub async fn reassign_reviewer(
    tx: &mut dyn StoreTx,
    policy: ReassignActivityPolicy,
    pr_id: &str,
    old_reviewer_id: &str,
) -> Result<Reassignment, AppError> {
    let pr = tx
        .get_pr(pr_id)
        .await?
        .ok_or_else(|| AppError::pr_not_found(pr_id))?;

    if pr.is_merged() {
        return Err(AppError::pr_merged(pr_id));
    }

    let old_reviewer = tx
        .get_user(old_reviewer_id)
        .await?
        .ok_or_else(|| AppError::user_not_found(old_reviewer_id))?;

    let current = tx.reviewers(pr_id).await?;
    if !current.contains(&old_reviewer.id) {
        return Err(AppError::not_assigned(pr_id, &old_reviewer.id));
    }

    let candidates = select_candidates(tx, &old_reviewer.team_id, &old_reviewer.id).await?;

    let mut replacement = None;
    for candidate in candidates
        .into_iter()
        .filter(|c| *c != pr.author_id && !current.contains(c))
    {
        if tx.insert_assignment(pr_id, &candidate).await? {
            replacement = Some(candidate);
            break;
        }
        log::debug!("Candidate {} was assigned concurrently, trying next", candidate);
    }

    let replacement = replacement.ok_or_else(|| AppError::no_candidate(pr_id))?;

    if !tx.delete_assignment(pr_id, &old_reviewer.id).await? {
        return Err(AppError::not_assigned(pr_id, &old_reviewer.id));
    }

    if policy == ReassignActivityPolicy::Swap {
        tx.set_user_active(&old_reviewer.id, true).await?;
        tx.set_user_active(&replacement, false).await?;
    }

    let reviewers = tx.reviewers(pr_id).await?;

    log::info!(
        "Reassigned pull request {} from {} to {}",
        pr_id,
        old_reviewer.id,
        replacement
    );

    Ok(Reassignment {
        snapshot: PullRequestSnapshot {
            pull_request: pr,
            reviewers,
        },
        replaced_by: replacement,
    })
}

/// Merge a pull request and free its reviewers.
///
/// Merging an already merged pull request returns its current state and
/// changes nothing. Assignment links are kept as history.
pub async fn merge_pr(tx: &mut dyn StoreTx, pr_id: &str) -> Result<PullRequestSnapshot, AppError> {
    let pr = tx
        .get_pr(pr_id)
        .await?
        .ok_or_else(|| AppError::pr_not_found(pr_id))?;

    if pr.is_merged() {
        log::debug!("Pull request {} already merged", pr_id);
        return snapshot(tx, pr).await;
    }

    if !tx.mark_merged(pr_id, Utc::now()).await? {
        return Err(AppError::storage_with_op(
            format!("pull request {} changed while merging", pr_id),
            "merge_pr",
        ));
    }

    let reviewers = tx.reviewers(pr_id).await?;
    for reviewer_id in &reviewers {
        tx.set_user_active(reviewer_id, true).await?;
    }

    // Re-read so the returned timestamp is exactly what later reads see.
    let merged = tx
        .get_pr(pr_id)
        .await?
        .ok_or_else(|| AppError::pr_not_found(pr_id))?;

    log::info!("Merged pull request {}, freed {} reviewer(s)", pr_id, reviewers.len());

    Ok(PullRequestSnapshot {
        pull_request: merged,
        reviewers,
    })
}

async fn snapshot(tx: &mut dyn StoreTx, pr: PullRequest) -> Result<PullRequestSnapshot, AppError> {
    let reviewers = tx.reviewers(&pr.id).await?;
    Ok(PullRequestSnapshot {
        pull_request: pr,
        reviewers,
    })
}
