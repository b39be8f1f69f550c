//! Reviewer pool selection.
//!
//! The pool is every active member of a team except one user. Initial
//! assignment randomizes the pool with a [`ReviewerShuffle`]; reassignment
//! scans it in its stored order.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::AppError;
use crate::store::StoreTx;

/// Active members of `team_id` other than `exclude_user_id`, ordered by id.
pub async fn select_candidates(
    tx: &mut dyn StoreTx,
    team_id: &str,
    exclude_user_id: &str,
) -> Result<Vec<String>, AppError> {
    let candidates = tx.active_members_except(team_id, exclude_user_id).await?;
    log::debug!(
        "Reviewer pool for team {} excluding {}: {} candidate(s)",
        team_id,
        exclude_user_id,
        candidates.len()
    );
    Ok(candidates)
}

/// Source of uniformly random permutations for reviewer pools.
pub struct ReviewerShuffle {
    source: Source,
}

enum Source {
    Thread,
    Seeded(Mutex<StdRng>),
}

impl ReviewerShuffle {
    /// Shuffle with the thread-local OS-seeded generator.
    pub fn random() -> Self {
        Self {
            source: Source::Thread,
        }
    }

    /// Shuffle with a deterministic generator. The sequence of permutations
    /// is fixed by `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            source: Source::Seeded(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }

    /// Permute `ids` in place (Fisher–Yates).
    pub fn shuffle(&self, ids: &mut [String]) {
        match &self.source {
            Source::Thread => ids.shuffle(&mut rand::thread_rng()),
            Source::Seeded(rng) => {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                ids.shuffle(&mut *rng);
            }
        }
    }
}

impl Default for ReviewerShuffle {
    fn default() -> Self {
        Self::random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let shuffle = ReviewerShuffle::random();
        let original = ids(&["a", "b", "c", "d", "e"]);
        let mut shuffled = original.clone();
        shuffle.shuffle(&mut shuffled);

        let before: HashSet<_> = original.iter().collect();
        let after: HashSet<_> = shuffled.iter().collect();
        assert_eq!(before, after);
        assert_eq!(shuffled.len(), original.len());
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let first = ReviewerShuffle::seeded(7);
        let second = ReviewerShuffle::seeded(7);

        for _ in 0..5 {
            let mut a = ids(&["a", "b", "c", "d", "e", "f"]);
            let mut b = a.clone();
            first.shuffle(&mut a);
            second.shuffle(&mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_shuffle_reaches_every_leading_candidate() {
        // Every candidate should lead the order at some point; a fixed
        // order would make assignment predictable from input order.
        let shuffle = ReviewerShuffle::seeded(42);
        let mut leaders = HashSet::new();
        for _ in 0..200 {
            let mut pool = ids(&["b", "c", "d"]);
            shuffle.shuffle(&mut pool);
            leaders.insert(pool[0].clone());
        }
        assert_eq!(leaders.len(), 3);
    }

    #[test]
    fn test_shuffle_handles_small_pools() {
        let shuffle = ReviewerShuffle::seeded(1);
        let mut empty: Vec<String> = Vec::new();
        shuffle.shuffle(&mut empty);
        assert!(empty.is_empty());

        let mut single = ids(&["b"]);
        shuffle.shuffle(&mut single);
        assert_eq!(single, ids(&["b"]));
    }
}
