//! Business logic services.
//!
//! The registry, selector, lifecycle and review queue modules hold the
//! rules and operate on a single store transaction. [`Dispenser`] wraps
//! them into deadline-bounded, transactional operations.

pub mod dispenser;
pub mod lifecycle;
pub mod registry;
pub mod review_queue;
pub mod selector;

pub use dispenser::Dispenser;
pub use lifecycle::{Reassignment, MAX_REVIEWERS};
pub use registry::RegisteredTeam;
pub use selector::ReviewerShuffle;
